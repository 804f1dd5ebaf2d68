#![cfg(feature = "db")]

use async_trait::async_trait;
use sea_query::{Alias, Expr, PostgresQueryBuilder, Query, SimpleExpr};
use sea_query_binder::{SqlxBinder, SqlxValues};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use super::{IdentifierError, SchemaVersion, SubstationBackend, SubstationTable};
use crate::domain::{ExternalId, TargetId};

const BUS_COLUMN: &str = "otg_id";
const SUBSTATION_COLUMN: &str = "subst_id";
const VERSION_COLUMN: &str = "version";

/// HV/MV substation tables in the open energy database
pub struct PgSubstations {
    pool: PgPool,
}

impl PgSubstations {
    pub async fn connect(url: &str) -> Result<Self, IdentifierError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await
            .map_err(backend_error)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SubstationBackend for PgSubstations {
    fn table(&self, schema: &SchemaVersion) -> Arc<dyn SubstationTable> {
        match schema {
            SchemaVersion::Versioned { version } => Arc::new(VersionedHvmvSubstations {
                pool: self.pool.clone(),
                version: version.clone(),
            }),
            SchemaVersion::Legacy => Arc::new(LegacyHvmvSubstations {
                pool: self.pool.clone(),
            }),
        }
    }
}

fn backend_error(err: sqlx::Error) -> IdentifierError {
    IdentifierError::Backend(err.to_string())
}

/// `SELECT <select> FROM <schema>.<table> WHERE <filter> = $1 [AND version = $2]`
fn lookup_query(
    (schema, table): (&str, &str),
    select: &str,
    filter: &str,
    value: impl Into<SimpleExpr>,
    version: Option<&str>,
) -> (String, SqlxValues) {
    let mut query = Query::select();
    query
        .column(Alias::new(select))
        .from((Alias::new(schema), Alias::new(table)))
        .and_where(Expr::col(Alias::new(filter)).eq(value));
    if let Some(version) = version {
        query.and_where(Expr::col(Alias::new(VERSION_COLUMN)).eq(version));
    }
    query.build_sqlx(PostgresQueryBuilder)
}

async fn fetch_bus(
    pool: &PgPool,
    table: (&str, &str),
    target_id: TargetId,
    version: Option<&str>,
) -> Result<Option<ExternalId>, IdentifierError> {
    let subst_id = i32::try_from(target_id.0)
        .map_err(|_| IdentifierError::Backend(format!("MV grid id {target_id} out of range")))?;
    let (sql, values) = lookup_query(table, BUS_COLUMN, SUBSTATION_COLUMN, subst_id, version);
    let bus: Option<i64> = sqlx::query_scalar_with(&sql, values)
        .fetch_optional(pool)
        .await
        .map_err(backend_error)?;
    Ok(bus.and_then(|b| u64::try_from(b).ok()).map(ExternalId))
}

async fn fetch_substation(
    pool: &PgPool,
    table: (&str, &str),
    external_id: ExternalId,
    version: Option<&str>,
) -> Result<Option<TargetId>, IdentifierError> {
    let bus = i64::try_from(external_id.0)
        .map_err(|_| IdentifierError::Backend(format!("bus id {external_id} out of range")))?;
    let (sql, values) = lookup_query(table, SUBSTATION_COLUMN, BUS_COLUMN, bus, version);
    let subst: Option<i32> = sqlx::query_scalar_with(&sql, values)
        .fetch_optional(pool)
        .await
        .map_err(backend_error)?;
    Ok(subst.and_then(|s| u32::try_from(s).ok()).map(TargetId))
}

/// `grid.ego_dp_hvmv_substation`, rows filtered by dataset version
pub struct VersionedHvmvSubstations {
    pool: PgPool,
    version: String,
}

impl VersionedHvmvSubstations {
    const TABLE: (&'static str, &'static str) = ("grid", "ego_dp_hvmv_substation");
}

#[async_trait]
impl SubstationTable for VersionedHvmvSubstations {
    async fn external_for(&self, target_id: TargetId) -> Result<Option<ExternalId>, IdentifierError> {
        fetch_bus(&self.pool, Self::TABLE, target_id, Some(&self.version)).await
    }

    async fn target_for(&self, external_id: ExternalId) -> Result<Option<TargetId>, IdentifierError> {
        fetch_substation(&self.pool, Self::TABLE, external_id, Some(&self.version)).await
    }
}

/// `model_draft.ego_grid_hvmv_substation`, the unversioned table
pub struct LegacyHvmvSubstations {
    pool: PgPool,
}

impl LegacyHvmvSubstations {
    const TABLE: (&'static str, &'static str) = ("model_draft", "ego_grid_hvmv_substation");
}

#[async_trait]
impl SubstationTable for LegacyHvmvSubstations {
    async fn external_for(&self, target_id: TargetId) -> Result<Option<ExternalId>, IdentifierError> {
        fetch_bus(&self.pool, Self::TABLE, target_id, None).await
    }

    async fn target_for(&self, external_id: ExternalId) -> Result<Option<TargetId>, IdentifierError> {
        fetch_substation(&self.pool, Self::TABLE, external_id, None).await
    }
}
