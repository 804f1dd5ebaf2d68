//! Translation between transmission grid bus ids and MV grid ids.
//!
//! The substation table exists in two schemas: a versioned one (rows carry the
//! dataset version) and the legacy unversioned one. The schema is picked once
//! per batch and a [`SubstationTable`] bound to it serves every lookup.

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::{ExternalId, TargetId};

pub use memory::InMemorySubstations;

/// Schema of the HV/MV substation table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum SchemaVersion {
    Versioned { version: String },
    Legacy,
}

impl SchemaVersion {
    /// Versioned when a grid version is configured, legacy otherwise
    pub fn from_grid_version(grid_version: Option<&str>) -> Self {
        match grid_version {
            Some(version) => SchemaVersion::Versioned {
                version: version.to_string(),
            },
            None => SchemaVersion::Legacy,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Versioned { version } => write!(f, "versioned {version}"),
            SchemaVersion::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("no MV grid is connected to bus {external_id} ({schema} schema)")]
    TargetNotFound {
        external_id: ExternalId,
        schema: SchemaVersion,
    },

    #[error("no bus is connected to MV grid {target_id} ({schema} schema)")]
    ExternalNotFound {
        target_id: TargetId,
        schema: SchemaVersion,
    },

    #[error("identifier lookup failed: {0}")]
    Backend(String),
}

/// Substation rows of one schema
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubstationTable: Send + Sync {
    async fn external_for(&self, target_id: TargetId) -> Result<Option<ExternalId>, IdentifierError>;

    async fn target_for(&self, external_id: ExternalId) -> Result<Option<TargetId>, IdentifierError>;
}

/// Storage holding substation tables for every schema
pub trait SubstationBackend: Send + Sync {
    fn table(&self, schema: &SchemaVersion) -> Arc<dyn SubstationTable>;
}

/// Memoizing id translation bound to one schema
pub struct IdentifierBridge {
    schema: SchemaVersion,
    table: Arc<dyn SubstationTable>,
    to_external: RwLock<HashMap<TargetId, ExternalId>>,
    to_target: RwLock<HashMap<ExternalId, TargetId>>,
}

impl IdentifierBridge {
    pub fn new(schema: SchemaVersion, table: Arc<dyn SubstationTable>) -> Self {
        Self {
            schema,
            table,
            to_external: RwLock::new(HashMap::new()),
            to_target: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the table for `schema` once and bind a bridge to it
    pub fn resolve(backend: &dyn SubstationBackend, schema: SchemaVersion) -> Self {
        let table = backend.table(&schema);
        Self::new(schema, table)
    }

    pub fn schema(&self) -> &SchemaVersion {
        &self.schema
    }

    /// MV grid id for a transmission grid bus
    pub async fn to_target_id(&self, external_id: ExternalId) -> Result<TargetId, IdentifierError> {
        if let Some(id) = self.to_target.read().get(&external_id).copied() {
            return Ok(id);
        }

        let target_id = self
            .table
            .target_for(external_id)
            .await?
            .ok_or_else(|| IdentifierError::TargetNotFound {
                external_id,
                schema: self.schema.clone(),
            })?;
        debug!(%external_id, %target_id, schema = %self.schema, "resolved MV grid");
        self.remember(target_id, external_id);
        Ok(target_id)
    }

    /// Transmission grid bus for an MV grid id
    pub async fn to_external_id(&self, target_id: TargetId) -> Result<ExternalId, IdentifierError> {
        if let Some(id) = self.to_external.read().get(&target_id).copied() {
            return Ok(id);
        }

        let external_id = self
            .table
            .external_for(target_id)
            .await?
            .ok_or_else(|| IdentifierError::ExternalNotFound {
                target_id,
                schema: self.schema.clone(),
            })?;
        debug!(%target_id, %external_id, schema = %self.schema, "resolved bus");
        self.remember(target_id, external_id);
        Ok(external_id)
    }

    fn remember(&self, target_id: TargetId, external_id: ExternalId) {
        self.to_external.write().insert(target_id, external_id);
        self.to_target.write().insert(external_id, target_id);
    }
}
