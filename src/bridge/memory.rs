use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{IdentifierError, SchemaVersion, SubstationBackend, SubstationTable};
use crate::domain::{ExternalId, TargetId};

/// Substation rows held in memory, for both schemas
#[derive(Debug, Clone, Default)]
pub struct InMemorySubstations {
    versioned: HashMap<String, Vec<(TargetId, ExternalId)>>,
    legacy: Vec<(TargetId, ExternalId)>,
}

impl InMemorySubstations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versioned(
        mut self,
        version: impl Into<String>,
        rows: impl IntoIterator<Item = (TargetId, ExternalId)>,
    ) -> Self {
        self.versioned
            .entry(version.into())
            .or_default()
            .extend(rows);
        self
    }

    pub fn with_legacy(mut self, rows: impl IntoIterator<Item = (TargetId, ExternalId)>) -> Self {
        self.legacy.extend(rows);
        self
    }

    fn rows(&self, schema: &SchemaVersion) -> Vec<(TargetId, ExternalId)> {
        match schema {
            SchemaVersion::Versioned { version } => {
                self.versioned.get(version).cloned().unwrap_or_default()
            }
            SchemaVersion::Legacy => self.legacy.clone(),
        }
    }
}

impl SubstationBackend for InMemorySubstations {
    fn table(&self, schema: &SchemaVersion) -> Arc<dyn SubstationTable> {
        Arc::new(InMemoryTable::from_rows(self.rows(schema)))
    }
}

/// Rows of a single schema, indexed both ways
#[derive(Debug, Default)]
pub struct InMemoryTable {
    by_target: HashMap<TargetId, ExternalId>,
    by_external: HashMap<ExternalId, TargetId>,
}

impl InMemoryTable {
    pub fn from_rows(rows: impl IntoIterator<Item = (TargetId, ExternalId)>) -> Self {
        let mut table = Self::default();
        for (target_id, external_id) in rows {
            table.by_target.insert(target_id, external_id);
            table.by_external.insert(external_id, target_id);
        }
        table
    }
}

#[async_trait]
impl SubstationTable for InMemoryTable {
    async fn external_for(&self, target_id: TargetId) -> Result<Option<ExternalId>, IdentifierError> {
        Ok(self.by_target.get(&target_id).copied())
    }

    async fn target_for(&self, external_id: ExternalId) -> Result<Option<TargetId>, IdentifierError> {
        Ok(self.by_external.get(&external_id).copied())
    }
}
