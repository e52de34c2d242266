//! Export context
//!
//! What the planner and executor hand to a sink at open time: the query
//! projection plus the collaborators used to reach storage.

use crate::credentials::{RoleAssumer, StsRoleAssumer};
use crate::storage::{S3StoreConnector, StoreConnector};
use crate::types::ProjectedColumn;
use std::sync::Arc;

/// Per-statement context passed to `open`
#[derive(Debug, Clone)]
pub struct ExportContext {
    projection: Vec<ProjectedColumn>,
    connector: Arc<dyn StoreConnector>,
    assumer: Arc<dyn RoleAssumer>,
}

impl ExportContext {
    /// Context for a projection, writing to S3 with STS role assumption
    pub fn new(projection: Vec<ProjectedColumn>) -> Self {
        Self {
            projection,
            connector: Arc::new(S3StoreConnector),
            assumer: Arc::new(StsRoleAssumer::new()),
        }
    }

    /// Replace the storage connector
    #[must_use]
    pub fn with_store_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the role assumer
    #[must_use]
    pub fn with_role_assumer(mut self, assumer: Arc<dyn RoleAssumer>) -> Self {
        self.assumer = assumer;
        self
    }

    /// Projected columns in output order
    pub fn projection(&self) -> &[ProjectedColumn] {
        &self.projection
    }

    /// Storage connector
    pub fn connector(&self) -> &Arc<dyn StoreConnector> {
        &self.connector
    }

    /// Role assumer
    pub fn assumer(&self) -> &Arc<dyn RoleAssumer> {
        &self.assumer
    }
}
