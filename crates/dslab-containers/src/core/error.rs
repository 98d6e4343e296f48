//! Errors reported by the datacenter controller.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Reference to an entity of the datacenter hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Host(u32),
    Vm(u32),
    Unit(u32),
    Task(u32),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            EntityRef::Host(id) => write!(f, "host #{}", id),
            EntityRef::Vm(id) => write!(f, "vm #{}", id),
            EntityRef::Unit(id) => write!(f, "unit #{}", id),
            EntityRef::Task(id) => write!(f, "task #{}", id),
        }
    }
}

/// Failure of a lifecycle operation.
///
/// All variants except [`DatacenterError::MigrationFailure`] are local to a single request: they are reported
/// to the requester and the controller keeps serving other requests.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum DatacenterError {
    /// The allocation policy found no suitable target for the entity.
    #[error("no suitable placement found for {0}")]
    PlacementFailure(EntityRef),
    /// The migration destination rejected the entity after it had been released on the source.
    #[error("migration of {entity} failed: {target} rejected the allocation after release on the source")]
    MigrationFailure { entity: EntityRef, target: EntityRef },
    /// The request payload lacks the data needed to process it.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// Some link of the host → VM → unit → task chain is missing.
    #[error("{0} not found")]
    NotFound(EntityRef),
    /// An entity with the same id is already managed by the controller.
    #[error("{0} already exists")]
    AlreadyExists(EntityRef),
    /// The entity is being migrated and cannot be reassigned.
    #[error("{0} is being migrated")]
    InMigration(EntityRef),
    /// The controller stopped serving requests after a fatal error.
    #[error("controller is halted after a fatal error: {0}")]
    Halted(String),
}

impl DatacenterError {
    /// Returns `true` for errors after which the datacenter state is no longer consistent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DatacenterError::MigrationFailure { .. })
    }
}
