//! Simulation component identifiers.

/// Identifier of simulation component.
///
/// Identifiers are assigned sequentially starting from zero in the order components are registered.
pub type Id = u32;
