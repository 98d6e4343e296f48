//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Event identifier, unique within a simulation.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Implemented automatically for every serializable type, so that any `#[derive(Serialize)]` struct can be
/// used as an event payload and later recovered with [`cast!`](crate::cast!).
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// Event delivered to a simulation component.
pub struct Event {
    /// Unique event identifier, also defines the delivery order of events with equal time.
    pub id: EventId,
    /// Time at which the event is delivered.
    pub time: f64,
    /// Component which emitted the event.
    pub src: Id,
    /// Component to which the event is delivered.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// BinaryHeap is a max-heap, so the ordering is reversed: earlier time first, then lower id.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
