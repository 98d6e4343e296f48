use std::collections::{BinaryHeap, HashSet};

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::component::Id;
use crate::event::{Event, EventData, EventId};

pub struct SimulationState {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            canceled_events: HashSet::new(),
            event_count: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn add_event<T>(&mut self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        assert!(delay >= 0., "event delay must be non-negative, got {}", delay);
        let event_id = self.event_count;
        self.events.push(Event {
            id: event_id,
            time: self.clock + delay,
            src,
            dst,
            data: Box::new(data),
        });
        self.event_count += 1;
        event_id
    }

    pub fn next_event(&mut self) -> Option<Event> {
        while let Some(event) = self.events.pop() {
            if !self.canceled_events.remove(&event.id) {
                self.clock = event.time;
                return Some(event);
            }
        }
        None
    }

    pub fn peek_event(&mut self) -> Option<&Event> {
        while let Some(event) = self.events.peek() {
            if self.canceled_events.contains(&event.id) {
                let event_id = event.id;
                self.events.pop();
                self.canceled_events.remove(&event_id);
            } else {
                break;
            }
        }
        self.events.peek()
    }

    pub fn cancel_event(&mut self, id: EventId) {
        self.canceled_events.insert(id);
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }
}
