use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dslab_core::{cast, Event, EventHandler, Id, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Ping {
    seq: u32,
}

#[derive(Clone, Serialize)]
struct Unknown {}

struct Recorder {
    received: Vec<(f64, u32, Id)>,
    ctx: SimulationContext,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Ping { seq } => {
                self.received.push((self.ctx.time(), seq, event.src));
            }
        })
    }
}

fn recorder(sim: &mut Simulation, name: &str) -> (Rc<RefCell<Recorder>>, Id) {
    let comp = Rc::new(RefCell::new(Recorder {
        received: Vec::new(),
        ctx: sim.create_context(name),
    }));
    let id = sim.add_handler(name, comp.clone());
    (comp, id)
}

#[test]
// Events are delivered by time, events with equal time in emission order.
fn test_event_order() {
    let mut sim = Simulation::new(123);
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut client = sim.create_context("client");

    client.emit(Ping { seq: 0 }, rec_id, 2.0);
    client.emit(Ping { seq: 1 }, rec_id, 1.0);
    client.emit(Ping { seq: 2 }, rec_id, 1.0);
    client.emit_now(Ping { seq: 3 }, rec_id);
    sim.step_until_no_events();

    let seqs: Vec<u32> = rec.borrow().received.iter().map(|(_, seq, _)| *seq).collect();
    assert_eq!(seqs, vec![3, 1, 2, 0]);
    assert_eq!(sim.time(), 2.0);
    assert_eq!(rec.borrow().received[0].2, client.id());
}

#[test]
fn test_event_cancellation() {
    let mut sim = Simulation::new(123);
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut client = sim.create_context("client");

    let canceled = client.emit(Ping { seq: 0 }, rec_id, 1.0);
    client.emit(Ping { seq: 1 }, rec_id, 3.0);
    client.cancel_event(canceled);
    sim.step_until_no_events();

    assert_eq!(rec.borrow().received.len(), 1);
    assert_eq!(rec.borrow().received[0], (3.0, 1, client.id()));
}

#[test]
fn test_step_for_duration() {
    let mut sim = Simulation::new(123);
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut client = sim.create_context("client");

    client.emit(Ping { seq: 0 }, rec_id, 1.0);
    client.emit(Ping { seq: 1 }, rec_id, 2.0);
    client.emit(Ping { seq: 2 }, rec_id, 3.5);

    assert!(sim.step_for_duration(1.5));
    assert_eq!(sim.time(), 1.0);
    assert!(sim.step_for_duration(0.1));
    assert_eq!(sim.time(), 1.0);
    assert!(!sim.step_for_duration(3.0));
    assert_eq!(sim.time(), 3.5);
    assert_eq!(rec.borrow().received.len(), 3);
}

#[test]
// Unhandled and undelivered events are consumed without reaching any handler arm.
fn test_unhandled_and_undelivered_events() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sim = Simulation::new(123);
    let (rec, rec_id) = recorder(&mut sim, "rec");
    let mut client = sim.create_context("client");

    client.emit_now(Unknown {}, rec_id);
    client.emit_now(Ping { seq: 7 }, client.id());
    assert!(sim.step());
    assert!(sim.step());
    assert!(!sim.step());
    assert!(rec.borrow().received.is_empty());
    assert_eq!(sim.event_count(), 2);
}

#[test]
fn test_component_names() {
    let mut sim = Simulation::new(123);
    let (_, rec_id) = recorder(&mut sim, "rec");
    let ctx = sim.create_context("client");

    assert_eq!(sim.lookup_id("rec"), Some(rec_id));
    assert_eq!(sim.lookup_id("missing"), None);
    assert_eq!(sim.lookup_name(ctx.id()), "client");
    assert_eq!(ctx.lookup_name(rec_id), "rec");
    assert_eq!(sim.create_context("rec").id(), rec_id);
}

#[test]
fn test_seeded_random_sequence() {
    let mut first = Simulation::new(42);
    let mut second = Simulation::new(42);
    let mut other = Simulation::new(43);

    let a: Vec<f64> = (0..5).map(|_| first.rand()).collect();
    let b: Vec<f64> = (0..5).map(|_| second.rand()).collect();
    let c: Vec<f64> = (0..5).map(|_| other.rand()).collect();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.iter().all(|x| (0. ..1.).contains(x)));
}
