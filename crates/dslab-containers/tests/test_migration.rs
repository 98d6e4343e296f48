use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::simulation::Simulation;

use dslab_containers::broker::Broker;
use dslab_containers::core::config::SimulationConfig;
use dslab_containers::core::datacenter::MigrationKind;
use dslab_containers::core::error::{DatacenterError, EntityRef};
use dslab_containers::core::events::vm::VmMigrateRequest;
use dslab_containers::core::task::Task;
use dslab_containers::core::unit::UnitSpec;
use dslab_containers::simulation::ContainerSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn setup(sim_config: SimulationConfig) -> (ContainerSimulation, Rc<RefCell<Broker>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud_sim = ContainerSimulation::new(sim, sim_config).unwrap();
    let broker = cloud_sim.add_broker("broker");
    (cloud_sim, broker)
}

fn default_config() -> SimulationConfig {
    SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap()
}

#[test]
// After migration the VM is present only on the destination host.
fn test_vm_migration() {
    let (mut cloud_sim, broker) = setup(default_config());
    let h1 = cloud_sim.add_host("h1", 4, 8, 1000.);
    let h2 = cloud_sim.add_host("h2", 4, 8, 1000.);

    broker.borrow_mut().create_vm(1, 2, 4, false);
    broker.borrow_mut().migrate_vm(1, h2, true);
    cloud_sim.step_until_no_events();

    assert_eq!(broker.borrow().vm_migrate_acks.len(), 1);
    assert!(broker.borrow().vm_migrate_acks[0].success);

    let dc = cloud_sim.datacenter();
    let dc = dc.borrow();
    assert_eq!(dc.vm_location(1), Some(h2));
    assert!(dc.host(h1).unwrap().vms().is_empty());
    assert!(dc.host(h2).unwrap().has_vm(1));
    let vm = dc.vm(1).unwrap();
    assert_eq!(vm.host_id(), Some(h2));
    assert!(!vm.is_in_migration());

    assert_eq!(dc.migrations().len(), 1);
    let record = &dc.migrations()[0];
    assert_eq!(record.kind, MigrationKind::Vm);
    assert_eq!(record.entity_id, 1);
    assert_eq!(record.source_id, Some(h1));
    assert_eq!(record.target_id, h2);
}

#[test]
// 4000 MI are done on the source host, the remaining 6000 MI run twice as fast on the destination.
fn test_vm_migration_regrants_capacity() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("slow", 4, 8, 1000.);
    let fast = cloud_sim.add_host("fast", 4, 8, 2000.);
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 1, 4, false);
    broker
        .borrow_mut()
        .submit_units(vec![UnitSpec::new(1, owner, 1, 2)], false);
    broker
        .borrow_mut()
        .submit_task(Task::new(1, owner, 10000.).bind(1, 1), false);
    cloud_sim.step_for_duration(1.);
    broker.borrow_mut().send(
        VmMigrateRequest {
            vm_id: 1,
            host_id: fast,
            ack: false,
        },
        4.,
    );
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert_eq!(broker.returned_tasks.len(), 1);
    assert_eq!(broker.returned_tasks[0].0, 7.);
    let dc = cloud_sim.datacenter();
    assert_eq!(dc.borrow().unit(1).unwrap().granted_mips(), 2000.);
}

#[test]
// Migration delay is memory / network throughput = 20 / 10.
fn test_scheduled_vm_migration() {
    let (mut cloud_sim, broker) = setup(default_config());
    let h1 = cloud_sim.add_host("h1", 4, 32, 1000.);
    let h2 = cloud_sim.add_host("h2", 4, 32, 1000.);

    broker.borrow_mut().create_vm(1, 2, 20, false);
    cloud_sim.step_until_no_events();

    let dc = cloud_sim.datacenter();
    assert_eq!(dc.borrow_mut().schedule_vm_migration(1, h2), Ok(2.));
    assert_eq!(
        dc.borrow_mut().schedule_vm_migration(1, h2),
        Err(DatacenterError::InMigration(EntityRef::Vm(1)))
    );
    assert_eq!(
        dc.borrow_mut().schedule_vm_migration(1, 7),
        Err(DatacenterError::NotFound(EntityRef::Host(7)))
    );
    assert!(dc.borrow().vm(1).unwrap().is_in_migration());
    assert!(dc.borrow().host(h2).unwrap().vms_migrating_in().contains(&1));

    // the VM can not be moved elsewhere while its migration is in progress
    broker.borrow_mut().migrate_vm(1, h1, true);
    cloud_sim.step_until_no_events();

    assert!(!broker.borrow().vm_migrate_acks[0].success);
    let dc = dc.borrow();
    assert!(dc.fatal_error().is_none());
    assert_eq!(dc.vm_location(1), Some(h2));
    assert!(!dc.vm(1).unwrap().is_in_migration());
    assert!(dc.host(h2).unwrap().vms_migrating_in().is_empty());
    assert_eq!(dc.migrations()[0].time, 2.);
}

#[test]
// The destination VM waits for the unit until it arrives.
fn test_scheduled_unit_migration() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("h", 8, 32, 1000.);
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 2, 8, false);
    broker.borrow_mut().create_vm(2, 2, 8, false);
    broker
        .borrow_mut()
        .submit_units(vec![UnitSpec::new(1, owner, 1, 5)], false);
    cloud_sim.step_until_no_events();

    let dc = cloud_sim.datacenter();
    assert_eq!(dc.borrow().unit_location(1), Some(1));
    assert_eq!(dc.borrow_mut().schedule_unit_migration(1, 2, true), Ok(0.5));
    assert!(dc.borrow().vm(2).unwrap().is_in_waiting());
    assert!(dc.borrow().vm(2).unwrap().units_migrating_in().contains(&1));
    assert!(dc.borrow().unit(1).unwrap().is_in_migration());
    cloud_sim.step_until_no_events();

    let dc = dc.borrow();
    assert_eq!(dc.unit_location(1), Some(2));
    assert!(dc.vm(1).unwrap().units().is_empty());
    assert!(dc.vm(2).unwrap().units().contains(&1));
    assert!(dc.vm(2).unwrap().units_migrating_in().is_empty());
    assert!(!dc.vm(2).unwrap().is_in_waiting());
    let unit = dc.unit(1).unwrap();
    assert!(!unit.is_in_migration());
    assert_eq!(unit.vm_id(), Some(2));
    assert_eq!(dc.migrations()[0].kind, MigrationKind::Unit);
    assert_eq!(dc.migrations()[0].time, 0.5);
}

#[test]
// The destination VM stops waiting once no incoming unit is left.
fn test_destroying_incoming_unit_ends_waiting() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("h", 8, 32, 1000.);
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 2, 8, false);
    broker.borrow_mut().create_vm(2, 2, 8, false);
    broker.borrow_mut().submit_units(
        vec![UnitSpec::new(1, owner, 1, 2), UnitSpec::new(2, owner, 1, 2)],
        false,
    );
    cloud_sim.step_until_no_events();

    let dc = cloud_sim.datacenter();
    assert_eq!(dc.borrow().unit_location(1), Some(1));
    assert_eq!(dc.borrow().unit_location(2), Some(1));
    assert_eq!(dc.borrow_mut().schedule_unit_migration(1, 2, true), Ok(0.2));
    assert_eq!(dc.borrow_mut().schedule_unit_migration(2, 2, true), Ok(0.2));

    dc.borrow_mut().destroy_unit(1).unwrap();
    assert!(dc.borrow().vm(2).unwrap().is_in_waiting());
    assert!(!dc.borrow().vm(2).unwrap().units_migrating_in().contains(&1));

    dc.borrow_mut().destroy_unit(2).unwrap();
    assert!(!dc.borrow().vm(2).unwrap().is_in_waiting());
    assert!(dc.borrow().vm(2).unwrap().units_migrating_in().is_empty());

    // the scheduled migrations find no unit and are dropped
    cloud_sim.step_until_no_events();
    let dc = dc.borrow();
    assert!(dc.fatal_error().is_none());
    assert!(dc.migrations().is_empty());
    assert!(!dc.vm(2).unwrap().is_in_waiting());
}

#[test]
fn test_destroying_source_vm_ends_waiting() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("h", 8, 32, 1000.);
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 2, 8, false);
    broker.borrow_mut().create_vm(2, 2, 8, false);
    broker
        .borrow_mut()
        .submit_units(vec![UnitSpec::new(1, owner, 1, 5)], false);
    cloud_sim.step_until_no_events();

    let dc = cloud_sim.datacenter();
    assert_eq!(dc.borrow_mut().schedule_unit_migration(1, 2, true), Ok(0.5));
    assert!(dc.borrow().vm(2).unwrap().is_in_waiting());

    broker.borrow_mut().destroy_vm(1, false);
    cloud_sim.step_until_no_events();

    let dc = dc.borrow();
    assert!(dc.vm(1).is_none());
    assert!(dc.unit(1).is_none());
    assert!(!dc.vm(2).unwrap().is_in_waiting());
    assert!(dc.vm(2).unwrap().units_migrating_in().is_empty());
    assert!(dc.fatal_error().is_none());
    assert!(dc.migrations().is_empty());
}

#[test]
// The unit is released on the source VM but does not fit into the destination VM.
fn test_unit_migration_failure_is_fatal() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("h", 8, 32, 1000.);
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 2, 8, false);
    broker.borrow_mut().create_vm(2, 1, 8, false);
    broker
        .borrow_mut()
        .submit_units(vec![UnitSpec::new(1, owner, 2, 2)], false);
    broker.borrow_mut().migrate_unit(1, 2, true);
    cloud_sim.step_until_no_events();

    assert!(!broker.borrow().unit_migrate_acks[0].success);
    {
        let dc = cloud_sim.datacenter();
        let dc = dc.borrow();
        let error = dc.fatal_error().unwrap();
        assert!(error.is_fatal());
        assert_eq!(
            *error,
            DatacenterError::MigrationFailure {
                entity: EntityRef::Unit(1),
                target: EntityRef::Vm(2),
            }
        );
        assert!(dc.migrations().is_empty());
    }

    // the halted datacenter drops further requests
    broker.borrow_mut().create_vm(3, 1, 1, true);
    cloud_sim.step_until_no_events();
    assert!(broker.borrow().vm_create_acks.is_empty());
    assert!(cloud_sim.datacenter().borrow().vm(3).is_none());
}

#[test]
fn test_vm_migration_failure_is_fatal() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("big", 8, 32, 1000.);
    let small = cloud_sim.add_host("small", 2, 4, 1000.);

    broker.borrow_mut().create_vm(1, 4, 8, false);
    broker.borrow_mut().migrate_vm(1, small, true);
    cloud_sim.step_until_no_events();

    assert!(!broker.borrow().vm_migrate_acks[0].success);
    let dc = cloud_sim.datacenter();
    let dc = dc.borrow();
    assert!(matches!(
        dc.fatal_error(),
        Some(DatacenterError::MigrationFailure {
            entity: EntityRef::Vm(1),
            ..
        })
    ));
    assert_eq!(dc.vm(1).unwrap().host_id(), None);
}

#[test]
fn test_migration_to_unknown_target_is_not_fatal() {
    let (mut cloud_sim, broker) = setup(default_config());
    cloud_sim.add_host("h", 8, 32, 1000.);

    broker.borrow_mut().create_vm(1, 2, 8, false);
    broker.borrow_mut().migrate_vm(1, 5, true);
    broker.borrow_mut().migrate_unit(3, 1, true);
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    assert!(!broker.vm_migrate_acks[0].success);
    assert!(!broker.unit_migrate_acks[0].success);
    let dc = cloud_sim.datacenter();
    let dc = dc.borrow();
    assert!(dc.fatal_error().is_none());
    assert_eq!(dc.vm_location(1), Some(0));
    assert!(!dc.vm(1).unwrap().is_in_migration());
}

#[test]
fn test_save_migration_log() {
    let log_dir = std::env::temp_dir().join("dslab-containers-test-logs");
    let mut sim_config = default_config();
    sim_config.log_path = Some(log_dir.to_string_lossy().to_string());
    sim_config.experiment_name = "migrations_test".to_string();
    let (mut cloud_sim, broker) = setup(sim_config);
    cloud_sim.add_host("h1", 4, 8, 1000.);
    let h2 = cloud_sim.add_host("h2", 4, 8, 1000.);

    broker.borrow_mut().create_vm(1, 2, 4, false);
    broker.borrow_mut().migrate_vm(1, h2, false);
    cloud_sim.step_until_no_events();

    let path = cloud_sim.save_logs().unwrap().unwrap();
    assert!(path.ends_with("migrations_test_migrations.csv"));
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "time,kind,entity_id,source_id,target_id");
    assert!(lines[1].starts_with("0"));
    assert!(lines[1].ends_with(",vm,1,0,1"));
}
