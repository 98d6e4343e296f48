use std::time::Instant;

use clap::Parser;
use env_logger::Builder;

use dslab_containers::core::config::SimulationConfig;
use dslab_containers::core::events::task::{TaskMoveRequest, TaskPauseRequest, TaskResumeRequest};
use dslab_containers::core::task::{Task, TaskRef};
use dslab_containers::core::task_scheduler::TaskSchedulerKind;
use dslab_containers::core::unit::UnitSpec;
use dslab_containers::simulation::ContainerSimulation;
use dslab_core::simulation::Simulation;
use dslab_core::{log_error, log_info};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to simulation config
    #[clap(short, long, default_value = "config.yaml")]
    config: String,

    /// Random seed for task lengths
    #[clap(long, default_value_t = 123)]
    seed: u64,
}

fn main() {
    Builder::from_default_env()
        .format_timestamp(None)
        .format_target(false)
        .format_level(false)
        .init();

    let args = Args::parse();
    let sim_config = match SimulationConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load config: {}", error);
            std::process::exit(1);
        }
    };
    let mut cloud_sim = match ContainerSimulation::new(Simulation::new(args.seed), sim_config) {
        Ok(cloud_sim) => cloud_sim,
        Err(error) => {
            eprintln!("Failed to build simulation: {}", error);
            std::process::exit(1);
        }
    };
    let broker = cloud_sim.add_broker("broker");
    let owner = broker.borrow().id;
    let t = Instant::now();

    // infrastructure
    broker.borrow_mut().create_vm(1, 4, 8, true);
    broker.borrow_mut().create_vm(2, 2, 4, true);
    broker.borrow_mut().create_vm(3, 2, 4, true);
    broker.borrow_mut().submit_units(
        vec![
            UnitSpec::new(1, owner, 2, 2),
            UnitSpec::new(2, owner, 1, 1).with_scheduler(TaskSchedulerKind::SpaceShared),
            UnitSpec::new(3, owner, 2, 2),
        ],
        true,
    );
    cloud_sim.step_until_no_events();

    let placements: Vec<(u32, u32)> = broker
        .borrow()
        .unit_create_acks
        .iter()
        .filter_map(|ack| ack.vm_id.map(|vm_id| (ack.unit_id, vm_id)))
        .collect();
    for (unit_id, vm_id) in &placements {
        log_info!(cloud_sim.context(), "unit #{} runs on vm #{}", unit_id, vm_id);
    }
    let vm_of = |unit_id: u32| placements.iter().find(|(id, _)| *id == unit_id).map(|(_, vm)| *vm);
    let (vm1, vm2, vm3) = match (vm_of(1), vm_of(2), vm_of(3)) {
        (Some(vm1), Some(vm2), Some(vm3)) => (vm1, vm2, vm3),
        _ => {
            log_error!(cloud_sim.context(), "not all units were placed");
            std::process::exit(1);
        }
    };

    // workload, task lengths vary within [0.5, 1.5) of the base length depending on the seed
    let lengths: Vec<f64> = [20000., 30000., 10000., 10000., 40000.]
        .iter()
        .map(|base| base * (0.5 + cloud_sim.rand()))
        .collect();
    let tasks = vec![
        Task::new(1, owner, lengths[0]).bind(vm1, 1),
        Task::new(2, owner, lengths[1]).bind(vm1, 1),
        Task::new(3, owner, lengths[2])
            .bind(vm2, 2)
            .with_input_files(vec!["dataset.csv".to_string()]),
        Task::new(4, owner, lengths[3]).bind(vm2, 2),
        Task::new(5, owner, lengths[4])
            .bind(vm3, 3)
            .with_input_files(vec!["model.bin".to_string(), "dataset.csv".to_string()]),
    ];
    for task in tasks {
        broker.borrow_mut().submit_task(task, true);
    }
    let task_ref = |task_id: u32, vm_id: u32, unit_id: u32| TaskRef {
        task_id,
        owner,
        vm_id,
        unit_id,
    };
    broker.borrow_mut().send(
        TaskPauseRequest {
            payload: task_ref(2, vm1, 1).into(),
            ack: true,
        },
        3.,
    );
    broker.borrow_mut().send(
        TaskResumeRequest {
            payload: task_ref(2, vm1, 1).into(),
            ack: true,
        },
        8.,
    );
    let datacenter_id = cloud_sim.datacenter_id();
    broker.borrow_mut().send(
        TaskMoveRequest {
            task: task_ref(4, vm2, 2),
            vm_id: vm3,
            unit_id: 3,
            datacenter: datacenter_id,
            ack: true,
        },
        5.,
    );

    // move the VM of unit 1 to a host without VMs, if there is one
    let datacenter = cloud_sim.datacenter();
    let free_host = datacenter
        .borrow()
        .hosts()
        .find(|host| host.vms().is_empty())
        .map(|host| host.id);
    if let Some(host_id) = free_host {
        match datacenter.borrow_mut().schedule_vm_migration(vm1, host_id) {
            Ok(delay) => log_info!(
                cloud_sim.context(),
                "vm #{} will be migrated to host #{} in {:.2}",
                vm1,
                host_id,
                delay
            ),
            Err(error) => log_error!(cloud_sim.context(), "failed to schedule migration: {}", error),
        }
    }

    cloud_sim.step_until_no_events();
    broker.borrow_mut().request_characteristics();
    cloud_sim.step_until_no_events();

    let broker = broker.borrow();
    let mut total_cost = 0.;
    for (time, task) in &broker.returned_tasks {
        total_cost += task.processing_cost();
        log_info!(
            cloud_sim.context(),
            "task #{} returned at {:.2}: status {}, unit #{}, cpu time {:.2}, cost {:.2}",
            task.id,
            time,
            task.status(),
            task.unit_id.unwrap_or_default(),
            task.cpu_time(),
            task.processing_cost()
        );
    }
    log_info!(cloud_sim.context(), "total processing cost: {:.2}", total_cost);
    if let Some(characteristics) = broker.characteristics.last() {
        log_info!(
            cloud_sim.context(),
            "datacenter: {} hosts, {} cores, {} memory, {:.0} MIPS",
            characteristics.host_count,
            characteristics.cores,
            characteristics.memory,
            characteristics.total_mips
        );
    }
    for record in datacenter.borrow().migrations() {
        log_info!(
            cloud_sim.context(),
            "{} #{} migrated to #{} at {:.2}",
            record.kind,
            record.entity_id,
            record.target_id,
            record.time
        );
    }

    match cloud_sim.save_logs() {
        Ok(Some(path)) => log_info!(cloud_sim.context(), "migration log saved to {}", path),
        Ok(None) => {}
        Err(error) => log_error!(cloud_sim.context(), "failed to save logs: {}", error),
    }
    if let Some(error) = datacenter.borrow().fatal_error() {
        log_error!(cloud_sim.context(), "simulation halted: {}", error);
        std::process::exit(1);
    }
    println!(
        "Processed {} events in {:.2?} ({:.0} events/sec)",
        cloud_sim.event_count(),
        t.elapsed(),
        cloud_sim.event_count() as f64 / t.elapsed().as_secs_f64()
    );
}
