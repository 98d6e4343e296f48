use sugars::{rc, refcell};

use dslab_core::simulation::Simulation;

use dslab_containers::core::allocation_policy::{AllocationPolicy, PlacementPolicy};
use dslab_containers::core::common::Allocation;
use dslab_containers::core::config::{ConfigError, SimulationConfig};
use dslab_containers::core::placement_algorithm::{placement_algorithm_resolver, PlacementAlgorithm};
use dslab_containers::core::placement_algorithms::best_fit::BestFit;
use dslab_containers::core::placement_algorithms::first_fit::FirstFit;
use dslab_containers::core::placement_algorithms::first_fit_threshold::FirstFitThreshold;
use dslab_containers::core::placement_algorithms::worst_fit::WorstFit;
use dslab_containers::core::resource_pool::ResourcePool;
use dslab_containers::core::unit::UnitSpec;
use dslab_containers::simulation::ContainerSimulation;

// Three targets with 8, 4 and 6 cores, two cores of the first one are already taken.
// Available cores: 6, 4, 6.
fn build_pool() -> ResourcePool {
    let mut pool = ResourcePool::new();
    pool.add_target(0, 8, 16);
    pool.add_target(1, 4, 16);
    pool.add_target(2, 6, 16);
    pool.allocate(
        &Allocation {
            id: 100,
            cpu_usage: 2,
            memory_usage: 2,
        },
        0,
    );
    pool
}

fn request() -> Allocation {
    Allocation {
        id: 1,
        cpu_usage: 3,
        memory_usage: 4,
    }
}

#[test]
fn test_first_fit() {
    let pool = build_pool();
    let algorithm = FirstFit::new();
    assert_eq!(algorithm.select_target(&request(), &[0, 1, 2], &pool), Some(0));
    assert_eq!(algorithm.select_target(&request(), &[9, 2, 0], &pool), Some(2));
    assert_eq!(algorithm.select_target(&request(), &[], &pool), None);
}

#[test]
fn test_best_fit() {
    let pool = build_pool();
    let algorithm = BestFit::new();
    assert_eq!(algorithm.select_target(&request(), &[0, 1, 2], &pool), Some(1));
    // ties go to the earlier candidate
    assert_eq!(algorithm.select_target(&request(), &[2, 0], &pool), Some(2));
}

#[test]
fn test_worst_fit() {
    let pool = build_pool();
    let algorithm = WorstFit::new();
    assert_eq!(algorithm.select_target(&request(), &[0, 1, 2], &pool), Some(0));
    assert_eq!(algorithm.select_target(&request(), &[1, 2, 0], &pool), Some(2));
}

#[test]
fn test_nothing_fits() {
    let pool = build_pool();
    let big = Allocation {
        id: 2,
        cpu_usage: 7,
        memory_usage: 1,
    };
    assert_eq!(FirstFit::new().select_target(&big, &[0, 1, 2], &pool), None);
    assert_eq!(BestFit::new().select_target(&big, &[0, 1, 2], &pool), None);
    assert_eq!(WorstFit::new().select_target(&big, &[0, 1, 2], &pool), None);
}

#[test]
fn test_first_fit_threshold() {
    let pool = build_pool();
    // load after placement: 5/8 and 3/4 exceed the threshold, 3/6 does not
    let algorithm = placement_algorithm_resolver("FirstFitThreshold[threshold=0.5]").unwrap();
    assert_eq!(algorithm.select_target(&request(), &[0, 1, 2], &pool), Some(2));
    let algorithm = placement_algorithm_resolver("FirstFitThreshold[threshold=0.7]").unwrap();
    assert_eq!(algorithm.select_target(&request(), &[0, 1, 2], &pool), Some(0));
}

#[test]
fn test_resolver_errors() {
    assert!(matches!(
        placement_algorithm_resolver("Random"),
        Err(ConfigError::UnknownAlgorithm(name)) if name == "Random"
    ));
    assert!(matches!(
        placement_algorithm_resolver("FirstFitThreshold[threshold=high]"),
        Err(ConfigError::InvalidOption { option, value }) if option == "threshold" && value == "high"
    ));
    assert!(matches!(
        placement_algorithm_resolver("FirstFitThreshold"),
        Err(ConfigError::InvalidOption { .. })
    ));
}

#[test]
fn test_placement_policy() {
    let mut policy = PlacementPolicy::new(Box::new(FirstFit::new()));
    policy.add_target(0, 4, 8);
    let alloc = Allocation {
        id: 1,
        cpu_usage: 2,
        memory_usage: 4,
    };

    assert_eq!(policy.allocate(&alloc, &[0]), Some(0));
    assert_eq!(policy.allocate(&alloc, &[0]), None);
    assert_eq!(policy.locate(1), Some(0));
    assert_eq!(policy.pool().get_available_cpu(0), 2);
    assert_eq!(policy.pool().get_available_memory(0), 4);

    let too_big = Allocation {
        id: 2,
        cpu_usage: 3,
        memory_usage: 1,
    };
    assert_eq!(policy.allocate(&too_big, &[0]), None);
    assert_eq!(policy.locate(2), None);

    assert_eq!(policy.deallocate(1), Some(0));
    assert_eq!(policy.deallocate(1), None);
    assert_eq!(policy.pool().get_available_cpu(0), 4);

    assert_eq!(policy.allocate(&too_big, &[0]), Some(0));
    policy.remove_target(0);
    assert_eq!(policy.locate(2), None);
    assert!(!policy.pool().contains_target(0));
}

#[test]
// The threshold algorithm rejects the placement, restore only checks capacity.
fn test_placement_policy_restore() {
    let mut policy = PlacementPolicy::new(Box::new(FirstFitThreshold::new(0.1)));
    policy.add_target(0, 4, 8);
    let alloc = Allocation {
        id: 1,
        cpu_usage: 2,
        memory_usage: 4,
    };
    assert_eq!(policy.allocate(&alloc, &[0]), None);

    assert!(policy.restore(&alloc, 0));
    assert!(!policy.restore(&alloc, 0));
    assert_eq!(policy.locate(1), Some(0));
    assert_eq!(policy.pool().get_available_cpu(0), 2);

    let too_big = Allocation {
        id: 2,
        cpu_usage: 3,
        memory_usage: 1,
    };
    assert!(!policy.restore(&too_big, 0));
    assert!(!policy.restore(&too_big, 7));
    assert_eq!(policy.locate(2), None);
}

#[test]
// VM 1 stays on h1 in the new policy, VM 2 goes to the emptier host h2.
fn test_vm_allocation_policy_replacement() {
    let sim = Simulation::new(123);
    let mut cloud_sim = ContainerSimulation::new(sim, SimulationConfig::default()).unwrap();
    let h1 = cloud_sim.add_host("h1", 4, 8, 1000.);
    let h2 = cloud_sim.add_host("h2", 4, 8, 1000.);
    let broker = cloud_sim.add_broker("broker");

    broker.borrow_mut().create_vm(1, 2, 4, false);
    cloud_sim.step_until_no_events();

    let policy = rc!(refcell!(PlacementPolicy::new(Box::new(WorstFit::new()))));
    cloud_sim.set_vm_allocation_policy(policy.clone());
    assert_eq!(policy.borrow().locate(1), Some(h1));
    assert_eq!(policy.borrow().pool().get_available_cpu(h1), 2);

    broker.borrow_mut().create_vm(2, 1, 2, false);
    cloud_sim.step_until_no_events();

    assert_eq!(policy.borrow().locate(2), Some(h2));
    assert_eq!(cloud_sim.datacenter().borrow().vm_location(2), Some(h2));
    assert_eq!(cloud_sim.vm_allocation_policy().borrow().locate(2), Some(h2));
}

#[test]
fn test_rejecting_policy_replacement_keeps_placements() {
    let sim = Simulation::new(123);
    let mut cloud_sim = ContainerSimulation::new(sim, SimulationConfig::default()).unwrap();
    let h1 = cloud_sim.add_host("h1", 4, 8, 1000.);
    let broker = cloud_sim.add_broker("broker");
    let owner = broker.borrow().id;

    broker.borrow_mut().create_vm(1, 2, 4, false);
    cloud_sim.step_until_no_events();
    broker.borrow_mut().submit_units(vec![UnitSpec::new(1, owner, 1, 1)], false);
    cloud_sim.step_until_no_events();

    let vm_policy = rc!(refcell!(PlacementPolicy::new(Box::new(FirstFitThreshold::new(0.1)))));
    cloud_sim.set_vm_allocation_policy(vm_policy.clone());
    assert_eq!(vm_policy.borrow().locate(1), Some(h1));
    assert_eq!(vm_policy.borrow().pool().get_available_cpu(h1), 2);
    assert_eq!(vm_policy.borrow().pool().get_available_memory(h1), 4);

    let unit_policy = rc!(refcell!(PlacementPolicy::new(Box::new(FirstFitThreshold::new(0.1)))));
    cloud_sim.set_unit_allocation_policy(unit_policy.clone());
    assert_eq!(unit_policy.borrow().locate(1), Some(1));
    assert_eq!(unit_policy.borrow().pool().get_available_cpu(1), 1);

    let datacenter = cloud_sim.datacenter();
    let datacenter = datacenter.borrow();
    assert_eq!(datacenter.vm_location(1), datacenter.vm(1).unwrap().host_id());
    assert_eq!(datacenter.unit_location(1), datacenter.unit(1).unwrap().vm_id());
    assert_eq!(datacenter.vm_location(1), Some(h1));
}
