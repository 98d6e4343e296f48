//! Simulation facade wiring the kernel, the datacenter and its policies.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use sugars::{rc, refcell};

use dslab_core::component::Id;
use dslab_core::context::SimulationContext;
use dslab_core::simulation::Simulation;

use crate::broker::Broker;
use crate::core::allocation_policy::{AllocationPolicy, PlacementPolicy};
use crate::core::config::{ConfigError, SimulationConfig};
use crate::core::datacenter::Datacenter;
use crate::core::events::datacenter::CheckTaskCompletion;
use crate::core::placement_algorithm::placement_algorithm_resolver;
use crate::core::storage::StorageCatalog;

/// Core speed of hosts whose config omits it.
const DEFAULT_CORE_SPEED: f64 = 1000.;

pub struct ContainerSimulation {
    datacenter: Rc<RefCell<Datacenter>>,
    datacenter_id: Id,
    vm_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
    unit_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
    brokers: BTreeMap<Id, Rc<RefCell<Broker>>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl ContainerSimulation {
    /// Creates the datacenter with policies and hosts described by the config.
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Result<Self, ConfigError> {
        let vm_allocation_policy: Rc<RefCell<dyn AllocationPolicy>> = rc!(refcell!(PlacementPolicy::new(
            placement_algorithm_resolver(&sim_config.vm_allocation_policy)?
        )));
        let unit_allocation_policy: Rc<RefCell<dyn AllocationPolicy>> = rc!(refcell!(PlacementPolicy::new(
            placement_algorithm_resolver(&sim_config.unit_allocation_policy)?
        )));
        let storage = StorageCatalog::from_config(sim_config.storage_transfer_rate, &sim_config.files);
        let sim_config = rc!(sim_config);

        let datacenter = rc!(refcell!(Datacenter::new(
            vm_allocation_policy.clone(),
            unit_allocation_policy.clone(),
            Box::new(storage),
            sim.create_context("datacenter"),
            sim_config.clone(),
        )));
        let datacenter_id = sim.add_handler("datacenter", datacenter.clone());
        let ctx = sim.create_context("simulation");

        let mut simulation = Self {
            datacenter,
            datacenter_id,
            vm_allocation_policy,
            unit_allocation_policy,
            brokers: BTreeMap::new(),
            sim,
            ctx,
            sim_config: sim_config.clone(),
        };
        for host_config in &sim_config.hosts {
            for name in host_config.host_names() {
                simulation.add_host(
                    &name,
                    host_config.cores,
                    host_config.memory,
                    host_config.core_speed.unwrap_or(DEFAULT_CORE_SPEED),
                );
            }
        }
        Ok(simulation)
    }

    pub fn add_host(&mut self, name: &str, cores: u32, memory: u64, core_speed: f64) -> u32 {
        self.datacenter.borrow_mut().add_host(name, cores, memory, core_speed)
    }

    /// Creates a broker component sending requests to the datacenter.
    pub fn add_broker(&mut self, name: &str) -> Rc<RefCell<Broker>> {
        let broker = rc!(refcell!(Broker::new(self.datacenter_id, self.sim.create_context(name))));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker.clone());
        broker
    }

    pub fn broker(&self, id: Id) -> Option<Rc<RefCell<Broker>>> {
        self.brokers.get(&id).cloned()
    }

    pub fn datacenter(&self) -> Rc<RefCell<Datacenter>> {
        self.datacenter.clone()
    }

    pub fn datacenter_id(&self) -> Id {
        self.datacenter_id
    }

    pub fn vm_allocation_policy(&self) -> Rc<RefCell<dyn AllocationPolicy>> {
        self.vm_allocation_policy.clone()
    }

    pub fn unit_allocation_policy(&self) -> Rc<RefCell<dyn AllocationPolicy>> {
        self.unit_allocation_policy.clone()
    }

    /// Replaces the VM allocation policy of the datacenter.
    pub fn set_vm_allocation_policy(&mut self, policy: Rc<RefCell<dyn AllocationPolicy>>) {
        self.datacenter.borrow_mut().set_vm_allocation_policy(policy.clone());
        self.vm_allocation_policy = policy;
    }

    /// Replaces the unit allocation policy of the datacenter.
    pub fn set_unit_allocation_policy(&mut self, policy: Rc<RefCell<dyn AllocationPolicy>>) {
        self.datacenter.borrow_mut().set_unit_allocation_policy(policy.clone());
        self.unit_allocation_policy = policy;
    }

    /// Asks the datacenter to return finished tasks at the current time.
    pub fn check_task_completion(&mut self) {
        self.ctx.emit_now(CheckTaskCompletion {}, self.datacenter_id);
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    /// Returns the main simulation context.
    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Performs the specified number of steps through the simulation.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    /// Returns a random float in the range _[0, 1)_ from the seeded simulation generator.
    pub fn rand(&mut self) -> f64 {
        self.sim.rand()
    }

    /// Saves the migration log to `<log_path>/<experiment_name>_migrations.csv` if the log path is configured.
    /// Returns the path of the saved file.
    pub fn save_logs(&self) -> Result<Option<String>, csv::Error> {
        let dir = match &self.sim_config.log_path {
            Some(dir) => dir,
            None => return Ok(None),
        };
        std::fs::create_dir_all(dir)?;
        let path = Path::new(dir)
            .join(format!("{}_migrations.csv", self.sim_config.experiment_name))
            .to_string_lossy()
            .to_string();
        self.datacenter.borrow().save_migration_log(&path)?;
        Ok(Some(path))
    }
}
