//! Simulation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced while loading simulation config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown placement algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("invalid value {value:?} of option {option}")]
    InvalidOption { option: String, value: String },
}

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawSimulationConfig {
    pub vm_allocation_policy: Option<String>,
    pub unit_allocation_policy: Option<String>,
    pub cost_per_second: Option<f64>,
    pub cost_per_bw: Option<f64>,
    pub network_throughput: Option<f64>,
    pub scheduling_interval: Option<f64>,
    pub storage_transfer_rate: Option<f64>,
    pub files: Option<Vec<FileConfig>>,
    pub hosts: Option<Vec<HostConfig>>,
    pub experiment_name: Option<String>,
    pub log_path: Option<String>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Number of host CPU cores.
    pub cores: u32,
    /// Host memory capacity.
    pub memory: u64,
    /// Processing speed of a single core in MIPS.
    pub core_speed: Option<f64>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl HostConfig {
    /// Returns names of all hosts described by this config.
    pub fn host_names(&self) -> Vec<String> {
        let count = self.count.unwrap_or(1);
        if count == 1 {
            vec![self
                .name
                .clone()
                .or_else(|| self.name_prefix.clone())
                .unwrap_or_else(|| "host".to_string())]
        } else {
            let prefix = self.name_prefix.clone().or_else(|| self.name.clone()).unwrap_or_else(|| "host".to_string());
            (1..=count).map(|i| format!("{}{}", prefix, i)).collect()
        }
    }
}

/// File stored in the datacenter storage which tasks can use as input.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct FileConfig {
    pub name: String,
    /// File size in MB.
    pub size: f64,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Placement algorithm of the VM → host allocation policy.
    pub vm_allocation_policy: String,
    /// Placement algorithm of the unit → VM allocation policy.
    pub unit_allocation_policy: String,
    /// Price of one second of task processing.
    pub cost_per_second: f64,
    /// Price of one MB transferred to a task.
    pub cost_per_bw: f64,
    /// Network throughput in MB/s, used to compute migration delay from entity memory size.
    pub network_throughput: f64,
    /// If positive, the datacenter wakes up at least this often while tasks are running.
    pub scheduling_interval: f64,
    /// Storage transfer rate in MB/s.
    pub storage_transfer_rate: f64,
    /// Files available in the datacenter storage.
    pub files: Vec<FileConfig>,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
    pub experiment_name: String,
    /// Directory for experiment logs, logs are not saved if not set.
    pub log_path: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(file_name).map_err(|source| ConfigError::Io {
            path: file_name.to_string(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let raw: RawSimulationConfig = serde_yaml::from_str(data)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            vm_allocation_policy: raw.vm_allocation_policy.unwrap_or_else(|| "FirstFit".to_string()),
            unit_allocation_policy: raw.unit_allocation_policy.unwrap_or_else(|| "FirstFit".to_string()),
            cost_per_second: raw.cost_per_second.unwrap_or(3.0),
            cost_per_bw: raw.cost_per_bw.unwrap_or(0.05),
            network_throughput: raw.network_throughput.unwrap_or(1.0),
            scheduling_interval: raw.scheduling_interval.unwrap_or(0.),
            storage_transfer_rate: raw.storage_transfer_rate.unwrap_or(100.),
            files: raw.files.unwrap_or_default(),
            hosts: raw.hosts.unwrap_or_default(),
            experiment_name: raw.experiment_name.unwrap_or_else(|| "experiment".to_string()),
            log_path: raw.log_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::from_yaml("hosts: []").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.vm_allocation_policy, "FirstFit");
        assert_eq!(config.cost_per_second, 3.0);
        assert_eq!(config.network_throughput, 1.0);
        assert_eq!(config.scheduling_interval, 0.);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_hosts() {
        let config = SimulationConfig::from_yaml(
            r#"
vm_allocation_policy: BestFit
hosts:
  - name: big
    cores: 16
    memory: 64
  - name_prefix: small
    cores: 4
    memory: 8
    core_speed: 500
    count: 3
"#,
        )
        .unwrap();
        assert_eq!(config.vm_allocation_policy, "BestFit");
        assert_eq!(config.hosts[0].host_names(), vec!["big"]);
        assert_eq!(config.hosts[1].host_names(), vec!["small1", "small2", "small3"]);
        assert_eq!(config.hosts[1].core_speed, Some(500.));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            SimulationConfig::from_yaml("hosts: 5"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SimulationConfig::from_file("no-such-config.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
