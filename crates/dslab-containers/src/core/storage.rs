//! Estimation of input file transfer times.

use std::collections::HashMap;

use crate::core::config::FileConfig;

/// Estimates the time needed to deliver task input files to a compute unit.
pub trait TransferTimeEstimator {
    fn estimate(&self, files: &[String]) -> f64;
}

/// Catalog of files stored in the datacenter storage with a fixed transfer rate.
/// Files missing from the catalog are considered local and take no time to transfer.
#[derive(Clone, Debug)]
pub struct StorageCatalog {
    transfer_rate: f64,
    files: HashMap<String, f64>,
}

impl StorageCatalog {
    /// Creates empty catalog, `transfer_rate` is in MB/s.
    pub fn new(transfer_rate: f64) -> Self {
        Self {
            transfer_rate,
            files: HashMap::new(),
        }
    }

    pub fn from_config(transfer_rate: f64, files: &[FileConfig]) -> Self {
        let mut catalog = Self::new(transfer_rate);
        for file in files {
            catalog.add_file(&file.name, file.size);
        }
        catalog
    }

    pub fn add_file(&mut self, name: &str, size: f64) {
        self.files.insert(name.to_string(), size);
    }

    pub fn file_size(&self, name: &str) -> Option<f64> {
        self.files.get(name).copied()
    }
}

impl TransferTimeEstimator for StorageCatalog {
    fn estimate(&self, files: &[String]) -> f64 {
        if self.transfer_rate <= 0. {
            return 0.;
        }
        files.iter().filter_map(|name| self.file_size(name)).sum::<f64>() / self.transfer_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate() {
        let mut catalog = StorageCatalog::new(50.);
        catalog.add_file("input.dat", 100.);
        catalog.add_file("model.bin", 25.);
        assert_eq!(catalog.estimate(&[]), 0.);
        assert_eq!(catalog.estimate(&["input.dat".to_string()]), 2.);
        assert_eq!(
            catalog.estimate(&["input.dat".to_string(), "model.bin".to_string(), "missing".to_string()]),
            2.5
        );
    }
}
