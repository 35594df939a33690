//! Vendor source roots contributed by bundles.

use std::path::PathBuf;

use strata_common::BuildEnv;
use strata_config::BundleSpec;

/// A bundle's contribution to the root list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Bundle name.
    pub name: String,
    /// Directory whose sources join the build as a root.
    pub vendor_dir: PathBuf,
}

/// A bundle provider could not answer.
#[derive(Debug, thiserror::Error)]
#[error("bundle provider unavailable: {reason}")]
pub struct BundleError {
    /// Description of the failure.
    pub reason: String,
}

/// Supplies the bundles active for an environment.
pub trait BundleProvider: Send + Sync {
    /// Returns every bundle applying to `env`, in root order.
    fn fetch_all_bundles(&self, env: BuildEnv) -> Result<Vec<Bundle>, BundleError>;
}

/// Serves the `[[bundles]]` tables of `strata.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBundleProvider {
    specs: Vec<BundleSpec>,
}

impl ConfigBundleProvider {
    /// Creates a provider over already-resolved bundle specs.
    pub fn new(specs: Vec<BundleSpec>) -> Self {
        Self { specs }
    }
}

impl BundleProvider for ConfigBundleProvider {
    fn fetch_all_bundles(&self, env: BuildEnv) -> Result<Vec<Bundle>, BundleError> {
        Ok(self
            .specs
            .iter()
            .filter(|spec| spec.applies_to(env))
            .map(|spec| Bundle {
                name: spec.name.clone(),
                vendor_dir: PathBuf::from(&spec.vendor),
            })
            .collect())
    }
}
