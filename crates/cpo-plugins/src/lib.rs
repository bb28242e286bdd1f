//! Dependency plugins for the cpo CLI
//!
//! - `ibmcloud`: IBM Cloud CLI
//! - `oc`: OpenShift CLI
//! - `openshift-install`: OpenShift installer

pub mod archived;
pub mod ibmcloud;
pub mod openshift;

pub use archived::{ArchivedBinary, BinaryDefinition, Definition};
pub use ibmcloud::IbmCloudCli;
pub use openshift::{OpenShiftCli, OpenShiftInstall};

use cpo_deps::{DependencyManager, Result};

/// Register every built-in plugin, in update order
pub fn register_defaults(manager: &mut DependencyManager) -> Result<()> {
    manager.register::<IbmCloudCli>()?;
    manager.register::<OpenShiftCli>()?;
    manager.register::<OpenShiftInstall>()?;
    Ok(())
}
