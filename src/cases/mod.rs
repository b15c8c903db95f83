pub mod client_config;

use crate::{
    error::RegistryError,
    manifest::Manifest,
    registry::{CaseRegistry, Platform},
};

/// Registers every bundled case with the settings from `manifest`.
pub fn register_all(registry: &mut CaseRegistry, manifest: &Manifest) -> Result<(), RegistryError> {
    registry.register(
        client_config::FILE,
        Platform::Both,
        Box::new(client_config::ConfigTestCase::new(
            manifest.client_config.clone(),
        )),
    )
}
