//! Explicit, platform-tagged registry of test cases.

use std::fmt;

use serde::Serialize;

use crate::{case::TestCase, error::RegistryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Both,
}

impl Platform {
    /// The host the harness runs on. Anything that is not Windows runs the Linux set.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Whether a case tagged `self` runs on `host`.
    ///
    /// A `Both` host selects every case, Windows-only ones included; the CLI only
    /// ever passes a single platform.
    pub fn matches(self, host: Platform) -> bool {
        self == Platform::Both || host == Platform::Both || self == host
    }

    fn overlaps(self, other: Platform) -> bool {
        self == Platform::Both || other == Platform::Both || self == other
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Both => "both",
        };
        f.pad(name)
    }
}

pub struct CaseDescriptor {
    pub file: String,
    pub platform: Platform,
    pub case: Box<dyn TestCase>,
}

#[derive(Default)]
pub struct CaseRegistry {
    cases: Vec<CaseDescriptor>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `case` under `file`.
    ///
    /// A file already registered for another platform keeps its first instance and
    /// is widened to `Both`; `case` is then dropped.
    pub fn register(
        &mut self,
        file: &str,
        platform: Platform,
        case: Box<dyn TestCase>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.cases.iter_mut().find(|d| d.file == file) {
            if existing.platform.overlaps(platform) {
                return Err(RegistryError::Duplicate {
                    file: file.to_string(),
                    platform: platform.to_string(),
                });
            }
            existing.platform = Platform::Both;
            return Ok(());
        }
        self.cases.push(CaseDescriptor {
            file: file.to_string(),
            platform,
            case,
        });
        Ok(())
    }

    pub fn add_windows(&mut self, file: &str, case: Box<dyn TestCase>) -> Result<(), RegistryError> {
        self.register(file, Platform::Windows, case)
    }

    pub fn add_linux(&mut self, file: &str, case: Box<dyn TestCase>) -> Result<(), RegistryError> {
        self.register(file, Platform::Linux, case)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn get(&self, file: &str) -> Option<&CaseDescriptor> {
        self.cases.iter().find(|d| d.file == file)
    }

    /// Descriptors runnable on `host`, in registration order.
    pub fn cases_for(&mut self, host: Platform) -> impl Iterator<Item = &mut CaseDescriptor> {
        self.cases
            .iter_mut()
            .filter(move |d| d.platform.matches(host))
    }
}
