//! Sequential test harness for database client cases.
//!
//! Cases implement [`case::TestCase`] and are registered in a
//! [`registry::CaseRegistry`] tagged by platform. The [`runner`] drives each
//! one through `init`, `run` and `stop`, always stopping a case that started.

pub mod case;
pub mod cases;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod process;
pub mod registry;
pub mod runner;
pub mod sql;

pub use case::{CaseContext, TestCase};
pub use error::{CaseError, RegistryError, SqlError};
pub use registry::{CaseRegistry, Platform};
