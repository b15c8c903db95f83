use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "harness.toml";

/// Harness configuration read from `<workspace>/harness.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub log_sql: bool,
    #[serde(default)]
    pub sql: SqlClientSettings,
    #[serde(default)]
    pub client_config: ClientConfigSettings,
    #[serde(default)]
    pub cases: BTreeMap<String, CaseSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SqlClientSettings {
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for SqlClientSettings {
    fn default() -> Self {
        Self {
            client: default_client(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfigSettings {
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
    #[serde(default = "default_make")]
    pub make_program: String,
    #[serde(default)]
    pub make_args: Vec<String>,
    #[serde(default = "default_binary")]
    pub binary: String,
}

impl Default for ClientConfigSettings {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            make_program: default_make(),
            make_args: Vec::new(),
            binary: default_binary(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct CaseSettings {
    #[serde(default)]
    pub allow_failure: bool,
}

impl Manifest {
    pub fn allow_failure(&self, case: &str) -> bool {
        self.cases.get(case).is_some_and(|c| c.allow_failure)
    }
}

fn default_client() -> String {
    "taos".into()
}

fn default_project_dir() -> PathBuf {
    PathBuf::from("../script/api")
}

fn default_make() -> String {
    "make".into()
}

fn default_binary() -> String {
    "clientcfgtest".into()
}

pub fn manifest_path(workspace: &Path) -> PathBuf {
    workspace.join(MANIFEST_FILE)
}

/// Loads the manifest, falling back to defaults when the file does not exist.
pub fn load_manifest(workspace: &Path) -> Result<Manifest> {
    let path = manifest_path(workspace);
    if !path.exists() {
        log::debug!("no {} found, using defaults", path.display());
        return Ok(Manifest::default());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse manifest {}", path.display()))
}
