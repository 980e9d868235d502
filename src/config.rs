use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

const MANIFEST_FILE: &str = "package.json";
const INSTALL_ROOT: &str = "node_modules";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("bad manifest format in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("manifest {0} has no package name")]
    MissingName(PathBuf),

    #[error("failed to determine the working directory: {0}")]
    CurrentDir(io::Error),
}

/// The `tsds` section of the package manifest.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Entry point handed to the documentation generator.
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    name: Option<String>,
    tsds: Option<Config>,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Working directory of the package. Defaults to the process directory.
    pub cwd: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub install_path: Option<PathBuf>,
    /// Extra environment for the generator process.
    pub env: Vec<(String, String)>,
}

impl Options {
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    /// Always absolute: symlink targets and spawned programs are resolved
    /// from other directories than ours.
    pub fn cwd(&self) -> Result<PathBuf, ConfigError> {
        match &self.cwd {
            Some(cwd) => std::path::absolute(cwd).map_err(ConfigError::CurrentDir),
            None => std::env::current_dir().map_err(ConfigError::CurrentDir),
        }
    }

    fn manifest_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.cwd()?.join(MANIFEST_FILE)),
        }
    }
}

fn read_manifest(path: &Path) -> Result<Option<Manifest>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let manifest =
        serde_json::from_str::<Manifest>(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(manifest))
}

/// Loads the `tsds` section. A missing manifest or section yields `None`.
pub fn load_config(options: &Options) -> Result<Option<Config>, ConfigError> {
    let path = options.manifest_path()?;
    Ok(read_manifest(&path)?.and_then(|m| m.tsds))
}

/// Where the package would live if it were installed as a dependency of itself.
pub fn install_path(options: &Options) -> Result<PathBuf, ConfigError> {
    let cwd = options.cwd()?;
    if let Some(path) = &options.install_path {
        return Ok(cwd.join(path));
    }

    let path = options.manifest_path()?;
    let name = read_manifest(&path)?
        .and_then(|m| m.name)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ConfigError::MissingName(path.clone()))?;

    // Scoped names ("@scope/pkg") nest one level deeper.
    let mut install = cwd.join(INSTALL_ROOT);
    for part in name.split('/') {
        install.push(part);
    }
    Ok(install)
}
