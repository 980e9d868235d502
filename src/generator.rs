use std::{
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

const LOCAL_BIN_DIR: &str = "node_modules/.bin";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("could not find executable `{0}`")]
    NotFound(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn { program: PathBuf, source: io::Error },

    #[error("{program} exited with {status}")]
    Failed { program: PathBuf, status: ExitStatus },
}

/// Finds an executable: explicit paths first, then the package's local
/// `node_modules/.bin`, then `PATH`. Files without the exec bit don't count.
pub fn resolve_bin(name: &str, cwd: &Path) -> Result<PathBuf, GeneratorError> {
    let not_found = |_| GeneratorError::NotFound(name.to_string());

    // which resolves names containing a separator against `cwd` only.
    if Path::new(name).components().count() > 1 {
        return which::which_in(name, None::<&str>, cwd).map_err(not_found);
    }

    which::which_in(name, Some(cwd.join(LOCAL_BIN_DIR)), cwd)
        .or_else(|_| which::which(name))
        .map_err(not_found)
}

/// Runs `program` to completion with inherited stdio.
pub async fn spawn(
    program: &Path,
    args: &[String],
    cwd: &Path,
    env: &[(String, String)],
) -> Result<(), GeneratorError> {
    debug!(program=%program.display(), ?args, "Spawning.");
    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| GeneratorError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(GeneratorError::Failed {
            program: program.to_path_buf(),
            status,
        });
    }
    Ok(())
}
