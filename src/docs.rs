use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    config::{ConfigError, Options, install_path, load_config},
    flags::parse_flags,
    generator::{self, GeneratorError, resolve_bin},
    link::LinkGuard,
};

pub const DEFAULT_GENERATOR: &str = "typedoc";
const DEST_DIR: &str = "docs";
const GENERATOR_FLAGS: [&str; 2] = ["--excludeExternals", "true"];

#[derive(Debug, Error)]
pub enum DocsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to resolve documentation generator: {0}")]
    Resolution(GeneratorError),

    #[error("failed to remove {path}: {source}")]
    RemoveDest { path: PathBuf, source: io::Error },

    #[error("failed to create {path}: {source}")]
    CreateDest { path: PathBuf, source: io::Error },

    #[error("failed to link {link} to {target}: {source}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        source: io::Error,
    },

    #[error("documentation generation failed: {0}")]
    Generate(GeneratorError),

    #[error("delegated docs run failed: {0}")]
    Delegate(GeneratorError),
}

/// How a run ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SkippedNoConfig,
    SkippedNoSource,
    DryRun,
    Generated { dest: PathBuf },
    Delegated,
}

/// Where the pipeline executes.
#[derive(Debug, Clone, Default)]
pub enum Dispatch {
    #[default]
    InProcess,
    /// Hand the whole invocation to another program, e.g. this binary under a
    /// pinned toolchain. It receives its own arguments, then the options as
    /// `--cwd`/`--config`/`--install-path`/`--generator` flags, `--`, and
    /// finally the original args.
    Delegate { program: PathBuf, args: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Generator name looked up locally and on `PATH`, or a path to it.
    pub generator: String,
    pub dispatch: Dispatch,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_string(),
            dispatch: Dispatch::default(),
        }
    }
}

pub struct DocsCommand {
    settings: Settings,
}

impl DocsCommand {
    pub fn new(settings: Settings) -> Self {
        DocsCommand { settings }
    }

    pub async fn run(&self, args: &[String], options: &Options) -> Result<Outcome, DocsError> {
        let run_id = cuid2::create_id();
        let span = info_span!("docs", run_id = %run_id);
        async {
            let result = match &self.settings.dispatch {
                Dispatch::InProcess => self.worker(args, options).await,
                Dispatch::Delegate {
                    program,
                    args: prefix,
                } => self.delegate(program, prefix, args, options).await,
            };
            match &result {
                Ok(outcome) => info!(?outcome, "Docs run finished."),
                Err(e) => warn!(error = %e, "Docs run failed."),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn worker(&self, args: &[String], options: &Options) -> Result<Outcome, DocsError> {
        let flags = parse_flags(args.iter().cloned());

        let Some(config) = load_config(options)? else {
            println!("tsds: no config. Skipping");
            return Ok(Outcome::SkippedNoConfig);
        };
        let Some(source) = config.source.filter(|s| !s.is_empty()) else {
            println!("tsds: config missing source. Skipping docs");
            return Ok(Outcome::SkippedNoSource);
        };

        if flags.dry_run {
            println!(
                "Dry-run: would generate docs with {}",
                self.settings.generator
            );
            return Ok(Outcome::DryRun);
        }

        let cwd = options.cwd()?;
        let program = resolve_bin(&self.settings.generator, &cwd).map_err(DocsError::Resolution)?;
        let install = install_path(options)?;
        let dest = cwd.join(DEST_DIR);

        let mut gen_args = Vec::with_capacity(flags.forwarded.len() + 3);
        gen_args.push(source);
        gen_args.extend(flags.forwarded);
        gen_args.extend(GENERATOR_FLAGS.iter().map(|s| s.to_string()));

        let mut guard = None;
        let result = generate(
            &mut guard, &cwd, &dest, &install, &program, &gen_args, options,
        )
        .await;

        // The link goes away no matter how the sequence ended.
        if let Some(guard) = guard {
            if let Err(e) = guard.release().await {
                warn!(path = %install.display(), error = %e, "Failed to remove install link.");
            }
        }

        result.map(|()| Outcome::Generated { dest })
    }

    async fn delegate(
        &self,
        program: &Path,
        prefix: &[String],
        args: &[String],
        options: &Options,
    ) -> Result<Outcome, DocsError> {
        let cwd = options.cwd()?;
        let all_args = delegate_args(prefix, &cwd, &self.settings.generator, options, args)?;
        debug!(program = %program.display(), args = ?all_args, "Delegating docs run.");
        generator::spawn(program, &all_args, &cwd, &options.env)
            .await
            .map_err(DocsError::Delegate)?;
        Ok(Outcome::Delegated)
    }
}

/// Command line for a delegated run, shaped like this binary's own CLI so
/// the options survive the hop.
fn delegate_args(
    prefix: &[String],
    cwd: &Path,
    generator: &str,
    options: &Options,
    args: &[String],
) -> Result<Vec<String>, DocsError> {
    let mut all = prefix.to_vec();
    let mut push = |flag: &str, value: String| {
        all.push(flag.to_string());
        all.push(value);
    };
    push("--cwd", cwd.to_string_lossy().into_owned());
    if let Some(path) = &options.config_path {
        let path = std::path::absolute(path).map_err(ConfigError::CurrentDir)?;
        push("--config", path.to_string_lossy().into_owned());
    }
    if let Some(path) = &options.install_path {
        push("--install-path", cwd.join(path).to_string_lossy().into_owned());
    }
    push("--generator", generator.to_string());
    all.push("--".to_string());
    all.extend(args.iter().cloned());
    Ok(all)
}

async fn remove_dest(dest: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(dest).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(dest).await
    } else {
        fs::remove_file(dest).await
    }
}

/// Clean, recreate, link, spawn. Stops at the first failure.
async fn generate(
    guard: &mut Option<LinkGuard>,
    cwd: &Path,
    dest: &Path,
    install: &Path,
    program: &Path,
    gen_args: &[String],
    options: &Options,
) -> Result<(), DocsError> {
    debug!(path = %dest.display(), "Removing destination.");
    remove_dest(dest)
        .await
        .map_err(|source| DocsError::RemoveDest {
            path: dest.to_path_buf(),
            source,
        })?;

    debug!(path = %dest.display(), "Creating destination.");
    fs::create_dir_all(dest)
        .await
        .map_err(|source| DocsError::CreateDest {
            path: dest.to_path_buf(),
            source,
        })?;

    let link = LinkGuard::acquire(cwd, install)
        .await
        .map_err(|source| DocsError::Link {
            link: install.to_path_buf(),
            target: cwd.to_path_buf(),
            source,
        })?;
    debug!(link = %link.path().display(), "Package linked for generation.");
    *guard = Some(link);

    generator::spawn(program, gen_args, cwd, &options.env)
        .await
        .map_err(DocsError::Generate)
}
