use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub(crate) const ROOT_ENV_VAR: &str = "TILESTEP_ROOT";
pub(crate) const SCENARIO_ENV_VAR: &str = "TILESTEP_SCENARIO";
pub(crate) const MAX_STEPS_ENV_VAR: &str = "TILESTEP_MAX_STEPS";
const DEFAULT_SCENARIO: &str = "overworld.json";
const DEFAULT_MAX_STEPS: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct AppPaths {
    pub(crate) root: PathBuf,
    pub(crate) scenarios_dir: PathBuf,
}

impl AppPaths {
    pub(crate) fn from_root(root: PathBuf) -> Self {
        let scenarios_dir = root.join("assets").join("scenarios");
        Self {
            root,
            scenarios_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimConfig {
    pub(crate) scenario_path: PathBuf,
    pub(crate) max_steps: usize,
    pub(crate) print_summary: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            scenario_path: PathBuf::from(DEFAULT_SCENARIO),
            max_steps: DEFAULT_MAX_STEPS,
            print_summary: true,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidMaxSteps { var: &'static str, value: String },
    #[error("cannot locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("TILESTEP_ROOT={root} has no assets/scenarios directory")]
    MissingScenarios { root: PathBuf },
    #[error("no assets/scenarios directory above {exe}; set TILESTEP_ROOT")]
    RootNotFound { exe: PathBuf },
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Builds the run configuration: defaults, then environment, then the first
/// positional argument as scenario path.
pub(crate) fn load_config(
    paths: &AppPaths,
    args: impl IntoIterator<Item = String>,
) -> Result<SimConfig, StartupError> {
    let mut config = SimConfig::default();

    if let Some(scenario) = read_env(SCENARIO_ENV_VAR)? {
        config.scenario_path = PathBuf::from(scenario);
    }
    if let Some(raw) = read_env(MAX_STEPS_ENV_VAR)? {
        config.max_steps = parse_max_steps(&raw)?;
    }
    if let Some(arg) = args.into_iter().next() {
        config.scenario_path = PathBuf::from(arg);
    }

    config.scenario_path = resolve_scenario_path(paths, &config.scenario_path);
    info!(
        scenario = %config.scenario_path.display(),
        max_steps = config.max_steps,
        "config_loaded"
    );
    Ok(config)
}

fn read_env(var: &'static str) -> Result<Option<String>, StartupError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn parse_max_steps(raw: &str) -> Result<usize, StartupError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| StartupError::InvalidMaxSteps {
            var: MAX_STEPS_ENV_VAR,
            value: raw.to_string(),
        })
}

pub(crate) fn resolve_scenario_path(paths: &AppPaths, raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        paths.scenarios_dir.join(raw)
    }
}

pub(crate) fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

/// The harness root is the first directory holding `assets/scenarios`, taken
/// from `TILESTEP_ROOT` or found above the executable.
fn resolve_root() -> Result<PathBuf, StartupError> {
    if let Some(value) = read_env(ROOT_ENV_VAR)? {
        let root = PathBuf::from(value);
        return if has_scenarios(&root) {
            Ok(root)
        } else {
            Err(StartupError::MissingScenarios { root })
        };
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    if let Some(dir) = exe.ancestors().skip(1).find(|dir| has_scenarios(dir)) {
        return Ok(fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));
    }
    Err(StartupError::RootNotFound { exe })
}

fn has_scenarios(root: &Path) -> bool {
    root.join("assets").join("scenarios").is_dir()
}
