//! Wrapper settings stored in an optional TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Wrapper configuration (TOML).
///
/// Describes where the wrapper finds things, never the optimizer parameters
/// themselves (those always come from the environment). Missing fields take
/// the defaults used by the container image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WrapperConfig {
    /// Root of the shared volume holding `inputs/` and `outputs/`.
    pub share_root: PathBuf,

    /// Working directory the optimizer is started in.
    pub workdir: PathBuf,

    /// Directory the optimizer writes its JSON into, relative to `workdir`.
    pub output_dir: PathBuf,

    /// Optimizer executable (resolved through `PATH` when bare).
    pub binary: PathBuf,

    /// Environment variable carrying the platform's task index.
    pub index_var: String,

    /// Kill the optimizer after this many seconds. Unset waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            share_root: PathBuf::from("."),
            workdir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            binary: PathBuf::from("sparrow"),
            index_var: "AWS_BATCH_JOB_ARRAY_INDEX".to_string(),
            timeout_secs: None,
        }
    }
}

impl WrapperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(anyhow!("binary must be non-empty"));
        }
        if self.index_var.trim().is_empty() {
            return Err(anyhow!("index_var must be non-empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must be non-empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(anyhow!("timeout_secs must be > 0 when set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// The path is always user-supplied, so a missing file is an error rather
/// than a silent fallback to defaults.
pub fn load_config(path: &Path) -> Result<WrapperConfig> {
    if !path.is_file() {
        return Err(anyhow!("config file {} does not exist", path.display()));
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WrapperConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
