//! Optimizer parameters resolved from environment overrides.

use serde::Serialize;
use tracing::info;

pub const SEED_VAR: &str = "SEED";
pub const EXPLORE_VAR: &str = "EXPLORE";
pub const COMPRESS_VAR: &str = "COMPRESS";

pub const DEFAULT_SEED: &str = "23";
pub const DEFAULT_EXPLORE: &str = "300";
pub const DEFAULT_COMPRESS: &str = "200";

/// Where a resolved parameter value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Env,
    Default,
}

/// Parameters handed to the optimizer CLI.
///
/// Values are opaque strings: the optimizer owns their parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSet {
    pub seed: String,
    pub explore: String,
    pub compress: String,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            explore: DEFAULT_EXPLORE.to_string(),
            compress: DEFAULT_COMPRESS.to_string(),
        }
    }
}

impl ParameterSet {
    /// Resolve every parameter from `lookup`, falling back to defaults.
    ///
    /// A present, non-empty value is taken verbatim. Never fails.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (seed, seed_src) = pick(&lookup, SEED_VAR, DEFAULT_SEED);
        let (explore, explore_src) = pick(&lookup, EXPLORE_VAR, DEFAULT_EXPLORE);
        let (compress, compress_src) = pick(&lookup, COMPRESS_VAR, DEFAULT_COMPRESS);
        info!(
            seed = %seed,
            seed_src = ?seed_src,
            explore = %explore,
            explore_src = ?explore_src,
            compress = %compress,
            compress_src = ?compress_src,
            "resolved optimizer parameters"
        );
        Self {
            seed,
            explore,
            compress,
        }
    }

    /// Flag/value pairs in optimizer CLI order.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-s".to_string(),
            self.seed.clone(),
            "-e".to_string(),
            self.explore.clone(),
            "-c".to_string(),
            self.compress.clone(),
        ]
    }
}

fn pick<F>(lookup: &F, var: &str, default: &str) -> (String, Source)
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.is_empty() => (value, Source::Env),
        _ => (default.to_string(), Source::Default),
    }
}
