//! Runtime settings, read with the `config` crate.
//!
//! ```toml
//! prune_branches = true
//! strict_ubiquity = false
//! ```
//!
//! Every field has a default, and `FPJOIN_*` environment variables override
//! what a file says (e.g. `FPJOIN_PRUNE_BRANCHES=false`).

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Skip subtrees the index-assisted search already proved non-joinable or
    /// already visited. Turning it off never changes an answer.
    pub prune_branches: bool,
    /// Reject a root-skip search whose ubiquitous key count covers a key that
    /// some loaded document lacks, instead of skipping fewer levels.
    pub strict_ubiquity: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prune_branches: true,
            strict_ubiquity: false,
        }
    }
}

impl Settings {
    /// Reads a settings file (format taken from its extension), then applies
    /// `FPJOIN_` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("FPJOIN"))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
    pub fn from_toml(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
