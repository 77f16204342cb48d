//! Configuration for the orchestration layer: which repositories to fetch,
//! where to cache their `PACKAGES` files, and which R version (if any) to
//! filter recommended/builtin behavior by.
//!
//! Deliberately narrower than a full project config: this crate's core is
//! the dependency index, not a package manager, so `OrchestrationConfig`
//! only carries what [`crate::orchestration`] needs. Follows the same
//! `#[serde(deny_unknown_fields)]` + `toml::from_str` shape as `config.rs`'s
//! `Config`/`Project` in the teacher crate.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One repository to fetch a `PACKAGES` (or `PACKAGES.gz`) file from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSource {
    /// Short label used as the `origin` recorded on every [`crate::Package`]
    /// ingested from this source.
    pub alias: String,
    /// Base URL of the repository, e.g. `https://cran.r-project.org`.
    pub url: String,
}

impl RepoSource {
    pub fn new(alias: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            url: url.into(),
        }
    }

    /// The URL of this source's `src/contrib/PACKAGES` file.
    pub fn packages_url(&self) -> String {
        format!("{}/src/contrib/PACKAGES", self.url.trim_end_matches('/'))
    }
}

/// Configuration read from a TOML file, e.g.:
///
/// ```toml
/// cache_dir = ".cranidx-cache"
///
/// [[repositories]]
/// alias = "cran"
/// url = "https://cran.r-project.org"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationConfig {
    /// Repositories to fetch, in the order their packages should be merged.
    pub repositories: Vec<RepoSource>,
    /// Where fetched `PACKAGES` bytes may be cached between runs. Caching
    /// itself is a CLI/orchestration concern, not a core one.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Only consider packages compatible with this R version, e.g. `"4.3"`.
    /// The core has no notion of R-version filtering itself; this is
    /// reserved for a caller layered on top (see DESIGN.md Open Question).
    #[serde(default)]
    pub r_version: Option<String>,
}

impl OrchestrationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs_err::read_to_string(path.as_ref()).map_err(|e| ConfigError {
            path: path.as_ref().into(),
            source: ConfigErrorKind::Io(std::io::Error::from(e)),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError {
            path: path.as_ref().into(),
            source: ConfigErrorKind::Parse(e),
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to load config at `{}`", path.display())]
#[non_exhaustive]
pub struct ConfigError {
    pub path: Box<Path>,
    pub source: ConfigErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigErrorKind {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}
