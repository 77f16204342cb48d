//! `broken`: report every package across the loaded files whose
//! dependencies aren't fully satisfied by what else was loaded.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::{Repository, Version};

/// One package found with at least one unmet `Depends`/`Imports`/`LinkingTo`
/// requirement.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenPackage {
    /// The package's name.
    pub name: String,
    /// The package's version.
    pub version: Version,
    /// Each missing requirement, pre-formatted as `name (op version)`.
    pub missing: Vec<String>,
}

impl fmt::Display for BrokenPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.name, self.version, self.missing.join(", "))
    }
}

/// Loads every file in `files` as a DCF source into one [`Repository`] and
/// returns every package whose dependencies the combined repository cannot
/// satisfy.
pub fn broken(files: &[impl AsRef<Path>]) -> Result<Vec<BrokenPackage>> {
    let mut repo = Repository::new();
    for path in files {
        let path = path.as_ref();
        let bytes =
            crate::io::read_dcf_source(path).with_context(|| format!("reading {}", path.display()))?;
        repo.read(&path.to_string_lossy(), &bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
    }

    let index = repo.create_index();
    let mut broken = Vec::new();
    for pkg in repo.iter() {
        let unmet = index.unmet(pkg.name).with_context(|| format!("querying {}", pkg.name))?;
        if unmet.is_empty() {
            continue;
        }
        let missing = unmet
            .iter()
            .map(|nvc| format!("{} {}", repo.interner().resolve(nvc.name), nvc.constraint))
            .collect();
        broken.push(BrokenPackage {
            name: pkg.name.to_string(),
            version: pkg.version,
            missing,
        });
    }
    Ok(broken)
}
