//! `can-install`: whether a named package's dependencies are all satisfiable
//! by the loaded files.

use std::path::Path;

use anyhow::{Context, Result};

use crate::Repository;

/// Loads `files` into one [`Repository`] and returns `name`'s unmet
/// requirements, pre-formatted as `name (op version)`. An empty result means
/// `name` can be installed from what was loaded.
pub fn can_install(name: &str, files: &[impl AsRef<Path>]) -> Result<Vec<String>> {
    let mut repo = Repository::new();
    for path in files {
        let path = path.as_ref();
        let bytes =
            crate::io::read_dcf_source(path).with_context(|| format!("reading {}", path.display()))?;
        repo.read(&path.to_string_lossy(), &bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
    }

    let index = repo.create_index();
    let unmet = index.unmet(name).with_context(|| format!("looking up {name:?}"))?;
    Ok(unmet
        .iter()
        .map(|nvc| format!("{} {}", repo.interner().resolve(nvc.name), nvc.constraint))
        .collect())
}
