//! `depends`: print a named package's transitive dependency closure.

use std::path::Path;

use anyhow::{Context, Result};

use crate::{NameAndVersionConstraint, Repository, VersionConstraint};

/// Loads `files` into one [`Repository`] and returns `name`'s transitive
/// closure over `Depends ∪ Imports ∪ LinkingTo`, pre-formatted as
/// `name (op version)`, in the insertion order
/// [`Repository::transitive_dependencies`] produces.
pub fn depends(name: &str, files: &[impl AsRef<Path>]) -> Result<Vec<String>> {
    let mut repo = Repository::new();
    for path in files {
        let path = path.as_ref();
        let bytes =
            crate::io::read_dcf_source(path).with_context(|| format!("reading {}", path.display()))?;
        repo.read(&path.to_string_lossy(), &bytes)
            .with_context(|| format!("parsing {}", path.display()))?;
    }

    let root = repo
        .find_latest_package_by_name(name, VersionConstraint::default())
        .ok_or_else(|| anyhow::anyhow!("package {name:?} not found"))?;
    let root_nvc = NameAndVersionConstraint::new(repo.name_handle(root.row), VersionConstraint::default());

    let closure = repo.transitive_dependencies(&root_nvc)?;
    Ok(closure
        .iter()
        .map(|nvc| format!("{} {}", repo.interner().resolve(nvc.name), nvc.constraint))
        .collect())
}
