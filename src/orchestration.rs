//! Orchestrations that sit above the core: fetching `PACKAGES` files from
//! one or more repositories into a single [`Repository`], computing the
//! external dependency set for a local source tree, and staging an install
//! order into parallelizable waves.
//!
//! None of this is part of the DCF tokenizer/parser/repository/index core —
//! it is glue over it, grounded on `main.rs`'s `load_databases` (fetch +
//! merge many repositories), `package/mod.rs`'s `dependencies_to_install`
//! (direct vs. transitive, base/recommended filtering), and
//! `dependency_graph.rs`'s `get_install_plan` (Kahn's-algorithm staging).

use std::collections::HashSet;
use std::time::Duration;

use crate::config::RepoSource;
use crate::consts::is_privileged;
use crate::error::{OrchestrationError, OrchestrationErrorKind};
use crate::io::decompress_if_gzipped;
use crate::nvc::NameAndVersionConstraint;
use crate::repository::{PackageRef, Repository};

/// Downloads/network concerns are the caller's problem: this crate only
/// needs *some* way to turn a [`RepoSource`] into bytes. Grounded on the
/// `Http`/`HttpDownload` split in `src/http.rs`.
pub trait RepositoryFetcher {
    fn fetch(&self, source: &RepoSource) -> Result<Vec<u8>, FetchError>;
}

/// Error from a [`RepositoryFetcher`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {url}: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

/// Default [`RepositoryFetcher`] backed by `ureq`.
pub struct UreqFetcher;

impl RepositoryFetcher for UreqFetcher {
    fn fetch(&self, source: &RepoSource) -> Result<Vec<u8>, FetchError> {
        use std::io::Read as _;

        let url = source.packages_url();
        log::trace!("fetching {url}");
        let request = ureq::get(&url).timeout(Duration::from_secs(200));
        let response = request.call().map_err(|e| FetchError {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError {
                url: url.clone(),
                message: e.to_string(),
            })?;
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// Fetches every source in `repos` and feeds it into one [`Repository`], in
/// the order `repos` was given (so append order, and therefore
/// latest-version selection among equal-origin ties, stays deterministic
/// regardless of how concurrently the fetches themselves ran).
#[cfg(feature = "cli")]
pub fn fetch_all(
    fetcher: &(impl RepositoryFetcher + Sync),
    repos: &[RepoSource],
) -> Result<Repository, OrchestrationError> {
    use rayon::prelude::*;

    let fetched: Vec<Result<Vec<u8>, FetchError>> =
        repos.par_iter().map(|r| fetcher.fetch(r)).collect();

    let mut repository = Repository::new();
    for (source, bytes) in repos.iter().zip(fetched) {
        let bytes = bytes.map_err(|e| OrchestrationErrorKind::Fetch {
            url: e.url,
            message: e.message,
        })?;
        let bytes = decompress_if_gzipped(bytes)?;
        repository.read(&source.alias, &bytes)?;
    }
    Ok(repository)
}

/// Sequential fallback used when the `cli`/`rayon` fan-out isn't available.
#[cfg(not(feature = "cli"))]
pub fn fetch_all(
    fetcher: &impl RepositoryFetcher,
    repos: &[RepoSource],
) -> Result<Repository, OrchestrationError> {
    let mut repository = Repository::new();
    for source in repos {
        let bytes = fetcher.fetch(source).map_err(|e| OrchestrationErrorKind::Fetch {
            url: e.url,
            message: e.message,
        })?;
        let bytes = decompress_if_gzipped(bytes)?;
        repository.read(&source.alias, &bytes)?;
    }
    Ok(repository)
}

/// A package from a local source tree whose own name should be excluded
/// when computing what must come from the repositories.
///
/// Its dependency lists must carry [`crate::interner::InternedStr`] handles
/// valid in the *same* `repo` passed to [`external_dependencies`] — in
/// practice this means the local `DESCRIPTION` was itself ingested via
/// [`Repository::read`] (alongside the fetched repositories) and
/// `LocalPackage` built from the resulting [`PackageRef`], exactly as
/// `repo.iter()` would hand back any other row's fields.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    pub name: String,
    pub depends: Vec<NameAndVersionConstraint>,
    pub suggests: Vec<NameAndVersionConstraint>,
    pub imports: Vec<NameAndVersionConstraint>,
    pub linking_to: Vec<NameAndVersionConstraint>,
}

impl LocalPackage {
    /// Builds a `LocalPackage` from a row already ingested into the
    /// `Repository` that `external_dependencies` will be queried against.
    pub fn from_package_ref(pkg: PackageRef<'_>) -> Self {
        Self {
            name: pkg.name.to_string(),
            depends: pkg.depends.to_vec(),
            suggests: pkg.suggests.to_vec(),
            imports: pkg.imports.to_vec(),
            linking_to: pkg.linking_to.to_vec(),
        }
    }
}

impl LocalPackage {
    fn direct_deps(&self) -> impl Iterator<Item = &NameAndVersionConstraint> {
        self.depends
            .iter()
            .chain(self.imports.iter())
            .chain(self.linking_to.iter())
    }
}

/// Computes the direct + transitive dependency set of `local_packages` that
/// is *not* satisfied by the local tree itself, merging constraints per
/// [`Repository::merge_constraints`]. This is what a caller needs to know it
/// must obtain from `repo`.
///
/// Grounded on `package/mod.rs::dependencies_to_install`'s direct/suggests
/// split and base/recommended filtering, generalized to walk the full
/// transitive closure via the repo's NVC machinery rather than stopping at
/// direct dependencies.
pub fn external_dependencies(
    repo: &Repository,
    local_packages: &[LocalPackage],
) -> Result<Vec<NameAndVersionConstraint>, OrchestrationError> {
    let local_names: HashSet<&str> = local_packages.iter().map(|p| p.name.as_str()).collect();

    let mut external: Vec<NameAndVersionConstraint> = Vec::new();
    for pkg in local_packages {
        for nvc in pkg.direct_deps() {
            let name = repo.interner().resolve(nvc.name);
            if local_names.contains(name) || is_privileged(name) {
                continue;
            }
            external.push(*nvc);
            for dep in repo.transitive_dependencies_no_base(nvc)? {
                let dep_name = repo.interner().resolve(dep.name);
                if !local_names.contains(dep_name) {
                    external.push(dep);
                }
            }
        }
    }

    repo.merge_constraints(&external).map_err(Into::into)
}

/// One step of an install plan: a single package to build, with the
/// repository `origin` it was sourced from.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRule {
    pub name: String,
    pub version: crate::version::Version,
    pub origin: String,
}

impl<'a> From<PackageRef<'a>> for BuildRule {
    fn from(pkg: PackageRef<'a>) -> Self {
        Self {
            name: pkg.name.to_string(),
            version: pkg.version,
            origin: pkg.origin.to_string(),
        }
    }
}

/// Groups an install order (as returned by
/// [`Repository::calculate_installation_order`]) into waves: every rule in
/// wave `i` depends only on rules in waves `< i`, so a wave's rules are safe
/// to build concurrently. Grounded on `dependency_graph.rs::get_install_plan`'s
/// Kahn's-algorithm staging, generalized from `ResolvedDependency` names to
/// this crate's [`PackageRef`]/NVC dependency edges.
pub fn build_rules(repo: &Repository, order: &[PackageRef<'_>]) -> Vec<Vec<BuildRule>> {
    let position: std::collections::HashMap<usize, usize> =
        order.iter().enumerate().map(|(i, p)| (p.row, i)).collect();

    let mut wave_of = vec![0usize; order.len()];
    for (i, pkg) in order.iter().enumerate() {
        let mut wave = 0usize;
        for dep in pkg
            .depends
            .iter()
            .chain(pkg.imports.iter())
            .chain(pkg.linking_to.iter())
        {
            let dep_name = repo.interner().resolve(dep.name);
            if let Some(dep_row) = order
                .iter()
                .find(|p| p.name == dep_name)
                .map(|p| p.row)
            {
                if let Some(&dep_idx) = position.get(&dep_row) {
                    wave = wave.max(wave_of[dep_idx] + 1);
                }
            }
        }
        wave_of[i] = wave;
    }

    let max_wave = wave_of.iter().copied().max().unwrap_or(0);
    let mut waves: Vec<Vec<BuildRule>> = vec![Vec::new(); max_wave + 1];
    for (i, pkg) in order.iter().enumerate() {
        waves[wave_of[i]].push(BuildRule::from(*pkg));
    }
    waves.retain(|w| !w.is_empty());
    waves
}
