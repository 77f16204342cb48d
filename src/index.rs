//! A name-keyed snapshot over a [`Repository`]'s package table.
//!
//! Built in one O(N) pass: each row inserts `name -> {version, row}`, with a
//! collision promoting the entry from `Single` to `Multiple` rather than
//! always allocating a `Vec` (the single-version case dominates in a real
//! repository, so it gets inline storage instead of a one-element vector).
//! `Index` borrows from the `Repository` it was built from — it owns no
//! strings and is invalidated the moment that Repository mutates again.

use std::collections::HashMap;

use crate::consts::is_privileged;
use crate::error::{IndexError, IndexErrorKind};
use crate::nvc::NameAndVersionConstraint;
use crate::repository::Repository;
use crate::version::Version;

enum Entry {
    Single { version: Version, row: usize },
    Multiple(Vec<(Version, usize)>),
}

impl Entry {
    fn insert(&mut self, version: Version, row: usize) {
        match self {
            Entry::Single { version: v0, row: r0 } => {
                *self = Entry::Multiple(vec![(*v0, *r0), (version, row)]);
            }
            Entry::Multiple(rows) => rows.push((version, row)),
        }
    }

    fn any_satisfies(&self, pred: impl Fn(&Version) -> bool) -> bool {
        match self {
            Entry::Single { version, .. } => pred(version),
            Entry::Multiple(rows) => rows.iter().any(|(v, _)| pred(v)),
        }
    }

    fn best_row(&self) -> usize {
        match self {
            Entry::Single { row, .. } => *row,
            Entry::Multiple(rows) => rows.iter().max_by_key(|(v, _)| *v).map(|(_, r)| *r).unwrap(),
        }
    }
}

/// A snapshot lookup map from package name to the row(s) under it, built
/// from a [`Repository`] at a point in time.
pub struct Index<'a> {
    repo: &'a Repository,
    entries: HashMap<&'a str, Entry>,
}

impl<'a> Index<'a> {
    pub(crate) fn build(repo: &'a Repository) -> Self {
        let mut entries: HashMap<&str, Entry> = HashMap::new();
        for pkg in repo.iter() {
            entries
                .entry(pkg.name)
                .and_modify(|e| e.insert(pkg.version, pkg.row))
                .or_insert(Entry::Single { version: pkg.version, row: pkg.row });
        }
        Self { repo, entries }
    }

    /// Number of distinct package names covered by this snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// For each requirement in `require`, checks whether some row under
    /// that name satisfies its constraint (base/recommended names are
    /// always considered satisfied). Returns the subsequence of `require`
    /// that is *not* satisfied, in the same order as the input.
    pub fn unsatisfied(&self, require: &[NameAndVersionConstraint]) -> Vec<NameAndVersionConstraint> {
        require
            .iter()
            .filter(|nvc| {
                let name = self.repo.interner().resolve(nvc.name);
                if is_privileged(name) {
                    return false;
                }
                match self.entries.get(name) {
                    None => true,
                    Some(entry) => !entry.any_satisfies(|v| nvc.constraint.satisfied(v)),
                }
            })
            .copied()
            .collect()
    }

    /// Looks up `root_name`'s latest row in the backing Repository and
    /// returns [`Self::unsatisfied`] over its `depends ∪ imports ∪
    /// linkingTo`. Fails with [`IndexErrorKind::NotFound`] if `root_name`
    /// isn't present in this snapshot.
    pub fn unmet(&self, root_name: &str) -> Result<Vec<NameAndVersionConstraint>, IndexError> {
        let entry = self
            .entries
            .get(root_name)
            .ok_or_else(|| IndexErrorKind::NotFound(root_name.to_string()))?;
        let root = self.repo.row(entry.best_row());

        let mut required: Vec<NameAndVersionConstraint> = Vec::with_capacity(
            root.depends.len() + root.imports.len() + root.linking_to.len(),
        );
        required.extend_from_slice(root.depends);
        required.extend_from_slice(root.imports);
        required.extend_from_slice(root.linking_to);

        Ok(self.unsatisfied(&required))
    }
}
