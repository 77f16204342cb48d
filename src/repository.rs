//! The in-memory package table: ingests DCF stanzas and answers dependency
//! queries over them.
//!
//! Storage is columnar (structure-of-arrays): each field of [`Package`] lives
//! in its own `Vec`, indexed by row. This keeps iteration over a single
//! column (e.g. names, when [`Index`](crate::Index) is built) from dragging
//! the rest of the row through cache, and mirrors the source's packed table
//! layout more closely than a `Vec<Package>` of owned structs would.

use std::collections::HashSet;

use crate::consts::is_privileged;
use crate::dcf::{Node, Parser};
use crate::error::{DcfError, RepositoryError, RepositoryErrorKind};
use crate::interner::{InternedStr, Interner};
use crate::nvc::NameAndVersionConstraint;
use crate::version::{Operator, Version, VersionConstraint};

/// A borrowed view over one row of a [`Repository`]'s package table.
#[derive(Debug, Clone, Copy)]
pub struct PackageRef<'a> {
    pub row: usize,
    pub name: &'a str,
    pub version: Version,
    pub origin: &'a str,
    pub depends: &'a [NameAndVersionConstraint],
    pub suggests: &'a [NameAndVersionConstraint],
    pub imports: &'a [NameAndVersionConstraint],
    pub linking_to: &'a [NameAndVersionConstraint],
}

impl PartialEq for PackageRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row
    }
}
impl Eq for PackageRef<'_> {}

#[derive(Debug, Default)]
struct Columns {
    name: Vec<InternedStr>,
    version: Vec<Version>,
    origin: Vec<InternedStr>,
    depends: Vec<Vec<NameAndVersionConstraint>>,
    suggests: Vec<Vec<NameAndVersionConstraint>>,
    imports: Vec<Vec<NameAndVersionConstraint>>,
    linking_to: Vec<Vec<NameAndVersionConstraint>>,
}

impl Columns {
    fn len(&self) -> usize {
        self.name.len()
    }
}

/// Structure-of-arrays package table, an owned interner, and the last parse
/// error seen (if any). Created empty; rows accumulate across calls to
/// [`Repository::read`].
#[derive(Debug, Default)]
pub struct Repository {
    interner: Interner,
    columns: Columns,
    last_error: Option<DcfError>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last parse error recorded by [`Self::read`], if its most recent
    /// call failed.
    pub fn last_error(&self) -> Option<&DcfError> {
        self.last_error.as_ref()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.len() == 0
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub(crate) fn row(&self, i: usize) -> PackageRef<'_> {
        PackageRef {
            row: i,
            name: self.interner.resolve(self.columns.name[i]),
            version: self.columns.version[i],
            origin: self.interner.resolve(self.columns.origin[i]),
            depends: &self.columns.depends[i],
            suggests: &self.columns.suggests[i],
            imports: &self.columns.imports[i],
            linking_to: &self.columns.linking_to[i],
        }
    }

    /// Parses `bytes` (labelled with `origin`, e.g. a repository URL or
    /// directory path) and appends one row per stanza. On parse failure the
    /// error is recorded (see [`Self::last_error`]) and returned; the
    /// package table is left unchanged. Returns the number of stanzas
    /// committed on success.
    pub fn read(&mut self, origin: &str, bytes: &[u8]) -> Result<usize, RepositoryError> {
        let (nodes, mut parsed_interner) = match Parser::parse(bytes) {
            Ok(v) => v,
            Err(e) => {
                self.last_error = Some(e.clone());
                return Err(RepositoryError::from(e));
            }
        };

        // Absorb the parser's interner into ours; `table[i]` is the handle
        // in `self.interner` that now stands in for handle `i` in
        // `parsed_interner` (now emptied).
        let table = self.interner.claim_other(&mut parsed_interner);
        let translate = |h: InternedStr| table[h.0 as usize];

        let origin_handle = self.interner.append(origin);

        let mut committed = 0usize;
        let mut i = 0usize;
        while i < nodes.len() {
            if nodes[i] != Node::Stanza {
                i += 1;
                continue;
            }
            i += 1;

            let mut name: Option<InternedStr> = None;
            let mut version = Version::default();
            let mut depends = Vec::new();
            let mut suggests = Vec::new();
            let mut imports = Vec::new();
            let mut linking_to = Vec::new();

            while i < nodes.len() && nodes[i] != Node::StanzaEnd {
                let Node::Field { key } = nodes[i] else {
                    i += 1;
                    continue;
                };
                let key_text = self.interner.resolve(translate(key)).to_string();
                i += 1;

                let mut values: Vec<NameAndVersionConstraint> = Vec::new();
                let mut string_value: Option<InternedStr> = None;
                while i < nodes.len() && nodes[i] != Node::FieldEnd {
                    match nodes[i] {
                        Node::NameAndVersion { name, constraint } => {
                            values.push(NameAndVersionConstraint::new(translate(name), constraint));
                        }
                        Node::StringValue { value } => {
                            string_value = Some(translate(value));
                        }
                        _ => {}
                    }
                    i += 1;
                }
                if i < nodes.len() {
                    i += 1; // consume FieldEnd
                }

                match key_text.as_str() {
                    "Package" => {
                        name = string_value.or_else(|| values.first().map(|v| v.name));
                    }
                    "Version" => {
                        let text = string_value
                            .map(|h| self.interner.resolve(h).to_string())
                            .or_else(|| values.first().map(|v| self.interner.resolve(v.name).to_string()));
                        if let Some(text) = text {
                            if let Ok(v) = Version::parse(&text) {
                                version = v;
                            }
                        }
                    }
                    "Depends" => depends = values,
                    "Suggests" => suggests = values,
                    "Imports" => imports = values,
                    "LinkingTo" => linking_to = values,
                    _ => {}
                }
            }
            if i < nodes.len() {
                i += 1; // consume StanzaEnd
            }

            self.columns.name.push(name.unwrap_or_else(|| self.interner.append("")));
            self.columns.version.push(version);
            self.columns.origin.push(origin_handle);
            self.columns.depends.push(depends);
            self.columns.suggests.push(suggests);
            self.columns.imports.push(imports);
            self.columns.linking_to.push(linking_to);
            committed += 1;
        }

        self.last_error = None;
        Ok(committed)
    }

    /// All rows whose name matches `nvc.name` and whose version satisfies
    /// `nvc.constraint`, most-recently-appended first, capped at
    /// `max_results`.
    pub fn find_package(&self, nvc: &NameAndVersionConstraint, max_results: usize) -> Vec<PackageRef<'_>> {
        let name = self.interner.resolve(nvc.name);
        let mut out = Vec::new();
        for i in (0..self.len()).rev() {
            if self.interner.resolve(self.columns.name[i]) != name {
                continue;
            }
            if !nvc.constraint.satisfied(&self.columns.version[i]) {
                continue;
            }
            out.push(self.row(i));
            if out.len() == max_results {
                break;
            }
        }
        out
    }

    /// The single matching row with the greatest version, if any.
    pub fn find_latest_package(&self, nvc: &NameAndVersionConstraint) -> Option<PackageRef<'_>> {
        self.find_latest_package_by_name(self.interner.resolve(nvc.name), nvc.constraint)
    }

    /// Sequential walk over the table in append order.
    pub fn iter(&self) -> impl Iterator<Item = PackageRef<'_>> {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// Builds a snapshot [`crate::Index`] over the current table.
    pub fn create_index(&self) -> crate::index::Index<'_> {
        crate::index::Index::build(self)
    }

    /// Like [`Self::find_latest_package`], but takes a plain name instead of
    /// an [`NameAndVersionConstraint`] — useful for callers (tests, the CLI)
    /// that have a bare package name and don't otherwise need an interned
    /// handle for it.
    pub fn find_latest_package_by_name(&self, name: &str, constraint: VersionConstraint) -> Option<PackageRef<'_>> {
        let mut best: Option<usize> = None;
        for i in 0..self.len() {
            if self.interner.resolve(self.columns.name[i]) != name {
                continue;
            }
            if !constraint.satisfied(&self.columns.version[i]) {
                continue;
            }
            match best {
                Some(b) if self.columns.version[b] >= self.columns.version[i] => {}
                _ => best = Some(i),
            }
        }
        best.map(|i| self.row(i))
    }

    /// The raw interned handle backing `row`'s name, valid in this
    /// Repository's own interner. Lets a caller that already found a row
    /// (e.g. via [`Self::find_latest_package_by_name`]) build an NVC to feed
    /// back into [`Self::transitive_dependencies`] without re-interning text
    /// it already has a handle for.
    pub(crate) fn name_handle(&self, row: usize) -> InternedStr {
        self.columns.name[row]
    }

    fn direct_deps_of(&self, row: usize) -> impl Iterator<Item = NameAndVersionConstraint> + '_ {
        self.columns.depends[row]
            .iter()
            .chain(self.columns.imports[row].iter())
            .chain(self.columns.linking_to[row].iter())
            .copied()
    }

    /// Depth-first transitive closure over `depends ∪ imports ∪ linkingTo`,
    /// starting from the latest row matching `root`. Returns an
    /// insertion-ordered (first-seen-wins), deduplicated-by-(name,constraint)
    /// list, excluding the root itself.
    pub fn transitive_dependencies(
        &self,
        root: &NameAndVersionConstraint,
    ) -> Result<Vec<NameAndVersionConstraint>, RepositoryError> {
        let root_row = self
            .find_latest_package(root)
            .ok_or_else(|| RepositoryErrorKind::NotFound(self.interner.resolve(root.name).to_string()))?
            .row;

        let mut seen: HashSet<(InternedStr, VersionConstraint)> = HashSet::new();
        let mut order: Vec<NameAndVersionConstraint> = Vec::new();
        let mut stack: Vec<usize> = vec![root_row];
        let mut visited_rows: HashSet<usize> = HashSet::from([root_row]);

        while let Some(row) = stack.pop() {
            let deps: Vec<_> = self.direct_deps_of(row).collect();
            for dep in deps {
                let key = (dep.name, dep.constraint);
                let resolved = self
                    .find_latest_package(&dep)
                    .ok_or_else(|| RepositoryErrorKind::NotFound(self.interner.resolve(dep.name).to_string()))?;
                if seen.insert(key) {
                    order.push(dep);
                }
                if visited_rows.insert(resolved.row) {
                    stack.push(resolved.row);
                }
            }
        }

        Ok(order)
    }

    /// Like [`Self::transitive_dependencies`], but the returned set omits
    /// names in the base/recommended sets (traversal itself is unaffected —
    /// a base package's own dependencies are never walked, since they are
    /// assumed already present).
    pub fn transitive_dependencies_no_base(
        &self,
        root: &NameAndVersionConstraint,
    ) -> Result<Vec<NameAndVersionConstraint>, RepositoryError> {
        let all = self.transitive_dependencies(root)?;
        Ok(all
            .into_iter()
            .filter(|nvc| !is_privileged(self.interner.resolve(nvc.name)))
            .collect())
    }

    /// Collapses a list of NVCs down to one entry per distinct name, each
    /// holding the strongest consistent constraint among the inputs for
    /// that name. Returns [`RepositoryErrorKind::UnsatisfiableConstraint`]
    /// if two inputs for the same name contradict (e.g. `> 2` and `< 1`).
    pub fn merge_constraints(
        &self,
        nvcs: &[NameAndVersionConstraint],
    ) -> Result<Vec<NameAndVersionConstraint>, RepositoryError> {
        let mut by_name: Vec<(InternedStr, VersionConstraint)> = Vec::new();
        for nvc in nvcs {
            if let Some(existing) = by_name.iter_mut().find(|(n, _)| *n == nvc.name) {
                existing.1 = merge_two(self.interner.resolve(existing.0), existing.1, nvc.constraint)?;
            } else {
                by_name.push((nvc.name, nvc.constraint));
            }
        }
        Ok(by_name
            .into_iter()
            .map(|(name, constraint)| NameAndVersionConstraint::new(name, constraint))
            .collect())
    }

    /// Topologically orders `packages` so that, for every package `p` and
    /// every dependency of `p` that also appears in `packages`, that
    /// dependency precedes `p`. Ties broken by name. Cycles are reported as
    /// [`RepositoryErrorKind::CyclicDependencies`].
    pub fn calculate_installation_order<'a>(
        &'a self,
        packages: &[PackageRef<'a>],
    ) -> Result<Vec<PackageRef<'a>>, RepositoryError> {
        let rows: Vec<usize> = packages.iter().map(|p| p.row).collect();
        self.install_order_over(&rows)
    }

    /// [`Self::calculate_installation_order`] applied to every row in the
    /// table.
    pub fn calculate_installation_order_all(&self) -> Result<Vec<PackageRef<'_>>, RepositoryError> {
        let rows: Vec<usize> = (0..self.len()).collect();
        self.install_order_over(&rows)
    }

    fn install_order_over(&self, rows: &[usize]) -> Result<Vec<PackageRef<'_>>, RepositoryError> {
        let in_set: HashSet<usize> = rows.iter().copied().collect();

        // dependency-name -> row index, restricted to rows in the subgraph,
        // used to translate each row's deps into edges within `rows`.
        let mut by_name: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        for &r in rows {
            by_name.insert(self.interner.resolve(self.columns.name[r]), r);
        }

        let mut indegree: std::collections::HashMap<usize, usize> =
            rows.iter().map(|&r| (r, 0)).collect();
        let mut edges: std::collections::HashMap<usize, Vec<usize>> =
            rows.iter().map(|&r| (r, Vec::new())).collect();

        for &r in rows {
            for dep in self.direct_deps_of(r) {
                let dep_name = self.interner.resolve(dep.name);
                if let Some(&dep_row) = by_name.get(dep_name) {
                    if in_set.contains(&dep_row) && dep_row != r {
                        edges.get_mut(&dep_row).unwrap().push(r);
                        *indegree.get_mut(&r).unwrap() += 1;
                    }
                }
            }
        }

        let mut ready: std::collections::BinaryHeap<std::cmp::Reverse<(&str, usize)>> = rows
            .iter()
            .filter(|&&r| indegree[&r] == 0)
            .map(|&r| std::cmp::Reverse((self.interner.resolve(self.columns.name[r]), r)))
            .collect();

        let mut order = Vec::with_capacity(rows.len());
        while let Some(std::cmp::Reverse((_, r))) = ready.pop() {
            order.push(self.row(r));
            for &next in &edges[&r] {
                let deg = indegree.get_mut(&next).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.push(std::cmp::Reverse((self.interner.resolve(self.columns.name[next]), next)));
                }
            }
        }

        if order.len() != rows.len() {
            let remaining: Vec<String> = rows
                .iter()
                .filter(|r| indegree[r] > 0)
                .map(|&r| self.interner.resolve(self.columns.name[r]).to_string())
                .collect();
            return Err(RepositoryErrorKind::CyclicDependencies(remaining).into());
        }

        Ok(order)
    }
}

fn merge_two(name: &str, a: VersionConstraint, b: VersionConstraint) -> Result<VersionConstraint, RepositoryError> {
    use Operator::*;

    let lower = |c: VersionConstraint| matches!(c.operator, Ge | Gt | Eq);
    let upper = |c: VersionConstraint| matches!(c.operator, Le | Lt | Eq);

    if a.operator == Eq && b.operator == Eq {
        if a.version != b.version {
            return Err(RepositoryErrorKind::UnsatisfiableConstraint {
                name: name.to_string(),
                lower: a.to_string(),
                upper: b.to_string(),
            }
            .into());
        }
        return Ok(a);
    }
    if a.operator == Eq {
        return if b.satisfied(&a.version) {
            Ok(a)
        } else {
            Err(RepositoryErrorKind::UnsatisfiableConstraint {
                name: name.to_string(),
                lower: a.to_string(),
                upper: b.to_string(),
            }
            .into())
        };
    }
    if b.operator == Eq {
        return merge_two(name, b, a);
    }

    if lower(a) && lower(b) {
        return Ok(tighter_lower(a, b));
    }
    if upper(a) && upper(b) {
        return Ok(tighter_upper(a, b));
    }

    // one lower-bound-shaped, one upper-bound-shaped: both must hold
    let (lo, hi) = if lower(a) { (a, b) } else { (b, a) };
    if lo.satisfied(&hi.version) && hi.satisfied(&lo.version) {
        // both endpoints admit each other; keep whichever reads as
        // stricter so the merged constraint never gets looser.
        Ok(if lo.version >= hi.version { lo } else { hi })
    } else if lo.version <= hi.version {
        Ok(lo) // lo's lower bound already implies everything hi would add
    } else {
        Err(RepositoryErrorKind::UnsatisfiableConstraint {
            name: name.to_string(),
            lower: lo.to_string(),
            upper: hi.to_string(),
        }
        .into())
    }
}

fn tighter_lower(a: VersionConstraint, b: VersionConstraint) -> VersionConstraint {
    if a.version > b.version {
        a
    } else if b.version > a.version {
        b
    } else if a.operator == Operator::Gt || b.operator == Operator::Gt {
        VersionConstraint::new(Operator::Gt, a.version)
    } else {
        a
    }
}

fn tighter_upper(a: VersionConstraint, b: VersionConstraint) -> VersionConstraint {
    if a.version < b.version {
        a
    } else if b.version < a.version {
        b
    } else if a.operator == Operator::Lt || b.operator == Operator::Lt {
        VersionConstraint::new(Operator::Lt, a.version)
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nvc(repo: &mut Repository, name: &str) -> NameAndVersionConstraint {
        NameAndVersionConstraint::new(repo.interner.append(name), VersionConstraint::default())
    }

    #[test]
    fn minimal_parse_yields_one_row() {
        let mut repo = Repository::new();
        let n = repo.read("cran", b"Package: A3\nVersion: 1.0.0\n").unwrap();
        assert_eq!(n, 1);
        let q = nvc(&mut repo, "A3");
        let found = repo.find_latest_package(&q).unwrap();
        assert_eq!(found.name, "A3");
        assert_eq!(found.version, Version::new(1, 0, 0, 0));
    }

    #[test]
    fn dependency_parsing_captures_two_nvcs() {
        let mut repo = Repository::new();
        repo.read(
            "cran",
            b"Package: child\nVersion: 1.0\nDepends: parent (>= 1.0), R (>= 3.6)\n",
        )
        .unwrap();
        let q = nvc(&mut repo, "child");
        let row = repo.find_latest_package(&q).unwrap();
        assert_eq!(row.depends.len(), 2);
        assert_eq!(repo.interner.resolve(row.depends[0].name), "parent");
        assert_eq!(repo.interner.resolve(row.depends[1].name), "R");
    }

    #[test]
    fn latest_selection_picks_greatest_version() {
        let mut repo = Repository::new();
        repo.read("cran", b"Package: foo\nVersion: 1.0.2\n\nPackage: foo\nVersion: 1.0.1\n")
            .unwrap();
        let q = nvc(&mut repo, "foo");
        let found = repo.find_latest_package(&q).unwrap();
        assert_eq!(found.version, Version::new(1, 0, 2, 0));
    }

    #[test]
    fn transitive_closure_is_insertion_ordered() {
        let mut repo = Repository::new();
        repo.read(
            "cran",
            b"Package: parent\nVersion: 1.0\n\n\
              Package: child\nVersion: 1.0\nDepends: parent (>= 1.0)\n\n\
              Package: grandchild\nVersion: 1.0\nDepends: child (>= 1.0)\n",
        )
        .unwrap();
        let q = nvc(&mut repo, "grandchild");
        let closure = repo.transitive_dependencies(&q).unwrap();
        let names: Vec<&str> = closure.iter().map(|n| repo.interner.resolve(n.name)).collect();
        assert_eq!(names, vec!["child", "parent"]);
    }

    #[test]
    fn unmet_dependency_surfaces_as_not_found_during_closure() {
        let mut repo = Repository::new();
        repo.read("cran", b"Package: A\nVersion: 1.0\nDepends: B (>= 2.0)\n")
            .unwrap();
        let q = nvc(&mut repo, "A");
        let err = repo.transitive_dependencies(&q).unwrap_err();
        assert!(matches!(err.source, RepositoryErrorKind::NotFound(_)));
    }

    #[test]
    fn comment_and_continuation_roundtrip() {
        let mut repo = Repository::new();
        repo.read(
            "cran",
            b"# a comment\nPackage: x\nVersion: 1.0\nSuggests: foo (> 0.1),\n    bar\n",
        )
        .unwrap();
        let q = nvc(&mut repo, "x");
        let row = repo.find_latest_package(&q).unwrap();
        assert_eq!(row.suggests.len(), 2);
        assert_eq!(repo.interner.resolve(row.suggests[1].name), "bar");
        assert_eq!(row.suggests[1].constraint, VersionConstraint::default());
    }

    #[test]
    fn install_order_respects_dependency_edges() {
        let mut repo = Repository::new();
        repo.read(
            "cran",
            b"Package: a\nVersion: 1.0\nDepends: b (>= 1.0)\n\n\
              Package: b\nVersion: 1.0\n",
        )
        .unwrap();
        let order = repo.calculate_installation_order_all().unwrap();
        let names: Vec<&str> = order.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn install_order_reports_cycles() {
        let mut repo = Repository::new();
        repo.read(
            "cran",
            b"Package: a\nVersion: 1.0\nDepends: b (>= 1.0)\n\n\
              Package: b\nVersion: 1.0\nDepends: a (>= 1.0)\n",
        )
        .unwrap();
        let err = repo.calculate_installation_order_all().unwrap_err();
        assert!(matches!(err.source, RepositoryErrorKind::CyclicDependencies(_)));
    }

    #[test]
    fn merge_constraints_tightens_lower_bound() {
        let mut repo = Repository::new();
        let name = repo.interner.append("x");
        let nvcs = vec![
            NameAndVersionConstraint::new(name, VersionConstraint::new(Operator::Ge, Version::new(1, 0, 0, 0))),
            NameAndVersionConstraint::new(name, VersionConstraint::new(Operator::Ge, Version::new(2, 0, 0, 0))),
        ];
        let merged = repo.merge_constraints(&nvcs).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].constraint.version, Version::new(2, 0, 0, 0));
    }

    #[test]
    fn merge_constraints_rejects_contradiction() {
        let mut repo = Repository::new();
        let name = repo.interner.append("x");
        let nvcs = vec![
            NameAndVersionConstraint::new(name, VersionConstraint::new(Operator::Gt, Version::new(2, 0, 0, 0))),
            NameAndVersionConstraint::new(name, VersionConstraint::new(Operator::Lt, Version::new(1, 0, 0, 0))),
        ];
        let err = repo.merge_constraints(&nvcs).unwrap_err();
        assert!(matches!(err.source, RepositoryErrorKind::UnsatisfiableConstraint { .. }));
    }
}
