//! Constants used across the library.

/// Packages assumed present in every R installation; excluded from dependency checking.
///
/// Obtained from `rownames(installed.packages(priority="base"))`, plus `R` itself
/// since `Depends: R (>= x.y)` is ubiquitous and never itself installable.
pub const BASE_PACKAGES: [&str; 15] = [
    "base",
    "compiler",
    "datasets",
    "graphics",
    "grDevices",
    "grid",
    "methods",
    "parallel",
    "splines",
    "stats",
    "stats4",
    "tcltk",
    "tools",
    "utils",
    "R",
];

/// Packages shipped alongside base R that are assumed present; excluded from dependency checking.
pub const RECOMMENDED_PACKAGES: [&str; 15] = [
    "boot",
    "class",
    "MASS",
    "cluster",
    "codetools",
    "foreign",
    "KernSmooth",
    "lattice",
    "Matrix",
    "mgcv",
    "nlme",
    "nnet",
    "rpart",
    "spatial",
    "survival",
];

/// Returns true if `name` is in the base or recommended set and should be excluded
/// from dependency-satisfiability checks.
pub fn is_privileged(name: &str) -> bool {
    BASE_PACKAGES.contains(&name) || RECOMMENDED_PACKAGES.contains(&name)
}

/// Name of a single-package metadata file within a source tree.
pub const DESCRIPTION_FILENAME: &str = "DESCRIPTION";

/// Name of a repository-wide metadata file.
pub const PACKAGES_FILENAME: &str = "PACKAGES";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_set_is_closed() {
        assert!(is_privileged("base"));
        assert!(is_privileged("R"));
        assert!(is_privileged("MASS"));
        assert!(!is_privileged("ggplot2"));
    }
}
