//! The version model: [`Version`], [`Operator`], and [`VersionConstraint`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// A four-component R package version (major, minor, patch, rev), totally
/// ordered lexicographically. `rev` covers the rare fourth segment CRAN
/// versions sometimes carry (e.g. `1.0.2.1000`).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub rev: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32, rev: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            rev,
        }
    }

    /// Parses a version from a DCF value such as `1.0.2`, `1.0-10`, or the
    /// SVN-style `r123`. Trims surrounding whitespace first.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidVersionFormat(s.to_string()));
        }

        if let Some(digits) = s.strip_prefix('r').or_else(|| s.strip_prefix('R')) {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let major = digits
                    .parse::<u32>()
                    .map_err(|_| VersionError::InvalidVersionFormat(s.to_string()))?;
                return Ok(Self::new(major, 0, 0, 0));
            }
            // starts with 'r' but isn't the SVN form; fall through to the
            // regular numeric-segment parse, which will reject it below.
        }

        let mut parts = [0u32; 4];
        let mut count = 0;
        for segment in s.split(['.', '-']) {
            if count == 4 {
                return Err(VersionError::InvalidVersionFormat(s.to_string()));
            }
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::InvalidVersionFormat(s.to_string()));
            }
            parts[count] = segment
                .parse::<u32>()
                .map_err(|_| VersionError::InvalidVersionFormat(s.to_string()))?;
            count += 1;
        }
        if count == 0 {
            return Err(VersionError::InvalidVersionFormat(s.to_string()));
        }

        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    /// Human-readable form: the trailing `rev` is omitted when zero.
    /// Machine consumers that need the full four components should use
    /// `Serialize` (or the struct fields directly) instead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rev == 0 {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.rev)
        }
    }
}

/// A version-comparison operator, as it appears in a DCF dependency value:
/// `name (>= 1.2)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operator {
    Lt = 0,
    Le = 1,
    Eq = 2,
    Ge = 3,
    Gt = 4,
}

impl Operator {
    /// Parses the operator prefix of a trimmed string like `>= 1.2`,
    /// returning the operator and the remainder. `=` and `==` both map to
    /// [`Operator::Eq`].
    pub fn parse_prefix(s: &str) -> Result<(Self, &str), VersionError> {
        let s = s.trim_start();
        for (prefix, op) in [
            ("<=", Operator::Le),
            (">=", Operator::Ge),
            ("==", Operator::Eq),
            ("<", Operator::Lt),
            (">", Operator::Gt),
            ("=", Operator::Eq),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return Ok((op, rest.trim_start()));
            }
        }
        Err(VersionError::InvalidOperator(s.to_string()))
    }

    fn satisfies(self, candidate: Ordering) -> bool {
        match self {
            Operator::Lt => candidate == Ordering::Less,
            Operator::Le => candidate != Ordering::Greater,
            Operator::Eq => candidate == Ordering::Equal,
            Operator::Ge => candidate != Ordering::Less,
            Operator::Gt => candidate == Ordering::Greater,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "=",
            Operator::Ge => ">=",
            Operator::Gt => ">",
        };
        write!(f, "{s}")
    }
}

/// A single `(operator, version)` requirement. The default is the "any"
/// constraint: `(Ge, 0.0.0.0)`, which every non-default version satisfies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionConstraint {
    pub operator: Operator,
    pub version: Version,
}

impl Default for VersionConstraint {
    fn default() -> Self {
        Self {
            operator: Operator::Ge,
            version: Version::default(),
        }
    }
}

impl VersionConstraint {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Whether `candidate` satisfies this constraint.
    pub fn satisfied(&self, candidate: &Version) -> bool {
        self.operator.satisfies(candidate.cmp(&self.version))
    }

    /// Parses a parenthesized requirement like `(>= 1.2.0)`. Surrounding
    /// parens are optional; whitespace around the operator is tolerated.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')').trim();
        let (operator, rest) = Operator::parse_prefix(inner)?;
        let version = Version::parse(rest)?;
        Ok(Self::new(operator, version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.operator, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_versions() {
        assert_eq!(Version::parse("1.0.0").unwrap(), Version::new(1, 0, 0, 0));
        assert_eq!(Version::parse("1.0").unwrap(), Version::new(1, 0, 0, 0));
        assert_eq!(Version::parse("1.0-10").unwrap(), Version::new(1, 0, 10, 0));
        assert_eq!(
            Version::parse("1.0.2.1000").unwrap(),
            Version::new(1, 0, 2, 1000)
        );
    }

    #[test]
    fn parses_svn_style_version() {
        assert_eq!(Version::parse("r123").unwrap(), Version::new(123, 0, 0, 0));
    }

    #[test]
    fn rejects_non_numeric_segments() {
        assert!(Version::parse("1.x.0").is_err());
        assert!(Version::parse("-1.0.0").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn display_hides_zero_rev_but_serialize_keeps_it() {
        let v = Version::new(1, 2, 0, 0);
        assert_eq!(v.to_string(), "1.2.0");
        let with_rev = Version::new(1, 2, 0, 9);
        assert_eq!(with_rev.to_string(), "1.2.0.9");
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"rev\":0"));
    }

    #[test]
    fn total_order_matches_lexicographic_tuple() {
        assert!(Version::new(1, 0, 2, 0) > Version::new(1, 0, 1, 9));
        assert!(Version::new(1, 1, 0, 0) > Version::new(1, 0, 9, 9));
        assert_eq!(Version::new(1, 0, 0, 0), Version::new(1, 0, 0, 0));
    }

    #[test]
    fn operator_parsing_and_eq_aliasing() {
        assert_eq!(Operator::parse_prefix("== 1.0").unwrap().0, Operator::Eq);
        assert_eq!(Operator::parse_prefix("= 1.0").unwrap().0, Operator::Eq);
        assert_eq!(Operator::parse_prefix(">= 1.0").unwrap().0, Operator::Ge);
        assert!(Operator::parse_prefix("~> 1.0").is_err());
    }

    #[test]
    fn constraint_satisfaction_is_total_and_matches_table() {
        let c = VersionConstraint::new(Operator::Ge, Version::new(1, 0, 0, 0));
        assert!(c.satisfied(&Version::new(1, 0, 0, 0)));
        assert!(c.satisfied(&Version::new(2, 0, 0, 0)));
        assert!(!c.satisfied(&Version::new(0, 9, 0, 0)));

        let eq = VersionConstraint::new(Operator::Eq, Version::new(1, 0, 0, 0));
        assert!(eq.satisfied(&Version::new(1, 0, 0, 0)));
        assert!(!eq.satisfied(&Version::new(1, 0, 0, 1)));
    }

    #[test]
    fn default_constraint_is_any() {
        let any = VersionConstraint::default();
        assert!(any.satisfied(&Version::new(0, 0, 0, 0)));
        assert!(any.satisfied(&Version::new(99, 0, 0, 0)));
    }

    #[test]
    fn parses_parenthesized_constraint() {
        let c = VersionConstraint::parse("(>= 1.2.0)").unwrap();
        assert_eq!(c.operator, Operator::Ge);
        assert_eq!(c.version, Version::new(1, 2, 0, 0));
    }
}
