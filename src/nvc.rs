//! [`NameAndVersionConstraint`] (NVC): a `(name, constraint)` pair as found
//! in `Depends`/`Suggests`/`Imports`/`LinkingTo` values.

use crate::error::VersionError;
use crate::interner::{InternedStr, Interner};
use crate::version::VersionConstraint;

/// A dependency declaration: a package name plus the version constraint it
/// must satisfy (defaulting to "any" when no parenthetical is given).
///
/// The name is an [`InternedStr`] handle into whichever [`Interner`]
/// produced it — almost always a [`crate::Repository`]'s own interner, so
/// names can be stored without copying. Resolve it back to text with
/// [`Interner::resolve`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NameAndVersionConstraint {
    pub name: InternedStr,
    pub constraint: VersionConstraint,
}

impl NameAndVersionConstraint {
    pub fn new(name: InternedStr, constraint: VersionConstraint) -> Self {
        Self { name, constraint }
    }

    /// Parses a standalone NVC string such as `dplyr`, `dplyr (>= 1.0.0)`,
    /// or `x(=1)`, interning the name into `interner`. This is the path used
    /// outside the DCF parser — e.g. the CLI's `can-install NAME` argument —
    /// where there's no surrounding tokenized field to draw from.
    ///
    /// The name must start with an ASCII letter.
    pub fn parse(s: &str, interner: &mut Interner) -> Result<Self, VersionError> {
        let s = s.trim();
        let paren_start = s.find('(');
        let (name_part, constraint_part) = match paren_start {
            Some(idx) => (s[..idx].trim(), Some(s[idx..].trim())),
            None => (s, None),
        };

        if !name_part
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_alphabetic())
        {
            return Err(VersionError::InvalidNameFormat(name_part.to_string()));
        }

        let constraint = match constraint_part {
            Some(c) => VersionConstraint::parse(c)?,
            None => VersionConstraint::default(),
        };

        Ok(Self::new(interner.append(name_part), constraint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_name_with_default_constraint() {
        let mut interner = Interner::new();
        let nvc = NameAndVersionConstraint::parse("dplyr", &mut interner).unwrap();
        assert_eq!(interner.resolve(nvc.name), "dplyr");
        assert_eq!(nvc.constraint, VersionConstraint::default());
    }

    #[test]
    fn parses_name_with_constraint_and_tight_parens() {
        let mut interner = Interner::new();
        let nvc = NameAndVersionConstraint::parse("x(=1)", &mut interner).unwrap();
        assert_eq!(interner.resolve(nvc.name), "x");
        assert!(nvc.constraint.satisfied(&crate::Version::new(1, 0, 0, 0)));
    }

    #[test]
    fn rejects_name_not_starting_with_letter() {
        let mut interner = Interner::new();
        assert!(NameAndVersionConstraint::parse("1abc", &mut interner).is_err());
    }
}
