use crate::error::{Result, SkillsError};
use crate::skills::catalog::scan::Catalog;
use std::collections::BTreeSet;

/// Which packages a run installs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Every package in the catalog; targets are mirrored.
    All,
    /// A non-empty set of catalog packages; targets are overlaid.
    Packages(BTreeSet<String>),
}

impl Selection {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// The package ids this selection realizes against `catalog`.
    pub fn package_ids<'a>(&'a self, catalog: &'a Catalog) -> Vec<&'a str> {
        match self {
            Selection::All => catalog.packages.iter().map(String::as_str).collect(),
            Selection::Packages(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Turns requested names into a validated selection.
///
/// No names means every package. Otherwise the first requested name that is
/// missing from the catalog fails the whole resolution.
pub fn resolve(requested: &[String], catalog: &Catalog) -> Result<Selection> {
    if requested.is_empty() {
        return Ok(Selection::All);
    }

    let mut ids = BTreeSet::new();
    for name in requested {
        let name = name.trim();
        if name.is_empty() || !catalog.contains(name) {
            return Err(SkillsError::UnknownPackage {
                name: name.to_string(),
            });
        }
        ids.insert(name.to_string());
    }
    Ok(Selection::Packages(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn catalog(ids: &[&str]) -> Catalog {
        Catalog {
            root: PathBuf::from("/skills"),
            packages: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_empty_request_selects_all() {
        assert_eq!(resolve(&[], &catalog(&["alpha"])).unwrap(), Selection::All);
        assert_eq!(resolve(&[], &catalog(&[])).unwrap(), Selection::All);
    }

    #[test]
    fn test_unknown_name_fails_with_that_name() {
        let err = resolve(&names(&["alpha", "x", "y"]), &catalog(&["alpha"]))
            .expect_err("unknown");
        match err {
            SkillsError::UnknownPackage { name } => assert_eq!(name, "x"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_known_name_resolves() {
        let selection = resolve(&names(&["x"]), &catalog(&["x", "y"])).unwrap();
        assert_eq!(
            selection,
            Selection::Packages(BTreeSet::from(["x".to_string()]))
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let selection =
            resolve(&names(&["beta", "alpha", "beta"]), &catalog(&["alpha", "beta"])).unwrap();
        let Selection::Packages(ids) = selection else {
            panic!("expected explicit selection");
        };
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_blank_name_is_unknown() {
        let err = resolve(&names(&["  "]), &catalog(&["alpha"])).expect_err("blank");
        assert!(matches!(err, SkillsError::UnknownPackage { .. }));
    }

    #[test]
    fn test_package_ids_for_all_follow_catalog() {
        let catalog = catalog(&["beta", "alpha"]);
        assert_eq!(Selection::All.package_ids(&catalog), vec!["alpha", "beta"]);
    }
}
