//! Include/exclude rules for event actions and branches

use serde::Deserialize;

/// Which actions are allowed to trigger a build.
///
/// An empty `includes` admits every action; an empty `excludes` rejects none.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ActionFilter {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl ActionFilter {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    pub fn is_eligible(&self, action: &str) -> bool {
        is_included(action, &self.includes) && !is_excluded(action, &self.excludes)
    }
}

pub fn is_included(action: &str, includes: &[String]) -> bool {
    includes.is_empty() || includes.iter().any(|i| i == action)
}

pub fn is_excluded(action: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|e| e == action)
}

/// Same convention as the action rules: no branches configured means all.
pub fn is_branch_allowed(branch: &str, branches: &[String]) -> bool {
    branches.is_empty() || branches.iter().any(|b| b == branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_lists_are_permissive() {
        for action in ["", "push", "opened", "deleted"] {
            assert!(is_included(action, &[]));
            assert!(!is_excluded(action, &[]));
        }
    }

    #[test]
    fn include_list_matches_exactly() {
        let includes = list(&["push", "pull_request"]);
        assert!(is_included("push", &includes));
        assert!(!is_included("delete", &list(&["push"])));
        assert!(!is_included("Push", &includes));
    }

    #[test]
    fn exclude_list_matches_exactly() {
        let excludes = list(&["deleted"]);
        assert!(is_excluded("deleted", &excludes));
        assert!(!is_excluded("created", &excludes));
        assert!(!is_excluded("Deleted", &excludes));
    }

    #[test]
    fn eligibility_combines_both_lists() {
        let filter = ActionFilter::new(list(&["opened", "synchronize"]), list(&["synchronize"]));
        assert!(filter.is_eligible("opened"));
        assert!(!filter.is_eligible("synchronize"));
        assert!(!filter.is_eligible("closed"));

        assert!(ActionFilter::default().is_eligible("anything"));
    }

    #[test]
    fn branches() {
        assert!(is_branch_allowed("main", &[]));
        assert!(is_branch_allowed("main", &list(&["main", "dev"])));
        assert!(!is_branch_allowed("feature/x", &list(&["main"])));
    }

    #[test]
    fn deserializes_with_missing_lists() {
        let filter: ActionFilter = toml::from_str(r#"excludes = ["deleted"]"#).unwrap();
        assert_eq!(filter, ActionFilter::new(vec![], list(&["deleted"])));
    }
}
