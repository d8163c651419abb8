//! The `authRequired` gate.

/// A tool with no required auth services is open to everyone; otherwise at
/// least one of them must be verified.
pub fn is_authorized(auth_required: &[String], verified: &[String]) -> bool {
    auth_required.is_empty() || auth_required.iter().any(|r| verified.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_open_tool() {
        assert!(is_authorized(&[], &[]));
        assert!(is_authorized(&[], &names(&["google"])));
    }

    #[test]
    fn test_any_overlap_authorizes() {
        let required = names(&["google", "github"]);
        assert!(is_authorized(&required, &names(&["github"])));
        assert!(!is_authorized(&required, &names(&["okta"])));
        assert!(!is_authorized(&required, &[]));
    }
}
