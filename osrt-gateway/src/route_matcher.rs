//! First-match-wins linear scan over a manifest's declared routes, with a
//! single trailing `/*` wildcard. Deliberately not a radix trie: a
//! plugin's route table is tiny and declaration order is itself the
//! precedence rule (exact routes declared before wildcards win).

use osrt_core::RouteSpec;

/// Normalises `method` to upper-case and ensures `subpath` starts with `/`,
/// then returns the first route whose methods contain it and whose path
/// matches.
pub fn match_route<'a>(routes: &'a [RouteSpec], method: &str, subpath: &str) -> Option<&'a RouteSpec> {
    let method = method.to_ascii_uppercase();
    let subpath = if subpath.starts_with('/') {
        subpath.to_string()
    } else {
        format!("/{subpath}")
    };

    routes.iter().find(|route| {
        let has_method = route
            .methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&method));
        has_method && path_matches(&route.path, &subpath)
    })
}

fn path_matches(route_path: &str, subpath: &str) -> bool {
    match route_path.strip_suffix("/*") {
        Some(prefix) => subpath == prefix || subpath.starts_with(&format!("{prefix}/")),
        None => subpath == route_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osrt_core::RouteAuth;

    fn route(id: &str, path: &str, methods: &[&str]) -> RouteSpec {
        RouteSpec {
            id: id.to_string(),
            path: path.to_string(),
            methods: methods.iter().map(|s| s.to_string()).collect(),
            auth: RouteAuth::Owner,
            description: None,
        }
    }

    #[test]
    fn exact_route_wins_over_wildcard_when_declared_first() {
        let routes = vec![
            route("exact", "/api/health", &["GET"]),
            route("wildcard", "/api/*", &["GET"]),
        ];
        assert_eq!(match_route(&routes, "GET", "/api/health").unwrap().id, "exact");
        assert_eq!(match_route(&routes, "GET", "/api/other").unwrap().id, "wildcard");
    }

    #[test]
    fn wildcard_matches_its_own_prefix_with_no_trailing_segment() {
        let routes = vec![route("app", "/app/*", &["GET"])];
        assert_eq!(match_route(&routes, "GET", "/app").unwrap().id, "app");
        assert_eq!(match_route(&routes, "GET", "/app/").unwrap().id, "app");
        assert_eq!(match_route(&routes, "GET", "/app/sub/path").unwrap().id, "app");
    }

    #[test]
    fn wildcard_does_not_match_a_different_top_level_prefix() {
        let routes = vec![route("app", "/app/*", &["GET"])];
        assert!(match_route(&routes, "GET", "/application").is_none());
    }

    #[test]
    fn method_mismatch_excludes_the_route() {
        let routes = vec![route("exact", "/callback", &["POST"])];
        assert!(match_route(&routes, "GET", "/callback").is_none());
    }

    #[test]
    fn method_comparison_is_case_insensitive() {
        let routes = vec![route("exact", "/callback", &["get"])];
        assert!(match_route(&routes, "GET", "/callback").is_some());
    }

    #[test]
    fn subpath_missing_leading_slash_is_normalised() {
        let routes = vec![route("exact", "/callback", &["GET"])];
        assert!(match_route(&routes, "GET", "callback").is_some());
    }

    #[test]
    fn no_route_matches_returns_none() {
        let routes = vec![route("exact", "/callback", &["GET"])];
        assert!(match_route(&routes, "GET", "/unknown").is_none());
    }
}
