//! Route pattern compilation and matching.
//!
//! A pattern is built from a spec string of the form `"[METHOD[|METHOD]] path"`.
//! The method token is optional and defaults to `GET`; an explicit `*` accepts
//! any method. The path is matched segment by segment: `:name` captures one
//! non-empty segment, a trailing `/*` matches the prefix and anything below
//! it, and a literal path of `*` matches every path.

/// One compiled segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures one non-empty request segment under the given name.
    Param(String),
}

/// Compiled path matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    /// Literal `*`: every path matches.
    Any,
    /// Anchored segment sequence; `wildcard` marks a trailing `/*`.
    Segments {
        segments: Vec<Segment>,
        wildcard: bool,
    },
}

/// Accepted methods for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MethodSet {
    Any,
    List(Vec<String>),
}

/// A compiled method+path matcher with named parameter capture.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    methods: MethodSet,
    path: PathPattern,
    template: String,
}

impl RoutePattern {
    /// Compile a spec string. Runs of whitespace are collapsed; an empty spec
    /// compiles to a GET match on every path.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        Self::parse_with_base(spec, "")
    }

    /// Compile a spec string, prefixing `base` onto the path portion.
    ///
    /// The prefix is applied after the method token has been split off, so a
    /// base of `/api` turns `"GET /users"` into a match on `/api/users`.
    #[must_use]
    pub fn parse_with_base(spec: &str, base: &str) -> Self {
        let mut tokens = spec.split_whitespace();
        let first = tokens.next().unwrap_or("*");
        let rest: Vec<&str> = tokens.collect();

        // A single token is a path; any-method requires an explicit `*` token.
        let (methods, path_token) = if rest.is_empty() {
            (MethodSet::List(vec!["GET".to_string()]), first)
        } else {
            (parse_methods(first), *rest.last().unwrap_or(&first))
        };

        let template = apply_base(path_token, base);
        let path = compile_path(&template);
        Self {
            methods,
            path,
            template,
        }
    }

    /// Pattern that matches any method and any path. Used for registrations
    /// that supply callbacks without a spec.
    #[must_use]
    pub fn any() -> Self {
        Self {
            methods: MethodSet::Any,
            path: PathPattern::Any,
            template: "*".to_string(),
        }
    }

    /// The (base-prefixed) path template this pattern was compiled from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        match &self.path {
            PathPattern::Any => Vec::new(),
            PathPattern::Segments { segments, .. } => segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Param(name) => Some(name.as_str()),
                    Segment::Literal(_) => None,
                })
                .collect(),
        }
    }

    /// Match a request method and URL. Returns the captured parameters on a
    /// combined method+path match, `None` otherwise. Any `?query` suffix of
    /// the URL is ignored.
    #[must_use]
    pub fn matches(&self, method: &str, url: &str) -> Option<Vec<(String, String)>> {
        if !self.method_matches(method) {
            return None;
        }
        let path = url.split('?').next().unwrap_or(url);
        self.path_matches(path)
    }

    fn method_matches(&self, method: &str) -> bool {
        match &self.methods {
            MethodSet::Any => true,
            MethodSet::List(list) => list.iter().any(|m| m.eq_ignore_ascii_case(method)),
        }
    }

    fn path_matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let (segments, wildcard) = match &self.path {
            PathPattern::Any => return Some(Vec::new()),
            PathPattern::Segments { segments, wildcard } => (segments, *wildcard),
        };

        let parts: Vec<&str> = split_path(path);
        if wildcard {
            if parts.len() < segments.len() {
                return None;
            }
        } else if parts.len() != segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), (*part).to_string()));
                }
            }
        }
        Some(params)
    }
}

fn parse_methods(token: &str) -> MethodSet {
    let methods: Vec<String> = token.split('|').map(str::to_ascii_uppercase).collect();
    if methods.iter().any(|m| m == "*") {
        MethodSet::Any
    } else {
        MethodSet::List(methods)
    }
}

fn apply_base(path: &str, base: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path == "*" {
        // Any-path under a base becomes a prefix match on the base.
        return format!("{}/*", base.trim_end_matches('/'));
    }
    format!("{}{path}", base.trim_end_matches('/'))
}

fn compile_path(template: &str) -> PathPattern {
    if template == "*" {
        return PathPattern::Any;
    }
    let mut segments = Vec::new();
    let mut wildcard = false;
    let parts = split_path(template);
    for (i, part) in parts.iter().enumerate() {
        if *part == "*" && i == parts.len() - 1 {
            wildcard = true;
        } else if let Some(name) = part.strip_prefix(':') {
            segments.push(Segment::Param(name.to_string()));
        } else {
            segments.push(Segment::Literal((*part).to_string()));
        }
    }
    PathPattern::Segments { segments, wildcard }
}

/// Split a path on `/`. Leading and trailing slashes are trimmed so `/a/`
/// and `/a` compare equal; interior empty segments are kept, so `/a//b`
/// does not collapse to `/a/b`.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_defaults_to_get() {
        let pattern = RoutePattern::parse("/hello");
        assert!(pattern.matches("GET", "/hello").is_some());
        assert!(pattern.matches("POST", "/hello").is_none());
    }

    #[test]
    fn explicit_wildcard_method_matches_everything() {
        let pattern = RoutePattern::parse("* /hello");
        for method in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
            assert!(pattern.matches(method, "/hello").is_some());
        }
    }

    #[test]
    fn pipe_delimited_methods() {
        let pattern = RoutePattern::parse("PATCH|PUT *");
        assert!(pattern.matches("PATCH", "/anything").is_some());
        assert!(pattern.matches("PUT", "/anything").is_some());
        assert!(pattern.matches("GET", "/anything").is_none());
    }

    #[test]
    fn method_match_is_case_insensitive() {
        let pattern = RoutePattern::parse("get /hello");
        assert!(pattern.matches("GET", "/hello").is_some());
    }

    #[test]
    fn wildcard_path_matches_any_path() {
        let pattern = RoutePattern::parse("GET *");
        assert!(pattern.matches("GET", "/").is_some());
        assert!(pattern.matches("GET", "/a/b/c").is_some());
        assert!(pattern.matches("POST", "/a").is_none());
    }

    #[test]
    fn params_bind_in_declaration_order() {
        let pattern = RoutePattern::parse("GET /users/:user/posts/:post");
        assert_eq!(pattern.param_names(), vec!["user", "post"]);
        let params = pattern.matches("GET", "/users/jo/posts/7").unwrap();
        assert_eq!(
            params,
            vec![
                ("user".to_string(), "jo".to_string()),
                ("post".to_string(), "7".to_string())
            ]
        );
    }

    #[test]
    fn param_requires_exactly_one_segment() {
        let pattern = RoutePattern::parse("GET /a/:id");
        assert!(pattern.matches("GET", "/a/42").is_some());
        assert!(pattern.matches("GET", "/a").is_none());
        assert!(pattern.matches("GET", "/a/42/x").is_none());
    }

    #[test]
    fn query_suffix_is_ignored() {
        let pattern = RoutePattern::parse("GET /a/:id");
        let params = pattern.matches("GET", "/a/42?x=1").unwrap();
        assert_eq!(params, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn trailing_wildcard_is_a_prefix_match() {
        let pattern = RoutePattern::parse("GET /files/*");
        assert!(pattern.matches("GET", "/files").is_some());
        assert!(pattern.matches("GET", "/files/a").is_some());
        assert!(pattern.matches("GET", "/files/a/b/c").is_some());
        assert!(pattern.matches("GET", "/file").is_none());
    }

    #[test]
    fn base_prefix_applies_to_path_only() {
        let pattern = RoutePattern::parse_with_base("GET /users", "/api");
        assert!(pattern.matches("GET", "/api/users").is_some());
        assert!(pattern.matches("GET", "/users").is_none());
        assert_eq!(pattern.template(), "/api/users");
    }

    #[test]
    fn base_prefix_with_wildcard_path() {
        let pattern = RoutePattern::parse_with_base("GET *", "/api");
        assert!(pattern.matches("GET", "/api").is_some());
        assert!(pattern.matches("GET", "/api/anything/below").is_some());
        assert!(pattern.matches("GET", "/other").is_none());
    }

    #[test]
    fn any_pattern_matches_everything() {
        let pattern = RoutePattern::any();
        assert!(pattern.matches("DELETE", "/x/y").is_some());
    }

    #[test]
    fn trailing_slash_is_equivalent() {
        let pattern = RoutePattern::parse("GET /hello");
        assert!(pattern.matches("GET", "/hello/").is_some());
    }

    #[test]
    fn empty_interior_segments_do_not_match() {
        let pattern = RoutePattern::parse("GET /a/:id");
        assert!(pattern.matches("GET", "/a//42").is_none());

        let literal = RoutePattern::parse("GET /a/b");
        assert!(literal.matches("GET", "/a//b").is_none());
    }
}
