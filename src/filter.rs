//! Endpoint naming and filtering
//!
//! Supports:
//! - Key normalization: `https://host/api/users` → `host_api_users`
//! - Ingestion-time inclusion regex: only matching endpoint names are recorded
//! - Constraint scopes: whole report, one endpoint, `*` or `a, b,c`

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize an endpoint name into a report key
///
/// Strips a leading protocol scheme (`http://`, `https://`, ...) and replaces
/// path separators with `_`. Normalizing an already normalized key is a no-op.
///
/// # Example
/// ```
/// use perfgate::filter::normalize_endpoint;
///
/// assert_eq!(normalize_endpoint("http://shop/cart/add"), "shop_cart_add");
/// assert_eq!(normalize_endpoint("Login"), "Login");
/// ```
pub fn normalize_endpoint(name: &str) -> String {
    let trimmed = name.trim();
    let without_scheme = match trimmed.find("://") {
        Some(idx) if is_scheme(&trimmed[..idx]) => &trimmed[idx + 3..],
        _ => trimmed,
    };
    without_scheme.replace(['/', '\\'], "_")
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Ingestion-time endpoint filter
#[derive(Debug, Clone, Default)]
pub struct EndpointFilter {
    /// Inclusion pattern (None = every endpoint)
    include: Option<Regex>,
}

impl EndpointFilter {
    /// Create a filter that includes every endpoint
    pub fn all() -> Self {
        Self { include: None }
    }

    /// Compile an inclusion pattern
    ///
    /// An empty or whitespace-only pattern includes every endpoint.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Ok(Self::all());
        }
        Ok(Self {
            include: Some(Regex::new(pattern)?),
        })
    }

    /// Compile an optional pattern
    pub fn from_optional(pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(p) => Self::from_pattern(p),
            None => Ok(Self::all()),
        }
    }

    /// Check if samples of this endpoint should be recorded
    pub fn should_include(&self, endpoint: &str) -> bool {
        match &self.include {
            None => true,
            Some(re) => re.is_match(endpoint),
        }
    }

    /// Source pattern, if any
    pub fn pattern(&self) -> Option<&str> {
        self.include.as_ref().map(Regex::as_str)
    }
}

/// Which part of a report a constraint looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "Option<String>", from = "Option<String>")]
pub enum EndpointScope {
    /// Run-level aggregate of the whole report
    #[default]
    WholeReport,
    /// One named endpoint
    Single(String),
    /// Every endpoint present in the report at evaluation time (`*`)
    Every,
    /// Several named endpoints (`a, b,c`)
    List(Vec<String>),
}

impl EndpointScope {
    /// Parse the user-facing filter string
    ///
    /// # Example
    /// ```
    /// use perfgate::filter::EndpointScope;
    ///
    /// assert_eq!(EndpointScope::parse(Some("*")), EndpointScope::Every);
    /// assert_eq!(
    ///     EndpointScope::parse(Some("a, b,c")),
    ///     EndpointScope::List(vec!["a".into(), "b".into(), "c".into()])
    /// );
    /// ```
    pub fn parse(spec: Option<&str>) -> Self {
        let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
            return EndpointScope::WholeReport;
        };

        if spec == "*" {
            return EndpointScope::Every;
        }

        if spec.contains(',') {
            let names: Vec<String> = spec
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            return match names.len() {
                0 => EndpointScope::WholeReport,
                1 => EndpointScope::Single(names[0].clone()),
                _ => EndpointScope::List(names),
            };
        }

        EndpointScope::Single(spec.to_string())
    }

    /// Name of the single endpoint, when this scope targets exactly one
    pub fn single(&self) -> Option<&str> {
        match self {
            EndpointScope::Single(name) => Some(name),
            _ => None,
        }
    }

    /// Whether evaluation needs the factory to expand this scope first
    pub fn needs_expansion(&self) -> bool {
        matches!(self, EndpointScope::Every | EndpointScope::List(_))
    }
}

impl fmt::Display for EndpointScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointScope::WholeReport => write!(f, "all endpoints"),
            EndpointScope::Single(name) => write!(f, "{}", name),
            EndpointScope::Every => write!(f, "*"),
            EndpointScope::List(names) => write!(f, "{}", names.join(",")),
        }
    }
}

impl From<Option<String>> for EndpointScope {
    fn from(value: Option<String>) -> Self {
        EndpointScope::parse(value.as_deref())
    }
}

impl From<EndpointScope> for Option<String> {
    fn from(value: EndpointScope) -> Self {
        match value {
            EndpointScope::WholeReport => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_and_separators() {
        assert_eq!(normalize_endpoint("https://example.com/a/b"), "example.com_a_b");
        assert_eq!(normalize_endpoint("/api/users"), "_api_users");
        assert_eq!(normalize_endpoint("dir\\file"), "dir_file");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_endpoint("http://host/path");
        assert_eq!(normalize_endpoint(&once), once);
    }

    #[test]
    fn test_normalize_keeps_non_scheme_colons() {
        assert_eq!(normalize_endpoint("GET 1://x"), "GET 1:__x");
    }

    #[test]
    fn test_filter_all_includes_everything() {
        let filter = EndpointFilter::all();
        assert!(filter.should_include("anything"));
        assert!(filter.pattern().is_none());
    }

    #[test]
    fn test_filter_pattern() {
        let filter = EndpointFilter::from_pattern("^api/").unwrap();
        assert!(filter.should_include("api/users"));
        assert!(!filter.should_include("static/logo.png"));
        assert_eq!(filter.pattern(), Some("^api/"));
    }

    #[test]
    fn test_filter_empty_pattern_includes_all() {
        let filter = EndpointFilter::from_pattern("  ").unwrap();
        assert!(filter.should_include("x"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(EndpointFilter::from_pattern("([").is_err());
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(EndpointScope::parse(None), EndpointScope::WholeReport);
        assert_eq!(EndpointScope::parse(Some("")), EndpointScope::WholeReport);
        assert_eq!(
            EndpointScope::parse(Some(" login ")),
            EndpointScope::Single("login".to_string())
        );
        assert_eq!(EndpointScope::parse(Some(" * ")), EndpointScope::Every);
        assert_eq!(
            EndpointScope::parse(Some("a,")),
            EndpointScope::Single("a".to_string())
        );
    }

    #[test]
    fn test_scope_list_trimmed() {
        match EndpointScope::parse(Some("a, b,c")) {
            EndpointScope::List(names) => assert_eq!(names, vec!["a", "b", "c"]),
            other => panic!("Expected List scope, got {:?}", other),
        }
    }

    #[test]
    fn test_scope_serde_roundtrip_through_option() {
        let scope: EndpointScope = Some("x, y".to_string()).into();
        let raw: Option<String> = scope.into();
        assert_eq!(raw.as_deref(), Some("x,y"));
    }
}
