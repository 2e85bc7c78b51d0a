//! Route template compilation - turns `/users/{id}/posts/{?slug}` style
//! templates into anchored regular expressions with named capture groups.
//!
//! Placeholders are `{name}` (required) or `{?name}` (optional), where
//! `name` is one or more word characters and must be unique within a
//! template. Everything outside a placeholder is matched literally; there
//! is no implicit trailing-slash tolerance.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::RouterError;

/// Maximum number of named segments before captured values spill to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// Stack-allocated storage for captured segment values.
pub type CaptureVec = SmallVec<[Option<String>; MAX_INLINE_SEGMENTS]>;

/// Characters stripped from both ends of a constraint pattern before it is
/// embedded into the route regex.
const CONSTRAINT_TRIM: &[char] = &['/', '~', '@', ';', '%', '`', '#'];

/// Per-segment restriction: a regex fragment plus an optional override of
/// the template's required/optional marker.
///
/// When `required` is `None` the template marker decides; a `Some` value
/// wins over the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub pattern: String,
    pub required: Option<bool>,
}

impl Constraint {
    /// Constraint that leaves optionality to the template marker.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            required: None,
        }
    }

    /// Constraint that overrides the template marker.
    pub fn with_required(pattern: impl Into<String>, required: bool) -> Self {
        Self {
            pattern: pattern.into(),
            required: Some(required),
        }
    }

    fn trimmed(&self) -> &str {
        self.pattern.trim_matches(|c| CONSTRAINT_TRIM.contains(&c))
    }
}

// Placeholders are scanned after the template is regex-quoted, so the
// braces and the optional marker appear in their escaped form.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\{(\\\?)?(\w+)\\\}").expect("placeholder scanner is valid"));

/// A route template compiled to an anchored, Unicode-aware regex plus the
/// ordered list of named segments it captures.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    regex: Regex,
    pattern: String,
    segments: Arc<[String]>,
}

impl CompiledMatcher {
    /// Compile a template against a constraint map.
    ///
    /// Each placeholder becomes a named capture group whose body is the
    /// constraint's pattern (default `\w+`). Only the capture group itself
    /// is made optional; surrounding literals stay required, with one
    /// documented exception: a literal `/` immediately before an optional
    /// placeholder is folded into the optional group, so `/a/{?x}` accepts
    /// both `/a` and `/a/foo`.
    ///
    /// # Errors
    ///
    /// `InvalidTemplate` on duplicate segment names or when the rewritten
    /// pattern fails to compile (for example a malformed constraint).
    pub fn compile(
        template: &str,
        constraints: &HashMap<String, Constraint>,
    ) -> Result<Self, RouterError> {
        let quoted = regex::escape(template);
        let mut segments: Vec<String> = Vec::new();
        let mut rewritten = String::with_capacity(quoted.len() + 16);
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&quoted) {
            let whole = caps.get(0).expect("whole match always present");
            let marker_optional = caps.get(1).is_some();
            let name = caps.get(2).expect("segment name group").as_str();

            if segments.iter().any(|s| s == name) {
                return Err(RouterError::InvalidTemplate {
                    template: template.to_string(),
                    reason: format!("duplicate segment name `{name}`"),
                });
            }

            let (body, required) = match constraints.get(name) {
                Some(c) => (c.trimmed(), c.required.unwrap_or(!marker_optional)),
                None => (r"\w+", !marker_optional),
            };

            let mut literal = &quoted[last..whole.start()];
            if !required && literal.ends_with('/') {
                // Fold the preceding slash into the group so the segment
                // can be omitted together with its separator.
                literal = &literal[..literal.len() - 1];
                rewritten.push_str(literal);
                rewritten.push_str(&format!("(?:/(?P<{name}>{body}))?"));
            } else {
                rewritten.push_str(literal);
                rewritten.push_str(&format!("(?P<{name}>{body})"));
                if !required {
                    rewritten.push('?');
                }
            }

            segments.push(name.to_string());
            last = whole.end();
        }
        rewritten.push_str(&quoted[last..]);

        let anchored = format!("^{rewritten}$");
        let regex = Regex::new(&anchored).map_err(|e| RouterError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        debug!(
            template = %template,
            pattern = %anchored,
            segments = ?segments,
            "Template compiled"
        );

        Ok(Self {
            regex,
            pattern: anchored,
            segments: segments.into(),
        })
    }

    /// Apply the matcher to a request path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> MatchResult {
        match self.regex.captures(path) {
            Some(caps) => {
                let values: CaptureVec = self
                    .segments
                    .iter()
                    .map(|name| caps.name(name).map(|m| m.as_str().to_string()))
                    .collect();
                MatchResult {
                    matched: true,
                    segments: Arc::clone(&self.segments),
                    values,
                }
            }
            None => MatchResult::miss(Arc::clone(&self.segments)),
        }
    }

    /// The anchored regex source the template compiled to.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Segment names in declaration order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Outcome of applying a compiled matcher to a request path.
///
/// Captured values are reachable both by segment name ([`named`]) and as
/// the ordered sequence the template declared them in ([`values`]).
///
/// [`named`]: MatchResult::named
/// [`values`]: MatchResult::values
#[derive(Debug, Clone)]
pub struct MatchResult {
    matched: bool,
    segments: Arc<[String]>,
    values: CaptureVec,
}

impl MatchResult {
    fn miss(segments: Arc<[String]>) -> Self {
        let values = segments.iter().map(|_| None).collect();
        Self {
            matched: false,
            segments,
            values,
        }
    }

    /// A successful match with no segments, for running handlers outside
    /// of path matching.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matched: true,
            segments: Arc::from(Vec::new()),
            values: CaptureVec::new(),
        }
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    /// Captured value for a segment name, `None` when the segment is
    /// absent or unknown.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.segments
            .iter()
            .position(|s| s == name)
            .and_then(|i| self.values[i].as_deref())
    }

    /// Captured values in segment declaration order.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Segment names in declaration order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> CompiledMatcher {
        CompiledMatcher::compile(template, &HashMap::new()).unwrap()
    }

    #[test]
    fn test_literal_template() {
        let m = compile("/ping");
        assert!(m.match_path("/ping").matched());
        assert!(!m.match_path("/ping/").matched());
        assert!(!m.match_path("/pong").matched());
        assert!(m.segments().is_empty());
    }

    #[test]
    fn test_named_segment() {
        let m = compile("/users/{id}");
        let result = m.match_path("/users/42");
        assert!(result.matched());
        assert_eq!(result.named("id"), Some("42"));
        assert_eq!(result.values(), &[Some("42".to_string())]);
        assert!(!m.match_path("/users").matched());
        assert!(!m.match_path("/users/42/extra").matched());
    }

    #[test]
    fn test_segment_order_is_declaration_order() {
        let m = compile("/users/{user}/posts/{post}");
        assert_eq!(m.segments(), &["user".to_string(), "post".to_string()]);
        let result = m.match_path("/users/7/posts/9");
        assert_eq!(
            result.values(),
            &[Some("7".to_string()), Some("9".to_string())]
        );
    }

    #[test]
    fn test_optional_segment_with_leading_slash() {
        let m = compile("/search/{?q}");
        let absent = m.match_path("/search");
        assert!(absent.matched());
        assert_eq!(absent.named("q"), None);
        assert_eq!(absent.values(), &[None]);

        let present = m.match_path("/search/hello");
        assert!(present.matched());
        assert_eq!(present.named("q"), Some("hello"));
    }

    #[test]
    fn test_optional_segment_inside_literal() {
        // No separating slash: only the capture group itself is optional.
        let m = compile("/file-{?ext}");
        assert!(m.match_path("/file-").matched());
        assert!(m.match_path("/file-txt").matched());
        assert!(!m.match_path("/file").matched());
    }

    #[test]
    fn test_duplicate_segment_is_invalid() {
        let err = CompiledMatcher::compile("/a/{x}/{x}", &HashMap::new()).unwrap_err();
        match err {
            RouterError::InvalidTemplate { reason, .. } => {
                assert!(reason.contains("duplicate segment name"));
            }
            other => panic!("expected InvalidTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_constraint_restricts_segment() {
        let mut constraints = HashMap::new();
        constraints.insert("id".to_string(), Constraint::new(r"\d+"));
        let m = CompiledMatcher::compile("/users/{id}", &constraints).unwrap();
        assert!(m.match_path("/users/42").matched());
        assert!(!m.match_path("/users/abc").matched());
    }

    #[test]
    fn test_constraint_pattern_is_trimmed() {
        let mut constraints = HashMap::new();
        constraints.insert("id".to_string(), Constraint::new(r"/\d+/"));
        let m = CompiledMatcher::compile("/users/{id}", &constraints).unwrap();
        assert!(m.match_path("/users/42").matched());
        assert!(!m.match_path("/users//42/").matched());
    }

    #[test]
    fn test_constraint_required_override() {
        // The template says optional; the constraint forces required.
        let mut constraints = HashMap::new();
        constraints.insert("q".to_string(), Constraint::with_required(r"\w+", true));
        let m = CompiledMatcher::compile("/search/{?q}", &constraints).unwrap();
        assert!(!m.match_path("/search").matched());
        assert!(m.match_path("/search/term").matched());
    }

    #[test]
    fn test_unicode_segment_values() {
        let m = compile("/tags/{name}");
        let result = m.match_path("/tags/héllo");
        assert!(result.matched());
        assert_eq!(result.named("name"), Some("héllo"));
    }

    #[test]
    fn test_regex_metacharacters_in_literals_are_inert() {
        let m = compile("/v1.0/items");
        assert!(m.match_path("/v1.0/items").matched());
        assert!(!m.match_path("/v1x0/items").matched());
    }

    #[test]
    fn test_invalid_constraint_pattern() {
        let mut constraints = HashMap::new();
        constraints.insert("id".to_string(), Constraint::new("[unclosed"));
        let err = CompiledMatcher::compile("/users/{id}", &constraints).unwrap_err();
        assert!(matches!(err, RouterError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_miss_preserves_value_shape() {
        let m = compile("/users/{id}");
        let result = m.match_path("/other");
        assert!(!result.matched());
        assert_eq!(result.values(), &[None]);
        assert_eq!(result.named("id"), None);
    }
}
