use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RouterError;
use crate::pattern::MatchResult;
use crate::request::Request;
use crate::response::Response;

/// One wrapper around the rest of a route's pipeline.
///
/// Calling `next.run` continues toward the handler; returning without
/// calling it short-circuits the chain and the returned response becomes
/// the chain's result.
pub trait Middleware: Send + Sync {
    fn handle(
        &self,
        request: &Request,
        result: &MatchResult,
        next: Next<'_>,
    ) -> Result<Response, RouterError>;
}

type Terminal<'a> = &'a dyn Fn(&Request, &MatchResult) -> Result<Response, RouterError>;

/// Continuation handed to a middleware: the remaining links followed by
/// the terminal handler action.
pub struct Next<'a> {
    link: Option<&'a MiddlewareLink>,
    terminal: Terminal<'a>,
}

impl Next<'_> {
    pub fn run(self, request: &Request, result: &MatchResult) -> Result<Response, RouterError> {
        match self.link {
            Some(link) => link.run(request, result, self.terminal),
            None => (self.terminal)(request, result),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_next(terminal: Terminal<'_>) -> Next<'_> {
    Next {
        link: None,
        terminal,
    }
}

/// Singly linked middleware chain, built per request from the registry.
pub struct MiddlewareLink {
    middleware: Box<dyn Middleware>,
    next: Option<Box<MiddlewareLink>>,
}

impl std::fmt::Debug for MiddlewareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareLink")
            .field("next", &self.next)
            .finish()
    }
}

impl MiddlewareLink {
    pub fn run(
        &self,
        request: &Request,
        result: &MatchResult,
        terminal: Terminal<'_>,
    ) -> Result<Response, RouterError> {
        let next = Next {
            link: self.next.as_deref(),
            terminal,
        };
        self.middleware.handle(request, result, next)
    }
}

/// Factory constructing a fresh middleware instance per request.
pub type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// Middleware factories plus the alias and group tables used to resolve
/// the identifiers routes carry.
///
/// Identifier resolution: a group name expands recursively inline at its
/// position, an alias substitutes its target, anything else is taken as a
/// fully-qualified identifier.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
    aliases: HashMap<String, String>,
    groups: HashMap<String, Vec<String>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M, F>(&mut self, id: &str, factory: F)
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        debug!(middleware = %id, "Middleware registered");
        self.factories
            .insert(id.to_string(), Arc::new(move || Box::new(factory())));
    }

    /// Map a short alias onto a fully-qualified middleware identifier.
    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Name a list of identifiers that expands inline wherever it appears.
    pub fn group<I, S>(&mut self, name: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.insert(
            name.to_string(),
            members.into_iter().map(Into::into).collect(),
        );
    }

    /// Expand groups and aliases into the final ordered identifier list.
    pub fn resolve(&self, ids: &[String]) -> Vec<String> {
        let mut resolved = Vec::with_capacity(ids.len());
        let mut stack = Vec::new();
        for id in ids {
            self.expand(id, &mut resolved, &mut stack);
        }
        resolved
    }

    fn expand(&self, id: &str, out: &mut Vec<String>, stack: &mut Vec<String>) {
        if let Some(members) = self.groups.get(id) {
            if stack.iter().any(|g| g == id) {
                warn!(group = %id, "Cyclic middleware group skipped");
                return;
            }
            stack.push(id.to_string());
            for member in members {
                self.expand(member, out, stack);
            }
            stack.pop();
        } else if let Some(target) = self.aliases.get(id) {
            out.push(target.clone());
        } else {
            out.push(id.to_string());
        }
    }

    /// Build the per-request chain for an identifier list. The first
    /// identifier becomes the outermost link.
    ///
    /// # Errors
    ///
    /// `UnknownMiddleware` when a resolved identifier has no factory.
    pub fn chain(&self, ids: &[String]) -> Result<Option<Box<MiddlewareLink>>, RouterError> {
        let resolved = self.resolve(ids);
        let mut next = None;
        for id in resolved.iter().rev() {
            let factory = self
                .factories
                .get(id)
                .ok_or_else(|| RouterError::UnknownMiddleware { id: id.clone() })?;
            next = Some(Box::new(MiddlewareLink {
                middleware: factory(),
                next,
            }));
        }
        if !resolved.is_empty() {
            debug!(links = resolved.len(), "Middleware chain built");
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(
            &self,
            request: &Request,
            result: &MatchResult,
            next: Next<'_>,
        ) -> Result<Response, RouterError> {
            let inner = next.run(request, result)?;
            let trail = match &inner.body {
                serde_json::Value::String(s) => format!("{}>{}", self.0, s),
                _ => self.0.to_string(),
            };
            Ok(Response::text(trail))
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> MiddlewareRegistry {
        let mut registry = MiddlewareRegistry::new();
        registry.register("app::First", || Tag("first"));
        registry.register("app::Second", || Tag("second"));
        registry
    }

    #[test]
    fn test_first_identifier_is_outermost() {
        let registry = registry();
        let chain = registry
            .chain(&ids(&["app::First", "app::Second"]))
            .unwrap()
            .unwrap();
        let terminal = |_: &Request, _: &MatchResult| -> Result<Response, RouterError> {
            Ok(Response::text("handler"))
        };
        let request = Request::new(http::Method::GET, "/");
        let result = MatchResult::empty();
        let response = chain.run(&request, &result, &terminal).unwrap();
        assert_eq!(
            response.body,
            serde_json::Value::String("first>second>handler".to_string())
        );
    }

    #[test]
    fn test_alias_and_group_expansion() {
        let mut registry = registry();
        registry.alias("one", "app::First");
        registry.group("web", ["one", "app::Second"]);
        assert_eq!(
            registry.resolve(&ids(&["web"])),
            ids(&["app::First", "app::Second"])
        );
    }

    #[test]
    fn test_group_expands_inline_at_position() {
        let mut registry = registry();
        registry.register("app::Third", || Tag("third"));
        registry.group("pair", ["app::First", "app::Second"]);
        assert_eq!(
            registry.resolve(&ids(&["app::Third", "pair"])),
            ids(&["app::Third", "app::First", "app::Second"])
        );
    }

    #[test]
    fn test_nested_groups_expand_recursively() {
        let mut registry = registry();
        registry.group("inner", ["app::Second"]);
        registry.group("outer", ["app::First", "inner"]);
        assert_eq!(
            registry.resolve(&ids(&["outer"])),
            ids(&["app::First", "app::Second"])
        );
    }

    #[test]
    fn test_cyclic_group_does_not_hang() {
        let mut registry = registry();
        registry.group("a", ["app::First", "b"]);
        registry.group("b", ["a", "app::Second"]);
        assert_eq!(
            registry.resolve(&ids(&["a"])),
            ids(&["app::First", "app::Second"])
        );
    }

    #[test]
    fn test_unknown_identifier_fails_chain_build() {
        let registry = registry();
        let err = registry.chain(&ids(&["app::Missing"])).unwrap_err();
        assert!(matches!(err, RouterError::UnknownMiddleware { .. }));
    }

    #[test]
    fn test_empty_list_builds_no_chain() {
        let registry = registry();
        assert!(registry.chain(&[]).unwrap().is_none());
    }
}
