use std::collections::HashMap;

use http::Method;
use tracing::{debug, warn};

use crate::controller::ControllerRegistry;
use crate::error::RouterError;
use crate::middleware::MiddlewareRegistry;
use crate::pattern::Constraint;
use crate::request::Request;
use crate::resolver::ResolverRegistry;
use crate::response::Response;
use crate::route::{DispatchContext, Handler, Route};

/// One declaration scope: any subset of prefix, namespace, constraints and
/// middleware composed onto routes declared while the scope is open.
#[derive(Debug, Clone, Default)]
pub struct GroupScope {
    prefix: Option<String>,
    namespace: Option<String>,
    constraints: HashMap<String, Constraint>,
    middleware: Vec<String>,
}

impl GroupScope {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn constraint(mut self, name: &str, pattern: &str) -> Self {
        self.constraints
            .insert(name.to_string(), Constraint::new(pattern));
        self
    }

    #[must_use]
    pub fn middleware(mut self, id: impl Into<String>) -> Self {
        self.middleware.push(id.into());
        self
    }
}

/// Stack of open declaration scopes.
///
/// Exists only while routes are being declared and is always driven by a
/// single caller; it never participates in matching.
#[derive(Debug, Default)]
pub(crate) struct GroupStack {
    scopes: Vec<GroupScope>,
}

impl GroupStack {
    pub fn push(&mut self, scope: GroupScope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<GroupScope> {
        self.scopes.pop()
    }

    #[allow(dead_code)]
    pub fn latest(&self) -> Option<&GroupScope> {
        self.scopes.last()
    }

    /// Effective URI prefix: outermost scope first, joined with `/`, the
    /// caller-supplied tail last. Empty components drop out and adjacent
    /// slashes collapse.
    pub fn prefix(&self, tail: &str) -> String {
        let mut joined = tail.trim_matches('/').to_string();
        for scope in self.scopes.iter().rev() {
            if let Some(prefix) = &scope.prefix {
                joined = join_path(prefix.trim_matches('/'), &joined);
            }
        }
        format!("/{joined}")
    }

    /// Effective namespace, joined with the module separator.
    pub fn namespace(&self, tail: &str) -> String {
        let mut joined = tail.trim_matches(':').to_string();
        for scope in self.scopes.iter().rev() {
            if let Some(namespace) = &scope.namespace {
                joined = join_namespace(namespace, &joined);
            }
        }
        joined
    }

    /// Effective constraints merged into `acc`; entries already in `acc`
    /// win, then inner scopes over outer ones.
    pub fn constraints(&self, mut acc: HashMap<String, Constraint>) -> HashMap<String, Constraint> {
        for scope in self.scopes.iter().rev() {
            for (name, constraint) in &scope.constraints {
                acc.entry(name.clone()).or_insert_with(|| constraint.clone());
            }
        }
        acc
    }

    /// Effective middleware appended to `acc`, outermost scope first so
    /// the outermost group's first middleware becomes the outermost link.
    pub fn middleware(&self, mut acc: Vec<String>) -> Vec<String> {
        for scope in &self.scopes {
            acc.extend(scope.middleware.iter().cloned());
        }
        acc
    }
}

fn join_path(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head}/{tail}"),
    }
}

fn join_namespace(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head}::{tail}"),
    }
}

/// Declaration-ordered route list with match-and-dispatch.
#[derive(Debug, Default)]
pub struct RouteCollection {
    routes: Vec<Route>,
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route, preserving declaration order.
    pub fn add(&mut self, route: Route) -> &mut Route {
        self.routes.push(route);
        self.routes.last_mut().expect("route was just appended")
    }

    pub fn last_mut(&mut self) -> Option<&mut Route> {
        self.routes.last_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match the request against routes in declaration order and dispatch
    /// the first one that accepts both path and method.
    ///
    /// When no route takes the request, the methods of every route whose
    /// path matched distinguish 404 from 405 and answer OPTIONS
    /// pre-flights.
    pub fn dispatch(
        &self,
        request: &Request,
        cx: &DispatchContext<'_>,
    ) -> Result<Response, RouterError> {
        for route in &self.routes {
            let result = route.match_path(&request.path);
            if result.matched() && route.supports(&request.method) {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    uri = %route.uri(),
                    "Route matched"
                );
                return route.run(&result, request, cx);
            }
        }

        let mut supported: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.match_path(&request.path).matched() {
                for method in route.methods() {
                    if !supported.contains(method) {
                        supported.push(method.clone());
                    }
                }
            }
        }

        if supported.is_empty() {
            warn!(method = %request.method, path = %request.path, "No route matched");
            return Err(RouterError::NoRouteForRequest {
                method: request.method.clone(),
                path: request.path.clone(),
            });
        }

        if request.method == Method::OPTIONS {
            debug!(path = %request.path, supported = ?supported, "Pre-flight answered");
            return Ok(Response::preflight(request.wants_json(), &supported));
        }

        warn!(
            method = %request.method,
            path = %request.path,
            supported = ?supported,
            "Method not allowed"
        );
        Err(RouterError::MethodNotAllowed { supported })
    }
}

/// Router facade: the route declaration surface plus request dispatch.
///
/// Declarations populate the collection, possibly inside nested groups;
/// once declaration is done the router is only ever read, so dispatch
/// needs no locking.
pub struct Router {
    pub routes: RouteCollection,
    pub controllers: ControllerRegistry,
    pub resolvers: ResolverRegistry,
    pub middleware: MiddlewareRegistry,
    groups: GroupStack,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Router with the default parameter resolvers installed.
    pub fn new() -> Self {
        Self {
            routes: RouteCollection::new(),
            controllers: ControllerRegistry::new(),
            resolvers: ResolverRegistry::with_defaults(),
            middleware: MiddlewareRegistry::new(),
            groups: GroupStack::default(),
        }
    }

    /// Declare a GET route; HEAD is registered alongside.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn get(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::GET, Method::HEAD], uri, handler.into())
    }

    /// Declare a POST route.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn post(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::POST], uri, handler.into())
    }

    /// Declare a PUT route.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn put(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::PUT], uri, handler.into())
    }

    /// Declare a PATCH route.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn patch(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::PATCH], uri, handler.into())
    }

    /// Declare a DELETE route.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn delete(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::DELETE], uri, handler.into())
    }

    /// Declare an OPTIONS route, overriding the synthesized pre-flight
    /// answer for its path.
    ///
    /// # Panics
    ///
    /// Panics when the URI template is malformed; declaration aborts.
    pub fn options(&mut self, uri: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(vec![Method::OPTIONS], uri, handler.into())
    }

    /// Open a declaration scope around `body`: routes declared inside
    /// compose the scope's prefix, namespace, constraints and middleware.
    pub fn group<F>(&mut self, scope: GroupScope, body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.groups.push(scope);
        body(self);
        self.groups.pop();
    }

    /// Attach a constraint to the most recently declared route.
    ///
    /// # Panics
    ///
    /// Panics when the constraint pattern makes the route regex invalid.
    pub fn where_(&mut self, name: &str, pattern: &str) -> &mut Self {
        if let Some(route) = self.routes.last_mut() {
            route.where_(name, pattern);
        }
        self
    }

    fn add(&mut self, methods: Vec<Method>, uri: &str, handler: Handler) -> &mut Route {
        let uri = self.groups.prefix(uri);
        let namespace = self.groups.namespace("");
        let constraints = self.groups.constraints(HashMap::new());
        let middleware = self.groups.middleware(Vec::new());

        debug!(methods = ?methods, uri = %uri, "Route declared");

        let mut route =
            Route::new(methods, uri, handler).expect("Failed to compile route template");
        route.namespace(namespace);
        route.constraints(constraints);
        route.middleware(middleware);
        self.routes.add(route)
    }

    /// Print all registered routes to stdout, for debugging declarations.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for route in self.routes.iter() {
            let methods = route
                .methods()
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join("|");
            println!("[route] {methods} {}", route.uri());
        }
    }

    /// Dispatch a request.
    ///
    /// 404 and 405 outcomes are rendered as responses here, following the
    /// request's content negotiation; other failures (unknown controller
    /// or method, unresolved parameter types, handler errors) propagate to
    /// the caller.
    pub fn dispatch(&self, request: &Request) -> Result<Response, RouterError> {
        let cx = DispatchContext {
            controllers: &self.controllers,
            resolvers: &self.resolvers,
            middleware: &self.middleware,
        };
        match self.routes.dispatch(request, &cx) {
            Err(RouterError::NoRouteForRequest { .. }) => {
                Ok(Response::not_found(request.wants_json()))
            }
            Err(RouterError::MethodNotAllowed { supported }) => Ok(
                Response::method_not_allowed(request.wants_json(), &supported),
            ),
            outcome => outcome,
        }
    }
}
