//! A single declared endpoint: method set, URI template, compiled matcher,
//! constraints, middleware list, namespace and handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::debug;

use crate::controller::{ControllerRegistry, ParamSpec, INVOKABLE_METHOD};
use crate::error::RouterError;
use crate::middleware::MiddlewareRegistry;
use crate::pattern::{CompiledMatcher, Constraint, MatchResult};
use crate::request::Request;
use crate::resolver::{Arg, ResolverContext, ResolverRegistry};
use crate::response::{HandlerOutput, Response};

/// Callable handler form: an explicit `(request, match)` pair in place of
/// reflected parameters.
pub type HandlerFn =
    Arc<dyn Fn(&Request, &MatchResult) -> anyhow::Result<HandlerOutput> + Send + Sync>;

/// The three handler shapes a route may carry.
#[derive(Clone)]
pub enum Handler {
    /// `"Controller@method"` reference. The method suffix defaults to the
    /// invokable entry when omitted; the route's namespace prefixes the
    /// controller reference at dispatch time.
    Action(String),
    /// Explicit `(controller, method)` pair; the namespace does not apply.
    Pair(String, String),
    /// Inline callable.
    Callable(HandlerFn),
}

impl Handler {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Request, &MatchResult) -> anyhow::Result<HandlerOutput> + Send + Sync + 'static,
    {
        Handler::Callable(Arc::new(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Action(reference) => write!(f, "Action({reference:?})"),
            Handler::Pair(controller, method) => write!(f, "Pair({controller:?}, {method:?})"),
            Handler::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<&str> for Handler {
    fn from(reference: &str) -> Self {
        Handler::Action(reference.to_string())
    }
}

impl From<String> for Handler {
    fn from(reference: String) -> Self {
        Handler::Action(reference)
    }
}

impl From<(&str, &str)> for Handler {
    fn from((controller, method): (&str, &str)) -> Self {
        Handler::Pair(controller.to_string(), method.to_string())
    }
}

/// Read-only registries a dispatch consults; owned by the router facade.
pub struct DispatchContext<'a> {
    pub controllers: &'a ControllerRegistry,
    pub resolvers: &'a ResolverRegistry,
    pub middleware: &'a MiddlewareRegistry,
}

/// One declared endpoint.
///
/// Mutators are fluent and meant for the declaration phase; matching takes
/// `&self`, so the borrow checker keeps routes immutable once dispatch
/// starts.
#[derive(Debug)]
pub struct Route {
    methods: Vec<Method>,
    uri: String,
    matcher: CompiledMatcher,
    constraints: HashMap<String, Constraint>,
    namespace: String,
    middleware: Vec<String>,
    handler: Handler,
    name: Option<String>,
}

impl Route {
    /// Compile a route for the given methods and template.
    ///
    /// The facade's declaration helpers add HEAD alongside GET; construct
    /// directly only when that behavior is not wanted.
    ///
    /// # Errors
    ///
    /// `InvalidTemplate` when the template does not compile.
    ///
    /// # Panics
    ///
    /// Panics when `methods` is empty.
    pub fn new(
        methods: Vec<Method>,
        uri: impl Into<String>,
        handler: Handler,
    ) -> Result<Self, RouterError> {
        assert!(!methods.is_empty(), "a route must allow at least one method");
        let uri = uri.into();
        let matcher = CompiledMatcher::compile(&uri, &HashMap::new())?;
        Ok(Self {
            methods,
            uri,
            matcher,
            constraints: HashMap::new(),
            namespace: String::new(),
            middleware: Vec::new(),
            handler,
            name: None,
        })
    }

    pub fn supports(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn matcher(&self) -> &CompiledMatcher {
        &self.matcher
    }

    pub fn middleware_ids(&self) -> &[String] {
        &self.middleware
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Apply the compiled matcher to a request path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> MatchResult {
        self.matcher.match_path(path)
    }

    /// Constrain a segment; the template marker still decides optionality.
    ///
    /// # Panics
    ///
    /// Panics when the constraint pattern makes the route regex invalid.
    pub fn where_(&mut self, name: &str, pattern: &str) -> &mut Self {
        self.set_constraint(name, Constraint::new(pattern))
    }

    /// Constrain a segment and override its required/optional marker.
    ///
    /// # Panics
    ///
    /// Panics when the constraint pattern makes the route regex invalid.
    pub fn where_required(&mut self, name: &str, pattern: &str, required: bool) -> &mut Self {
        self.set_constraint(name, Constraint::with_required(pattern, required))
    }

    fn set_constraint(&mut self, name: &str, constraint: Constraint) -> &mut Self {
        self.constraints.insert(name.to_string(), constraint);
        self.recompile();
        self
    }

    /// Replace the constraint map; used by the facade to install the
    /// group-composed constraints at creation time.
    pub fn constraints(&mut self, constraints: HashMap<String, Constraint>) -> &mut Self {
        self.constraints = constraints;
        self.recompile();
        self
    }

    /// Namespace prefixed onto string controller references.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = namespace.into();
        self
    }

    /// Replace the middleware identifier list.
    pub fn middleware(&mut self, ids: Vec<String>) -> &mut Self {
        self.middleware = ids;
        self
    }

    /// Assign a logical name.
    pub fn name(&mut self, id: impl Into<String>) -> &mut Self {
        self.name = Some(id.into());
        self
    }

    fn recompile(&mut self) {
        self.matcher = CompiledMatcher::compile(&self.uri, &self.constraints)
            .expect("Failed to compile route pattern");
    }

    /// Execute the route for a matched request: build its middleware
    /// chain, invoke the handler with resolved arguments and coerce the
    /// return value into a response.
    pub fn run(
        &self,
        result: &MatchResult,
        request: &Request,
        cx: &DispatchContext<'_>,
    ) -> Result<Response, RouterError> {
        let chain = cx.middleware.chain(&self.middleware)?;
        let terminal = |request: &Request, result: &MatchResult| -> Result<Response, RouterError> {
            self.invoke(result, request, cx)
                .map(HandlerOutput::into_response)
        };
        match &chain {
            Some(link) => link.run(request, result, &terminal),
            None => terminal(request, result),
        }
    }

    fn invoke(
        &self,
        result: &MatchResult,
        request: &Request,
        cx: &DispatchContext<'_>,
    ) -> Result<HandlerOutput, RouterError> {
        match &self.handler {
            Handler::Callable(f) => f(request, result).map_err(RouterError::Handler),
            Handler::Action(reference) => {
                let (controller, method) = split_action(reference);
                let controller = self.qualified(&controller);
                self.call_controller(&controller, &method, result, request, cx)
            }
            Handler::Pair(controller, method) => {
                self.call_controller(controller, method, result, request, cx)
            }
        }
    }

    fn qualified(&self, controller: &str) -> String {
        if self.namespace.is_empty() {
            controller.to_string()
        } else {
            format!("{}::{}", self.namespace, controller)
        }
    }

    fn call_controller(
        &self,
        controller: &str,
        method: &str,
        result: &MatchResult,
        request: &Request,
        cx: &DispatchContext<'_>,
    ) -> Result<HandlerOutput, RouterError> {
        let instance = cx.controllers.instantiate(controller).ok_or_else(|| {
            RouterError::UnknownController {
                controller: controller.to_string(),
            }
        })?;
        let specs = instance
            .parameters(method)
            .ok_or_else(|| RouterError::UnknownMethod {
                controller: controller.to_string(),
                method: method.to_string(),
            })?;
        let args = resolve_args(&specs, result, request, cx.resolvers)?;
        debug!(
            controller = %controller,
            method = %method,
            args = args.len(),
            "Controller dispatch"
        );
        instance
            .call(method, args, request)
            .map_err(RouterError::Handler)
    }
}

/// Split a `"Controller@method"` reference on the first `@`; a missing
/// suffix falls back to the invokable entry.
fn split_action(reference: &str) -> (String, String) {
    match reference.split_once('@') {
        Some((controller, method)) => (controller.to_string(), method.to_string()),
        None => (reference.to_string(), INVOKABLE_METHOD.to_string()),
    }
}

/// Resolve one argument per declared parameter, then append every captured
/// segment value as trailing positional arguments.
///
/// Typed parameters go through the resolver registry; untyped parameters
/// bind by segment name and are dropped when the template has no segment
/// of that name.
fn resolve_args(
    specs: &[ParamSpec],
    result: &MatchResult,
    request: &Request,
    resolvers: &ResolverRegistry,
) -> Result<Vec<Arg>, RouterError> {
    let mut args = Vec::with_capacity(specs.len() + result.values().len());
    for (index, spec) in specs.iter().enumerate() {
        let captured = result.named(&spec.name);
        match spec.ty.as_deref() {
            Some(ty) => {
                let cx = ResolverContext {
                    value: captured,
                    result,
                    request,
                    name: &spec.name,
                    index,
                };
                match resolvers.invoke(ty, &cx) {
                    Some(arg) => args.push(arg),
                    None => {
                        return Err(RouterError::UnresolvedParameterType {
                            name: spec.name.clone(),
                            ty: ty.to_string(),
                        })
                    }
                }
            }
            None => {
                if let Some(value) = captured {
                    args.push(Arg::Value(Value::String(value.to_string())));
                }
            }
        }
    }
    for value in result.values() {
        args.push(match value {
            Some(v) => Arg::Value(Value::String(v.clone())),
            None => Arg::Absent,
        });
    }
    Ok(args)
}
