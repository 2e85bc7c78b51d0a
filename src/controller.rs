//! Controller dispatch surface for string and pair handlers.
//!
//! A controller is a named set of request methods the router can reach by
//! reference (`"Users@show"`). Since the language offers no runtime
//! reflection over function signatures, [`Controller::parameters`] is the
//! declared substitute: it lists a method's formal parameters so the router
//! can resolve arguments before [`Controller::call`] runs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::request::Request;
use crate::resolver::Arg;
use crate::response::HandlerOutput;

/// Method name string handlers fall back to when the `@method` suffix is
/// omitted.
pub const INVOKABLE_METHOD: &str = "invoke";

/// Formal parameter of a controller method: the declared name plus an
/// optional declared type that is looked up in the resolver registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Option<String>,
}

impl ParamSpec {
    pub fn typed(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: Some(ty.to_string()),
        }
    }

    pub fn untyped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: None,
        }
    }
}

/// A dispatchable controller.
///
/// `parameters` returns the formal parameter list of a method, or `None`
/// when the method does not exist. `call` receives the resolved arguments:
/// first one per declared parameter, then every captured segment value in
/// declaration order as trailing positional arguments.
pub trait Controller: Send + Sync {
    fn parameters(&self, method: &str) -> Option<Vec<ParamSpec>>;

    fn call(
        &self,
        method: &str,
        args: Vec<Arg>,
        request: &Request,
    ) -> anyhow::Result<HandlerOutput>;
}

type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Registry of controller factories keyed by (namespace-qualified) name.
///
/// A fresh instance is constructed for every dispatched request, so
/// controllers never share per-request state.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C, F>(&mut self, name: &str, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        debug!(controller = %name, "Controller registered");
        self.factories
            .insert(name.to_string(), Arc::new(move || Box::new(factory())));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub(crate) fn instantiate(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }
}
