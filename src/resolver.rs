//! Parameter resolver registry - maps a declared parameter type to a
//! function producing the argument for that parameter.
//!
//! The registry is populated while the router is being assembled and is
//! read-only during dispatch. Handler parameters with a declared type are
//! looked up here; untyped parameters bind by segment name instead.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::pattern::MatchResult;
use crate::request::Request;
use crate::response::Response;

/// A handler argument produced by parameter resolution.
#[derive(Debug, Clone)]
pub enum Arg {
    /// The parameter could not be satisfied from the matched path.
    Absent,
    /// Plain value: string captures, parsed scalars, arrays.
    Value(Value),
    /// Clone of the request being dispatched.
    Request(Request),
    /// Response builder handed to the handler.
    Response(Response),
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Arg::Absent)
    }
}

/// Everything a resolver may consult when producing an argument.
pub struct ResolverContext<'a> {
    /// Captured value for the parameter's name, when the matched template
    /// has a segment of that name.
    pub value: Option<&'a str>,
    /// The full match result.
    pub result: &'a MatchResult,
    /// The request being dispatched.
    pub request: &'a Request,
    /// The declared parameter name.
    pub name: &'a str,
    /// Zero-based position of the parameter in the declaration.
    pub index: usize,
}

type ResolverFn = Arc<dyn Fn(&ResolverContext<'_>) -> Arg + Send + Sync>;

enum Entry {
    /// Plain value returned verbatim for every parameter of the type.
    Value(Arg),
    Resolver(ResolverFn),
}

/// Type-keyed registry of parameter resolvers.
#[derive(Default)]
pub struct ResolverRegistry {
    entries: HashMap<String, Entry>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the resolvers installed at boot:
    /// request handle, response builders, and the scalar and array
    /// conversions for captured segment values.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Request", |cx: &ResolverContext<'_>| {
            Arg::Request(cx.request.clone())
        });
        registry.register("Response", |_: &ResolverContext<'_>| {
            Arg::Response(Response::new())
        });
        registry.register("Json", |_: &ResolverContext<'_>| {
            Arg::Response(Response::json(Value::Null))
        });
        registry.register("String", |cx: &ResolverContext<'_>| {
            Arg::Value(Value::String(cx.value.unwrap_or_default().to_string()))
        });
        registry.register("i64", |cx: &ResolverContext<'_>| {
            Arg::Value(Value::from(parse_integer(cx.value)))
        });
        registry.register("bool", |cx: &ResolverContext<'_>| {
            Arg::Value(Value::Bool(parse_truthy(cx.value)))
        });
        registry.register("Vec", |cx: &ResolverContext<'_>| {
            Arg::Value(parse_list(cx.value))
        });
        registry
    }

    pub fn register<F>(&mut self, ty: &str, resolver: F)
    where
        F: Fn(&ResolverContext<'_>) -> Arg + Send + Sync + 'static,
    {
        debug!(ty = %ty, "Resolver registered");
        self.entries
            .insert(ty.to_string(), Entry::Resolver(Arc::new(resolver)));
    }

    /// Install a plain value returned verbatim for every parameter of `ty`.
    pub fn register_value(&mut self, ty: &str, value: Arg) {
        debug!(ty = %ty, "Resolver value registered");
        self.entries.insert(ty.to_string(), Entry::Value(value));
    }

    pub fn resolves(&self, ty: &str) -> bool {
        self.entries.contains_key(ty)
    }

    /// Produce an argument for a parameter of `ty`, or `None` when no
    /// resolver is registered.
    pub fn invoke(&self, ty: &str, cx: &ResolverContext<'_>) -> Option<Arg> {
        match self.entries.get(ty)? {
            Entry::Value(value) => Some(value.clone()),
            Entry::Resolver(resolver) => Some(resolver(cx)),
        }
    }
}

/// Decimal parse with the documented zero fallback.
fn parse_integer(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0)
}

/// Truthy strings accepted case-insensitively; everything else is false.
fn parse_truthy(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

/// List-shaped captures split on `,` or `|`; anything else wraps as a
/// single-element array. Elements normalize to integer, float, boolean or
/// string, in that order of preference.
fn parse_list(raw: Option<&str>) -> Value {
    let raw = match raw {
        Some(v) => v,
        None => return Value::Array(Vec::new()),
    };
    match [',', '|'].into_iter().find(|sep| raw.contains(*sep)) {
        Some(sep) => Value::Array(
            raw.split(sep)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(normalize_element)
                .collect(),
        ),
        None => Value::Array(vec![normalize_element(raw)]),
    }
}

fn normalize_element(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
