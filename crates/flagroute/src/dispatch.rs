//! Route a parse result to a named handler.
//!
//! A flag triggers its handler when it has a `run` name and a truthy value.
//! Flags are scanned in declaration order and the first triggered one wins.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::key::Key;
use crate::opt::Opt;
use crate::registry::Registry;
use crate::value::Value;

/// Companion values handed to a handler, keyed by the names listed in
/// `needs` and `optionals`.
pub type Params = IndexMap<String, Value>;

/// The handler chosen for a parse result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub run: String,
    pub value: Value,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<T> {
    Ran(T),
    /// No flag with a handler was set.
    NoCommand,
}

impl<T> Dispatch<T> {
    pub fn ran(self) -> Option<T> {
        match self {
            Self::Ran(output) => Some(output),
            Self::NoCommand => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no handler bound for '{0}'")]
    UnknownHandler(String),
    #[error("handler '{run}' failed: {message}")]
    Failed { run: String, message: String },
}

/// Application object that owns the handlers.
pub trait Handler {
    type Output;

    fn invoke(&mut self, run: &str, params: Params) -> Result<Self::Output, DispatchError>;
}

type HandlerFn<'a, T> = Box<dyn FnMut(Params) -> Result<T, DispatchError> + 'a>;

/// A table of named closures implementing [`Handler`].
pub struct Handlers<'a, T> {
    table: IndexMap<String, HandlerFn<'a, T>>,
}

impl<T> Default for Handlers<'_, T> {
    fn default() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }
}

impl<'a, T> Handlers<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `run` to a handler that cannot fail.
    pub fn on<F>(self, run: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(Params) -> T + 'a,
    {
        self.try_on(run, move |params| Ok(f(params)))
    }

    pub fn try_on<F>(mut self, run: impl Into<String>, f: F) -> Self
    where
        F: FnMut(Params) -> Result<T, DispatchError> + 'a,
    {
        self.table.insert(run.into(), Box::new(f));
        self
    }

    pub fn contains(&self, run: &str) -> bool {
        self.table.contains_key(run)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl<T> Handler for Handlers<'_, T> {
    type Output = T;

    fn invoke(&mut self, run: &str, params: Params) -> Result<T, DispatchError> {
        let handler = self
            .table
            .get_mut(run)
            .ok_or_else(|| DispatchError::UnknownHandler(run.to_string()))?;
        handler(params)
    }
}

fn is_triggered(opt: &Opt) -> bool {
    !opt.key().is_index() && opt.run().is_some() && opt.value().is_some_and(Value::is_truthy)
}

fn params_for(opt: &Opt, registry: &Registry) -> Params {
    let mut params = Params::new();
    for name in opt.needs().chain(opt.optionals()) {
        let key = Key::parse(name);
        if key.is_index() || params.contains_key(name) {
            continue;
        }
        if let Some(value) = registry.get(&key).and_then(Opt::value) {
            params.insert(name.to_string(), value.clone());
        }
    }
    params
}

pub(crate) fn select(registry: &Registry) -> Option<Selection> {
    let mut triggered = registry.options().filter(|opt| is_triggered(opt));
    let first = triggered.next()?;
    for ignored in triggered {
        tracing::warn!(
            option = %ignored.key(),
            selected = %first.key(),
            "ignoring triggered option; only the first one dispatches"
        );
    }

    let run = first.run()?.to_string();
    let value = first.value()?.clone();
    Some(Selection {
        run,
        value,
        params: params_for(first, registry),
    })
}

pub(crate) fn dispatch<H: Handler>(
    registry: &Registry,
    handler: &mut H,
) -> Result<Dispatch<H::Output>, DispatchError> {
    let Some(selection) = select(registry) else {
        tracing::debug!("no option triggered a handler");
        return Ok(Dispatch::NoCommand);
    };
    tracing::debug!(run = %selection.run, params = selection.params.len(), "dispatching");
    handler
        .invoke(&selection.run, selection.params)
        .map(Dispatch::Ran)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(registry: &mut Registry, name: &str, value: Option<Value>, run: Option<&str>) {
        let id = registry.declare(Key::from(name));
        let opt = registry.by_id_mut(id);
        if let Some(value) = value {
            opt.set_value(value).unwrap();
        }
        if let Some(run) = run {
            opt.set_run(run.to_string());
        }
    }

    #[test]
    fn first_triggered_flag_wins() {
        let mut registry = Registry::new();
        flag(&mut registry, "a", Some(Value::from("x")), Some("first"));
        flag(&mut registry, "b", Some(Value::from("y")), Some("second"));

        let selection = select(&registry).unwrap();
        assert_eq!(selection.run, "first");
        assert_eq!(selection.value, Value::from("x"));
    }

    #[test]
    fn falsy_or_unbound_flags_do_not_trigger() {
        let mut registry = Registry::new();
        flag(&mut registry, "a", Some(Value::Bool(false)), Some("first"));
        flag(&mut registry, "b", Some(Value::from("y")), None);
        flag(&mut registry, "c", Some(Value::from("z")), Some(""));
        assert_eq!(select(&registry), None);

        flag(&mut registry, "d", Some(Value::Bool(true)), Some("last"));
        assert_eq!(select(&registry).unwrap().run, "last");
    }

    #[test]
    fn params_take_needs_then_optionals() {
        let mut registry = Registry::new();
        flag(&mut registry, "go", Some(Value::Bool(true)), Some("go"));
        flag(&mut registry, "b", Some(Value::from("bee")), None);
        flag(&mut registry, "c", Some(Value::from("sea")), None);
        flag(&mut registry, "d", None, None);
        let id = registry.lookup(&Key::from("go")).unwrap();
        registry.by_id_mut(id).add_needs(["b"]);
        registry.by_id_mut(id).add_optionals(["c", "b", "d", "missing"]);

        let selection = select(&registry).unwrap();
        let keys: Vec<&str> = selection.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(selection.params["b"], Value::from("bee"));
    }

    #[test]
    fn handlers_table_invokes_by_name() {
        let mut registry = Registry::new();
        flag(&mut registry, "go", Some(Value::Bool(true)), Some("go"));

        let mut calls = Vec::new();
        let mut handlers = Handlers::new().on("go", |params: Params| {
            calls.push(params.len());
            "done"
        });
        assert!(handlers.contains("go"));
        assert!(!handlers.contains("stop"));
        assert_eq!(handlers.names().collect::<Vec<_>>(), vec!["go"]);
        let out = dispatch(&registry, &mut handlers).unwrap();
        assert_eq!(out.clone().ran(), Some("done"));
        assert_eq!(out, Dispatch::Ran("done"));
        drop(handlers);
        assert_eq!(calls, vec![0]);

        let mut empty: Handlers<'_, ()> = Handlers::new();
        let err = dispatch(&registry, &mut empty).unwrap_err();
        assert_eq!(err, DispatchError::UnknownHandler("go".to_string()));

        let idle = Registry::new();
        let none = dispatch(&idle, &mut empty).unwrap();
        assert_eq!(none, Dispatch::NoCommand);
        assert_eq!(none.ran(), None);
    }
}
