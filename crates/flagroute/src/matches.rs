use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::dispatch::{self, Dispatch, DispatchError, Handler, Selection};
use crate::key::Key;
use crate::opt::Opt;
use crate::registry::Registry;
use crate::value::Value;

/// Resolved values of a successful parse.
///
/// Read-only: every accessor borrows, nothing here mutates an option.
/// Positional options seen during the parse but never declared are included,
/// so [`Matches::size`] may exceed the number of declarations.
#[derive(Debug, Clone)]
pub struct Matches {
    program: Option<String>,
    registry: Registry,
}

impl Matches {
    pub(crate) fn new(program: Option<String>, registry: Registry) -> Self {
        Self { program, registry }
    }

    /// The discarded first token.
    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    pub fn option(&self, key: impl Into<Key>) -> Option<&Opt> {
        self.registry.get(&key.into())
    }

    /// Resolved value or default, by name, alias or index.
    pub fn value(&self, key: impl Into<Key>) -> Option<&Value> {
        self.option(key).and_then(Opt::value)
    }

    pub fn get_str(&self, key: impl Into<Key>) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: impl Into<Key>) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    pub fn get_path(&self, key: impl Into<Key>) -> Option<&Path> {
        self.value(key).and_then(Value::as_path)
    }

    pub fn get_paths(&self, key: impl Into<Key>) -> Option<&[PathBuf]> {
        self.value(key).and_then(Value::as_paths)
    }

    /// Parse the value's text form, e.g. `get_parsed::<u16>("port")`.
    pub fn get_parsed<T: FromStr>(&self, key: impl Into<Key>) -> Option<Result<T, T::Err>> {
        self.value(key).map(|v| v.to_string().parse())
    }

    /// Whether the option was given on the command line (defaults excluded).
    pub fn is_present(&self, key: impl Into<Key>) -> bool {
        self.option(key).is_some_and(|o| o.own_value().is_some())
    }

    /// Positional options ordered by index.
    pub fn arguments(&self) -> Vec<&Opt> {
        let mut out: Vec<&Opt> = self
            .registry
            .options()
            .filter(|o| o.key().is_index())
            .collect();
        out.sort_by(|a, b| a.key().cmp(b.key()));
        out
    }

    /// Named options in declaration order, one entry per option.
    pub fn flags(&self) -> Vec<&Opt> {
        self.registry
            .options()
            .filter(|o| !o.key().is_index())
            .collect()
    }

    pub fn argument_values(&self) -> IndexMap<usize, &Value> {
        self.arguments()
            .into_iter()
            .filter_map(|o| Some((o.key().as_index()?, o.value()?)))
            .collect()
    }

    /// Flag values keyed by primary name; aliases never duplicate an entry.
    pub fn flag_values(&self) -> IndexMap<&str, &Value> {
        self.flags()
            .into_iter()
            .filter_map(|o| Some((o.key().as_name()?, o.value()?)))
            .collect()
    }

    /// All values in key order: positionals by index, then names.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        let mut out: Vec<(&Key, &Value)> = self
            .registry
            .options()
            .filter_map(|o| Some((o.key(), o.value()?)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out.into_iter()
    }

    /// Number of registered keys, aliases and on-the-fly positionals included.
    pub fn size(&self) -> usize {
        self.registry.size()
    }

    pub fn runs(&self) -> IndexMap<&Key, &str> {
        self.registry.runs()
    }

    pub fn needs(&self) -> IndexMap<&Key, Vec<&str>> {
        self.registry.needs()
    }

    pub fn optionals(&self) -> IndexMap<&Key, Vec<&str>> {
        self.registry.optionals()
    }

    /// The handler the parse result triggers, without invoking it.
    pub fn select(&self) -> Option<Selection> {
        dispatch::select(&self.registry)
    }

    pub fn dispatch<H: Handler>(&self, handler: &mut H) -> Result<Dispatch<H::Output>, DispatchError> {
        dispatch::dispatch(&self.registry, handler)
    }
}

impl<'a> IntoIterator for &'a Matches {
    type Item = (&'a Key, &'a Value);
    type IntoIter = std::vec::IntoIter<(&'a Key, &'a Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}
