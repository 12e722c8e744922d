use indexmap::IndexMap;

use crate::error::{ParseError, ParseResult};
use crate::key::{self, Key};
use crate::opt::Opt;

/// Stable handle of an option inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptId(usize);

/// Key to option mapping; several keys (name, aliases) may share one option.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    options: Vec<Opt>,
    keys: IndexMap<Key, OptId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the option registered under `key`, creating it if absent.
    pub(crate) fn declare(&mut self, key: Key) -> OptId {
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = OptId(self.options.len());
        tracing::trace!(key = %key, "registering option");
        self.options.push(Opt::new(key.clone()));
        self.keys.insert(key, id);
        id
    }

    /// Register `alias` as another name of option `id`.
    ///
    /// Re-adding an alias the option already owns is a no-op.
    pub(crate) fn alias(&mut self, id: OptId, alias: &str) -> ParseResult<()> {
        if alias.is_empty() || key::looks_numeric(alias) {
            return Err(ParseError::Declaration(format!(
                "alias '{alias}' must be a non-numeric name"
            )));
        }
        let key = Key::Named(alias.to_string());
        match self.keys.get(&key) {
            Some(&existing) if existing == id => Ok(()),
            Some(&existing) => Err(ParseError::DuplicateAlias {
                alias: alias.to_string(),
                existing: self.options[existing.0].name(),
            }),
            None => {
                self.keys.insert(key, id);
                self.options[id.0].push_alias(alias.to_string());
                Ok(())
            }
        }
    }

    pub fn lookup(&self, key: &Key) -> Option<OptId> {
        self.keys.get(key).copied()
    }

    pub fn get(&self, key: &Key) -> Option<&Opt> {
        self.lookup(key).map(|id| &self.options[id.0])
    }

    pub(crate) fn get_mut(&mut self, key: &Key) -> Option<&mut Opt> {
        let id = self.lookup(key)?;
        Some(&mut self.options[id.0])
    }

    pub fn by_id(&self, id: OptId) -> &Opt {
        &self.options[id.0]
    }

    pub(crate) fn by_id_mut(&mut self, id: OptId) -> &mut Opt {
        &mut self.options[id.0]
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains_key(key)
    }

    /// Number of registered keys, aliases included.
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Distinct options in registration order.
    pub fn options(&self) -> impl Iterator<Item = &Opt> {
        self.options.iter()
    }

    /// Every key with the option it resolves to, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&Key, &Opt)> {
        self.keys.iter().map(|(key, id)| (key, &self.options[id.0]))
    }

    /// Handler names by key, for every key whose option has one.
    pub fn runs(&self) -> IndexMap<&Key, &str> {
        self.entries()
            .filter_map(|(key, opt)| opt.run().map(|run| (key, run)))
            .collect()
    }

    pub fn needs(&self) -> IndexMap<&Key, Vec<&str>> {
        self.entries()
            .map(|(key, opt)| (key, opt.needs().collect::<Vec<_>>()))
            .filter(|(_, names)| !names.is_empty())
            .collect()
    }

    pub fn optionals(&self) -> IndexMap<&Key, Vec<&str>> {
        self.entries()
            .map(|(key, opt)| (key, opt.optionals().collect::<Vec<_>>()))
            .filter(|(_, names)| !names.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_is_idempotent() {
        let mut registry = Registry::new();
        let a = registry.declare(Key::from("f"));
        let b = registry.declare(Key::from("f"));
        assert_eq!(a, b);
        assert_eq!(registry.options().count(), 1);
    }

    #[test]
    fn alias_shares_the_option() {
        let mut registry = Registry::new();
        let id = registry.declare(Key::from("f"));
        registry.alias(id, "foo").unwrap();
        registry.alias(id, "foo").unwrap();

        assert_eq!(registry.lookup(&Key::from("foo")), Some(id));
        assert!(std::ptr::eq(
            registry.get(&Key::from("f")).unwrap(),
            registry.get(&Key::from("foo")).unwrap()
        ));
        assert_eq!(registry.size(), 2);
        assert_eq!(registry.by_id(id).aliases().collect::<Vec<_>>(), vec!["foo"]);
    }

    #[test]
    fn alias_conflicts_are_rejected() {
        let mut registry = Registry::new();
        let f = registry.declare(Key::from("f"));
        let g = registry.declare(Key::from("g"));
        registry.alias(f, "file").unwrap();

        let err = registry.alias(g, "file").unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicateAlias {
                alias: "file".to_string(),
                existing: "f".to_string(),
            }
        );
        let err = registry.alias(g, "f").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateAlias { .. }));
        let err = registry.alias(g, "3").unwrap_err();
        assert!(matches!(err, ParseError::Declaration(_)));
    }

    #[test]
    fn routes_cover_aliases() {
        let mut registry = Registry::new();
        let id = registry.declare(Key::from("d"));
        registry.alias(id, "deploy").unwrap();
        registry.by_id_mut(id).set_run("deploy".to_string());
        registry.by_id_mut(id).add_needs(["target"]);
        registry.declare(Key::from("target"));

        let runs = registry.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[&Key::from("deploy")], "deploy");
        assert_eq!(registry.needs()[&Key::from("d")], vec!["target"]);
        assert!(registry.optionals().is_empty());
    }
}
