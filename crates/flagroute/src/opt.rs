use std::fmt;
use std::sync::Arc;

use flagroute_metadata::{FileMeta, OptionMeta};
use indexmap::IndexSet;

use crate::error::{ParseError, ParseResult};
use crate::files::{self, FileRequirements};
use crate::key::{Key, OptionKind};
use crate::registry::Registry;
use crate::value::Value;

/// Predicate a raw value must satisfy before it is stored.
pub type Rule = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Transform applied to a raw value before it is stored.
pub type Map = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// One declared parameter: a named flag or a positional argument.
#[derive(Clone)]
pub struct Opt {
    key: Key,
    aliases: IndexSet<String>,
    boolean: bool,
    required: bool,
    needs: IndexSet<String>,
    optionals: IndexSet<String>,
    file: Option<FileRequirements>,
    rule: Option<Rule>,
    map: Option<Map>,
    default: Option<Value>,
    value: Option<Value>,
    run: Option<String>,
    title: String,
    description: String,
}

impl fmt::Debug for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opt")
            .field("key", &self.key)
            .field("aliases", &self.aliases)
            .field("boolean", &self.boolean)
            .field("required", &self.required)
            .field("needs", &self.needs)
            .field("optionals", &self.optionals)
            .field("file", &self.file)
            .field("rule", &self.rule.is_some())
            .field("map", &self.map.is_some())
            .field("default", &self.default)
            .field("value", &self.value)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl Opt {
    pub(crate) fn new(key: Key) -> Self {
        Self {
            key,
            aliases: IndexSet::new(),
            boolean: false,
            required: false,
            needs: IndexSet::new(),
            optionals: IndexSet::new(),
            file: None,
            rule: None,
            map: None,
            default: None,
            value: None,
            run: None,
            title: String::new(),
            description: String::new(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Primary name as text (`"f"`, or `"0"` for the first positional).
    pub fn name(&self) -> String {
        self.key.to_string()
    }

    pub fn kind(&self) -> OptionKind {
        self.key.kind()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn needs(&self) -> impl Iterator<Item = &str> {
        self.needs.iter().map(String::as_str)
    }

    pub fn optionals(&self) -> impl Iterator<Item = &str> {
        self.optionals.iter().map(String::as_str)
    }

    pub fn file_requirements(&self) -> Option<FileRequirements> {
        self.file
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The resolved value, falling back to the default.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }

    /// The resolved value only, ignoring the default.
    pub fn own_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn run(&self) -> Option<&str> {
        self.run.as_deref().filter(|r| !r.is_empty())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether `raw` passes the `must` rule (always true without one).
    pub fn validate(&self, raw: &Value) -> bool {
        self.rule.as_ref().is_none_or(|rule| rule(raw))
    }

    /// Check, transform and store a raw value.
    pub(crate) fn set_value(&mut self, raw: Value) -> ParseResult<()> {
        let name = self.name();
        if self.boolean && !matches!(raw, Value::Bool(_)) {
            return Err(ParseError::Validation {
                option: name,
                value: format!("{raw} (expected a boolean)"),
            });
        }
        if !self.validate(&raw) {
            return Err(ParseError::Validation {
                option: name,
                value: raw.to_string(),
            });
        }

        let mut value = match &self.map {
            Some(map) => map(raw),
            None => raw,
        };
        if let Some(req) = self.file {
            value = files::resolve(&name, value, req)?;
        }
        self.value = Some(value);
        Ok(())
    }

    /// `Ok(())` when every companion in `needs` has a value in `registry`,
    /// otherwise the missing names in declaration order.
    pub fn has_needs(&self, registry: &Registry) -> Result<(), Vec<String>> {
        let missing: Vec<String> = self
            .needs
            .iter()
            .filter(|name| {
                registry
                    .get(&Key::parse(name))
                    .and_then(Opt::value)
                    .is_none()
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    pub(crate) fn push_alias(&mut self, alias: String) {
        self.aliases.insert(alias);
    }

    /// Declaring an option boolean gives it a `false` default unless it has one.
    pub(crate) fn set_boolean(&mut self, boolean: bool) {
        self.boolean = boolean;
        if boolean && self.default.is_none() {
            self.default = Some(Value::Bool(false));
        }
    }

    pub(crate) fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    pub(crate) fn add_needs<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needs.extend(names.into_iter().map(Into::into));
    }

    pub(crate) fn add_optionals<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optionals.extend(names.into_iter().map(Into::into));
    }

    pub(crate) fn set_file(&mut self, req: FileRequirements) {
        self.file = Some(req);
    }

    pub(crate) fn set_rule(&mut self, rule: Rule) {
        self.rule = Some(rule);
    }

    pub(crate) fn set_map(&mut self, map: Map) {
        self.map = Some(map);
    }

    pub(crate) fn set_default(&mut self, value: Value) {
        self.default = Some(value);
    }

    pub(crate) fn set_run(&mut self, run: String) {
        self.run = Some(run);
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
    }

    /// Metadata row describing this option for help output.
    pub fn help_entry(&self) -> OptionMeta {
        let mut meta = match &self.key {
            Key::Index(index) => OptionMeta::positional(*index),
            Key::Named(name) => OptionMeta::named(name.clone()),
        };
        meta.aliases = self.aliases.iter().cloned().collect();
        meta.title = self.title.clone();
        meta.description = self.description.clone();
        meta.boolean = self.boolean;
        meta.required = self.required;
        meta.default = self.default.as_ref().map(Value::to_json);
        meta.needs = self.needs.iter().cloned().collect();
        meta.optionals = self.optionals.iter().cloned().collect();
        meta.run = self.run.clone();
        meta.file = self.file.map(|req| FileMeta {
            must_exist: req.must_exist,
            allow_glob: req.allow_glob,
        });
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_falls_back_to_default() {
        let mut opt = Opt::new(Key::from("f"));
        assert_eq!(opt.value(), None);
        opt.set_default(Value::from("x"));
        assert_eq!(opt.value(), Some(&Value::from("x")));
        assert_eq!(opt.own_value(), None);

        opt.set_value(Value::from("y")).unwrap();
        assert_eq!(opt.value(), Some(&Value::from("y")));
    }

    #[test]
    fn boolean_gets_false_default() {
        let mut opt = Opt::new(Key::from("v"));
        opt.set_boolean(true);
        assert_eq!(opt.default_value(), Some(&Value::Bool(false)));

        let mut opt = Opt::new(Key::from("q"));
        opt.set_default(Value::Bool(true));
        opt.set_boolean(true);
        assert_eq!(opt.default_value(), Some(&Value::Bool(true)));
    }

    #[test]
    fn boolean_rejects_text() {
        let mut opt = Opt::new(Key::from("v"));
        opt.set_boolean(true);
        let err = opt.set_value(Value::from("yes")).unwrap_err();
        assert!(matches!(err, ParseError::Validation { .. }));
        opt.set_value(Value::Bool(true)).unwrap();
    }

    #[test]
    fn rule_runs_before_map() {
        let mut opt = Opt::new(Key::from("n"));
        opt.set_rule(Arc::new(|v| v.as_str().is_some_and(|s| s.parse::<i64>().is_ok())));
        opt.set_map(Arc::new(|v| match v.as_str().map(str::parse::<i64>) {
            Some(Ok(n)) => Value::Int(n * 2),
            _ => v,
        }));

        let err = opt.set_value(Value::from("abc")).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for n: abc");
        assert_eq!(opt.own_value(), None);

        opt.set_value(Value::from("21")).unwrap();
        assert_eq!(opt.value(), Some(&Value::Int(42)));
    }

    #[test]
    fn help_entry_carries_metadata() {
        let mut opt = Opt::new(Key::from("f"));
        opt.push_alias("foo".to_string());
        opt.set_title("File".to_string());
        opt.set_description("input file".to_string());
        opt.set_required(true);
        opt.set_file(FileRequirements::new(true, true));
        assert_eq!(
            opt.file_requirements(),
            Some(FileRequirements::new(true, true))
        );

        let meta = opt.help_entry();
        assert_eq!(meta.name.as_deref(), Some("f"));
        assert_eq!(meta.aliases, vec!["foo"]);
        assert!(meta.required);
        assert_eq!(
            meta.file,
            Some(FileMeta {
                must_exist: true,
                allow_glob: true
            })
        );

        let positional = Opt::new(Key::Index(1)).help_entry();
        assert_eq!(positional.index, Some(1));
        assert!(positional.is_positional());
    }
}
