use std::sync::Arc;

use flagroute_metadata::CommandMeta;
use indexmap::IndexMap;

use crate::engine::{Engine, Outcome};
use crate::error::{ParseError, ParseResult};
use crate::files::FileRequirements;
use crate::help;
use crate::key::{self, Key};
use crate::matches::Matches;
use crate::opt::Opt;
use crate::registry::{OptId, Registry};
use crate::value::Value;

/// Result of a successful [`Command::parse`].
#[derive(Debug)]
pub enum ParseOutcome<'a> {
    Matches(&'a Matches),
    /// `--help` was given; the rendered help text.
    Help(String),
}

impl<'a> ParseOutcome<'a> {
    pub fn matches(self) -> Option<&'a Matches> {
        match self {
            Self::Matches(m) => Some(m),
            Self::Help(_) => None,
        }
    }
}

/// A set of option declarations and the result of the last parse.
///
/// Declarations are made through [`OptionBuilder`] chains. Invalid
/// declarations do not fail at the call site; the first one is kept and
/// returned by the next [`Command::parse`].
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    summary: String,
    registry: Registry,
    next_index: usize,
    default_help: bool,
    pending: Option<ParseError>,
    matches: Option<Matches>,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            name: String::new(),
            summary: String::new(),
            registry: Registry::new(),
            next_index: 0,
            default_help: true,
            pending: None,
            matches: None,
        }
    }
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a command from manifest metadata.
    pub fn from_meta(meta: &CommandMeta) -> Self {
        let mut cmd = Self::with_name(meta.name.clone());
        cmd.summary(meta.summary.clone());
        cmd.use_default_help(meta.default_help);

        for entry in &meta.options {
            let mut builder = match (&entry.name, entry.index) {
                (Some(name), _) => cmd.flag(name),
                (None, Some(index)) => cmd.argument(index),
                (None, None) => cmd.next_argument(),
            };
            for alias in &entry.aliases {
                builder = builder.alias(alias);
            }
            if !entry.title.is_empty() {
                builder = builder.title(entry.title.clone());
            }
            if !entry.description.is_empty() {
                builder = builder.describe(entry.description.clone());
            }
            if let Some(default) = entry.default.as_ref().and_then(Value::from_json) {
                builder = builder.default(default);
            }
            if entry.boolean {
                builder = builder.boolean();
            }
            if entry.required {
                builder = builder.required();
            }
            if let Some(file) = entry.file {
                builder = builder.file(file.must_exist, file.allow_glob);
            }
            if !entry.one_of.is_empty() {
                let accepted = entry.one_of.clone();
                builder = builder.must(move |v| accepted.iter().any(|a| *a == v.to_string()));
            }
            if let Some(run) = &entry.run {
                builder = builder.run(run.clone());
            }
            let _ = builder
                .needs(entry.needs.iter().cloned())
                .optionals(entry.optionals.iter().cloned());
        }
        cmd
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&mut self, summary: impl Into<String>) -> &mut Self {
        self.summary = summary.into();
        self.touch();
        self
    }

    /// Whether `--help` short-circuits the parse (enabled by default).
    pub fn use_default_help(&mut self, enabled: bool) -> &mut Self {
        self.default_help = enabled;
        self.touch();
        self
    }

    /// Declare (or reopen) an option. All-digit names address positionals.
    pub fn option(&mut self, name: &str) -> OptionBuilder<'_> {
        self.touch();
        let key = Key::parse(name);
        if name.is_empty() || (!key.is_index() && key::looks_numeric(name)) {
            return self.reject(format!("'{name}' is not a valid option name"));
        }
        let id = self.registry.declare(key);
        OptionBuilder::new(self, id)
    }

    /// Declare (or reopen) a named flag.
    pub fn flag(&mut self, name: &str) -> OptionBuilder<'_> {
        if key::looks_numeric(name) {
            self.touch();
            return self.reject(format!(
                "flag '{name}' uses a numeric name; use argument() for positionals"
            ));
        }
        self.option(name)
    }

    /// Declare (or reopen) the positional argument at `index`.
    pub fn argument(&mut self, index: usize) -> OptionBuilder<'_> {
        self.touch();
        let id = self.registry.declare(Key::Index(index));
        OptionBuilder::new(self, id)
    }

    /// Declare the next unused positional index.
    pub fn next_argument(&mut self) -> OptionBuilder<'_> {
        while self.registry.contains(&Key::Index(self.next_index)) {
            self.next_index += 1;
        }
        let index = self.next_index;
        self.next_index += 1;
        self.argument(index)
    }

    /// Parse `tokens`, whose first element is the program name.
    ///
    /// Every call starts from the declarations, so parsing the same tokens
    /// twice gives the same outcome.
    pub fn parse<I, S>(&mut self, tokens: I) -> ParseResult<ParseOutcome<'_>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matches = None;
        if let Some(err) = &self.pending {
            return Err(err.clone());
        }

        let engine = Engine::new(tokens, self.registry.clone(), self.default_help);
        match engine.run() {
            Ok(Outcome::Resolved { program, registry }) => Ok(ParseOutcome::Matches(
                self.matches.insert(Matches::new(program, registry)),
            )),
            Ok(Outcome::Help { program }) => {
                let mut request = self.help_request();
                if request.name.is_empty() {
                    request.name = program.unwrap_or_default();
                }
                Ok(ParseOutcome::Help(help::render(&request)))
            }
            Err(err) => {
                tracing::debug!(error = %err, "parse failed");
                Err(err)
            }
        }
    }

    /// The result of the last successful parse.
    pub fn matches(&self) -> ParseResult<&Matches> {
        self.matches.as_ref().ok_or(ParseError::NotParsed)
    }

    pub fn value(&self, key: impl Into<Key>) -> ParseResult<Option<&Value>> {
        Ok(self.matches()?.value(key))
    }

    pub fn is_parsed(&self) -> bool {
        self.matches.is_some()
    }

    /// First invalid declaration, if any.
    pub fn declaration_error(&self) -> Option<&ParseError> {
        self.pending.as_ref()
    }

    /// Declared option by name, alias or index (parsed values live in
    /// [`Matches`]).
    pub fn get_option(&self, key: impl Into<Key>) -> Option<&Opt> {
        self.registry.get(&key.into())
    }

    pub fn has_option(&self, key: impl Into<Key>) -> bool {
        self.registry.contains(&key.into())
    }

    /// Number of declared keys, aliases included.
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

    /// Ordered description of the declared options.
    pub fn help_request(&self) -> CommandMeta {
        help::request(&self.name, &self.summary, self.default_help, &self.registry)
    }

    pub fn help_text(&self) -> String {
        help::render(&self.help_request())
    }

    fn touch(&mut self) {
        if self.matches.take().is_some() {
            tracing::trace!("declaration changed; dropping parse result");
        }
    }

    fn record(&mut self, err: ParseError) {
        tracing::debug!(error = %err, "invalid declaration");
        self.pending.get_or_insert(err);
    }

    fn reject(&mut self, message: String) -> OptionBuilder<'_> {
        self.record(ParseError::Declaration(message));
        OptionBuilder {
            command: self,
            id: None,
        }
    }
}

/// Chainable declaration of one option.
///
/// Every verb has a canonical name; the short forms (`b`, `r`, `a`, `aka`,
/// `d`, `cast`, `defaults_to`, `rn`) only delegate. After an invalid
/// declaration the builder is detached and its verbs do nothing.
#[must_use = "builder verbs return the builder; chain them or drop it explicitly"]
pub struct OptionBuilder<'a> {
    command: &'a mut Command,
    id: Option<OptId>,
}

impl<'a> OptionBuilder<'a> {
    fn new(command: &'a mut Command, id: OptId) -> Self {
        Self {
            command,
            id: Some(id),
        }
    }

    fn update(self, f: impl FnOnce(&mut Opt)) -> Self {
        if let Some(id) = self.id {
            f(self.command.registry.by_id_mut(id));
        }
        self
    }

    /// The option being declared, or `None` after an invalid declaration.
    pub fn get(&self) -> Option<&Opt> {
        self.id.map(|id| self.command.registry.by_id(id))
    }

    pub fn boolean(self) -> Self {
        self.update(|o| o.set_boolean(true))
    }

    pub fn b(self) -> Self {
        self.boolean()
    }

    pub fn required(self) -> Self {
        self.update(|o| o.set_required(true))
    }

    pub fn r(self) -> Self {
        self.required()
    }

    /// Add another name for this option.
    ///
    /// An alias on a positional lets it be given as a flag, but a later bare
    /// token still fills the same index and replaces that value.
    pub fn alias(self, alias: &str) -> Self {
        let Some(id) = self.id else {
            return self;
        };
        if let Err(err) = self.command.registry.alias(id, alias) {
            self.command.record(err);
        }
        self
    }

    pub fn aka(self, alias: &str) -> Self {
        self.alias(alias)
    }

    pub fn a(self, alias: &str) -> Self {
        self.alias(alias)
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.update(|o| o.set_title(title))
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.update(|o| o.set_description(description))
    }

    pub fn d(self, description: impl Into<String>) -> Self {
        self.describe(description)
    }

    /// Reject raw values for which `rule` returns false.
    pub fn must<F>(self, rule: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.update(|o| o.set_rule(Arc::new(rule)))
    }

    /// Transform raw values before they are stored.
    pub fn map<F>(self, map: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.update(|o| o.set_map(Arc::new(map)))
    }

    pub fn cast<F>(self, map: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.map(map)
    }

    pub fn default(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.update(|o| o.set_default(value))
    }

    pub fn defaults_to(self, value: impl Into<Value>) -> Self {
        self.default(value)
    }

    /// Treat the value as a path (`allow_glob`: as a glob pattern).
    pub fn file(self, must_exist: bool, allow_glob: bool) -> Self {
        self.update(|o| o.set_file(FileRequirements::new(must_exist, allow_glob)))
    }

    pub fn needs<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update(|o| o.add_needs(names))
    }

    pub fn optionals<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update(|o| o.add_optionals(names))
    }

    /// Handler to invoke when this flag is set.
    pub fn run(self, handler: impl Into<String>) -> Self {
        let handler = handler.into();
        self.update(|o| o.set_run(handler))
    }

    pub fn rn(self, handler: impl Into<String>) -> Self {
        self.run(handler)
    }

    pub fn option(self, name: &str) -> OptionBuilder<'a> {
        self.command.option(name)
    }

    pub fn flag(self, name: &str) -> OptionBuilder<'a> {
        self.command.flag(name)
    }

    pub fn argument(self, index: usize) -> OptionBuilder<'a> {
        self.command.argument(index)
    }

    pub fn next_argument(self) -> OptionBuilder<'a> {
        self.command.next_argument()
    }
}
