//! The single-pass parse over a token queue.
//!
//! Tokens are consumed from the front. Raw values are collected per option
//! first and applied only after the whole queue is consumed, followed by the
//! required and dependency checks.

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::error::{ParseError, ParseResult};
use crate::help;
use crate::key::Key;
use crate::registry::Registry;
use crate::token::{self, Classification};
use crate::value::Value;

/// Terminal result of a successful pass.
#[derive(Debug)]
pub(crate) enum Outcome {
    Resolved {
        program: Option<String>,
        registry: Registry,
    },
    /// `--help` was seen with default help enabled; nothing was applied.
    Help { program: Option<String> },
}

enum Step {
    Consumed,
    Help,
}

#[derive(Debug)]
pub(crate) struct Engine {
    tokens: VecDeque<String>,
    registry: Registry,
    position: usize,
    resolved: IndexMap<Key, Value>,
    default_help: bool,
}

impl Engine {
    /// `registry` is owned by the engine; callers pass a fresh copy of
    /// their declarations for every pass.
    pub(crate) fn new<I, S>(tokens: I, registry: Registry, default_help: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            registry,
            position: 0,
            resolved: IndexMap::new(),
            default_help,
        }
    }

    /// Consumes the engine, so a pass runs at most once.
    pub(crate) fn run(mut self) -> ParseResult<Outcome> {
        let program = self.tokens.pop_front();
        tracing::debug!(program = ?program, tokens = self.tokens.len(), "parse started");

        let result = self.consume().and_then(|step| match step {
            Step::Help => Ok(Step::Help),
            Step::Consumed => self.apply().map(|()| Step::Consumed),
        });

        match &result {
            Ok(_) => tracing::debug!("parse succeeded"),
            Err(err) => tracing::debug!(kind = ?err.kind(), "parse failed"),
        }

        result.map(move |step| match step {
            Step::Help => Outcome::Help { program },
            Step::Consumed => Outcome::Resolved {
                program,
                registry: self.registry,
            },
        })
    }

    fn consume(&mut self) -> ParseResult<Step> {
        while let Some(token) = self.tokens.pop_front() {
            let classified = token::classify(&token)?;
            tracing::debug!(token = %token, class = ?classified.class, "classified token");

            if classified.is_positional() {
                let key = Key::Index(self.position);
                self.registry.declare(key.clone());
                self.resolved.insert(key, Value::Text(classified.name));
                self.position += 1;
                continue;
            }

            if self.default_help && classified.name == help::HELP_NAME {
                return Ok(Step::Help);
            }

            let opt = self
                .registry
                .get(&Key::Named(classified.name.clone()))
                .ok_or_else(|| ParseError::UnknownOption(token.clone()))?;
            let primary = opt.key().clone();

            if opt.is_boolean() {
                let toggled = !opt.default_value().is_some_and(Value::is_truthy);
                self.resolved.insert(primary, Value::Bool(toggled));
                continue;
            }

            let raw = match classified.class {
                Classification::LongFlagWithInlineValue => token::inline_value(&token)?,
                _ => self.tokens.pop_front(),
            };
            let raw = match raw {
                Some(raw) if token::classify(&raw).is_ok_and(|c| c.is_positional()) => raw,
                Some(raw) => return Err(ParseError::syntax(raw, "expected an argument")),
                None => return Err(ParseError::syntax(token, "expected an argument")),
            };
            self.resolved.insert(primary, Value::Text(raw));
        }
        Ok(Step::Consumed)
    }

    fn apply(&mut self) -> ParseResult<()> {
        let resolved = std::mem::take(&mut self.resolved);

        tracing::debug!(values = resolved.len(), "applying values");
        for (key, raw) in &resolved {
            if let Some(opt) = self.registry.get_mut(key) {
                opt.set_value(raw.clone())?;
            }
        }

        for opt in self.registry.options() {
            if opt.is_required() && opt.value().is_none() {
                return Err(ParseError::RequiredMissing {
                    kind: opt.kind(),
                    name: opt.name(),
                });
            }
        }

        tracing::debug!("checking dependencies");
        for key in resolved.keys() {
            let Some(opt) = self.registry.get(key) else {
                continue;
            };
            if opt.value().is_none() && !opt.is_required() {
                continue;
            }
            if let Err(missing) = opt.has_needs(&self.registry) {
                return Err(ParseError::DependencyMissing {
                    name: opt.name(),
                    missing,
                });
            }
        }

        self.resolved = resolved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn run(tokens: &[&str], registry: Registry) -> ParseResult<Registry> {
        match Engine::new(tokens.iter().copied(), registry, true).run()? {
            Outcome::Resolved { registry, .. } => Ok(registry),
            Outcome::Help { .. } => panic!("unexpected help outcome"),
        }
    }

    fn value_of(registry: &Registry, key: impl Into<Key>) -> Option<Value> {
        registry.get(&key.into()).and_then(|o| o.value()).cloned()
    }

    #[test]
    fn positionals_are_created_on_the_fly() {
        let registry = run(&["prog", "arg1", "arg2"], Registry::new()).unwrap();
        assert_eq!(value_of(&registry, 0usize), Some(Value::from("arg1")));
        assert_eq!(value_of(&registry, 1usize), Some(Value::from("arg2")));
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn program_name_is_discarded() {
        let outcome = Engine::new(["prog"], Registry::new(), true).run().unwrap();
        match outcome {
            Outcome::Resolved { program, registry } => {
                assert_eq!(program.as_deref(), Some("prog"));
                assert_eq!(registry.size(), 0);
            }
            Outcome::Help { .. } => panic!("unexpected help outcome"),
        }
    }

    #[test]
    fn flag_consumes_next_token() {
        let mut registry = Registry::new();
        registry.declare(Key::from("f"));
        let registry = run(&["prog", "-f", "val", "rest"], registry).unwrap();
        assert_eq!(value_of(&registry, "f"), Some(Value::from("val")));
        assert_eq!(value_of(&registry, 0usize), Some(Value::from("rest")));
    }

    #[test]
    fn inline_value_through_alias() {
        let mut registry = Registry::new();
        let id = registry.declare(Key::from("f"));
        registry.alias(id, "foo").unwrap();
        let registry = run(&["prog", "--foo=bar"], registry).unwrap();
        assert_eq!(value_of(&registry, "f"), Some(Value::from("bar")));
    }

    #[test]
    fn empty_inline_value_does_not_steal_next_token() {
        let mut registry = Registry::new();
        registry.declare(Key::from("foo"));
        let err = run(&["prog", "--foo=", "next"], registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn missing_or_flag_like_value_is_rejected() {
        let mut registry = Registry::new();
        registry.declare(Key::from("f"));
        registry.declare(Key::from("g"));

        let err = run(&["prog", "-f"], registry.clone()).unwrap_err();
        assert_eq!(err.to_string(), "unable to parse option -f: expected an argument");

        let err = run(&["prog", "-f", "-g"], registry).unwrap_err();
        assert_eq!(err.to_string(), "unable to parse option -g: expected an argument");
    }

    #[test]
    fn unknown_flag_is_reported() {
        let err = run(&["prog", "--nope"], Registry::new()).unwrap_err();
        assert_eq!(err, ParseError::UnknownOption("--nope".to_string()));
    }

    #[test]
    fn boolean_toggles_default() {
        let mut registry = Registry::new();
        let off = registry.declare(Key::from("v"));
        registry.by_id_mut(off).set_boolean(true);
        let on = registry.declare(Key::from("color"));
        registry.by_id_mut(on).set_default(Value::Bool(true));
        registry.by_id_mut(on).set_boolean(true);

        let untouched = run(&["prog"], registry.clone()).unwrap();
        assert_eq!(value_of(&untouched, "v"), Some(Value::Bool(false)));
        assert_eq!(value_of(&untouched, "color"), Some(Value::Bool(true)));

        let toggled = run(&["prog", "-v", "--color", "file"], registry).unwrap();
        assert_eq!(value_of(&toggled, "v"), Some(Value::Bool(true)));
        assert_eq!(value_of(&toggled, "color"), Some(Value::Bool(false)));
        assert_eq!(value_of(&toggled, 0usize), Some(Value::from("file")));
    }

    #[test]
    fn help_stops_the_pass() {
        let outcome = Engine::new(["prog", "--help", "--unknown"], Registry::new(), true)
            .run()
            .unwrap();
        assert!(matches!(outcome, Outcome::Help { .. }));

        let err = Engine::new(["prog", "--help"], Registry::new(), false)
            .run()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownOption);
    }

    #[test]
    fn required_uses_value_or_default() {
        let mut registry = Registry::new();
        let id = registry.declare(Key::Index(0));
        registry.by_id_mut(id).set_required(true);

        let err = run(&["prog"], registry.clone()).unwrap_err();
        assert_eq!(err.to_string(), "required argument 0 must be specified");

        registry.by_id_mut(id).set_default(Value::from("fallback"));
        let registry = run(&["prog"], registry).unwrap();
        assert_eq!(value_of(&registry, 0usize), Some(Value::from("fallback")));
    }

    #[test]
    fn needs_are_checked_for_resolved_options() {
        let mut registry = Registry::new();
        let a = registry.declare(Key::from("a"));
        registry.by_id_mut(a).add_needs(["b"]);

        let err = run(&["prog", "-a", "v1"], registry.clone()).unwrap_err();
        assert_eq!(
            err,
            ParseError::DependencyMissing {
                name: "a".to_string(),
                missing: vec!["b".to_string()],
            }
        );

        // Unresolved options do not enforce their companions.
        run(&["prog"], registry.clone()).unwrap();

        registry.declare(Key::from("b"));
        run(&["prog", "-a", "v1", "-b", "v2"], registry).unwrap();
    }

    #[test]
    fn values_apply_after_the_loop() {
        let mut registry = Registry::new();
        let id = registry.declare(Key::from("n"));
        registry
            .by_id_mut(id)
            .set_rule(std::sync::Arc::new(|v| v.as_str() == Some("ok")));

        // A later syntax error wins over an earlier invalid value.
        let err = run(&["prog", "-n", "bad", "--"], registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
