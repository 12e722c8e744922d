//! Token classification.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ParseError, ParseResult};

/// Shape of a single command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A bare value (`file.txt`).
    Positional,
    /// `-f`
    ShortFlag,
    /// `--foo`
    LongFlag,
    /// `--foo=bar`
    LongFlagWithInlineValue,
}

/// A classified token with its canonical name: the token itself for
/// positionals, or the flag name without hyphens and inline value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub name: String,
    pub class: Classification,
}

impl Classified {
    pub fn is_positional(&self) -> bool {
        self.class == Classification::Positional
    }
}

fn regex_flag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(-{1,2})([A-Za-z][A-Za-z0-9_-]*)(=.*)?$").unwrap())
}

pub fn classify(token: &str) -> ParseResult<Classified> {
    if !token.starts_with('-') {
        return Ok(Classified {
            name: token.to_string(),
            class: Classification::Positional,
        });
    }

    let caps = regex_flag()
        .captures(token)
        .ok_or_else(|| ParseError::syntax(token, "not a valid option"))?;
    let name = caps[2].to_string();
    let inline = caps.get(3).is_some();

    let class = match (caps[1].len(), inline) {
        (1, true) => {
            return Err(ParseError::syntax(
                token,
                "inline values need a long option (--name=value)",
            ));
        }
        (1, false) => Classification::ShortFlag,
        (_, false) => Classification::LongFlag,
        (_, true) => Classification::LongFlagWithInlineValue,
    };
    Ok(Classified { name, class })
}

/// Value part of `--name=value`, trimmed. `--name=` yields `None`.
pub fn inline_value(token: &str) -> ParseResult<Option<String>> {
    let (_, rest) = token
        .split_once('=')
        .ok_or_else(|| ParseError::syntax(token, "expected name=value"))?;
    let rest = rest.trim();
    Ok((!rest.is_empty()).then(|| rest.to_string()))
}
