//! Shared metadata model for flagroute commands.
//!
//! The types here describe declared options without any behavior attached.
//! They are used for:
//! - the help request produced by a declared `Command` (layout is up to the renderer)
//! - the JSON manifest the `flagroute` binary turns into a `Command`

use serde::{Deserialize, Serialize};

/// Default manifest file name looked up by the `flagroute` binary.
pub const DEFAULT_MANIFEST_NAME: &str = "flagroute.json";

/// Current manifest format version.
pub const SCHEMA_VERSION: u32 = 1;

/// File requirements attached to an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    #[serde(default = "default_true")]
    pub must_exist: bool,
    #[serde(default)]
    pub allow_glob: bool,
}

impl Default for FileMeta {
    fn default() -> Self {
        Self {
            must_exist: true,
            allow_glob: false,
        }
    }
}

/// One declared option: a named flag (`name`) or a positional argument (`index`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub boolean: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optionals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileMeta>,
    /// Accepted values; an empty list accepts anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<String>,
}

impl OptionMeta {
    /// Metadata for a named flag.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Metadata for a positional argument.
    pub fn positional(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Default::default()
        }
    }

    pub fn is_positional(&self) -> bool {
        self.name.is_none() && self.index.is_some()
    }

    /// Key under which the option is registered (`name`, or the index as text).
    pub fn key(&self) -> String {
        match (&self.name, self.index) {
            (Some(name), _) => name.clone(),
            (None, Some(index)) => index.to_string(),
            (None, None) => String::new(),
        }
    }

    /// All flag spellings, e.g. `-f, --foo` for `f` aliased to `foo`.
    pub fn flag_spellings(&self) -> Vec<String> {
        self.name
            .iter()
            .chain(self.aliases.iter())
            .map(|n| spell_flag(n))
            .collect()
    }
}

/// Render a flag name the way it is typed: one hyphen for single characters.
pub fn spell_flag(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// A command with its ordered option declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default = "default_true")]
    pub default_help: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionMeta>,
}

impl Default for CommandMeta {
    fn default() -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION),
            name: String::new(),
            summary: String::new(),
            default_help: true,
            options: Vec::new(),
        }
    }
}

impl CommandMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Positional rows ordered by index.
    pub fn arguments(&self) -> Vec<&OptionMeta> {
        let mut out: Vec<&OptionMeta> = self.options.iter().filter(|o| o.is_positional()).collect();
        out.sort_by_key(|o| o.index);
        out
    }

    /// Named rows in declaration order.
    pub fn flags(&self) -> Vec<&OptionMeta> {
        self.options.iter().filter(|o| !o.is_positional()).collect()
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Encode as pretty JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

fn default_true() -> bool {
    true
}
