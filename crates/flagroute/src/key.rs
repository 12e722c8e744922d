use std::fmt;

/// Registry key of an option: a flag name or a positional index.
///
/// Ordering puts every index before every name, indices numerically, which is
/// the order used when iterating resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Index(usize),
    Named(String),
}

/// Whether an option is addressed by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Flag,
    Argument,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => f.write_str("option"),
            Self::Argument => f.write_str("argument"),
        }
    }
}

impl Key {
    /// All-digit text becomes an index; anything else is a name.
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return Self::Index(index);
            }
        }
        Self::Named(raw.to_string())
    }

    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Index(_) => OptionKind::Argument,
            Self::Named(_) => OptionKind::Flag,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Named(_) => None,
        }
    }
}

/// Text that could be mistaken for a positional index (`12`, `1.5`).
pub(crate) fn looks_numeric(raw: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in raw.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<&String> for Key {
    fn from(raw: &String) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_become_indices() {
        assert_eq!(Key::parse("0"), Key::Index(0));
        assert_eq!(Key::parse("12"), Key::Index(12));
        assert_eq!(Key::parse("f"), Key::Named("f".to_string()));
        assert_eq!(Key::parse("1a"), Key::Named("1a".to_string()));
        assert_eq!(Key::parse(""), Key::Named(String::new()));
    }

    #[test]
    fn indices_sort_before_names() {
        let mut keys = vec![Key::from("b"), Key::Index(10), Key::from("a"), Key::Index(2)];
        keys.sort();
        assert_eq!(
            keys,
            vec![Key::Index(2), Key::Index(10), Key::from("a"), Key::from("b")]
        );
    }

    #[test]
    fn numeric_lookalikes() {
        assert!(looks_numeric("12"));
        assert!(looks_numeric("1.5"));
        assert!(!looks_numeric("."));
        assert!(!looks_numeric("1.2.3"));
        assert!(!looks_numeric("nan"));
        assert!(!looks_numeric("f1"));
    }

    #[test]
    fn kind_wording() {
        assert_eq!(Key::Index(3).kind().to_string(), "argument");
        assert_eq!(Key::from("x").kind().to_string(), "option");
    }
}
