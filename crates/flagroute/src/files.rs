//! Path checks and glob expansion for file-backed options.

use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::error::{ParseError, ParseResult};
use crate::value::Value;

/// `(must_exist, allow_glob)` attached to an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRequirements {
    pub must_exist: bool,
    pub allow_glob: bool,
}

impl FileRequirements {
    pub fn new(must_exist: bool, allow_glob: bool) -> Self {
        Self {
            must_exist,
            allow_glob,
        }
    }
}

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Validate or expand `value` for the option named `option`.
///
/// Existing paths are returned canonicalized. A missing path (or a pattern
/// without matches) keeps the original value unless `must_exist` is set.
pub(crate) fn resolve(option: &str, value: Value, req: FileRequirements) -> ParseResult<Value> {
    let Some(path) = value.as_path().map(Path::to_path_buf) else {
        return Err(file_error(option, &value.to_string(), "expected a path"));
    };

    if req.allow_glob {
        let pattern = path.to_string_lossy().into_owned();
        let matches = expand(&pattern)
            .map_err(|e| file_error(option, &pattern, &format!("invalid glob ({e})")))?;
        tracing::debug!(option, pattern = %pattern, matches = matches.len(), "expanded glob");
        if !matches.is_empty() {
            return Ok(Value::Paths(matches));
        }
        if req.must_exist {
            return Err(file_error(option, &pattern, "no files match"));
        }
        return Ok(value);
    }

    match dunce::canonicalize(&path) {
        Ok(canonical) => Ok(Value::Path(canonical)),
        Err(_) if req.must_exist => Err(file_error(
            option,
            &path.display().to_string(),
            "file does not exist",
        )),
        Err(_) => Ok(value),
    }
}

fn file_error(option: &str, path: &str, reason: &str) -> ParseError {
    ParseError::File {
        option: option.to_string(),
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a glob pattern into the sorted, canonical set of existing paths.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>, globset::Error> {
    if !pattern.contains(GLOB_META) {
        return Ok(dunce::canonicalize(pattern).into_iter().collect());
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    // Walk only below the literal prefix of the pattern.
    let mut base = PathBuf::new();
    let mut remaining = 0usize;
    let mut recursive = false;
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if remaining == 0 && !text.contains(GLOB_META) {
            base.push(component);
            continue;
        }
        if matches!(component, Component::Normal(_)) && text == "**" {
            recursive = true;
        }
        remaining += 1;
    }

    let from_cwd = base.as_os_str().is_empty();
    let root = if from_cwd { PathBuf::from(".") } else { base };
    let mut walker = WalkDir::new(&root).min_depth(1).follow_links(true);
    if !recursive {
        walker = walker.max_depth(remaining);
    }

    let mut out: Vec<PathBuf> = Vec::new();
    for entry in walker.into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let candidate = if from_cwd {
            path.strip_prefix(".").unwrap_or(path)
        } else {
            path
        };
        if !matcher.is_match(candidate) {
            continue;
        }
        if let Ok(canonical) = dunce::canonicalize(path) {
            out.push(canonical);
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example.txt"), "a").unwrap();
        fs::write(dir.path().join("another.txt"), "b").unwrap();
        fs::write(dir.path().join("notes.md"), "c").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), "d").unwrap();
        dir
    }

    fn canonical(path: PathBuf) -> PathBuf {
        dunce::canonicalize(path).unwrap()
    }

    #[test]
    fn expand_matches_one_level() {
        let dir = fixture();
        let pattern = format!("{}/*.txt", dir.path().display());
        let found = expand(&pattern).unwrap();
        assert_eq!(
            found,
            vec![
                canonical(dir.path().join("another.txt")),
                canonical(dir.path().join("example.txt")),
            ]
        );
    }

    #[test]
    fn expand_recurses_with_double_star() {
        let dir = fixture();
        let pattern = format!("{}/**/*.txt", dir.path().display());
        let found = expand(&pattern).unwrap();
        assert!(found.contains(&canonical(dir.path().join("nested").join("deep.txt"))));
        assert!(found.contains(&canonical(dir.path().join("example.txt"))));
        assert!(!found.iter().any(|p| p.ends_with("notes.md")));
    }

    #[test]
    fn expand_literal_path() {
        let dir = fixture();
        let literal = dir.path().join("notes.md");
        let found = expand(&literal.display().to_string()).unwrap();
        assert_eq!(found, vec![canonical(literal)]);

        let missing = dir.path().join("missing.md");
        assert!(expand(&missing.display().to_string()).unwrap().is_empty());
    }

    #[test]
    fn resolve_respects_must_exist() {
        let dir = fixture();
        let missing = dir.path().join("missing.txt").display().to_string();

        let err = resolve("f", Value::from(missing.as_str()), FileRequirements::new(true, false))
            .unwrap_err();
        assert!(matches!(err, ParseError::File { .. }));

        let kept = resolve("f", Value::from(missing.as_str()), FileRequirements::new(false, false))
            .unwrap();
        assert_eq!(kept, Value::from(missing.as_str()));

        let pattern = format!("{}/*.csv", dir.path().display());
        let err = resolve("f", Value::from(pattern.as_str()), FileRequirements::new(true, true))
            .unwrap_err();
        assert!(err.to_string().contains("no files match"));
    }

    #[test]
    fn resolve_rejects_invalid_glob() {
        let err = resolve("g", Value::from("logs/[abc.txt"), FileRequirements::new(true, true))
            .unwrap_err();
        match err {
            ParseError::File { option, reason, .. } => {
                assert_eq!(option, "g");
                assert!(reason.starts_with("invalid glob"), "{reason}");
            }
            other => panic!("expected a file error, got {other:?}"),
        }
    }

    #[test]
    fn resolve_keeps_unmatched_pattern_when_optional() {
        let dir = fixture();
        let pattern = format!("{}/*.zzz", dir.path().display());
        let kept = resolve("g", Value::from(pattern.as_str()), FileRequirements::new(false, true))
            .unwrap();
        assert_eq!(kept, Value::Text(pattern));
    }

    #[test]
    fn resolve_rejects_non_paths() {
        let err = resolve("f", Value::Bool(true), FileRequirements::new(false, false)).unwrap_err();
        assert!(err.to_string().contains("expected a path"));
    }
}
