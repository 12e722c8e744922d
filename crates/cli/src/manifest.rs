use anyhow::{Context, Result, bail};
use flagroute_metadata::{CommandMeta, DEFAULT_MANIFEST_NAME, FileMeta, OptionMeta, SCHEMA_VERSION};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub command: CommandMeta,
}

/// Load the manifest at `manifest_path`, or `flagroute.json` in the current
/// directory. A missing default manifest is not an error.
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<Option<LoadedManifest>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match manifest_path {
        Some(p) => (resolve_against(&cwd, p), true),
        None => (cwd.join(DEFAULT_MANIFEST_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("manifest not found: {}", path.display());
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let command = CommandMeta::from_json_str(&contents)
        .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;

    if let Some(version) = command.schema_version {
        if version > SCHEMA_VERSION {
            bail!(
                "unsupported schemaVersion {version} in {} (expected {SCHEMA_VERSION} or lower)",
                path.display()
            );
        }
    }
    for (i, option) in command.options.iter().enumerate() {
        if option.name.is_none() && option.index.is_none() {
            bail!(
                "option #{i} in {} needs either \"name\" or \"index\"",
                path.display()
            );
        }
    }

    tracing::debug!(path = %path.display(), options = command.options.len(), "loaded manifest");
    Ok(Some(LoadedManifest { path, command }))
}

/// Write a starter manifest into `project_dir`.
pub fn write_default_manifest(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() && !overwrite {
        bail!("{DEFAULT_MANIFEST_NAME} already exists in {}", project_dir.display());
    }

    let project_name = guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string());
    let manifest = starter_manifest(&project_name);

    let out = manifest
        .to_json_pretty()
        .context("failed to serialize manifest")?;
    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn starter_manifest(project_name: &str) -> CommandMeta {
    let mut verbose = OptionMeta::named("v");
    verbose.aliases = vec!["verbose".to_string()];
    verbose.boolean = true;
    verbose.description = "Print more output".to_string();

    let mut env = OptionMeta::named("e");
    env.aliases = vec!["env".to_string()];
    env.title = "Env".to_string();
    env.description = "Target environment".to_string();
    env.default = Some(serde_json::Value::String("dev".to_string()));
    env.one_of = vec!["dev".to_string(), "prod".to_string()];

    let mut config = OptionMeta::named("c");
    config.aliases = vec!["config".to_string()];
    config.title = "File".to_string();
    config.description = "Configuration file".to_string();
    config.file = Some(FileMeta::default());

    let mut deploy = OptionMeta::named("deploy");
    deploy.boolean = true;
    deploy.description = "Deploy the project".to_string();
    deploy.run = Some("deploy".to_string());
    deploy.needs = vec!["e".to_string()];
    deploy.optionals = vec!["v".to_string(), "c".to_string()];

    let mut target = OptionMeta::positional(0);
    target.title = "Target".to_string();
    target.description = "What to operate on".to_string();

    let mut meta = CommandMeta::new(project_name);
    meta.summary = format!("{project_name} command line");
    meta.options = vec![target, verbose, env, config, deploy];
    meta
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // For `.` or other non-meaningful paths, try the current directory name.
    let file_name = project_dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}
