mod manifest;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flagroute::{Command, CommandMeta, ErrorKind, Matches, ParseError, ParseOutcome};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{load_manifest, write_default_manifest};

#[derive(Parser)]
#[command(name = "flagroute")]
#[command(version, about = "Parse command-line tokens against a flagroute manifest", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter flagroute.json
    Init(InitArgs),

    /// Parse tokens and print the resolved values
    Parse(ParseArgs),

    /// Print the help page described by the manifest
    Help(ManifestArgs),

    /// Print the handler the tokens select, with its parameters
    Dispatch(DispatchArgs),
}

#[derive(Args)]
struct ManifestArgs {
    /// Path to the manifest (default: ./flagroute.json)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite an existing manifest
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct ParseArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Tokens to parse, after `--`
    #[arg(last = true, allow_hyphen_values = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

#[derive(Parser)]
struct DispatchArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    /// Tokens to parse, after `--`
    #[arg(last = true, allow_hyphen_values = true, value_name = "TOKENS")]
    tokens: Vec<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => init(args),
        Commands::Parse(args) => parse(args),
        Commands::Help(args) => help(args),
        Commands::Dispatch(args) => dispatch(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// `1` for rejected input, `2` for manifest and I/O problems.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ParseError>().map(ParseError::kind) {
        Some(ErrorKind::Declaration | ErrorKind::DuplicateAlias) | None => 2,
        Some(_) => 1,
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = write_default_manifest(&dir, args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {} to declare your options", path.display());
    eprintln!("  2. Run: flagroute help");
    eprintln!("  3. Run: flagroute parse -- --deploy web");
    Ok(())
}

fn load_command(args: &ManifestArgs) -> Result<Command> {
    let (meta, source) = match load_manifest(args.manifest.as_deref())? {
        Some(loaded) => (loaded.command, Some(loaded.path)),
        None => {
            tracing::debug!("no manifest found; parsing without declarations");
            (CommandMeta::new("flagroute"), None)
        }
    };
    let cmd = Command::from_meta(&meta);
    if let Some(err) = cmd.declaration_error() {
        let shown = source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        return Err(err.clone()).with_context(|| format!("invalid manifest: {shown}"));
    }
    Ok(cmd)
}

fn tokens_for(cmd: &Command, tokens: Vec<String>) -> Vec<String> {
    std::iter::once(cmd.name().to_string())
        .chain(tokens)
        .collect()
}

fn parse(args: ParseArgs) -> Result<()> {
    let mut cmd = load_command(&args.manifest)?;
    let tokens = tokens_for(&cmd, args.tokens);

    match cmd.parse(tokens)? {
        ParseOutcome::Help(text) => print!("{text}"),
        ParseOutcome::Matches(m) if args.json => {
            let out = serde_json::to_string_pretty(&matches_json(m))?;
            println!("{out}");
        }
        ParseOutcome::Matches(m) => {
            for (key, value) in m {
                println!("{key}={value}");
            }
        }
    }
    Ok(())
}

fn matches_json(m: &Matches) -> serde_json::Value {
    let arguments: Vec<serde_json::Value> = m
        .argument_values()
        .values()
        .map(|v| v.to_json())
        .collect();
    let flags: IndexMap<&str, serde_json::Value> = m
        .flag_values()
        .into_iter()
        .map(|(name, v)| (name, v.to_json()))
        .collect();
    serde_json::json!({
        "program": m.program(),
        "arguments": arguments,
        "flags": flags,
    })
}

fn help(args: ManifestArgs) -> Result<()> {
    let cmd = load_command(&args)?;
    print!("{}", cmd.help_text());
    Ok(())
}

fn dispatch(args: DispatchArgs) -> Result<()> {
    let mut cmd = load_command(&args.manifest)?;
    let tokens = tokens_for(&cmd, args.tokens);

    let m = match cmd.parse(tokens)? {
        ParseOutcome::Help(text) => {
            print!("{text}");
            return Ok(());
        }
        ParseOutcome::Matches(m) => m,
    };

    match m.select() {
        Some(selection) => {
            tracing::debug!(run = %selection.run, "selected handler");
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        None => {
            eprintln!("No command was triggered; see `flagroute help`.");
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let input = anyhow::Error::new(ParseError::UnknownOption("--x".to_string()));
        assert_eq!(exit_code(&input), 1);

        let declaration = anyhow::Error::new(ParseError::Declaration("bad".to_string()))
            .context("invalid manifest");
        assert_eq!(exit_code(&declaration), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("manifest not found")), 2);
    }

    #[test]
    fn matches_json_shape() {
        let mut cmd = Command::new();
        let _ = cmd.flag("f").alias("foo").flag("v").boolean();
        let m = cmd
            .parse(["prog", "--foo=bar", "x"])
            .unwrap()
            .matches()
            .unwrap();
        assert_eq!(
            matches_json(m),
            serde_json::json!({
                "program": "prog",
                "arguments": ["x"],
                "flags": { "f": "bar", "v": false },
            })
        );
    }
}
