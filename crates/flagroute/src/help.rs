//! Help request assembly and plain-text rendering.

use flagroute_metadata::{CommandMeta, OptionMeta};

use crate::key::Key;
use crate::registry::Registry;

/// Reserved flag name that requests help when default help is enabled.
pub const HELP_NAME: &str = "help";

const HELP_DESCRIPTION: &str = "Show the help page for this command.";

/// Describe a command's declared options, positionals first by index and
/// flags in declaration order.
pub(crate) fn request(
    name: &str,
    summary: &str,
    default_help: bool,
    registry: &Registry,
) -> CommandMeta {
    let mut meta = CommandMeta::new(name);
    meta.summary = summary.to_string();
    meta.default_help = default_help;

    let mut positionals: Vec<OptionMeta> = Vec::new();
    let mut flags: Vec<OptionMeta> = Vec::new();
    for opt in registry.options() {
        let entry = opt.help_entry();
        if entry.is_positional() {
            positionals.push(entry);
        } else {
            flags.push(entry);
        }
    }
    positionals.sort_by_key(|o| o.index);

    if default_help && !registry.contains(&Key::Named(HELP_NAME.to_string())) {
        let mut help = OptionMeta::named(HELP_NAME);
        help.boolean = true;
        help.description = HELP_DESCRIPTION.to_string();
        flags.push(help);
    }

    meta.options = positionals.into_iter().chain(flags).collect();
    meta
}

fn value_name(opt: &OptionMeta) -> String {
    let title = opt.title.trim();
    if !title.is_empty() {
        return title.to_ascii_uppercase().replace(' ', "_");
    }
    match opt.index {
        Some(index) if opt.is_positional() => format!("ARG{index}"),
        _ => "VALUE".to_string(),
    }
}

fn format_left(opt: &OptionMeta) -> String {
    if opt.is_positional() {
        let n = value_name(opt);
        return if opt.required {
            format!("<{n}>")
        } else {
            format!("[{n}]")
        };
    }
    let mut out = opt.flag_spellings().join(", ");
    if !opt.boolean {
        out.push_str(&format!(" <{}>", value_name(opt)));
    }
    out
}

fn format_help(opt: &OptionMeta) -> String {
    let mut parts: Vec<String> = Vec::new();
    let description = opt.description.trim();
    if !description.is_empty() {
        parts.push(description.to_string());
    }
    if opt.required && !opt.is_positional() {
        parts.push("(required)".to_string());
    }
    if !opt.needs.is_empty() {
        parts.push(format!("[needs: {}]", opt.needs.join(", ")));
    }
    if let Some(default) = &opt.default {
        let shown = match default {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !(opt.boolean && shown == "false") {
            parts.push(format!("[default: {shown}]"));
        }
    }
    parts.join(" ")
}

fn push_section(out: &mut String, heading: &str, rows: &[&OptionMeta]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("\n{heading}:\n"));
    let rows: Vec<(String, String)> = rows
        .iter()
        .map(|o| (format_left(o), format_help(o)))
        .collect();
    let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

/// Lay out a help request as plain text.
pub fn render(meta: &CommandMeta) -> String {
    let arguments = meta.arguments();
    let flags = meta.flags();

    let mut out = String::new();
    let summary = meta.summary.trim();
    if summary.is_empty() {
        out.push_str(&format!("{}\n", meta.name));
    } else {
        out.push_str(&format!("{} - {summary}\n", meta.name));
    }

    let mut usage = format!("\nUsage: {}", meta.name);
    if !flags.is_empty() {
        usage.push_str(" [OPTIONS]");
    }
    for arg in &arguments {
        usage.push(' ');
        usage.push_str(&format_left(arg));
    }
    out.push_str(usage.trim_end());
    out.push('\n');

    push_section(&mut out, "Arguments", &arguments);
    push_section(&mut out, "Options", &flags);
    out
}
