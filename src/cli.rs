//! CLI: load schema documents → flatten → (markup | json)
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use crate::config::GeneratorConfig;
use crate::render::Renderer;
use crate::walker::ReentryPolicy;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// flatten nested JSON-schema-ish documents into named record blocks
#[derive(Parser, Debug)]
#[command(name = "schema-flatten", version)]
pub struct CommandLineInterface {
    /// log walk details to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit `<js:object>` record blocks
    Markup(MarkupOut),
    /// emit the ordered records as JSON
    Json(JsonOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the schema node in each document (e.g. /definitions/user)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is flattened
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short = 'f', visible_alias = "filename", num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct GeneratorSettings {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// field name to drop at every level (repeatable; replaces the default `id`)
    #[arg(long = "skip-field")]
    skip_fields: Vec<String>,

    /// what to do when a record name is reached while still being walked
    #[arg(long, value_enum)]
    reentry: Option<ReentryPolicy>,

    /// deepest record depth allowed (root = 1)
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(clap::Parser, Debug)]
struct MarkupOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generator: GeneratorSettings,

    /// XML-escape attribute values
    #[arg(long)]
    escape: bool,

    /// indentation for field lines (default: tab)
    #[arg(long)]
    indent: Option<String>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct JsonOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generator: GeneratorSettings,

    /// single-line JSON per document
    #[arg(long)]
    compact: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(&str, &Value) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let json_value = serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => json_value
                    .pointer(pointer)
                    .cloned()
                    .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {source_path_str}"))?,
            };
            match self.jq_expr.as_ref() {
                None => apply(&source_path_str, &json_value)?,
                Some(jq_expr) => {
                    let results = crate::jq_exec::run_jaq(jq_expr, &json_value).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?;
                    for json_value in &results {
                        apply(&source_path_str, json_value)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn render_all(
        &self,
        config: &GeneratorConfig,
        renderer: &dyn Renderer,
    ) -> Result<Vec<String>> {
        let options = config.walk_options();
        let mut lines = Vec::new();
        self.load_process(|source, document| {
            let assembly = crate::flatten(document, &options)
                .with_context(|| format!("failed to flatten {source}"))?;
            info!(source, records = assembly.records.len() + 1, "flattened document");
            lines.extend(renderer.render(&assembly)?);
            Ok(())
        })?;
        Ok(lines)
    }
}

impl GeneratorSettings {
    fn resolve(&self) -> Result<GeneratorConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        if !self.skip_fields.is_empty() {
            config.skip_fields = self.skip_fields.clone();
        }
        if let Some(reentry) = self.reentry {
            config.reentry = reentry;
        }
        if let Some(max_depth) = self.max_depth {
            if max_depth == 0 {
                bail!("--max-depth must be at least 1");
            }
            config.max_depth = max_depth;
        }
        Ok(config)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Markup(target) => {
                let mut config = target.generator.resolve()?;
                config.escape |= target.escape;
                if let Some(indent) = target.indent.as_ref() {
                    config.indent = indent.clone();
                }
                let renderer = config.markup_renderer();
                let lines = target.input_settings.render_all(&config, &renderer)?;
                write_lines(target.out.as_deref(), &lines)
            }
            Command::Json(target) => {
                let mut config = target.generator.resolve()?;
                if target.compact {
                    config.pretty = false;
                }
                let renderer = config.json_renderer();
                let lines = target.input_settings.render_all(&config, &renderer)?;
                write_lines(target.out.as_deref(), &lines)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_lines(out: Option<&Path>, lines: &[String]) -> Result<()> {
    if let Some(out) = out {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut src = lines.join("\n");
        src.push('\n');
        std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))?;
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        for line in lines {
            writeln!(handle, "{line}")?;
        }
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn unmatched_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    #[test]
    fn filename_alias_parses() {
        let cli = CommandLineInterface::try_parse_from([
            "schema-flatten", "markup", "--filename", "schema.json", "--reentry", "expand",
        ])
        .unwrap();
        match cli.cmd {
            Command::Markup(target) => {
                assert_eq!(target.input_settings.input, vec!["schema.json"]);
                assert_eq!(target.generator.reentry, Some(ReentryPolicy::Expand));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn input_is_required() {
        assert!(CommandLineInterface::try_parse_from(["schema-flatten", "markup"]).is_err());
    }
}
