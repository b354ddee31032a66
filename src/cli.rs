//! CLI: schema + queries → type plan, or decode a saved response against it.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use graphql_typegen::config::GeneratorConfig;
use graphql_typegen::generate::{generate, load_document, load_schema};
use graphql_typegen::ir::Generated;
use graphql_typegen::render::{JsonRenderer, Renderer};
use graphql_typegen::runtime::dynamic::Value;
use graphql_typegen::runtime::handle_response;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// build typed response shapes from a GraphQL schema and query documents
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate and print the type plan as JSON
    Types(TypesOut),
    /// decode a saved response envelope against one operation's shape
    Decode(DecodeIn),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON config file with `schema`, `queries` and `scalars`
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// schema SDL file (overrides the config)
    #[arg(long, short)]
    schema: Option<PathBuf>,

    /// query documents; literal paths or quoted glob patterns (added to the config's)
    #[arg(long, short, num_args = 1..)]
    query: Vec<String>,

    /// custom scalar mapping, repeatable
    #[arg(long = "scalar", value_name = "NAME=TYPE")]
    scalars: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// single-line JSON
    #[arg(long)]
    compact: bool,
}

#[derive(clap::Parser, Debug)]
struct DecodeIn {
    #[command(flatten)]
    input_settings: InputSettings,

    /// operation name as written in the query document
    #[arg(long)]
    operation: String,

    /// file holding the raw response body
    #[arg(long)]
    response: PathBuf,

    /// HTTP status the response came with
    #[arg(long, default_value_t = 200)]
    status: u16,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_config(&self) -> Result<GeneratorConfig> {
        let config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };
        let mut config = config.with_scalar_overrides(&self.scalars)?;
        if let Some(schema) = &self.schema {
            config.schema = Some(schema.clone());
        }
        config.queries.extend(self.query.iter().cloned());
        Ok(config)
    }

    fn generate(&self) -> Result<Generated> {
        let config = self.load_config()?;
        let Some(schema_path) = config.schema.as_ref() else {
            bail!("no schema given; pass --schema or set `schema` in the config");
        };
        if config.queries.is_empty() {
            bail!("no query documents given; pass --query or set `queries` in the config");
        }

        let schema_source = std::fs::read_to_string(schema_path)
            .with_context(|| format!("failed to read schema file {}", schema_path.display()))?;
        let schema = load_schema(&schema_source, &schema_path.display().to_string())?;

        // all documents share one namespace, so fragments may be spread across files
        let mut document_source = String::new();
        for source_path in resolve_file_path_patterns(&config.queries)? {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read query file {}", source_path.display()))?;
            document_source.push_str(&source);
            document_source.push('\n');
        }
        let document = load_document(&schema, &document_source, "queries.graphql")?;

        Ok(generate(&schema, &document, &config)?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Types(target) => {
                let generated = target.input_settings.generate()?;
                let rendered = JsonRenderer {
                    pretty: !target.compact,
                }
                .render(&generated)?;
                write_output(target.out.as_deref(), &rendered)
            }
            Command::Decode(target) => {
                let generated = target.input_settings.generate()?;
                let operation = generated
                    .operation(&target.operation)
                    .with_context(|| format!("no operation named `{}`", target.operation))?;
                let body = std::fs::read(&target.response)
                    .with_context(|| format!("failed to read response file {}", target.response.display()))?;

                let mut data = Value::for_operation(operation);
                let result = handle_response(target.status, &body, &mut data);
                // GraphQL errors still come with usable (partial) data
                let printable = result
                    .as_ref()
                    .err()
                    .is_none_or(|error| error.network.is_none() && error.decode.is_none());
                if printable {
                    println!("{}", serde_json::to_string_pretty(&data.to_json())?);
                }
                result.with_context(|| format!("operation `{}` failed", target.operation))
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    let Some(out) = out else {
        println!("{contents}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matches nothing is almost always a typo
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
    fn literal_paths_pass_through_unchecked() {
        let paths = resolve_file_path_patterns(["queries/user.graphql"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("queries/user.graphql")]);
    }

    #[test]
    fn empty_globs_are_errors() {
        let err = resolve_file_path_patterns(["/definitely/not/here/*.graphql"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"), "{err}");
    }

    #[test]
    fn command_line_overrides_extend_the_config() {
        let settings = InputSettings {
            config: None,
            schema: Some(PathBuf::from("schema.graphql")),
            query: vec!["a.graphql".into()],
            scalars: vec!["DateTime=String".into()],
        };
        let config = settings.load_config().unwrap();
        assert_eq!(config.schema, Some(PathBuf::from("schema.graphql")));
        assert_eq!(config.queries, vec!["a.graphql"]);
        assert_eq!(config.scalar_table()["DateTime"], "String");
    }
}
