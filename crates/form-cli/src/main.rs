use clap::{Parser, Subcommand};
use form_spec::{
    ErrorMap, FormSchema, FormValidator, MessageCatalog, MessageOverrides, resolve_visibility,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORMSPEC_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form schema validation CLI",
    long_about = "Validates data files against form schemas and reports field visibility"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a data file against a form schema.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the data JSON file.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
        /// Optional JSON object of form-level message overrides.
        #[arg(long, value_name = "MESSAGES")]
        messages: Option<PathBuf>,
        /// Skip fields hidden by their visibility rules.
        #[arg(long)]
        visible_only: bool,
    },
    /// Print the visible/disabled state of every field as JSON.
    Visibility {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the data JSON file.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
    },
    /// Print the JSON Schema describing form schema files.
    Schema,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Validate {
            schema,
            data,
            messages,
            visible_only,
        } => run_validate(schema, data, messages, visible_only).await,
        Command::Visibility { schema, data } => run_visibility(schema, data),
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> CliResult<Value> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
    let value = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse {}: {}", path.display(), err))?;
    Ok(value)
}

fn load_schema(path: &Path) -> CliResult<FormSchema> {
    let schema = serde_json::from_value(read_json(path)?)
        .map_err(|err| format!("invalid form schema {}: {}", path.display(), err))?;
    Ok(schema)
}

fn load_messages(path: Option<&Path>) -> CliResult<MessageOverrides> {
    match path {
        Some(path) => {
            let overrides = serde_json::from_value(read_json(path)?)
                .map_err(|err| format!("invalid messages file {}: {}", path.display(), err))?;
            Ok(overrides)
        }
        None => Ok(MessageOverrides::new()),
    }
}

async fn run_validate(
    schema_path: PathBuf,
    data_path: PathBuf,
    messages_path: Option<PathBuf>,
    visible_only: bool,
) -> CliResult<()> {
    let schema = load_schema(&schema_path)?;
    let data = read_json(&data_path)?;
    let overrides = load_messages(messages_path.as_deref())?;
    debug!(overrides = overrides.len(), visible_only, "validating data file");

    let validator = FormValidator::compile(&schema, &MessageCatalog::new(overrides))
        .map_err(|err| format!("schema error in {}: {}", schema_path.display(), err))?;
    let errors = if visible_only {
        validator.validate_visible(&data).await
    } else {
        validator.validate(&data).await
    };

    println!(
        "Validation result: {}",
        if errors.is_empty() { "valid" } else { "invalid" }
    );
    describe_errors(&errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_errors(errors: &ErrorMap) {
    if errors.is_empty() {
        return;
    }
    println!("Errors:");
    for (path, message) in errors {
        println!("  {} - {}", path, message);
    }
}

fn run_visibility(schema_path: PathBuf, data_path: PathBuf) -> CliResult<()> {
    let schema = load_schema(&schema_path)?;
    let data = read_json(&data_path)?;
    let map = resolve_visibility(&schema, &data);
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSchema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
