use clap::{Parser, Subcommand};
use fhir::{wire, Id};
use medux_core::config::namespace_from_env_value;
use medux_core::{AdminSite, CoreConfig, Store};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "medux")]
#[command(about = "MedUX FHIR record store CLI")]
struct Cli {
    /// Record storage directory
    #[arg(long, global = true, env = "MEDUX_DATA_DIR", default_value = "medux_data")]
    data_dir: PathBuf,

    /// Host part of the local base URL for absolute references
    #[arg(long, global = true, env = "MEDUX_NAMESPACE")]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered models
    Models,
    /// List every record of a model
    List {
        /// Model name, e.g. ValueSet
        model: String,
    },
    /// Print one record as YAML
    Show { model: String, id: String },
    /// Create a record from a YAML or JSON file
    Create { model: String, file: PathBuf },
    /// Replace a record from a YAML or JSON file; the file must carry the id
    Update { model: String, file: PathBuf },
    /// Delete a record, applying the on-delete policy of links to it
    Delete { model: String, id: String },
    /// Validate a YAML or JSON file without storing it
    Check { model: String, file: PathBuf },
    /// Print the field descriptions of a model
    Schema { model: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let site = AdminSite::full();
    let Some(command) = cli.command else {
        println!("Use 'medux --help' for commands");
        return Ok(());
    };

    if let Commands::Models = command {
        for name in site.registered() {
            println!("{}", name);
        }
        return Ok(());
    }
    if let Commands::Schema { model } = &command {
        let schema = site.require(model)?.schema();
        print!("{}", wire::render_yaml(&schema)?);
        return Ok(());
    }
    if let Commands::Check { model, file } = &command {
        site.require(model)?.check(read_body(file)?)?;
        println!("{} is a valid {}", file.display(), model);
        return Ok(());
    }

    let cfg = CoreConfig::new(
        cli.data_dir,
        namespace_from_env_value(cli.namespace)?,
        None,
    )?;
    let store = Store::open(Arc::new(cfg))?;

    match command {
        Commands::List { model } => {
            let records = site.require(&model)?.list(&store)?;
            if records.is_empty() {
                println!("No {} records found.", model);
            }
            for record in records {
                println!("{}", summary(&record));
            }
        }
        Commands::Show { model, id } => {
            let record = site.require(&model)?.get(&store, &Id::new(&id)?)?;
            print!("{}", wire::render_yaml(&record)?);
        }
        Commands::Create { model, file } => {
            let created = site.require(&model)?.create(&store, read_body(&file)?)?;
            println!("Created {}", summary(&created));
        }
        Commands::Update { model, file } => {
            let body = read_body(&file)?;
            let id = body
                .get("id")
                .and_then(Value::as_str)
                .ok_or("the file has no id")?;
            let id = Id::new(id)?;
            let updated = site.require(&model)?.update(&store, &id, body)?;
            println!("Updated {}", summary(&updated));
        }
        Commands::Delete { model, id } => {
            for key in site.require(&model)?.delete(&store, &Id::new(&id)?)? {
                println!("Deleted {}", key);
            }
        }
        Commands::Models | Commands::Schema { .. } | Commands::Check { .. } => {}
    }

    Ok(())
}

/// Read a record body; JSON files are valid YAML, so one parser serves both.
fn read_body(path: &Path) -> CliResult<Value> {
    let text = std::fs::read_to_string(path)?;
    Ok(wire::parse_yaml(&path.display().to_string(), &text)?)
}

/// `id` plus the first human-readable field a record has.
fn summary(record: &Value) -> String {
    let id = record.get("id").and_then(Value::as_str).unwrap_or("-");
    let label = ["name", "title", "display", "code", "value", "url"]
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str));
    let version = record
        .pointer("/meta/versionId")
        .and_then(Value::as_str)
        .map(|v| format!(" (v{v})"))
        .unwrap_or_default();
    match label {
        Some(label) => format!("ID: {}, {}{}", id, label, version),
        None => format!("ID: {}{}", id, version),
    }
}
