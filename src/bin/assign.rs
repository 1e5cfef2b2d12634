//! assign - Merge, diff and round-trip structured documents from the command line.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use entity_assign::codec::{self, DocumentFormat};
use entity_assign::config::Config;
use entity_assign::logging;
use entity_assign::merge::{diff, MergeMode, Merger};
use entity_assign::schema::{Schema, TypeRef};
use entity_assign::typed::{validate, Comparison};
use entity_assign::value::{self, Patch, Value};

#[derive(Parser, Debug)]
#[command(author, version, about = "assign: partial merge of structured documents", long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output location. Use '-' for stdout.
    #[arg(short, long, global = true, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a patch into a document and print the result and the changes.
    Merge {
        /// Current document. An empty file means the value is absent.
        #[arg(long)]
        current: PathBuf,
        /// Patch; `null` clears a key.
        #[arg(long)]
        patch: PathBuf,
        /// shallow-preserve-omitted or full-replace-deletes-omitted
        #[arg(long)]
        mode: Option<MergeMode>,
        /// Schema guiding the merge.
        #[arg(long, requires = "type_name")]
        schema: Option<PathBuf>,
        /// Type or entity in the schema describing the document.
        #[arg(long = "type", requires = "schema")]
        type_name: Option<String>,
    },
    /// Print the changes that turn one document into another.
    Diff {
        #[arg(long)]
        lhs: PathBuf,
        #[arg(long)]
        rhs: PathBuf,
    },
    /// Encode and decode a document, failing if it does not come back equal.
    Roundtrip {
        file: PathBuf,
        #[arg(long)]
        format: Option<DocumentFormat>,
    },
    /// Validate a document against an entity of a schema.
    Validate {
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        entity: String,
        file: PathBuf,
    },
    /// List the entities a schema declares.
    ListEntities {
        #[arg(long)]
        schema: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };
    logging::init(&config.logging)?;

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::Merge {
            current,
            patch,
            mode,
            schema,
            type_name,
        } => {
            let mode = mode.unwrap_or(config.merge_mode);
            merge(&current, &patch, mode, schema.as_deref(), type_name.as_deref(), &mut output)?;
        }
        Command::Diff { lhs, rhs } => {
            compare(&lhs, &rhs, &mut output)?;
        }
        Command::Roundtrip { file, format } => {
            roundtrip(&file, format.unwrap_or(config.document_format), &mut output)?;
        }
        Command::Validate { schema, entity, file } => {
            validate_entity(&schema, &entity, &file, &mut output)?;
        }
        Command::ListEntities { schema } => {
            list_entities(&schema, &mut output)?;
        }
    }

    Ok(())
}

fn read_document(file: &Path) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file).map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let value = value::from_yaml(&content).map_err(|e| format!("Failed to parse {:?}: {}", file, e))?;
    Ok(Some(value))
}

fn read_schema(file: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file).map_err(|e| format!("Failed to read schema file {:?}: {}", file, e))?;
    let schema = Schema::from_yaml(&content)?;
    schema.check()?;
    Ok(schema)
}

fn merge(
    current_file: &Path,
    patch_file: &Path,
    mode: MergeMode,
    schema_file: Option<&Path>,
    type_name: Option<&str>,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let current = read_document(current_file)?;
    let patch = fs::read_to_string(patch_file)
        .map_err(|e| format!("Failed to read patch file {:?}: {}", patch_file, e))?;
    let patch = Patch::from_yaml(&patch).map_err(|e| format!("Failed to parse patch: {}", e))?;

    let schema = schema_file.map(read_schema).transpose()?;
    let mut merger = Merger::new(mode);
    if let (Some(schema), Some(name)) = (schema.as_ref(), type_name) {
        let root = match schema.find_entity(name) {
            Some(entity) => entity.as_type(),
            None if schema.find_named_type(name).is_some() => TypeRef::named(name),
            None => return Err(format!("Type '{}' not found in schema", name).into()),
        };
        merger = merger.with_schema(schema, &root);
    }

    let outcome = merger.merge(current.as_ref(), &patch)?;
    match outcome.next {
        Some(ref next) => write!(output, "{}", value::to_yaml(next)?)?,
        None => writeln!(output, "null")?,
    }
    if outcome.changes.is_empty() {
        writeln!(output, "# no changes")?;
    } else {
        for change in outcome.changes.iter() {
            writeln!(output, "# {}", change)?;
        }
    }
    Ok(())
}

fn compare(lhs_file: &Path, rhs_file: &Path, output: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let lhs = read_document(lhs_file)?;
    let rhs = read_document(rhs_file)?;
    let changes = diff(lhs.as_ref(), rhs.as_ref());
    if changes.is_empty() {
        writeln!(output, "Objects are identical")?;
        return Ok(());
    }
    writeln!(output, "{}", changes)?;
    writeln!(output)?;
    writeln!(output, "{}", Comparison::from_changes(&changes))?;
    Ok(())
}

fn roundtrip(file: &Path, format: DocumentFormat, output: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_document(file)?.unwrap_or(Value::Null);
    let bytes = codec::encode(&value, format)?;
    let back = codec::decode(&bytes, format)?;
    if back != value {
        let changes = diff(Some(&value), Some(&back));
        return Err(format!("{} roundtrip is not deep-equal:\n{}", format, changes).into());
    }
    output.write_all(&bytes)?;
    if !bytes.ends_with(b"\n") {
        writeln!(output)?;
    }
    Ok(())
}

fn validate_entity(
    schema_file: &Path,
    entity: &str,
    file: &Path,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = read_schema(schema_file)?;
    let def = schema.entity(entity)?;
    let value = read_document(file)?.unwrap_or(Value::Null);

    match validate(&value, &def.as_type(), &schema) {
        Ok(()) => {
            writeln!(output, "Validation successful")?;
        }
        Err(errors) => {
            writeln!(output, "Validation errors:")?;
            for err in errors.iter() {
                writeln!(output, "  - {}", err)?;
            }
            return Err("Validation failed".into());
        }
    }
    Ok(())
}

fn list_entities(schema_file: &Path, output: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let schema = read_schema(schema_file)?;
    writeln!(output, "Entities in schema:")?;
    for entity in &schema.entities {
        writeln!(output, "  - {} (primary key: {})", entity.name, entity.primary_key)?;
    }
    Ok(())
}
