use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use keyfs_engine::{EngineConfig, StorageEngine, SweepReport};
use keyfs_types::{CompositeKey, Document, JsonCodec, KeyValue, Keys, Scalar, SchemaUri, StaticCatalog};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::cli::*;

type Engine = StorageEngine<JsonCodec<Value>>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config, cli.root, cli.extension)?;
    debug!(root = %config.root.display(), extension = %config.extension, "effective config");
    let format = cli.format;
    match cli.command {
        Command::Put(args) => cmd_put(&open(config)?, args, &format),
        Command::Get(args) => cmd_get(&open(config)?, args, &format),
        Command::Delete(args) => cmd_delete(&open(config)?, args, &format),
        Command::Fsck(_) => cmd_fsck(&open(config)?, &format),
        Command::Prune(_) => cmd_prune(&open(config)?, &format),
        Command::Config(_) => cmd_config(&config, &format),
    }
}

fn load_config(
    path: Option<PathBuf>,
    root: Option<PathBuf>,
    extension: Option<String>,
) -> anyhow::Result<EngineConfig> {
    let mut config = match &path {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    if let Some(extension) = extension {
        config.extension = extension;
    }
    Ok(config.normalized()?)
}

fn open(config: EngineConfig) -> anyhow::Result<Engine> {
    let engine = StorageEngine::open(config, Arc::new(StaticCatalog::new()), JsonCodec::pretty())?;
    Ok(engine)
}

fn cmd_put(engine: &Engine, args: PutArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let schema = SchemaUri::parse(&args.schema)?;
    let keys = build_keys(&args.keys)?;
    let raw = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        buf
    } else {
        fs::read_to_string(&args.file)
            .with_context(|| format!("reading {}", args.file.display()))?
    };
    let content: Value = serde_json::from_str(&raw).context("document is not valid JSON")?;

    let mut document = Document::new(schema, content);
    document.keys = keys;
    let saved = engine.save(&document)?;
    let data_file = saved.file_handle().map(|p| p.display().to_string()).unwrap_or_default();

    match format {
        OutputFormat::Json => println!("{}", json!({ "data_file": data_file })),
        OutputFormat::Text => {
            println!("{} Saved {}", "✓".green().bold(), saved.schema.as_str().cyan());
            println!("  Keys: {}", saved.keys.without_file_handle());
            println!("  Data file: {}", data_file.dimmed());
        }
    }
    Ok(())
}

fn cmd_get(engine: &Engine, args: GetArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let schema = SchemaUri::parse(&args.schema)?;
    let keys = build_keys(&args.keys)?;
    let document = engine.get(&keys, &schema)?;
    let data_file = document.file_handle().map(|p| p.display().to_string());

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "data_file": data_file, "content": document.content })
        ),
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(&document.content)?);
            if let Some(data_file) = data_file {
                eprintln!("{} {}", "data file:".dimmed(), data_file.dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_delete(engine: &Engine, args: DeleteArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let keys = build_keys(&args.keys)?;
    let deleted = engine.delete(&keys)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "deleted": deleted })),
        OutputFormat::Text if deleted => println!("{} Deleted {}", "✓".green().bold(), keys),
        OutputFormat::Text => println!("Nothing found for {}", keys),
    }
    Ok(())
}

fn cmd_fsck(engine: &Engine, format: &OutputFormat) -> anyhow::Result<()> {
    let report = engine.verify()?;
    print_report(&report, format)?;
    if !report.dangling.is_empty() {
        bail!("{} dangling key links; run `keyfs prune`", report.dangling.len());
    }
    Ok(())
}

fn cmd_prune(engine: &Engine, format: &OutputFormat) -> anyhow::Result<()> {
    let report = engine.prune()?;
    print_report(&report, format)
}

fn print_report(report: &SweepReport, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::Text => {
            println!("Data files: {}", report.data_files.to_string().bold());
            println!("Key links: {}", report.links.to_string().bold());
            for link in &report.dangling {
                println!("  {} {}", "dangling:".yellow(), link.display());
            }
            if report.removed > 0 {
                println!("{} Removed {} dangling links", "✓".green(), report.removed);
            } else if report.dangling.is_empty() {
                println!("{} No issues.", "✓".green().bold());
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &EngineConfig, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

// ---- Key parsing ----

fn build_keys(args: &KeyArgs) -> anyhow::Result<Keys> {
    let mut keys = Keys::new();
    for raw in &args.keys {
        let (schema, value) = split_assignment(raw)?;
        keys.insert(SchemaUri::parse(schema)?, parse_scalar(value));
    }
    for raw in &args.uri_keys {
        let (schema, value) = split_assignment(raw)?;
        let url = Url::parse(value).with_context(|| format!("invalid URI in {raw:?}"))?;
        keys.insert(SchemaUri::parse(schema)?, url);
    }

    // Slots of the same schema accumulate into one composite key.
    let mut composites: Vec<(SchemaUri, CompositeKey)> = Vec::new();
    for raw in &args.slots {
        let (target, value) = split_assignment(raw)?;
        let Some((schema, slot)) = target.rsplit_once(':') else {
            bail!("expected SCHEMA:SLOT=VALUE, got {raw:?}");
        };
        let schema = SchemaUri::parse(schema)?;
        let scalar = parse_scalar(value);
        match composites.iter_mut().find(|(s, _)| *s == schema) {
            Some((_, composite)) => *composite = std::mem::take(composite).with(slot, scalar),
            None => composites.push((schema, CompositeKey::new().with(slot, scalar))),
        }
    }
    for (schema, composite) in composites {
        keys.insert(schema, KeyValue::Composite(composite));
    }

    if keys.is_empty() {
        bail!("at least one --key, --uri-key or --slot is required");
    }
    Ok(keys)
}

fn split_assignment(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("expected NAME=VALUE, got {raw:?}"),
    }
}

fn parse_scalar(raw: &str) -> Scalar {
    if let Ok(n) = raw.parse::<i64>() {
        Scalar::Integer(n)
    } else if let Ok(b) = raw.parse::<bool>() {
        Scalar::Boolean(b)
    } else if let Ok(u) = Uuid::parse_str(raw) {
        Scalar::Uuid(u)
    } else {
        Scalar::String(raw.to_string())
    }
}
