use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keyfs",
    about = "keyfs: keyed documents stored as plain files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Store root directory (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Data file extension (overrides the config file)
    #[arg(long, global = true)]
    pub extension: Option<String>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a JSON document under one or more keys
    Put(PutArgs),
    /// Print the document the keys lead to
    Get(GetArgs),
    /// Delete the document the keys lead to
    Delete(DeleteArgs),
    /// Report data files, key links and dangling links
    Fsck(FsckArgs),
    /// Remove dangling key links
    Prune(PruneArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Keys are tried in this order: `--key`, then `--uri-key`, then `--slot`.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Scalar key; integers, booleans and UUIDs are recognized
    #[arg(short, long = "key", value_name = "SCHEMA=VALUE")]
    pub keys: Vec<String>,

    /// URI key, laid out as host/port/path
    #[arg(long = "uri-key", value_name = "SCHEMA=URI")]
    pub uri_keys: Vec<String>,

    /// One slot of a composite key; repeat to add slots
    #[arg(long = "slot", value_name = "SCHEMA:SLOT=VALUE")]
    pub slots: Vec<String>,
}

#[derive(Args)]
pub struct PutArgs {
    /// Schema of the document
    #[arg(short, long)]
    pub schema: String,

    #[command(flatten)]
    pub keys: KeyArgs,

    /// JSON file to store, `-` for stdin
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    /// Schema to decode the document as
    #[arg(short, long)]
    pub schema: String,

    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Args)]
pub struct FsckArgs {}

#[derive(Args)]
pub struct PruneArgs {}

#[derive(Args)]
pub struct ConfigArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from([
            "keyfs", "put", "--schema", "/Shape", "-k", "/Shape=42", "--uri-key",
            "/web/Page=https://example.com/a", "shape.json",
        ])
        .unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.schema, "/Shape");
            assert_eq!(args.keys.keys, vec!["/Shape=42"]);
            assert_eq!(args.keys.uri_keys, vec!["/web/Page=https://example.com/a"]);
            assert_eq!(args.file, PathBuf::from("shape.json"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_get_with_slots() {
        let cli = Cli::try_parse_from([
            "keyfs", "get", "-s", "/Pair", "--slot", "/Pair:zone=eu", "--slot", "/Pair:id=7",
        ])
        .unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.keys.slots.len(), 2);
            assert!(args.keys.keys.is_empty());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "keyfs", "fsck", "--root", "/srv/keyfs", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Fsck(_)));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/keyfs")));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(cli.verbose);
    }

    #[test]
    fn put_requires_schema() {
        assert!(Cli::try_parse_from(["keyfs", "put", "-k", "/S=1", "f.json"]).is_err());
    }

    #[test]
    fn parse_delete() {
        let cli = Cli::try_parse_from(["keyfs", "delete", "--key", "/Shape=42"]).unwrap();
        assert!(matches!(cli.command, Command::Delete(_)));
    }
}
