use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "uidmerge",
    about = "Merge two JSONL datasets by uid; the second dataset wins on collision",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge dataset B over dataset A
    Merge(MergeArgs),
    /// Validate a single dataset without merging
    Check(CheckArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// Base dataset (A)
    pub base: PathBuf,
    /// Overlay dataset (B); its records replace A's on uid collision
    pub overlay: PathBuf,
    /// Merged output file
    #[arg(short, long)]
    pub output: PathBuf,
    /// Identifier field name (overrides the config file)
    #[arg(long)]
    pub key: Option<String>,
    /// Keep the merge store in memory instead of spilling to disk
    #[arg(long, conflicts_with = "store_path")]
    pub in_memory: bool,
    /// Fixed scratch directory for the disk store; must be empty or a previous store
    #[arg(long)]
    pub store_path: Option<PathBuf>,
    /// Write output sorted by uid
    #[arg(long)]
    pub sorted: bool,
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    pub path: PathBuf,
    /// Identifier field name
    #[arg(long, default_value = uidmerge_core::DEFAULT_KEY_FIELD)]
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_merge_args() {
        let cli = Cli::parse_from([
            "uidmerge", "merge", "a.jsonl", "b.jsonl", "-o", "out/merged.jsonl", "--sorted",
        ]);
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.base, PathBuf::from("a.jsonl"));
        assert_eq!(args.overlay, PathBuf::from("b.jsonl"));
        assert_eq!(args.output, PathBuf::from("out/merged.jsonl"));
        assert!(args.sorted);
        assert!(!args.in_memory);
    }

    #[test]
    fn in_memory_conflicts_with_store_path() {
        let result = Cli::try_parse_from([
            "uidmerge", "merge", "a", "b", "-o", "c", "--in-memory", "--store-path", "s",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn check_defaults_to_uid() {
        let cli = Cli::parse_from(["uidmerge", "check", "a.jsonl", "--format", "json"]);
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.key, "uid");
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
