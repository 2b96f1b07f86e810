use colored::Colorize;
use uidmerge_core::{CheckReport, MergeConfig, MergeReport, OutputOrder, StoreBackend};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Merge(args) => cmd_merge(args, &cli.format),
        Command::Check(args) => cmd_check(args, &cli.format),
    }
}

fn cmd_merge(args: MergeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = merge_config(&args)?;
    let report = uidmerge_core::run(&config, &args.base, &args.overlay, &args.output)?;
    match format {
        OutputFormat::Text => print_merge_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn cmd_check(args: CheckArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let report = uidmerge_core::check(&args.path, &args.key)?;
    match format {
        OutputFormat::Text => print_check_report(&args, &report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Config file first, then command-line overrides.
fn merge_config(args: &MergeArgs) -> anyhow::Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::from_toml_file(path)?,
        None => MergeConfig::default(),
    };
    if let Some(key) = &args.key {
        anyhow::ensure!(!key.is_empty(), "--key must not be empty");
        config.key_field = key.clone();
    }
    if args.in_memory {
        config.backend = StoreBackend::Memory;
    } else if let Some(path) = &args.store_path {
        config.backend = StoreBackend::Disk {
            path: Some(path.clone()),
        };
    }
    if args.sorted {
        config.order = OutputOrder::SortedByKey;
    }
    Ok(config)
}

fn print_merge_report(report: &MergeReport) {
    let output = report.output.display().to_string();
    println!("{} Merged into {}", "✓".green().bold(), output.bold());
    println!("same_uid_count={}", report.same_uid_count);
    println!("inserted_from_B={}", report.inserted_from_b);
    println!("merged_total_unique={}", report.merged_total_unique);
    println!("output={output}");
}

fn print_check_report(args: &CheckArgs, report: &CheckReport) {
    println!("{} {} is valid", "✓".green().bold(), args.path.display().to_string().bold());
    println!("  Records: {}", report.records.to_string().cyan());
    println!("  Distinct {}: {}", args.key, report.distinct_uids.to_string().cyan());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn merge_args(extra: &[&str]) -> MergeArgs {
        let mut argv = vec!["uidmerge", "merge", "a.jsonl", "b.jsonl", "-o", "out.jsonl"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Merge(args) => args,
            Command::Check(_) => panic!("expected merge"),
        }
    }

    #[test]
    fn defaults_without_flags() {
        let config = merge_config(&merge_args(&[])).unwrap();
        assert_eq!(config, MergeConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let args = merge_args(&["--key", "id", "--in-memory", "--sorted"]);
        let config = merge_config(&args).unwrap();
        assert_eq!(config.key_field, "id");
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.order, OutputOrder::SortedByKey);
    }

    #[test]
    fn store_path_selects_fixed_disk_store() {
        let config = merge_config(&merge_args(&["--store-path", "tmp.store"])).unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::Disk {
                path: Some(PathBuf::from("tmp.store"))
            }
        );
    }

    #[test]
    fn empty_key_rejected() {
        assert!(merge_config(&merge_args(&["--key", ""])).is_err());
    }

    #[test]
    fn merge_command_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.jsonl");
        let out = dir.path().join("merged.jsonl");
        std::fs::write(&a, "{\"uid\":1}\n").unwrap();
        std::fs::write(&b, "{\"uid\":2}\n{\"uid\":1,\"v\":\"new\"}\n").unwrap();

        let argv: Vec<OsString> = vec![
            "uidmerge".into(),
            "merge".into(),
            a.into_os_string(),
            b.into_os_string(),
            "-o".into(),
            out.clone().into_os_string(),
            "--format".into(),
            "json".into(),
        ];
        run_command(Cli::parse_from(argv)).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains(r#"{"uid":1,"v":"new"}"#));
    }

    #[test]
    fn check_command_rejects_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        std::fs::write(&path, "{\"uid\":1}\n{\"id\":2}\n").unwrap();

        let argv: Vec<OsString> = vec!["uidmerge".into(), "check".into(), path.into_os_string()];
        let err = run_command(Cli::parse_from(argv)).unwrap_err();
        assert_eq!(err.to_string(), "a.jsonl: missing uid at line 2");
    }
}
