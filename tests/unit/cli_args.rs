//! Unit tests for CLI argument parsing.

use clap::Parser;
use std::path::Path;
use xenocanto_downloader::cli::{Cli, Commands};

#[test]
fn test_fetch_defaults() {
    let cli = Cli::try_parse_from(["xenocanto-downloader", "fetch"]).unwrap();
    let Commands::Fetch(args) = cli.command else {
        panic!("expected fetch command");
    };
    assert_eq!(args.roster, Path::new("labels.csv"));
    assert_eq!(args.cache_dir, Path::new("xenocanto_cache"));
    assert_eq!(args.summary, Path::new("fetch_summary.csv"));
    assert_eq!(args.country, "ZA");
    assert_eq!(args.max_recordings, 30);
    assert_eq!(args.max_api_calls, 800);
    assert_eq!(args.delay_ms, 1500);
    assert!(args.api_key.is_none());
}

#[test]
fn test_fetch_overrides() {
    let cli = Cli::try_parse_from([
        "xenocanto-downloader",
        "fetch",
        "--roster",
        "birds.csv",
        "--country",
        "",
        "--max-recordings",
        "100",
        "--api-key",
        "abc123",
    ])
    .unwrap();
    let Commands::Fetch(args) = cli.command else {
        panic!("expected fetch command");
    };
    assert_eq!(args.roster, Path::new("birds.csv"));
    assert_eq!(args.country, "");
    assert_eq!(args.max_recordings, 100);
    assert_eq!(args.api_key.as_deref(), Some("abc123"));
}

#[test]
fn test_download_defaults() {
    let cli = Cli::try_parse_from(["xenocanto-downloader", "download"]).unwrap();
    let Commands::Download(args) = cli.command else {
        panic!("expected download command");
    };
    assert_eq!(args.cache_dir, Path::new("xenocanto_cache"));
    assert_eq!(args.audio_dir, Path::new("xeno-raw"));
}

#[test]
fn test_reconcile_in_place_conflicts_with_output() {
    let result = Cli::try_parse_from([
        "xenocanto-downloader",
        "reconcile",
        "--in-place",
        "--output",
        "other.csv",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_reconcile_defaults() {
    let cli = Cli::try_parse_from(["xenocanto-downloader", "reconcile"]).unwrap();
    let Commands::Reconcile(args) = cli.command else {
        panic!("expected reconcile command");
    };
    assert_eq!(args.roster, Path::new("labels.csv"));
    assert_eq!(args.output, Path::new("labels_updated.csv"));
    assert!(!args.in_place);
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["xenocanto-downloader", "upload"]).is_err());
}
