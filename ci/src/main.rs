#!/usr/bin/env cargo
//! Chat Registry CI Tool
//!
//! Checks, lints and tests every crate in the workspace

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser)]
#[command(
    name = "ci",
    about = "CI tool for checking and testing the chat registry workspace",
    long_about = r#"
CI tool for checking and testing the chat registry workspace

Examples:
  cargo run -p ci                      # Check compilation (default)
  cargo run -p ci -- check             # Check that all crates compile
  cargo run -p ci -- fmt               # Verify formatting
  cargo run -p ci -- test              # Run all tests
"#
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Check that all crates compile, tests included
    Check,
    /// Verify formatting without rewriting files
    Fmt,
    /// Run all tests
    Test,
}

fn main() -> Result<()> {
    let args = Args::parse();

    check_rust()?;
    let repo_root = get_repo_root()?;

    match args.command {
        Some(Commands::Check) | None => run_cargo(
            &repo_root,
            "🦀 Checking workspace",
            &["check", "--workspace", "--all-targets"],
        ),
        Some(Commands::Fmt) => run_cargo(
            &repo_root,
            "🧹 Checking formatting",
            &["fmt", "--all", "--", "--check"],
        ),
        Some(Commands::Test) => run_cargo(
            &repo_root,
            "🧪 Running tests",
            &["test", "--workspace"],
        ),
    }
}

fn check_rust() -> Result<()> {
    if which::which("cargo").is_err() {
        return Err(anyhow!(
            "❌ Error: Cargo not found. Please install Rust first.\n   Visit: https://rustup.rs/"
        ));
    }
    Ok(())
}

fn get_repo_root() -> Result<PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").context(
        "❌ CI tool must be run via cargo. CARGO_MANIFEST_DIR not found.",
    )?;

    let manifest_path = PathBuf::from(manifest_dir);
    // If we're in the ci/ directory, go up to workspace root
    if manifest_path.file_name() == Some(std::ffi::OsStr::new("ci")) {
        if let Some(parent) = manifest_path.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Ok(manifest_path)
}

/// Run one cargo invocation at the workspace root, streaming its output
fn run_cargo(repo_root: &PathBuf, banner: &str, args: &[&str]) -> Result<()> {
    println!("{banner}...");
    println!("   In: {}", repo_root.display());

    let status = Command::new("cargo")
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .current_dir(repo_root)
        .status()
        .with_context(|| format!("Failed to execute cargo {}", args.join(" ")))?;

    if !status.success() {
        return Err(anyhow!("❌ cargo {} failed", args.join(" ")));
    }

    println!("✅ cargo {} passed!", args.join(" "));
    Ok(())
}
