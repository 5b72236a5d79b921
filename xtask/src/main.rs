// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Custom cargo commands for the conformance crate.
//!
//! Usage:
//!   cargo xtask test              - Run all tests
//!   cargo xtask check             - cargo check + test + clippy
//!   cargo xtask soak [ROUNDS]     - Full-size conformance runs over fresh seeds
//!   cargo xtask replay SEED       - Re-run the full-size conformance test at SEED
//!   cargo xtask bench             - Run benchmarks

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const ENV_SEED: &str = "SOREX_CONFORMANCE_SEED";
const ENV_NIGHTLY: &str = "SOREX_CONFORMANCE_NIGHTLY";

/// Ignored test that reads its configuration from the environment.
const SOAK_TEST: &str = "block::environment_configured_run";

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let task = args.next();
    match task.as_deref() {
        Some("test") => test()?,
        Some("check") => check()?,
        Some("soak") => {
            let rounds = match args.next() {
                Some(raw) => raw.parse().with_context(|| format!("ROUNDS must be a number, got {:?}", raw))?,
                None => 10,
            };
            soak(rounds)?
        }
        Some("replay") => {
            let Some(seed) = args.next() else {
                bail!("replay needs a SEED");
            };
            run_soak_test(&seed)?
        }
        Some("bench") => bench()?,
        _ => print_help(),
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"
cargo xtask <COMMAND>

Commands:
  test            Run all Rust tests
  check           Quick check (cargo check + test + clippy)
  soak [ROUNDS]   Full-size conformance runs, one fresh seed per round (default 10)
  replay SEED     Re-run the full-size conformance test with a failing seed
  bench           Run benchmarks
"#
    );
}

/// Run all tests
fn test() -> Result<()> {
    run_cargo(&["test"], &[])
}

fn check() -> Result<()> {
    println!("Running quick checks...\n");

    println!("[1/3] cargo check...");
    run_cargo(&["check", "--all-targets"], &[])?;

    println!("[2/3] cargo test...");
    run_cargo(&["test", "--quiet"], &[])?;

    println!("[3/3] cargo clippy...");
    run_cargo(&["clippy", "--quiet", "--all-targets", "--", "-D", "warnings"], &[])?;

    println!("\n✓ Quick checks passed");
    Ok(())
}

/// Loop the environment-configured conformance test over fresh seeds.
/// Stops at the first failure and prints the seed to replay.
fn soak(rounds: u32) -> Result<()> {
    let base = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before 1970")?
        .as_nanos() as u64;

    for round in 0..rounds {
        let seed = format!("{:#x}", base.wrapping_add(u64::from(round).wrapping_mul(0x9E37_79B9_7F4A_7C15)));
        println!("[{}/{}] seed {}", round + 1, rounds, seed);
        if let Err(e) = run_soak_test(&seed) {
            eprintln!("\n✗ Soak failed. Replay with: cargo xtask replay {}", seed);
            return Err(e);
        }
    }

    println!("\n✓ {} soak rounds passed", rounds);
    Ok(())
}

fn run_soak_test(seed: &str) -> Result<()> {
    let nightly = env::var(ENV_NIGHTLY).unwrap_or_else(|_| "1".to_string());
    run_cargo(
        &[
            "test",
            "--profile",
            "soak",
            "--test",
            "conformance",
            "--",
            "--ignored",
            "--exact",
            SOAK_TEST,
        ],
        &[(ENV_SEED, seed), (ENV_NIGHTLY, &nightly)],
    )
}

/// Run benchmarks
fn bench() -> Result<()> {
    run_cargo(&["bench"], &[])
}

// ============================================================================
// Helper functions
// ============================================================================

fn project_root() -> Result<PathBuf> {
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir().context("no working directory")?,
    };

    // xtask is in project_root/xtask, so go up one level
    let root = manifest_dir.parent().unwrap_or(&manifest_dir);
    Ok(root.to_path_buf())
}

fn run_cargo(args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
    let root = project_root()?;

    let status = Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .current_dir(&root)
        .status()
        .with_context(|| format!("Failed to run cargo {:?}", args))?;

    if !status.success() {
        bail!("cargo {:?} failed", args);
    }

    Ok(())
}
