//! CPU profile printer
//!
//! Parses a captured profile and dumps its header, stacks, and totals.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use profscope::CpuProfile;

#[derive(Parser)]
#[command(about = "Print a gperftools CPU profile in human-readable form")]
struct Args {
    /// Path to the binary CPU profile
    profile: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let profile = CpuProfile::from_file(&args.profile)
        .with_context(|| format!("parse profile failed: {}", args.profile.display()))?;
    println!("Dump CPU profile:");
    println!("{profile}");
    Ok(())
}
