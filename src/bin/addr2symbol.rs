//! Command-line address-to-symbol lookup
//!
//! Resolves one hex address against an executable and an optional memory-map
//! dump, the same way the profile transform resolves stack addresses.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

use profscope::{ObjectSymbolLocator, SymbolLocator};

#[derive(Parser)]
#[command(about = "Resolve a memory address to its nearest symbol")]
struct Args {
    /// Executable file path
    #[arg(long)]
    exe: Option<String>,

    /// Proc mapping file path, may be empty
    #[arg(long)]
    proc_mapping: Option<PathBuf>,

    /// Hex memory address, 0x00007fd4246d05b6 or 00007fd4246d05b6
    #[arg(long)]
    addr: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (exe, addr) = match (&args.exe, &args.addr) {
        (Some(exe), Some(addr)) => (exe, addr),
        _ => {
            Args::command().print_help().ok();
            std::process::exit(1);
        }
    };
    let addr = parse_hex_addr(addr).with_context(|| format!("invalid --addr value: {addr}"))?;

    let maps_content = match &args.proc_mapping {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => String::new(),
    };

    let locator = ObjectSymbolLocator::with_maps(exe, maps_content)?;
    let mapping = locator.search_symbols(&[addr])?;
    if let Some(info) = mapping.get(&addr) {
        eprintln!("addr: {addr:#018x}, symbol: {}", info.symbol_name);
    }
    Ok(())
}

fn parse_hex_addr(s: &str) -> anyhow::Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Ok(u64::from_str_radix(digits, 16)?)
}
