// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use flexi_logger::Logger;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use hutch::serializer::serialize_compact_listing;
use hutch::{
    print_instruction, ArchProfile, CapstoneDecoder, Emit, InstructionStore, Iteration,
    PrintEmit, Session, SessionConfig, Unit,
};

/// Disassemble a flat binary image.
#[derive(Parser, Debug)]
#[command(name = "hutch", version)]
struct Cli {
    /// Raw image file
    image: PathBuf,

    /// Session config (JSON); --arch and --base override it
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Architecture profile
    #[arg(short = 'a', long = "arch", value_enum)]
    arch: Option<ArchProfile>,

    /// Address the first image byte is loaded at (hex)
    #[arg(short = 'b', long = "base", value_parser = parse_hex_address)]
    base: Option<u64>,

    /// Unit for --offset and --amount
    #[arg(short = 'u', long = "unit", value_enum, default_value = "insn")]
    unit: Unit,

    /// Where to start, in units from the base (bytes in --budget mode)
    #[arg(short = 'o', long = "offset", default_value_t = 0)]
    offset: u64,

    /// How many units to decode (default: up to the image end)
    #[arg(short = 'n', long = "amount")]
    amount: Option<u64>,

    /// Step one instruction at a time within a byte budget
    #[arg(long = "budget")]
    budget: Option<u64>,

    /// Collect into an instruction store and print the listing at the end
    #[arg(short = 's', long = "store", default_value_t = false)]
    store: bool,

    /// With --store, print the listing as compact JSON
    #[arg(long = "json", default_value_t = false, requires = "store")]
    json: bool,

    /// Enable debug output
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_env_or_str(if cli.debug { "debug" } else { "info" })?.start()?;

    let mut config = match cli.config.as_deref() {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(arch) = cli.arch {
        config.arch = arch;
    }
    if let Some(base) = cli.base {
        config.base_address = base;
    }

    let bytes =
        fs::read(&cli.image).with_context(|| format!("Failed to read {}", cli.image.display()))?;
    let decoder =
        CapstoneDecoder::new(config.arch).map_err(|e| anyhow!("capstone init: {e}"))?;
    let mut session = Session::new(config, bytes, decoder);

    if cli.store {
        let mut store = InstructionStore::new();
        run(&mut session, &cli, &mut store)?;
        if !store.conflicts().is_empty() {
            log::warn!(
                "{} address(es) received conflicting assembly",
                store.conflicts().len()
            );
        }
        print_listing(&store, cli.json)?;
    } else {
        run(&mut session, &cli, &mut PrintEmit::stdout())?;
    }
    Ok(())
}

fn run<E: Emit>(session: &mut Session<CapstoneDecoder>, cli: &Cli, sink: &mut E) -> Result<()> {
    let Some(budget) = cli.budget else {
        let amount = cli.amount.unwrap_or(u64::MAX);
        let consumed = session.disassemble_with(cli.unit, cli.offset, amount, sink)?;
        log::info!("Disassembled {} {:?} unit(s)", consumed, cli.unit);
        return Ok(());
    };

    let mut iter = Iteration::new(budget);
    let mut offset = cli.offset;
    loop {
        match session.disassemble_next_with(&mut iter, offset, sink) {
            Ok(len) => offset += len,
            Err(e) if e.is_end_of_iteration() => {
                log::info!("Iteration finished: {}", e);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    log::info!(
        "Stepped through {} of {} budget byte(s)",
        iter.consumed(),
        iter.budget()
    );
    Ok(())
}

fn print_listing(store: &InstructionStore, json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut w = stdout.lock();
    if json {
        let v = serialize_compact_listing(store, 0, true);
        writeln!(w, "{}", serde_json::to_string_pretty(&v)?)?;
    } else {
        for insn in store {
            print_instruction(&mut w, insn)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Parse hex address from string (supports "0x1234" or "1234" format)
fn parse_hex_address(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u64::from_str_radix(hex_str, 16).map_err(|e| format!("invalid hex address {input:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_addresses_parse_with_or_without_prefix() {
        assert_eq!(parse_hex_address("0x1000"), Ok(0x1000));
        assert_eq!(parse_hex_address(" 401000 "), Ok(0x401000));
        assert!(parse_hex_address("0xzz").is_err());
    }

    #[test]
    fn cli_accepts_step_mode_flags() {
        let cli = Cli::try_parse_from([
            "hutch", "img.bin", "--arch", "amd64", "--base", "0x400000", "--budget", "32",
            "--store", "--json",
        ])
        .unwrap();
        assert_eq!(cli.arch, Some(ArchProfile::Amd64));
        assert_eq!(cli.base, Some(0x400000));
        assert_eq!(cli.budget, Some(32));
        assert_eq!(cli.unit, Unit::Instruction);
        assert!(cli.store && cli.json);
    }

    #[test]
    fn json_requires_store() {
        assert!(Cli::try_parse_from(["hutch", "img.bin", "--json"]).is_err());
    }
}
