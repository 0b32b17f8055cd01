// CLI Driver
//
// This file is part of ix86-tablegen.
// Copyright (C) 2017 Jeffrey Sharp
//
// ix86-tablegen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// ix86-tablegen is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with ix86-tablegen.  If not, see <http://www.gnu.org/licenses/>.
//
// Thin wrapper over the library's `compile` entry point: parses CLI flags
// and writes the table/mnemonics artifacts the caller asked for.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use ix86_tablegen::{compile, CompiledOutput, Mode};

/// Compiles an opcode catalog into a packed decode trie.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input catalog file.
    catalog: PathBuf,

    /// Write the raw table-data blob here instead of stdout.
    #[arg(long)]
    out_table: Option<PathBuf>,

    /// Write the mnemonic pool, offset table, and root offsets here
    /// instead of stdout.
    #[arg(long)]
    out_mnemonics: Option<PathBuf>,

    /// Build the 32-bit root.
    #[arg(long = "32")]
    mode32: bool,

    /// Build the 64-bit root.
    #[arg(long = "64")]
    mode64: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let modes = selected_modes(&args)?;

    let file = File::open(&args.catalog)
        .with_context(|| format!("opening catalog {}", args.catalog.display()))?;
    let path = args.catalog.display().to_string();

    let output = compile(BufReader::new(file), &path, &modes)?;

    if args.out_table.is_none() && args.out_mnemonics.is_none() {
        let stdout = std::io::stdout();
        write_combined_report(&mut stdout.lock(), &output, &modes)?;
        return Ok(());
    }

    if let Some(path) = &args.out_table {
        let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&output.table.bytes)?;
    }
    if let Some(path) = &args.out_mnemonics {
        let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_mnemonics_report(&mut f, &output, &modes)?;
    }

    Ok(())
}

fn selected_modes(args: &Args) -> anyhow::Result<Vec<Mode>> {
    let mut modes = Vec::new();
    if args.mode32 {
        modes.push(Mode::Root32);
    }
    if args.mode64 {
        modes.push(Mode::Root64);
    }
    anyhow::ensure!(!modes.is_empty(), "at least one of --32 or --64 is required");
    Ok(modes)
}

/// Writes the mnemonic pool, offset table, and root offsets — everything
/// the table-data blob itself doesn't carry.
fn write_mnemonics_report(w: &mut impl Write, output: &CompiledOutput, modes: &[Mode]) -> anyhow::Result<()> {
    writeln!(w, "mnemonic_pool = {:?}", output.mnemonics.pool)?;
    writeln!(w, "mnemonic_offsets = {:?}", output.mnemonics.offsets)?;
    for &mode in modes {
        writeln!(w, "root_offset[{mode:?}] = {}", output.root_offset(mode))?;
    }
    Ok(())
}

/// Used only when neither `--out-table` nor `--out-mnemonics` is given:
/// a single human-readable rendering of both artifacts, since there is
/// nowhere else to put the raw table blob on a text stream.
fn write_combined_report(w: &mut impl Write, output: &CompiledOutput, modes: &[Mode]) -> anyhow::Result<()> {
    writeln!(w, "table_bytes = {}", output.table.bytes.len())?;
    write_mnemonics_report(w, output, modes)?;
    write!(w, "table_data = ")?;
    for byte in &output.table.bytes {
        write!(w, "{byte:02x}")?;
    }
    writeln!(w)?;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}
