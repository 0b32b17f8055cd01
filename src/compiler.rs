// Orchestration
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
// Wires the catalog reader into the opcode/descriptor/trie/layout
// pipeline described across spec.md §2 and §4: parse each line once,
// expand it into N paths, encode its descriptor once, then insert the
// cartesian pairs under whichever mode roots the line's flags allow.
// Mirrors the reference generator's top-level driver loop, restated as a
// library entry point instead of a script so the CLI (`main.rs`) stays a
// thin translation layer per the teacher's bin/lib split.

use std::io::BufRead;

use tracing::{debug, info};

use crate::catalog;
use crate::descriptor::{EncodingForm, Flag, InstrDesc};
use crate::error::{Error, Result};
use crate::layout::{self, Table};
use crate::mnemonic::{FrozenPool, MnemonicPool};
use crate::opcode::Opcode;
use crate::operand;
use crate::trie::Trie;

/// An addressing mode whose root gets its own entry point into the trie.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Root32,
    Root64,
}

impl Mode {
    fn root_name(self) -> &'static str {
        match self {
            Mode::Root32 => "ROOT32",
            Mode::Root64 => "ROOT64",
        }
    }

    /// The flag that excludes a line from this mode's root. Inverted by
    /// design: `ONLY32` excludes from the 64-bit root and vice versa, per
    /// the reference generator's `"ONLY%d" % (96 - mode)` naming trick.
    /// This is not a bug to "fix" — implementations that exclude on the
    /// matching flag instead produce the wrong table.
    fn excluded_by(self) -> Flag {
        match self {
            Mode::Root32 => Flag::Only64,
            Mode::Root64 => Flag::Only32,
        }
    }
}

/// Everything the CLI driver needs to write out the four artifacts of
/// spec.md §6.
#[derive(Debug)]
pub struct CompiledOutput {
    pub table: Table,
    pub mnemonics: FrozenPool,
    pub modes: Vec<Mode>,
}

impl CompiledOutput {
    /// The byte offset of `mode`'s root inside `table.bytes`, in the same
    /// order `modes` was passed to `compile`.
    pub fn root_offset(&self, mode: Mode) -> usize {
        let idx = self.modes.iter().position(|&m| m == mode).expect("mode was compiled");
        self.table.root_offsets[idx]
    }
}

pub fn compile<R: BufRead>(reader: R, path: &str, modes: &[Mode]) -> Result<CompiledOutput> {
    let root_names: Vec<&str> = modes.iter().map(|m| m.root_name()).collect();
    let mut trie = Trie::new(&root_names);
    let mut mnemonics = MnemonicPool::new();

    let lines = catalog::read(reader, path)?;
    info!(count = lines.len(), %path, "catalog lines read");

    for line in &lines {
        let opcode = with_line(Opcode::parse(&line.pattern), path, line.line_no)?;

        let encoding = EncodingForm::lookup(&line.encoding).ok_or_else(|| Error::Grammar {
            path: path.to_string(),
            line: line.line_no,
            reason: format!("unknown encoding form `{}`", line.encoding),
        })?;

        let operands = line
            .operands
            .iter()
            .map(|name| {
                operand::lookup(name).ok_or_else(|| Error::Grammar {
                    path: path.to_string(),
                    line: line.line_no,
                    reason: format!("unknown operand kind `{name}`"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let flags: std::collections::HashSet<Flag> = line
            .flags
            .iter()
            .map(|name| {
                Flag::lookup(name).ok_or_else(|| Error::Grammar {
                    path: path.to_string(),
                    line: line.line_no,
                    reason: format!("unknown flag `{name}`"),
                })
            })
            .collect::<Result<std::collections::HashSet<Flag>>>()?;

        let desc = InstrDesc { mnemonic: line.mnemonic.clone(), encoding, operands, flags };
        let words = desc.encode()?;
        mnemonics.intern(&line.mnemonic);

        debug!(line = line.line_no, mnemonic = %line.mnemonic, pattern = %line.pattern, "line encoded");

        for &mode in modes {
            if desc.flags.contains(&mode.excluded_by()) {
                continue;
            }
            for path_steps in opcode.expand() {
                trie.add_opcode(mode.root_name(), &path_steps, words, &line.mnemonic)?;
            }
        }
    }

    layout::deduplicate(&mut trie);
    let frozen = mnemonics.freeze();
    let table = layout::compile(&trie, &frozen)?;

    info!(bytes = table.bytes.len(), mnemonics = frozen.names.len(), "table compiled");
    for (kind, count) in &table.stats {
        debug!(?kind, count, "node kind tally");
    }

    Ok(CompiledOutput { table, mnemonics: frozen, modes: modes.to_vec() })
}

fn with_line<T>(result: Result<T>, path: &str, line_no: usize) -> Result<T> {
    result.map_err(|err| match err {
        Error::Grammar { reason, .. } => Error::Grammar { path: path.to_string(), line: line_no, reason },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_nop_line_compiles() {
        let out = compile("90 NP - - - - NOP".as_bytes(), "test", &[Mode::Root32]).unwrap();
        assert_eq!(out.mnemonics.names, vec!["NOP"]);
    }

    #[test]
    fn only32_line_is_absent_from_the_64_bit_root() {
        let with_pushad = "90 NP - - - - PUSHAD ONLY32\ncc NP - - - - INT3";
        let without_pushad = "cc NP - - - - INT3";

        let with_both_modes = compile(with_pushad.as_bytes(), "test", &[Mode::Root64]).unwrap();
        let root64_only = compile(without_pushad.as_bytes(), "test", &[Mode::Root64]).unwrap();

        // ONLY32 excludes the line from the 64-bit root, so the ROOT64
        // table must come out identical whether or not PUSHAD is present.
        assert_eq!(with_both_modes.table.bytes, root64_only.table.bytes);

        let with_root32 = compile(with_pushad.as_bytes(), "test", &[Mode::Root32]).unwrap();
        let without_root32 = compile(without_pushad.as_bytes(), "test", &[Mode::Root32]).unwrap();
        assert_ne!(with_root32.table.bytes, without_root32.table.bytes);
    }

    #[test]
    fn unknown_operand_kind_is_a_grammar_error_with_line_number() {
        let err = compile("90 NP BOGUS - - - NOP".as_bytes(), "test", &[Mode::Root32]).unwrap_err();
        assert!(matches!(err, Error::Grammar { line: 1, .. }));
    }

    #[test]
    fn colliding_lines_produce_a_conflict_error() {
        let catalog = "90 NP - - - - NOP\n90 NP - - - - ALSO";
        let err = compile(catalog.as_bytes(), "test", &[Mode::Root32]).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }
}
