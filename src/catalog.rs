// Catalog Reader
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
// Turns catalog text into an ordered list of raw line records. Kept
// deliberately dumb: field splitting and comment/blank-line skipping only,
// with no knowledge of what a valid opcode pattern or operand kind looks
// like — that validation happens where the corresponding lookup tables
// live (`opcode`, `operand`, `descriptor`), so this module's own errors are
// limited to malformed line shape. Line order is preserved exactly as read,
// which the layout stage's determinism depends on.

use std::io::BufRead;

use crate::error::{Error, Result};

/// One catalog line, still in textual form. `-` placeholders have already
/// been dropped from `operands`.
#[derive(Clone, Debug)]
pub struct CatalogLine {
    pub line_no: usize,
    pub pattern: String,
    pub encoding: String,
    pub operands: Vec<String>,
    pub mnemonic: String,
    pub flags: Vec<String>,
}

const OPERAND_SLOTS: usize = 4;
const MIN_FIELDS: usize = 2 + OPERAND_SLOTS + 1;

pub fn read<R: BufRead>(reader: R, path: &str) -> Result<Vec<CatalogLine>> {
    let mut lines = Vec::new();
    for (idx, raw) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let raw = raw?;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_ascii_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Err(Error::Grammar {
                path: path.to_string(),
                line: line_no,
                reason: format!(
                    "expected at least {MIN_FIELDS} fields (pattern, encoding, {OPERAND_SLOTS} operand slots, mnemonic), found {}",
                    fields.len()
                ),
            });
        }

        let operands = fields[2..2 + OPERAND_SLOTS]
            .iter()
            .filter(|&&f| f != "-")
            .map(|&f| f.to_string())
            .collect();

        lines.push(CatalogLine {
            line_no,
            pattern: fields[0].to_string(),
            encoding: fields[1].to_string(),
            operands,
            mnemonic: fields[2 + OPERAND_SLOTS].to_string(),
            flags: fields[3 + OPERAND_SLOTS..].iter().map(|&f| f.to_string()).collect(),
        });
    }
    Ok(lines)
}
