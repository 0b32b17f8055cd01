// Error Model
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
// Closed set of fatal build errors. Every error kind named in the catalog
// format's specification has exactly one variant here; there is no
// recoverable or partial-output path (see `compiler::compile`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}:{line}: {reason}")]
    Grammar {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("cannot encode instruction `{mnemonic}`: {reason}")]
    Encoding { mnemonic: String, reason: String },

    #[error("opcode path conflict at {path}: slot already holds a different instruction")]
    Conflict { path: String },

    #[error("decode table exceeds the 15-bit child-pointer range: {bytes} bytes (limit 0x8000)")]
    Capacity { bytes: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
