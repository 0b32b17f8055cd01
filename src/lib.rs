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

//! Compiles a text catalog of x86/x86-64 instruction descriptions into a
//! packed decode trie. See [`compiler::compile`] for the entry point; the
//! CLI binary in `main.rs` is a thin wrapper around it.

pub mod catalog;
pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod mnemonic;
pub mod opcode;
pub mod operand;
pub mod trie;

pub use compiler::{compile, CompiledOutput, Mode};
pub use error::{Error, Result};
