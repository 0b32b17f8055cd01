// Mnemonic String Pool
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
// Mnemonics are deduplicated only after every descriptor has already been
// encoded (the encoder stores the name itself; this pool replaces each
// name with its index once every line has been seen), and indexed in
// lexicographic order so that output is reproducible independent of
// catalog order, per §5 and §9. Adapted from the teacher's `Interner`
// idea (objects held once, looked up by value) but built on a sorted
// `BTreeSet` instead of an arena-plus-unsafe-transmute, since interior
// string ownership has no lifetime to fight here.

use std::collections::BTreeSet;

/// Accumulates mnemonic names seen while descriptors are encoded, then
/// freezes them into a sorted pool with a tag per name.
#[derive(Default)]
pub struct MnemonicPool {
    seen: BTreeSet<String>,
}

/// The frozen pool: a NUL-separated string, the per-mnemonic byte offset
/// table (§6), and a lookup from name to tag index.
#[derive(Debug)]
pub struct FrozenPool {
    pub names: Vec<String>,
    pub offsets: Vec<u32>,
    pub pool: String,
}

impl MnemonicPool {
    pub fn new() -> MnemonicPool {
        MnemonicPool::default()
    }

    pub fn intern(&mut self, name: &str) {
        if !self.seen.contains(name) {
            self.seen.insert(name.to_string());
        }
    }

    pub fn freeze(self) -> FrozenPool {
        let names: Vec<String> = self.seen.into_iter().collect();
        let mut offsets = Vec::with_capacity(names.len() + 1);
        offsets.push(0u32);
        for name in &names {
            offsets.push(offsets.last().unwrap() + name.len() as u32 + 1);
        }
        let pool = names.join("\0") + if names.is_empty() { "" } else { "\0" };
        FrozenPool { names, offsets, pool }
    }
}

impl FrozenPool {
    pub fn tag_of(&self, name: &str) -> u16 {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .expect("mnemonic must have been interned before tag lookup") as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_indexes_lexicographically() {
        let mut pool = MnemonicPool::new();
        for m in ["MOVBE", "ADD", "NOP", "ADD"] {
            pool.intern(m);
        }
        let frozen = pool.freeze();
        assert_eq!(frozen.names, vec!["ADD", "MOVBE", "NOP"]);
        assert_eq!(frozen.pool, "ADD\0MOVBE\0NOP\0");
    }

    #[test]
    fn offsets_advance_by_length_plus_one() {
        let mut pool = MnemonicPool::new();
        pool.intern("ADD");
        pool.intern("NOP");
        let frozen = pool.freeze();
        // entry 0 is 0; entry i+1 = entry i + len(mnemonic_i) + 1
        assert_eq!(frozen.offsets, vec![0, 4, 8]);
    }

    #[test]
    fn tag_matches_sorted_position() {
        let mut pool = MnemonicPool::new();
        pool.intern("ZOO");
        pool.intern("AAA");
        let frozen = pool.freeze();
        assert_eq!(frozen.tag_of("AAA"), 0);
        assert_eq!(frozen.tag_of("ZOO"), 1);
    }
}
