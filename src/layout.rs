// Deduplicator And Layout Compiler
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
// Merges structurally identical sub-tries to a fixpoint, then assigns
// byte offsets in insertion order and serialises the named graph to the
// packed 16-bit-word table the runtime decoder reads. Grounded on the
// reference generator's `Table.deduplicate`/`calc_offsets`/`compile`
// trio, restated over the named-node `Trie` of `trie.rs` instead of a
// plain dict, and on the teacher's `ByteOrderRead` (`io/endian.rs`) for
// the little-endian word convention — mirrored here for writing.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mnemonic::FrozenPool;
use crate::trie::{Node, TableKind, Trie};

/// Repeatedly merges nodes with identical (kind, payload, child-name
/// tuple) until a pass produces no merges. Needed because dedup at depth
/// k can only be detected once every node at depth k+1 has already
/// converged (§4.4).
pub fn deduplicate(trie: &mut Trie) {
    loop {
        let synonyms: HashMap<String, String> = {
            let mut seen: HashMap<&Node, String> = HashMap::new();
            let mut synonyms = HashMap::new();
            for name in &trie.order {
                let node = &trie.nodes[name];
                match seen.get(node) {
                    Some(canonical) => {
                        synonyms.insert(name.clone(), canonical.clone());
                    }
                    None => {
                        seen.insert(node, name.clone());
                    }
                }
            }
            synonyms
        };
        if synonyms.is_empty() {
            return;
        }

        for name in &trie.order {
            if synonyms.contains_key(name) {
                continue;
            }
            if let Some(Node::Table { children, .. }) = trie.nodes.get_mut(name) {
                for child in children.iter_mut() {
                    if let Some(child_name) = child {
                        if let Some(canonical) = synonyms.get(child_name) {
                            *child_name = canonical.clone();
                        }
                    }
                }
            }
        }

        trie.order.retain(|name| !synonyms.contains_key(name));
        for dup in synonyms.keys() {
            trie.nodes.remove(dup);
        }
        for root in trie.roots.iter_mut() {
            if let Some(canonical) = synonyms.get(root) {
                *root = canonical.clone();
            }
        }
    }
}

/// The finished table: the packed byte blob, one byte offset per root
/// (in the order the roots were declared), and a node-kind histogram for
/// diagnostics (§4.7).
#[derive(Debug)]
pub struct Table {
    pub bytes: Vec<u8>,
    pub root_offsets: Vec<usize>,
    pub stats: HashMap<TableKind, usize>,
}

/// Assigns offsets and serialises. `mnemonics` must already contain every
/// mnemonic referenced by an `INSTR` node in `trie` (the caller freezes
/// the pool only after every catalog line has been encoded).
pub fn compile(trie: &Trie, mnemonics: &FrozenPool) -> Result<Table> {
    let mut offset_of: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for name in &trie.order {
        offset_of.insert(name, total);
        let word_count = match &trie.nodes[name] {
            Node::Table { children, .. } => children.len(),
            Node::Instr { .. } => 4,
        };
        total += round_up_to_4(word_count * 2);
    }
    if total >= 0x8000 {
        return Err(Error::Capacity { bytes: total });
    }

    let mut words = vec![0u16; total / 2];
    for name in &trie.order {
        let base = offset_of[name.as_str()] / 2;
        match &trie.nodes[name] {
            Node::Instr { words: w, mnemonic } => {
                words[base] = w[0];
                words[base + 1] = w[1];
                words[base + 2] = w[2];
                words[base + 3] = mnemonics.tag_of(mnemonic);
            }
            Node::Table { children, .. } => {
                for (slot, child) in children.iter().enumerate() {
                    words[base + slot] = match child {
                        None => 0,
                        Some(child_name) => {
                            let child_offset = offset_of[child_name.as_str()];
                            let kind = trie.nodes[child_name].kind();
                            let code = kind
                                .code()
                                .expect("a table can never point at a Root node") as u16;
                            (((child_offset / 2) as u16) << 1) | code
                        }
                    };
                }
            }
        }
    }

    let mut stats = HashMap::new();
    for name in &trie.order {
        *stats.entry(trie.nodes[name].kind()).or_insert(0) += 1;
    }

    let bytes = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let root_offsets = trie.roots.iter().map(|r| offset_of[r.as_str()]).collect();

    Ok(Table { bytes, root_offsets, stats })
}

fn round_up_to_4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::MnemonicPool;
    use crate::trie::TableKind;
    use quickcheck_macros::quickcheck;

    fn pool(names: &[&str]) -> FrozenPool {
        let mut p = MnemonicPool::new();
        for n in names {
            p.intern(n);
        }
        p.freeze()
    }

    #[quickcheck]
    fn dedup_reaches_a_fixpoint(bytes: Vec<u8>) -> bool {
        let mut trie = Trie::new(&["root"]);
        for &b in &bytes {
            // Mnemonics collapse into a handful of distinct values so that
            // structurally-equal leaves actually occur for dedup to merge.
            let mnemonic = format!("M{}", b % 4);
            let _ = trie.add_opcode(
                "root",
                &[(TableKind::Root, 0), (TableKind::Table256, b)],
                [b as u16 % 4, 0, 0],
                &mnemonic,
            );
        }
        deduplicate(&mut trie);
        let after_first_pass = trie.order.len();
        deduplicate(&mut trie);
        trie.order.len() == after_first_pass
    }

    #[test]
    fn identical_subtries_collapse_to_one_node() {
        let mut trie = Trie::new(&["root"]);
        // Two distinct T8 slots pointing at structurally equal INSTR leaves.
        for slot in [0u8, 1u8] {
            trie.add_opcode(
                "root",
                &[(TableKind::Root, 0), (TableKind::Table256, 0xc0), (TableKind::Table8, slot)],
                [0x1234, 0x5678, 0x9abc],
                "ROL",
            )
            .unwrap();
        }
        let before = trie.order.len();
        deduplicate(&mut trie);
        // The two INSTR leaves merge into one; the two parents do not
        // (they still differ by which slot index pointed at the child),
        // so exactly one node should have disappeared.
        assert_eq!(trie.order.len(), before - 1);
    }

    #[test]
    fn eight_extended_slots_dedup_to_a_single_instr() {
        let mut trie = Trie::new(&["root"]);
        for slot in 0u8..8 {
            trie.add_opcode(
                "root",
                &[(TableKind::Root, 0), (TableKind::Table256, 0xc0), (TableKind::Table8, slot)],
                [0x1, 0x2, 0x3],
                "ROL",
            )
            .unwrap();
        }
        deduplicate(&mut trie);
        let instr_count = trie
            .nodes
            .values()
            .filter(|n| matches!(n, Node::Instr { .. }))
            .count();
        assert_eq!(instr_count, 1);
    }

    #[test]
    fn small_table_stays_under_the_capacity_limit() {
        let mut trie = Trie::new(&["root"]);
        for opc in 0u8..=255 {
            trie.add_opcode(
                "root",
                &[(TableKind::Root, 0), (TableKind::Table256, opc)],
                [opc as u16, 0, 0],
                &format!("M{opc}"),
            )
            .unwrap();
        }
        let names: Vec<String> = (0u8..=255).map(|o| format!("M{o}")).collect();
        let mnemonics = pool(&names.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        let table = compile(&trie, &mnemonics).unwrap();
        assert!(table.bytes.len() < 0x8000);
    }

    #[test]
    fn oversized_table_is_rejected() {
        // Every opcode gets its own mnemonic so nothing dedups away: 32
        // roots * 256 distinct instructions * (8 bytes + root's own table
        // share) comfortably clears the 0x8000 ceiling.
        let root_names: Vec<String> = (0..32).map(|i| format!("root{i}")).collect();
        let root_refs: Vec<&str> = root_names.iter().map(|s| s.as_str()).collect();
        let mut trie = Trie::new(&root_refs);
        let mut mnemonic_pool = MnemonicPool::new();
        for (ri, root) in root_names.iter().enumerate() {
            for opc in 0u8..=255 {
                let mnemonic = format!("M{ri}_{opc}");
                mnemonic_pool.intern(&mnemonic);
                trie.add_opcode(
                    root,
                    &[(TableKind::Root, 0), (TableKind::Table256, opc)],
                    [opc as u16, 0, 0],
                    &mnemonic,
                )
                .unwrap();
            }
        }
        let frozen = mnemonic_pool.freeze();
        let err = compile(&trie, &frozen).unwrap_err();
        assert!(matches!(err, Error::Capacity { .. }));
    }

    #[test]
    fn child_words_encode_offset_and_kind() {
        let mut trie = Trie::new(&["root"]);
        trie.add_opcode("root", &[(TableKind::Root, 0), (TableKind::Table256, 0x90)], [0, 0, 0], "NOP")
            .unwrap();
        let mnemonics = pool(&["NOP"]);
        let table = compile(&trie, &mnemonics).unwrap();
        let root_word_at_0x90 = {
            let base = table.root_offsets[0] + 0x90 * 2;
            u16::from_le_bytes([table.bytes[base], table.bytes[base + 1]])
        };
        assert_eq!(root_word_at_0x90 & 7, TableKind::Instr.code().unwrap() as u16);
        let child_offset = (root_word_at_0x90 >> 1) as usize * 2;
        assert_eq!(child_offset, table.bytes.len() - 8);
    }
}
