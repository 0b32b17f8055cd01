// Trie Builder
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
// Maintains a named-node graph of tables of several fixed kinds and
// inserts (path, record) pairs into it, detecting conflicts. This is a
// from-scratch, fully worked-out version of the experiment sketched in
// the teacher codebase's `NibbleTrie` (a flat `Vec` of nodes addressed by
// stable names, never silently re-created) — generalised here to the
// closed set of table kinds the opcode grammar actually produces, and to
// named (not numeric) node identity so that insertion order and conflict
// messages stay human-readable.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::opcode;

/// The closed set of trie node kinds, each with a fixed fan-out.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TableKind {
    Instr,
    Table256,
    Table8,
    Table72,
    TablePrefix,
    TableVex,
    TablePrefixRep,
    Root,
}

impl TableKind {
    pub fn fan_out(self) -> usize {
        match self {
            TableKind::Instr => 1,
            TableKind::Table256 => 256,
            TableKind::Table8 => 8,
            TableKind::Table72 => 72,
            TableKind::TablePrefix => 4,
            TableKind::TableVex => 4,
            TableKind::TablePrefixRep => 4,
            TableKind::Root => 8,
        }
    }

    /// The wire code used in the 16-bit child-pointer word (§4.4). `Root`
    /// never appears as a child and has no code.
    pub fn code(self) -> Option<u8> {
        match self {
            TableKind::Instr => Some(1),
            TableKind::Table256 => Some(2),
            TableKind::Table8 => Some(3),
            TableKind::Table72 => Some(4),
            TableKind::TablePrefix => Some(5),
            TableKind::TableVex => Some(6),
            TableKind::TablePrefixRep => Some(7),
            TableKind::Root => None,
        }
    }
}

/// A node's contents: either a fixed-fan-out table of (possibly absent)
/// child names, or an `INSTR` leaf payload.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Node {
    Table { kind: TableKind, children: Vec<Option<String>> },
    // Holds the mnemonic *name*, not yet its pool tag: per §9, mnemonics
    // are deduplicated and indexed only after every descriptor has been
    // encoded, so the compiler resolves the name to a tag at layout time.
    Instr { words: [u16; 3], mnemonic: String },
}

impl Node {
    pub fn kind(&self) -> TableKind {
        match self {
            Node::Table { kind, .. } => *kind,
            Node::Instr { .. } => TableKind::Instr,
        }
    }

    fn table(kind: TableKind) -> Node {
        Node::Table { kind, children: vec![None; kind.fan_out()] }
    }
}

/// The named graph: root names plus one generated name per interior node,
/// inserted once and never mutated in place afterwards (only dedup may
/// rename references — see `layout`).
pub struct Trie {
    pub nodes: HashMap<String, Node>,
    /// Insertion order, oldest first; roots are inserted first, which
    /// keeps them first in the offset-assignment walk (§4.4).
    pub order: Vec<String>,
    pub roots: Vec<String>,
}

impl Trie {
    pub fn new(root_names: &[&str]) -> Trie {
        let mut trie = Trie { nodes: HashMap::new(), order: Vec::new(), roots: Vec::new() };
        for &name in root_names {
            trie.insert(name.to_string(), Node::table(TableKind::Root));
            trie.roots.push(name.to_string());
        }
        trie
    }

    fn insert(&mut self, name: String, node: Node) {
        self.order.push(name.clone());
        self.nodes.insert(name, node);
    }

    /// Inserts one expanded path under `root`, terminating in an `INSTR`
    /// node holding `words`/`mnemonic_tag`. Fatal on slot conflicts or
    /// kind-discipline violations (§4.3).
    pub fn add_opcode(
        &mut self,
        root: &str,
        path: &[(TableKind, u8)],
        words: [u16; 3],
        mnemonic: &str,
    ) -> Result<()> {
        let mut current = root.to_string();

        for i in 0..path.len() - 1 {
            let (byte, next_kind) = (path[i].1, path[i + 1].0);
            let child_name = {
                let children = match self.nodes.get(&current) {
                    Some(Node::Table { children, .. }) => children,
                    _ => unreachable!("non-leaf steps always address a table node"),
                };
                children[byte as usize].clone()
            };

            let child_name = match child_name {
                Some(name) => name,
                None => {
                    let name = format!("{root}:{}", opcode::format(&path[..=i]));
                    self.insert(name.clone(), Node::table(next_kind));
                    self.set_child(&current, byte, &name)?;
                    name
                }
            };

            match self.nodes.get(&child_name) {
                Some(node) if node.kind() == next_kind => {}
                Some(node) => {
                    return Err(Error::Conflict {
                        path: format!(
                            "{} (have kind {:?}, want {:?})",
                            opcode::format(&path[..=i + 1]),
                            node.kind(),
                            next_kind
                        ),
                    })
                }
                None => unreachable!("child name was just looked up or inserted"),
            }

            current = child_name;
        }

        let (last_byte, leaf_name) = {
            let last = path.last().expect("path is non-empty");
            (last.1, format!("{root}:{}", opcode::format(path)))
        };
        self.insert(leaf_name.clone(), Node::Instr { words, mnemonic: mnemonic.to_string() });
        self.set_child(&current, last_byte, &leaf_name)
    }

    fn set_child(&mut self, table_name: &str, slot: u8, child_name: &str) -> Result<()> {
        match self.nodes.get_mut(table_name) {
            Some(Node::Table { children, .. }) => {
                if children[slot as usize].is_some() {
                    return Err(Error::Conflict { path: format!("{table_name}[{slot}]") });
                }
                children[slot as usize] = Some(child_name.to_string());
                Ok(())
            }
            _ => unreachable!("set_child always targets a table node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_a_single_path() {
        let mut trie = Trie::new(&["root"]);
        trie.add_opcode("root", &[(TableKind::Root, 0), (TableKind::Table256, 0x90)], [0, 0, 0], "NOP")
            .unwrap();
        let root_children = match &trie.nodes["root"] {
            Node::Table { children, .. } => children,
            _ => panic!(),
        };
        assert!(root_children[0].is_some());
    }

    #[test]
    fn duplicate_terminal_insertion_is_a_conflict() {
        let mut trie = Trie::new(&["root"]);
        let path = [(TableKind::Root, 0), (TableKind::Table256, 0x90)];
        trie.add_opcode("root", &path, [0, 0, 0], "ADD").unwrap();
        let err = trie.add_opcode("root", &path, [1, 0, 0], "SUB").unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn kind_mismatch_at_a_shared_node_is_a_conflict() {
        let mut trie = Trie::new(&["root"]);
        trie.add_opcode(
            "root",
            &[(TableKind::Root, 0), (TableKind::Table256, 0x81), (TableKind::Table8, 0)],
            [0, 0, 0],
            "ADD",
        )
        .unwrap();
        let err = trie
            .add_opcode(
                "root",
                &[(TableKind::Root, 0), (TableKind::Table256, 0x81), (TableKind::Table72, 0)],
                [1, 0, 0],
                "SUB",
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }
}
