// Opcode Pattern Parser And Path Expander
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
// Parses the compact opcode-pattern grammar (escape map, opcode byte,
// optional ModR/M extension, VEX marker, W/L constraints) into a
// canonical structured form, then expands that form into the set of
// concrete trie paths it denotes. The grammar and the expansion order are
// both transcribed from the reference decoder generator's regular
// expression and `Opcode.for_trie`; this module restates them with named
// capture groups via the `regex` crate rather than hand-rolled scanning,
// since that is the idiomatic way to express a fixed regular grammar in
// Rust.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::trie::TableKind;

/// Legacy prefix byte selecting among `NP`, `66`, `F3`, `F2`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LegacyPrefix {
    Np = 0,
    Op66 = 1,
    F3 = 2,
    F2 = 3,
}

/// Whether a `W`/`L` bit constraint is pinned to a value or "don't care".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bit {
    Zero,
    One,
    Ignored,
}

impl Bit {
    fn parse(s: &str) -> Bit {
        match s {
            "0" => Bit::Zero,
            "1" => Bit::One,
            _ => Bit::Ignored,
        }
    }

    /// The concrete values this constraint enumerates to.
    fn values(self) -> &'static [u8] {
        match self {
            Bit::Zero => &[0],
            Bit::One => &[1],
            Bit::Ignored => &[0, 1],
        }
    }
}

/// A ModR/M extension: either a `/n` reg-field selector (n in 0..=7) or a
/// `//xx` specific full ModR/M byte value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpcodeExt {
    pub is_72_kind: bool,
    pub value: u8,
}

/// One parsed opcode-pattern line, in canonical structured form.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Opcode {
    pub prefix: Option<(bool, LegacyPrefix)>, // (is_rep_prefix, index)
    pub escape: u8,                           // 0..=3
    pub opc: u8,
    pub opcext: Option<OpcodeExt>,
    pub extended: bool,
    pub vex: bool,
    pub vexl: Option<Bit>,
    pub rexw: Option<Bit>,
}

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:(?P<vex>VEX\.)?(?P<legacy>NP|66|F2|F3)\.",
            r"(?:W(?P<rexw>[01]|IG)\.)?(?:L(?P<vexl>[01]|IG)\.)?",
            r"|R(?P<repprefix>NP|F2|F3)\.)?",
            r"(?P<opcode>(?:[0-9a-f]{2})+)",
            r"(?P<modrm>//?[0-7]|//[c-f][0-9a-f])?",
            r"(?P<extended>\+)?$",
        ))
        .expect("opcode grammar is a fixed, valid regular expression")
    })
}

const ESCAPES: [&str; 4] = ["", "0f", "0f38", "0f3a"];
const LEGACY_NAMES: [&str; 4] = ["NP", "66", "F3", "F2"];

impl Opcode {
    /// Parses one opcode-pattern string, e.g. `"VEX.66.W0.L0.0f38f2"` or
    /// `"c0/0+"`. Returns a grammar error naming the pattern on mismatch.
    pub fn parse(pattern: &str) -> Result<Opcode> {
        let caps = grammar().captures(pattern).ok_or_else(|| Error::Grammar {
            path: pattern.to_string(),
            line: 0,
            reason: "opcode pattern does not match the opcode grammar".to_string(),
        })?;

        let opcode_str = &caps["opcode"];
        if opcode_str.len() % 2 != 0 {
            return Err(Error::Grammar {
                path: pattern.to_string(),
                line: 0,
                reason: "opcode byte string has an odd number of hex digits".to_string(),
            });
        }
        let escape_str = &opcode_str[..opcode_str.len() - 2];
        let escape = ESCAPES
            .iter()
            .position(|&e| e == escape_str)
            .ok_or_else(|| Error::Grammar {
                path: pattern.to_string(),
                line: 0,
                reason: format!("unknown escape prefix `{escape_str}`"),
            })? as u8;
        let opc = u8::from_str_radix(&opcode_str[opcode_str.len() - 2..], 16)
            .expect("opcode grammar guarantees two hex digits");

        let opcext = match caps.name("modrm") {
            None => None,
            Some(m) => {
                let text = m.as_str();
                let is_72_kind = text.starts_with("//");
                let digits = &text[1 + is_72_kind as usize..];
                let value = u8::from_str_radix(digits, 16).expect("grammar guarantees hex digits");
                Some(OpcodeExt { is_72_kind, value })
            }
        };

        let extended = caps.name("extended").is_some();

        let legacy = caps.name("legacy").map(|m| m.as_str());
        let repprefix = caps.name("repprefix").map(|m| m.as_str());
        let prefix = match (legacy, repprefix) {
            (Some(name), _) => Some((false, legacy_index(name))),
            (None, Some(name)) => Some((true, legacy_index(name))),
            (None, None) => None,
        };

        Ok(Opcode {
            prefix,
            escape,
            opc,
            opcext,
            extended,
            vex: caps.name("vex").is_some(),
            vexl: caps.name("vexl").map(|m| Bit::parse(m.as_str())),
            rexw: caps.name("rexw").map(|m| Bit::parse(m.as_str())),
        })
    }

    /// Expands this pattern to the list of concrete trie paths it denotes,
    /// per §4.2's Cartesian-product rule over `vexl`/`rexw`/`extended`.
    pub fn expand(&self) -> Vec<Vec<(TableKind, u8)>> {
        // Each stage is (kind, candidate bytes at this stage).
        let mut stages: Vec<(TableKind, Vec<u8>)> = Vec::new();

        stages.push((TableKind::Root, vec![self.escape | ((self.vex as u8) << 2)]));
        stages.push((TableKind::Table256, vec![self.opc]));

        if let Some(ext) = self.opcext {
            let kind = if ext.is_72_kind {
                TableKind::Table72
            } else {
                TableKind::Table8
            };
            let value = if ext.is_72_kind && ext.value >= 0xc0 {
                ext.value - 0xb8
            } else {
                ext.value
            };
            stages.push((kind, vec![value]));
        }

        if self.extended {
            let (kind, values) = stages.last().expect("root/opc stages always present");
            let base = values[0];
            let kind = *kind;
            let expanded = (0..8u8).map(|i| base + i).collect();
            *stages.last_mut().unwrap() = (kind, expanded);
        }

        if let Some((is_rep, index)) = self.prefix {
            let kind = if is_rep {
                TableKind::TablePrefixRep
            } else {
                TableKind::TablePrefix
            };
            stages.push((kind, vec![index as u8]));
        }

        if self.vexl.is_some() || self.rexw.is_some() {
            let rexw_vals = self.rexw.unwrap_or(Bit::Ignored).values();
            let vexl_vals = self.vexl.unwrap_or(Bit::Ignored).values();
            let mut combined = Vec::with_capacity(rexw_vals.len() * vexl_vals.len());
            for &l in vexl_vals {
                for &w in rexw_vals {
                    combined.push(w | (l << 1));
                }
            }
            stages.push((TableKind::TableVex, combined));
        }

        // Cartesian product across all multi-valued stages.
        let mut paths: Vec<Vec<(TableKind, u8)>> = vec![Vec::new()];
        for (kind, values) in &stages {
            let mut next = Vec::with_capacity(paths.len() * values.len());
            for path in &paths {
                for &v in values {
                    let mut p = path.clone();
                    p.push((*kind, v));
                    next.push(p);
                }
            }
            paths = next;
        }
        paths
    }
}

fn legacy_index(name: &str) -> LegacyPrefix {
    match LEGACY_NAMES.iter().position(|&n| n == name).unwrap() {
        0 => LegacyPrefix::Np,
        1 => LegacyPrefix::Op66,
        2 => LegacyPrefix::F3,
        3 => LegacyPrefix::F2,
        _ => unreachable!(),
    }
}

/// Re-formats a parsed pattern back to its canonical textual form, used
/// by the round-trip property test and by conflict-error messages.
pub fn format(path: &[(TableKind, u8)]) -> String {
    let mut prefix = String::new();
    let mut body = String::new();
    for &(kind, byte) in path {
        match kind {
            TableKind::Root => {
                body.push_str(ESCAPES[(byte & 3) as usize]);
                if byte >> 2 == 1 {
                    prefix.insert_str(0, "VEX.");
                }
            }
            TableKind::Table256 => body.push_str(&format!("{byte:02x}")),
            TableKind::Table8 | TableKind::Table72 => body.push_str(&format!("/{byte:x}")),
            TableKind::TablePrefix => {
                if byte & 4 != 0 {
                    prefix.push_str("VEX.");
                }
                prefix.push_str(&format!("{}.", LEGACY_NAMES[(byte & 3) as usize]));
            }
            TableKind::TablePrefixRep => {
                prefix.push_str(&format!("R{}.", ["NP", "??", "F3", "F2"][(byte & 3) as usize]));
            }
            TableKind::TableVex => {
                prefix.push_str(&format!("W{}.L{}.", byte & 1, byte >> 1));
            }
            TableKind::Instr => unreachable!("INSTR never appears mid-path"),
        }
    }
    format!("{prefix}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn plain_byte_pattern_expands_to_one_two_level_path(opc: u8) -> bool {
        let pattern = format!("{opc:02x}");
        let op = Opcode::parse(&pattern).expect("two hex digits always parse");
        let paths = op.expand();
        paths.len() == 1
            && paths[0] == vec![(TableKind::Root, 0), (TableKind::Table256, opc)]
    }

    #[quickcheck]
    fn round_trip_is_stable_for_any_plain_opcode_byte(opc: u8) -> bool {
        let pattern = format!("{opc:02x}");
        let op = Opcode::parse(&pattern).unwrap();
        let path = &op.expand()[0];
        let formatted = format(path);
        let reparsed = Opcode::parse(&formatted).unwrap();
        reparsed.expand()[0] == *path
    }

    #[test]
    fn parses_nop_style_pattern() {
        let op = Opcode::parse("90").unwrap();
        assert_eq!(op.escape, 0);
        assert_eq!(op.opc, 0x90);
        assert!(op.opcext.is_none());
        assert!(!op.vex);
    }

    #[test]
    fn parses_modrm_extension() {
        let op = Opcode::parse("81/0").unwrap();
        assert_eq!(op.opc, 0x81);
        assert_eq!(op.opcext, Some(OpcodeExt { is_72_kind: false, value: 0 }));
    }

    #[test]
    fn parses_escape_0f38() {
        let op = Opcode::parse("0f38f0").unwrap();
        assert_eq!(op.escape, 2);
        assert_eq!(op.opc, 0xf0);
    }

    #[test]
    fn parses_vex_form_with_w_and_l() {
        let op = Opcode::parse("VEX.66.W0.L0.0f38f2").unwrap();
        assert!(op.vex);
        assert_eq!(op.rexw, Some(Bit::Zero));
        assert_eq!(op.vexl, Some(Bit::Zero));
        let paths = op.expand();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn extended_range_remaps_into_72_slot_table() {
        let op = Opcode::parse("c0//c0+").unwrap();
        let paths = op.expand();
        assert_eq!(paths.len(), 8);
        let firsts: Vec<u8> = paths.iter().map(|p| p.last().unwrap().1).collect();
        assert_eq!(firsts, (8..16).collect::<Vec<_>>());
    }

    #[test]
    fn extended_on_a_slash_n_form_fills_the_whole_table8() {
        let op = Opcode::parse("c0/0+").unwrap();
        let paths = op.expand();
        assert_eq!(paths.len(), 8);
        for (i, path) in paths.iter().enumerate() {
            let last = path.last().unwrap();
            assert_eq!(last.0, TableKind::Table8);
            assert_eq!(last.1, i as u8);
        }
    }

    #[test]
    fn ig_on_both_w_and_l_multiplies_by_four() {
        let op = Opcode::parse("VEX.66.WIG.LIG.0f10").unwrap();
        assert_eq!(op.expand().len(), 4);
    }

    #[test]
    fn every_path_starts_with_root_then_table256() {
        for pattern in ["90", "81/0", "0f38f0", "VEX.66.W0.L0.0f38f2", "c0/0+"] {
            let op = Opcode::parse(pattern).unwrap();
            for path in op.expand() {
                assert!(path.len() >= 2 && path.len() <= 5);
                assert_eq!(path[0].0, TableKind::Root);
                assert_eq!(path[1].0, TableKind::Table256);
            }
        }
    }

    #[test]
    fn round_trip_preserves_canonical_form() {
        for pattern in ["90", "81/0", "0f38f0"] {
            let op = Opcode::parse(pattern).unwrap();
            let path = &op.expand()[0];
            let formatted = format(path);
            let reparsed = Opcode::parse(&formatted).unwrap();
            assert_eq!(reparsed.expand()[0], *path);
        }
    }
}
