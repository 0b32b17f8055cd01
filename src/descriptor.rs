// Instruction Descriptor Encoder
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
// Packs one logical instruction descriptor (mnemonic, encoding form,
// operand kinds, flags) into the 48-bit physical record consumed by the
// runtime decoder: three little-endian 16-bit words plus a separate
// mnemonic tag. The bit layout and the encoding-form table are both
// transcribed field-for-field from the reference decoder generator this
// catalog format is compatible with; nothing here is guessed.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::operand::OperandKind;

/// A boolean flag a catalog line may carry after the mnemonic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Flag {
    Def64,
    Size8,
    InstrWidth,
    Lock,
    Vsib,
    Imm8,
    Only32,
    Only64,
}

impl Flag {
    pub fn lookup(name: &str) -> Option<Flag> {
        use Flag::*;
        Some(match name {
            "DEF64" => Def64,
            "SIZE_8" => Size8,
            "INSTR_WIDTH" => InstrWidth,
            "LOCK" => Lock,
            "VSIB" => Vsib,
            "IMM_8" => Imm8,
            "ONLY32" => Only32,
            "ONLY64" => Only64,
            _ => return None,
        })
    }
}

/// The bit-struct fields of §3, held as plain integers and packed by
/// explicit shift/mask in `to_words`. `*_idx` fields already carry the
/// XOR-3-encoded value (0 means "slot not used").
#[derive(Clone, Copy, Default, Debug)]
struct InstrFlags {
    modrm_idx: u16,
    modreg_idx: u16,
    vexreg_idx: u16,
    zeroreg_idx: u16,
    imm_idx: u16,
    zeroreg_val: u16,
    lock: u16,
    imm_control: u16,
    vsib: u16,
    op_size: [u16; 4],
    size8: u16,
    sized64: u16,
    size_fix1: u16,
    size_fix2: u16,
    instr_width: u16,
    op_regty: [u16; 3],
}

impl InstrFlags {
    fn to_words(&self) -> [u16; 3] {
        let mut bits: u64 = 0;
        let mut pos = 0u32;
        let mut put = |value: u16, width: u32| {
            bits |= (value as u64 & ((1u64 << width) - 1)) << pos;
            pos += width;
        };
        put(self.modrm_idx, 2);
        put(self.modreg_idx, 2);
        put(self.vexreg_idx, 2);
        put(self.zeroreg_idx, 2);
        put(self.imm_idx, 2);
        put(self.zeroreg_val, 1);
        put(self.lock, 1);
        put(self.imm_control, 3);
        put(self.vsib, 1);
        put(self.op_size[0], 2);
        put(self.op_size[1], 2);
        put(self.op_size[2], 2);
        put(self.op_size[3], 2);
        put(self.size8, 1);
        put(self.sized64, 1);
        put(self.size_fix1, 3);
        put(self.size_fix2, 2);
        put(self.instr_width, 1);
        put(self.op_regty[0], 3);
        put(self.op_regty[1], 3);
        put(self.op_regty[2], 3);
        put(0, 7); // _unused
        debug_assert_eq!(pos, 48);
        [
            (bits & 0xffff) as u16,
            ((bits >> 16) & 0xffff) as u16,
            ((bits >> 32) & 0xffff) as u16,
        ]
    }
}

/// One of the closed set of encoding forms naming which operand slot is
/// encoded where in the instruction stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EncodingForm {
    Np, M, M1, Mi, Mc, Mr, Rm, Rma, Mri, Rmi, Mrc, I, Ia, O, Oi, Oa, Ao, A,
    D, Fd, Td, Rvm, Rvmi, Rvmr, Rmv, Vm, Vmi, Mvr,
}

macro_rules! encoding_forms {
    { $( $variant:ident = $name:literal { $($field:ident : $val:expr),* $(,)? } ; )* } => {
        impl EncodingForm {
            pub fn lookup(name: &str) -> Option<EncodingForm> {
                match name {
                    $( $name => Some(EncodingForm::$variant), )*
                    _ => None,
                }
            }

            fn base_flags(self) -> InstrFlags {
                match self {
                    $( EncodingForm::$variant => InstrFlags { $($field: $val,)* ..Default::default() }, )*
                }
            }
        }
    };
}

// Values below are the XOR-3-encoded slot indices and imm_control codes
// exactly as specified for each form; see module docs.
encoding_forms! {
    Np   = "NP"   { };
    M    = "M"    { modrm_idx: 3 };
    M1   = "M1"   { modrm_idx: 3, imm_idx: 2, imm_control: 1 };
    Mi   = "MI"   { modrm_idx: 3, imm_idx: 2, imm_control: 4 };
    Mc   = "MC"   { modrm_idx: 3, zeroreg_idx: 2, zeroreg_val: 1 };
    Mr   = "MR"   { modrm_idx: 3, modreg_idx: 2 };
    Rm   = "RM"   { modrm_idx: 2, modreg_idx: 3 };
    Rma  = "RMA"  { modrm_idx: 2, modreg_idx: 3, zeroreg_idx: 1 };
    Mri  = "MRI"  { modrm_idx: 3, modreg_idx: 2, imm_idx: 1, imm_control: 4 };
    Rmi  = "RMI"  { modrm_idx: 2, modreg_idx: 3, imm_idx: 1, imm_control: 4 };
    Mrc  = "MRC"  { modrm_idx: 3, modreg_idx: 2, zeroreg_idx: 1, zeroreg_val: 1 };
    I    = "I"    { imm_idx: 3, imm_control: 4 };
    Ia   = "IA"   { zeroreg_idx: 3, imm_idx: 2, imm_control: 4 };
    O    = "O"    { modreg_idx: 3 };
    Oi   = "OI"   { modreg_idx: 3, imm_idx: 2, imm_control: 4 };
    Oa   = "OA"   { modreg_idx: 3, zeroreg_idx: 2 };
    Ao   = "AO"   { modreg_idx: 2, zeroreg_idx: 3 };
    A    = "A"    { zeroreg_idx: 3 };
    D    = "D"    { imm_idx: 3, imm_control: 6 };
    Fd   = "FD"   { zeroreg_idx: 3, imm_idx: 2, imm_control: 2 };
    Td   = "TD"   { zeroreg_idx: 2, imm_idx: 3, imm_control: 2 };
    Rvm  = "RVM"  { modrm_idx: 1, modreg_idx: 3, vexreg_idx: 2 };
    Rvmi = "RVMI" { modrm_idx: 1, modreg_idx: 3, vexreg_idx: 2, imm_idx: 0, imm_control: 4 };
    Rvmr = "RVMR" { modrm_idx: 1, modreg_idx: 3, vexreg_idx: 2, imm_idx: 0, imm_control: 3 };
    Rmv  = "RMV"  { modrm_idx: 2, modreg_idx: 3, vexreg_idx: 1 };
    Vm   = "VM"   { modrm_idx: 2, vexreg_idx: 3 };
    Vmi  = "VMI"  { modrm_idx: 2, vexreg_idx: 3, imm_idx: 1, imm_control: 4 };
    Mvr  = "MVR"  { modrm_idx: 3, modreg_idx: 1, vexreg_idx: 2 };
}

/// The logical instruction descriptor parsed from one catalog line.
#[derive(Clone, Debug)]
pub struct InstrDesc {
    pub mnemonic: String,
    pub encoding: EncodingForm,
    pub operands: Vec<OperandKind>,
    pub flags: HashSet<Flag>,
}

impl InstrDesc {
    /// Encodes this descriptor to its three little-endian 16-bit words.
    /// Does not resolve the mnemonic to its string-pool tag; callers
    /// combine the returned words with a tag assigned later (§4.4).
    pub fn encode(&self) -> Result<[u16; 3]> {
        let mut flags = self.encoding.base_flags();

        let err = |reason: &str| Error::Encoding {
            mnemonic: self.mnemonic.clone(),
            reason: reason.to_string(),
        };

        // Step 2: partition operand sizes into fixed/symbolic, order fixed
        // sizes so that one in 1..=4 comes second.
        let mut distinct: Vec<i8> = self
            .operands
            .iter()
            .map(|op| op.size_code())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        distinct.sort_unstable();
        let mut fixed: Vec<i8> = distinct.iter().copied().filter(|&c| c >= 0).collect();
        fixed.sort_by_key(|&c| (1..=4).contains(&c));
        if fixed.len() > 2 || (fixed.len() == 2 && !(1..=4).contains(&fixed[1])) {
            return Err(err(&format!("invalid fixed operand sizes: {fixed:?}")));
        }
        while fixed.len() < 2 {
            fixed.push(1);
        }
        let size_slots = [fixed[0], fixed[1], -2, -3];
        flags.size_fix1 = fixed[0] as u16;
        flags.size_fix2 = (fixed[1] - 1) as u16;

        // Step 2 (cont'd) + step 3: per-operand size slot and register type.
        for (i, op) in self.operands.iter().enumerate() {
            let code = op.size_code();
            let slot = size_slots
                .iter()
                .position(|&c| c == code)
                .ok_or_else(|| err(&format!("size code {code} has no slot")))?;
            if i < 4 {
                flags.op_size[i] = slot as u16;
            }
            let regty = op.register_type();
            if i < 3 {
                flags.op_regty[i] = regty as u16;
            } else if !(regty == 7 || regty == 2) {
                return Err(err("fourth operand must be XMM or non-register kind"));
            }
        }

        // Step 4: miscellaneous flags.
        if self.flags.contains(&Flag::Def64) {
            flags.sized64 = 1;
        }
        if self.flags.contains(&Flag::Size8) {
            flags.size8 = 1;
        }
        if self.flags.contains(&Flag::InstrWidth) {
            flags.instr_width = 1;
        }
        if self.flags.contains(&Flag::Lock) {
            flags.lock = 1;
        }
        if self.flags.contains(&Flag::Vsib) {
            flags.vsib = 1;
        }

        // Step 5: immediate width refinement.
        if flags.imm_control >= 4 {
            let imm_op = self
                .operands
                .iter()
                .find(|op| op.category == crate::operand::Category::Imm)
                .ok_or_else(|| err("imm_control set but no IMM-category operand present"))?;
            let one_byte = matches!(imm_op.size, crate::operand::Size::Bytes(1))
                || self.flags.contains(&Flag::Imm8)
                || (matches!(imm_op.size, crate::operand::Size::Operand) && flags.size8 == 1);
            if one_byte {
                flags.imm_control |= 1;
            }
        }

        Ok(flags.to_words())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::lookup;
    use quickcheck_macros::quickcheck;

    fn desc(encoding: &str, ops: &[&str], mnemonic: &str, flags: &[&str]) -> InstrDesc {
        InstrDesc {
            mnemonic: mnemonic.to_string(),
            encoding: EncodingForm::lookup(encoding).unwrap(),
            operands: ops.iter().map(|o| lookup(o).unwrap()).collect(),
            flags: flags.iter().map(|f| Flag::lookup(f).unwrap()).collect(),
        }
    }

    #[quickcheck]
    fn encoding_is_deterministic(seed: u8) -> bool {
        let combos: &[(&str, &[&str], &[&str])] = &[
            ("NP", &[], &[]),
            ("M", &["GP"], &[]),
            ("MI", &["GP", "IMM32"], &["LOCK"]),
            ("RM", &["GP", "MEM"], &[]),
            ("RVM", &["GP", "GP", "GP"], &[]),
            ("I", &["IMM8"], &["IMM_8"]),
            ("MR", &["GP8", "GP16", "GP32"], &[]), // deliberately invalid
        ];
        let (encoding, ops, flags) = combos[seed as usize % combos.len()];
        let d = desc(encoding, ops, "X", flags);
        match (d.encode(), d.encode()) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => true,
            _ => false,
        }
    }

    #[test]
    fn nop_zeroes_every_idx_field() {
        let words = desc("NP", &[], "NOP", &[]).encode().unwrap();
        // All of modrm/modreg/vexreg/zeroreg/imm idx, zeroreg_val, lock,
        // imm_control and vsib live in the low 16 bits and must be zero;
        // size_fix1 still defaults to 1 per the size-slot padding rule.
        assert_eq!(words[0], 0);
        assert_eq!(words, [0, 0x0400, 0]);
    }

    #[test]
    fn mi_with_lock_sets_modrm_and_imm_and_lock() {
        let d = desc("MI", &["GP", "IMM32"], "ADD", &["LOCK"]);
        let words = d.encode().unwrap();
        // word0 low bits: modrm_idx(2)=3, modreg_idx(2)=0, vexreg_idx(2)=0,
        // zeroreg_idx(2)=0, imm_idx(2)=2 -> 0b10_00_00_00_11 = 0x203
        assert_eq!(words[0] & 0x3ff, 0b10_00_00_00_11);
        // lock bit is bit 11 of word0 (10 idx bits, then zeroreg_val, then lock)
        assert_eq!((words[0] >> 11) & 1, 1);
    }

    #[test]
    fn invalid_fourth_operand_regty_is_rejected() {
        let d = desc("RVMI", &["GP", "GP", "GP", "GP8"], "VFOO", &[]);
        assert!(d.encode().is_err());
    }

    #[test]
    fn more_than_two_fixed_sizes_is_rejected() {
        let d = desc("MR", &["GP8", "GP16", "GP32"], "BAD", &[]);
        assert!(d.encode().is_err());
    }

    #[test]
    fn imm8_flag_sets_low_bit_of_imm_control() {
        let with_flag = desc("I", &["IMM"], "FOO", &["IMM_8"]).encode().unwrap();
        let without = desc("I", &["IMM32"], "FOO", &[]).encode().unwrap();
        // imm_control sits right after the 10 idx-ish bits + zeroreg_val + lock.
        let ctrl = |w: u16| (w >> 12) & 0b111;
        assert_eq!(ctrl(with_flag[0]) & 1, 1);
        assert_eq!(ctrl(without[0]) & 1, 0);
    }
}
