// Operand Kinds
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
// An OperandKind pairs a size code with a register/memory category, per
// the closed vocabulary the catalog's operand columns draw from. Concrete
// byte widths and the two symbolic widths (operand-size-governed,
// vector-width-governed) share one `Size` type so that downstream code
// (the descriptor encoder) can normalise either uniformly.

/// The width of an operand, either a concrete byte count or one of the
/// two sizes resolved at decode time from instruction context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Size {
    Bytes(u8),
    /// Governed by the operand-size prefix / default (`SZ_OP`).
    Operand,
    /// Governed by VEX.L (`SZ_VEC`).
    Vector,
}

/// The register/memory family an operand belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Category {
    Gp,
    Fpu,
    Xmm,
    Mask,
    Mmx,
    Bnd,
    Seg,
    Cr,
    Dr,
    Mem,
    Imm,
}

/// One entry of the fixed operand-kind dictionary, e.g. `GP32`, `MEM`, `IMM8`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OperandKind {
    pub size: Size,
    pub category: Category,
}

macro_rules! operand_kinds {
    { $( $name:ident : $size:expr, $cat:ident ; )* } => {
        /// Looks up a named operand kind as it appears in a catalog line
        /// (e.g. `"GP32"`, `"MEM"`, `"IMM8"`). Returns `None` for unknown names.
        pub fn lookup(name: &str) -> Option<OperandKind> {
            match name {
                $( stringify!($name) => Some(OperandKind { size: $size, category: Category::$cat }), )*
                _ => None,
            }
        }
    };
}

use Category::*;
use Size::{Bytes, Operand, Vector};

operand_kinds! {
    IMM:    Operand,   Imm;
    IMM8:   Bytes(1),  Imm;
    IMM16:  Bytes(2),  Imm;
    IMM32:  Bytes(4),  Imm;
    GP:     Operand,   Gp;
    GP8:    Bytes(1),  Gp;
    GP16:   Bytes(2),  Gp;
    GP32:   Bytes(4),  Gp;
    GP64:   Bytes(8),  Gp;
    MMX:    Bytes(8),  Mmx;
    XMM:    Vector,    Xmm;
    XMM8:   Bytes(1),  Xmm;
    XMM16:  Bytes(2),  Xmm;
    XMM32:  Bytes(4),  Xmm;
    XMM64:  Bytes(8),  Xmm;
    XMM128: Bytes(16), Xmm;
    XMM256: Bytes(32), Xmm;
    SREG:   Bytes(2),  Seg;
    FPU:    Bytes(10), Fpu;
    MEM:    Operand,   Mem;
    MEMV:   Vector,    Mem;
    MEMZ:   Bytes(0),  Mem;
    MEM8:   Bytes(1),  Mem;
    MEM16:  Bytes(2),  Mem;
    MEM32:  Bytes(4),  Mem;
    MEM64:  Bytes(8),  Mem;
    MEM128: Bytes(16), Mem;
    MASK8:  Bytes(1),  Mask;
    MASK16: Bytes(2),  Mask;
    MASK32: Bytes(4),  Mask;
    MASK64: Bytes(8),  Mask;
    BND:    Bytes(0),  Bnd;
    CR:     Bytes(0),  Cr;
    DR:     Bytes(0),  Dr;
}

impl OperandKind {
    /// Normalised size code used by the descriptor encoder: concrete
    /// widths map into `0..=6`, the two symbolic widths are negative.
    pub fn size_code(self) -> i8 {
        match self.size {
            Bytes(0) => 0,
            Bytes(1) => 1,
            Bytes(2) => 2,
            Bytes(4) => 3,
            Bytes(8) => 4,
            Bytes(16) => 5,
            Bytes(32) => 6,
            Bytes(10) => 0,
            Bytes(other) => panic!("operand kind has unsupported byte width {other}"),
            Operand => -2,
            Vector => -3,
        }
    }

    /// The 3-bit register-type code used in `op{0,1,2}_regty`, or `7` for
    /// "other" (memory, immediate, or any kind with no dedicated code).
    pub fn register_type(self) -> u8 {
        match self.category {
            Gp => 0,
            Fpu => 1,
            Xmm => 2,
            Mask => 3,
            Mmx => 4,
            Bnd => 5,
            Seg | Cr | Dr | Mem | Imm => 7,
        }
    }
}
