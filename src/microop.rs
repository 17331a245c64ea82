// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Micro-operations produced by a decoder for one machine instruction.
//!
//! The vocabulary is the p-code operation set. The session and the store never
//! look inside it; they only compare and print micro-ops.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opcodes {
    ($($variant:ident => $name:literal,)*) => {
        /// Kind of a micro-operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum OpCode {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl OpCode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Canonical upper-case name, e.g. `INT_ADD`.
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    Copy => "COPY",
    Load => "LOAD",
    Store => "STORE",
    Branch => "BRANCH",
    CBranch => "CBRANCH",
    BranchInd => "BRANCHIND",
    Call => "CALL",
    CallInd => "CALLIND",
    CallOther => "CALLOTHER",
    Return => "RETURN",
    IntEqual => "INT_EQUAL",
    IntNotEqual => "INT_NOTEQUAL",
    IntSLess => "INT_SLESS",
    IntSLessEqual => "INT_SLESSEQUAL",
    IntLess => "INT_LESS",
    IntLessEqual => "INT_LESSEQUAL",
    IntZext => "INT_ZEXT",
    IntSext => "INT_SEXT",
    IntAdd => "INT_ADD",
    IntSub => "INT_SUB",
    IntCarry => "INT_CARRY",
    IntSCarry => "INT_SCARRY",
    IntSBorrow => "INT_SBORROW",
    Int2Comp => "INT_2COMP",
    IntNegate => "INT_NEGATE",
    IntXor => "INT_XOR",
    IntAnd => "INT_AND",
    IntOr => "INT_OR",
    IntLeft => "INT_LEFT",
    IntRight => "INT_RIGHT",
    IntSRight => "INT_SRIGHT",
    IntMult => "INT_MULT",
    IntDiv => "INT_DIV",
    IntSDiv => "INT_SDIV",
    IntRem => "INT_REM",
    IntSRem => "INT_SREM",
    BoolNegate => "BOOL_NEGATE",
    BoolXor => "BOOL_XOR",
    BoolAnd => "BOOL_AND",
    BoolOr => "BOOL_OR",
    FloatEqual => "FLOAT_EQUAL",
    FloatNotEqual => "FLOAT_NOTEQUAL",
    FloatLess => "FLOAT_LESS",
    FloatLessEqual => "FLOAT_LESSEQUAL",
    FloatNan => "FLOAT_NAN",
    FloatAdd => "FLOAT_ADD",
    FloatDiv => "FLOAT_DIV",
    FloatMult => "FLOAT_MULT",
    FloatSub => "FLOAT_SUB",
    FloatNeg => "FLOAT_NEG",
    FloatAbs => "FLOAT_ABS",
    FloatSqrt => "FLOAT_SQRT",
    FloatInt2Float => "FLOAT_INT2FLOAT",
    FloatFloat2Float => "FLOAT_FLOAT2FLOAT",
    FloatTrunc => "FLOAT_TRUNC",
    FloatCeil => "FLOAT_CEIL",
    FloatFloor => "FLOAT_FLOOR",
    FloatRound => "FLOAT_ROUND",
    MultiEqual => "MULTIEQUAL",
    Indirect => "INDIRECT",
    Piece => "PIECE",
    SubPiece => "SUBPIECE",
    Cast => "CAST",
    PtrAdd => "PTRADD",
    PtrSub => "PTRSUB",
    SegmentOp => "SEGMENTOP",
    CPoolRef => "CPOOLREF",
    New => "NEW",
    Insert => "INSERT",
    Extract => "EXTRACT",
    PopCount => "POPCOUNT",
    LzCount => "LZCOUNT",
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address space a varnode lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddrSpace {
    Const,
    Unique,
    Register,
    Ram,
}

impl AddrSpace {
    pub fn name(self) -> &'static str {
        match self {
            AddrSpace::Const => "const",
            AddrSpace::Unique => "unique",
            AddrSpace::Register => "register",
            AddrSpace::Ram => "ram",
        }
    }
}

/// Operand descriptor: `size` bytes at `offset` in `space`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Varnode {
    pub space: AddrSpace,
    pub offset: u64,
    pub size: u32,
    /// Register name, when the decoder knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Varnode {
    pub fn constant(value: u64, size: u32) -> Self {
        Self {
            space: AddrSpace::Const,
            offset: value,
            size,
            name: None,
        }
    }

    pub fn ram(offset: u64, size: u32) -> Self {
        Self {
            space: AddrSpace::Ram,
            offset,
            size,
            name: None,
        }
    }

    pub fn unique(offset: u64, size: u32) -> Self {
        Self {
            space: AddrSpace::Unique,
            offset,
            size,
            name: None,
        }
    }

    pub fn register(offset: u64, size: u32, name: impl Into<String>) -> Self {
        Self {
            space: AddrSpace::Register,
            offset,
            size,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Varnode {
    /// `(space,offset,size)`, with the register name in place of the offset
    /// when one is known.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},", self.space.name())?;
        match (&self.name, self.space) {
            (Some(name), AddrSpace::Register) => f.write_str(name)?,
            _ => write!(f, "0x{:x}", self.offset)?,
        }
        write!(f, ",{})", self.size)
    }
}

/// One low-level operation of an instruction.
///
/// Two micro-ops are equal when opcode, output and inputs are all equal; the
/// instruction store relies on this to drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MicroOp {
    pub opcode: OpCode,
    pub output: Option<Varnode>,
    pub inputs: Vec<Varnode>,
}

impl MicroOp {
    pub fn new(opcode: OpCode, output: Option<Varnode>, inputs: Vec<Varnode>) -> Self {
        Self {
            opcode,
            output,
            inputs,
        }
    }
}

impl fmt::Display for MicroOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(out) = &self.output {
            write!(f, "{out} = ")?;
        }
        write!(f, "{}", self.opcode)?;
        for input in &self.inputs {
            write!(f, " {input}")?;
        }
        Ok(())
    }
}
