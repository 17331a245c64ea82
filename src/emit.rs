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

//! Emission sinks: where a decoder writes what it decoded.

use std::io::{self, Write};

use crate::microop::MicroOp;
use crate::store::Instruction;

/// Receives the assembly text of a decoded instruction.
pub trait AssemblyEmit {
    fn emit_assembly(&mut self, address: u64, mnemonic: &str, body: &str);
}

/// Receives the micro-ops of a decoded instruction, one call per op.
pub trait MicroOpEmit {
    fn emit_micro_op(&mut self, address: u64, op: MicroOp);
}

/// A sink that takes both streams.
pub trait Emit: AssemblyEmit + MicroOpEmit {}

impl<T: AssemblyEmit + MicroOpEmit> Emit for T {}

/// Pass-through sink: prints every emission as it arrives.
///
/// Write failures are logged and otherwise ignored; printing is best effort.
pub struct PrintEmit<W: Write> {
    out: W,
}

impl PrintEmit<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> PrintEmit<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> AssemblyEmit for PrintEmit<W> {
    fn emit_assembly(&mut self, address: u64, mnemonic: &str, body: &str) {
        if let Err(e) = writeln!(self.out, "--- 0x{address:x}: {mnemonic} {body}") {
            log::error!("Failed to print assembly for 0x{:x}: {}", address, e);
        }
    }
}

impl<W: Write> MicroOpEmit for PrintEmit<W> {
    fn emit_micro_op(&mut self, address: u64, op: MicroOp) {
        if let Err(e) = writeln!(self.out, "{op}") {
            log::error!("Failed to print micro-op for 0x{:x}: {}", address, e);
        }
    }
}

/// Print one stored instruction: address and assembly on the first line, then
/// one indented line per micro-op.
pub fn print_instruction<W: Write>(out: &mut W, insn: &Instruction) -> io::Result<()> {
    match insn.assembly() {
        Some(text) => writeln!(out, "0x{:x}: {}", insn.address(), text)?,
        None => writeln!(out, "0x{:x}: <no assembly>", insn.address())?,
    }
    for op in insn.micro_ops() {
        writeln!(out, "    {op}")?;
    }
    Ok(())
}
