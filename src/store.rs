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

/// Accumulating sink: builds an address-ordered, duplicate-free instruction list
/// out of the assembly and micro-op streams a decoder emits.
///
/// The two streams arrive in any relative order and may repeat. Records are kept
/// in a `Vec` sorted by address, with insertion points found by binary search.
/// Insertion shifts the tail, which costs nothing for sequential disassembly
/// (every new record lands at the end) but is O(n) for random re-decoding.
use serde::Serialize;

use crate::emit::{AssemblyEmit, MicroOpEmit};
use crate::error::{Error, Result};
use crate::microop::MicroOp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    address: u64,
    assembly: Option<String>,
    micro_ops: Vec<MicroOp>,
}

impl Instruction {
    fn new(address: u64) -> Self {
        Self {
            address,
            assembly: None,
            micro_ops: Vec::new(),
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// `mnemonic + " " + body`, once the assembly emission has been seen.
    pub fn assembly(&self) -> Option<&str> {
        self.assembly.as_deref()
    }

    pub fn micro_ops(&self) -> &[MicroOp] {
        &self.micro_ops
    }
}

/// A second, different assembly text for an address that already had one.
/// The first text is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConflict {
    pub address: u64,
    pub kept: String,
    pub discarded: String,
}

#[derive(Debug, Default)]
pub struct InstructionStore {
    instructions: Vec<Instruction>,
    conflicts: Vec<AssemblyConflict>,
}

impl InstructionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the record at `address`, or where it would be inserted.
    fn position(&self, address: u64) -> std::result::Result<usize, usize> {
        self.instructions
            .binary_search_by_key(&address, |insn| insn.address)
    }

    fn entry(&mut self, address: u64) -> &mut Instruction {
        let index = match self.position(address) {
            Ok(index) => index,
            Err(index) => {
                self.instructions.insert(index, Instruction::new(address));
                index
            }
        };
        &mut self.instructions[index]
    }

    /// Record the assembly text for `address`. First write wins; a later,
    /// different text is reported as a conflict and dropped.
    pub fn on_assembly(&mut self, address: u64, mnemonic: &str, body: &str) {
        let text = format!("{mnemonic} {body}");
        let insn = self.entry(address);
        let kept = match insn.assembly.as_deref() {
            None => {
                insn.assembly = Some(text);
                return;
            }
            Some(existing) if existing == text => return,
            Some(existing) => existing.to_string(),
        };
        log::warn!(
            "Conflicting assembly at 0x{:x}: keeping {:?}, discarding {:?}",
            address,
            kept,
            text
        );
        self.conflicts.push(AssemblyConflict {
            address,
            kept,
            discarded: text,
        });
    }

    /// Append `op` to the record at `address` unless an equal op is already there.
    pub fn on_micro_op(&mut self, address: u64, op: MicroOp) {
        let insn = self.entry(address);
        if !insn.micro_ops.contains(&op) {
            insn.micro_ops.push(op);
        }
    }

    pub fn get(&self, index: usize) -> Result<&Instruction> {
        self.instructions.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.instructions.len(),
        })
    }

    pub fn get_by_address(&self, address: u64) -> Option<&Instruction> {
        self.position(address)
            .ok()
            .map(|index| &self.instructions[index])
    }

    /// Number of distinct addresses recorded.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn conflicts(&self) -> &[AssemblyConflict] {
        &self.conflicts
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
        self.conflicts.clear();
    }

    /// Up to `before` records preceding the record at or immediately before
    /// `target_addr`, that record itself, and up to `after` records following it.
    ///
    /// Empty when nothing is recorded at or below `target_addr`.
    pub fn window(&self, target_addr: u64, before: usize, after: usize) -> &[Instruction] {
        let at_or_below = self
            .instructions
            .partition_point(|insn| insn.address <= target_addr);
        if at_or_below == 0 {
            return &[];
        }
        let center = at_or_below - 1;
        let start = center.saturating_sub(before);
        let end = center
            .saturating_add(after)
            .saturating_add(1)
            .min(self.instructions.len());
        &self.instructions[start..end]
    }
}

impl<'a> IntoIterator for &'a InstructionStore {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl AssemblyEmit for InstructionStore {
    fn emit_assembly(&mut self, address: u64, mnemonic: &str, body: &str) {
        self.on_assembly(address, mnemonic, body);
    }
}

impl MicroOpEmit for InstructionStore {
    fn emit_micro_op(&mut self, address: u64, op: MicroOp) {
        self.on_micro_op(address, op);
    }
}
