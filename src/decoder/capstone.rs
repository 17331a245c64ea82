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

use ::capstone::arch::x86::{X86Operand, X86OperandType};
use ::capstone::prelude::*;
use ::capstone::{Insn, Instructions};

use super::Decoder;
use crate::emit::{AssemblyEmit, MicroOpEmit};
use crate::error::{Error, Result};
use crate::image::LoadImage;
use crate::microop::{AddrSpace, MicroOp, OpCode, Varnode};
use crate::session::ArchProfile;

/// Longest legal x86 encoding.
const MAX_INSN_BYTES: usize = 15;

/// x86 decoder backed by capstone.
///
/// Capstone has no intermediate representation, so each instruction yields a
/// single coarse micro-op: the control-flow kind taken from the instruction
/// groups (anything that is not a jump, call or return becomes `CALLOTHER`)
/// applied to the explicit operands.
pub struct CapstoneDecoder {
    cs: Capstone,
    profile: ArchProfile,
}

impl CapstoneDecoder {
    pub fn new(profile: ArchProfile) -> std::result::Result<Self, ::capstone::Error> {
        let mode = match profile {
            ArchProfile::Ia32 => arch::x86::ArchMode::Mode32,
            ArchProfile::Amd64 => arch::x86::ArchMode::Mode64,
        };
        let cs = Capstone::new()
            .x86()
            .mode(mode)
            .syntax(arch::x86::ArchSyntax::Intel)
            .detail(true) // Operands and groups feed the micro-op
            .build()?;

        Ok(Self { cs, profile })
    }

    pub fn profile(&self) -> ArchProfile {
        self.profile
    }

    /// Decode exactly one instruction at `address`.
    fn disasm_one(&self, image: &dyn LoadImage, address: u64) -> Result<Instructions<'_>> {
        let mut code = [0u8; MAX_INSN_BYTES];
        image.load_fill(&mut code, address);
        let insns = self
            .cs
            .disasm_count(&code, address, 1)
            .map_err(|e| Error::decode(address, format!("capstone: {e}")))?;
        if insns.as_ref().is_empty() {
            return Err(Error::decode(address, "invalid instruction encoding"));
        }
        Ok(insns)
    }

    fn operand_varnode(&self, op: &X86Operand) -> Option<Varnode> {
        let size = u32::from(op.size);
        match &op.op_type {
            X86OperandType::Reg(reg) => Some(Varnode::register(
                u64::from(reg.0),
                size,
                self.cs.reg_name(*reg).unwrap_or_default(),
            )),
            X86OperandType::Imm(value) => Some(Varnode::constant(*value as u64, size)),
            X86OperandType::Mem(mem) => Some(Varnode::ram(mem.disp() as u64, size)),
            _ => None,
        }
    }

    fn micro_op(&self, insn: &Insn<'_>) -> Result<MicroOp> {
        let address = insn.address();
        let detail = self
            .cs
            .insn_detail(insn)
            .map_err(|e| Error::decode(address, format!("capstone detail: {e}")))?;

        let groups: Vec<String> = detail
            .groups()
            .iter()
            .filter_map(|group| self.cs.group_name(*group))
            .collect();
        let in_group = |name: &str| groups.iter().any(|g| g == name);

        let mut inputs: Vec<Varnode> = detail
            .arch_detail()
            .x86()
            .map(|x86| {
                x86.operands()
                    .filter_map(|op| self.operand_varnode(&op))
                    .collect()
            })
            .unwrap_or_default();

        let direct = inputs
            .first()
            .is_some_and(|target| target.space == AddrSpace::Const);
        let opcode = if in_group("ret") || in_group("iret") {
            OpCode::Return
        } else if in_group("call") {
            if direct {
                OpCode::Call
            } else {
                OpCode::CallInd
            }
        } else if in_group("jump") {
            match (direct, insn.mnemonic()) {
                (false, _) => OpCode::BranchInd,
                (true, Some("jmp")) => OpCode::Branch,
                (true, _) => OpCode::CBranch,
            }
        } else {
            OpCode::CallOther
        };

        // Direct branch targets are code addresses, not constants
        if direct && matches!(opcode, OpCode::Call | OpCode::Branch | OpCode::CBranch) {
            let target = &mut inputs[0];
            target.space = AddrSpace::Ram;
        }

        Ok(MicroOp::new(opcode, None, inputs))
    }
}

impl Decoder for CapstoneDecoder {
    fn instruction_length(&mut self, image: &dyn LoadImage, address: u64) -> Result<i64> {
        let insns = self.disasm_one(image, address)?;
        Ok(insns.as_ref()[0].len() as i64)
    }

    fn decode_assembly(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn AssemblyEmit,
    ) -> Result<i64> {
        let insns = self.disasm_one(image, address)?;
        let insn = &insns.as_ref()[0];
        sink.emit_assembly(
            address,
            insn.mnemonic().unwrap_or(""),
            insn.op_str().unwrap_or(""),
        );
        Ok(insn.len() as i64)
    }

    fn decode_micro_ops(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn MicroOpEmit,
    ) -> Result<i64> {
        let insns = self.disasm_one(image, address)?;
        let insn = &insns.as_ref()[0];
        sink.emit_micro_op(address, self.micro_op(insn)?);
        Ok(insn.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::MemoryWindow;
    use crate::store::InstructionStore;

    fn decode(profile: ArchProfile, base: u64, bytes: &[u8]) -> (i64, InstructionStore) {
        let image = MemoryWindow::new(base, bytes.to_vec());
        let mut dec = CapstoneDecoder::new(profile).expect("capstone init");
        let mut store = InstructionStore::new();
        let len = dec.decode_assembly(&image, base, &mut store).unwrap();
        let ops_len = dec.decode_micro_ops(&image, base, &mut store).unwrap();
        assert_eq!(len, ops_len);
        (len, store)
    }

    #[test]
    fn nop_and_ret_are_one_byte() {
        let image = MemoryWindow::new(0x1000, vec![0x90, 0x90, 0xC3, 0x00]);
        let mut dec = CapstoneDecoder::new(ArchProfile::Ia32).unwrap();
        assert_eq!(dec.instruction_length(&image, 0x1000).unwrap(), 1);
        assert_eq!(dec.instruction_length(&image, 0x1002).unwrap(), 1);
    }

    #[test]
    fn ret_becomes_return() {
        let (len, store) = decode(ArchProfile::Ia32, 0x1000, &[0xC3]);
        assert_eq!(len, 1);
        let insn = store.get(0).unwrap();
        assert_eq!(insn.assembly(), Some("ret "));
        assert_eq!(insn.micro_ops()[0].opcode, OpCode::Return);
    }

    #[test]
    fn direct_call_targets_ram() {
        // call 0x1005
        let (len, store) = decode(ArchProfile::Ia32, 0x1000, &[0xE8, 0, 0, 0, 0]);
        assert_eq!(len, 5);
        let op = &store.get(0).unwrap().micro_ops()[0];
        assert_eq!(op.opcode, OpCode::Call);
        assert_eq!(op.inputs[0].space, AddrSpace::Ram);
        assert_eq!(op.inputs[0].offset, 0x1005);
    }

    #[test]
    fn jumps_are_classified() {
        let (_, store) = decode(ArchProfile::Ia32, 0x2000, &[0xEB, 0xFE]);
        assert_eq!(store.get(0).unwrap().micro_ops()[0].opcode, OpCode::Branch);

        let (_, store) = decode(ArchProfile::Ia32, 0x2000, &[0x74, 0x00]);
        assert_eq!(store.get(0).unwrap().micro_ops()[0].opcode, OpCode::CBranch);

        let (_, store) = decode(ArchProfile::Ia32, 0x2000, &[0xFF, 0xE0]);
        let op = &store.get(0).unwrap().micro_ops()[0];
        assert_eq!(op.opcode, OpCode::BranchInd);
        assert_eq!(op.inputs[0].space, AddrSpace::Register);
    }

    #[test]
    fn register_operands_carry_names() {
        // mov rax, rbx
        let (len, store) = decode(ArchProfile::Amd64, 0, &[0x48, 0x89, 0xD8]);
        assert_eq!(len, 3);
        let op = &store.get(0).unwrap().micro_ops()[0];
        assert_eq!(op.opcode, OpCode::CallOther);
        let names: Vec<_> = op.inputs.iter().filter_map(|v| v.name.as_deref()).collect();
        assert_eq!(names, vec!["rax", "rbx"]);
    }
}
