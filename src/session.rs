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

//! Disassembly session: walks an image one instruction at a time and hands
//! every decode to an emission sink.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decoder::Decoder;
use crate::emit::{Emit, PrintEmit};
use crate::error::{Error, Result};
use crate::image::MemoryWindow;

/// Architecture the session decodes for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArchProfile {
    #[default]
    Ia32,
    Amd64,
}

/// Fixed at session construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub arch: ArchProfile,
    pub base_address: u64,
}

impl SessionConfig {
    pub fn new(arch: ArchProfile, base_address: u64) -> Self {
        Self { arch, base_address }
    }

    /// Load a config from a JSON file such as `{"arch": "amd64", "base_address": 4096}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Granularity of offsets and amounts passed to [`Session::disassemble`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Unit {
    Byte,
    #[value(name = "insn")]
    Instruction,
}

/// Byte budget for one sequence of [`Session::disassemble_next`] calls.
///
/// Each caller-side iteration owns its own handle, so independent sequences
/// never share consumption state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    budget: u64,
    consumed: u64,
}

impl Iteration {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            consumed: 0,
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.budget - self.consumed
    }
}

pub struct Session<D: Decoder> {
    config: SessionConfig,
    image: MemoryWindow,
    decoder: D,
}

impl<D: Decoder> Session<D> {
    pub fn new(config: SessionConfig, bytes: Vec<u8>, decoder: D) -> Self {
        let image = MemoryWindow::new(config.base_address, bytes);
        log::info!(
            "Session created: arch={:?}, base=0x{:x}, size=0x{:x}",
            config.arch,
            image.base(),
            image.size()
        );
        Self {
            config,
            image,
            decoder,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn image(&self) -> &MemoryWindow {
        &self.image
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Length of the instruction at `offset` bytes past the base.
    pub fn instruction_length(&mut self, offset: u64) -> Result<u64> {
        let address = self.image.base().wrapping_add(offset);
        self.length_at(address)
    }

    /// [`Session::disassemble_with`] printing to stdout.
    pub fn disassemble(&mut self, unit: Unit, offset: u64, amount: u64) -> Result<u64> {
        self.disassemble_with(unit, offset, amount, &mut PrintEmit::stdout())
    }

    /// Decode `amount` units starting `offset` units past the image base and
    /// forward everything to `sink`.
    ///
    /// Returns the units consumed: bytes for [`Unit::Byte`], instructions for
    /// [`Unit::Instruction`]. Reaching the image end first is not an error; the
    /// count is simply short.
    pub fn disassemble_with<E: Emit>(
        &mut self,
        unit: Unit,
        offset: u64,
        amount: u64,
        sink: &mut E,
    ) -> Result<u64> {
        let end = self.image.end();
        let mut address = self.start_address(unit, offset)?;

        let mut consumed = 0;
        while consumed < amount && address < end {
            let len = self.decode_one(address, sink)?;
            consumed += match unit {
                Unit::Byte => len,
                Unit::Instruction => 1,
            };
            address = address.saturating_add(len);
        }

        log::debug!(
            "Disassembled {} {:?} unit(s) from offset {} (requested {})",
            consumed,
            unit,
            offset,
            amount
        );
        Ok(consumed)
    }

    /// [`Session::disassemble_next_with`] printing to stdout.
    pub fn disassemble_next(&mut self, iter: &mut Iteration, offset: u64) -> Result<u64> {
        self.disassemble_next_with(iter, offset, &mut PrintEmit::stdout())
    }

    /// Decode the single instruction at `offset` bytes past the base, charging
    /// its length to `iter`.
    ///
    /// Fails with [`Error::OutOfRange`] at or past the image end, and with
    /// [`Error::BudgetExceeded`] when the instruction would not fit in what is
    /// left of the budget. Neither failure emits anything or charges the budget.
    pub fn disassemble_next_with<E: Emit>(
        &mut self,
        iter: &mut Iteration,
        offset: u64,
        sink: &mut E,
    ) -> Result<u64> {
        let end = self.image.end();
        let address = self.image.base().saturating_add(offset);
        if address >= end {
            log::debug!("Step at 0x{:x} is past image end 0x{:x}", address, end);
            return Err(Error::OutOfRange { address, end });
        }

        let needed = self.length_at(address)?;
        if needed > iter.remaining() {
            log::debug!(
                "Step at 0x{:x} needs {} byte(s), budget has {} left",
                address,
                needed,
                iter.remaining()
            );
            return Err(Error::BudgetExceeded {
                budget: iter.budget,
                consumed: iter.consumed,
                needed,
            });
        }

        let len = self.decode_one(address, sink)?;
        iter.consumed += len;
        Ok(len)
    }

    /// Where a walk of `offset` units from the base begins.
    fn start_address(&mut self, unit: Unit, offset: u64) -> Result<u64> {
        let base = self.image.base();
        match unit {
            Unit::Byte => Ok(base.saturating_add(offset)),
            Unit::Instruction => {
                let end = self.image.end();
                let mut address = base;
                let mut skipped = 0;
                while skipped < offset && address < end {
                    address = address.saturating_add(self.length_at(address)?);
                    skipped += 1;
                }
                Ok(address)
            }
        }
    }

    fn length_at(&mut self, address: u64) -> Result<u64> {
        let len = self.decoder.instruction_length(&self.image, address)?;
        checked_length(address, len)
    }

    /// Decode one instruction into `sink`, assembly first, and return its length.
    fn decode_one<E: Emit>(&mut self, address: u64, sink: &mut E) -> Result<u64> {
        let asm_len = self.decoder.decode_assembly(&self.image, address, sink)?;
        let asm_len = checked_length(address, asm_len)?;
        let ops_len = self.decoder.decode_micro_ops(&self.image, address, sink)?;
        let ops_len = checked_length(address, ops_len)?;
        if asm_len != ops_len {
            return Err(Error::decode(
                address,
                format!("assembly length {asm_len} disagrees with micro-op length {ops_len}"),
            ));
        }
        log::debug!("Decoded 0x{:x} ({} bytes)", address, asm_len);
        Ok(asm_len)
    }
}

/// A length that cannot advance the cursor is fatal.
fn checked_length(address: u64, len: i64) -> Result<u64> {
    u64::try_from(len)
        .ok()
        .filter(|&len| len > 0)
        .ok_or_else(|| Error::decode(address, format!("non-positive instruction length {len}")))
}
