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

//! Contract between a session and the engine that decodes instructions.

#[cfg(feature = "capstone")]
pub mod capstone;

use crate::emit::{AssemblyEmit, MicroOpEmit};
use crate::error::Result;
use crate::image::LoadImage;

/// An instruction-decoding engine.
///
/// Each call handles exactly one instruction at `address` and returns its
/// length in bytes. The session rejects lengths `<= 0`, and for a given
/// address the lengths returned by the two decode calls must agree.
pub trait Decoder {
    fn instruction_length(&mut self, image: &dyn LoadImage, address: u64) -> Result<i64>;

    /// Emit the assembly text of the instruction at `address` (one call to `sink`).
    fn decode_assembly(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn AssemblyEmit,
    ) -> Result<i64>;

    /// Emit the micro-ops of the instruction at `address`, in order.
    fn decode_micro_ops(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn MicroOpEmit,
    ) -> Result<i64>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn instruction_length(&mut self, image: &dyn LoadImage, address: u64) -> Result<i64> {
        (**self).instruction_length(image, address)
    }

    fn decode_assembly(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn AssemblyEmit,
    ) -> Result<i64> {
        (**self).decode_assembly(image, address, sink)
    }

    fn decode_micro_ops(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn MicroOpEmit,
    ) -> Result<i64> {
        (**self).decode_micro_ops(image, address, sink)
    }
}
