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

use thiserror::Error;

/// Errors raised by a disassembly session and its instruction store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The decoder could not produce an instruction, or reported a length that
    /// would stall or reverse the cursor. Aborts the current call.
    #[error("fatal decode error at 0x{address:x}: {reason}")]
    DecodeFatal { address: u64, reason: String },

    /// Positional query past the end of the instruction store.
    #[error("instruction index {index} out of range (store holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A single step would push the iteration past its byte budget.
    #[error("byte budget of {budget} exceeded: {consumed} consumed, next instruction needs {needed}")]
    BudgetExceeded {
        budget: u64,
        consumed: u64,
        needed: u64,
    },

    /// A single step was requested at or past the end of the image.
    #[error("address 0x{address:x} is at or beyond image end 0x{end:x}")]
    OutOfRange { address: u64, end: u64 },

    /// Session configuration could not be read or parsed.
    #[error("invalid session configuration: {0}")]
    Config(String),
}

impl Error {
    /// True for the two conditions that normally end a single-step iteration.
    pub fn is_end_of_iteration(&self) -> bool {
        matches!(self, Error::BudgetExceeded { .. } | Error::OutOfRange { .. })
    }

    pub(crate) fn decode(address: u64, reason: impl Into<String>) -> Self {
        Error::DecodeFatal {
            address,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
