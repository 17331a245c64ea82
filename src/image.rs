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

/// Byte source handed to decoders.
///
/// Reads never fail: any byte outside the provider's window reads as zero.
pub trait LoadImage {
    /// Fill `buf` with the bytes starting at `address`.
    fn load_fill(&self, buf: &mut [u8], address: u64);

    /// Relocation hook for images that can move. Nothing relocates yet.
    fn adjust_vma(&mut self, _adjust: i64) {}
}

/// A flat, read-only image mapped at `[base, base + size)`.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    base: u64,
    bytes: Vec<u8>,
}

impl MemoryWindow {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// One past the last mapped address, saturating at the top of the address space.
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size())
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Owned copy of `len` bytes from `address`, zero-filled outside the window.
    pub fn read_bytes(&self, address: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.load_fill(&mut buf, address);
        buf
    }
}

impl LoadImage for MemoryWindow {
    fn load_fill(&self, buf: &mut [u8], address: u64) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = address
                .checked_add(i as u64)
                .filter(|&addr| self.contains(addr))
                .map(|addr| self.bytes[(addr - self.base) as usize])
                .unwrap_or(0);
        }
    }
}
