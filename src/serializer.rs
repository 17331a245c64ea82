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

use serde_json::json;
use serde_json::Value;

use crate::store::InstructionStore;

/// Serialize an `InstructionStore` into a compact JSON message.
/// Format:
/// {
///   "t": "disasm_chunk",
///   "id": <seq id>,
///   "start": "0x...",
///   "final": bool,
///   "lines": [ [addr_hex, assembly, [micro_op, ...]], ... ]
/// }
/// Addresses are hex strings so JavaScript readers keep full 64-bit precision.
/// Missing assembly is `null`; micro-ops are rendered as text.
pub fn serialize_compact_listing(store: &InstructionStore, seq_id: u64, final_chunk: bool) -> Value {
    let mut lines: Vec<Value> = Vec::with_capacity(store.len());
    for insn in store {
        let addr_hex = format!("0x{:x}", insn.address());
        let ops: Vec<String> = insn.micro_ops().iter().map(|op| op.to_string()).collect();
        lines.push(json!([addr_hex, insn.assembly(), ops]));
    }

    let start = store
        .iter()
        .next()
        .map(|insn| format!("0x{:x}", insn.address()))
        .unwrap_or_else(|| "0x0".to_string());

    json!({
        "t": "disasm_chunk",
        "id": seq_id,
        "start": start,
        "final": final_chunk,
        "lines": Value::Array(lines),
    })
}
