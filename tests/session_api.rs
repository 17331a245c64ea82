use hutch::{
    AssemblyEmit, Decoder, Error, Instruction, InstructionStore, Iteration, LoadImage, MicroOp,
    MicroOpEmit, OpCode, PrintEmit, Session, SessionConfig, Unit, Varnode,
};

/// Tiny table-driven decoder: NOP (0x90), RET (0xC3), CALL rel32 (0xE8),
/// anything else is a one-byte `DB`.
struct TableDecoder;

impl TableDecoder {
    fn lookup(image: &dyn LoadImage, address: u64) -> (i64, &'static str, String, Vec<MicroOp>) {
        let mut code = [0u8; 5];
        image.load_fill(&mut code, address);
        match code[0] {
            0x90 => (1, "NOP", String::new(), vec![]),
            0xC3 => (
                1,
                "RET",
                String::new(),
                vec![MicroOp::new(
                    OpCode::Return,
                    None,
                    vec![Varnode::register(0x20, 4, "ESP")],
                )],
            ),
            0xE8 => {
                let rel = i32::from_le_bytes([code[1], code[2], code[3], code[4]]);
                let target = (address as i64 + 5 + i64::from(rel)) as u64;
                (
                    5,
                    "CALL",
                    format!("0x{target:x}"),
                    vec![
                        MicroOp::new(
                            OpCode::IntSub,
                            Some(Varnode::register(0x20, 4, "ESP")),
                            vec![Varnode::register(0x20, 4, "ESP"), Varnode::constant(4, 4)],
                        ),
                        MicroOp::new(OpCode::Call, None, vec![Varnode::ram(target, 4)]),
                    ],
                )
            }
            other => (1, "DB", format!("0x{other:02x}"), vec![]),
        }
    }
}

impl Decoder for TableDecoder {
    fn instruction_length(&mut self, image: &dyn LoadImage, address: u64) -> hutch::Result<i64> {
        Ok(Self::lookup(image, address).0)
    }

    fn decode_assembly(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn AssemblyEmit,
    ) -> hutch::Result<i64> {
        let (len, mnemonic, body, _) = Self::lookup(image, address);
        sink.emit_assembly(address, mnemonic, &body);
        Ok(len)
    }

    fn decode_micro_ops(
        &mut self,
        image: &dyn LoadImage,
        address: u64,
        sink: &mut dyn MicroOpEmit,
    ) -> hutch::Result<i64> {
        let (len, _, _, ops) = Self::lookup(image, address);
        for op in ops {
            sink.emit_micro_op(address, op);
        }
        Ok(len)
    }
}

// nop; call +0; nop; ret
const IMAGE: [u8; 8] = [0x90, 0xE8, 0x00, 0x00, 0x00, 0x00, 0x90, 0xC3];

fn new_session() -> Session<TableDecoder> {
    Session::new(
        SessionConfig {
            base_address: 0x401000,
            ..SessionConfig::default()
        },
        IMAGE.to_vec(),
        TableDecoder,
    )
}

fn listing(store: &InstructionStore) -> Vec<(u64, Option<String>)> {
    store
        .iter()
        .map(|insn| (insn.address(), insn.assembly().map(str::to_string)))
        .collect()
}

#[test]
fn whole_image_by_instruction() {
    let mut session = new_session();
    let mut store = InstructionStore::new();
    let n = session
        .disassemble_with(Unit::Instruction, 0, 100, &mut store)
        .unwrap();
    assert_eq!(n, 4);
    assert_eq!(
        listing(&store),
        vec![
            (0x401000, Some("NOP ".to_string())),
            (0x401001, Some("CALL 0x401006".to_string())),
            (0x401006, Some("NOP ".to_string())),
            (0x401007, Some("RET ".to_string())),
        ]
    );

    let call = store.get_by_address(0x401001).unwrap();
    assert_eq!(call.micro_ops().len(), 2);
    assert_eq!(call.micro_ops()[1].opcode, OpCode::Call);
    assert!(store.get(3).is_ok());
    assert!(matches!(
        store.get(4),
        Err(Error::IndexOutOfRange { index: 4, len: 4 })
    ));
}

#[test]
fn redecoding_is_idempotent() {
    let mut session = new_session();
    let mut store = InstructionStore::new();
    session
        .disassemble_with(Unit::Byte, 0, 8, &mut store)
        .unwrap();
    let first: Vec<Instruction> = store.iter().cloned().collect();

    session
        .disassemble_with(Unit::Instruction, 1, 2, &mut store)
        .unwrap();
    let second: Vec<Instruction> = store.iter().cloned().collect();
    assert_eq!(first, second);
    assert!(store.conflicts().is_empty());
}

#[test]
fn misaligned_decode_is_merged_in_order() {
    let mut session = new_session();
    let mut store = InstructionStore::new();
    session
        .disassemble_with(Unit::Instruction, 0, 100, &mut store)
        .unwrap();
    // Start inside the CALL: its rel32 bytes decode as DB 0x00
    let n = session
        .disassemble_with(Unit::Byte, 2, 2, &mut store)
        .unwrap();
    assert_eq!(n, 2);

    let addrs: Vec<u64> = store.iter().map(Instruction::address).collect();
    assert_eq!(
        addrs,
        vec![0x401000, 0x401001, 0x401002, 0x401003, 0x401006, 0x401007]
    );
    assert_eq!(
        store.get_by_address(0x401002).unwrap().assembly(),
        Some("DB 0x00")
    );
}

#[test]
fn window_query_over_decoded_listing() {
    let mut session = new_session();
    let mut store = InstructionStore::new();
    session
        .disassemble_with(Unit::Instruction, 0, 100, &mut store)
        .unwrap();
    let window: Vec<u64> = store
        .window(0x401003, 1, 1)
        .iter()
        .map(Instruction::address)
        .collect();
    assert_eq!(window, vec![0x401000, 0x401001, 0x401006]);
}

#[test]
fn stepping_with_a_budget() {
    let mut session = new_session();
    let mut store = InstructionStore::new();
    let mut iter = Iteration::new(6);

    let mut offset = 0;
    let mut steps = Vec::new();
    let end = loop {
        match session.disassemble_next_with(&mut iter, offset, &mut store) {
            Ok(len) => {
                steps.push(len);
                offset += len;
            }
            Err(e) => break e,
        }
    };
    assert_eq!(steps, vec![1, 5]);
    assert!(matches!(end, Error::BudgetExceeded { needed: 1, .. }));
    assert_eq!(store.len(), 2);

    let mut fresh = Iteration::new(100);
    let mut offset = 6;
    while let Ok(len) = session.disassemble_next_with(&mut fresh, offset, &mut store) {
        offset += len;
    }
    assert_eq!(fresh.consumed(), 2);
    assert_eq!(store.len(), 4);
}

#[test]
fn pass_through_sink_prints_as_it_goes() {
    let mut session = new_session();
    let mut sink = PrintEmit::new(Vec::new());
    session
        .disassemble_with(Unit::Instruction, 3, 1, &mut sink)
        .unwrap();
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "--- 0x401007: RET \nRETURN (register,ESP,4)\n");
}
