// Crate root: declare modules and control visibility
pub mod decoder;
pub mod emit;
pub mod error;
pub mod image;
pub mod microop;
pub mod serializer;
pub mod session;
pub mod store;

// Re-export commonly used API from the library for binaries/tests
#[cfg(feature = "capstone")]
pub use decoder::capstone::CapstoneDecoder;
pub use decoder::Decoder;
pub use emit::{print_instruction, AssemblyEmit, Emit, MicroOpEmit, PrintEmit};
pub use error::{Error, Result};
pub use image::{LoadImage, MemoryWindow};
pub use microop::{AddrSpace, MicroOp, OpCode, Varnode};
pub use session::{ArchProfile, Iteration, Session, SessionConfig, Unit};
pub use store::{AssemblyConflict, Instruction, InstructionStore};
