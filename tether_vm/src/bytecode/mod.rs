//! Bytecode: instructions, code objects and the code builder.

mod builder;
mod code_object;
mod instruction;

pub use builder::{CodeBuilder, Label, TryRegion};
pub use code_object::{CodeFlags, CodeObject, ExceptionEntry};
pub use instruction::{ConstIndex, Instruction, Register};
