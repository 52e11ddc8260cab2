//! Call frames.
//!
//! A frame is the execution context of one code object: its instruction
//! pointer, register file and the depth of the exception-info stack at the
//! moment the frame was entered. A suspended generator keeps its frame; the
//! frame rejoins the VM's frame chain for the duration of each resume.

use crate::bytecode::{CodeObject, ConstIndex, Instruction, Register};
use crate::error::{RuntimeError, RuntimeErrorKind, VmResult};
use crate::exception::FrameInfo;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use tether_core::Value;

/// Registers stored inline before spilling to the heap.
const INLINE_REGISTERS: usize = 8;

/// What a frame is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Entry code passed to `VirtualMachine::execute`.
    Entry,
    /// A plain function call.
    Function,
    /// A generator body.
    Generator,
}

/// A call frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Code object being executed.
    pub code: Arc<CodeObject>,

    /// Index of the next instruction.
    pub ip: u32,

    /// Exception-info stack depth owned by callers.
    ///
    /// Entries above this depth were pushed by handlers of this frame and are
    /// discarded when the frame exits. Generator frames run on their own
    /// stack, so their base is always 0.
    pub exc_base: usize,

    /// Frame kind.
    pub kind: FrameKind,

    registers: SmallVec<[Value; INLINE_REGISTERS]>,
}

impl Frame {
    /// Creates a frame positioned at the first instruction.
    pub fn new(code: Arc<CodeObject>, kind: FrameKind, exc_base: usize) -> Self {
        let registers = smallvec![Value::None; code.register_count as usize];
        Self {
            code,
            ip: 0,
            exc_base,
            kind,
            registers,
        }
    }

    /// Returns the function name.
    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.code.name
    }

    /// Fetches the next instruction and advances `ip`.
    ///
    /// Returns `None` past the end of the code.
    #[inline]
    pub fn fetch(&mut self) -> Option<Instruction> {
        let inst = self.code.instructions.get(self.ip as usize).copied()?;
        self.ip += 1;
        Some(inst)
    }

    /// Returns the pc of the instruction executed last.
    #[inline]
    pub fn current_pc(&self) -> u32 {
        self.ip.saturating_sub(1)
    }

    /// Reads a register.
    #[inline]
    pub fn reg(&self, reg: Register) -> VmResult<&Value> {
        self.registers
            .get(reg.0 as usize)
            .ok_or_else(|| self.invalid_register(reg))
    }

    /// Writes a register.
    #[inline]
    pub fn set_reg(&mut self, reg: Register, value: Value) -> VmResult<()> {
        match self.registers.get_mut(reg.0 as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.invalid_register(reg)),
        }
    }

    /// Reads a constant.
    #[inline]
    pub fn constant(&self, index: ConstIndex) -> VmResult<&Value> {
        self.code.constant(index).ok_or_else(|| {
            RuntimeErrorKind::InvalidConstant {
                func: Arc::clone(&self.code.name),
                index: index.0,
            }
            .into()
        })
    }

    /// Traceback entry for the instruction executed last.
    pub fn frame_info(&self) -> FrameInfo {
        let pc = self.current_pc();
        FrameInfo::new(
            Arc::clone(&self.code.name),
            Arc::clone(&self.code.filename),
            pc,
            self.code.line_for(pc),
        )
    }

    fn invalid_register(&self, reg: Register) -> RuntimeError {
        RuntimeErrorKind::InvalidRegister {
            func: Arc::clone(&self.code.name),
            reg: reg.0,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CodeBuilder;

    fn code() -> Arc<CodeObject> {
        let mut b = CodeBuilder::new("f");
        b.set_line(3);
        b.emit_load_const(Register(1), Value::int(5));
        b.emit_return(Register(1));
        Arc::new(b.finish().unwrap())
    }

    #[test]
    fn test_registers_sized_from_code() {
        let mut frame = Frame::new(code(), FrameKind::Function, 0);
        assert_eq!(frame.reg(Register(1)).unwrap(), &Value::None);
        frame.set_reg(Register(1), Value::int(9)).unwrap();
        assert_eq!(frame.reg(Register(1)).unwrap().as_int(), Some(9));
    }

    #[test]
    fn test_register_out_of_range() {
        let mut frame = Frame::new(code(), FrameKind::Function, 0);
        assert!(frame.reg(Register(2)).is_err());
        let err = frame.set_reg(Register(200), Value::None).unwrap_err();
        assert!(err.to_string().contains("r200"));
    }

    #[test]
    fn test_fetch_advances_until_end() {
        let mut frame = Frame::new(code(), FrameKind::Entry, 0);
        assert!(frame.fetch().is_some());
        assert_eq!(frame.current_pc(), 0);
        assert!(frame.fetch().is_some());
        assert!(frame.fetch().is_none());
        assert_eq!(frame.ip, 2);
    }

    #[test]
    fn test_frame_info_uses_line_table() {
        let mut frame = Frame::new(code(), FrameKind::Function, 0);
        frame.fetch();
        let info = frame.frame_info();
        assert_eq!(&*info.func_name, "f");
        assert_eq!(info.bytecode_offset, 0);
        assert_eq!(info.line_number, 3);
    }
}
