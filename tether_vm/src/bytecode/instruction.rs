//! Register-based bytecode instruction definitions.
//!
//! Instructions are a plain enum with inline operands. Registers name slots
//! in the executing frame's register file; constant indices name entries in
//! the code object's constant pool; code indices name nested code objects.

use crate::exception::ExceptionTypeId;
use std::fmt;

/// A register index (0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register with the given index.
    #[inline]
    pub const fn new(index: u8) -> Self {
        Register(index)
    }

    /// Get the register index.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A constant pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ConstIndex(pub u16);

impl fmt::Display for ConstIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Do nothing.
    Nop,
    /// `dst = constants[index]`
    LoadConst { dst: Register, index: ConstIndex },
    /// `dst = None`
    LoadNone { dst: Register },
    /// `dst = src`
    Move { dst: Register, src: Register },
    /// Continue at `target`.
    Jump { target: u32 },
    /// Raise a new exception; `message` names a string constant.
    Raise {
        type_id: ExceptionTypeId,
        message: Option<ConstIndex>,
    },
    /// Bare `raise`: re-raise the exception being handled.
    Reraise,
    /// Leave an `except` block, restoring the previous exception context.
    PopExcept,
    /// Record the active exception type under a label (`sys.exc_info()[0]`).
    ExcInfo { label: ConstIndex },
    /// Suspend the generator, handing `src` to the resumer. On resumption the
    /// sent value lands in `dst`.
    Yield { dst: Register, src: Register },
    /// Return `src` from the frame.
    Return { src: Register },
    /// Call the nested code object `code` as a plain function.
    Call { dst: Register, code: u16 },
    /// Instantiate the nested generator code object `code`.
    MakeGenerator { dst: Register, code: u16 },
    /// `dst = next(generator)`
    Next { dst: Register, generator: Register },
    /// Drive `generator` to completion (`list(generator)`); `dst` receives the
    /// number of values it yielded.
    Exhaust { dst: Register, generator: Register },
    /// `del generator`: discard the generator without running it and clear
    /// the register.
    DropGenerator { generator: Register },
}

impl Instruction {
    /// Returns the highest register this instruction touches.
    pub fn max_register(&self) -> Option<u8> {
        match *self {
            Self::Nop
            | Self::Jump { .. }
            | Self::Raise { .. }
            | Self::Reraise
            | Self::PopExcept
            | Self::ExcInfo { .. } => None,
            Self::LoadConst { dst, .. }
            | Self::LoadNone { dst }
            | Self::Call { dst, .. }
            | Self::MakeGenerator { dst, .. } => Some(dst.0),
            Self::Return { src } => Some(src.0),
            Self::DropGenerator { generator } => Some(generator.0),
            Self::Move { dst, src } | Self::Yield { dst, src } => Some(dst.0.max(src.0)),
            Self::Next { dst, generator } | Self::Exhaust { dst, generator } => {
                Some(dst.0.max(generator.0))
            }
        }
    }

    /// Returns the jump target, if this is a jump.
    #[inline]
    pub const fn jump_target(&self) -> Option<u32> {
        match self {
            Self::Jump { target } => Some(*target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => f.write_str("NOP"),
            Self::LoadConst { dst, index } => write!(f, "LOAD_CONST {dst}, {index}"),
            Self::LoadNone { dst } => write!(f, "LOAD_NONE {dst}"),
            Self::Move { dst, src } => write!(f, "MOVE {dst}, {src}"),
            Self::Jump { target } => write!(f, "JUMP @{target}"),
            Self::Raise { type_id, message } => match message {
                Some(msg) => write!(f, "RAISE {type_id}, {msg}"),
                None => write!(f, "RAISE {type_id}"),
            },
            Self::Reraise => f.write_str("RERAISE"),
            Self::PopExcept => f.write_str("POP_EXCEPT"),
            Self::ExcInfo { label } => write!(f, "EXC_INFO {label}"),
            Self::Yield { dst, src } => write!(f, "YIELD {dst}, {src}"),
            Self::Return { src } => write!(f, "RETURN {src}"),
            Self::Call { dst, code } => write!(f, "CALL {dst}, code#{code}"),
            Self::MakeGenerator { dst, code } => write!(f, "MAKE_GENERATOR {dst}, code#{code}"),
            Self::Next { dst, generator } => write!(f, "NEXT {dst}, {generator}"),
            Self::Exhaust { dst, generator } => write!(f, "EXHAUST {dst}, {generator}"),
            Self::DropGenerator { generator } => write!(f, "DROP_GENERATOR {generator}"),
        }
    }
}
