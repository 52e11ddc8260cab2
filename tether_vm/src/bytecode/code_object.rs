//! Code objects and exception tables.

use super::instruction::{ConstIndex, Instruction};
use crate::exception::{ExceptionRef, ExceptionTypeId};
use std::fmt;
use std::sync::Arc;
use tether_core::Value;

/// Code object flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeFlags(u8);

impl CodeFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Calling the code creates a generator instead of running the body.
    pub const GENERATOR: Self = Self(1 << 0);

    /// Returns true if this contains all bits of `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of self and other.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One `try` region and its handler.
///
/// Covers `[start_pc, end_pc)`. `depth` counts the handler blocks of the same
/// frame that are still active while the region runs; when this entry
/// catches, the frame's exception-info entries above that depth are
/// discarded before the caught exception is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// First covered instruction.
    pub start_pc: u32,
    /// One past the last covered instruction.
    pub end_pc: u32,
    /// First instruction of the handler block.
    pub handler_pc: u32,
    /// Active handler blocks of this frame inside the region.
    pub depth: u16,
    /// Exception type caught; `None` is a bare `except:`.
    pub match_type: Option<ExceptionTypeId>,
}

impl ExceptionEntry {
    /// Returns true if the entry covers `pc`.
    #[inline]
    pub const fn covers(&self, pc: u32) -> bool {
        self.start_pc <= pc && pc < self.end_pc
    }

    /// Returns true if the entry catches `exception`.
    #[inline]
    pub fn matches(&self, exception: &ExceptionRef) -> bool {
        match self.match_type {
            Some(base) => exception.is_instance(base),
            None => true,
        }
    }
}

/// A compiled function or generator body.
#[derive(Clone)]
pub struct CodeObject {
    /// Function name.
    pub name: Arc<str>,
    /// Source filename.
    pub filename: Arc<str>,
    /// First line number.
    pub first_lineno: u32,
    /// Instructions.
    pub instructions: Box<[Instruction]>,
    /// Constant pool.
    pub constants: Box<[Value]>,
    /// Nested code objects (functions and generator bodies).
    pub children: Box<[Arc<CodeObject>]>,
    /// Exception table, innermost regions first.
    pub exception_table: Box<[ExceptionEntry]>,
    /// Line number per instruction (may be empty).
    pub line_table: Box<[u32]>,
    /// Registers needed by a frame running this code.
    pub register_count: u16,
    /// Code flags.
    pub flags: CodeFlags,
}

impl CodeObject {
    /// Returns true if this is a generator body.
    #[inline]
    pub const fn is_generator(&self) -> bool {
        self.flags.contains(CodeFlags::GENERATOR)
    }

    /// Returns the line of the instruction at `pc`, or 0 if unknown.
    #[inline]
    pub fn line_for(&self, pc: u32) -> u32 {
        self.line_table.get(pc as usize).copied().unwrap_or(0)
    }

    /// Returns the constant at `index`.
    #[inline]
    pub fn constant(&self, index: ConstIndex) -> Option<&Value> {
        self.constants.get(index.0 as usize)
    }

    /// Returns the nested code object at `index`.
    #[inline]
    pub fn child(&self, index: u16) -> Option<&Arc<CodeObject>> {
        self.children.get(index as usize)
    }

    /// Finds the innermost handler covering `pc` that catches `exception`.
    ///
    /// Exception tables are short; a linear scan in table order is enough.
    pub fn find_handler(&self, pc: u32, exception: &ExceptionRef) -> Option<&ExceptionEntry> {
        self.exception_table
            .iter()
            .find(|entry| entry.covers(pc) && entry.matches(exception))
    }

    /// Renders the instructions, one per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (pc, inst) in self.instructions.iter().enumerate() {
            out.push_str(&format!("{pc:>4}  {inst}\n"));
        }
        out
    }
}

impl fmt::Debug for CodeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeObject")
            .field("name", &self.name)
            .field("instructions", &self.instructions.len())
            .field("exception_table", &self.exception_table)
            .field("register_count", &self.register_count)
            .field("generator", &self.is_generator())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: u32, end: u32, match_type: Option<ExceptionTypeId>) -> ExceptionEntry {
        ExceptionEntry {
            start_pc: start,
            end_pc: end,
            handler_pc: end + 1,
            depth: 0,
            match_type,
        }
    }

    #[test]
    fn test_entry_covers_half_open_range() {
        let e = entry(2, 5, None);
        assert!(!e.covers(1));
        assert!(e.covers(2));
        assert!(e.covers(4));
        assert!(!e.covers(5));
    }

    #[test]
    fn test_entry_matches_subclasses() {
        let key_error = ExceptionRef::raise(ExceptionTypeId::KeyError, "");
        assert!(entry(0, 1, None).matches(&key_error));
        assert!(entry(0, 1, Some(ExceptionTypeId::LookupError)).matches(&key_error));
        assert!(!entry(0, 1, Some(ExceptionTypeId::IndexError)).matches(&key_error));
    }

    #[test]
    fn test_code_flags() {
        let flags = CodeFlags::NONE.union(CodeFlags::GENERATOR);
        assert!(flags.contains(CodeFlags::GENERATOR));
        assert!(!CodeFlags::NONE.contains(CodeFlags::GENERATOR));
    }
}
