//! Exception type identifiers.
//!
//! `ExceptionTypeId` identifies a built-in exception type in one byte. Handler
//! matching walks the parent chain, so `except LookupError` catches
//! `KeyError` the way Python does.

use std::fmt;

/// Built-in exception type identifier.
///
/// Ids are contiguous so `from_u8` is a bounds check plus a table lookup.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExceptionTypeId {
    // ═══════════════════════════════════════════════════════════════════════
    // Hierarchy roots
    // ═══════════════════════════════════════════════════════════════════════
    /// Root of all exceptions.
    BaseException = 0,
    /// Request that a generator exit.
    GeneratorExit = 1,
    /// Raised when the user interrupts execution.
    KeyboardInterrupt = 2,
    /// Base class for all non-exiting exceptions.
    Exception = 3,

    // ═══════════════════════════════════════════════════════════════════════
    // Iteration
    // ═══════════════════════════════════════════════════════════════════════
    /// Iterator has no more items.
    StopIteration = 4,

    // ═══════════════════════════════════════════════════════════════════════
    // Arithmetic
    // ═══════════════════════════════════════════════════════════════════════
    /// Base class for arithmetic errors.
    ArithmeticError = 5,
    /// Numeric overflow.
    OverflowError = 6,
    /// Division by zero.
    ZeroDivisionError = 7,

    // ═══════════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════════
    /// Base class for lookup errors.
    LookupError = 8,
    /// Sequence index out of range.
    IndexError = 9,
    /// Mapping key not found.
    KeyError = 10,

    // ═══════════════════════════════════════════════════════════════════════
    // Common runtime errors
    // ═══════════════════════════════════════════════════════════════════════
    /// Assertion failed.
    AssertionError = 11,
    /// Attribute not found.
    AttributeError = 12,
    /// Name not found.
    NameError = 13,
    /// Operation applied to an object of the wrong type.
    TypeError = 14,
    /// Right type, inappropriate value.
    ValueError = 15,
    /// Error that fits no other category.
    RuntimeError = 16,
    /// Maximum recursion (or nesting) depth exceeded.
    RecursionError = 17,
    /// Abstract method or unfinished feature.
    NotImplementedError = 18,
    /// Out of memory.
    MemoryError = 19,
}

impl ExceptionTypeId {
    /// Number of built-in exception types.
    pub const COUNT: usize = 20;

    const ALL: [Self; Self::COUNT] = [
        Self::BaseException,
        Self::GeneratorExit,
        Self::KeyboardInterrupt,
        Self::Exception,
        Self::StopIteration,
        Self::ArithmeticError,
        Self::OverflowError,
        Self::ZeroDivisionError,
        Self::LookupError,
        Self::IndexError,
        Self::KeyError,
        Self::AssertionError,
        Self::AttributeError,
        Self::NameError,
        Self::TypeError,
        Self::ValueError,
        Self::RuntimeError,
        Self::RecursionError,
        Self::NotImplementedError,
        Self::MemoryError,
    ];

    /// Returns the raw id.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a type id from its raw value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        if (value as usize) < Self::COUNT {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    /// Looks up a type id by its Python name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Returns the Python name of this exception type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseException => "BaseException",
            Self::GeneratorExit => "GeneratorExit",
            Self::KeyboardInterrupt => "KeyboardInterrupt",
            Self::Exception => "Exception",
            Self::StopIteration => "StopIteration",
            Self::ArithmeticError => "ArithmeticError",
            Self::OverflowError => "OverflowError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::LookupError => "LookupError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::AssertionError => "AssertionError",
            Self::AttributeError => "AttributeError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::RuntimeError => "RuntimeError",
            Self::RecursionError => "RecursionError",
            Self::NotImplementedError => "NotImplementedError",
            Self::MemoryError => "MemoryError",
        }
    }

    /// Returns the parent type in the exception hierarchy.
    #[inline]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::BaseException => None,

            Self::GeneratorExit | Self::KeyboardInterrupt | Self::Exception => {
                Some(Self::BaseException)
            }

            Self::OverflowError | Self::ZeroDivisionError => Some(Self::ArithmeticError),
            Self::IndexError | Self::KeyError => Some(Self::LookupError),
            Self::RecursionError | Self::NotImplementedError => Some(Self::RuntimeError),

            Self::StopIteration
            | Self::ArithmeticError
            | Self::LookupError
            | Self::AssertionError
            | Self::AttributeError
            | Self::NameError
            | Self::TypeError
            | Self::ValueError
            | Self::RuntimeError
            | Self::MemoryError => Some(Self::Exception),
        }
    }

    /// Checks if this exception type is a subclass of another.
    ///
    /// Walks the parent chain; the hierarchy is at most three levels deep.
    #[inline]
    pub fn is_subclass_of(self, base: Self) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == base {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    /// Returns true for exceptions used as control-flow signals.
    #[inline]
    pub const fn is_control_flow(self) -> bool {
        matches!(self, Self::StopIteration | Self::GeneratorExit)
    }
}

impl fmt::Display for ExceptionTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
