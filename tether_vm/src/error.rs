//! Runtime error types for the virtual machine.
//!
//! A `RuntimeError` is either a language-level exception in flight
//! (`RuntimeErrorKind::Raised`), which bytecode handlers may catch, or an
//! internal fault of the VM or of malformed bytecode, which they never catch.
//! Both carry the traceback accumulated while unwinding.

use crate::exception::{EntryFlags, ExceptionRef, ExceptionTypeId, FrameInfo, Traceback};
use std::fmt;
use std::sync::Arc;
use tether_core::{CoreError, Handle};
use thiserror::Error;

/// Result alias for VM operations.
pub type VmResult<T> = Result<T, RuntimeError>;

/// Error produced while executing bytecode or driving a generator.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// Error kind.
    pub kind: RuntimeErrorKind,
    /// Frames the error has unwound through, outermost first.
    pub traceback: Traceback,
    /// How the exception was raised; copied into the handler's entry.
    pub flags: EntryFlags,
}

/// Specific runtime error kinds.
#[derive(Error, Debug, Clone)]
pub enum RuntimeErrorKind {
    /// A language-level exception.
    #[error("{0}")]
    Raised(ExceptionRef),

    /// A handler exit without a matching handler entry.
    #[error("InternalError: handler exit without an active exception in '{func}'")]
    UnbalancedHandler {
        /// Function whose code is unbalanced.
        func: Arc<str>,
    },

    /// Unknown generator handle.
    #[error("InternalError: unknown generator {0:?}")]
    InvalidGenerator(Handle),

    /// Register index past the frame's register file.
    #[error("InternalError: register r{reg} out of range in '{func}'")]
    InvalidRegister {
        /// Function containing the instruction.
        func: Arc<str>,
        /// Offending register.
        reg: u8,
    },

    /// Constant index past the code object's constant table.
    #[error("InternalError: constant #{index} out of range in '{func}'")]
    InvalidConstant {
        /// Function containing the instruction.
        func: Arc<str>,
        /// Offending index.
        index: u16,
    },

    /// Any other malformed bytecode.
    #[error("InternalError: {message}")]
    InvalidCode {
        /// Error description.
        message: Arc<str>,
    },
}

impl RuntimeError {
    /// Create a new runtime error with an empty traceback.
    #[inline]
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            traceback: Traceback::empty(),
            flags: EntryFlags::EMPTY,
        }
    }

    /// Wrap a language-level exception.
    #[inline]
    pub fn raised(exception: ExceptionRef) -> Self {
        Self::new(RuntimeErrorKind::Raised(exception))
    }

    /// Wrap a language-level exception that already carries a traceback.
    #[inline]
    pub fn raised_with_traceback(exception: ExceptionRef, traceback: Traceback) -> Self {
        Self {
            kind: RuntimeErrorKind::Raised(exception),
            traceback,
            flags: EntryFlags::EMPTY,
        }
    }

    /// Marks how the exception was raised.
    #[inline]
    pub fn with_flag(mut self, flag: u8) -> Self {
        self.flags.set(flag);
        self
    }

    /// Raise a fresh exception of `type_id`.
    #[inline]
    pub fn exception(type_id: ExceptionTypeId, message: impl Into<Arc<str>>) -> Self {
        Self::raised(ExceptionRef::raise(type_id, message))
    }

    // =========================================================================
    // Convenience Constructors
    // =========================================================================

    /// Raise a `TypeError`.
    #[inline]
    pub fn type_error(message: impl Into<Arc<str>>) -> Self {
        Self::exception(ExceptionTypeId::TypeError, message)
    }

    /// Raise a `ValueError`.
    #[inline]
    pub fn value_error(message: impl Into<Arc<str>>) -> Self {
        Self::exception(ExceptionTypeId::ValueError, message)
    }

    /// Raise a `RuntimeError`.
    #[inline]
    pub fn runtime_error(message: impl Into<Arc<str>>) -> Self {
        Self::exception(ExceptionTypeId::RuntimeError, message)
    }

    /// Raise a `RecursionError` for an exceeded depth limit.
    #[inline]
    pub fn recursion_error(message: impl Into<Arc<str>>) -> Self {
        Self::exception(ExceptionTypeId::RecursionError, message)
    }

    /// Raise a bare `StopIteration`, as `next()` does on an exhausted generator.
    #[inline]
    pub fn stop_iteration() -> Self {
        Self::exception(ExceptionTypeId::StopIteration, "")
    }

    /// A VM-level error for malformed bytecode; not catchable by handlers.
    #[inline]
    pub fn internal(message: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::InvalidCode {
            message: message.into(),
        })
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns the language-level exception, if this is one.
    #[inline]
    pub fn exception_ref(&self) -> Option<&ExceptionRef> {
        match &self.kind {
            RuntimeErrorKind::Raised(exc) => Some(exc),
            _ => None,
        }
    }

    /// Returns the exception type, if this is a language-level exception.
    #[inline]
    pub fn exception_type(&self) -> Option<ExceptionTypeId> {
        self.exception_ref().map(ExceptionRef::type_id)
    }

    /// Returns true if this is a language-level exception that is an
    /// instance of `base`.
    #[inline]
    pub fn is_instance(&self, base: ExceptionTypeId) -> bool {
        self.exception_ref().is_some_and(|exc| exc.is_instance(base))
    }

    /// Returns true if bytecode handlers may catch this error.
    #[inline]
    pub fn is_catchable(&self) -> bool {
        matches!(self.kind, RuntimeErrorKind::Raised(_))
    }

    /// Records a frame the error is leaving.
    #[inline]
    pub fn add_frame(&mut self, frame: FrameInfo) {
        self.traceback.push_outer(frame);
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.traceback.is_empty() {
            write!(f, "{}", self.traceback)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<CoreError> for RuntimeError {
    fn from(err: CoreError) -> Self {
        let type_id = match err {
            CoreError::TypeMismatch { .. } => ExceptionTypeId::TypeError,
            CoreError::HandlesExhausted => ExceptionTypeId::MemoryError,
        };
        // Drop the "TypeError: " prefix; the exception type carries it.
        let text = err.to_string();
        let message = text
            .split_once(": ")
            .map_or(text.as_str(), |(_, rest)| rest)
            .to_owned();
        Self::exception(type_id, message)
    }
}
