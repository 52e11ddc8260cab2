//! Runtime value representation.
//!
//! Values are a plain tagged enum. Strings share their storage through
//! `Arc<str>`, and runtime-owned objects are referenced through a `Handle`
//! so that values stay `Clone` without borrowing the owner.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Handle
// =============================================================================

/// Opaque reference to an object owned by the runtime (e.g. a generator).
///
/// Handles are never reused within one runtime instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// Creates a handle from its raw id.
    #[inline]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the handle following this one.
    pub fn next(self) -> CoreResult<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(CoreError::HandlesExhausted)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(#{})", self.0)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A runtime value.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// The `None` singleton.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An immutable string.
    Str(Arc<str>),
    /// A reference to a runtime-owned object.
    Handle(Handle),
}

impl Value {
    /// Returns `None`.
    #[inline]
    pub const fn none() -> Self {
        Self::None
    }

    /// Creates an integer value.
    #[inline]
    pub const fn int(i: i64) -> Self {
        Self::Int(i)
    }

    /// Creates a string value.
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// Returns true if this is `None`.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the integer payload, if any.
    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the handle payload, if any.
    #[inline]
    pub const fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }

    /// Returns the handle payload or a type error naming `expected`.
    pub fn expect_handle(&self, expected: &'static str) -> CoreResult<Handle> {
        self.as_handle()
            .ok_or_else(|| CoreError::type_mismatch(expected, self.type_name()))
    }

    /// Python truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
            Self::Handle(_) => true,
        }
    }

    /// Returns the Python type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::Handle(_) => "object",
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Self::Handle(h)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Handle(h) => write!(f, "<object {h:?}>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_default() {
        assert!(Value::default().is_none());
        assert_eq!(Value::none(), Value::None);
    }

    #[test]
    fn test_int_accessors() {
        let v = Value::int(42);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.type_name(), "int");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::none().is_truthy());
        assert!(!Value::int(0).is_truthy());
        assert!(Value::int(-1).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::from(Handle::from_raw(0)).is_truthy());
    }

    #[test]
    fn test_expect_handle() {
        let h = Handle::from_raw(7);
        assert_eq!(Value::from(h).expect_handle("generator"), Ok(h));

        let err = Value::int(1).expect_handle("generator").unwrap_err();
        assert_eq!(err, CoreError::type_mismatch("generator", "int"));
    }

    #[test]
    fn test_handle_next_overflow() {
        assert_eq!(Handle::from_raw(1).next(), Ok(Handle::from_raw(2)));
        assert_eq!(
            Handle::from_raw(u32::MAX).next(),
            Err(CoreError::HandlesExhausted)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(format!("{:?}", Value::string("hi")), "\"hi\"");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::none().to_string(), "None");
    }
}
