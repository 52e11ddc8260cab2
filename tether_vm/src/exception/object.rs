//! Exception objects.
//!
//! `ExceptionObject` is the raised value; `ExceptionRef` is the shared
//! reference handed around by raise sites, handlers and the exception-info
//! stack. Equality on `ExceptionRef` is identity, like Python's `is`.

use super::types::ExceptionTypeId;
use std::fmt;
use std::sync::Arc;

/// A raised exception instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionObject {
    type_id: ExceptionTypeId,
    message: Arc<str>,
}

impl ExceptionObject {
    /// Creates an exception with an empty message.
    #[inline]
    pub fn new(type_id: ExceptionTypeId) -> Self {
        Self {
            type_id,
            message: Arc::from(""),
        }
    }

    /// Creates an exception with a message.
    #[inline]
    pub fn with_message(type_id: ExceptionTypeId, message: impl Into<Arc<str>>) -> Self {
        Self {
            type_id,
            message: message.into(),
        }
    }

    /// Returns the exception type.
    #[inline]
    pub const fn type_id(&self) -> ExceptionTypeId {
        self.type_id
    }

    /// Returns the message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExceptionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.type_id.name())
        } else {
            write!(f, "{}: {}", self.type_id.name(), self.message)
        }
    }
}

/// Shared reference to an exception instance.
#[derive(Clone)]
pub struct ExceptionRef(Arc<ExceptionObject>);

impl ExceptionRef {
    /// Wraps an exception object.
    #[inline]
    pub fn new(exc: ExceptionObject) -> Self {
        Self(Arc::new(exc))
    }

    /// Creates a fresh exception of the given type with a message.
    #[inline]
    pub fn raise(type_id: ExceptionTypeId, message: impl Into<Arc<str>>) -> Self {
        Self::new(ExceptionObject::with_message(type_id, message))
    }

    /// Returns the exception type.
    #[inline]
    pub fn type_id(&self) -> ExceptionTypeId {
        self.0.type_id()
    }

    /// Returns the message.
    #[inline]
    pub fn message(&self) -> &str {
        self.0.message()
    }

    /// Returns true if this exception is an instance of `base`.
    #[inline]
    pub fn is_instance(&self, base: ExceptionTypeId) -> bool {
        self.type_id().is_subclass_of(base)
    }

    /// Returns the underlying object.
    #[inline]
    pub fn object(&self) -> &ExceptionObject {
        &self.0
    }
}

impl PartialEq for ExceptionRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ExceptionRef {}

impl From<ExceptionObject> for ExceptionRef {
    fn from(exc: ExceptionObject) -> Self {
        Self::new(exc)
    }
}

impl fmt::Debug for ExceptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} at {:p}>", self.0, Arc::as_ptr(&self.0))
    }
}

impl fmt::Display for ExceptionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_message() {
        let exc = ExceptionObject::new(ExceptionTypeId::KeyError);
        assert_eq!(exc.to_string(), "KeyError");
    }

    #[test]
    fn test_display_with_message() {
        let exc = ExceptionRef::raise(ExceptionTypeId::ValueError, "bad value");
        assert_eq!(exc.to_string(), "ValueError: bad value");
        assert_eq!(exc.message(), "bad value");
    }

    #[test]
    fn test_equality_is_identity() {
        let a = ExceptionRef::raise(ExceptionTypeId::KeyError, "k");
        let b = ExceptionRef::raise(ExceptionTypeId::KeyError, "k");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.object(), b.object());
    }

    #[test]
    fn test_is_instance() {
        let exc = ExceptionRef::raise(ExceptionTypeId::ZeroDivisionError, "division by zero");
        assert!(exc.is_instance(ExceptionTypeId::ArithmeticError));
        assert!(exc.is_instance(ExceptionTypeId::Exception));
        assert!(!exc.is_instance(ExceptionTypeId::LookupError));
    }
}
