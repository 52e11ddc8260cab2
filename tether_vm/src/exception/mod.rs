//! Exception runtime infrastructure.
//!
//! # Module Organization
//!
//! - [`types`]: `ExceptionTypeId` and the built-in hierarchy
//! - [`object`]: `ExceptionObject` and the shared `ExceptionRef`
//! - [`traceback`]: frames an exception passed through
//! - [`exc_info_stack`]: the exception-context tracker (`sys.exc_info()`)

mod exc_info_stack;
mod object;
mod traceback;
mod types;

pub use exc_info_stack::{
    DEFAULT_MAX_DEPTH, EntryFlags, ExcInfoEntry, ExcInfoStack, ExcInfoStackStats,
};
pub use object::{ExceptionObject, ExceptionRef};
pub use traceback::{FrameInfo, Traceback};
pub use types::ExceptionTypeId;
