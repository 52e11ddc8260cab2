//! # Tether Core
//!
//! Core types shared by the Tether runtime crates.
//!
//! - **Value System**: the small dynamically-typed `Value` used by registers,
//!   constants, yielded and returned values
//! - **Handles**: opaque object ids for runtime-owned objects (generators)
//! - **Error Handling**: value-level error type and result alias

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{CoreError, CoreResult};
pub use value::{Handle, Value};

/// Tether runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
