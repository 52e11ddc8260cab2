//! Bytecode virtual machine for Tether with per-generator exception context.
//!
//! This crate executes register-based bytecode and keeps `sys.exc_info()`
//! semantics intact across generator suspension:
//!
//! - **Exception-context tracker**: an explicit stack of handled exceptions,
//!   pushed on entering an `except` block and popped on leaving it
//! - **Generators**: suspended frames that carry their own saved context,
//!   swapped in and out around every resume
//! - **Tracebacks**: exceptions record every frame they leave, generator
//!   frames included
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 VirtualMachine                  │
//! ├─────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌─────────┐  ┌─────────────────┐  │
//! │  │ Frame 0 │→ │ Frame 1 │→ │ Frame N (curr)  │  │
//! │  └─────────┘  └─────────┘  └─────────────────┘  │
//! │                                                 │
//! │  ┌──────────────┐  ┌─────────────────────────┐  │
//! │  │ ExcInfoStack │  │ Generators (FxHashMap)  │  │
//! │  │   (active)   │⇄ │  each: frame + saved    │  │
//! │  └──────────────┘  │  ExcInfoStack           │  │
//! │                    └─────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tether_vm::bytecode::{CodeBuilder, Register};
//! use tether_vm::exception::{ExceptionRef, ExceptionTypeId};
//! use tether_vm::VirtualMachine;
//!
//! let mut b = CodeBuilder::generator("g");
//! b.emit_exc_info("start of generator");
//! b.emit_yield_int(Register(0), 1);
//! let code = Arc::new(b.finish().unwrap());
//!
//! let mut vm = VirtualMachine::new();
//! let generator = vm.create_generator(code).unwrap();
//! vm.enter_handler(ExceptionRef::raise(ExceptionTypeId::AttributeError, "")).unwrap();
//!
//! vm.resume(generator).unwrap();
//! assert_eq!(vm.probes()[0].exception, None);
//! assert_eq!(
//!     vm.current_exception().map(ExceptionRef::type_id),
//!     Some(ExceptionTypeId::AttributeError)
//! );
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

// Core modules
pub mod config;
pub mod error;
pub mod frame;
pub mod vm;

// Execution infrastructure
pub mod bytecode;
pub mod exception;
pub mod generator;
pub mod probe;

pub use config::VmConfig;
pub use error::{RuntimeError, RuntimeErrorKind, VmResult};
pub use generator::{GeneratorState, GeneratorStep, ResumeMode};
pub use probe::ProbeRecord;
pub use vm::VirtualMachine;
