//! Generator support.
//!
//! A generator is a suspended frame plus its own exception context. Resuming
//! one swaps that context in for the duration of the run, so a generator body
//! never sees the resumer's handled exceptions and the resumer never sees the
//! generator's.
//!
//! - **Tagged state**: a 4-byte header encodes state + resume index
//! - **Two-phase resume**: `prepare_resume` / `complete_resume` bracket the
//!   dispatch loop; the VM does the context swap in between

mod methods;
mod object;
mod resume;
mod state;

pub use methods::{complete_close, generator_exit};
pub use object::GeneratorObject;
pub(crate) use resume::{FrameExit, ResumeAction, complete_resume, prepare_resume};
pub use resume::{GeneratorStep, ResumeMode};
pub use state::{GeneratorHeader, GeneratorState};
