//! Generator resume protocol.
//!
//! Resuming a generator is split in two halves around the VM's dispatch loop:
//!
//! 1. [`prepare_resume`] validates the request against the generator state,
//!    marks it `Running` and hands back the frame to run (with the sent value
//!    already delivered, or the thrown exception pending).
//! 2. [`complete_resume`] records how the body left (yield, return or raise)
//!    and produces the result the resumer sees.
//!
//! Between the two the VM swaps the generator's saved exception context in,
//! runs the frame and swaps the context back out. The swap back happens
//! before [`complete_resume`] runs, whatever the outcome.

use super::object::GeneratorObject;
use super::state::GeneratorState;
use crate::bytecode::Instruction;
use crate::error::{RuntimeError, VmResult};
use crate::exception::{EntryFlags, ExceptionRef};
use crate::frame::Frame;
use std::fmt;
use tether_core::Value;

// ============================================================================
// Resume Mode
// ============================================================================

/// How a generator is resumed.
#[derive(Debug, Clone)]
pub enum ResumeMode {
    /// `next(gen)`: the pending yield evaluates to `None`.
    Next,
    /// `gen.send(value)`: the pending yield evaluates to `value`.
    Send(Value),
    /// `gen.throw(exc)`: `exc` is raised at the pending yield.
    Throw(ExceptionRef),
}

impl ResumeMode {
    /// Returns the protocol method name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Send(_) => "send",
            Self::Throw(_) => "throw",
        }
    }
}

// ============================================================================
// Generator Step
// ============================================================================

/// Result of one successful resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorStep {
    /// The generator yielded a value and is suspended.
    Yielded(Value),
    /// The generator is finished (stop signal) with its return value.
    Returned(Value),
}

impl GeneratorStep {
    /// Returns the yielded value, if any.
    #[inline]
    pub fn yielded(&self) -> Option<&Value> {
        match self {
            Self::Yielded(value) => Some(value),
            Self::Returned(_) => None,
        }
    }

    /// Returns the return value, if the generator finished.
    #[inline]
    pub fn returned(&self) -> Option<&Value> {
        match self {
            Self::Returned(value) => Some(value),
            Self::Yielded(_) => None,
        }
    }

    /// Returns true if the generator yielded.
    #[inline]
    pub fn is_yielded(&self) -> bool {
        matches!(self, Self::Yielded(_))
    }

    /// Returns true if the generator is done.
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Returned(_))
    }
}

impl fmt::Display for GeneratorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yielded(value) => write!(f, "yielded {value}"),
            Self::Returned(value) => write!(f, "returned {value}"),
        }
    }
}

// ============================================================================
// Frame Exit
// ============================================================================

/// How a run of the dispatch loop ended.
#[derive(Debug)]
pub(crate) enum FrameExit {
    /// The base frame returned.
    Returned(Value),
    /// The base (generator) frame yielded; the frame is handed back.
    Yielded(Value, Frame),
}

// ============================================================================
// Prepare / Complete
// ============================================================================

/// What the VM should do after [`prepare_resume`].
#[derive(Debug)]
pub(crate) enum ResumeAction {
    /// Run `frame`, raising `pending` at its suspension point first.
    Enter {
        frame: Frame,
        pending: Option<RuntimeError>,
    },
    /// Nothing to run; the generator is already finished.
    Done(GeneratorStep),
}

/// Validates a resume request and starts the generator.
///
/// - Finished generators yield the stop signal again (`throw` re-raises the
///   thrown exception instead).
/// - A non-`None` value cannot be sent into a just-started generator.
/// - Throwing into a just-started generator finishes it without running the
///   body.
pub(crate) fn prepare_resume(
    generator: &mut GeneratorObject,
    mode: ResumeMode,
) -> VmResult<ResumeAction> {
    match (generator.state(), &mode) {
        (GeneratorState::Running, _) => {
            return Err(RuntimeError::value_error("generator already executing"));
        }
        (GeneratorState::Returned | GeneratorState::Raised, ResumeMode::Throw(exc)) => {
            return Err(thrown(exc.clone()));
        }
        (GeneratorState::Returned | GeneratorState::Raised, _) => {
            return Ok(ResumeAction::Done(GeneratorStep::Returned(Value::None)));
        }
        (GeneratorState::Created, ResumeMode::Send(value)) if !value.is_none() => {
            return Err(RuntimeError::type_error(
                "can't send non-None value to a just-started generator",
            ));
        }
        (GeneratorState::Created, ResumeMode::Throw(exc)) => {
            generator.finish_raised();
            return Err(thrown(exc.clone()));
        }
        _ => {}
    }

    let (previous, mut frame) = generator
        .start()
        .map_err(|state| RuntimeError::internal(format!("cannot resume generator in {state}")))?;

    let delivered = match mode {
        ResumeMode::Throw(exc) => Ok(Some(thrown(exc))),
        ResumeMode::Next if previous == GeneratorState::Suspended => {
            deliver_sent_value(&mut frame, Value::None).map(|()| None)
        }
        ResumeMode::Send(value) if previous == GeneratorState::Suspended => {
            deliver_sent_value(&mut frame, value).map(|()| None)
        }
        _ => Ok(None),
    };

    match delivered {
        Ok(pending) => Ok(ResumeAction::Enter { frame, pending }),
        Err(err) => {
            generator.finish_raised();
            Err(err)
        }
    }
}

/// Records the outcome of a run and produces the resumer's result.
pub(crate) fn complete_resume(
    generator: &mut GeneratorObject,
    outcome: VmResult<FrameExit>,
) -> VmResult<GeneratorStep> {
    match outcome {
        Ok(FrameExit::Yielded(value, frame)) => {
            generator.suspend(frame);
            Ok(GeneratorStep::Yielded(value))
        }
        Ok(FrameExit::Returned(value)) => {
            generator.finish_returned();
            Ok(GeneratorStep::Returned(value))
        }
        Err(err) => {
            generator.finish_raised();
            Err(err)
        }
    }
}

/// Writes the result of the pending yield expression into its register.
fn deliver_sent_value(frame: &mut Frame, value: Value) -> VmResult<()> {
    let pc = frame.current_pc();
    match frame.code.instructions.get(pc as usize).copied() {
        Some(Instruction::Yield { dst, .. }) => frame.set_reg(dst, value),
        _ => Err(RuntimeError::internal(format!(
            "generator '{}' suspended at {pc}, which is not a yield",
            frame.name()
        ))),
    }
}

#[inline]
fn thrown(exception: ExceptionRef) -> RuntimeError {
    RuntimeError::raised(exception).with_flag(EntryFlags::THROWN)
}

// ============================================================================
// Tests
// ============================================================================
