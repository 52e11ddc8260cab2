//! Generator object implementation.
//!
//! A `GeneratorObject` is everything a suspended generator needs to continue:
//!
//! - Execution state (via `GeneratorHeader`)
//! - The suspended frame (registers and instruction pointer)
//! - The generator's saved exception context
//!
//! The saved context is a whole `ExcInfoStack`. While the generator runs, the
//! VM's active stack and this one are swapped, so the body only ever sees the
//! handlers it entered itself.

use crate::bytecode::CodeObject;
use crate::exception::{ExcInfoStack, ExceptionRef};
use crate::frame::{Frame, FrameKind};
use std::fmt;
use std::sync::Arc;

use super::state::{GeneratorHeader, GeneratorState};

/// A generator instance.
pub struct GeneratorObject {
    /// Tagged state + resume index.
    header: GeneratorHeader,

    /// The generator's code object.
    code: Arc<CodeObject>,

    /// Frame kept across suspensions. `None` before the first resume and
    /// after the generator finished.
    frame: Option<Frame>,

    /// Exception context saved while the generator is not running.
    exc_state: ExcInfoStack,

    /// Values yielded so far.
    yield_count: u64,
}

impl GeneratorObject {
    /// Creates a generator in `Created` state with an empty saved context.
    #[inline]
    pub fn new(code: Arc<CodeObject>, max_exc_depth: usize) -> Self {
        Self {
            header: GeneratorHeader::new(),
            code,
            frame: None,
            exc_state: ExcInfoStack::with_limit(max_exc_depth),
            yield_count: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // State Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// Returns the current generator state.
    #[inline(always)]
    pub fn state(&self) -> GeneratorState {
        self.header.state()
    }

    /// Returns the pc of the yield the generator is suspended at.
    #[inline(always)]
    pub fn resume_index(&self) -> u32 {
        self.header.resume_index()
    }

    /// Returns a reference to the code object.
    #[inline(always)]
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }

    /// Returns the number of values yielded so far.
    #[inline]
    pub fn yield_count(&self) -> u64 {
        self.yield_count
    }

    /// Returns the saved exception context.
    #[inline]
    pub fn saved_context(&self) -> &ExcInfoStack {
        &self.exc_state
    }

    /// Returns the innermost exception of the saved context.
    #[inline]
    pub fn saved_exception(&self) -> Option<&ExceptionRef> {
        self.exc_state.current_exception()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Transitions to `Running` and hands out the frame to run.
    ///
    /// Returns the previous state with the frame, or the current state if the
    /// generator cannot be resumed.
    pub(crate) fn start(&mut self) -> Result<(GeneratorState, Frame), GeneratorState> {
        let previous = self.header.try_start()?;
        let frame = match self.frame.take() {
            Some(frame) => frame,
            None => Frame::new(Arc::clone(&self.code), FrameKind::Generator, 0),
        };
        Ok((previous, frame))
    }

    /// Parks `frame` at the yield it just executed.
    pub(crate) fn suspend(&mut self, frame: Frame) {
        self.header.suspend(frame.current_pc());
        self.frame = Some(frame);
        self.yield_count += 1;
    }

    /// Marks the generator finished by return.
    pub(crate) fn finish_returned(&mut self) {
        self.header.finish_returned();
        self.release();
    }

    /// Marks the generator finished by an escaping exception.
    pub(crate) fn finish_raised(&mut self) {
        self.header.finish_raised();
        self.release();
    }

    /// Frees the frame and the saved context of a finished generator.
    ///
    /// Only valid while the generator's own context is swapped in.
    fn release(&mut self) {
        self.frame = None;
        self.exc_state.clear();
    }

    /// Swaps the saved context with the VM's active one.
    #[inline]
    pub(crate) fn swap_context(&mut self, active: &mut ExcInfoStack) {
        active.swap_contents(&mut self.exc_state);
    }
}

impl fmt::Debug for GeneratorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorObject")
            .field("name", &self.code.name)
            .field("state", &self.state())
            .field("resume_index", &self.resume_index())
            .field("saved_depth", &self.exc_state.len())
            .field("yields", &self.yield_count)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
