//! Generator state management.
//!
//! `GeneratorHeader` packs the generator state and the resume index (the pc
//! of the yield the generator is suspended at) into one `u32`.
//!
//! # Encoding
//!
//! ```text
//! Bits 0-2:  State (Created=0, Running=1, Suspended=2, Returned=3, Raised=4)
//! Bits 3-31: Resume index (pc of the last yield)
//! ```
//!
//! # Transitions
//!
//! ```text
//! Created ──start──▶ Running ──yield──▶ Suspended ──resume──▶ Running
//!                       │                                        │
//!                       ├──return──▶ Returned ◀──────return──────┤
//!                       └──raise───▶ Raised   ◀──────raise───────┘
//! ```

use std::fmt;

// ============================================================================
// Generator State
// ============================================================================

/// Generator execution state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorState {
    /// Created but never resumed.
    #[default]
    Created = 0,
    /// Currently executing (reentry check).
    Running = 1,
    /// Suspended at a yield point.
    Suspended = 2,
    /// Finished by returning (or closed).
    Returned = 3,
    /// Finished by letting an exception escape.
    Raised = 4,
}

impl GeneratorState {
    /// Number of bits used to encode state.
    pub const BITS: u32 = 3;

    /// Mask for extracting state from header.
    pub const MASK: u32 = (1 << Self::BITS) - 1;

    /// Decodes a state from header bits.
    ///
    /// Only values 0-4 are ever written; the unused encodings decode as
    /// `Raised` so that decoding stays total.
    #[inline(always)]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & Self::MASK {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Suspended,
            3 => Self::Returned,
            _ => Self::Raised,
        }
    }

    /// Returns true if the generator can be resumed.
    #[inline(always)]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Created | Self::Suspended)
    }

    /// Returns true if the generator is finished.
    #[inline(always)]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Returned | Self::Raised)
    }

    /// Returns the `inspect.getgeneratorstate` name for this state.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "GEN_CREATED",
            Self::Running => "GEN_RUNNING",
            Self::Suspended => "GEN_SUSPENDED",
            Self::Returned | Self::Raised => "GEN_CLOSED",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Generator Header
// ============================================================================

/// Tagged header combining state and resume index.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct GeneratorHeader {
    bits: u32,
}

impl GeneratorHeader {
    /// Maximum resume index (2^29 - 1).
    pub const MAX_RESUME_INDEX: u32 = (1 << (32 - GeneratorState::BITS)) - 1;

    const RESUME_SHIFT: u32 = GeneratorState::BITS;

    /// Creates a header in `Created` state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            bits: GeneratorState::Created as u32,
        }
    }

    /// Creates a header with a specific state and resume index.
    #[inline]
    pub fn with_state_and_index(state: GeneratorState, resume_index: u32) -> Self {
        debug_assert!(resume_index <= Self::MAX_RESUME_INDEX);
        Self {
            bits: (resume_index << Self::RESUME_SHIFT) | state as u32,
        }
    }

    /// Gets the current state.
    #[inline(always)]
    pub const fn state(&self) -> GeneratorState {
        GeneratorState::from_bits(self.bits)
    }

    /// Gets the resume index.
    #[inline(always)]
    pub const fn resume_index(&self) -> u32 {
        self.bits >> Self::RESUME_SHIFT
    }

    #[inline]
    fn set_state(&mut self, state: GeneratorState) {
        self.bits = (self.bits & !GeneratorState::MASK) | state as u32;
    }

    /// Transitions to `Running` if resumable.
    ///
    /// Returns the previous state, or the current state as the error if the
    /// generator cannot be resumed.
    #[inline]
    pub fn try_start(&mut self) -> Result<GeneratorState, GeneratorState> {
        let old = self.state();
        if !old.is_resumable() {
            return Err(old);
        }
        self.set_state(GeneratorState::Running);
        Ok(old)
    }

    /// Transitions `Running -> Suspended` at the yield at `resume_index`.
    #[inline]
    pub fn suspend(&mut self, resume_index: u32) {
        debug_assert_eq!(self.state(), GeneratorState::Running);
        let index = resume_index.min(Self::MAX_RESUME_INDEX);
        self.bits = (index << Self::RESUME_SHIFT) | GeneratorState::Suspended as u32;
    }

    /// Marks the generator as finished by return.
    #[inline]
    pub fn finish_returned(&mut self) {
        self.set_state(GeneratorState::Returned);
    }

    /// Marks the generator as finished by an escaping exception.
    #[inline]
    pub fn finish_raised(&mut self) {
        self.set_state(GeneratorState::Raised);
    }

    /// Returns the raw bits.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.bits
    }
}

impl fmt::Debug for GeneratorHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorHeader")
            .field("state", &self.state())
            .field("resume_index", &self.resume_index())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
