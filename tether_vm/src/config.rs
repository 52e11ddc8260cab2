//! Virtual machine configuration.

use crate::exception::DEFAULT_MAX_DEPTH;

/// Default limit on the frame chain (Python's default recursion limit).
pub const DEFAULT_MAX_FRAME_DEPTH: usize = 1_000;

/// Tunables for a `VirtualMachine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of live frames, generator frames included.
    pub max_frame_depth: usize,
    /// Maximum nesting of handled exceptions per call chain.
    pub max_exc_depth: usize,
    /// Record `ExcInfo` probe observations.
    pub record_probes: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_frame_depth: DEFAULT_MAX_FRAME_DEPTH,
            max_exc_depth: DEFAULT_MAX_DEPTH,
            record_probes: true,
        }
    }
}

impl VmConfig {
    /// Configuration that discards probe observations.
    #[inline]
    pub fn quiet() -> Self {
        Self {
            record_probes: false,
            ..Default::default()
        }
    }

    /// Sets the frame depth limit.
    #[inline]
    pub fn with_max_frame_depth(mut self, depth: usize) -> Self {
        self.max_frame_depth = depth;
        self
    }

    /// Sets the handled-exception nesting limit.
    #[inline]
    pub fn with_max_exc_depth(mut self, depth: usize) -> Self {
        self.max_exc_depth = depth;
        self
    }
}
