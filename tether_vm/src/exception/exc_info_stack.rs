//! Exception info stack.
//!
//! `ExcInfoStack` is the exception-context tracker of one logical call chain:
//! the top entry is "the exception currently being handled", the value
//! `sys.exc_info()` reports.
//!
//! - Entering an `except` block pushes the caught exception.
//! - Leaving it, normally or by propagation, pops back to exactly what was
//!   active before.
//!
//! The VM owns one active stack. Every generator owns a saved stack that is
//! swapped in for the duration of a resume and swapped back out before
//! control returns to the resumer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                ExcInfoStack                 │
//! ├─────────────────────────────────────────────┤
//! │  ┌──────────────┐                           │
//! │  │ ExcInfoEntry │ ◄── Top (being handled)   │
//! │  │ ├─ exception │                           │
//! │  │ ├─ traceback │                           │
//! │  │ └─ flags     │                           │
//! │  ├──────────────┤                           │
//! │  │     ...      │                           │
//! │  └──────────────┘ ◄── Bottom (outermost)    │
//! │                                             │
//! │  Inline capacity: 4 entries                 │
//! │  Max depth: configurable, 255 by default    │
//! └─────────────────────────────────────────────┘
//! ```

use super::object::ExceptionRef;
use super::traceback::Traceback;
use smallvec::SmallVec;
use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Inline capacity for the exception info stack.
/// Handler nesting deeper than four is rare.
const INLINE_CAPACITY: usize = 4;

/// Default maximum stack depth.
pub const DEFAULT_MAX_DEPTH: usize = 255;

// =============================================================================
// EntryFlags
// =============================================================================

/// Flags recorded with an exception info entry.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct EntryFlags(u8);

impl EntryFlags {
    /// No flags set.
    pub const EMPTY: Self = Self(0);

    /// Exception came from an explicit `raise` (vs. a runtime failure).
    pub const EXPLICIT: u8 = 1 << 0;

    /// Exception was delivered into a generator by `throw()`.
    pub const THROWN: u8 = 1 << 1;

    /// Exception was re-raised by a bare `raise`.
    pub const RERAISED: u8 = 1 << 2;

    /// Creates flags from a raw value.
    #[inline]
    pub const fn from_raw(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self.0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Checks if a flag is set.
    #[inline]
    pub const fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }
}

impl fmt::Debug for EntryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.has(Self::EXPLICIT) {
            flags.push("EXPLICIT");
        }
        if self.has(Self::THROWN) {
            flags.push("THROWN");
        }
        if self.has(Self::RERAISED) {
            flags.push("RERAISED");
        }
        write!(f, "EntryFlags({})", flags.join("|"))
    }
}

// =============================================================================
// ExcInfoEntry
// =============================================================================

/// One handled exception on the stack.
#[derive(Clone)]
pub struct ExcInfoEntry {
    exception: ExceptionRef,
    traceback: Traceback,
    flags: EntryFlags,
}

impl ExcInfoEntry {
    /// Creates an entry without traceback.
    #[inline]
    pub fn new(exception: ExceptionRef) -> Self {
        Self {
            exception,
            traceback: Traceback::empty(),
            flags: EntryFlags::EMPTY,
        }
    }

    /// Creates an entry with the traceback the exception carried when caught.
    #[inline]
    pub fn with_traceback(
        exception: ExceptionRef,
        traceback: Traceback,
        flags: EntryFlags,
    ) -> Self {
        Self {
            exception,
            traceback,
            flags,
        }
    }

    /// Returns the handled exception.
    #[inline]
    pub fn exception(&self) -> &ExceptionRef {
        &self.exception
    }

    /// Returns the traceback recorded when the exception was caught.
    #[inline]
    pub fn traceback(&self) -> &Traceback {
        &self.traceback
    }

    /// Returns the entry flags.
    #[inline]
    pub const fn flags(&self) -> EntryFlags {
        self.flags
    }
}

impl fmt::Debug for ExcInfoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcInfoEntry")
            .field("exception", &self.exception)
            .field("frames", &self.traceback.len())
            .field("flags", &self.flags)
            .finish()
    }
}

// =============================================================================
// ExcInfoStack
// =============================================================================

/// Statistics for `ExcInfoStack` operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcInfoStackStats {
    /// Total push operations.
    pub pushes: u32,

    /// Total pop operations (including truncation).
    pub pops: u32,

    /// Peak stack depth reached.
    pub peak_depth: u32,

    /// Number of rejected pushes.
    pub overflows: u32,
}

/// Stack of handled exceptions for one logical call chain.
#[derive(Clone)]
pub struct ExcInfoStack {
    entries: SmallVec<[ExcInfoEntry; INLINE_CAPACITY]>,
    max_depth: usize,
    stats: ExcInfoStackStats,
}

impl ExcInfoStack {
    /// Creates an empty stack with the default depth limit.
    #[inline]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_DEPTH)
    }

    /// Creates an empty stack with the given depth limit.
    #[inline]
    pub fn with_limit(max_depth: usize) -> Self {
        Self {
            entries: SmallVec::new(),
            max_depth,
            stats: ExcInfoStackStats::default(),
        }
    }

    /// Returns true if no exception is being handled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the current depth.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the depth limit.
    #[inline]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the exception currently being handled.
    ///
    /// This is `sys.exc_info()[1]`.
    #[inline]
    pub fn current_exception(&self) -> Option<&ExceptionRef> {
        self.entries.last().map(ExcInfoEntry::exception)
    }

    /// Pushes an entry as the active context.
    ///
    /// Returns `false` if the depth limit is reached; the stack is unchanged.
    #[inline]
    pub fn push(&mut self, entry: ExcInfoEntry) -> bool {
        if self.entries.len() >= self.max_depth {
            self.stats.overflows = self.stats.overflows.saturating_add(1);
            return false;
        }

        self.entries.push(entry);
        self.stats.pushes = self.stats.pushes.saturating_add(1);

        let depth = self.entries.len() as u32;
        if depth > self.stats.peak_depth {
            self.stats.peak_depth = depth;
        }

        true
    }

    /// Pushes `exception` as the active context.
    #[inline]
    pub fn enter_handler(&mut self, exception: ExceptionRef) -> bool {
        self.push(ExcInfoEntry::new(exception))
    }

    /// Pops the active context, restoring the one below it.
    #[inline]
    pub fn exit_handler(&mut self) -> Option<ExcInfoEntry> {
        let entry = self.entries.pop();
        if entry.is_some() {
            self.stats.pops = self.stats.pops.saturating_add(1);
        }
        entry
    }

    /// Returns the top entry.
    #[inline]
    pub fn peek(&self) -> Option<&ExcInfoEntry> {
        self.entries.last()
    }

    /// Pops entries until the stack is `depth` deep.
    ///
    /// Used when an exception propagates out of handler blocks or frames.
    #[inline]
    pub fn truncate(&mut self, depth: usize) {
        if depth < self.entries.len() {
            let popped = u32::try_from(self.entries.len() - depth).unwrap_or(u32::MAX);
            self.stats.pops = self.stats.pops.saturating_add(popped);
            self.entries.truncate(depth);
        }
    }

    /// Pops every entry and releases any spilled storage.
    pub fn clear(&mut self) {
        self.truncate(0);
        self.entries.shrink_to_fit();
    }

    /// Iterates over entries from top to bottom.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ExcInfoEntry> {
        self.entries.iter().rev()
    }

    /// Returns the stack statistics.
    #[inline]
    pub const fn stats(&self) -> &ExcInfoStackStats {
        &self.stats
    }

    /// Exchanges this stack's entries with `other`'s.
    ///
    /// Depth limits and statistics stay with their owners.
    #[inline]
    pub fn swap_contents(&mut self, other: &mut ExcInfoStack) {
        std::mem::swap(&mut self.entries, &mut other.entries);
    }
}

impl Default for ExcInfoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExcInfoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcInfoStack")
            .field("depth", &self.entries.len())
            .field("entries", &self.entries)
            .field("stats", &self.stats)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ExceptionTypeId;

    fn exc(ty: ExceptionTypeId) -> ExceptionRef {
        ExceptionRef::raise(ty, "")
    }

    #[test]
    fn test_entry_flags() {
        let mut flags = EntryFlags::EMPTY;
        assert_eq!(flags.as_raw(), 0);

        flags.set(EntryFlags::THROWN);
        assert!(flags.has(EntryFlags::THROWN));
        assert!(!flags.has(EntryFlags::EXPLICIT));

        let both = EntryFlags::from_raw(EntryFlags::EXPLICIT | EntryFlags::RERAISED);
        let debug = format!("{both:?}");
        assert!(debug.contains("EXPLICIT"));
        assert!(debug.contains("RERAISED"));
    }

    #[test]
    fn test_new_stack_has_no_current_exception() {
        let stack = ExcInfoStack::new();
        assert!(stack.is_empty());
        assert!(stack.current_exception().is_none());
        assert_eq!(stack.max_depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_enter_and_exit_handler_restore_previous() {
        let mut stack = ExcInfoStack::new();
        let outer = exc(ExceptionTypeId::AttributeError);
        let inner = exc(ExceptionTypeId::KeyError);

        assert!(stack.enter_handler(outer.clone()));
        assert_eq!(stack.current_exception(), Some(&outer));

        assert!(stack.enter_handler(inner.clone()));
        assert_eq!(stack.current_exception(), Some(&inner));

        let popped = stack.exit_handler().unwrap();
        assert_eq!(popped.exception(), &inner);
        assert_eq!(stack.current_exception(), Some(&outer));

        stack.exit_handler();
        assert!(stack.current_exception().is_none());
        assert!(stack.exit_handler().is_none());
    }

    #[test]
    fn test_overflow_rejected() {
        let mut stack = ExcInfoStack::with_limit(2);
        assert!(stack.enter_handler(exc(ExceptionTypeId::KeyError)));
        assert!(stack.enter_handler(exc(ExceptionTypeId::KeyError)));
        assert!(!stack.enter_handler(exc(ExceptionTypeId::ValueError)));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.stats().overflows, 1);
        assert_eq!(
            stack.current_exception().unwrap().type_id(),
            ExceptionTypeId::KeyError
        );
    }

    #[test]
    fn test_truncate_counts_pops() {
        let mut stack = ExcInfoStack::new();
        for _ in 0..5 {
            stack.enter_handler(exc(ExceptionTypeId::ValueError));
        }
        stack.truncate(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.stats().pops, 3);

        // Truncating to a larger depth is a no-op.
        stack.truncate(4);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.stats().pops, 3);
    }

    #[test]
    fn test_stats_track_peak_depth() {
        let mut stack = ExcInfoStack::new();
        stack.enter_handler(exc(ExceptionTypeId::KeyError));
        stack.enter_handler(exc(ExceptionTypeId::KeyError));
        stack.exit_handler();
        stack.enter_handler(exc(ExceptionTypeId::KeyError));

        let stats = stack.stats();
        assert_eq!(stats.pushes, 3);
        assert_eq!(stats.pops, 1);
        assert_eq!(stats.peak_depth, 2);
    }

    #[test]
    fn test_stats_saturate() {
        let mut stack = ExcInfoStack::new();
        stack.stats.pushes = u32::MAX;
        stack.stats.pops = u32::MAX - 1;

        stack.enter_handler(exc(ExceptionTypeId::KeyError));
        stack.enter_handler(exc(ExceptionTypeId::KeyError));
        stack.truncate(0);

        assert_eq!(stack.stats().pushes, u32::MAX);
        assert_eq!(stack.stats().pops, u32::MAX);
    }

    #[test]
    fn test_clear_empties_spilled_stack() {
        let mut stack = ExcInfoStack::new();
        for _ in 0..INLINE_CAPACITY + 2 {
            stack.enter_handler(exc(ExceptionTypeId::ValueError));
        }
        stack.clear();

        assert!(stack.is_empty());
        assert_eq!(stack.stats().pops as usize, INLINE_CAPACITY + 2);
        assert!(!stack.entries.spilled());
    }

    #[test]
    fn test_swap_contents_keeps_limits() {
        let mut active = ExcInfoStack::with_limit(8);
        let mut saved = ExcInfoStack::with_limit(3);
        let caller = exc(ExceptionTypeId::AttributeError);
        active.enter_handler(caller.clone());

        active.swap_contents(&mut saved);
        assert!(active.current_exception().is_none());
        assert_eq!(saved.current_exception(), Some(&caller));
        assert_eq!(active.max_depth(), 8);
        assert_eq!(saved.max_depth(), 3);
    }

    #[test]
    fn test_iter_top_to_bottom() {
        let mut stack = ExcInfoStack::new();
        stack.enter_handler(exc(ExceptionTypeId::AttributeError));
        stack.enter_handler(exc(ExceptionTypeId::KeyError));

        let types: Vec<_> = stack.iter().map(|e| e.exception().type_id()).collect();
        assert_eq!(
            types,
            vec![ExceptionTypeId::KeyError, ExceptionTypeId::AttributeError]
        );
    }
}
