//! Traceback and frame information.
//!
//! A traceback is built while an exception unwinds: each frame the exception
//! leaves adds one entry at the outer end. Generator frames take part like
//! any other frame, so a raise that escapes a generator lists the generator
//! body followed by (outward) the frame that resumed it.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Frame Information
// ============================================================================

/// Information about a single frame in a traceback.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Name of the function or generator.
    pub func_name: Arc<str>,

    /// Filename (module path).
    pub filename: Arc<str>,

    /// Instruction offset at the time the exception passed through.
    pub bytecode_offset: u32,

    /// Line number (0 when the code object has no line table).
    pub line_number: u32,
}

impl FrameInfo {
    /// Creates a new frame info.
    #[inline]
    pub fn new(
        func_name: Arc<str>,
        filename: Arc<str>,
        bytecode_offset: u32,
        line_number: u32,
    ) -> Self {
        Self {
            func_name,
            filename,
            bytecode_offset,
            line_number,
        }
    }
}

impl fmt::Debug for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameInfo")
            .field("func_name", &self.func_name)
            .field("filename", &self.filename)
            .field("offset", &self.bytecode_offset)
            .field("line_number", &self.line_number)
            .finish()
    }
}

// ============================================================================
// Traceback
// ============================================================================

/// Number of frames stored inline.
const INLINE_FRAMES: usize = 8;

/// Frames an exception has passed through, outermost first.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Traceback {
    frames: SmallVec<[FrameInfo; INLINE_FRAMES]>,
}

impl Traceback {
    /// Creates an empty traceback.
    #[inline]
    pub fn empty() -> Self {
        Self {
            frames: SmallVec::new(),
        }
    }

    /// Creates a traceback from frames ordered outermost first.
    pub fn from_frames(frames: impl IntoIterator<Item = FrameInfo>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Returns true if the traceback has no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Records a frame the exception is leaving, outside all recorded frames.
    #[inline]
    pub fn push_outer(&mut self, frame: FrameInfo) {
        self.frames.insert(0, frame);
    }

    /// Removes the outermost frame.
    #[inline]
    pub fn pop_outer(&mut self) -> Option<FrameInfo> {
        if self.frames.is_empty() {
            None
        } else {
            Some(self.frames.remove(0))
        }
    }

    /// Iterates over the frames, outermost first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FrameInfo> {
        self.frames.iter()
    }

    /// Returns the frame where the exception was raised.
    #[inline]
    pub fn innermost(&self) -> Option<&FrameInfo> {
        self.frames.last()
    }

    /// Returns the outermost frame.
    #[inline]
    pub fn outermost(&self) -> Option<&FrameInfo> {
        self.frames.first()
    }

    /// Returns the function names, outermost first.
    pub fn func_names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| &*f.func_name).collect()
    }
}

impl fmt::Debug for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames.iter()).finish()
    }
}

impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Traceback (most recent call last):")?;
        for frame in &self.frames {
            writeln!(
                f,
                "  File \"{}\", line {}, in {}",
                frame.filename, frame.line_number, frame.func_name
            )?;
        }
        Ok(())
    }
}
