//! Probe log.
//!
//! `ExcInfo` instructions record what `sys.exc_info()[0]` would report at
//! that point in the program. Tests and embedders read the log back to check
//! which exception context each frame observed.

use crate::exception::ExceptionTypeId;
use std::fmt;
use std::sync::Arc;

/// One observation made by an `ExcInfo` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    /// Label given in the bytecode.
    pub label: Arc<str>,
    /// Function whose frame executed the probe.
    pub function: Arc<str>,
    /// Type of the exception being handled, if any.
    pub exception: Option<ExceptionTypeId>,
}

impl ProbeRecord {
    /// Returns the observed exception type's name, or `"None"`.
    pub fn exception_name(&self) -> &'static str {
        self.exception.map_or("None", ExceptionTypeId::name)
    }
}

impl fmt::Display for ProbeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.exception_name())
    }
}

/// Ordered list of probe observations.
#[derive(Debug, Clone, Default)]
pub struct ProbeLog {
    records: Vec<ProbeRecord>,
}

impl ProbeLog {
    /// Creates an empty log.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    #[inline]
    pub fn record(&mut self, record: ProbeRecord) {
        self.records.push(record);
    }

    /// Returns the records in execution order.
    #[inline]
    pub fn records(&self) -> &[ProbeRecord] {
        &self.records
    }

    /// Removes and returns all records.
    #[inline]
    pub fn take(&mut self) -> Vec<ProbeRecord> {
        std::mem::take(&mut self.records)
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
