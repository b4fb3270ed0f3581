//! Non-fatal diagnostics raised while building.
//!
//! Anything the build can recover from (a missing motivation, an empty
//! manifest, an unreadable audio file) becomes an [`Advisory`] handed to an
//! [`AdvisorySink`] and the build carries on. Only structural failures are
//! errors.
//!
//! Two sinks ship with the crate:
//!
//! - [`TracingSink`] logs each advisory as a `tracing` warning and counts
//!   them for the end-of-build summary.
//! - [`RecordingSink`] keeps every advisory in memory, for `check` and for
//!   tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdvisoryKind {
    /// The annotation mapping or a sidecar leaves something undetermined.
    ConfigurationGap,
    /// A node produced no content.
    MissingContent,
    /// The directory layout mixes shapes; part of it is ignored.
    AmbiguousStructure,
    /// A media file could not be probed or a thumbnail not generated.
    ProbeFailure,
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdvisoryKind::ConfigurationGap => "configuration gap",
            AdvisoryKind::MissingContent => "missing content",
            AdvisoryKind::AmbiguousStructure => "ambiguous structure",
            AdvisoryKind::ProbeFailure => "probe failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub path: PathBuf,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.message, self.path.display())
    }
}

/// Receiver of advisories. Called concurrently from worker threads.
pub trait AdvisorySink: Sync {
    fn advise(&self, advisory: Advisory);
}

/// Logs advisories as warnings and counts them.
#[derive(Debug, Default)]
pub struct TracingSink {
    count: AtomicUsize,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl AdvisorySink for TracingSink {
    fn advise(&self, advisory: Advisory) {
        self.count.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            kind = %advisory.kind,
            path = %advisory.path.display(),
            "{}",
            advisory.message
        );
    }
}

/// Keeps advisories in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    advisories: Mutex<Vec<Advisory>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All advisories, sorted by path then kind so output is stable
    /// regardless of worker scheduling.
    pub fn advisories(&self) -> Vec<Advisory> {
        let mut all = self
            .advisories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        all.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.kind.cmp(&b.kind))
                .then_with(|| a.message.cmp(&b.message))
        });
        all
    }

    pub fn of_kind(&self, kind: AdvisoryKind) -> Vec<Advisory> {
        self.advisories()
            .into_iter()
            .filter(|a| a.kind == kind)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl AdvisorySink for RecordingSink {
    fn advise(&self, advisory: Advisory) {
        tracing::debug!(kind = %advisory.kind, path = %advisory.path.display(), "{}", advisory.message);
        self.advisories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(advisory);
    }
}
