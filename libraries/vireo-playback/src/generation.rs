//! Selection versioning
//!
//! Every stream selection advances a shared counter. Asynchronous work
//! captures the value it was started under and compares it against the
//! counter before applying its result, so completions belonging to a
//! superseded selection are detected structurally.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Version stamp of one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic selection counter shared between the owner and its loads
#[derive(Debug, Clone, Default)]
pub struct SelectionVersion(Arc<AtomicU64>);

impl SelectionVersion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new selection, superseding every earlier one
    pub fn advance(&self) -> Generation {
        Generation(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> Generation {
        Generation(self.0.load(Ordering::Acquire))
    }

    /// Guard bound to the current selection
    pub fn guard(&self) -> SelectionGuard {
        SelectionGuard {
            version: self.clone(),
            generation: self.current(),
        }
    }
}

/// Ownership marker carried by in-flight work
#[derive(Debug, Clone)]
pub struct SelectionGuard {
    version: SelectionVersion,
    generation: Generation,
}

impl SelectionGuard {
    pub fn new(version: SelectionVersion, generation: Generation) -> Self {
        Self {
            version,
            generation,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether the selection this guard was issued for is still the latest
    pub fn is_current(&self) -> bool {
        self.version.current() == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_supersedes_guards() {
        let version = SelectionVersion::new();
        let first = version.advance();
        let guard = version.guard();
        assert_eq!(guard.generation(), first);
        assert!(guard.is_current());

        let second = version.advance();
        assert!(second > first);
        assert!(!guard.is_current());
    }

    #[test]
    fn clones_share_the_counter() {
        let version = SelectionVersion::new();
        let clone = version.clone();
        clone.advance();
        assert_eq!(version.current(), clone.current());
    }
}
