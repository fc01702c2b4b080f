//! Versioned aggregates: pure decisions over a document the store writes
//! back with an optimistic version check.

use crate::error::{DomainError, DomainResult};

/// Identity and version of a stored aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Bumped by one for every applied event. A ticket that was never
    /// created sits at zero.
    fn version(&self) -> u64;
}

/// What the store must find before it accepts a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Unconditional write.
    Any,
    /// The stored copy is still at this version, i.e. nobody wrote since we read.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "record was modified concurrently (expected: {self:?}, actual: {actual})"
        )))
    }
}

/// Command handling split into a side-effect-free decision (`handle`) and a
/// state fold (`apply`). Persistence and mail stay with the caller.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    /// Events the command produces against the current state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// `handle`, then `apply` each event in order. Nothing is applied when
    /// the decision fails.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        total: u32,
        version: u64,
    }

    impl AggregateRoot for Counter {
        type Id = u8;

        fn id(&self) -> &u8 {
            &0
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    impl Aggregate for Counter {
        type Command = u32;
        type Event = u32;
        type Error = DomainError;

        fn apply(&mut self, event: &u32) {
            self.total += event;
            self.version += 1;
        }

        fn handle(&self, command: &u32) -> Result<Vec<u32>, DomainError> {
            if *command == 0 {
                return Err(DomainError::validation("nothing to add"));
            }
            Ok(vec![*command; 2])
        }
    }

    #[test]
    fn any_matches_every_version() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
    }

    #[test]
    fn exact_mismatch_is_a_conflict() {
        let err = ExpectedVersion::Exact(3).check(4).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(ExpectedVersion::Exact(4).check(4).is_ok());
    }

    #[test]
    fn execute_applies_every_event_or_none() {
        let mut counter = Counter::default();
        assert_eq!(counter.execute(&3).unwrap(), vec![3, 3]);
        assert_eq!((counter.total, counter.version()), (6, 2));

        assert!(counter.execute(&0).is_err());
        assert_eq!((counter.total, counter.version()), (6, 2));
    }
}
