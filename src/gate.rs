//! Environment gate: skip vs fail for absent infrastructure
//!
//! A missing container engine, task runner or unreachable service is
//! tolerable in a developer's partial environment and intolerable in CI.
//! The decision is an explicit strategy parameter threaded into steps, not
//! an ambient lookup, so it stays testable in isolation. Assertion
//! mismatches never pass through the gate: a system that is present but
//! wrong always fails.

/// Resolution of a missing-dependency condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Prerequisite is met, carry on
    Proceed,
    /// Prerequisite absent and the run is lenient
    Skip,
    /// Prerequisite absent and the run is strict
    Fail,
}

/// Resolve a prerequisite check against the strictness flag
pub fn resolve(condition_met: bool, require: bool) -> Outcome {
    if condition_met {
        Outcome::Proceed
    } else if require {
        Outcome::Fail
    } else {
        Outcome::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_met_condition_always_proceeds() {
        assert_eq!(resolve(true, false), Outcome::Proceed);
        assert_eq!(resolve(true, true), Outcome::Proceed);
    }

    #[test]
    fn test_lenient_missing_dependency_always_skips() {
        assert_eq!(resolve(false, false), Outcome::Skip);
    }

    #[test]
    fn test_strict_missing_dependency_always_fails() {
        assert_eq!(resolve(false, true), Outcome::Fail);
    }
}
