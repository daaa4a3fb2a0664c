//! Tri-state result of running a command action.

/// Outcome of a command action.
///
/// Callers usually collapse this to a boolean with [`Outcome::as_bool`],
/// but the distinct [`Outcome::NotApplicable`] variant lets a dispatcher
/// tell "ran and failed" apart from "should not have run".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The action ran and succeeded.
    Success,
    /// The action ran and failed.
    Failure,
    /// The action did not apply to this invocation.
    NotApplicable,
}

impl Outcome {
    /// Collapse to the caller-visible boolean: only `Success` is `true`.
    pub fn as_bool(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Check whether the action ran and succeeded.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Check whether the action did not apply.
    pub fn is_not_applicable(self) -> bool {
        matches!(self, Outcome::NotApplicable)
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        if value { Outcome::Success } else { Outcome::Failure }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_bool() {
        assert!(Outcome::Success.as_bool());
        assert!(!Outcome::Failure.as_bool());
        assert!(!Outcome::NotApplicable.as_bool());
    }

    #[test]
    fn test_not_applicable_is_distinct_from_failure() {
        assert_ne!(Outcome::NotApplicable, Outcome::Failure);
        assert!(Outcome::NotApplicable.is_not_applicable());
        assert!(!Outcome::Failure.is_not_applicable());
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Success);
        assert_eq!(Outcome::from(false), Outcome::Failure);
    }
}
