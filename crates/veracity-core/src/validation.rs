//! A single driver for running validation checks under either aggregation
//! policy, with explicit prerequisite (hard) edges.
use serde::{Deserialize, Serialize};

/// Whether validation returns on the first error or collects all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailFast {
    /// Run every independent check and aggregate all errors.
    AllErrors,
    /// Return on the first failing check.
    FirstError,
}

/// One check in a validation pipeline. A `hard` unit is a prerequisite: its
/// failure stops the remaining units even under [`FailFast::AllErrors`],
/// since they consume its output.
pub(crate) struct ValidationUnit<'a, E> {
    hard: bool,
    check: Box<dyn FnOnce() -> Result<(), E> + 'a>,
}

impl<'a, E> ValidationUnit<'a, E> {
    pub(crate) fn soft(check: impl FnOnce() -> Result<(), E> + 'a) -> Self {
        Self {
            hard: false,
            check: Box::new(check),
        }
    }

    pub(crate) fn hard(check: impl FnOnce() -> Result<(), E> + 'a) -> Self {
        Self {
            hard: true,
            check: Box::new(check),
        }
    }
}

/// Runs `units` in order under the aggregation policy, returning every error
/// encountered (empty means success).
pub(crate) fn run_units<E>(fail_fast: FailFast, units: Vec<ValidationUnit<'_, E>>) -> Vec<E> {
    let mut errors = Vec::new();
    for unit in units {
        if let Err(error) = (unit.check)() {
            let hard = unit.hard;
            errors.push(error);
            if hard || fail_fast == FailFast::FirstError {
                break;
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_errors_collects_soft_failures() {
        let units = vec![
            ValidationUnit::soft(|| Err("first")),
            ValidationUnit::soft(|| Ok(())),
            ValidationUnit::soft(|| Err("third")),
        ];
        assert_eq!(run_units(FailFast::AllErrors, units), vec!["first", "third"]);
    }

    #[test]
    fn first_error_stops_immediately() {
        let mut ran_third = false;
        let units = vec![
            ValidationUnit::soft(|| Err("first")),
            ValidationUnit::soft(|| {
                ran_third = true;
                Ok(())
            }),
        ];
        assert_eq!(run_units(FailFast::FirstError, units), vec!["first"]);
        assert!(!ran_third);
    }

    #[test]
    fn hard_failure_blocks_dependent_units() {
        let units = vec![
            ValidationUnit::soft(|| Err("soft")),
            ValidationUnit::hard(|| Err("hard")),
            ValidationUnit::soft(|| Err("never reached")),
        ];
        assert_eq!(run_units(FailFast::AllErrors, units), vec!["soft", "hard"]);
    }

    #[test]
    fn success_is_empty() {
        let units: Vec<ValidationUnit<'_, &str>> = vec![
            ValidationUnit::hard(|| Ok(())),
            ValidationUnit::soft(|| Ok(())),
        ];
        assert!(run_units(FailFast::AllErrors, units).is_empty());
    }
}
