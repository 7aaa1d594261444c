// cluster-test-orchestrator: scenario-driven orchestration, stat ingestion
// and offline analysis for gossip-membership cluster tests.
// Copyright (C) 2026 the project contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Assertions against a measured [`Value`]: either equality (`is`) or
//! inclusive-range membership (`in`).

use std::fmt;

use crate::error::AssertionError;
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
pub enum Assertion {
    Is(Value),
    In(Value, Value),
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Is(v) => write!(f, "is {v}"),
            Assertion::In(low, high) => write!(f, "in ({low},{high})"),
        }
    }
}

impl Assertion {
    /// Check `measured` against this assertion. Mirrors the original
    /// reflect-based type check: comparing a number against a duration bound
    /// (or vice versa) is a type mismatch, never a coercion.
    pub fn check(&self, measured: Value) -> Result<(), AssertionError> {
        match self {
            Assertion::Is(expected) => {
                if std::mem::discriminant(expected) != std::mem::discriminant(&measured) {
                    return Err(AssertionError::TypeMismatch(
                        measured.kind().to_string(),
                        expected.kind().to_string(),
                    ));
                }
                if values_equal(measured, *expected) {
                    Ok(())
                } else {
                    Err(AssertionError::NotEqual(
                        measured.to_string(),
                        expected.to_string(),
                    ))
                }
            }
            Assertion::In(low, high) => {
                if std::mem::discriminant(low) != std::mem::discriminant(&measured)
                    || std::mem::discriminant(high) != std::mem::discriminant(&measured)
                {
                    return Err(AssertionError::TypeMismatch(
                        measured.kind().to_string(),
                        low.kind().to_string(),
                    ));
                }
                if in_range(measured, *low, *high) {
                    Ok(())
                } else {
                    Err(AssertionError::NotInRange(
                        measured.to_string(),
                        low.to_string(),
                        high.to_string(),
                    ))
                }
            }
        }
    }
}

fn values_equal(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Duration(x), Value::Duration(y)) => x == y,
        _ => false,
    }
}

/// Inclusive on both endpoints: `low <= v <= high`.
fn in_range(v: Value, low: Value, high: Value) -> bool {
    match (v, low, high) {
        (Value::Number(v), Value::Number(low), Value::Number(high)) => v >= low && v <= high,
        (Value::Duration(v), Value::Duration(low), Value::Duration(high)) => {
            v >= low && v <= high
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn renders_is_and_in() {
        assert_eq!(Assertion::Is(Value::Number(2.0)).to_string(), "is 2");
        assert_eq!(
            Assertion::In(Value::Number(1.0), Value::Number(3.0)).to_string(),
            "in (1,3)"
        );
    }

    #[test]
    fn is_passes_on_equal_numbers() {
        let a = Assertion::Is(Value::Number(3.0));
        assert!(a.check(Value::Number(3.0)).is_ok());
    }

    #[test]
    fn is_fails_on_unequal_durations_with_message() {
        let a = Assertion::Is(Value::Duration(Duration::from_secs(2)));
        let err = a.check(Value::Duration(Duration::from_secs(3))).unwrap_err();
        assert_eq!(err.to_string(), "assertion failed: expected 2s got 3s");
    }

    #[test]
    fn type_mismatch_number_vs_duration() {
        let a = Assertion::Is(Value::Duration(Duration::from_secs(2)));
        assert!(matches!(
            a.check(Value::Number(2.0)),
            Err(AssertionError::TypeMismatch(_, _))
        ));
    }

    #[test]
    fn in_range_is_inclusive_on_both_endpoints() {
        let a = Assertion::In(Value::Number(1.0), Value::Number(3.0));
        assert!(a.check(Value::Number(1.0)).is_ok());
        assert!(a.check(Value::Number(2.0)).is_ok());
        assert!(a.check(Value::Number(3.0)).is_ok());
        assert!(a.check(Value::Number(0.0)).is_err());
        assert!(a.check(Value::Number(4.0)).is_err());
    }

    #[test]
    fn in_range_type_mismatch_against_duration() {
        let a = Assertion::In(Value::Number(1.0), Value::Number(3.0));
        assert!(matches!(
            a.check(Value::Duration(Duration::from_secs(2))),
            Err(AssertionError::TypeMismatch(_, _))
        ));
    }
}
