use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new id from its raw value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }

            /// Returns true for the zero id, which no stored row ever carries.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user (any role).
    UserId
);
define_id!(
    /// Unique identifier for a quiz.
    QuizId
);
define_id!(
    /// Unique identifier for a question within a quiz.
    QuestionId
);
define_id!(
    /// Unique identifier for a quiz attempt. Assigned by the store on insert.
    AttemptId
);
define_id!(
    /// Unique identifier for a curriculum plan.
    PlanId
);
define_id!(
    /// Unique identifier for a scheduled class session.
    ClassSessionId
);

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_id_display() {
        let id = QuizId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn attempt_id_from_str() {
        let id: AttemptId = "123".parse().unwrap();
        assert_eq!(id, AttemptId::new(123));
    }

    #[test]
    fn user_id_from_str_invalid() {
        let result = "not-a-number".parse::<UserId>();
        assert!(result.is_err());
    }

    #[test]
    fn nil_id_is_flagged() {
        assert!(UserId::new(0).is_nil());
        assert!(!UserId::new(7).is_nil());
    }

    #[test]
    fn id_roundtrip() {
        let original = QuestionId::new(99);
        let deserialized: QuestionId = original.to_string().parse().unwrap();
        assert_eq!(original, deserialized);
    }
}
