use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ClassSessionId, PlanId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassSessionError {
    #[error("class session must end after it starts")]
    InvalidTimeRange,

    #[error("class session subject must not be empty")]
    EmptySubject,
}

/// A scheduled class session on a teacher's calendar, optionally linked to a
/// curriculum plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSession {
    id: ClassSessionId,
    teacher_id: UserId,
    plan_id: Option<PlanId>,
    subject: String,
    room: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl ClassSession {
    /// Build a class session, validating the time range.
    ///
    /// # Errors
    ///
    /// Returns `ClassSessionError::InvalidTimeRange` when `ends_at` is not
    /// after `starts_at`, or `ClassSessionError::EmptySubject` for a blank
    /// subject.
    pub fn new(
        id: ClassSessionId,
        teacher_id: UserId,
        plan_id: Option<PlanId>,
        subject: impl Into<String>,
        room: Option<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, ClassSessionError> {
        if ends_at <= starts_at {
            return Err(ClassSessionError::InvalidTimeRange);
        }
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(ClassSessionError::EmptySubject);
        }

        Ok(Self {
            id,
            teacher_id,
            plan_id,
            subject,
            room,
            starts_at,
            ends_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ClassSessionId {
        self.id
    }

    #[must_use]
    pub fn teacher_id(&self) -> UserId {
        self.teacher_id
    }

    #[must_use]
    pub fn plan_id(&self) -> Option<PlanId> {
        self.plan_id
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// True when two sessions share any instant. Touching boundaries
    /// (one ends exactly when the other starts) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &ClassSession) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn session(id: u64, start_min: i64, end_min: i64) -> ClassSession {
        let base = fixed_now();
        ClassSession::new(
            ClassSessionId::new(id),
            UserId::new(1),
            None,
            "math",
            Some("A-12".into()),
            base + Duration::minutes(start_min),
            base + Duration::minutes(end_min),
        )
        .unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let base = fixed_now();
        let err = ClassSession::new(
            ClassSessionId::new(1),
            UserId::new(1),
            None,
            "math",
            None,
            base,
            base,
        )
        .unwrap_err();
        assert_eq!(err, ClassSessionError::InvalidTimeRange);
    }

    #[test]
    fn overlap_detection() {
        let a = session(1, 0, 60);
        let b = session(2, 30, 90);
        let c = session(3, 60, 120);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // back-to-back is fine
        assert!(!a.overlaps(&c));
    }
}
