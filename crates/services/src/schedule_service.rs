use std::sync::Arc;

use chrono::{DateTime, Utc};

use cognitia_core::model::{ClassSession, ClassSessionId, PlanId, UserRef};
use storage::repository::{ClassSessionRepository, NewClassSessionRecord};

use crate::error::ScheduleServiceError;

/// Input for scheduling a class session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub plan_id: Option<PlanId>,
    pub subject: String,
    pub room: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Teacher calendar: scheduling with overlap rejection, agenda lookup,
/// cancellation.
#[derive(Clone)]
pub struct ScheduleService {
    class_sessions: Arc<dyn ClassSessionRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(class_sessions: Arc<dyn ClassSessionRepository>) -> Self {
        Self { class_sessions }
    }

    /// Put a session on the teacher's calendar.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Session` for an invalid time range or
    /// blank subject, `Overlap` when the slot collides with an existing
    /// session of the same teacher, `Storage` for store failures.
    pub async fn schedule(
        &self,
        teacher: &UserRef,
        request: SessionRequest,
    ) -> Result<ClassSessionId, ScheduleServiceError> {
        // validation runs on a placeholder id; the store assigns the real one
        let candidate = ClassSession::new(
            ClassSessionId::new(1),
            teacher.id,
            request.plan_id,
            request.subject,
            request.room,
            request.starts_at,
            request.ends_at,
        )?;

        let existing = self
            .class_sessions
            .sessions_for_teacher(teacher.id, candidate.starts_at(), candidate.ends_at())
            .await?;
        if existing.iter().any(|s| s.overlaps(&candidate)) {
            return Err(ScheduleServiceError::Overlap);
        }

        let record = NewClassSessionRecord {
            teacher_id: teacher.id,
            plan_id: candidate.plan_id(),
            subject: candidate.subject().to_owned(),
            room: candidate.room().map(ToOwned::to_owned),
            starts_at: candidate.starts_at(),
            ends_at: candidate.ends_at(),
        };
        Ok(self.class_sessions.insert_class_session(record).await?)
    }

    /// List a teacher's sessions intersecting `[from, until)`, ordered by
    /// start time.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` on store failures.
    pub async fn agenda(
        &self,
        teacher: &UserRef,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClassSession>, ScheduleServiceError> {
        Ok(self
            .class_sessions
            .sessions_for_teacher(teacher.id, from, until)
            .await?)
    }

    /// Take a session off the calendar.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleServiceError::Storage` with `NotFound` for an
    /// unknown session.
    pub async fn cancel(&self, id: ClassSessionId) -> Result<(), ScheduleServiceError> {
        Ok(self.class_sessions.delete_class_session(id).await?)
    }
}
