use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{PlanId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlanError {
    #[error("plan title must not be empty")]
    EmptyTitle,

    #[error("plan is already published")]
    AlreadyPublished,

    #[error("published plan cannot be edited")]
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Draft,
    Published,
}

impl PlanStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Published => "published",
        }
    }
}

/// A curriculum plan authored by a teacher or admin.
///
/// Drafts are editable; publishing is one-way and freezes the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    id: PlanId,
    title: String,
    subject: String,
    grade_level: u8,
    objectives: Vec<String>,
    status: PlanStatus,
    author_id: UserId,
    created_at: DateTime<Utc>,
}

impl Plan {
    /// Build a draft plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptyTitle` when the title is blank.
    pub fn new(
        id: PlanId,
        title: impl Into<String>,
        subject: impl Into<String>,
        grade_level: u8,
        objectives: Vec<String>,
        author_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(PlanError::EmptyTitle);
        }

        Ok(Self {
            id,
            title,
            subject: subject.into(),
            grade_level,
            objectives,
            status: PlanStatus::Draft,
            author_id,
            created_at,
        })
    }

    /// Rehydrate a plan from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::EmptyTitle` when the persisted title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PlanId,
        title: String,
        subject: String,
        grade_level: u8,
        objectives: Vec<String>,
        status: PlanStatus,
        author_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        let mut plan = Self::new(
            id,
            title,
            subject,
            grade_level,
            objectives,
            author_id,
            created_at,
        )?;
        plan.status = status;
        Ok(plan)
    }

    /// Replace the editable fields of a draft.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Frozen` on a published plan, or
    /// `PlanError::EmptyTitle` for a blank title.
    pub fn revise(
        &mut self,
        title: impl Into<String>,
        objectives: Vec<String>,
    ) -> Result<(), PlanError> {
        if self.status == PlanStatus::Published {
            return Err(PlanError::Frozen);
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(PlanError::EmptyTitle);
        }
        self.title = title;
        self.objectives = objectives;
        Ok(())
    }

    /// Publish the plan. One-way.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::AlreadyPublished` on a second publish.
    pub fn publish(&mut self) -> Result<(), PlanError> {
        if self.status == PlanStatus::Published {
            return Err(PlanError::AlreadyPublished);
        }
        self.status = PlanStatus::Published;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> PlanId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn grade_level(&self) -> u8 {
        self.grade_level
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn status(&self) -> PlanStatus {
        self.status
    }

    #[must_use]
    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// AI-generated lesson guide attached to a plan. Plain markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonGuide {
    pub plan_id: PlanId,
    pub title: String,
    pub body_markdown: String,
    pub generated_at: DateTime<Utc>,
}
