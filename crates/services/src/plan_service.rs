use std::sync::Arc;

use cognitia_core::Clock;
use cognitia_core::model::{LessonGuide, Plan, PlanId, UserRef};
use storage::repository::{NewPlanRecord, PlanRepository};

use crate::error::PlanServiceError;
use crate::generation::GenerationService;

/// Curriculum plan authoring: drafts, revision, publishing, and guide
/// generation. Authoring is gated on the caller's role.
#[derive(Clone)]
pub struct PlanService {
    clock: Clock,
    plans: Arc<dyn PlanRepository>,
    generation: Arc<GenerationService>,
}

impl PlanService {
    #[must_use]
    pub fn new(
        clock: Clock,
        plans: Arc<dyn PlanRepository>,
        generation: Arc<GenerationService>,
    ) -> Self {
        Self {
            clock,
            plans,
            generation,
        }
    }

    /// Create a draft plan owned by `author`.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Forbidden` unless the author's role may
    /// author plans, `Plan` for invalid content, `Storage` for store
    /// failures.
    pub async fn create(
        &self,
        author: &UserRef,
        title: &str,
        subject: &str,
        grade_level: u8,
        objectives: Vec<String>,
    ) -> Result<PlanId, PlanServiceError> {
        if !author.role.can_author() {
            return Err(PlanServiceError::Forbidden);
        }

        let created_at = self.clock.now();
        // validation runs on a placeholder id; the store assigns the real one
        let plan = Plan::new(
            PlanId::new(1),
            title,
            subject,
            grade_level,
            objectives,
            author.id,
            created_at,
        )?;

        let record = NewPlanRecord {
            title: plan.title().to_owned(),
            subject: plan.subject().to_owned(),
            grade_level: plan.grade_level(),
            objectives: plan.objectives().to_vec(),
            author_id: plan.author_id(),
            created_at: plan.created_at(),
        };
        Ok(self.plans.insert_plan(record).await?)
    }

    /// Fetch a plan by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` on store failures.
    pub async fn get(&self, id: PlanId) -> Result<Option<Plan>, PlanServiceError> {
        Ok(self.plans.get_plan(id).await?)
    }

    /// List plans by author, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` on store failures.
    pub async fn list_by_author(
        &self,
        author: &UserRef,
        limit: u32,
    ) -> Result<Vec<Plan>, PlanServiceError> {
        Ok(self.plans.list_by_author(author.id, limit).await?)
    }

    /// Replace a draft's title and objectives.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::NotFound` for an unknown plan,
    /// `PlanServiceError::Plan` when the plan is already published.
    pub async fn revise(
        &self,
        author: &UserRef,
        plan_id: PlanId,
        title: &str,
        objectives: Vec<String>,
    ) -> Result<Plan, PlanServiceError> {
        let mut plan = self.load_owned(author, plan_id).await?;
        plan.revise(title, objectives)?;
        self.plans.update_plan(&plan).await?;
        Ok(plan)
    }

    /// Publish a draft. One-way.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Plan` on a second publish.
    pub async fn publish(
        &self,
        author: &UserRef,
        plan_id: PlanId,
    ) -> Result<Plan, PlanServiceError> {
        let mut plan = self.load_owned(author, plan_id).await?;
        plan.publish()?;
        self.plans.update_plan(&plan).await?;
        Ok(plan)
    }

    /// Generate a lesson guide for a plan and attach it, replacing any
    /// earlier guide.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Generation` when the completion endpoint
    /// is disabled or fails.
    pub async fn generate_guide(
        &self,
        author: &UserRef,
        plan_id: PlanId,
    ) -> Result<LessonGuide, PlanServiceError> {
        let plan = self.load_owned(author, plan_id).await?;
        let body_markdown = self.generation.draft_lesson_guide(&plan).await?;

        let guide = LessonGuide {
            plan_id,
            title: format!("{} guide", plan.title()),
            body_markdown,
            generated_at: self.clock.now(),
        };
        self.plans.save_guide(&guide).await?;
        Ok(guide)
    }

    /// Fetch the stored guide of a plan, if one was generated.
    ///
    /// # Errors
    ///
    /// Returns `PlanServiceError::Storage` on store failures.
    pub async fn guide(&self, plan_id: PlanId) -> Result<Option<LessonGuide>, PlanServiceError> {
        Ok(self.plans.guide_for_plan(plan_id).await?)
    }

    async fn load_owned(
        &self,
        author: &UserRef,
        plan_id: PlanId,
    ) -> Result<Plan, PlanServiceError> {
        if !author.role.can_author() {
            return Err(PlanServiceError::Forbidden);
        }
        let plan = self
            .plans
            .get_plan(plan_id)
            .await?
            .ok_or(PlanServiceError::NotFound)?;
        // admins may touch any plan, teachers only their own
        if plan.author_id() != author.id && !author.role.is_admin() {
            return Err(PlanServiceError::Forbidden);
        }
        Ok(plan)
    }
}
