use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::generation::GenerationService;
use crate::plan_service::PlanService;
use crate::quiz_service::QuizService;
use crate::schedule_service::ScheduleService;
use crate::sessions::{AttemptHistoryService, CountdownRunner, QuizSessionService};

/// Assembles app-facing services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz_sessions: Arc<QuizSessionService>,
    attempt_history: Arc<AttemptHistoryService>,
    quiz_service: Arc<QuizService>,
    plan_service: Arc<PlanService>,
    schedule_service: Arc<ScheduleService>,
    generation: Arc<GenerationService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over an already-assembled storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let generation = Arc::new(GenerationService::from_env());

        let quiz_sessions = Arc::new(QuizSessionService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.answers),
        ));
        let attempt_history = Arc::new(AttemptHistoryService::new(
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.quizzes),
        ));
        let quiz_service = Arc::new(QuizService::new(clock, Arc::clone(&storage.quizzes)));
        let plan_service = Arc::new(PlanService::new(
            clock,
            Arc::clone(&storage.plans),
            Arc::clone(&generation),
        ));
        let schedule_service = Arc::new(ScheduleService::new(Arc::clone(&storage.class_sessions)));

        Self {
            quiz_sessions,
            attempt_history,
            quiz_service,
            plan_service,
            schedule_service,
            generation,
        }
    }

    #[must_use]
    pub fn quiz_sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz_sessions)
    }

    /// A countdown runner bound to the session service.
    #[must_use]
    pub fn countdown_runner(&self) -> CountdownRunner {
        CountdownRunner::new(self.quiz_sessions.as_ref().clone())
    }

    #[must_use]
    pub fn attempt_history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.attempt_history)
    }

    #[must_use]
    pub fn quiz_service(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz_service)
    }

    #[must_use]
    pub fn plan_service(&self) -> Arc<PlanService> {
        Arc::clone(&self.plan_service)
    }

    #[must_use]
    pub fn schedule_service(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedule_service)
    }

    #[must_use]
    pub fn generation(&self) -> Arc<GenerationService> {
        Arc::clone(&self.generation)
    }
}
