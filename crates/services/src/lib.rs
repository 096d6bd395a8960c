#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod generation;
pub mod plan_service;
pub mod quiz_service;
pub mod schedule_service;
pub mod sessions;

pub use cognitia_core::{Clock, Tick};

pub use app_services::AppServices;
pub use error::{
    AppServicesError, GenerationError, PlanServiceError, QuizServiceError, ScheduleServiceError,
    SessionError,
};
pub use generation::{GenerationConfig, GenerationService};
pub use plan_service::PlanService;
pub use quiz_service::{QuestionDraft, QuizDraft, QuizService};
pub use schedule_service::{ScheduleService, SessionRequest};
pub use sessions::{
    AnswerOutcome, AttemptHistory, AttemptHistoryService, AttemptListItem, CountdownRunner,
    QuizSession, QuizSessionService,
};
