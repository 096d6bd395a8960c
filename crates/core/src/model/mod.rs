mod answer;
mod attempt;
mod ids;
mod plan;
mod quiz;
mod schedule;
mod user;

pub use ids::{AttemptId, ClassSessionId, ParseIdError, PlanId, QuestionId, QuizId, UserId};

pub use answer::{Answer, AttemptResult, score_percent};
pub use attempt::{Attempt, AttemptError, AttemptStatus};
pub use plan::{LessonGuide, Plan, PlanError, PlanStatus};
pub use quiz::{Question, QuestionKind, Quiz, QuizError};
pub use schedule::{ClassSession, ClassSessionError};
pub use user::{Role, UserRef};
