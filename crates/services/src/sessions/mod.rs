mod runner;
mod session;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use runner::CountdownRunner;
pub use session::QuizSession;
pub use view::{AttemptHistory, AttemptHistoryService, AttemptListItem};
pub use workflow::{AnswerOutcome, QuizSessionService};
