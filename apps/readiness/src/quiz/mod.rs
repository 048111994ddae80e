pub mod runner;
pub mod scoring;
pub mod session;
pub mod timer;

pub use runner::{run_session, SessionCommand, SessionEvent};
pub use session::{QuestionView, QuizSession, SessionState};
