pub mod attempt;
pub mod hierarchy;
pub mod ids;
pub mod quiz;
pub mod user;

pub use attempt::Attempt;
pub use hierarchy::{Branch, Sector, Specialization};
pub use ids::EntityId;
pub use quiz::{Answer, AnswerKind, Difficulty, Question, Quiz, QuizSummary};
pub use user::User;
