#![forbid(unsafe_code)]

pub mod calendar;
pub mod catalog;
pub mod evaluator;
pub mod model;
pub mod notify;
pub mod quiz_session;
pub mod time;

pub use evaluator::{ProgressSummary, QuizStats, evaluate};
pub use notify::{NotificationTrigger, ProgressEvent};
pub use quiz_session::{QuizError, QuizResult, QuizSession};
pub use time::Clock;
