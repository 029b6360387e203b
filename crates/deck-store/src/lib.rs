pub mod error;
pub mod paths;
pub mod persistence;
pub mod store;

pub use error::StoreError;
pub use paths::WorkspacePaths;
pub use store::{CompleteInterview, InterviewOutcome, NewTask, StoreEvent, TaskStore};
