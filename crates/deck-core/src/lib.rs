pub mod proposal;
pub mod repository;
pub mod status;
pub mod types;

pub use proposal::*;
pub use repository::*;
pub use status::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::{ChangeOrigin, Repository, TaskId, TaskStatus};
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_core_types() {
        let _ = TypeId::of::<TaskId>();
        let _ = TypeId::of::<TaskStatus>();
        let _ = TypeId::of::<ChangeOrigin>();
    }

    #[test]
    fn crate_root_reexports_repository() {
        let mut repo = Repository::default();
        let task = repo.create_task("smoke", None, None, None);
        assert_eq!(repo.task(&task.id).map(|t| t.status), Some(TaskStatus::Todo));
    }
}
