//! Business rules over a shared [`Storage`]. Services are cheap handles;
//! a cascade builds the sibling service it needs instead of holding one.

mod group_service;
mod student_service;
mod task_service;

pub use group_service::{
    GroupService, MAX_COURSE, MAX_GROUP_NAME_LEN, MIN_COURSE, validate_course_number,
    validate_group_name,
};
pub use student_service::{MAX_STUDENT_NAME_LEN, StudentService, validate_student_name};
pub use task_service::{TaskService, validate_task_number};

use std::sync::Arc;

use crate::storage::Storage;

#[derive(Clone)]
pub struct Services {
    pub groups: GroupService,
    pub students: StudentService,
    pub tasks: TaskService,
    storage: Arc<dyn Storage>,
}

impl Services {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            groups: GroupService::new(Arc::clone(&storage)),
            students: StudentService::new(Arc::clone(&storage)),
            tasks: TaskService::new(Arc::clone(&storage)),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}
