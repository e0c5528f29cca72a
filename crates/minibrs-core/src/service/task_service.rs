use std::sync::Arc;

use uuid::Uuid;

use crate::error::{MinibrsError, Result};
use crate::models::{REQUIRED_TASKS, Task, TaskStatus};
use crate::storage::Storage;

#[derive(Clone)]
pub struct TaskService {
    storage: Arc<dyn Storage>,
}

impl TaskService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create tasks `1..=REQUIRED_TASKS` for a new student, none submitted.
    pub fn initialize_student_tasks(&self, student_id: Uuid) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = (1..=REQUIRED_TASKS)
            .map(|number| Task::new(student_id, number))
            .collect();
        for task in &tasks {
            self.storage.tasks().save(task)?;
        }
        tracing::debug!(%student_id, count = tasks.len(), "initialized student tasks");
        Ok(tasks)
    }

    pub fn update_task_status(&self, task_id: Uuid, status: TaskStatus) -> Result<Task> {
        let mut task = self.get_task_by_id(task_id)?;
        if !self.storage.tasks().update_status(&task_id, status)? {
            return Err(MinibrsError::TaskNotFound(task_id.to_string()));
        }
        task.status = status;
        tracing::info!(%task_id, number = task.number, status = status.as_str(), "task status updated");
        Ok(task)
    }

    pub fn get_task_by_id(&self, task_id: Uuid) -> Result<Task> {
        self.storage
            .tasks()
            .find_by_id(&task_id)?
            .ok_or_else(|| MinibrsError::TaskNotFound(task_id.to_string()))
    }

    pub fn get_all_tasks(&self) -> Result<Vec<Task>> {
        self.storage.tasks().list()
    }

    /// Ordered by task number.
    pub fn get_tasks_by_student(&self, student_id: Uuid) -> Result<Vec<Task>> {
        self.storage.tasks().list_by_student(&student_id)
    }

    pub fn get_completed_tasks_count(&self, student_id: Uuid) -> Result<usize> {
        self.storage
            .tasks()
            .count_by_student_and_status(&student_id, TaskStatus::Submitted)
    }

    pub fn get_pending_tasks_count(&self, student_id: Uuid) -> Result<usize> {
        self.storage
            .tasks()
            .count_by_student_and_status(&student_id, TaskStatus::NotSubmitted)
    }

    pub fn get_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.storage.tasks().list_by_status(status)
    }

    pub fn get_task_by_student_and_number(&self, student_id: Uuid, number: u32) -> Result<Task> {
        self.storage
            .tasks()
            .find_by_student_and_number(&student_id, number)?
            .ok_or_else(|| {
                MinibrsError::TaskNotFound(format!("task #{number} for student {student_id}"))
            })
    }

    pub fn task_exists_by_student_and_number(&self, student_id: Uuid, number: u32) -> Result<bool> {
        Ok(self
            .storage
            .tasks()
            .find_by_student_and_number(&student_id, number)?
            .is_some())
    }

    pub fn delete_student_tasks(&self, student_id: Uuid) -> Result<usize> {
        self.storage.tasks().delete_by_student(&student_id)
    }

    pub fn get_total_tasks_count(&self) -> Result<usize> {
        self.storage.tasks().count()
    }

    pub fn get_tasks_count_by_status(&self, status: TaskStatus) -> Result<usize> {
        self.storage.tasks().count_by_status(status)
    }

    pub fn mark_task(&self, student_id: Uuid, number: u32) -> Result<Task> {
        self.set_status(student_id, number, TaskStatus::Submitted)
    }

    pub fn reset_task(&self, student_id: Uuid, number: u32) -> Result<Task> {
        self.set_status(student_id, number, TaskStatus::NotSubmitted)
    }

    fn set_status(&self, student_id: Uuid, number: u32, status: TaskStatus) -> Result<Task> {
        validate_task_number(number)?;
        let task = self.get_task_by_student_and_number(student_id, number)?;
        self.update_task_status(task.id, status)
    }
}

pub fn validate_task_number(number: u32) -> Result<()> {
    if !(1..=REQUIRED_TASKS).contains(&number) {
        return Err(MinibrsError::Validation(format!(
            "Task number must be between 1 and {REQUIRED_TASKS}"
        )));
    }
    Ok(())
}
