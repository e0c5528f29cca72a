use std::sync::Arc;

use uuid::Uuid;

use crate::error::{MinibrsError, Result};
use crate::models::{Student, Task};
use crate::storage::Storage;

use super::TaskService;

pub const MAX_STUDENT_NAME_LEN: usize = 100;

#[derive(Clone)]
pub struct StudentService {
    storage: Arc<dyn Storage>,
}

impl StudentService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn tasks(&self) -> TaskService {
        TaskService::new(Arc::clone(&self.storage))
    }

    /// Create a student in an existing group together with its tasks.
    pub fn create_student(&self, name: &str, group_id: Uuid) -> Result<Student> {
        validate_student_name(name)?;
        let _guard = self.storage.write_lock();
        self.ensure_group(group_id)?;

        let student = Student::new(name.trim(), group_id);
        self.storage.students().save(&student)?;
        if let Err(e) = self.tasks().initialize_student_tasks(student.id) {
            tracing::warn!(id = %student.id, error = %e, "task setup failed, removing student");
            self.remove_with_tasks(student.id)?;
            return Err(e);
        }

        tracing::info!(id = %student.id, name = %student.name, %group_id, "student created");
        Ok(student)
    }

    /// Delete a student and its tasks.
    pub fn delete_student(&self, student_id: Uuid) -> Result<()> {
        let _guard = self.storage.write_lock();
        if !self.storage.students().exists(&student_id)? {
            return Err(MinibrsError::StudentNotFound(student_id));
        }
        self.remove_with_tasks(student_id)
    }

    /// Tasks first, then the student. Callers hold the storage write lock.
    pub(super) fn remove_with_tasks(&self, student_id: Uuid) -> Result<()> {
        let tasks = self.tasks().delete_student_tasks(student_id)?;
        self.storage.students().delete(&student_id)?;
        tracing::info!(id = %student_id, tasks, "student deleted");
        Ok(())
    }

    pub fn get_all_students(&self) -> Result<Vec<Student>> {
        self.storage.students().list()
    }

    pub fn get_students_by_group(&self, group_id: Uuid) -> Result<Vec<Student>> {
        self.ensure_group(group_id)?;
        self.storage.students().list_by_group(&group_id)
    }

    pub fn get_student_by_id(&self, student_id: Uuid) -> Result<Student> {
        self.storage
            .students()
            .find_by_id(&student_id)?
            .ok_or(MinibrsError::StudentNotFound(student_id))
    }

    /// Rename a student and optionally move it to another group.
    pub fn update_student(
        &self,
        student_id: Uuid,
        new_name: &str,
        new_group_id: Option<Uuid>,
    ) -> Result<Student> {
        validate_student_name(new_name)?;
        let _guard = self.storage.write_lock();
        let mut student = self.get_student_by_id(student_id)?;
        student.name = new_name.trim().to_string();

        if let Some(group_id) = new_group_id {
            self.ensure_group(group_id)?;
            student.group_id = group_id;
        }

        self.storage.students().save(&student)?;
        tracing::info!(id = %student.id, name = %student.name, "student updated");
        Ok(student)
    }

    pub fn get_student_tasks(&self, student_id: Uuid) -> Result<Vec<Task>> {
        if !self.storage.students().exists(&student_id)? {
            return Err(MinibrsError::StudentNotFound(student_id));
        }
        self.tasks().get_tasks_by_student(student_id)
    }

    /// Exact name match.
    pub fn find_students_by_name(&self, name: &str) -> Result<Vec<Student>> {
        self.storage.students().find_by_name(name)
    }

    pub fn get_students_count_by_group(&self, group_id: Uuid) -> Result<usize> {
        self.storage.students().count_by_group(&group_id)
    }

    pub fn student_exists_by_name_and_group(&self, name: &str, group_id: Uuid) -> Result<bool> {
        self.storage
            .students()
            .exists_by_name_and_group(name, &group_id)
    }

    fn ensure_group(&self, group_id: Uuid) -> Result<()> {
        if !self.storage.groups().exists(&group_id)? {
            return Err(MinibrsError::GroupNotFound(group_id));
        }
        Ok(())
    }
}

pub fn validate_student_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MinibrsError::Validation(
            "Student name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_STUDENT_NAME_LEN {
        return Err(MinibrsError::Validation(format!(
            "Student name is too long (max {MAX_STUDENT_NAME_LEN} characters)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{for_each_backend, seed_student};

    #[test]
    fn test_create_student_trims_name_and_creates_tasks() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();
            let student = services
                .students
                .create_student("  Ivan Ivanov  ", group.id)
                .unwrap();

            assert_eq!(student.name, "Ivan Ivanov");
            assert_eq!(services.students.get_student_tasks(student.id).unwrap().len(), 3);
            assert!(
                services
                    .students
                    .student_exists_by_name_and_group("Ivan Ivanov", group.id)
                    .unwrap()
            );
        });
    }

    #[test]
    fn test_create_student_validation() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();

            let too_long = "x".repeat(101);
            for name in ["", "   ", too_long.as_str()] {
                assert!(matches!(
                    services.students.create_student(name, group.id),
                    Err(MinibrsError::Validation(_))
                ));
            }
            assert!(services.students.create_student(&"x".repeat(100), group.id).is_ok());

            let missing = Uuid::new_v4();
            assert!(matches!(
                services.students.create_student("Ivan", missing),
                Err(MinibrsError::GroupNotFound(id)) if id == missing
            ));
        });
    }

    #[test]
    fn test_delete_student_removes_tasks() {
        for_each_backend(|services| {
            let student = seed_student(services);
            services.students.delete_student(student.id).unwrap();

            assert_eq!(services.tasks.get_total_tasks_count().unwrap(), 0);
            assert!(matches!(
                services.students.get_student_by_id(student.id),
                Err(MinibrsError::StudentNotFound(_))
            ));
            assert!(matches!(
                services.students.delete_student(student.id),
                Err(MinibrsError::StudentNotFound(_))
            ));
        });
    }

    #[test]
    fn test_update_student() {
        for_each_backend(|services| {
            let student = seed_student(services);
            let other = services.groups.create_group("PM-11", 1).unwrap();

            let renamed = services
                .students
                .update_student(student.id, " Anna ", None)
                .unwrap();
            assert_eq!(renamed.name, "Anna");
            assert_eq!(renamed.group_id, student.group_id);

            let moved = services
                .students
                .update_student(student.id, "Anna", Some(other.id))
                .unwrap();
            assert_eq!(moved.group_id, other.id);
            assert_eq!(services.students.get_students_count_by_group(other.id).unwrap(), 1);

            assert!(matches!(
                services
                    .students
                    .update_student(student.id, "Anna", Some(Uuid::new_v4())),
                Err(MinibrsError::GroupNotFound(_))
            ));
            assert!(matches!(
                services.students.update_student(student.id, " ", None),
                Err(MinibrsError::Validation(_))
            ));
        });
    }

    #[test]
    fn test_queries() {
        for_each_backend(|services| {
            let student = seed_student(services);

            assert_eq!(services.students.get_all_students().unwrap().len(), 1);
            assert_eq!(
                services
                    .students
                    .get_students_by_group(student.group_id)
                    .unwrap(),
                vec![student.clone()]
            );
            assert_eq!(
                services
                    .students
                    .find_students_by_name(&student.name)
                    .unwrap()
                    .len(),
                1
            );
            assert!(matches!(
                services.students.get_students_by_group(Uuid::new_v4()),
                Err(MinibrsError::GroupNotFound(_))
            ));
            assert!(matches!(
                services.students.get_student_tasks(Uuid::new_v4()),
                Err(MinibrsError::StudentNotFound(_))
            ));
        });
    }

    #[test]
    fn test_failed_task_setup_removes_student() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = crate::storage::JsonStorage::open(dir.path()).unwrap();
        let services = crate::service::Services::new(Arc::new(storage));
        let group = services.groups.create_group("IT-21", 2).unwrap();

        // A directory in the way of the temp file makes every tasks.json write fail.
        std::fs::create_dir(dir.path().join("tasks.json.tmp")).unwrap();

        assert!(services.students.create_student("Ann", group.id).is_err());
        assert!(services.students.get_all_students().unwrap().is_empty());
        assert_eq!(services.tasks.get_total_tasks_count().unwrap(), 0);
    }
}
