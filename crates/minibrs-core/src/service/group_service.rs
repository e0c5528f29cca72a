use std::sync::Arc;

use uuid::Uuid;

use crate::error::{MinibrsError, Result};
use crate::models::{Group, GroupReport, StudentProgress};
use crate::storage::Storage;

use super::StudentService;

pub const MAX_GROUP_NAME_LEN: usize = 50;
pub const MIN_COURSE: i64 = 1;
pub const MAX_COURSE: i64 = 6;

#[derive(Clone)]
pub struct GroupService {
    storage: Arc<dyn Storage>,
}

impl GroupService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn students(&self) -> StudentService {
        StudentService::new(Arc::clone(&self.storage))
    }

    pub fn create_group(&self, name: &str, course_number: i64) -> Result<Group> {
        validate_group_name(name)?;
        let course = validate_course_number(course_number)?;

        let group = Group::new(name, course);
        self.storage.groups().save(&group)?;
        tracing::info!(id = %group.id, name = %group.name, course, "group created");
        Ok(group)
    }

    /// Delete a group with all its students and their tasks.
    pub fn delete_group(&self, group_id: Uuid) -> Result<()> {
        let _guard = self.storage.write_lock();
        if !self.group_exists(group_id)? {
            return Err(MinibrsError::GroupNotFound(group_id));
        }

        let students = self.students();
        let members = self.storage.students().list_by_group(&group_id)?;
        for student in &members {
            students.remove_with_tasks(student.id)?;
        }

        self.storage.groups().delete(&group_id)?;
        tracing::info!(id = %group_id, students = members.len(), "group deleted");
        Ok(())
    }

    pub fn get_all_groups(&self) -> Result<Vec<Group>> {
        self.storage.groups().list()
    }

    pub fn get_group_by_id(&self, group_id: Uuid) -> Result<Group> {
        self.storage
            .groups()
            .find_by_id(&group_id)?
            .ok_or(MinibrsError::GroupNotFound(group_id))
    }

    pub fn update_group(&self, group_id: Uuid, new_name: &str, new_course: i64) -> Result<Group> {
        validate_group_name(new_name)?;
        let course = validate_course_number(new_course)?;
        let _guard = self.storage.write_lock();
        let mut group = self.get_group_by_id(group_id)?;
        group.course_number = course;
        group.name = new_name.to_string();

        self.storage.groups().save(&group)?;
        tracing::info!(id = %group.id, name = %group.name, "group updated");
        Ok(group)
    }

    pub fn group_exists(&self, group_id: Uuid) -> Result<bool> {
        self.storage.groups().exists(&group_id)
    }

    /// Every student of the group with their tasks and submission totals.
    pub fn get_group_report(&self, group_id: Uuid) -> Result<GroupReport> {
        let group = self.get_group_by_id(group_id)?;

        let students = self.storage.students().list_by_group(&group_id)?;
        let mut progress = Vec::with_capacity(students.len());
        for student in students {
            let tasks = self.storage.tasks().list_by_student(&student.id)?;
            progress.push(StudentProgress::new(student, tasks));
        }

        Ok(GroupReport::new(group, progress))
    }

    /// Exact name match.
    pub fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>> {
        self.storage.groups().find_by_name(name)
    }

    pub fn find_groups_by_course_number(&self, course_number: i64) -> Result<Vec<Group>> {
        match u8::try_from(course_number) {
            Ok(course) => self.storage.groups().find_by_course(course),
            Err(_) => Ok(Vec::new()),
        }
    }
}

pub fn validate_group_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MinibrsError::Validation(
            "Group name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(MinibrsError::Validation(format!(
            "Group name is too long (max {MAX_GROUP_NAME_LEN} characters)"
        )));
    }
    Ok(())
}

/// Courses run from 1 to 6.
pub fn validate_course_number(course_number: i64) -> Result<u8> {
    if !(MIN_COURSE..=MAX_COURSE).contains(&course_number) {
        return Err(MinibrsError::Validation(format!(
            "Course number must be between {MIN_COURSE} and {MAX_COURSE}"
        )));
    }
    Ok(course_number as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Progress;
    use crate::service::test_support::for_each_backend;

    #[test]
    fn test_create_group() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();

            assert_eq!(services.groups.get_group_by_id(group.id).unwrap().name, "IT-21");
            assert!(services.groups.group_exists(group.id).unwrap());
            assert_eq!(services.groups.get_all_groups().unwrap().len(), 1);
        });
    }

    #[test]
    fn test_group_name_validation() {
        for_each_backend(|services| {
            let too_long = "G".repeat(51);
            for name in ["", "  \t", too_long.as_str()] {
                assert!(matches!(
                    services.groups.create_group(name, 1),
                    Err(MinibrsError::Validation(_))
                ));
            }
            assert!(services.groups.create_group(&"G".repeat(50), 1).is_ok());
        });
    }

    #[test]
    fn test_course_range() {
        for_each_backend(|services| {
            for course in [0, 7, -1] {
                assert!(matches!(
                    services.groups.create_group("IT", course),
                    Err(MinibrsError::Validation(_))
                ));
            }
            for course in 1..=6 {
                services.groups.create_group("IT", course).unwrap();
            }
            assert_eq!(services.groups.find_groups_by_course_number(6).unwrap().len(), 1);
            assert!(services.groups.find_groups_by_course_number(300).unwrap().is_empty());
        });
    }

    #[test]
    fn test_update_group() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();
            let updated = services.groups.update_group(group.id, "IT-31", 3).unwrap();

            assert_eq!(updated.id, group.id);
            assert_eq!(updated.course_number, 3);
            assert_eq!(services.groups.find_groups_by_name("IT-31").unwrap().len(), 1);
            assert!(services.groups.find_groups_by_name("IT-21").unwrap().is_empty());

            assert!(matches!(
                services.groups.update_group(group.id, "IT-31", 9),
                Err(MinibrsError::Validation(_))
            ));
            assert!(matches!(
                services.groups.update_group(Uuid::new_v4(), "IT", 1),
                Err(MinibrsError::GroupNotFound(_))
            ));
        });
    }

    #[test]
    fn test_delete_group_cascades() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();
            let keep = services.groups.create_group("PM-11", 1).unwrap();
            services.students.create_student("Ann", group.id).unwrap();
            services.students.create_student("Bob", group.id).unwrap();
            let survivor = services.students.create_student("Eve", keep.id).unwrap();

            services.groups.delete_group(group.id).unwrap();

            assert!(!services.groups.group_exists(group.id).unwrap());
            assert_eq!(services.students.get_all_students().unwrap(), vec![survivor]);
            assert_eq!(services.tasks.get_total_tasks_count().unwrap(), 3);
            assert!(matches!(
                services.groups.delete_group(group.id),
                Err(MinibrsError::GroupNotFound(_))
            ));
        });
    }

    #[test]
    fn test_group_report() {
        for_each_backend(|services| {
            let group = services.groups.create_group("IT-21", 2).unwrap();
            let ann = services.students.create_student("Ann", group.id).unwrap();
            let bob = services.students.create_student("Bob", group.id).unwrap();
            for n in 1..=3 {
                services.tasks.mark_task(ann.id, n).unwrap();
            }
            services.tasks.mark_task(bob.id, 1).unwrap();

            let report = services.groups.get_group_report(group.id).unwrap();
            assert_eq!(report.group.name, "IT-21");
            assert_eq!(report.students.len(), 2);
            assert_eq!(report.students[0].student.name, "Ann");
            assert_eq!(report.students[0].progress(), Progress::AllSubmitted);
            assert_eq!(report.students[1].progress(), Progress::Partial);
            assert_eq!(report.submitted_total, 4);
            assert_eq!(report.tasks_total, 6);
            assert!((report.completion_percent() - 66.67).abs() < 0.01);
        });
    }

    #[test]
    fn test_report_of_empty_group() {
        for_each_backend(|services| {
            let group = services.groups.create_group("Empty", 1).unwrap();
            let report = services.groups.get_group_report(group.id).unwrap();
            assert!(report.students.is_empty());
            assert_eq!(report.completion_percent(), 0.0);

            assert!(matches!(
                services.groups.get_group_report(Uuid::new_v4()),
                Err(MinibrsError::GroupNotFound(_))
            ));
        });
    }

    #[test]
    fn test_delete_group_while_students_are_added() {
        for_each_backend(|services| {
            for _ in 0..50 {
                let group = services.groups.create_group("IT-41", 4).unwrap();
                std::thread::scope(|scope| {
                    scope.spawn(|| {
                        // Either lands before the delete or finds the group gone.
                        let _ = services.students.create_student("Racer", group.id);
                    });
                    scope.spawn(|| services.groups.delete_group(group.id).unwrap());
                });
                assert!(!services.groups.group_exists(group.id).unwrap());
                assert_eq!(
                    services
                        .students
                        .get_students_count_by_group(group.id)
                        .unwrap(),
                    0
                );
            }
            assert!(services.students.get_all_students().unwrap().is_empty());
            assert_eq!(services.tasks.get_total_tasks_count().unwrap(), 0);
        });
    }
}
