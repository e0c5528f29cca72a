use serde::Serialize;

use super::{Group, REQUIRED_TASKS, Student, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Progress {
    AllSubmitted,
    Partial,
    NoneSubmitted,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllSubmitted => write!(f, "ALL SUBMITTED"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::NoneSubmitted => write!(f, "NONE SUBMITTED"),
        }
    }
}

/// One student's line in a group report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student: Student,
    pub tasks: Vec<Task>,
    pub submitted: u32,
}

impl StudentProgress {
    pub fn new(student: Student, tasks: Vec<Task>) -> Self {
        let submitted = tasks.iter().filter(|t| t.is_submitted()).count() as u32;
        Self {
            student,
            tasks,
            submitted,
        }
    }

    pub fn progress(&self) -> Progress {
        match self.submitted {
            0 => Progress::NoneSubmitted,
            n if n >= REQUIRED_TASKS => Progress::AllSubmitted,
            _ => Progress::Partial,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group: Group,
    pub students: Vec<StudentProgress>,
    pub submitted_total: u32,
    /// Every student is expected to hand in [`REQUIRED_TASKS`] tasks.
    pub tasks_total: u32,
}

impl GroupReport {
    pub fn new(group: Group, students: Vec<StudentProgress>) -> Self {
        let submitted_total = students.iter().map(|s| s.submitted).sum();
        let tasks_total = students.len() as u32 * REQUIRED_TASKS;
        Self {
            group,
            students,
            submitted_total,
            tasks_total,
        }
    }

    pub fn completion_percent(&self) -> f64 {
        if self.tasks_total == 0 {
            return 0.0;
        }
        f64::from(self.submitted_total) * 100.0 / f64::from(self.tasks_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn tasks_for(student: &Student, submitted: u32) -> Vec<Task> {
        (1..=REQUIRED_TASKS)
            .map(|n| {
                let mut task = Task::new(student.id, n);
                if n <= submitted {
                    task.status = TaskStatus::Submitted;
                }
                task
            })
            .collect()
    }

    #[test]
    fn test_progress_labels() {
        let group = Group::new("IT-41", 4);
        let s = Student::new("A", group.id);
        assert_eq!(
            StudentProgress::new(s.clone(), tasks_for(&s, 0)).progress(),
            Progress::NoneSubmitted
        );
        assert_eq!(
            StudentProgress::new(s.clone(), tasks_for(&s, 2)).progress(),
            Progress::Partial
        );
        assert_eq!(
            StudentProgress::new(s.clone(), tasks_for(&s, 3)).progress(),
            Progress::AllSubmitted
        );
    }

    #[test]
    fn test_report_totals() {
        let group = Group::new("IT-41", 4);
        let a = Student::new("A", group.id);
        let b = Student::new("B", group.id);
        let report = GroupReport::new(
            group,
            vec![
                StudentProgress::new(a.clone(), tasks_for(&a, 3)),
                StudentProgress::new(b.clone(), tasks_for(&b, 1)),
            ],
        );
        assert_eq!(report.submitted_total, 4);
        assert_eq!(report.tasks_total, 6);
        assert!((report.completion_percent() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_report_percent_is_zero() {
        let report = GroupReport::new(Group::new("Empty", 1), Vec::new());
        assert_eq!(report.tasks_total, 0);
        assert_eq!(report.completion_percent(), 0.0);
    }
}
