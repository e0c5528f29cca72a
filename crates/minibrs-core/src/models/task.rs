use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, FieldValue, short_id};

/// Number of tasks every student has to hand in.
pub const REQUIRED_TASKS: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Submitted,
    #[default]
    NotSubmitted,
}

impl TaskStatus {
    /// Storage form, as kept in the `tasks.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::NotSubmitted => "NOT_SUBMITTED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::NotSubmitted => write!(f, "not submitted"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "SUBMITTED" => Ok(Self::Submitted),
            "NOT_SUBMITTED" => Ok(Self::NotSubmitted),
            _ => Err(format!("Invalid TaskStatus: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub student_id: Uuid,
    pub number: u32,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(student_id: Uuid, number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            number,
            status: TaskStatus::NotSubmitted,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == TaskStatus::Submitted
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.is_submitted() { "✅" } else { "❌" };
        write!(
            f,
            "Task{{ID: {}, #{}, Status: {mark} {}, Student: {}}}",
            short_id(&self.id),
            self.number,
            self.status.as_str().replace('_', " "),
            short_id(&self.student_id)
        )
    }
}

impl Entity for Task {
    const NAME: &'static str = "Task";
    const FIELDS: &'static [&'static str] = &["id", "studentId", "number", "status"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "studentId" => Some(self.student_id.into()),
            "number" => Some(self.number.into()),
            "status" => Some(self.status.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::NotSubmitted).unwrap(),
            "\"NOT_SUBMITTED\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"SUBMITTED\"").unwrap();
        assert_eq!(parsed, TaskStatus::Submitted);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("submitted".parse::<TaskStatus>().unwrap(), TaskStatus::Submitted);
        assert_eq!(
            "not-submitted".parse::<TaskStatus>().unwrap(),
            TaskStatus::NotSubmitted
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_new_task_is_not_submitted() {
        let task = Task::new(Uuid::new_v4(), 1);
        assert!(!task.is_submitted());
        assert_eq!(task.status, TaskStatus::NotSubmitted);
    }

    #[test]
    fn test_display() {
        let mut task = Task::new(Uuid::new_v4(), 2);
        task.status = TaskStatus::Submitted;
        assert!(task.to_string().contains("#2, Status: ✅ SUBMITTED"));
    }
}
