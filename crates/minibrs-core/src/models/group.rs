use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, FieldValue, short_id};

/// A study group. Students belong to exactly one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    /// Year of study, 1 to 6.
    pub course_number: u8,
}

impl Group {
    pub fn new(name: impl Into<String>, course_number: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            course_number,
        }
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Group {}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Group{{ID: {}, Name: '{}', Course: {}}}",
            short_id(&self.id),
            self.name,
            self.course_number
        )
    }
}

impl Entity for Group {
    const NAME: &'static str = "Group";
    const FIELDS: &'static [&'static str] = &["id", "name", "courseNumber"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "courseNumber" => Some(self.course_number.into()),
            _ => None,
        }
    }
}
