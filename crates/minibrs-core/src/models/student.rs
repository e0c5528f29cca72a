use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, FieldValue, short_id};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub group_id: Uuid,
}

impl Student {
    pub fn new(name: impl Into<String>, group_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            group_id,
        }
    }
}

impl PartialEq for Student {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Student {}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Student{{ID: {}, Name: '{}', Group: {}}}",
            short_id(&self.id),
            self.name,
            short_id(&self.group_id)
        )
    }
}

impl Entity for Student {
    const NAME: &'static str = "Student";
    const FIELDS: &'static [&'static str] = &["id", "name", "groupId"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "groupId" => Some(self.group_id.into()),
            _ => None,
        }
    }
}
