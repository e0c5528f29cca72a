pub mod entity;
pub mod group;
pub mod report;
pub mod student;
pub mod task;

pub use entity::*;
pub use group::*;
pub use report::*;
pub use student::*;
pub use task::*;

/// First 8 characters of a UUID followed by `...`, for compact listings.
pub fn short_id(id: &uuid::Uuid) -> String {
    format!("{}...", &id.to_string()[..8])
}
