//! File-backed repositories: one pretty-printed JSON object per entity type,
//! mapping each id to its record.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::error::{MinibrsError, Result};
use crate::models::{Entity, FieldValue, Group, Student, Task, TaskStatus};
use crate::storage::repositories::{GroupRepository, Repository, StudentRepository, TaskRepository};

/// Equality filter over named fields of `T`. Every field name is checked
/// against [`Entity::FIELDS`] when it is added.
#[derive(Clone)]
pub struct Params<T: Entity> {
    fields: BTreeMap<String, FieldValue>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Params<T> {
    pub fn new(field: &str, value: impl Into<FieldValue>) -> Result<Self> {
        Self::empty().and(field, value)
    }

    pub fn from_pairs<I, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<FieldValue>,
    {
        pairs
            .into_iter()
            .try_fold(Self::empty(), |params, (field, value)| params.and(field, value))
    }

    /// Add another field; all fields must match.
    pub fn and(mut self, field: &str, value: impl Into<FieldValue>) -> Result<Self> {
        if !T::FIELDS.contains(&field) {
            return Err(MinibrsError::UnknownField {
                entity: T::NAME,
                field: field.to_string(),
            });
        }
        self.fields.insert(field.to_string(), value.into());
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, entity: &T) -> bool {
        self.fields
            .iter()
            .all(|(name, expected)| entity.field(name).as_ref() == Some(expected))
    }

    fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for Params<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("entity", &T::NAME)
            .field("fields", &self.fields)
            .finish()
    }
}

impl<T: Entity> fmt::Display for Params<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Params{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// All records of one entity type, mirrored to a single JSON file.
pub struct JsonRepository<T: Entity> {
    path: PathBuf,
    records: RwLock<BTreeMap<Uuid, T>>,
}

impl<T: Entity> JsonRepository<T> {
    /// Load `path`; a missing or empty file is an empty repository.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!(
            entity = T::NAME,
            path = %path.display(),
            count = records.len(),
            "loaded json repository"
        );
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.read().contains_key(id)
    }

    pub fn all(&self) -> Vec<T> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Records matching `params`, or every record for `None`. Ordered by id.
    pub fn find(&self, params: Option<&Params<T>>) -> Vec<T> {
        let records = self.read();
        match params {
            None => records.values().cloned().collect(),
            Some(params) => records
                .values()
                .filter(|record| params.matches(record))
                .cloned()
                .collect(),
        }
    }

    pub fn find_first(&self, params: &Params<T>) -> Option<T> {
        self.read().values().find(|record| params.matches(record)).cloned()
    }

    pub fn exists_where(&self, params: &Params<T>) -> bool {
        self.read().values().any(|record| params.matches(record))
    }

    pub fn count_where(&self, params: &Params<T>) -> usize {
        self.read().values().filter(|record| params.matches(record)).count()
    }

    pub fn insert(&self, record: T) -> Result<()> {
        let mut records = self.write();
        let id = record.id();
        let previous = records.insert(id, record);
        if let Err(e) = self.persist(&records) {
            match previous {
                Some(previous) => records.insert(id, previous),
                None => records.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn remove(&self, id: &Uuid) -> Result<bool> {
        let mut records = self.write();
        let Some(removed) = records.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&records) {
            records.insert(*id, removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Remove every record matching `params`; returns how many went.
    pub fn delete_where(&self, params: &Params<T>) -> Result<usize> {
        let mut records = self.write();
        let doomed: Vec<Uuid> = records
            .values()
            .filter(|record| params.matches(record))
            .map(|record| record.id())
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let snapshot = records.clone();
        for id in &doomed {
            records.remove(id);
        }
        if let Err(e) = self.persist(&records) {
            *records = snapshot;
            return Err(e);
        }
        tracing::debug!(entity = T::NAME, %params, count = doomed.len(), "deleted records");
        Ok(doomed.len())
    }

    /// Apply `change` to one record and persist. Returns false when the id is unknown.
    pub fn update(&self, id: &Uuid, change: impl FnOnce(&mut T)) -> Result<bool> {
        let mut records = self.write();
        let Some(record) = records.get_mut(id) else {
            return Ok(false);
        };
        let before = record.clone();
        change(record);
        if let Err(e) = self.persist(&records) {
            records.insert(*id, before);
            return Err(e);
        }
        Ok(true)
    }

    /// Rewrite the whole file through a sibling temp file and a rename.
    fn persist(&self, records: &BTreeMap<Uuid, T>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Uuid, T>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Uuid, T>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Entity> Repository for JsonRepository<T> {
    type Entity = T;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<T>> {
        Ok(self.get(id))
    }

    fn save(&self, entity: &T) -> Result<()> {
        self.insert(entity.clone())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        self.remove(id)
    }

    fn exists(&self, id: &Uuid) -> Result<bool> {
        Ok(self.contains(id))
    }
}

impl GroupRepository for JsonRepository<Group> {
    fn list(&self) -> Result<Vec<Group>> {
        let mut groups = self.all();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<Group>> {
        Ok(self.find(Some(&Params::new("name", name)?)))
    }

    fn find_by_course(&self, course_number: u8) -> Result<Vec<Group>> {
        Ok(self.find(Some(&Params::new("courseNumber", course_number)?)))
    }
}

impl StudentRepository for JsonRepository<Student> {
    fn list(&self) -> Result<Vec<Student>> {
        Ok(by_name(self.all()))
    }

    fn list_by_group(&self, group_id: &Uuid) -> Result<Vec<Student>> {
        Ok(by_name(self.find(Some(&Params::new("groupId", *group_id)?))))
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<Student>> {
        Ok(self.find(Some(&Params::new("name", name)?)))
    }

    fn count_by_group(&self, group_id: &Uuid) -> Result<usize> {
        Ok(self.count_where(&Params::new("groupId", *group_id)?))
    }

    fn exists_by_name_and_group(&self, name: &str, group_id: &Uuid) -> Result<bool> {
        let params = Params::new("name", name)?.and("groupId", *group_id)?;
        Ok(self.exists_where(&params))
    }
}

fn by_name(mut students: Vec<Student>) -> Vec<Student> {
    students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    students
}

fn by_number(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));
    tasks
}

impl TaskRepository for JsonRepository<Task> {
    fn list(&self) -> Result<Vec<Task>> {
        Ok(by_number(self.all()))
    }

    fn list_by_student(&self, student_id: &Uuid) -> Result<Vec<Task>> {
        Ok(by_number(self.find(Some(&Params::new("studentId", *student_id)?))))
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        Ok(by_number(self.find(Some(&Params::new("status", status)?))))
    }

    fn find_by_student_and_number(&self, student_id: &Uuid, number: u32) -> Result<Option<Task>> {
        let params = Params::new("studentId", *student_id)?.and("number", number)?;
        Ok(self.find_first(&params))
    }

    fn update_status(&self, id: &Uuid, status: TaskStatus) -> Result<bool> {
        self.update(id, |task| task.status = status)
    }

    fn delete_by_student(&self, student_id: &Uuid) -> Result<usize> {
        self.delete_where(&Params::new("studentId", *student_id)?)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn count_by_status(&self, status: TaskStatus) -> Result<usize> {
        Ok(self.count_where(&Params::new("status", status)?))
    }

    fn count_by_student_and_status(&self, student_id: &Uuid, status: TaskStatus) -> Result<usize> {
        let params = Params::new("studentId", *student_id)?.and("status", status)?;
        Ok(self.count_where(&params))
    }
}
