//! The dual-indexed record store.
//!
//! Records live in a generational arena. The primary index links them into
//! one ascending-average list per (level, class); the secondary index keeps
//! descending per-course rankings of the same handles. Only the compound
//! operations here touch the indices, so both always agree.

mod arena;
mod primary;
mod secondary;

use tracing::debug;

use crate::error::ValidationError;
use crate::record::{check_course, check_level, Placement, Student, CLASSES, LEVELS};

pub use arena::StudentId;

use arena::Arena;
use primary::PrimaryIndex;
use secondary::SecondaryIndex;

#[derive(Debug, Default)]
pub struct Store {
    arena: Arena,
    primary: PrimaryIndex,
    secondary: SecondaryIndex,
    dirty: bool,
}

/// Field changes for [`Store::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub level: Option<i64>,
    pub class: Option<i64>,
    pub grades: Option<Vec<i64>>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.level.is_none()
            && self.class.is_none()
            && self.grades.is_none()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("student not found")]
    NotFound,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when a mutation happened since the last [`Store::mark_saved`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Primary first, then secondary.
    pub fn insert(&mut self, student: Student) -> StudentId {
        let id = self.arena.alloc(student);
        self.primary.insert(&mut self.arena, id);
        self.secondary.index_all(&self.arena, id);
        self.dirty = true;
        debug!(?id, "student inserted");
        id
    }

    /// Secondary first, then primary, then the slot itself.
    pub fn delete(&mut self, id: StudentId) -> Option<Student> {
        self.arena.entry(id)?;
        self.secondary.deindex_all(&self.arena, id);
        self.primary.remove(&mut self.arena, id);
        let student = self.arena.release(id);
        self.dirty = true;
        debug!(?id, "student deleted");
        student
    }

    pub fn get(&self, id: StudentId) -> Option<&Student> {
        self.arena.entry(id).map(|e| &e.student)
    }

    /// First record in the bucket with the given phone, walking head to tail.
    pub fn find_by_phone(&self, placement: Placement, phone: &str) -> Option<StudentId> {
        self.bucket(placement)
            .find(|(_, s)| s.phone() == phone)
            .map(|(id, _)| id)
    }

    /// Applies every change or none. A placement or grade change relinks the
    /// record (remove, then reinsert) so both indices re-sort it.
    pub fn update(&mut self, id: StudentId, changes: &StudentUpdate) -> Result<&Student, UpdateError> {
        let current = self.get(id).ok_or(UpdateError::NotFound)?;
        let mut next = current.clone();

        if let Some(v) = &changes.first_name {
            next.set_first_name(v)?;
        }
        if let Some(v) = &changes.last_name {
            next.set_last_name(v)?;
        }
        if let Some(v) = &changes.phone {
            next.set_phone(v)?;
        }
        if changes.level.is_some() || changes.class.is_some() {
            let old = current.placement();
            let level = changes.level.unwrap_or(old.level() as i64);
            let class = changes.class.unwrap_or(old.class() as i64);
            next.set_placement(Placement::new(level, class)?);
        }
        if let Some(g) = &changes.grades {
            next.set_grades(g)?;
        }

        let relink = next.placement() != current.placement() || next.grades() != current.grades();
        if relink {
            self.secondary.deindex_all(&self.arena, id);
            self.primary.remove(&mut self.arena, id);
        }
        if let Some(entry) = self.arena.entry_mut(id) {
            entry.student = next;
        }
        if relink {
            self.primary.insert(&mut self.arena, id);
            self.secondary.index_all(&self.arena, id);
        }
        self.dirty = true;
        debug!(?id, relink, "student updated");
        Ok(self.arena.student(id))
    }

    /// Records of one (level, class), lowest average first.
    pub fn bucket(&self, placement: Placement) -> impl Iterator<Item = (StudentId, &Student)> + '_ {
        self.primary
            .iter(&self.arena, placement)
            .map(move |id| (id, self.arena.student(id)))
    }

    pub fn bucket_len(&self, placement: Placement) -> usize {
        self.primary.bucket_len(placement)
    }

    /// Lowest-average record of one (level, class).
    pub fn bucket_head(&self, placement: Placement) -> Option<&Student> {
        self.primary
            .head(placement)
            .map(|id| self.arena.student(id))
    }

    /// Every record, buckets in (level, class) order.
    pub fn iter(&self) -> impl Iterator<Item = (StudentId, &Student)> + '_ {
        placements().flat_map(move |p| self.bucket(p))
    }

    /// One course's ranking within a level, highest grade first.
    pub fn ranking(
        &self,
        level: i64,
        course: i64,
    ) -> Result<impl Iterator<Item = (StudentId, &Student)> + '_, ValidationError> {
        let level = check_level(level)?;
        let course = check_course(course)?;
        Ok(self
            .secondary
            .iter(level, course)
            .map(move |id| (id, self.arena.student(id))))
    }
}

/// All grid positions in (level, class) order.
pub fn placements() -> impl Iterator<Item = Placement> {
    (1..=LEVELS as i64).flat_map(|level| {
        (1..=CLASSES as i64).filter_map(move |class| Placement::new(level, class).ok())
    })
}
