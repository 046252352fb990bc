use crate::record::Student;

/// Stable handle to a record slot. The generation makes handles to released
/// slots stop resolving once the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StudentId {
    index: u32,
    generation: u32,
}

/// A record plus its primary-bucket links.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) student: Student,
    pub(crate) prev: Option<StudentId>,
    pub(crate) next: Option<StudentId>,
    pub(crate) linked: bool,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub(crate) fn alloc(&mut self, student: Student) -> StudentId {
        let entry = Entry {
            student,
            prev: None,
            next: None,
            linked: false,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return StudentId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        StudentId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn release(&mut self, id: StudentId) -> Option<Student> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        debug_assert!(!entry.linked, "releasing a record still linked in a bucket");
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(entry.student)
    }

    pub(crate) fn entry(&self, id: StudentId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, id: StudentId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Callers only pass handles the store itself handed out and still holds.
    pub(crate) fn student(&self, id: StudentId) -> &Student {
        match self.entry(id) {
            Some(e) => &e.student,
            None => panic!("stale student handle {id:?}"),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
