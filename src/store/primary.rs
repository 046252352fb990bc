use super::arena::{Arena, StudentId};
use crate::record::{Placement, CLASSES, LEVELS};

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    head: Option<StudentId>,
    len: usize,
}

/// One doubly-linked list per (level, class), ascending by average.
/// The prev/next links live on the arena entries.
#[derive(Debug)]
pub(crate) struct PrimaryIndex {
    buckets: Vec<Bucket>,
}

impl Default for PrimaryIndex {
    fn default() -> Self {
        Self {
            buckets: vec![Bucket::default(); LEVELS * CLASSES],
        }
    }
}

impl PrimaryIndex {
    /// Places `id` after every record whose average is <= its own, so equal
    /// averages stay in arrival order.
    pub(crate) fn insert(&mut self, arena: &mut Arena, id: StudentId) {
        let (bucket, avg) = {
            let s = arena.student(id);
            (s.placement().bucket(), s.average())
        };
        debug_assert!(
            arena.entry(id).is_some_and(|e| !e.linked),
            "record already linked"
        );

        let head = self.buckets[bucket].head;
        match head {
            Some(h) if avg >= arena.student(h).average() => {
                let mut curr = h;
                while let Some(next) = next_of(arena, curr) {
                    if avg < arena.student(next).average() {
                        break;
                    }
                    curr = next;
                }
                let after = next_of(arena, curr);
                if let Some(n) = after {
                    set_prev(arena, n, Some(id));
                }
                set_next(arena, curr, Some(id));
                link(arena, id, Some(curr), after);
            }
            _ => {
                if let Some(h) = head {
                    set_prev(arena, h, Some(id));
                }
                link(arena, id, None, head);
                self.buckets[bucket].head = Some(id);
            }
        }
        self.buckets[bucket].len += 1;
    }

    /// O(1) unlink through the record's own links.
    pub(crate) fn remove(&mut self, arena: &mut Arena, id: StudentId) {
        let Some(entry) = arena.entry_mut(id) else {
            debug_assert!(false, "removing unknown record {id:?}");
            return;
        };
        debug_assert!(entry.linked, "removing unlinked record {id:?}");
        let (prev, next) = (entry.prev.take(), entry.next.take());
        entry.linked = false;
        let bucket = entry.student.placement().bucket();

        match prev {
            Some(p) => set_next(arena, p, next),
            None => self.buckets[bucket].head = next,
        }
        if let Some(n) = next {
            set_prev(arena, n, prev);
        }
        self.buckets[bucket].len -= 1;
    }

    pub(crate) fn head(&self, placement: Placement) -> Option<StudentId> {
        self.buckets[placement.bucket()].head
    }

    pub(crate) fn bucket_len(&self, placement: Placement) -> usize {
        self.buckets[placement.bucket()].len
    }

    pub(crate) fn iter<'a>(&self, arena: &'a Arena, placement: Placement) -> BucketIter<'a> {
        BucketIter {
            arena,
            curr: self.head(placement),
        }
    }
}

pub struct BucketIter<'a> {
    arena: &'a Arena,
    curr: Option<StudentId>,
}

impl Iterator for BucketIter<'_> {
    type Item = StudentId;

    fn next(&mut self) -> Option<StudentId> {
        let id = self.curr?;
        self.curr = next_of(self.arena, id);
        Some(id)
    }
}

fn next_of(arena: &Arena, id: StudentId) -> Option<StudentId> {
    arena.entry(id).and_then(|e| e.next)
}

fn set_prev(arena: &mut Arena, id: StudentId, prev: Option<StudentId>) {
    if let Some(e) = arena.entry_mut(id) {
        e.prev = prev;
    }
}

fn set_next(arena: &mut Arena, id: StudentId, next: Option<StudentId>) {
    if let Some(e) = arena.entry_mut(id) {
        e.next = next;
    }
}

fn link(arena: &mut Arena, id: StudentId, prev: Option<StudentId>, next: Option<StudentId>) {
    if let Some(e) = arena.entry_mut(id) {
        e.prev = prev;
        e.next = next;
        e.linked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Student, COURSES};

    fn add(arena: &mut Arena, index: &mut PrimaryIndex, phone: &str, avg: i64) -> StudentId {
        let p = Placement::new(1, 1).expect("placement");
        let s = Student::new("f", "l", phone, p, &[avg; COURSES]).expect("student");
        let id = arena.alloc(s);
        index.insert(arena, id);
        id
    }

    fn phones(arena: &Arena, index: &PrimaryIndex) -> Vec<String> {
        let p = Placement::new(1, 1).expect("placement");
        index
            .iter(arena, p)
            .map(|id| arena.student(id).phone().to_string())
            .collect()
    }

    #[test]
    fn equal_averages_keep_arrival_order() {
        let mut arena = Arena::default();
        let mut index = PrimaryIndex::default();
        add(&mut arena, &mut index, "1", 70);
        add(&mut arena, &mut index, "2", 70);
        add(&mut arena, &mut index, "3", 60);
        add(&mut arena, &mut index, "4", 70);
        assert_eq!(phones(&arena, &index), ["3", "1", "2", "4"]);
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut arena = Arena::default();
        let mut index = PrimaryIndex::default();
        let a = add(&mut arena, &mut index, "a", 10);
        let b = add(&mut arena, &mut index, "b", 20);
        let c = add(&mut arena, &mut index, "c", 30);
        let d = add(&mut arena, &mut index, "d", 40);

        index.remove(&mut arena, b);
        assert_eq!(phones(&arena, &index), ["a", "c", "d"]);
        index.remove(&mut arena, a);
        assert_eq!(phones(&arena, &index), ["c", "d"]);
        index.remove(&mut arena, d);
        assert_eq!(phones(&arena, &index), ["c"]);
        index.remove(&mut arena, c);
        assert!(phones(&arena, &index).is_empty());
        assert_eq!(
            index.bucket_len(Placement::new(1, 1).expect("placement")),
            0
        );
    }
}
