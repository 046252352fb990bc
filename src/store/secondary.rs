use super::arena::{Arena, StudentId};
use crate::record::{COURSES, LEVELS};

#[derive(Debug, Clone, Copy)]
struct RefNode {
    student: StudentId,
    next: Option<usize>,
}

/// Per (level, course) singly-linked lists of non-owning handles, descending
/// by that course's grade. Nodes come from a pooled vector.
#[derive(Debug)]
pub(crate) struct SecondaryIndex {
    nodes: Vec<Option<RefNode>>,
    free: Vec<usize>,
    heads: Vec<Option<usize>>,
}

impl Default for SecondaryIndex {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            heads: vec![None; LEVELS * COURSES],
        }
    }
}

fn list_of(level: u8, course: u8) -> usize {
    (level as usize - 1) * COURSES + (course as usize - 1)
}

impl SecondaryIndex {
    /// One node per course. A new node goes before the first node with a
    /// strictly lesser grade.
    pub(crate) fn index_all(&mut self, arena: &Arena, id: StudentId) {
        let student = arena.student(id);
        let level = student.placement().level();
        for course in 1..=COURSES as u8 {
            let grade = student.grade(course);
            let list = list_of(level, course);

            let mut prev: Option<usize> = None;
            let mut curr = self.heads[list];
            while let Some(n) = curr {
                let node = self.node(n);
                if grade > arena.student(node.student).grade(course) {
                    break;
                }
                prev = Some(n);
                curr = node.next;
            }

            let fresh = self.alloc(RefNode {
                student: id,
                next: curr,
            });
            match prev {
                Some(p) => self.node_mut(p).next = Some(fresh),
                None => self.heads[list] = Some(fresh),
            }
        }
    }

    /// Removes the node referencing `id` (by handle identity) from each of
    /// its level's course lists. Returns how many were removed.
    pub(crate) fn deindex_all(&mut self, arena: &Arena, id: StudentId) -> usize {
        let level = arena.student(id).placement().level();
        let mut removed = 0;
        for course in 1..=COURSES as u8 {
            let list = list_of(level, course);
            let mut prev: Option<usize> = None;
            let mut curr = self.heads[list];
            while let Some(n) = curr {
                let node = self.node(n);
                if node.student == id {
                    match prev {
                        Some(p) => self.node_mut(p).next = node.next,
                        None => self.heads[list] = node.next,
                    }
                    self.nodes[n] = None;
                    self.free.push(n);
                    removed += 1;
                    break;
                }
                prev = Some(n);
                curr = node.next;
            }
        }
        debug_assert_eq!(removed, COURSES, "record {id:?} was not fully indexed");
        removed
    }

    pub(crate) fn iter(&self, level: u8, course: u8) -> RankingIter<'_> {
        RankingIter {
            index: self,
            curr: self.heads[list_of(level, course)],
        }
    }

    fn alloc(&mut self, node: RefNode) -> usize {
        if let Some(i) = self.free.pop() {
            self.nodes[i] = Some(node);
            return i;
        }
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    fn node(&self, i: usize) -> RefNode {
        match self.nodes[i] {
            Some(n) => n,
            None => panic!("ranking list points at freed node {i}"),
        }
    }

    fn node_mut(&mut self, i: usize) -> &mut RefNode {
        match self.nodes[i].as_mut() {
            Some(n) => n,
            None => panic!("ranking list points at freed node {i}"),
        }
    }
}

/// Head-to-tail walk of one (level, course) ranking.
pub struct RankingIter<'a> {
    index: &'a SecondaryIndex,
    curr: Option<usize>,
}

impl Iterator for RankingIter<'_> {
    type Item = StudentId;

    fn next(&mut self) -> Option<StudentId> {
        let node = self.index.node(self.curr?);
        self.curr = node.next;
        Some(node.student)
    }
}
