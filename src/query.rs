//! Read-only reports over the two indices.

use serde::Serialize;

use crate::error::ValidationError;
use crate::record::{check_course, Student, COURSES, LEVELS};
use crate::store::{placements, Store, StudentId};

/// Default cut-off for [`below_threshold`].
pub const DROPOUT_THRESHOLD: i32 = 65;
/// Default ranking length for [`top_n_per_level`].
pub const TOP_N: usize = 10;

/// First match walking buckets in (level, class) order, head to tail.
pub fn search_by_name<'a>(
    store: &'a Store,
    first_name: &str,
    last_name: &str,
) -> Option<(StudentId, &'a Student)> {
    store
        .iter()
        .find(|(_, s)| s.has_name(first_name, last_name))
}

/// The first `n` entries of one course ranking; ties in arrival order.
pub fn top_n_in_course(
    store: &Store,
    level: i64,
    course: i64,
    n: usize,
) -> Result<Vec<&Student>, ValidationError> {
    Ok(store.ranking(level, course)?.take(n).map(|(_, s)| s).collect())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRanking<'a> {
    pub level: u8,
    pub course: u8,
    pub students: Vec<&'a Student>,
}

/// [`top_n_in_course`] for every level, empty levels included.
pub fn top_n_per_level(
    store: &Store,
    course: i64,
    n: usize,
) -> Result<Vec<LevelRanking<'_>>, ValidationError> {
    let course = check_course(course)?;
    (1..=LEVELS as u8)
        .map(|level| {
            Ok::<_, ValidationError>(LevelRanking {
                level,
                course,
                students: top_n_in_course(store, level as i64, course as i64, n)?,
            })
        })
        .collect()
}

/// The weakest record of each class, if its average is strictly below
/// `threshold`. Only bucket heads are inspected.
pub fn below_threshold(store: &Store, threshold: i32) -> Vec<&Student> {
    placements()
        .filter_map(|p| store.bucket_head(p))
        .filter(|s| s.average() < threshold)
        .collect()
}

/// `None` when nobody in the level is indexed for the course.
pub fn average_per_course(
    store: &Store,
    level: i64,
    course: i64,
) -> Result<Option<i32>, ValidationError> {
    let course_no = check_course(course)?;
    let (sum, count) = store
        .ranking(level, course)?
        .fold((0i64, 0i64), |(sum, count), (_, s)| {
            (sum + s.grade(course_no) as i64, count + 1)
        });
    if count == 0 {
        return Ok(None);
    }
    Ok(Some((sum / count) as i32))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAverage {
    pub level: u8,
    pub course: u8,
    pub average: i32,
}

/// Every non-empty (level, course) average, level-major.
pub fn course_averages(store: &Store) -> Vec<CourseAverage> {
    let mut out = Vec::new();
    for level in 1..=LEVELS as u8 {
        for course in 1..=COURSES as u8 {
            if let Ok(Some(average)) = average_per_course(store, level as i64, course as i64) {
                out.push(CourseAverage {
                    level,
                    course,
                    average,
                });
            }
        }
    }
    out
}
