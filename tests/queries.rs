use rosterd::error::ValidationError;
use rosterd::query::{
    average_per_course, below_threshold, course_averages, search_by_name, top_n_in_course,
    top_n_per_level, CourseAverage,
};
use rosterd::record::{Placement, Student, COURSES, LEVELS};
use rosterd::store::Store;

fn with_course(first: &str, level: i64, class: i64, course: usize, grade: i64) -> Student {
    let mut grades = [50i64; COURSES];
    grades[course - 1] = grade;
    let p = Placement::new(level, class).expect("placement");
    Student::new(first, "Test", first, p, &grades).expect("student")
}

fn flat(first: &str, last: &str, level: i64, class: i64, grade: i64) -> Student {
    let p = Placement::new(level, class).expect("placement");
    Student::new(first, last, "1", p, &[grade; COURSES]).expect("student")
}

#[test]
fn top_n_is_a_prefix_with_ties_in_arrival_order() {
    let mut store = Store::new();
    store.insert(with_course("tieA", 2, 1, 5, 85));
    store.insert(with_course("low", 2, 2, 5, 60));
    store.insert(with_course("best", 2, 3, 5, 90));
    store.insert(with_course("tieB", 2, 1, 5, 85));
    store.insert(with_course("mid", 2, 4, 5, 70));

    let top = top_n_in_course(&store, 2, 5, 3).expect("top");
    let names: Vec<&str> = top.iter().map(|s| s.first_name()).collect();
    assert_eq!(names, ["best", "tieA", "tieB"]);
    let grades: Vec<i32> = top.iter().map(|s| s.grade(5)).collect();
    assert_eq!(grades, [90, 85, 85]);

    assert_eq!(top_n_in_course(&store, 2, 5, 50).expect("top").len(), 5);
    assert!(top_n_in_course(&store, 3, 5, 3).expect("top").is_empty());
}

#[test]
fn top_n_rejects_bad_course_or_level() {
    let store = Store::new();
    assert_eq!(
        top_n_in_course(&store, 1, 11, 3).unwrap_err(),
        ValidationError::CourseOutOfRange(11)
    );
    assert_eq!(
        top_n_in_course(&store, 0, 1, 3).unwrap_err(),
        ValidationError::LevelOutOfRange(0)
    );
}

#[test]
fn top_n_per_level_covers_every_level() {
    let mut store = Store::new();
    store.insert(with_course("a", 1, 1, 2, 99));
    store.insert(with_course("b", 12, 10, 2, 98));
    let levels = top_n_per_level(&store, 2, 10).expect("levels");
    assert_eq!(levels.len(), LEVELS);
    assert_eq!(levels[0].students.len(), 1);
    assert_eq!(levels[11].students[0].first_name(), "b");
    assert!(levels[5].students.is_empty());
}

#[test]
fn below_threshold_reports_only_weak_bucket_heads() {
    let mut store = Store::new();
    store.insert(flat("weak1", "x", 1, 1, 50));
    store.insert(flat("weak2", "x", 1, 1, 55));
    store.insert(flat("edge", "x", 1, 2, 65));
    store.insert(flat("strong", "x", 3, 4, 90));
    store.insert(flat("weak3", "x", 5, 5, 64));

    let names: Vec<&str> = below_threshold(&store, 65)
        .iter()
        .map(|s| s.first_name())
        .collect();
    assert_eq!(names, ["weak1", "weak3"]);
}

#[test]
fn empty_courses_are_omitted_not_zero() {
    let mut store = Store::new();
    assert_eq!(average_per_course(&store, 1, 1).expect("avg"), None);
    assert!(course_averages(&store).is_empty());

    store.insert(flat("a", "x", 4, 1, 70));
    store.insert(flat("b", "x", 4, 2, 75));
    assert_eq!(average_per_course(&store, 4, 3).expect("avg"), Some(72));
    assert_eq!(average_per_course(&store, 5, 3).expect("avg"), None);

    let all = course_averages(&store);
    assert_eq!(all.len(), COURSES);
    assert!(all.iter().all(|a| a.level == 4 && a.average == 72));
    assert_eq!(
        all[0],
        CourseAverage {
            level: 4,
            course: 1,
            average: 72
        }
    );
}

#[test]
fn search_returns_first_in_level_class_order() {
    let mut store = Store::new();
    store.insert(flat("Noa", "Cohen", 3, 2, 90));
    store.insert(flat("Noa", "Cohen", 2, 9, 40));
    store.insert(flat("Noa", "Cohen", 2, 9, 30));

    let (_, found) = search_by_name(&store, "Noa", "Cohen").expect("found");
    assert_eq!(found.placement(), Placement::new(2, 9).expect("placement"));
    assert_eq!(found.average(), 30);
    assert!(search_by_name(&store, "Noa", "Levi").is_none());
}
