//! Line format shared by the plaintext store and the encrypted frame payload:
//!
//! ```text
//! first last phone level class g1 g2 ... g10
//! ```
//!
//! Fields are whitespace-separated and positional. The course count is not
//! written; a line with too few or too many grades is rejected.

use std::fmt::Write as _;

use crate::error::ValidationError;
use crate::record::{Placement, Student, COURSES};

const HEADER_FIELDS: usize = 5;

pub fn parse_line(text: &str) -> Result<Student, ValidationError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < HEADER_FIELDS {
        return Err(ValidationError::MissingFields {
            expected: HEADER_FIELDS + COURSES,
            found: tokens.len(),
        });
    }

    let level = parse_int("level", tokens[3])?;
    let class = parse_int("class", tokens[4])?;
    let placement = Placement::new(level, class)?;

    let rest = &tokens[HEADER_FIELDS..];
    if rest.len() < COURSES {
        return Err(ValidationError::GradeCount(rest.len()));
    }
    if rest.len() > COURSES {
        return Err(ValidationError::TrailingTokens(rest.len() - COURSES));
    }
    let grades = rest
        .iter()
        .map(|t| parse_int("grade", t))
        .collect::<Result<Vec<_>, _>>()?;

    Student::new(tokens[0], tokens[1], tokens[2], placement, &grades)
}

pub fn format_line(student: &Student) -> String {
    let p = student.placement();
    let mut out = format!(
        "{} {} {} {} {}",
        student.first_name(),
        student.last_name(),
        student.phone(),
        p.level(),
        p.class()
    );
    for g in student.grades() {
        let _ = write!(out, " {g}");
    }
    out.push('\n');
    out
}

fn parse_int(field: &'static str, token: &str) -> Result<i64, ValidationError> {
    token.parse::<i64>().map_err(|_| ValidationError::NotAnInteger {
        field,
        value: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "Dana Levi 0501234 3 7 90 80 70 60 50 40 30 20 10 100\n";

    #[test]
    fn parse_then_format_is_identity_on_normal_form() {
        let s = parse_line(LINE).expect("parse");
        assert_eq!(s.first_name(), "Dana");
        assert_eq!(s.placement().level(), 3);
        assert_eq!(s.placement().class(), 7);
        assert_eq!(s.average(), 55);
        assert_eq!(format_line(&s), LINE);
    }

    #[test]
    fn extra_whitespace_collapses() {
        let messy = "  Dana\tLevi  0501234 3   7 90 80 70 60 50 40 30 20 10 100  \r\n";
        let s = parse_line(messy).expect("parse");
        assert_eq!(format_line(&s), LINE);
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(
            parse_line("Dana Levi 0501234 3"),
            Err(ValidationError::MissingFields {
                expected: 15,
                found: 4
            })
        );
    }

    #[test]
    fn too_few_grades_is_rejected() {
        assert_eq!(
            parse_line("Dana Levi 0501234 3 7 90 80 70"),
            Err(ValidationError::GradeCount(3))
        );
    }

    #[test]
    fn too_many_grades_is_rejected() {
        let line = "Dana Levi 0501234 3 7 1 2 3 4 5 6 7 8 9 10 11";
        assert_eq!(parse_line(line), Err(ValidationError::TrailingTokens(1)));
    }

    #[test]
    fn out_of_range_placement_is_rejected_while_parsing() {
        let line = "Dana Levi 0501234 13 7 1 2 3 4 5 6 7 8 9 10";
        assert_eq!(parse_line(line), Err(ValidationError::LevelOutOfRange(13)));
        let line = "Dana Levi 0501234 1 0 1 2 3 4 5 6 7 8 9 10";
        assert_eq!(parse_line(line), Err(ValidationError::ClassOutOfRange(0)));
    }

    #[test]
    fn non_numeric_grade_is_rejected() {
        let line = "Dana Levi 0501234 1 1 1 2 x 4 5 6 7 8 9 10";
        assert!(matches!(
            parse_line(line),
            Err(ValidationError::NotAnInteger { field: "grade", .. })
        ));
    }
}
