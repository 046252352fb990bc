use serde::Serialize;

use crate::error::ValidationError;

pub const LEVELS: usize = 12;
pub const CLASSES: usize = 10;
pub const COURSES: usize = 10;

pub const NAME_MAX: usize = 127;
pub const PHONE_MAX: usize = 9;

/// 1-based (level, class), range-checked at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Placement {
    level: u8,
    class: u8,
}

impl Placement {
    pub fn new(level: i64, class: i64) -> Result<Self, ValidationError> {
        let level = check_level(level)?;
        if class < 1 || class > CLASSES as i64 {
            return Err(ValidationError::ClassOutOfRange(class));
        }
        Ok(Self {
            level,
            class: class as u8,
        })
    }

    pub fn level(self) -> u8 {
        self.level
    }

    pub fn class(self) -> u8 {
        self.class
    }

    /// Zero-based position in the level x class grid.
    pub(crate) fn bucket(self) -> usize {
        (self.level as usize - 1) * CLASSES + (self.class as usize - 1)
    }
}

pub fn check_level(level: i64) -> Result<u8, ValidationError> {
    if level < 1 || level > LEVELS as i64 {
        return Err(ValidationError::LevelOutOfRange(level));
    }
    Ok(level as u8)
}

pub fn check_course(course: i64) -> Result<u8, ValidationError> {
    if course < 1 || course > COURSES as i64 {
        return Err(ValidationError::CourseOutOfRange(course));
    }
    Ok(course as u8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    first_name: String,
    last_name: String,
    phone: String,
    #[serde(flatten)]
    placement: Placement,
    grades: [i32; COURSES],
    average: i32,
}

impl Student {
    pub fn new(
        first_name: &str,
        last_name: &str,
        phone: &str,
        placement: Placement,
        grades: &[i64],
    ) -> Result<Self, ValidationError> {
        let first_name = check_field("firstName", first_name, NAME_MAX)?;
        let last_name = check_field("lastName", last_name, NAME_MAX)?;
        let phone = check_field("phone", phone, PHONE_MAX)?;
        let grades = check_grades(grades)?;
        Ok(Self {
            first_name,
            last_name,
            phone,
            placement,
            average: average_of(&grades),
            grades,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn grades(&self) -> &[i32; COURSES] {
        &self.grades
    }

    /// Grade for a 1-based course number.
    pub fn grade(&self, course: u8) -> i32 {
        self.grades[course as usize - 1]
    }

    pub fn average(&self) -> i32 {
        self.average
    }

    pub fn has_name(&self, first_name: &str, last_name: &str) -> bool {
        self.first_name == first_name && self.last_name == last_name
    }

    pub(crate) fn set_first_name(&mut self, v: &str) -> Result<(), ValidationError> {
        self.first_name = check_field("firstName", v, NAME_MAX)?;
        Ok(())
    }

    pub(crate) fn set_last_name(&mut self, v: &str) -> Result<(), ValidationError> {
        self.last_name = check_field("lastName", v, NAME_MAX)?;
        Ok(())
    }

    pub(crate) fn set_phone(&mut self, v: &str) -> Result<(), ValidationError> {
        self.phone = check_field("phone", v, PHONE_MAX)?;
        Ok(())
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub(crate) fn set_grades(&mut self, grades: &[i64]) -> Result<(), ValidationError> {
        self.grades = check_grades(grades)?;
        self.average = average_of(&self.grades);
        Ok(())
    }
}

fn check_field(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    if value.is_empty() || value.len() > max || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::BadField { field, max });
    }
    Ok(value.to_string())
}

fn check_grades(grades: &[i64]) -> Result<[i32; COURSES], ValidationError> {
    if grades.len() != COURSES {
        return Err(ValidationError::GradeCount(grades.len()));
    }
    let mut out = [0i32; COURSES];
    for (i, &g) in grades.iter().enumerate() {
        if g < 0 {
            return Err(ValidationError::NegativeGrade {
                course: i + 1,
                grade: g,
            });
        }
        out[i] = i32::try_from(g).map_err(|_| ValidationError::NotAnInteger {
            field: "grade",
            value: g.to_string(),
        })?;
    }
    Ok(out)
}

fn average_of(grades: &[i32; COURSES]) -> i32 {
    let sum: i64 = grades.iter().map(|&g| g as i64).sum();
    (sum / COURSES as i64) as i32
}
