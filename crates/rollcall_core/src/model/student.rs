//! Student domain model.
//!
//! # Responsibility
//! - Define the persisted `Student` record and the insert-side `NewStudent`.
//! - Validate field-level rules before any write reaches the store.
//!
//! # Invariants
//! - `grade` lies in `GRADE_MIN..=GRADE_MAX`.
//! - `email` is at most `EMAIL_MAX_CHARS` characters.
//! - `id` is assigned by the store and never rewritten.
//!
//! # See also
//! - crates/rollcall_core/src/db/schema/students.sql

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lowest grade accepted by the `grade_between_1_and_12` constraint.
pub const GRADE_MIN: i64 = 1;
/// Highest grade accepted by the `grade_between_1_and_12` constraint.
pub const GRADE_MAX: i64 = 12;
/// Column width of `students.email`.
pub const EMAIL_MAX_CHARS: usize = 55;

/// Store-assigned row identifier.
pub type StudentId = i64;

/// Field-level validation failures for student records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    EmailTooLong { chars: usize },
    GradeOutOfRange(i64),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailTooLong { chars } => write!(
                f,
                "email has {chars} characters; at most {EMAIL_MAX_CHARS} are allowed"
            ),
            Self::GradeOutOfRange(grade) => write!(
                f,
                "grade {grade} is outside {GRADE_MIN}..={GRADE_MAX}"
            ),
        }
    }
}

impl Error for StudentValidationError {}

/// Student values submitted for insertion. The store assigns `id`.
///
/// Deserialization runs [`NewStudent::validate`], so decoded values are
/// always writable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNewStudent")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: NaiveDateTime,
    /// `None` lets the repository apply its enrolled-date default.
    pub enrolled_date: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
struct RawNewStudent {
    name: String,
    email: String,
    grade: i64,
    birthday: NaiveDateTime,
    #[serde(default)]
    enrolled_date: Option<NaiveDateTime>,
}

impl TryFrom<RawNewStudent> for NewStudent {
    type Error = StudentValidationError;

    fn try_from(raw: RawNewStudent) -> Result<Self, Self::Error> {
        let student = Self {
            name: raw.name,
            email: raw.email,
            grade: raw.grade,
            birthday: raw.birthday,
            enrolled_date: raw.enrolled_date,
        };
        student.validate()?;
        Ok(student)
    }
}

impl NewStudent {
    /// Builds an unvalidated record; call [`NewStudent::validate`] or let the
    /// repository do it on insert.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        }
    }

    /// Sets an explicit enrolled date instead of the store default.
    pub fn enrolled_on(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    pub fn validate(&self) -> Result<(), StudentValidationError> {
        validate_fields(&self.email, self.grade)
    }
}

/// Persisted student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub grade: i64,
    pub birthday: NaiveDateTime,
    pub enrolled_date: NaiveDateTime,
}

impl Student {
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        validate_fields(&self.email, self.grade)
    }
}

impl Display for Student {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Student {}: {}, Grade {}", self.id, self.name, self.grade)
    }
}

/// Returns whether `grade` satisfies the store range constraint.
pub fn grade_in_range(grade: i64) -> bool {
    (GRADE_MIN..=GRADE_MAX).contains(&grade)
}

fn validate_fields(email: &str, grade: i64) -> Result<(), StudentValidationError> {
    let chars = email.chars().count();
    if chars > EMAIL_MAX_CHARS {
        return Err(StudentValidationError::EmailTooLong { chars });
    }

    if !grade_in_range(grade) {
        return Err(StudentValidationError::GradeOutOfRange(grade));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{grade_in_range, NewStudent, StudentValidationError};
    use chrono::NaiveDate;

    fn birthday() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(1912, 6, 23)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn grade_bounds_are_inclusive() {
        assert!(!grade_in_range(0));
        assert!(grade_in_range(1));
        assert!(grade_in_range(12));
        assert!(!grade_in_range(13));
    }

    #[test]
    fn free_form_name_and_email_text_is_accepted() {
        let student = NewStudent::new("", "grace@localhost", 5, birthday());
        assert!(student.validate().is_ok());
    }

    #[test]
    fn email_length_counts_characters_not_bytes() {
        let local = "é".repeat(46);
        let email = format!("{local}@b.edu");
        assert_eq!(email.chars().count(), 52);
        let student = NewStudent::new("Ada", email, 5, birthday());
        assert!(student.validate().is_ok());

        let too_long = NewStudent::new("Ada", format!("{}@b.edu", "é".repeat(50)), 5, birthday());
        assert_eq!(
            too_long.validate(),
            Err(StudentValidationError::EmailTooLong { chars: 56 })
        );
    }
}
