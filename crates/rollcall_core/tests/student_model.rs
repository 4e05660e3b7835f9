use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{NewStudent, Student, StudentValidationError, EMAIL_MAX_CHARS};

fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn new_student_leaves_enrolled_date_to_the_store() {
    let student = NewStudent::new(
        "Alan Turing",
        "alan.turing@sherborne.edu",
        11,
        date(1912, 6, 23),
    );

    assert_eq!(student.enrolled_date, None);
    assert!(student.validate().is_ok());

    let enrolled = student.enrolled_on(date(1926, 5, 3));
    assert_eq!(enrolled.enrolled_date, Some(date(1926, 5, 3)));
}

#[test]
fn validate_rejects_grades_outside_one_to_twelve() {
    for grade in [0, 13, -1] {
        let student = NewStudent::new("Kid", "kid@school.edu", grade, date(2010, 1, 1));
        assert_eq!(
            student.validate(),
            Err(StudentValidationError::GradeOutOfRange(grade))
        );
    }
}

#[test]
fn validate_bounds_email_length_at_column_width() {
    let local = "a".repeat(EMAIL_MAX_CHARS);
    let long = NewStudent::new("Kid", format!("{local}@x.edu"), 5, date(2010, 1, 1));
    assert!(matches!(
        long.validate(),
        Err(StudentValidationError::EmailTooLong { chars }) if chars == EMAIL_MAX_CHARS + 6
    ));

    let exact = format!("{}@x.edu", "a".repeat(EMAIL_MAX_CHARS - 6));
    let fits = NewStudent::new("Kid", exact, 5, date(2010, 1, 1));
    assert!(fits.validate().is_ok());
}

#[test]
fn validate_accepts_any_name_and_email_text() {
    for (name, email) in [
        ("Grace", "grace@localhost"),
        ("", "g@x.org"),
        ("   ", "not an address"),
    ] {
        let student = NewStudent::new(name, email, 5, date(2010, 1, 1));
        assert!(student.validate().is_ok(), "{name:?} / {email:?} rejected");
    }
}

#[test]
fn display_matches_record_summary() {
    let student = Student {
        id: 1,
        name: "Alan Turing".to_string(),
        email: "alan.turing@sherborne.edu".to_string(),
        grade: 12,
        birthday: date(1912, 6, 23),
        enrolled_date: date(2026, 1, 1),
    };

    assert_eq!(student.to_string(), "Student 1: Alan Turing, Grade 12");
}

#[test]
fn serialization_uses_column_names() {
    let student = NewStudent::new(
        "Albert Einstein",
        "Albert.einstein@zurich.edu",
        6,
        date(1879, 3, 14),
    );

    let json = serde_json::to_value(&student).unwrap();
    assert_eq!(json["name"], "Albert Einstein");
    assert_eq!(json["email"], "Albert.einstein@zurich.edu");
    assert_eq!(json["grade"], 6);
    assert_eq!(json["birthday"], "1879-03-14T00:00:00");
    assert!(json["enrolled_date"].is_null());

    let decoded: NewStudent = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, student);
}

#[test]
fn deserialize_rejects_out_of_range_grade() {
    let value = serde_json::json!({
        "name": "Too Old",
        "email": "too.old@school.edu",
        "grade": 13,
        "birthday": "2000-01-01T00:00:00"
    });

    let err = serde_json::from_value::<NewStudent>(value).unwrap_err();
    assert!(
        err.to_string().contains("grade 13 is outside 1..=12"),
        "unexpected error: {err}"
    );
}
