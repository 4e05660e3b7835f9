//! Scripted record-store walkthrough.
//!
//! Enrolls two students, then issues projection, ordering, limit, first,
//! count, filter, bulk update and delete in that order. Any store error ends
//! the run.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{NewStudent, StudentFilter, StudentRepository, StudentService};
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use std::io::Write;

/// Writes one line per result, as plain text or JSON.
pub struct Report<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> Report<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize + Debug>(&mut self, step: &str, result: &T) -> Result<()> {
        let written = if self.json {
            let line = serde_json::to_string(&json!({ "step": step, "result": result }))
                .with_context(|| format!("failed to encode `{step}` result"))?;
            writeln!(self.out, "{line}")
        } else {
            writeln!(self.out, "{step}: {result:?}")
        };
        written.with_context(|| format!("failed to write `{step}` result"))
    }

    fn emit_text(&mut self, step: &str, text: &str) -> Result<()> {
        self.emit(step, &text)
    }
}

pub fn run<R: StudentRepository, W: Write>(repo: R, report: &mut Report<W>) -> Result<()> {
    let mut service = StudentService::new(repo);

    service
        .enroll(&seed_students()?)
        .context("bulk insert failed")?;

    report.emit("names", &service.names()?)?;
    report.emit("names_descending", &service.names_descending()?)?;
    report.emit("top_by_grade", &service.top_by_grade(1)?)?;
    report.emit("first_by_grade", &service.first_by_grade()?)?;
    report.emit("count", &service.count()?)?;

    let alan_in_eleventh = StudentFilter::all()
        .with_name_containing("Alan")
        .with_grade(11);
    for student in service.find(&alan_in_eleventh)? {
        report.emit_text("filtered", &student.name)?;
    }

    service
        .promote(&StudentFilter::all())
        .context("bulk update failed")?;
    let grades: Vec<(String, i64)> = service
        .roster()?
        .into_iter()
        .map(|student| (student.name, student.grade))
        .collect();
    report.emit("after_promote", &grades)?;

    service
        .remove(&StudentFilter::all().with_name("Albert Einstein"))
        .context("delete failed")?;
    let leftover = service.first(&alan_in_eleventh)?;
    match &leftover {
        Some(student) => report.emit_text("after_delete", &student.to_string()),
        None => report.emit("after_delete", &leftover),
    }
}

fn seed_students() -> Result<Vec<NewStudent>> {
    Ok(vec![
        NewStudent::new(
            "Alan Turing",
            "alan.turing@sherborne.edu",
            11,
            midnight(1912, 6, 23)?,
        ),
        NewStudent::new(
            "Albert Einstein",
            "Albert.einstein@zurich.edu",
            6,
            midnight(1879, 3, 14)?,
        ),
    ])
}

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("invalid seed date {year}-{month:02}-{day:02}"))
}

#[cfg(test)]
mod tests {
    use super::{midnight, run, seed_students, Report};
    use rollcall_core::db::open_db_in_memory;
    use rollcall_core::SqliteStudentRepository;
    use serde_json::Value;

    fn run_to_string(json: bool) -> String {
        let mut conn = open_db_in_memory().expect("in-memory db should open");
        let repo = SqliteStudentRepository::try_new(&mut conn).expect("schema should be ready");
        let mut report = Report::new(Vec::new(), json);
        run(repo, &mut report).expect("walkthrough should succeed");
        String::from_utf8(report.into_inner()).expect("output should be UTF-8")
    }

    #[test]
    fn seeds_are_valid_and_ordered_turing_first() {
        let seeds = seed_students().expect("seed dates are valid");
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].name, "Alan Turing");
        assert_eq!(seeds[1].name, "Albert Einstein");
        for seed in &seeds {
            seed.validate().expect("seed should validate");
        }
    }

    #[test]
    fn midnight_rejects_impossible_dates() {
        assert!(midnight(1912, 2, 30).is_err());
    }

    #[test]
    fn text_walkthrough_prints_every_step_in_order() {
        let output = run_to_string(false);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines,
            vec![
                r#"names: ["Alan Turing", "Albert Einstein"]"#,
                r#"names_descending: ["Albert Einstein", "Alan Turing"]"#,
                r#"top_by_grade: [("Alan Turing", 11)]"#,
                r#"first_by_grade: Some(("Alan Turing", 1912-06-23T00:00:00))"#,
                "count: 2",
                r#"filtered: "Alan Turing""#,
                r#"after_promote: [("Alan Turing", 12), ("Albert Einstein", 7)]"#,
                "after_delete: None",
            ]
        );
    }

    #[test]
    fn json_walkthrough_emits_step_result_objects() {
        let output = run_to_string(true);
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
            .collect();

        let steps: Vec<&str> = lines
            .iter()
            .map(|line| line["step"].as_str().expect("step should be a string"))
            .collect();
        assert_eq!(
            steps,
            vec![
                "names",
                "names_descending",
                "top_by_grade",
                "first_by_grade",
                "count",
                "filtered",
                "after_promote",
                "after_delete",
            ]
        );

        assert_eq!(
            lines[0]["result"],
            serde_json::json!(["Alan Turing", "Albert Einstein"])
        );
        assert_eq!(lines[2]["result"], serde_json::json!([["Alan Turing", 11]]));
        assert_eq!(
            lines[3]["result"],
            serde_json::json!(["Alan Turing", "1912-06-23T00:00:00"])
        );
        assert_eq!(lines[4]["result"], 2);
        assert_eq!(lines[5]["result"], "Alan Turing");
        assert_eq!(
            lines[6]["result"],
            serde_json::json!([["Alan Turing", 12], ["Albert Einstein", 7]])
        );
        assert!(lines[7]["result"].is_null());
        for line in &lines {
            assert_eq!(line.as_object().map(|object| object.len()), Some(2));
        }
    }
}
