//! Student record store use-case service.
//!
//! # Responsibility
//! - Expose the record-store operations by name (enroll, project, order,
//!   limit, count, filter, promote, remove).
//! - Emit metadata-only log events for every mutation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or persistence contracts.
//! - "Highest grade" queries break ties by insertion order.

use crate::model::student::{NewStudent, Student, StudentId};
use crate::repo::student_repo::{
    RepoResult, StudentFilter, StudentOrder, StudentQuery, StudentRepository,
};
use chrono::NaiveDateTime;
use log::{debug, error, info};
use std::time::Instant;

/// Use-case service wrapper over a student repository.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a batch of students in one transaction.
    ///
    /// Returns store-assigned ids in input order. A single invalid record or
    /// constraint violation aborts the whole batch.
    pub fn enroll(&mut self, students: &[NewStudent]) -> RepoResult<Vec<StudentId>> {
        let started_at = Instant::now();
        match self.repo.bulk_insert(students) {
            Ok(ids) => {
                info!(
                    "event=student_enroll module=service status=ok rows={} duration_ms={}",
                    ids.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(ids)
            }
            Err(err) => {
                error!(
                    "event=student_enroll module=service status=error rows={} constraint={} error={}",
                    students.len(),
                    err.is_constraint_violation(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn get(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.repo.get_student(id)
    }

    /// Every record in insertion order.
    pub fn roster(&self) -> RepoResult<Vec<Student>> {
        self.repo.list_students(&StudentQuery::default())
    }

    /// Names of every record in insertion order.
    pub fn names(&self) -> RepoResult<Vec<String>> {
        self.repo.list_names(&StudentQuery::default())
    }

    /// Names of every record, sorted descending by the store collation.
    pub fn names_descending(&self) -> RepoResult<Vec<String>> {
        self.repo
            .list_names(&StudentQuery::ordered(StudentOrder::NameDesc))
    }

    /// `(name, grade)` of the `limit` highest-grade records.
    pub fn top_by_grade(&self, limit: u32) -> RepoResult<Vec<(String, i64)>> {
        let query = StudentQuery::ordered(StudentOrder::GradeDesc).limit(limit);
        let students = self.repo.list_students(&query)?;
        Ok(students
            .into_iter()
            .map(|student| (student.name, student.grade))
            .collect())
    }

    /// `(name, birthday)` of the highest-grade record, if any.
    pub fn first_by_grade(&self) -> RepoResult<Option<(String, NaiveDateTime)>> {
        let query = StudentQuery::ordered(StudentOrder::GradeDesc).limit(1);
        let first = self.repo.list_students(&query)?.into_iter().next();
        Ok(first.map(|student| (student.name, student.birthday)))
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count_students(&StudentFilter::all())
    }

    /// All records matching `filter`, in insertion order.
    pub fn find(&self, filter: &StudentFilter) -> RepoResult<Vec<Student>> {
        let students = self
            .repo
            .list_students(&StudentQuery::filtered(filter.clone()))?;
        debug!(
            "event=student_find module=service status=ok rows={}",
            students.len()
        );
        Ok(students)
    }

    /// First record matching `filter`, or `None`.
    pub fn first(&self, filter: &StudentFilter) -> RepoResult<Option<Student>> {
        let query = StudentQuery::filtered(filter.clone()).limit(1);
        Ok(self.repo.list_students(&query)?.into_iter().next())
    }

    /// Rewrites a stored record by id.
    pub fn update(&self, student: &Student) -> RepoResult<()> {
        self.repo.update_student(student)?;
        info!(
            "event=student_update module=service status=ok id={}",
            student.id
        );
        Ok(())
    }

    /// Raises the grade of every matching record by one.
    ///
    /// Fails without changing anything when any match is already at the top
    /// grade.
    pub fn promote(&self, filter: &StudentFilter) -> RepoResult<usize> {
        match self.repo.increment_grade(filter, 1) {
            Ok(changed) => {
                info!(
                    "event=student_promote module=service status=ok filtered={} rows={}",
                    !filter.is_empty(),
                    changed
                );
                Ok(changed)
            }
            Err(err) => {
                error!(
                    "event=student_promote module=service status=error filtered={} constraint={} error={}",
                    !filter.is_empty(),
                    err.is_constraint_violation(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Hard-deletes every matching record.
    pub fn remove(&self, filter: &StudentFilter) -> RepoResult<usize> {
        let removed = self.repo.delete_students(filter)?;
        info!(
            "event=student_remove module=service status=ok filtered={} rows={}",
            !filter.is_empty(),
            removed
        );
        Ok(removed)
    }
}
