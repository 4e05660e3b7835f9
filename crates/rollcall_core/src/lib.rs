//! Core of the rollcall student record store.
//! This crate is the single source of truth for record invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::student::{
    NewStudent, Student, StudentId, StudentValidationError, EMAIL_MAX_CHARS, GRADE_MAX, GRADE_MIN,
};
pub use repo::student_repo::{
    EnrolledDefault, RepoError, RepoResult, SqliteStudentRepository, StudentFilter, StudentOrder,
    StudentQuery, StudentRepository,
};
pub use service::student_service::StudentService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
