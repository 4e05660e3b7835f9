//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce model validation before persistence.
//! - Engine constraint failures are surfaced as `RepoError::Db`, untranslated.

pub mod student_repo;
