//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into named record-store operations.
//! - Keep callers decoupled from storage details.

pub mod student_service;
