//! Student repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide batch insert, query, bulk update and bulk delete over `students`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - `bulk_insert` is all-or-nothing: one transaction per batch.
//! - No statement ever writes the `id` column.
//! - Every ordering ends with `id ASC` so ties resolve by insertion order.

use crate::db::schema::{current_user_version, SCHEMA_VERSION, STUDENTS_TABLE, STUDENT_COLUMNS};
use crate::db::DbError;
use crate::model::student::{NewStudent, Student, StudentId, StudentValidationError};
use chrono::{Local, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    grade,
    birthday,
    enrolled_date
FROM students";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StudentValidationError),
    Db(DbError),
    NotFound(StudentId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns whether the engine rejected a write because of a table
    /// constraint (unique, check, not null or primary key).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::ConstraintViolation
        )
    }

    /// Engine message for a constraint violation, e.g.
    /// `UNIQUE constraint failed: students.email`.
    pub fn constraint_message(&self) -> Option<&str> {
        match self {
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, message)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                message.as_deref()
            }
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version is {actual_version}; expected {expected_version} (open it with rollcall_core::db)"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// How `enrolled_date` is filled when a `NewStudent` leaves it unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrolledDefault {
    /// Each record gets its own insertion time.
    #[default]
    PerRow,
    /// Every record gets the single timestamp captured when the schema was
    /// first materialized in this process.
    SchemaLoad,
}

impl EnrolledDefault {
    fn resolve(self) -> NaiveDateTime {
        match self {
            Self::PerRow => Local::now().naive_local(),
            Self::SchemaLoad => crate::db::schema::schema_loaded_at(),
        }
    }
}

/// Conjunction of optional row predicates. The default matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    /// Exact `name` match.
    pub name_eq: Option<String>,
    /// Substring match, rendered as `name LIKE '%…%'`.
    pub name_contains: Option<String>,
    /// Exact `grade` match.
    pub grade_eq: Option<i64>,
}

impl StudentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_eq = Some(name.into());
        self
    }

    pub fn with_name_containing(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    pub fn with_grade(mut self, grade: i64) -> Self {
        self.grade_eq = Some(grade);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name_eq.is_none() && self.name_contains.is_none() && self.grade_eq.is_none()
    }

    fn push_where(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        sql.push_str(" WHERE 1 = 1");

        if let Some(name) = self.name_eq.as_ref() {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        if let Some(fragment) = self.name_contains.as_ref() {
            sql.push_str(" AND name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(like_contains_pattern(fragment)));
        }

        if let Some(grade) = self.grade_eq {
            sql.push_str(" AND grade = ?");
            bind_values.push(Value::Integer(grade));
        }
    }
}

/// Result ordering. Ties always fall back to `id ASC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentOrder {
    /// Insertion order.
    #[default]
    Id,
    NameAsc,
    NameDesc,
    GradeDesc,
}

impl StudentOrder {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::Id => " ORDER BY id ASC",
            Self::NameAsc => " ORDER BY name ASC, id ASC",
            Self::NameDesc => " ORDER BY name DESC, id ASC",
            Self::GradeDesc => " ORDER BY grade DESC, id ASC",
        }
    }
}

/// Query options for listing students.
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub filter: StudentFilter,
    pub order: StudentOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl StudentQuery {
    pub fn filtered(filter: StudentFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn ordered(order: StudentOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn push_tail(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        sql.push_str(self.order.order_by_sql());

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Repository interface for student persistence.
pub trait StudentRepository {
    /// Inserts every record in one transaction and returns the assigned ids
    /// in input order.
    fn bulk_insert(&mut self, students: &[NewStudent]) -> RepoResult<Vec<StudentId>>;
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn list_students(&self, query: &StudentQuery) -> RepoResult<Vec<Student>>;
    /// Projects only the `name` column.
    fn list_names(&self, query: &StudentQuery) -> RepoResult<Vec<String>>;
    fn count_students(&self, filter: &StudentFilter) -> RepoResult<u64>;
    /// Rewrites every column except `id`.
    fn update_student(&self, student: &Student) -> RepoResult<()>;
    /// Applies `grade = grade + delta` to every matching row.
    fn increment_grade(&self, filter: &StudentFilter, delta: i64) -> RepoResult<usize>;
    /// Hard-deletes every matching row.
    fn delete_students(&self, filter: &StudentFilter) -> RepoResult<usize>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn mut Connection,
    enrolled_default: EnrolledDefault,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a connection with the schema applied.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_student_connection_ready(conn)?;
        Ok(Self {
            conn,
            enrolled_default: EnrolledDefault::default(),
        })
    }

    pub fn with_enrolled_default(mut self, enrolled_default: EnrolledDefault) -> Self {
        self.enrolled_default = enrolled_default;
        self
    }

    pub fn enrolled_default(&self) -> EnrolledDefault {
        self.enrolled_default
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn bulk_insert(&mut self, students: &[NewStudent]) -> RepoResult<Vec<StudentId>> {
        for student in students {
            student.validate()?;
        }
        if students.is_empty() {
            return Ok(Vec::new());
        }

        let enrolled_default = self.enrolled_default;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(students.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO students (
                    name,
                    email,
                    grade,
                    birthday,
                    enrolled_date
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for student in students {
                let enrolled_date = student
                    .enrolled_date
                    .unwrap_or_else(|| enrolled_default.resolve());
                stmt.execute(params![
                    student.name.as_str(),
                    student.email.as_str(),
                    student.grade,
                    student.birthday,
                    enrolled_date,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        Ok(ids)
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }

        Ok(None)
    }

    fn list_students(&self, query: &StudentQuery) -> RepoResult<Vec<Student>> {
        let mut sql = String::from(STUDENT_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();
        query.filter.push_where(&mut sql, &mut bind_values);
        query.push_tail(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }

    fn list_names(&self, query: &StudentQuery) -> RepoResult<Vec<String>> {
        let mut sql = String::from("SELECT name FROM students");
        let mut bind_values: Vec<Value> = Vec::new();
        query.filter.push_where(&mut sql, &mut bind_values);
        query.push_tail(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut names = Vec::new();

        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }

        Ok(names)
    }

    fn count_students(&self, filter: &StudentFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(id) FROM students");
        let mut bind_values: Vec<Value> = Vec::new();
        filter.push_where(&mut sql, &mut bind_values);

        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn update_student(&self, student: &Student) -> RepoResult<()> {
        student.validate()?;

        let changed = self.conn.execute(
            "UPDATE students
             SET
                name = ?1,
                email = ?2,
                grade = ?3,
                birthday = ?4,
                enrolled_date = ?5
             WHERE id = ?6;",
            params![
                student.name.as_str(),
                student.email.as_str(),
                student.grade,
                student.birthday,
                student.enrolled_date,
                student.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(student.id));
        }

        Ok(())
    }

    fn increment_grade(&self, filter: &StudentFilter, delta: i64) -> RepoResult<usize> {
        let mut sql = String::from("UPDATE students SET grade = grade + ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(delta)];
        filter.push_where(&mut sql, &mut bind_values);

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn delete_students(&self, filter: &StudentFilter) -> RepoResult<usize> {
        let mut sql = String::from("DELETE FROM students");
        let mut bind_values: Vec<Value> = Vec::new();
        filter.push_where(&mut sql, &mut bind_values);

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }
}

/// Builds a `LIKE` pattern matching `fragment` anywhere, with `\` as escape.
pub fn like_contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

// Table constraints define a valid row; reads take whatever the store holds.
fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    Ok(Student {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        grade: row.get("grade")?,
        birthday: row.get("birthday")?,
        enrolled_date: row.get("enrolled_date")?,
    })
}

fn ensure_student_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    if actual_version != SCHEMA_VERSION {
        return Err(RepoError::UninitializedConnection {
            expected_version: SCHEMA_VERSION,
            actual_version,
        });
    }

    if !table_exists(conn, STUDENTS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(STUDENTS_TABLE));
    }

    for column in STUDENT_COLUMNS.iter().copied() {
        if !table_has_column(conn, STUDENTS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: STUDENTS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
