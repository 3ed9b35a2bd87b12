use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::*;

/// Async-safe handle to the tracking database.
///
/// Wraps `TrackerDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads. The mutex also serializes the
/// find-or-create path of `update_status`, so two concurrent callers can
/// never both observe "no existing row".
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TrackerDb>>,
}

impl DbHandle {
    pub fn new(db: TrackerDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TrackerDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For startup initialization
    /// and tests only; must not be called from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, TrackerDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

pub struct TrackerDb {
    conn: Connection,
}

impl TrackerDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS sections (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    is_deleted INTEGER NOT NULL DEFAULT 0,
                    deletion_date TEXT
                );

                CREATE TABLE IF NOT EXISTS persons (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    surname TEXT NOT NULL,
                    phone_number TEXT NOT NULL UNIQUE,
                    email TEXT,
                    section_id INTEGER REFERENCES sections(id) ON DELETE SET NULL,
                    role TEXT NOT NULL DEFAULT 'worker',
                    hashed_password TEXT NOT NULL,
                    refresh_token TEXT,
                    refresh_token_expires_at TEXT
                );

                CREATE TABLE IF NOT EXISTS work_assignments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    work_order_id TEXT NOT NULL,
                    section_id INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
                    person_id INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
                    start_date TEXT NOT NULL,
                    end_date TEXT,
                    pause_date TEXT,
                    status TEXT NOT NULL DEFAULT 'pending',
                    approval_status TEXT NOT NULL DEFAULT 'pending',
                    description TEXT,
                    approval_notes TEXT
                );

                CREATE TABLE IF NOT EXISTS session_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    work_order_id TEXT NOT NULL,
                    section_id INTEGER NOT NULL,
                    person_id INTEGER NOT NULL,
                    log_type TEXT NOT NULL,
                    event_date TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS excel_files (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_name TEXT NOT NULL,
                    stored_name TEXT NOT NULL,
                    uploaded_at TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 0,
                    is_deleted INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_assignments_order_section
                    ON work_assignments(work_order_id, section_id);
                CREATE INDEX IF NOT EXISTS idx_assignments_section ON work_assignments(section_id);
                CREATE INDEX IF NOT EXISTS idx_assignments_person ON work_assignments(person_id);
                CREATE INDEX IF NOT EXISTS idx_logs_order ON session_logs(work_order_id);
                CREATE INDEX IF NOT EXISTS idx_logs_person ON session_logs(person_id);
                CREATE INDEX IF NOT EXISTS idx_logs_section ON session_logs(section_id);
                ",
            )
            .context("Failed to create tables")?;

        Ok(())
    }

    // ── Section CRUD ──────────────────────────────────────────────────

    pub fn create_section(&self, name: &str, description: Option<&str>) -> Result<Section> {
        self.conn
            .execute(
                "INSERT INTO sections (name, description) VALUES (?1, ?2)",
                params![name, description],
            )
            .context("Failed to insert section")?;
        let id = self.conn.last_insert_rowid();
        self.get_section(id)?
            .context("Section not found after insert")
    }

    pub fn list_sections(&self) -> Result<Vec<Section>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, is_deleted, deletion_date FROM sections ORDER BY id",
            )
            .context("Failed to prepare list_sections")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Section {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    is_deleted: row.get(3)?,
                    deletion_date: row.get(4)?,
                })
            })
            .context("Failed to query sections")?;
        let mut sections = Vec::new();
        for row in rows {
            sections.push(row.context("Failed to read section row")?);
        }
        Ok(sections)
    }

    pub fn get_section(&self, id: i64) -> Result<Option<Section>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, is_deleted, deletion_date FROM sections WHERE id = ?1",
            )
            .context("Failed to prepare get_section")?;
        let mut rows = stmt
            .query_map(params![id], |row| {
                Ok(Section {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    is_deleted: row.get(3)?,
                    deletion_date: row.get(4)?,
                })
            })
            .context("Failed to query section")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read section row")?)),
            None => Ok(None),
        }
    }

    pub fn update_section(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Section>> {
        let count = self
            .conn
            .execute(
                "UPDATE sections SET name = ?1, description = ?2 WHERE id = ?3",
                params![name, description, id],
            )
            .context("Failed to update section")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_section(id)
    }

    /// Hard delete. Cascades to work assignments via foreign key; persons
    /// referencing the section get their section_id set to NULL.
    pub fn delete_section(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM sections WHERE id = ?1", params![id])
            .context("Failed to delete section")?;
        Ok(count > 0)
    }

    // ── Person CRUD ───────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_person(
        &self,
        name: &str,
        surname: &str,
        phone_number: &str,
        email: Option<&str>,
        section_id: Option<i64>,
        role: PersonRole,
        hashed_password: &str,
    ) -> Result<Person> {
        self.conn
            .execute(
                "INSERT INTO persons (name, surname, phone_number, email, section_id, role, hashed_password)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![name, surname, phone_number, email, section_id, role.as_str(), hashed_password],
            )
            .context("Failed to insert person")?;
        let id = self.conn.last_insert_rowid();
        self.get_person(id)?
            .context("Person not found after insert")
    }

    pub fn list_persons(&self) -> Result<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, surname, phone_number, email, section_id, role, hashed_password,
                        refresh_token, refresh_token_expires_at
                 FROM persons ORDER BY id",
            )
            .context("Failed to prepare list_persons")?;
        let rows = stmt
            .query_map([], person_row)
            .context("Failed to query persons")?;
        let mut persons = Vec::new();
        for row in rows {
            let r = row.context("Failed to read person row")?;
            persons.push(r.into_person()?);
        }
        Ok(persons)
    }

    pub fn get_person(&self, id: i64) -> Result<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, surname, phone_number, email, section_id, role, hashed_password,
                        refresh_token, refresh_token_expires_at
                 FROM persons WHERE id = ?1",
            )
            .context("Failed to prepare get_person")?;
        let mut rows = stmt
            .query_map(params![id], person_row)
            .context("Failed to query person")?;
        match rows.next() {
            Some(row) => {
                let r = row.context("Failed to read person row")?;
                Ok(Some(r.into_person()?))
            }
            None => Ok(None),
        }
    }

    pub fn get_person_by_phone(&self, phone_number: &str) -> Result<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, surname, phone_number, email, section_id, role, hashed_password,
                        refresh_token, refresh_token_expires_at
                 FROM persons WHERE phone_number = ?1",
            )
            .context("Failed to prepare get_person_by_phone")?;
        let mut rows = stmt
            .query_map(params![phone_number], person_row)
            .context("Failed to query person by phone")?;
        match rows.next() {
            Some(row) => {
                let r = row.context("Failed to read person row")?;
                Ok(Some(r.into_person()?))
            }
            None => Ok(None),
        }
    }

    /// The authenticated person together with their home section.
    pub fn get_person_info(&self, id: i64) -> Result<Option<PersonInfo>> {
        let person = match self.get_person(id)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let section = match person.section_id {
            Some(sid) => self.get_section(sid)?,
            None => None,
        };
        Ok(Some(PersonInfo { person, section }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_person(
        &self,
        id: i64,
        name: &str,
        surname: &str,
        phone_number: &str,
        email: Option<&str>,
        section_id: Option<i64>,
        role: PersonRole,
        hashed_password: Option<&str>,
    ) -> Result<Option<Person>> {
        let count = self
            .conn
            .execute(
                "UPDATE persons SET name = ?1, surname = ?2, phone_number = ?3, email = ?4,
                        section_id = ?5, role = ?6
                 WHERE id = ?7",
                params![name, surname, phone_number, email, section_id, role.as_str(), id],
            )
            .context("Failed to update person")?;
        if count == 0 {
            return Ok(None);
        }
        if let Some(hash) = hashed_password {
            self.conn
                .execute(
                    "UPDATE persons SET hashed_password = ?1 WHERE id = ?2",
                    params![hash, id],
                )
                .context("Failed to update person password")?;
        }
        self.get_person(id)
    }

    pub fn delete_person(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM persons WHERE id = ?1", params![id])
            .context("Failed to delete person")?;
        Ok(count > 0)
    }

    /// Store or clear the rotating refresh token for a person.
    pub fn set_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
        expires_at: Option<&str>,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE persons SET refresh_token = ?1, refresh_token_expires_at = ?2 WHERE id = ?3",
                params![token, expires_at, id],
            )
            .context("Failed to update refresh token")?;
        Ok(())
    }

    // ── Work assignment CRUD ──────────────────────────────────────────

    pub fn create_assignment(
        &self,
        work_order_id: &str,
        section_id: i64,
        person_id: i64,
        description: Option<&str>,
    ) -> Result<WorkAssignment> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO work_assignments (work_order_id, section_id, person_id, start_date, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![work_order_id, section_id, person_id, now, description],
            )
            .context("Failed to insert assignment")?;
        let id = self.conn.last_insert_rowid();
        self.get_assignment(id)?
            .context("Assignment not found after insert")
    }

    pub fn list_assignments(&self) -> Result<Vec<AssignmentDetail>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM work_assignments ORDER BY id"
            ))
            .context("Failed to prepare list_assignments")?;
        let rows = stmt
            .query_map([], assignment_row)
            .context("Failed to query assignments")?;
        let mut details = Vec::new();
        for row in rows {
            let r = row.context("Failed to read assignment row")?;
            let assignment = r.into_assignment()?;
            let person = self.get_person(assignment.person_id)?;
            let section = self.get_section(assignment.section_id)?;
            details.push(AssignmentDetail {
                assignment,
                person,
                section,
            });
        }
        Ok(details)
    }

    pub fn get_assignment(&self, id: i64) -> Result<Option<WorkAssignment>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM work_assignments WHERE id = ?1"
            ))
            .context("Failed to prepare get_assignment")?;
        let mut rows = stmt
            .query_map(params![id], assignment_row)
            .context("Failed to query assignment")?;
        match rows.next() {
            Some(row) => {
                let r = row.context("Failed to read assignment row")?;
                Ok(Some(r.into_assignment()?))
            }
            None => Ok(None),
        }
    }

    pub fn get_assignment_detail(&self, id: i64) -> Result<Option<AssignmentDetail>> {
        let assignment = match self.get_assignment(id)? {
            Some(a) => a,
            None => return Ok(None),
        };
        let person = self.get_person(assignment.person_id)?;
        let section = self.get_section(assignment.section_id)?;
        Ok(Some(AssignmentDetail {
            assignment,
            person,
            section,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_assignment(
        &self,
        id: i64,
        work_order_id: &str,
        section_id: i64,
        person_id: i64,
        status: WorkStatus,
        approval_status: ApprovalStatus,
        description: Option<&str>,
        approval_notes: Option<&str>,
    ) -> Result<Option<WorkAssignment>> {
        let count = self
            .conn
            .execute(
                "UPDATE work_assignments SET work_order_id = ?1, section_id = ?2, person_id = ?3,
                        status = ?4, approval_status = ?5, description = ?6, approval_notes = ?7
                 WHERE id = ?8",
                params![
                    work_order_id,
                    section_id,
                    person_id,
                    status.as_str(),
                    approval_status.as_str(),
                    description,
                    approval_notes,
                    id
                ],
            )
            .context("Failed to update assignment")?;
        if count == 0 {
            return Ok(None);
        }
        self.get_assignment(id)
    }

    /// Hard delete. No session log is written for deletion.
    pub fn delete_assignment(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM work_assignments WHERE id = ?1", params![id])
            .context("Failed to delete assignment")?;
        Ok(count > 0)
    }

    // ── Lifecycle transitions ─────────────────────────────────────────

    /// Find-or-create status transition for a (work order, section) pair.
    ///
    /// When no row exists yet, one is created with the requested status,
    /// owned by the acting person, and a `Started` log event is written
    /// regardless of the requested status. When a row exists, only its
    /// `status` column changes and the log event type follows the fixed
    /// mapping in [`LogEventType::from_status`].
    ///
    /// The caller validates the status code; `actor` is the authenticated
    /// person performing the transition.
    pub fn update_status(
        &self,
        work_order_id: &str,
        section_id: i64,
        new_status: WorkStatus,
        actor: i64,
    ) -> Result<WorkAssignment> {
        let now = chrono::Utc::now().to_rfc3339();
        // DbHandle's mutex guarantees exclusive access, so unchecked_transaction
        // is safe and the lookup below cannot race another insert.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM work_assignments
                 WHERE work_order_id = ?1 AND section_id = ?2
                 ORDER BY id LIMIT 1",
                params![work_order_id, section_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up assignment")?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE work_assignments SET status = ?1 WHERE id = ?2",
                    params![new_status.as_str(), id],
                )
                .context("Failed to update assignment status")?;
                insert_log(
                    &tx,
                    work_order_id,
                    section_id,
                    actor,
                    LogEventType::from_status(new_status),
                    &now,
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO work_assignments (work_order_id, section_id, person_id, start_date, status)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![work_order_id, section_id, actor, now, new_status.as_str()],
                )
                .context("Failed to insert assignment")?;
                let id = tx.last_insert_rowid();
                // The creation path always logs Started, whatever status was
                // requested. Legacy behavior, kept on purpose.
                insert_log(&tx, work_order_id, section_id, actor, LogEventType::Started, &now)?;
                id
            }
        };

        tx.commit().context("Failed to commit status update")?;
        self.get_assignment(id)?
            .context("Assignment not found after status update")
    }

    /// Quality-control decision for an assignment. Only terminal decisions
    /// are accepted: Pending is rejected without touching any state. Sets
    /// `approval_status` and `approval_notes` unconditionally (whether the
    /// work is Completed is the caller's contract) and writes exactly one
    /// matching log row in the same transaction. The log row is attributed
    /// to the assignment's owner, not the approver.
    pub fn update_approval(
        &self,
        id: i64,
        decision: ApprovalStatus,
        notes: &str,
    ) -> Result<Option<WorkAssignment>> {
        let log_type = match decision {
            ApprovalStatus::Approved => LogEventType::Approved,
            ApprovalStatus::Rejected => LogEventType::Rejected,
            ApprovalStatus::Pending => bail!("approval decision must be approved or rejected"),
        };
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let keys: Option<(String, i64, i64)> = tx
            .query_row(
                "SELECT work_order_id, section_id, person_id FROM work_assignments WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("Failed to look up assignment")?;
        let (work_order_id, section_id, person_id) = match keys {
            Some(k) => k,
            None => return Ok(None),
        };

        tx.execute(
            "UPDATE work_assignments SET approval_status = ?1, approval_notes = ?2 WHERE id = ?3",
            params![decision.as_str(), notes, id],
        )
        .context("Failed to update approval status")?;
        insert_log(&tx, &work_order_id, section_id, person_id, log_type, &now)?;

        tx.commit().context("Failed to commit approval update")?;
        self.get_assignment(id)
    }

    /// Force every non-Completed assignment to Paused and stamp its
    /// pause_date. Writes no session logs (bulk operations never did).
    pub fn pause_all_except_completed(&self) -> Result<usize> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE work_assignments SET status = 'paused', pause_date = ?1
                 WHERE status != 'completed'",
                params![now],
            )
            .context("Failed to pause assignments")
    }

    /// Force every non-Completed assignment back to Started and clear its
    /// pause_date. Pending rows are swept to Started as well, matching the
    /// legacy bulk path. Writes no session logs.
    pub fn resume_all_except_completed(&self) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE work_assignments SET status = 'started', pause_date = NULL
                 WHERE status != 'completed'",
                [],
            )
            .context("Failed to resume assignments")
    }

    // ── Session logs ──────────────────────────────────────────────────

    pub fn list_logs(&self) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT id, work_order_id, section_id, person_id, log_type, event_date
             FROM session_logs ORDER BY event_date DESC, id DESC",
            params![],
        )
    }

    pub fn logs_by_work_order(&self, work_order_id: &str) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT id, work_order_id, section_id, person_id, log_type, event_date
             FROM session_logs WHERE work_order_id = ?1 ORDER BY event_date DESC, id DESC",
            params![work_order_id],
        )
    }

    pub fn logs_by_person(&self, person_id: i64) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT id, work_order_id, section_id, person_id, log_type, event_date
             FROM session_logs WHERE person_id = ?1 ORDER BY event_date DESC, id DESC",
            params![person_id],
        )
    }

    pub fn logs_by_section(&self, section_id: i64) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT id, work_order_id, section_id, person_id, log_type, event_date
             FROM session_logs WHERE section_id = ?1 ORDER BY event_date DESC, id DESC",
            params![section_id],
        )
    }

    fn query_logs(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<SessionLog>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare logs query")?;
        let rows = stmt
            .query_map(args, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("Failed to query session logs")?;
        let mut logs = Vec::new();
        for row in rows {
            let (id, work_order_id, section_id, person_id, log_type_str, event_date) =
                row.context("Failed to read session log row")?;
            logs.push(SessionLog {
                id,
                work_order_id,
                section_id,
                person_id,
                log_type: log_type_str.parse().map_err(|_| {
                    anyhow::anyhow!("invalid log_type in database: '{}'", log_type_str)
                })?,
                event_date,
            });
        }
        Ok(logs)
    }

    // ── Excel file registry ───────────────────────────────────────────

    /// Register an uploaded workbook and make it the single active file.
    pub fn insert_excel_file(&self, file_name: &str, stored_name: &str) -> Result<ExcelFile> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute("UPDATE excel_files SET is_active = 0 WHERE is_active = 1", [])
            .context("Failed to deactivate previous workbook")?;
        tx.execute(
            "INSERT INTO excel_files (file_name, stored_name, uploaded_at, is_active)
             VALUES (?1, ?2, ?3, 1)",
            params![file_name, stored_name, now],
        )
        .context("Failed to insert excel file")?;
        let id = tx.last_insert_rowid();
        tx.commit().context("Failed to commit excel upload")?;
        self.get_excel_file(id)?
            .context("Excel file not found after insert")
    }

    pub fn get_excel_file(&self, id: i64) -> Result<Option<ExcelFile>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, file_name, stored_name, uploaded_at, is_active, is_deleted
                 FROM excel_files WHERE id = ?1",
            )
            .context("Failed to prepare get_excel_file")?;
        let mut rows = stmt
            .query_map(params![id], excel_file_row)
            .context("Failed to query excel file")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read excel file row")?)),
            None => Ok(None),
        }
    }

    pub fn list_excel_files(&self) -> Result<Vec<ExcelFile>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, file_name, stored_name, uploaded_at, is_active, is_deleted
                 FROM excel_files ORDER BY id DESC",
            )
            .context("Failed to prepare list_excel_files")?;
        let rows = stmt
            .query_map([], excel_file_row)
            .context("Failed to query excel files")?;
        let mut files = Vec::new();
        for row in rows {
            files.push(row.context("Failed to read excel file row")?);
        }
        Ok(files)
    }

    pub fn active_excel_file(&self) -> Result<Option<ExcelFile>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, file_name, stored_name, uploaded_at, is_active, is_deleted
                 FROM excel_files WHERE is_active = 1 ORDER BY id DESC LIMIT 1",
            )
            .context("Failed to prepare active_excel_file")?;
        let mut rows = stmt
            .query_map([], excel_file_row)
            .context("Failed to query active excel file")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read excel file row")?)),
            None => Ok(None),
        }
    }
}

const ASSIGNMENT_COLUMNS: &str = "id, work_order_id, section_id, person_id, start_date, end_date, \
     pause_date, status, approval_status, description, approval_notes";

fn insert_log(
    conn: &Connection,
    work_order_id: &str,
    section_id: i64,
    person_id: i64,
    log_type: LogEventType,
    event_date: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO session_logs (work_order_id, section_id, person_id, log_type, event_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![work_order_id, section_id, person_id, log_type.as_str(), event_date],
    )
    .context("Failed to insert session log")?;
    Ok(())
}

// ── Internal row helpers ──────────────────────────────────────────────

/// Intermediate row struct for persons, before parsing the role string.
struct PersonRow {
    id: i64,
    name: String,
    surname: String,
    phone_number: String,
    email: Option<String>,
    section_id: Option<i64>,
    role: String,
    hashed_password: String,
    refresh_token: Option<String>,
    refresh_token_expires_at: Option<String>,
}

fn person_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersonRow> {
    Ok(PersonRow {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        phone_number: row.get(3)?,
        email: row.get(4)?,
        section_id: row.get(5)?,
        role: row.get(6)?,
        hashed_password: row.get(7)?,
        refresh_token: row.get(8)?,
        refresh_token_expires_at: row.get(9)?,
    })
}

impl PersonRow {
    fn into_person(self) -> Result<Person> {
        let role = self
            .role
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid role in database: '{}'", self.role))?;
        Ok(Person {
            id: self.id,
            name: self.name,
            surname: self.surname,
            phone_number: self.phone_number,
            email: self.email,
            section_id: self.section_id,
            role,
            hashed_password: self.hashed_password,
            refresh_token: self.refresh_token,
            refresh_token_expires_at: self.refresh_token_expires_at,
        })
    }
}

/// Intermediate row struct for work assignments, before parsing the two
/// status strings.
struct AssignmentRow {
    id: i64,
    work_order_id: String,
    section_id: i64,
    person_id: i64,
    start_date: String,
    end_date: Option<String>,
    pause_date: Option<String>,
    status: String,
    approval_status: String,
    description: Option<String>,
    approval_notes: Option<String>,
}

fn assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        id: row.get(0)?,
        work_order_id: row.get(1)?,
        section_id: row.get(2)?,
        person_id: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        pause_date: row.get(6)?,
        status: row.get(7)?,
        approval_status: row.get(8)?,
        description: row.get(9)?,
        approval_notes: row.get(10)?,
    })
}

impl AssignmentRow {
    fn into_assignment(self) -> Result<WorkAssignment> {
        let status = self
            .status
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid status in database: '{}'", self.status))?;
        let approval_status = self.approval_status.parse().map_err(|_| {
            anyhow::anyhow!("invalid approval_status in database: '{}'", self.approval_status)
        })?;
        Ok(WorkAssignment {
            id: self.id,
            work_order_id: self.work_order_id,
            section_id: self.section_id,
            person_id: self.person_id,
            start_date: self.start_date,
            end_date: self.end_date,
            pause_date: self.pause_date,
            status,
            approval_status,
            description: self.description,
            approval_notes: self.approval_notes,
        })
    }
}

fn excel_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExcelFile> {
    Ok(ExcelFile {
        id: row.get(0)?,
        file_name: row.get(1)?,
        stored_name: row.get(2)?,
        uploaded_at: row.get(3)?,
        is_active: row.get(4)?,
        is_deleted: row.get(5)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
