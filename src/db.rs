use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::*;

/// Async-safe handle to the review database.
///
/// Wraps `ReviewDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads. The mutex also serializes the
/// deactivate+activate transaction in `replace_reviewer` against concurrent
/// replacement attempts on the same row.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<ReviewDb>>,
}

impl DbHandle {
    pub fn new(db: ReviewDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ReviewDb) -> Result<R> + Send + 'static,
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
    /// and tests only; never call from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, ReviewDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

pub struct ReviewDb {
    conn: Connection,
}

impl ReviewDb {
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
                CREATE TABLE IF NOT EXISTS teams (
                    team_name TEXT PRIMARY KEY,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY,
                    username TEXT NOT NULL,
                    team_name TEXT NOT NULL REFERENCES teams(team_name),
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS pull_requests (
                    pull_request_id TEXT PRIMARY KEY,
                    pull_request_name TEXT NOT NULL,
                    author_id TEXT NOT NULL REFERENCES users(user_id),
                    status TEXT NOT NULL DEFAULT 'OPEN',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    merged_at TEXT
                );

                CREATE TABLE IF NOT EXISTS pr_reviewers (
                    pull_request_id TEXT NOT NULL REFERENCES pull_requests(pull_request_id) ON DELETE CASCADE,
                    reviewer_id TEXT NOT NULL REFERENCES users(user_id),
                    is_active INTEGER NOT NULL DEFAULT 1,
                    assigned_at TEXT NOT NULL DEFAULT (datetime('now')),
                    replaced_at TEXT,
                    PRIMARY KEY (pull_request_id, reviewer_id)
                );

                CREATE INDEX IF NOT EXISTS idx_users_team ON users(team_name, is_active);
                CREATE INDEX IF NOT EXISTS idx_pr_reviewers_reviewer
                    ON pr_reviewers(reviewer_id, is_active);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Teams ─────────────────────────────────────────────────────────

    pub fn create_team(&self, team_name: &str) -> Result<()> {
        self.conn
            .execute("INSERT INTO teams (team_name) VALUES (?1)", params![team_name])
            .context("Failed to insert team")?;
        Ok(())
    }

    pub fn team_exists(&self, team_name: &str) -> Result<bool> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?1)",
                params![team_name],
                |row| row.get(0),
            )
            .context("Failed to check team existence")?;
        Ok(exists)
    }

    pub fn users_by_team(&self, team_name: &str) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, username, team_name, is_active, created_at, updated_at
                 FROM users WHERE team_name = ?1 ORDER BY user_id",
            )
            .context("Failed to prepare users_by_team")?;
        let rows = stmt
            .query_map(params![team_name], user_from_row)
            .context("Failed to query team users")?;
        collect_rows(rows, "Failed to read user row")
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn create_or_update_user(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (user_id, username, team_name, is_active)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id)
                 DO UPDATE SET username = excluded.username,
                               team_name = excluded.team_name,
                               is_active = excluded.is_active,
                               updated_at = datetime('now')",
                params![user.user_id, user.username, user.team_name, user.is_active],
            )
            .context("Failed to upsert user")?;
        Ok(())
    }

    pub fn user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT user_id, username, team_name, is_active, created_at, updated_at
                 FROM users WHERE user_id = ?1",
                params![user_id],
                user_from_row,
            )
            .optional()
            .context("Failed to query user")
    }

    /// Returns false when no user row matched.
    pub fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "UPDATE users SET is_active = ?1, updated_at = datetime('now')
                 WHERE user_id = ?2",
                params![is_active, user_id],
            )
            .context("Failed to update user active flag")?;
        Ok(count > 0)
    }

    pub fn active_team_members(&self, team_name: &str, exclude_user_id: &str) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, username, team_name, is_active, created_at, updated_at
                 FROM users
                 WHERE team_name = ?1 AND is_active = 1 AND user_id != ?2",
            )
            .context("Failed to prepare active_team_members")?;
        let rows = stmt
            .query_map(params![team_name, exclude_user_id], user_from_row)
            .context("Failed to query active team members")?;
        collect_rows(rows, "Failed to read user row")
    }

    // ── Pull requests ─────────────────────────────────────────────────

    pub fn create_request(&self, pr: &NewPullRequest) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status)
                 VALUES (?1, ?2, ?3, 'OPEN')",
                params![pr.pull_request_id, pr.pull_request_name, pr.author_id],
            )
            .context("Failed to insert pull request")?;
        Ok(())
    }

    /// Compensating rollback only: removes the request and (via cascade) any
    /// assignment rows written before the failure.
    pub fn delete_request(&self, request_id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "DELETE FROM pull_requests WHERE pull_request_id = ?1",
                params![request_id],
            )
            .context("Failed to delete pull request")?;
        Ok(count > 0)
    }

    pub fn request_exists(&self, request_id: &str) -> Result<bool> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?1)",
                params![request_id],
                |row| row.get(0),
            )
            .context("Failed to check pull request existence")?;
        Ok(exists)
    }

    pub fn request_by_id(&self, request_id: &str) -> Result<Option<PullRequest>> {
        let row = self
            .conn
            .query_row(
                "SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
                 FROM pull_requests WHERE pull_request_id = ?1",
                params![request_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query pull request")?;

        let Some((id, name, author_id, status, created_at, merged_at)) = row else {
            return Ok(None);
        };
        let status = RequestStatus::from_str(&status).map_err(|e| anyhow::anyhow!(e))?;
        let assigned_reviewers = self.active_reviewers(&id)?;
        Ok(Some(PullRequest {
            pull_request_id: id,
            pull_request_name: name,
            author_id,
            status,
            assigned_reviewers,
            created_at,
            merged_at,
        }))
    }

    pub fn merge_request(&self, request_id: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE pull_requests
                 SET status = 'MERGED', merged_at = datetime('now')
                 WHERE pull_request_id = ?1",
                params![request_id],
            )
            .context("Failed to merge pull request")?;
        Ok(())
    }

    // ── Reviewer assignments ──────────────────────────────────────────

    /// Insert-or-reactivate: postcondition is exactly one active row for the
    /// (request, reviewer) pair. Prior replacement history on the same pair
    /// is overwritten by design, matching a fresh assignment.
    pub fn set_reviewer_active(&self, request_id: &str, reviewer_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO pr_reviewers (pull_request_id, reviewer_id, is_active)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT (pull_request_id, reviewer_id)
                 DO UPDATE SET is_active = 1,
                               replaced_at = NULL,
                               assigned_at = datetime('now')",
                params![request_id, reviewer_id],
            )
            .context("Failed to upsert reviewer assignment")?;
        Ok(())
    }

    /// Conditional deactivation. The affected-row count is the race detector:
    /// 0 means no active row matched, i.e. another caller already replaced
    /// this reviewer.
    pub fn deactivate_reviewer(&self, request_id: &str, reviewer_id: &str) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE pr_reviewers
                 SET is_active = 0, replaced_at = datetime('now')
                 WHERE pull_request_id = ?1 AND reviewer_id = ?2 AND is_active = 1",
                params![request_id, reviewer_id],
            )
            .context("Failed to deactivate reviewer assignment")
    }

    /// Atomically swap one active reviewer for another on one request.
    ///
    /// Returns false when the outgoing reviewer had no active row (lost race
    /// or never assigned); in that case nothing is changed. Both state
    /// changes commit together or not at all.
    pub fn replace_reviewer(
        &self,
        request_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<bool> {
        // unchecked_transaction is sound here: DbHandle's mutex guarantees
        // single-threaded access to the connection.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin replacement transaction")?;

        let deactivated = tx
            .execute(
                "UPDATE pr_reviewers
                 SET is_active = 0, replaced_at = datetime('now')
                 WHERE pull_request_id = ?1 AND reviewer_id = ?2 AND is_active = 1",
                params![request_id, old_reviewer_id],
            )
            .context("Failed to deactivate outgoing reviewer")?;
        if deactivated == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO pr_reviewers (pull_request_id, reviewer_id, is_active)
             VALUES (?1, ?2, 1)
             ON CONFLICT (pull_request_id, reviewer_id)
             DO UPDATE SET is_active = 1,
                           replaced_at = NULL,
                           assigned_at = datetime('now')",
            params![request_id, new_reviewer_id],
        )
        .context("Failed to activate incoming reviewer")?;

        tx.commit().context("Failed to commit replacement")?;
        Ok(true)
    }

    pub fn active_reviewers(&self, request_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT reviewer_id FROM pr_reviewers
                 WHERE pull_request_id = ?1 AND is_active = 1
                 ORDER BY reviewer_id",
            )
            .context("Failed to prepare active_reviewers")?;
        let rows = stmt
            .query_map(params![request_id], |row| row.get::<_, String>(0))
            .context("Failed to query active reviewers")?;
        collect_rows(rows, "Failed to read reviewer row")
    }

    pub fn is_reviewer_assigned(&self, request_id: &str, reviewer_id: &str) -> Result<bool> {
        let assigned: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM pr_reviewers
                     WHERE pull_request_id = ?1 AND reviewer_id = ?2 AND is_active = 1
                 )",
                params![request_id, reviewer_id],
                |row| row.get(0),
            )
            .context("Failed to check reviewer assignment")?;
        Ok(assigned)
    }

    pub fn assigned_open_requests(&self, user_id: &str) -> Result<Vec<PullRequestSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
                 FROM pull_requests pr
                 JOIN pr_reviewers prr ON pr.pull_request_id = prr.pull_request_id
                 WHERE prr.reviewer_id = ?1 AND prr.is_active = 1 AND pr.status = 'OPEN'
                 ORDER BY pr.pull_request_id",
            )
            .context("Failed to prepare assigned_open_requests")?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .context("Failed to query assigned requests")?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, author_id, status) = row.context("Failed to read request row")?;
            summaries.push(PullRequestSummary {
                pull_request_id: id,
                pull_request_name: name,
                author_id,
                status: RequestStatus::from_str(&status).map_err(|e| anyhow::anyhow!(e))?,
            });
        }
        Ok(summaries)
    }

    // ── Stats ─────────────────────────────────────────────────────────

    /// Active assignment count per reviewer, ordered by reviewer id.
    pub fn assignment_stats(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT reviewer_id, COUNT(*) FROM pr_reviewers
                 WHERE is_active = 1
                 GROUP BY reviewer_id
                 ORDER BY reviewer_id",
            )
            .context("Failed to prepare assignment_stats")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .context("Failed to query assignment stats")?;
        collect_rows(rows, "Failed to read stats row")
    }

    pub fn request_metrics(&self) -> Result<RequestMetrics> {
        let total_prs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pull_requests", [], |row| row.get(0))
            .context("Failed to count pull requests")?;
        let open_prs: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pull_requests WHERE status = 'OPEN'",
                [],
                |row| row.get(0),
            )
            .context("Failed to count open pull requests")?;
        let merged_prs: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pull_requests WHERE status = 'MERGED'",
                [],
                |row| row.get(0),
            )
            .context("Failed to count merged pull requests")?;
        let avg_reviewers: f64 = self
            .conn
            .query_row(
                "SELECT COALESCE(AVG(reviewer_count), 0.0)
                 FROM (
                     SELECT COUNT(*) AS reviewer_count
                     FROM pr_reviewers
                     WHERE is_active = 1
                     GROUP BY pull_request_id
                 )",
                [],
                |row| row.get(0),
            )
            .context("Failed to compute average reviewer count")?;

        Ok(RequestMetrics {
            total_prs,
            open_prs,
            merged_prs,
            avg_reviewers,
        })
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        team_name: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    ctx: &'static str,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context(ctx)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> ReviewDb {
        let db = ReviewDb::new_in_memory().unwrap();
        db.create_team("backend").unwrap();
        for (id, name) in [("u1", "Alice"), ("u2", "Bob"), ("u3", "Carol")] {
            db.create_or_update_user(&User {
                user_id: id.into(),
                username: name.into(),
                team_name: "backend".into(),
                is_active: true,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .unwrap();
        }
        db
    }

    fn open_request(db: &ReviewDb, id: &str, author: &str) {
        db.create_request(&NewPullRequest {
            pull_request_id: id.into(),
            pull_request_name: format!("{} title", id),
            author_id: author.into(),
        })
        .unwrap();
    }

    #[test]
    fn user_upsert_and_lookup() {
        let db = seeded_db();
        let user = db.user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.username, "Alice");
        assert!(user.is_active);

        db.create_or_update_user(&User {
            user_id: "u1".into(),
            username: "Alice B".into(),
            team_name: "backend".into(),
            is_active: false,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .unwrap();
        let user = db.user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.username, "Alice B");
        assert!(!user.is_active);
    }

    #[test]
    fn set_user_active_reports_missing_user() {
        let db = seeded_db();
        assert!(db.set_user_active("u2", false).unwrap());
        assert!(!db.user_by_id("u2").unwrap().unwrap().is_active);
        assert!(!db.set_user_active("ghost", false).unwrap());
    }

    #[test]
    fn active_team_members_excludes_inactive_and_excluded() {
        let db = seeded_db();
        db.set_user_active("u3", false).unwrap();
        let members = db.active_team_members("backend", "u1").unwrap();
        let ids: Vec<_> = members.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u2"]);
    }

    #[test]
    fn request_round_trip_with_reviewers() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();
        db.set_reviewer_active("pr-1", "u3").unwrap();

        let pr = db.request_by_id("pr-1").unwrap().unwrap();
        assert_eq!(pr.status, RequestStatus::Open);
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u3"]);
        assert!(pr.merged_at.is_none());
        assert!(db.request_exists("pr-1").unwrap());
        assert!(!db.request_exists("pr-2").unwrap());
    }

    #[test]
    fn merge_stamps_timestamp_and_status() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.merge_request("pr-1").unwrap();
        let pr = db.request_by_id("pr-1").unwrap().unwrap();
        assert_eq!(pr.status, RequestStatus::Merged);
        assert!(pr.merged_at.is_some());
    }

    #[test]
    fn delete_request_cascades_assignment_rows() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();
        assert!(db.delete_request("pr-1").unwrap());
        assert!(!db.delete_request("pr-1").unwrap());
        assert!(db.assigned_open_requests("u2").unwrap().is_empty());
    }

    #[test]
    fn replace_reviewer_swaps_atomically() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();

        assert!(db.replace_reviewer("pr-1", "u2", "u3").unwrap());
        assert_eq!(db.active_reviewers("pr-1").unwrap(), vec!["u3"]);
        assert!(!db.is_reviewer_assigned("pr-1", "u2").unwrap());
    }

    #[test]
    fn replace_reviewer_detects_lost_race() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();

        assert!(db.replace_reviewer("pr-1", "u2", "u3").unwrap());
        // Second swap of the same outgoing reviewer: zero rows, no mutation.
        assert!(!db.replace_reviewer("pr-1", "u2", "u1").unwrap());
        assert_eq!(db.active_reviewers("pr-1").unwrap(), vec!["u3"]);
    }

    #[test]
    fn replacement_reactivates_prior_row_for_same_pair() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();
        assert!(db.replace_reviewer("pr-1", "u2", "u3").unwrap());
        // u2 comes back onto the request: history row is reactivated, the
        // composite key guarantees at most one row per pair.
        assert!(db.replace_reviewer("pr-1", "u3", "u2").unwrap());
        assert_eq!(db.active_reviewers("pr-1").unwrap(), vec!["u2"]);
    }

    #[test]
    fn assigned_open_requests_skips_merged_and_inactive() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        open_request(&db, "pr-2", "u1");
        open_request(&db, "pr-3", "u1");
        db.set_reviewer_active("pr-1", "u2").unwrap();
        db.set_reviewer_active("pr-2", "u2").unwrap();
        db.set_reviewer_active("pr-3", "u2").unwrap();
        db.merge_request("pr-2").unwrap();
        db.deactivate_reviewer("pr-3", "u2").unwrap();

        let prs = db.assigned_open_requests("u2").unwrap();
        let ids: Vec<_> = prs.iter().map(|p| p.pull_request_id.as_str()).collect();
        assert_eq!(ids, vec!["pr-1"]);
    }

    #[test]
    fn stats_count_only_active_rows() {
        let db = seeded_db();
        open_request(&db, "pr-1", "u1");
        open_request(&db, "pr-2", "u3");
        db.set_reviewer_active("pr-1", "u2").unwrap();
        db.set_reviewer_active("pr-2", "u2").unwrap();
        db.set_reviewer_active("pr-1", "u3").unwrap();
        db.replace_reviewer("pr-1", "u3", "u1").unwrap();

        let stats = db.assignment_stats().unwrap();
        assert_eq!(stats, vec![("u1".into(), 1), ("u2".into(), 2)]);

        let metrics = db.request_metrics().unwrap();
        assert_eq!(metrics.total_prs, 2);
        assert_eq!(metrics.open_prs, 2);
        assert_eq!(metrics.merged_prs, 0);
        assert!((metrics.avg_reviewers - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn db_handle_runs_closures_off_the_async_thread() {
        let handle = DbHandle::new(seeded_db());
        let user = handle
            .call(|db| db.user_by_id("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_id, "u1");
    }
}
