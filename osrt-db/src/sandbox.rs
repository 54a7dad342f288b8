//! One SQLite database per plugin, with a dedicated serial work queue and a
//! forbidden-statement filter applied before every `prepare`.

use crate::error::DbError;
use crate::json::{bind_values, encode_cell};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reject any statement whose whitespace-trimmed, upper-cased text begins
/// with `ATTACH`/`DETACH`, or contains the literal `LOAD_EXTENSION`
/// anywhere. Runs before `prepare`.
fn forbidden_reason(sql: &str) -> Option<&'static str> {
    let upper = sql.trim().to_ascii_uppercase();
    if upper.starts_with("ATTACH") {
        Some("ATTACH is forbidden")
    } else if upper.starts_with("DETACH") {
        Some("DETACH is forbidden")
    } else if upper.contains("LOAD_EXTENSION") {
        Some("LOAD_EXTENSION is forbidden")
    } else {
        None
    }
}

type Job = Box<dyn FnOnce(&Connection) + Send>;

/// A plugin's sandboxed SQLite database, owning a dedicated background
/// thread that serialises every `exec`/`query` call.
pub struct PluginDatabase {
    job_tx: crossbeam_channel::Sender<Job>,
    worker: Option<std::thread::JoinHandle<()>>,
    path: PathBuf,
}

impl PluginDatabase {
    /// Open (creating if absent) `<data_root>/Tools/<plugin_id>/data.db`.
    pub fn open(plugin_id: &str, data_root: &Path) -> Result<Self, DbError> {
        let path = data_root.join("Tools").join(plugin_id).join("data.db");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::OpenFailed(e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(|e| DbError::OpenFailed(e.to_string()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DbError::OpenFailed(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| DbError::OpenFailed(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| DbError::OpenFailed(e.to_string()))?;

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let worker = std::thread::Builder::new()
            .name(format!("osrt-db-{plugin_id}"))
            .spawn(move || {
                for job in job_rx {
                    job(&conn);
                }
            })
            .map_err(|e| DbError::OpenFailed(e.to_string()))?;

        Ok(Self {
            job_tx,
            worker: Some(worker),
            path,
        })
    }

    fn submit<T, F>(&self, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        let job: Job = Box::new(move |conn| {
            let _ = reply_tx.send(f(conn));
        });
        self.job_tx
            .send(job)
            .expect("database worker thread outlives the database handle");
        reply_rx
            .recv()
            .expect("worker always replies before taking the next job")
    }

    /// Prepares `sql`, optionally binds `params` (a JSON array), steps to
    /// completion. Returns `{"changes":n,"last_insert_rowid":m}` on success,
    /// `{"error":"..."}` otherwise.
    pub fn exec(&self, sql: &str, params: Option<&Value>) -> Value {
        if let Some(reason) = forbidden_reason(sql) {
            return DbError::Forbidden(reason.to_string()).to_json_body();
        }
        let sql = sql.to_string();
        let params = params.cloned();
        self.submit(move |conn| {
            let values = match bind_values(params.as_ref()) {
                Ok(v) => v,
                Err(e) => return DbError::PrepareFailed(e).to_json_body(),
            };
            let mut stmt = match conn.prepare(&sql) {
                Ok(s) => s,
                Err(e) => return DbError::PrepareFailed(e.to_string()).to_json_body(),
            };
            match stmt.execute(rusqlite::params_from_iter(values.iter())) {
                Ok(_) => json!({
                    "changes": conn.changes(),
                    "last_insert_rowid": conn.last_insert_rowid(),
                }),
                Err(e) => DbError::ExecFailed(e.to_string()).to_json_body(),
            }
        })
    }

    /// Prepares `sql`, binds `params`, collects column names then all rows.
    /// Returns `{"columns":[...],"rows":[[...],...]}` on success.
    pub fn query(&self, sql: &str, params: Option<&Value>) -> Value {
        if let Some(reason) = forbidden_reason(sql) {
            return DbError::Forbidden(reason.to_string()).to_json_body();
        }
        let sql = sql.to_string();
        let params = params.cloned();
        self.submit(move |conn| {
            let values = match bind_values(params.as_ref()) {
                Ok(v) => v,
                Err(e) => return DbError::PrepareFailed(e).to_json_body(),
            };
            let mut stmt = match conn.prepare(&sql) {
                Ok(s) => s,
                Err(e) => return DbError::PrepareFailed(e.to_string()).to_json_body(),
            };
            let column_names: Vec<String> =
                stmt.column_names().iter().map(|s| s.to_string()).collect();
            let mut rows = match stmt.query(rusqlite::params_from_iter(values.iter())) {
                Ok(r) => r,
                Err(e) => return DbError::ExecFailed(e.to_string()).to_json_body(),
            };

            let mut out_rows = Vec::new();
            loop {
                match rows.next() {
                    Ok(Some(row)) => {
                        let mut out_row = Vec::with_capacity(column_names.len());
                        for i in 0..column_names.len() {
                            let value_ref = match row.get_ref(i) {
                                Ok(v) => v,
                                Err(e) => return DbError::ExecFailed(e.to_string()).to_json_body(),
                            };
                            out_row.push(encode_cell(value_ref));
                        }
                        out_rows.push(Value::Array(out_row));
                    }
                    Ok(None) => break,
                    Err(e) => return DbError::ExecFailed(e.to_string()).to_json_body(),
                }
            }

            json!({ "columns": column_names, "rows": out_rows })
        })
    }

    /// Reclaim free pages. Additive maintenance operation, not part of the
    /// plugin-facing wire contract.
    pub fn vacuum(&self) -> Result<(), DbError> {
        self.submit(|conn| {
            conn.execute_batch("VACUUM")
                .map_err(|e| DbError::ExecFailed(e.to_string()))
        })
    }

    /// Current size of the backing file on disk, for host-side quota
    /// reporting.
    pub fn size_bytes(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

impl Drop for PluginDatabase {
    fn drop(&mut self) {
        // Dropping job_tx closes the channel; the worker thread's for-loop
        // over job_rx then exits on its own.
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_test_db() -> (PluginDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = PluginDatabase::open("com.example.plugin", dir.path()).unwrap();
        (db, dir)
    }

    #[test]
    fn forbidden_attach_is_rejected() {
        let (db, _dir) = open_test_db();
        let result = db.exec("ATTACH DATABASE '/tmp/x' AS x", None);
        assert_eq!(result["error"], json!("statement forbidden: ATTACH is forbidden"));
        let cols = db.query("SELECT name FROM sqlite_master", None);
        assert_eq!(cols["rows"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn forbidden_detach_is_rejected() {
        let (db, _dir) = open_test_db();
        let result = db.exec("  detach database x", None);
        assert!(result.get("error").is_some());
    }

    #[test]
    fn forbidden_load_extension_anywhere_in_statement() {
        let (db, _dir) = open_test_db();
        let result = db.exec("SELECT load_extension('evil.so')", None);
        assert!(result.get("error").is_some());
    }

    #[test]
    fn create_table_and_parameterised_inserts_then_query() {
        let (db, _dir) = open_test_db();
        let created = db.exec("CREATE TABLE kv(k TEXT, v TEXT)", None);
        assert!(created.get("error").is_none());

        db.exec("INSERT INTO kv VALUES (?1, ?2)", Some(&json!(["a", "1"])));
        db.exec("INSERT INTO kv VALUES (?1, ?2)", Some(&json!(["b", "2"])));

        let result = db.query("SELECT * FROM kv ORDER BY k", None);
        assert_eq!(result["columns"], json!(["k", "v"]));
        assert_eq!(
            result["rows"],
            json!([["\"a\"", "\"1\""], ["\"b\"", "\"2\""]])
        );
    }

    #[test]
    fn exec_reports_changes_and_last_insert_rowid() {
        let (db, _dir) = open_test_db();
        db.exec("CREATE TABLE t(id INTEGER PRIMARY KEY, n INTEGER)", None);
        let result = db.exec("INSERT INTO t(n) VALUES (?1)", Some(&json!([42])));
        assert_eq!(result["changes"], json!(1));
        assert_eq!(result["last_insert_rowid"], json!(1));
    }

    #[test]
    fn prepare_failure_surfaces_as_error_json() {
        let (db, _dir) = open_test_db();
        let result = db.exec("NOT VALID SQL AT ALL", None);
        assert!(result.get("error").is_some());
    }

    #[test]
    fn null_values_round_trip() {
        let (db, _dir) = open_test_db();
        db.exec("CREATE TABLE n(x)", None);
        db.exec("INSERT INTO n VALUES (?1)", Some(&json!([null])));
        let result = db.query("SELECT x FROM n", None);
        assert_eq!(result["rows"], json!([[null]]));
    }

    #[test]
    fn vacuum_succeeds_on_empty_database() {
        let (db, _dir) = open_test_db();
        assert!(db.vacuum().is_ok());
    }

    #[test]
    fn size_bytes_is_nonzero_after_writes() {
        let (db, _dir) = open_test_db();
        db.exec("CREATE TABLE t(x)", None);
        assert!(db.size_bytes() > 0);
    }

    #[test]
    fn concurrent_callers_are_safely_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let db = std::sync::Arc::new(PluginDatabase::open("concurrent", dir.path()).unwrap());
        db.exec("CREATE TABLE counters(n INTEGER)", None);
        db.exec("INSERT INTO counters VALUES (0)", None);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let db = std::sync::Arc::clone(&db);
                std::thread::spawn(move || {
                    db.exec("UPDATE counters SET n = n + 1", None);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let result = db.query("SELECT n FROM counters", None);
        assert_eq!(result["rows"], json!([[20]]));
    }
}
