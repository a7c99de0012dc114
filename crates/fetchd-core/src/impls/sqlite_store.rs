//! SQLite backed request store.
//!
//! One row per request in `requests`. The `seq` column is the listing order.
//! Header maps are stored as JSON so repeated values and embedded `,`/`;`/`:`
//! survive a round trip.
//!
//! The connection sits behind a `std::sync::Mutex` and every operation runs on
//! the blocking pool (`spawn_blocking`), bounded by `op_timeout` both inside
//! SQLite (`busy_timeout`) and around the whole call. A call that times out is
//! reported as `Internal`; its statement may still complete in the background.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::Span;

use crate::domain::{
    Error, ErrorKind, FetchSpec, Headers, Paginator, Request, RequestId, Response, Result,
    paginator::window_of,
};
use crate::ports::id_generator::MAX_ID_ATTEMPTS;
use crate::ports::{IdGenerator, RequestStore, UlidGenerator};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS requests (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    id               TEXT NOT NULL UNIQUE,
    method           TEXT NOT NULL,
    url              TEXT NOT NULL,
    fetch_headers    TEXT NOT NULL,
    body             TEXT,
    status           INTEGER,
    length           INTEGER,
    response_headers TEXT
);";

const SELECT_COLUMNS: &str =
    "SELECT id, method, url, fetch_headers, body, status, length, response_headers FROM requests";

/// Default bound for one store operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteRequestStore {
    conn: Arc<Mutex<Connection>>,
    id_gen: Arc<dyn IdGenerator>,
    op_timeout: Duration,
    span: Span,
}

impl SqliteRequestStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, op_timeout: Duration, span: Span) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        Self::from_connection(conn, op_timeout, span)
    }

    /// Private database that lives as long as the store.
    pub fn open_in_memory(op_timeout: Duration, span: Span) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn, op_timeout, span)
    }

    fn from_connection(conn: Connection, op_timeout: Duration, span: Span) -> Result<Self> {
        conn.busy_timeout(op_timeout).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        span.in_scope(|| tracing::debug!(timeout_ms = op_timeout.as_millis() as u64, "sqlite store ready"));
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            id_gen: Arc::new(UlidGenerator::default()),
            op_timeout,
            span,
        })
    }

    pub fn with_id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Arc::new(id_gen);
        self
    }

    /// Run `f` against the connection on the blocking pool.
    async fn call<R, F>(&self, op: &'static str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| Error::internal("sqlite connection mutex poisoned"))?;
            f(&mut *conn)
        });

        let result = match tokio::time::timeout(self.op_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::internal(format!("{op}: blocking task failed: {join}"))),
            Err(_) => Err(Error::internal(format!(
                "{op}: timed out after {:?}",
                self.op_timeout
            ))),
        };

        if let Err(err) = &result
            && err.kind() == ErrorKind::Internal
        {
            self.span
                .in_scope(|| tracing::error!(op, error = %err, "sqlite operation failed"));
        }
        result
    }
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn add_request(&self, spec: FetchSpec) -> Result<RequestId> {
        let id_gen = Arc::clone(&self.id_gen);
        let fetch_headers = encode_headers(&spec.headers)?;

        self.call("add_request", move |conn| {
            let mut insert = conn
                .prepare(
                    "INSERT INTO requests (id, method, url, fetch_headers, body) VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;

            // redraw on a UNIQUE(id) violation, like the in-memory store
            for _ in 0..MAX_ID_ATTEMPTS {
                let id = id_gen.generate_request_id();
                let inserted = insert.execute(params![
                    id.to_string(),
                    spec.method.as_str(),
                    spec.url.as_str(),
                    fetch_headers,
                    spec.body,
                ]);
                match inserted {
                    Ok(_) => return Ok(id),
                    Err(e) if is_constraint_violation(&e) => continue,
                    Err(e) => return Err(db_err(e)),
                }
            }
            Err(Error::internal(format!(
                "no unused request id after {MAX_ID_ATTEMPTS} attempts"
            )))
        })
        .await
    }

    async fn add_response(&self, id: RequestId, response: Response) -> Result<()> {
        if response.id != id {
            return Err(Error::invalid_input(format!(
                "response for {} attached to {id}",
                response.id
            )));
        }
        let response_headers = encode_headers(&response.headers)?;
        let length = i64::try_from(response.length).unwrap_or(i64::MAX);

        self.call("add_response", move |conn| {
            let tx = conn.transaction().map_err(db_err)?;
            let status: Option<Option<i64>> = tx
                .query_row(
                    "SELECT status FROM requests WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;

            match status {
                None => return Err(Error::NotFound(id)),
                Some(Some(_)) => {
                    return Err(Error::invalid_input(format!(
                        "response for {id} already attached"
                    )));
                }
                Some(None) => {}
            }

            tx.execute(
                "UPDATE requests SET status = ?1, length = ?2, response_headers = ?3 WHERE id = ?4",
                params![i64::from(response.status), length, response_headers, id.to_string()],
            )
            .map_err(db_err)?;
            tx.commit().map_err(db_err)
        })
        .await
    }

    async fn delete_request(&self, id: RequestId) -> Result<()> {
        self.call("delete_request", move |conn| {
            let deleted = conn
                .execute("DELETE FROM requests WHERE id = ?1", params![id.to_string()])
                .map_err(db_err)?;
            if deleted == 0 {
                return Err(Error::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all_requests(&self, paginator: Option<Paginator>) -> Result<Vec<Request>> {
        // LIMIT -1 is "no limit" in SQLite
        let (limit, offset) = match window_of(paginator.as_ref()) {
            Some(window) => (to_i64(window.len()), to_i64(window.start)),
            None => (-1, 0),
        };

        self.call("get_all_requests", move |conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY seq LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params![limit, offset], RequestRow::from_row)
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;
            rows.into_iter().map(Request::try_from).collect()
        })
        .await
    }

    async fn get_request(&self, id: RequestId) -> Result<Request> {
        self.call("get_request", move |conn| {
            let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
            let row = conn
                .query_row(&sql, params![id.to_string()], RequestRow::from_row)
                .optional()
                .map_err(db_err)?
                .ok_or(Error::NotFound(id))?;
            Request::try_from(row)
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.call("len", |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))
                .map_err(db_err)?;
            usize::try_from(count).map_err(|_| Error::internal(format!("row count {count}")))
        })
        .await
    }
}

/// Raw column values of one `requests` row.
struct RequestRow {
    id: String,
    method: String,
    url: String,
    fetch_headers: String,
    body: Option<String>,
    status: Option<i64>,
    length: Option<i64>,
    response_headers: Option<String>,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            fetch_headers: row.get(3)?,
            body: row.get(4)?,
            status: row.get(5)?,
            length: row.get(6)?,
            response_headers: row.get(7)?,
        })
    }
}

impl TryFrom<RequestRow> for Request {
    type Error = Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        let id: RequestId = row.id.parse().map_err(corrupt)?;
        let mut fetch = FetchSpec::new(row.method.parse().map_err(corrupt)?, &row.url)
            .map_err(corrupt)?;
        fetch.headers = decode_headers(&row.fetch_headers)?;
        fetch.body = row.body;

        let response = match row.status {
            None => None,
            Some(status) => {
                let status = u16::try_from(status)
                    .map_err(|_| Error::internal(format!("stored status {status} out of range")))?;
                let headers = match row.response_headers.as_deref() {
                    Some(raw) => decode_headers(raw)?,
                    None => Headers::new(),
                };
                Some(
                    Response::new(id, status)
                        .with_headers(headers)
                        .with_content_length(row.length),
                )
            }
        };

        Ok(Request { id, fetch, response })
    }
}

fn encode_headers(headers: &Headers) -> Result<String> {
    serde_json::to_string(headers).map_err(|e| Error::internal(format!("encode headers: {e}")))
}

fn decode_headers(raw: &str) -> Result<Headers> {
    serde_json::from_str(raw).map_err(|e| Error::internal(format!("stored headers: {e}")))
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::internal(format!("sqlite: {e}"))
}

fn corrupt(e: Error) -> Error {
    Error::internal(format!("corrupt row: {e}"))
}
