//! The narrow session interface to the transport collaborators, plus the
//! per-device session cache.
//!
//! Session establishment, protocol framing, and screen-scraping-to-structured
//! data translation all live outside this crate; the dispatcher only ever
//! calls [`CliSession`] / [`NetconfSession`] and consumes whatever
//! [`RawResult`] the transport's parsers produced.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::catalog::ParseHints;
use crate::config::ConnectionParams;
use crate::tables::TableSpec;

/// Transport-collaborator failure surface.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Underlying transport I/O fault.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unexpected response from the device.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session is no longer usable.
    #[error("session closed")]
    Closed,
}

/// One cell row from a template-driven (flat tabular) parser.
///
/// Cells are JSON values because some templates emit list-valued cells (the
/// ASA session-db output is one row whose columns are parallel lists).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow(BTreeMap<String, serde_json::Value>);

impl RawRow {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// String cell value; empty strings read as absent.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// List-valued cell as string items.
    pub fn list(&self, key: &str) -> Option<Vec<&str>> {
        let items = self.0.get(key)?.as_array()?;
        items.iter().map(serde_json::Value::as_str).collect()
    }
}

impl From<BTreeMap<String, serde_json::Value>> for RawRow {
    fn from(cells: BTreeMap<String, serde_json::Value>) -> Self {
        Self(cells)
    }
}

/// One typed row fetched through a resolved table definition.
///
/// Attributes are named strings; empty attribute values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow(BTreeMap<String, String>);

impl TableRow {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Attribute value; absent or empty attributes read as `None`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// Structured output of one command, already disambiguated by shape.
///
/// Every vendor, parser, and access method produces differently shaped data;
/// this tagged union is the boundary where that heterogeneity enters the
/// crate. Normalization selects an extraction branch per variant instead of
/// probing fields defensively.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Flat key/value rows (template-driven screen scraper output).
    Rows(Vec<RawRow>),
    /// Nested tree keyed by context then identity (model-driven parser).
    Tree(serde_json::Value),
    /// Typed rows fetched through a resolved table definition.
    Table(Vec<TableRow>),
}

impl RawResult {
    /// Shape name for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Rows(_) => "rows",
            Self::Tree(_) => "tree",
            Self::Table(_) => "table",
        }
    }

    /// Whether the result carries no data at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Rows(rows) => rows.is_empty(),
            Self::Table(rows) => rows.is_empty(),
            Self::Tree(value) => match value {
                serde_json::Value::Null => true,
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                _ => false,
            },
        }
    }
}

/// SSH-style command-interpreter session.
#[async_trait::async_trait]
pub trait CliSession: Send {
    /// Run one command and return its parsed output, shaped per the hints.
    async fn run(&mut self, command: &str, hints: &ParseHints) -> Result<RawResult, SessionError>;

    /// Tear the session down.
    async fn close(&mut self);
}

/// NETCONF-style structured-query session.
#[async_trait::async_trait]
pub trait NetconfSession: Send {
    /// Issue a structured query by RPC name.
    async fn rpc(&mut self, command: &str) -> Result<RawResult, SessionError>;

    /// Fetch the rows of a resolved table definition.
    async fn fetch_table(&mut self, spec: &TableSpec) -> Result<Vec<TableRow>, SessionError>;

    /// Tear the session down.
    async fn close(&mut self);
}

/// Produces device sessions; implemented by the transport collaborator.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open an SSH-style session to the device.
    async fn connect_cli(
        &self,
        conn: &ConnectionParams,
    ) -> Result<Box<dyn CliSession>, SessionError>;

    /// Open a NETCONF-style session to the device.
    async fn connect_netconf(
        &self,
        conn: &ConnectionParams,
    ) -> Result<Box<dyn NetconfSession>, SessionError>;
}

/// Per-device cache of reusable session handles.
///
/// Handles are keyed by device identity and checked out exclusively: `take_*`
/// removes the handle from the cache, so two concurrent dispatches to the
/// same device can never share one session. A handle's lifetime is tied to
/// the device, not to a single batch.
#[derive(Default)]
pub struct SessionPool {
    cli: Mutex<HashMap<String, Box<dyn CliSession>>>,
    netconf: Mutex<HashMap<String, Box<dyn NetconfSession>>>,
}

impl SessionPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out the cached CLI session for this device, if any.
    pub async fn take_cli(&self, conn: &ConnectionParams) -> Option<Box<dyn CliSession>> {
        self.cli.lock().await.remove(&conn.device_key())
    }

    /// Return a CLI session to the cache for this device.
    pub async fn store_cli(&self, conn: &ConnectionParams, session: Box<dyn CliSession>) {
        self.cli.lock().await.insert(conn.device_key(), session);
    }

    /// Check out the cached NETCONF session for this device, if any.
    pub async fn take_netconf(&self, conn: &ConnectionParams) -> Option<Box<dyn NetconfSession>> {
        self.netconf.lock().await.remove(&conn.device_key())
    }

    /// Return a NETCONF session to the cache for this device.
    pub async fn store_netconf(&self, conn: &ConnectionParams, session: Box<dyn NetconfSession>) {
        self.netconf.lock().await.insert(conn.device_key(), session);
    }

    /// Whether a CLI session is cached for this device.
    pub async fn has_cli(&self, conn: &ConnectionParams) -> bool {
        self.cli.lock().await.contains_key(&conn.device_key())
    }

    /// Whether a NETCONF session is cached for this device.
    pub async fn has_netconf(&self, conn: &ConnectionParams) -> bool {
        self.netconf.lock().await.contains_key(&conn.device_key())
    }

    /// Close and drop every cached session.
    pub async fn drain(&self) {
        let cli: Vec<_> = self.cli.lock().await.drain().collect();
        for (key, mut session) in cli {
            tracing::debug!(device = %key, "Closing cached cli session");
            session.close().await;
        }
        let netconf: Vec<_> = self.netconf.lock().await.drain().collect();
        for (key, mut session) in netconf {
            tracing::debug!(device = %key, "Closing cached netconf session");
            session.close().await;
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field(
                "cli_cached",
                &self.cli.try_lock().map(|m| m.len()).unwrap_or(0),
            )
            .field(
                "netconf_cached",
                &self.netconf.try_lock().map(|m| m.len()).unwrap_or(0),
            )
            .finish()
    }
}
