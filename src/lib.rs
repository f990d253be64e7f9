//! Netgauge - Network Device State Collector
//!
//! This crate polls network devices (routers, firewalls) for operational
//! state - BGP sessions, interfaces, LLDP neighbors, VPN sessions - and
//! converts vendor-specific raw output into a small set of canonical
//! resource records, serialized as time-series line-protocol metrics.
//!
//! # Architecture
//!
//! - **Catalog**: routes `(device_type, resource, access)` to device commands
//! - **Dispatch**: executes a command batch over interchangeable session
//!   drivers with per-command timing and typed failure capture
//! - **Tables**: two-tier resolution of named NETCONF table definitions
//! - **Normalize**: per-resource processors that absorb heterogeneous raw
//!   shapes into one canonical schema per resource kind
//! - **Metric**: line-protocol serialization of canonical records
//!
//! The SSH/NETCONF transports themselves are external collaborators: callers
//! provide a [`SessionFactory`] and the dispatcher only talks to devices
//! through the narrow [`CliSession`] / [`NetconfSession`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use netgauge::{poll_device, AccessMethod, ConnectionParams, Dispatcher, ResourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(Arc::new(MyTransports));
//!     let conn = ConnectionParams::from_env("192.0.2.1", "cisco_ios", false)?;
//!     let records = poll_device(
//!         &dispatcher,
//!         &conn,
//!         &[(ResourceKind::BgpSession, AccessMethod::Ssh)],
//!     )
//!     .await?;
//!     for record in &records {
//!         println!("{}", record.to_line());
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod metric;
pub mod normalize;
pub mod poll;
pub mod tables;

pub use catalog::{
    AccessMethod, Catalog, Command, Executor, ParseHints, RawShape, ResourceKind, RoutingError,
    Timing,
};
pub use config::{ConfigError, ConnectionParams, SecretString};
pub use dispatch::{
    CliSession, DispatchError, DispatchOutcome, Dispatcher, NetconfSession, RawResult, RawRow,
    SessionError, SessionFactory, SessionPool, TableRow,
};
pub use metric::{FieldValue, LineBuilder, LineParseError, ParsedLine};
pub use normalize::{normalize, NormalizeError, Record};
pub use poll::{poll_device, PollError};
pub use tables::{
    CustomTableRegistry, StaticTableRegistry, TableLookupError, TableProvider, TableResolver,
    TableSpec,
};
