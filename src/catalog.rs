//! Command Catalog.
//!
//! Static routing from `(device_type, resource, access)` to the ordered list
//! of device commands that collect it. The routing table is versioned data
//! (`catalog/routes.yaml`), embedded at build time and parsed once; adding a
//! vendor/resource/method combination never touches dispatch logic.
//!
//! [`Catalog::build`] is atomic: if any requested combination has no route,
//! the whole request is rejected with [`RoutingError`] before any device I/O.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::dispatch::RawResult;

/// Embedded routing table, parsed on first use.
const BUILTIN_ROUTES: &str = include_str!("catalog/routes.yaml");

/// Routing failure: no catalog entry for a requested triple.
///
/// Fatal for the whole request; no partial command list is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "no route for device_type='{device_type}', resource='{resource}', access='{access}'"
)]
pub struct RoutingError {
    /// Requested device type.
    pub device_type: String,
    /// Requested resource kind.
    pub resource: ResourceKind,
    /// Requested access method.
    pub access: AccessMethod,
}

/// Driver variant that executes a command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Executor {
    /// SSH-style command interpreter driver (screen-scrape parsers).
    Cli,
    /// NETCONF-style structured query driver (RPC and table retrieval).
    Netconf,
}

/// Transport used to reach the device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccessMethod {
    Ssh,
    Netconf,
    Snmp,
}

/// Category of telemetry being gathered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResourceKind {
    BgpSession,
    Interface,
    LldpNeighbors,
    VpnSession,
}

impl ResourceKind {
    /// Protocol name for table resolution: the text before the first `_`
    /// separator, or the whole kind when there is none.
    pub fn protocol(&self) -> &'static str {
        let name: &'static str = (*self).into();
        match name.split_once('_') {
            Some((protocol, _)) => protocol,
            None => name,
        }
    }
}

/// Raw shape the transport's parser is asked to produce for a CLI command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawShape {
    /// Flat key/value rows (template-driven screen scraper).
    Rows,
    /// Nested tree keyed by context then identity (model-driven parser).
    Tree,
}

/// Parser hints carried from the catalog to the driver and normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseHints {
    /// Requested raw shape for CLI commands.
    #[serde(default)]
    pub shape: Option<RawShape>,
    /// Named table definition for NETCONF table-retrieval mode.
    #[serde(default)]
    pub table: Option<String>,
}

/// Wall-clock and elapsed timing for one executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// When execution started (UTC).
    pub started: DateTime<Utc>,
    /// When execution finished (UTC).
    pub finished: DateTime<Utc>,
    /// Monotonic elapsed time of the execution.
    pub elapsed: Duration,
}

/// One command to run against a device.
///
/// Created by the catalog with `result`/`timing` empty; the dispatcher
/// populates both in place. Each command is owned exclusively by the batch
/// that created it and is treated as immutable once normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Driver that executes this command.
    pub executor: Executor,
    /// Resource kind this command collects.
    pub resource: ResourceKind,
    /// Access method the route was selected for.
    pub access: AccessMethod,
    /// Command text (CLI command or RPC name).
    pub text: String,
    /// Parser hints from the catalog route.
    pub hints: ParseHints,
    /// Structured result, populated by the dispatcher.
    pub result: Option<RawResult>,
    /// Execution timing, populated by the dispatcher.
    pub timing: Option<Timing>,
}

#[derive(Debug, Clone, Deserialize)]
struct Route {
    device_type: String,
    resource: ResourceKind,
    access: AccessMethod,
    executor: Executor,
    commands: Vec<String>,
    #[serde(default)]
    hints: ParseHints,
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    routes: Vec<Route>,
}

/// Command routing catalog.
///
/// Keys routes by `(device_type, resource, access)`; one route expands into
/// one [`Command`] per listed command text, in listed order, all sharing the
/// route's executor and hints.
#[derive(Debug)]
pub struct Catalog {
    routes: HashMap<(String, ResourceKind, AccessMethod), Route>,
}

impl Catalog {
    /// Parse a catalog from a YAML routing document.
    ///
    /// # Errors
    /// Returns the YAML error when the document is malformed.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let file: RouteFile = serde_yaml::from_str(yaml)?;
        let mut routes = HashMap::with_capacity(file.routes.len());
        for route in file.routes {
            let key = (route.device_type.clone(), route.resource, route.access);
            routes.insert(key, route);
        }
        Ok(Self { routes })
    }

    /// The embedded routing table shipped with the crate.
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            Catalog::from_yaml(BUILTIN_ROUTES).expect("embedded routes.yaml must parse")
        })
    }

    /// Number of routes in the catalog.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the catalog has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build the ordered command batch for one device.
    ///
    /// The request is rejected atomically: the first
    /// `(device_type, resource, access)` triple without a route fails the
    /// whole call, and no device I/O has occurred at that point.
    ///
    /// # Errors
    /// [`RoutingError`] naming the missing triple.
    pub fn build(
        &self,
        device_type: &str,
        requests: &[(ResourceKind, AccessMethod)],
    ) -> Result<Vec<Command>, RoutingError> {
        let mut commands = Vec::new();
        for &(resource, access) in requests {
            let key = (device_type.to_string(), resource, access);
            let route = self.routes.get(&key).ok_or_else(|| RoutingError {
                device_type: device_type.to_string(),
                resource,
                access,
            })?;

            tracing::debug!(
                device_type,
                resource = %resource,
                access = %access,
                commands = route.commands.len(),
                "Route expanded"
            );
            commands.extend(route.commands.iter().map(|text| Command {
                executor: route.executor,
                resource,
                access,
                text: text.clone(),
                hints: route.hints.clone(),
                result: None,
                timing: None,
            }));
        }
        Ok(commands)
    }
}
