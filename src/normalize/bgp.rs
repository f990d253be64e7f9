//! BGP session normalization.
//!
//! Three structurally different raw shapes arrive for this resource kind:
//! flat template rows and nested vrf/neighbor trees from the CLI driver, and
//! typed table rows from the NETCONF driver. Each gets its own extraction
//! branch; all converge on [`BgpSession`].

use std::net::IpAddr;

use serde_json::Value;

use crate::catalog::{Command, ResourceKind};
use crate::config::ConnectionParams;
use crate::dispatch::{RawResult, TableRow};
use crate::metric::LineBuilder;

use super::transform::{canonical_peer_type, parse_int, parse_ip, session_state_code};
use super::{first_with_result, unsupported_shape, NormalizeError, Record};

/// Canonical BGP session record.
#[derive(Debug, Clone, PartialEq)]
pub struct BgpSession {
    pub local_address: Option<IpAddr>,
    pub neighbor_address: Option<IpAddr>,
    pub local_as: Option<i64>,
    pub peer_as: Option<i64>,
    pub peer_router_id: Option<IpAddr>,
    pub router_id: Option<IpAddr>,
    pub peer_type: Option<String>,
    pub routing_instance: String,
    pub peer_group: Option<String>,
    pub prefixes_denied: Option<i64>,
    pub prefixes_suppressed: Option<i64>,
    pub prefixes_received: Option<i64>,
    pub prefixes_received_pre_policy: Option<i64>,
    pub prefixes_sent: Option<i64>,
    pub prefixes_installed: Option<i64>,
    pub session_state: Option<String>,
    pub session_state_code: Option<u8>,
}

impl Default for BgpSession {
    fn default() -> Self {
        Self {
            local_address: None,
            neighbor_address: None,
            local_as: None,
            peer_as: None,
            peer_router_id: None,
            router_id: None,
            peer_type: None,
            routing_instance: "default".to_string(),
            peer_group: None,
            prefixes_denied: None,
            prefixes_suppressed: None,
            prefixes_received: None,
            prefixes_received_pre_policy: None,
            prefixes_sent: None,
            prefixes_installed: None,
            session_state: None,
            session_state_code: None,
        }
    }
}

impl BgpSession {
    /// Line-protocol metric with the fixed tag/field partition for this
    /// resource kind. Identity and classification values are tags;
    /// prefix counters and the state code are fields; absent values are
    /// omitted entirely.
    pub fn metric(&self) -> String {
        LineBuilder::new("bgp")
            .tag_opt("local_address", self.local_address.as_ref())
            .tag_opt("neighbor_address", self.neighbor_address.as_ref())
            .tag_opt("local_as", self.local_as.as_ref())
            .tag_opt("peer_as", self.peer_as.as_ref())
            .tag_opt("peer_router_id", self.peer_router_id.as_ref())
            .tag_opt("router_id", self.router_id.as_ref())
            .tag_opt("peer_type", self.peer_type.as_ref())
            .tag("routing_instance", &self.routing_instance)
            .tag_opt("peer_group", self.peer_group.as_ref())
            .field_opt("prefixes_received", self.prefixes_received.as_ref())
            .field_opt(
                "prefixes_received_pre_policy",
                self.prefixes_received_pre_policy.as_ref(),
            )
            .field_opt("prefixes_sent", self.prefixes_sent.as_ref())
            .field_opt("prefixes_installed", self.prefixes_installed.as_ref())
            .field_opt("session_state", self.session_state_code.as_ref())
            .build()
    }
}

/// Integer from a JSON leaf that may be numeric or a numeric string.
fn value_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(parse_int))
}

fn value_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn walk<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

/// CLI-driver processor: flat rows or a vrf/neighbor tree.
pub(super) fn from_cli(
    commands: &[Command],
    _conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let resource = ResourceKind::BgpSession;
    let (command, result) = first_with_result(commands, resource)?;

    let sessions = match result {
        RawResult::Rows(rows) => rows
            .iter()
            .map(|row| BgpSession {
                local_address: row.str("localhost_ip").and_then(parse_ip),
                neighbor_address: row.str("remote_ip").and_then(parse_ip),
                peer_as: row.str("remote_as").and_then(parse_int),
                peer_router_id: row.str("remote_router_id").and_then(parse_ip),
                session_state: row.str("bgp_state").map(str::to_lowercase),
                session_state_code: row.str("bgp_state").and_then(session_state_code),
                peer_group: row.str("peer_group").map(str::to_string),
                ..Default::default()
            })
            .collect(),
        RawResult::Tree(tree) => {
            let mut sessions = Vec::new();
            let vrfs = tree
                .get("vrf")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for (vrf_name, vrf) in &vrfs {
                let neighbors = vrf
                    .get("neighbor")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                for (neighbor_ip, data) in &neighbors {
                    let counters = [
                        "address_family",
                        "ipv4 unicast",
                        "prefix_activity_counters",
                    ];
                    let state = walk(data, &["session_state"]).and_then(value_str);
                    sessions.push(BgpSession {
                        local_address: walk(
                            data,
                            &["bgp_session_transport", "transport", "local_host"],
                        )
                        .and_then(value_str)
                        .and_then(parse_ip),
                        neighbor_address: parse_ip(neighbor_ip),
                        peer_as: walk(data, &["remote_as"]).and_then(value_int),
                        router_id: walk(data, &["router_id"])
                            .and_then(value_str)
                            .and_then(parse_ip),
                        session_state: state.map(str::to_lowercase),
                        session_state_code: state.and_then(session_state_code),
                        routing_instance: vrf_name.clone(),
                        prefixes_received: walk(data, &counters)
                            .and_then(|c| walk(c, &["received", "prefixes_current"]))
                            .and_then(value_int),
                        prefixes_sent: walk(data, &counters)
                            .and_then(|c| walk(c, &["sent", "prefixes_current"]))
                            .and_then(value_int),
                        prefixes_installed: walk(data, &counters)
                            .and_then(|c| walk(c, &["received", "used_as_bestpath"]))
                            .and_then(value_int),
                        ..Default::default()
                    });
                }
            }
            sessions
        }
        other => return Err(unsupported_shape(resource, command, other)),
    };

    Ok(sessions.into_iter().map(Record::Bgp).collect())
}

fn table_ip(row: &TableRow, name: &str) -> Option<IpAddr> {
    row.field(name).and_then(parse_ip)
}

/// Counter fields default to 0 when the source omits them; identifiers
/// stay absent.
fn table_count(row: &TableRow, name: &str) -> i64 {
    row.field(name).and_then(parse_int).unwrap_or(0)
}

/// NETCONF-driver processor: typed table rows.
pub(super) fn from_table(
    commands: &[Command],
    _conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let resource = ResourceKind::BgpSession;
    let (command, result) = first_with_result(commands, resource)?;

    let rows = match result {
        RawResult::Table(rows) => rows,
        other => return Err(unsupported_shape(resource, command, other)),
    };

    let sessions = rows
        .iter()
        .map(|row| {
            let prefixes_received = table_count(row, "prefixes_accepted");
            let prefixes_received_pre_policy = table_count(row, "prefixes_received");
            let prefixes_denied = prefixes_received_pre_policy - prefixes_received;
            let state = row.field("peer_state");

            BgpSession {
                local_address: table_ip(row, "local_address"),
                neighbor_address: table_ip(row, "peer_address"),
                local_as: row.field("local_as").and_then(parse_int),
                peer_as: row.field("peer_as").and_then(parse_int),
                peer_router_id: table_ip(row, "peer_id"),
                router_id: table_ip(row, "local_id"),
                peer_type: row.field("peer_type").map(canonical_peer_type),
                prefixes_received: Some(prefixes_received),
                prefixes_received_pre_policy: Some(prefixes_received_pre_policy),
                prefixes_denied: Some(prefixes_denied),
                prefixes_installed: Some(table_count(row, "prefixes_active")),
                prefixes_suppressed: Some(table_count(row, "prefixes_suppressed")),
                prefixes_sent: Some(table_count(row, "prefixes_advertised")),
                session_state: state.map(str::to_lowercase),
                session_state_code: state.and_then(session_state_code),
                ..Default::default()
            }
        })
        .map(Record::Bgp)
        .collect();

    Ok(sessions)
}
