//! Interface normalization.
//!
//! Interface state arrives as a nested tree keyed by interface name; the
//! processor flattens it into [`Interface`] records with typed counters and
//! normalized MAC addresses.

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::catalog::{Command, ResourceKind};
use crate::config::ConnectionParams;
use crate::dispatch::RawResult;
use crate::metric::LineBuilder;

use super::transform::normalize_mac;
use super::{first_with_result, unsupported_shape, NormalizeError, Record};

/// Interface operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OperStatus {
    Up,
    Down,
}

/// Port-channel membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortChannel {
    pub member: bool,
}

/// Address role on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AddressRole {
    Primary,
    Secondary,
}

/// One address bound to an interface, in CIDR form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub address: Option<String>,
    pub role: Option<AddressRole>,
}

/// Traffic and error counters, all absent-when-unreported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub in_pkts: Option<i64>,
    pub in_octets: Option<i64>,
    pub in_multicast_pkts: Option<i64>,
    pub in_broadcast_pkts: Option<i64>,
    pub in_runts: Option<i64>,
    pub in_giants: Option<i64>,
    pub in_throttles: Option<i64>,
    pub in_errors: Option<i64>,
    pub in_crc_errors: Option<i64>,
    pub out_pkts: Option<i64>,
    pub out_octets: Option<i64>,
    pub out_multicast_pkts: Option<i64>,
    pub out_broadcast_pkts: Option<i64>,
    pub out_errors: Option<i64>,
    pub out_collision: Option<i64>,
    pub out_unknown_protocol_drops: Option<i64>,
    pub out_late_collision: Option<i64>,
    pub out_deferred: Option<i64>,
    pub out_lost_carrier: Option<i64>,
    pub out_no_carrier: Option<i64>,
}

/// Canonical interface record.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub enabled: bool,
    pub oper_status: OperStatus,
    pub description: Option<String>,
    pub line_protocol: Option<OperStatus>,
    pub port_channel: Option<PortChannel>,
    pub interface_type: Option<String>,
    pub mac_address: Option<String>,
    pub ipv4: Vec<InterfaceAddress>,
    pub ipv6: Vec<InterfaceAddress>,
    pub delay: Option<i64>,
    pub mtu: Option<i64>,
    pub bandwidth: Option<i64>,
    pub duplex_mode: Option<String>,
    pub port_speed: Option<String>,
    pub counters: Option<InterfaceCounters>,
}

impl Interface {
    /// Line-protocol metric with the fixed tag/field partition for this
    /// resource kind: identity/classification values as tags, state flags
    /// and counters as fields.
    pub fn metric(&self) -> String {
        let counters = self.counters.unwrap_or_default();
        LineBuilder::new("interface")
            .tag("name", &self.name)
            .tag_opt("type", self.interface_type.as_ref())
            .tag_opt("mac_address", self.mac_address.as_ref())
            .tag_opt("duplex_mode", self.duplex_mode.as_ref())
            .tag_opt("port_speed", self.port_speed.as_ref())
            .field("enabled", self.enabled)
            .field("oper_up", self.oper_status == OperStatus::Up)
            .field_opt("mtu", self.mtu.as_ref())
            .field_opt("bandwidth", self.bandwidth.as_ref())
            .field_opt("delay", self.delay.as_ref())
            .field_opt("in_octets", counters.in_octets.as_ref())
            .field_opt("in_pkts", counters.in_pkts.as_ref())
            .field_opt("in_errors", counters.in_errors.as_ref())
            .field_opt("out_octets", counters.out_octets.as_ref())
            .field_opt("out_pkts", counters.out_pkts.as_ref())
            .field_opt("out_errors", counters.out_errors.as_ref())
            .build()
    }
}

fn node_int(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

fn node_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_counters(params: &Value) -> Option<InterfaceCounters> {
    let counters = params.get("counters")?;
    counters.as_object()?;
    Some(InterfaceCounters {
        in_pkts: node_int(counters, "in_pkts"),
        in_octets: node_int(counters, "in_octets"),
        in_multicast_pkts: node_int(counters, "in_multicast_pkts"),
        in_broadcast_pkts: node_int(counters, "in_broadcast_pkts"),
        in_runts: node_int(counters, "in_runts"),
        in_giants: node_int(counters, "in_giants"),
        in_throttles: node_int(counters, "in_throttles"),
        in_errors: node_int(counters, "in_errors"),
        in_crc_errors: node_int(counters, "in_crc_errors"),
        out_pkts: node_int(counters, "out_pkts"),
        out_octets: node_int(counters, "out_octets"),
        out_multicast_pkts: node_int(counters, "out_multicast_pkts"),
        out_broadcast_pkts: node_int(counters, "out_broadcast_pkts"),
        out_errors: node_int(counters, "out_errors"),
        out_collision: node_int(counters, "out_collision"),
        out_unknown_protocol_drops: node_int(counters, "out_unknown_protocol_drops"),
        out_late_collision: node_int(counters, "out_late_collision"),
        out_deferred: node_int(counters, "out_deferred"),
        out_lost_carrier: node_int(counters, "out_lost_carrier"),
        out_no_carrier: node_int(counters, "out_no_carrier"),
    })
}

fn extract_addresses(params: &Value, family: &str) -> Vec<InterfaceAddress> {
    params
        .get(family)
        .and_then(Value::as_object)
        .map(|addresses| {
            addresses
                .keys()
                .map(|address| InterfaceAddress {
                    address: Some(address.clone()),
                    role: None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_status(
    params: &Value,
    key: &str,
    name: &str,
) -> Result<Option<OperStatus>, NormalizeError> {
    match node_str(params, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<OperStatus>()
            .map(Some)
            .map_err(|_| NormalizeError::Malformed {
                resource: ResourceKind::Interface,
                detail: format!("interface '{name}': invalid {key} '{raw}'"),
            }),
    }
}

/// CLI-driver processor: nested per-interface tree.
pub(super) fn from_cli(
    commands: &[Command],
    _conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let resource = ResourceKind::Interface;
    let (command, result) = first_with_result(commands, resource)?;

    let tree = match result {
        RawResult::Tree(tree) => tree,
        other => return Err(unsupported_shape(resource, command, other)),
    };
    let interfaces = tree
        .as_object()
        .ok_or_else(|| NormalizeError::Malformed {
            resource,
            detail: "interface tree is not keyed by interface name".to_string(),
        })?;

    let mut records = Vec::with_capacity(interfaces.len());
    for (name, params) in interfaces {
        let oper_status =
            parse_status(params, "oper_status", name)?.ok_or_else(|| NormalizeError::Malformed {
                resource,
                detail: format!("interface '{name}': missing oper_status"),
            })?;
        let port_channel = params
            .get("port_channel")
            .and_then(|pc| pc.get("port_channel_member"))
            .and_then(Value::as_bool)
            .map(|member| PortChannel { member });

        records.push(Record::Interface(Interface {
            name: name.clone(),
            enabled: params
                .get("enabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            oper_status,
            description: node_str(params, "description"),
            line_protocol: parse_status(params, "line_protocol", name)?,
            port_channel,
            interface_type: node_str(params, "type"),
            mac_address: node_str(params, "mac_address")
                .as_deref()
                .and_then(normalize_mac),
            ipv4: extract_addresses(params, "ipv4"),
            ipv6: extract_addresses(params, "ipv6"),
            delay: node_int(params, "delay"),
            mtu: node_int(params, "mtu"),
            bandwidth: node_int(params, "bandwidth"),
            duplex_mode: node_str(params, "duplex_mode"),
            port_speed: node_str(params, "port_speed"),
            counters: extract_counters(params),
        }));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AccessMethod, Executor, ParseHints, RawShape};

    fn conn() -> ConnectionParams {
        ConnectionParams::new("192.0.2.1", "cisco_ios", "ops", "hunter2")
    }

    fn command_with(result: RawResult) -> Command {
        Command {
            executor: Executor::Cli,
            resource: ResourceKind::Interface,
            access: AccessMethod::Ssh,
            text: "show interfaces".to_string(),
            hints: ParseHints {
                shape: Some(RawShape::Tree),
                table: None,
            },
            result: Some(result),
            timing: None,
        }
    }

    fn sample_tree() -> RawResult {
        RawResult::Tree(serde_json::json!({
            "GigabitEthernet0/1": {
                "enabled": true,
                "oper_status": "up",
                "line_protocol": "up",
                "description": "uplink to core",
                "type": "GigabitEthernet",
                "mac_address": "0x02AB11223344",
                "mtu": 1500,
                "bandwidth": 1000000,
                "delay": 10,
                "duplex_mode": "full",
                "port_speed": "1000mb/s",
                "port_channel": { "port_channel_member": false },
                "ipv4": { "10.0.0.1/24": {} },
                "ipv6": {},
                "counters": {
                    "in_pkts": 1000,
                    "in_octets": 820000,
                    "in_errors": 2,
                    "out_pkts": 900,
                    "out_octets": 640000,
                    "out_errors": 0
                }
            }
        }))
    }

    #[test]
    fn test_tree_branch() {
        let records = from_cli(&[command_with(sample_tree())], &conn()).unwrap();
        assert_eq!(records.len(), 1);
        let interface = match &records[0] {
            Record::Interface(interface) => interface,
            other => panic!("expected interface record, got {other:?}"),
        };

        assert_eq!(interface.name, "GigabitEthernet0/1");
        assert!(interface.enabled);
        assert_eq!(interface.oper_status, OperStatus::Up);
        assert_eq!(interface.line_protocol, Some(OperStatus::Up));
        assert_eq!(interface.mac_address.as_deref(), Some("02:ab:11:22:33:44"));
        assert_eq!(interface.ipv4.len(), 1);
        assert_eq!(interface.ipv4[0].address.as_deref(), Some("10.0.0.1/24"));
        assert!(interface.ipv6.is_empty());
        assert_eq!(interface.port_channel, Some(PortChannel { member: false }));
        let counters = interface.counters.unwrap();
        assert_eq!(counters.in_pkts, Some(1000));
        assert_eq!(counters.out_errors, Some(0));
        assert_eq!(counters.in_runts, None);
    }

    #[test]
    fn test_invalid_oper_status_is_malformed() {
        let tree = RawResult::Tree(serde_json::json!({
            "Gi0/1": { "enabled": true, "oper_status": "sideways" }
        }));
        let err = from_cli(&[command_with(tree)], &conn()).unwrap_err();
        match err {
            NormalizeError::Malformed { detail, .. } => {
                assert!(detail.contains("Gi0/1"));
                assert!(detail.contains("sideways"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_oper_status_is_malformed() {
        let tree = RawResult::Tree(serde_json::json!({
            "Gi0/1": { "enabled": true }
        }));
        assert!(matches!(
            from_cli(&[command_with(tree)], &conn()),
            Err(NormalizeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_rows_shape_is_unsupported() {
        let command = command_with(RawResult::Rows(vec![crate::dispatch::RawRow::new()
            .with("name", "Gi0/1")]));
        assert!(matches!(
            from_cli(&[command], &conn()),
            Err(NormalizeError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_metric_partition() {
        let records = from_cli(&[command_with(sample_tree())], &conn()).unwrap();
        let interface = match &records[0] {
            Record::Interface(interface) => interface,
            other => panic!("expected interface record, got {other:?}"),
        };
        let line = interface.metric();
        assert!(line.starts_with("interface,name=GigabitEthernet0/1,"));
        assert!(line.contains("mac_address=02:ab:11:22:33:44"));
        assert!(line.contains("enabled=true"));
        assert!(line.contains("oper_up=true"));
        assert!(line.contains("in_octets=820000i"));
        assert!(!line.contains("in_runts"));
    }
}
