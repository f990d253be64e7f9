//! VPN session normalization.
//!
//! The firewall session-db output is one template row whose columns are
//! parallel lists: per-group session stats, per-type tunnel stats, and a
//! handful of device-global scalars. One command batch therefore yields
//! three kinds of canonical records.

use crate::catalog::{Command, ResourceKind};
use crate::config::ConnectionParams;
use crate::dispatch::{RawResult, RawRow};
use crate::metric::LineBuilder;

use super::transform::{parse_int, slug};
use super::{first_with_result, unsupported_shape, NormalizeError, Record};

/// Per-group VPN session statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnSessionStats {
    pub active: Option<i64>,
    pub cumulative: Option<i64>,
    pub peak_concurrent: Option<i64>,
    pub inactive: Option<i64>,
    /// Slugged group name.
    pub name: Option<String>,
}

impl VpnSessionStats {
    /// Line-protocol metric with the fixed tag/field partition for this
    /// resource kind.
    pub fn metric(&self) -> String {
        LineBuilder::new("vpn_session")
            .tag_opt("name", self.name.as_ref())
            .field_opt("active", self.active.as_ref())
            .field_opt("cumulative", self.cumulative.as_ref())
            .field_opt("peak_concurrent", self.peak_concurrent.as_ref())
            .field_opt("inactive", self.inactive.as_ref())
            .build()
    }
}

/// Per-type VPN tunnel statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnTunnelStats {
    pub active: Option<i64>,
    pub cumulative: Option<i64>,
    pub peak_concurrent: Option<i64>,
    /// Slugged tunnel-type name.
    pub name: Option<String>,
}

impl VpnTunnelStats {
    /// Line-protocol metric with the fixed tag/field partition for this
    /// resource kind.
    pub fn metric(&self) -> String {
        LineBuilder::new("vpn_tunnel")
            .tag_opt("name", self.name.as_ref())
            .field_opt("active", self.active.as_ref())
            .field_opt("cumulative", self.cumulative.as_ref())
            .field_opt("peak_concurrent", self.peak_concurrent.as_ref())
            .build()
    }
}

/// Device-global VPN statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnGlobalStats {
    pub total_active_and_inactive: Option<i64>,
    pub total_cumulative: Option<i64>,
    pub device_total_vpn_capacity: Option<i64>,
    pub device_load_percent: Option<i64>,
    pub totals_active: Option<i64>,
    pub totals_cumulative: Option<i64>,
}

impl VpnGlobalStats {
    /// Line-protocol metric: all fields, no tags.
    pub fn metric(&self) -> String {
        LineBuilder::new("asa_vpn")
            .field_opt(
                "total_active_and_inactive",
                self.total_active_and_inactive.as_ref(),
            )
            .field_opt("total_cumulative", self.total_cumulative.as_ref())
            .field_opt(
                "device_total_vpn_capacity",
                self.device_total_vpn_capacity.as_ref(),
            )
            .field_opt("device_load_percent", self.device_load_percent.as_ref())
            .field_opt("totals_active", self.totals_active.as_ref())
            .field_opt("totals_cumulative", self.totals_cumulative.as_ref())
            .build()
    }
}

/// A list-valued column, or a malformed-section error naming it.
fn column<'a>(
    row: &'a RawRow,
    key: &str,
    section: &str,
) -> Result<Vec<&'a str>, NormalizeError> {
    row.list(key).ok_or_else(|| NormalizeError::Malformed {
        resource: ResourceKind::VpnSession,
        detail: format!("unable to parse output correctly ({section})"),
    })
}

fn cell(values: &[&str], index: usize, section: &str) -> Result<Option<i64>, NormalizeError> {
    let raw = values
        .get(index)
        .ok_or_else(|| NormalizeError::Malformed {
            resource: ResourceKind::VpnSession,
            detail: format!("unable to parse output correctly ({section})"),
        })?;
    Ok(parse_int(raw))
}

/// CLI-driver processor: the session-db template row.
pub(super) fn from_cli(
    commands: &[Command],
    _conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let resource = ResourceKind::VpnSession;
    let (command, result) = first_with_result(commands, resource)?;

    let rows = match result {
        RawResult::Rows(rows) => rows,
        other => return Err(unsupported_shape(resource, command, other)),
    };
    let row = rows.first().ok_or(NormalizeError::NoResult { resource })?;

    let mut records = Vec::new();

    // Per-group session stats.
    let names = column(row, "vpn_session_name", "vpn_session")?;
    let active = column(row, "vpn_session_active", "vpn_session")?;
    let cumulative = column(row, "vpn_session_cumulative", "vpn_session")?;
    let peak = column(row, "vpn_session_peak_concurrent", "vpn_session")?;
    let inactive = column(row, "vpn_session_inactive", "vpn_session")?;
    for (i, name) in names.iter().enumerate() {
        records.push(Record::VpnSession(VpnSessionStats {
            active: cell(&active, i, "vpn_session")?,
            cumulative: cell(&cumulative, i, "vpn_session")?,
            peak_concurrent: cell(&peak, i, "vpn_session")?,
            inactive: cell(&inactive, i, "vpn_session")?,
            name: Some(slug(name)),
        }));
    }

    // Per-type tunnel stats.
    let names = column(row, "tunnels_summary_name", "tunnels")?;
    let active = column(row, "tunnels_summary_active", "tunnels")?;
    let cumulative = column(row, "tunnels_summary_cumulative", "tunnels")?;
    let peak = column(row, "tunnels_summary_peak_concurrent", "tunnels")?;
    for (i, name) in names.iter().enumerate() {
        records.push(Record::VpnTunnel(VpnTunnelStats {
            active: cell(&active, i, "tunnels")?,
            cumulative: cell(&cumulative, i, "tunnels")?,
            peak_concurrent: cell(&peak, i, "tunnels")?,
            name: Some(slug(name)),
        }));
    }

    // Device-global scalars; unreported values stay absent. A device
    // reporting none of them yields no global record at all, since a
    // fieldless metric line would not serialize.
    let global = VpnGlobalStats {
        total_active_and_inactive: row.str("total_active_and_inactive").and_then(parse_int),
        total_cumulative: row.str("total_cumulative").and_then(parse_int),
        device_total_vpn_capacity: row.str("device_total_vpn_capacity").and_then(parse_int),
        device_load_percent: row.str("device_load_percent").and_then(parse_int),
        totals_active: row.str("totals_active").and_then(parse_int),
        totals_cumulative: row.str("totals_cumulative").and_then(parse_int),
    };
    if global != VpnGlobalStats::default() {
        records.push(Record::VpnGlobal(global));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AccessMethod, Executor, ParseHints, RawShape};
    use serde_json::json;

    fn conn() -> ConnectionParams {
        ConnectionParams::new("fw01.example.net", "cisco_asa", "ops", "hunter2")
    }

    fn command_with(result: RawResult) -> Command {
        Command {
            executor: Executor::Cli,
            resource: ResourceKind::VpnSession,
            access: AccessMethod::Ssh,
            text: "show vpn-sessiondb".to_string(),
            hints: ParseHints {
                shape: Some(RawShape::Rows),
                table: None,
            },
            result: Some(result),
            timing: None,
        }
    }

    fn sessiondb_row() -> RawRow {
        RawRow::new()
            .with("vpn_session_name", json!(["AnyConnect Client", "Clientless VPN"]))
            .with("vpn_session_active", json!(["120", "4"]))
            .with("vpn_session_cumulative", json!(["5000", "90"]))
            .with("vpn_session_peak_concurrent", json!(["200", "12"]))
            .with("vpn_session_inactive", json!(["3", "0"]))
            .with("tunnels_summary_name", json!(["IKEv2", "SSL-Tunnel"]))
            .with("tunnels_summary_active", json!(["60", "58"]))
            .with("tunnels_summary_cumulative", json!(["2100", "2000"]))
            .with("tunnels_summary_peak_concurrent", json!(["80", "77"]))
            .with("total_active_and_inactive", "124")
            .with("total_cumulative", "5090")
            .with("device_total_vpn_capacity", "750")
            .with("device_load_percent", "16")
            .with("totals_active", "124")
            .with("totals_cumulative", "5090")
    }

    #[test]
    fn test_sessiondb_yields_all_three_record_kinds() {
        let result = RawResult::Rows(vec![sessiondb_row()]);
        let records = from_cli(&[command_with(result)], &conn()).unwrap();
        // 2 session groups + 2 tunnel types + 1 global.
        assert_eq!(records.len(), 5);

        match &records[0] {
            Record::VpnSession(stats) => {
                assert_eq!(stats.name.as_deref(), Some("anyconnect-client"));
                assert_eq!(stats.active, Some(120));
                assert_eq!(stats.inactive, Some(3));
            }
            other => panic!("expected session stats, got {other:?}"),
        }
        match &records[2] {
            Record::VpnTunnel(stats) => {
                assert_eq!(stats.name.as_deref(), Some("ikev2"));
                assert_eq!(stats.peak_concurrent, Some(80));
            }
            other => panic!("expected tunnel stats, got {other:?}"),
        }
        match &records[4] {
            Record::VpnGlobal(stats) => {
                assert_eq!(stats.device_load_percent, Some(16));
                assert_eq!(stats.totals_cumulative, Some(5090));
            }
            other => panic!("expected global stats, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_count_is_absent_not_error() {
        let row = sessiondb_row().with("vpn_session_active", json!(["n/a", "4"]));
        let records = from_cli(&[command_with(RawResult::Rows(vec![row]))], &conn()).unwrap();
        match &records[0] {
            Record::VpnSession(stats) => assert_eq!(stats.active, None),
            other => panic!("expected session stats, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_session_column_is_malformed() {
        let row = RawRow::new().with("tunnels_summary_name", json!(["IKEv2"]));
        let err = from_cli(&[command_with(RawResult::Rows(vec![row]))], &conn()).unwrap_err();
        match err {
            NormalizeError::Malformed { detail, .. } => {
                assert!(detail.contains("vpn_session"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_short_column_is_malformed() {
        let row = sessiondb_row().with("vpn_session_inactive", json!(["3"]));
        let err = from_cli(&[command_with(RawResult::Rows(vec![row]))], &conn()).unwrap_err();
        assert!(matches!(err, NormalizeError::Malformed { .. }));
    }

    fn lists_only_row() -> RawRow {
        let mut row = RawRow::new();
        for key in [
            "vpn_session_name",
            "vpn_session_active",
            "vpn_session_cumulative",
            "vpn_session_peak_concurrent",
            "vpn_session_inactive",
            "tunnels_summary_name",
            "tunnels_summary_active",
            "tunnels_summary_cumulative",
            "tunnels_summary_peak_concurrent",
        ] {
            row = row.with(key, json!(["1"]));
        }
        row
    }

    #[test]
    fn test_all_absent_globals_skip_the_global_record() {
        // Only the list sections are present; no device-global scalars, so
        // no global record (its metric line would carry no fields).
        let row = lists_only_row();
        let records = from_cli(&[command_with(RawResult::Rows(vec![row]))], &conn()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|record| !matches!(record, Record::VpnGlobal(_))));
    }

    #[test]
    fn test_partial_global_scalars_stay_absent() {
        let row = lists_only_row().with("totals_active", "7");
        let records = from_cli(&[command_with(RawResult::Rows(vec![row]))], &conn()).unwrap();
        match records.last().unwrap() {
            Record::VpnGlobal(stats) => {
                assert_eq!(stats.totals_active, Some(7));
                assert_eq!(stats.device_total_vpn_capacity, None);
                assert_eq!(stats.total_cumulative, None);
                assert_eq!(stats.metric(), "asa_vpn totals_active=7i");
            }
            other => panic!("expected global stats, got {other:?}"),
        }
    }

    #[test]
    fn test_metric_partitions() {
        let stats = VpnSessionStats {
            active: Some(5),
            name: Some(slug("Group 1")),
            ..Default::default()
        };
        assert_eq!(stats.metric(), "vpn_session,name=group-1 active=5i");

        let global = VpnGlobalStats {
            device_load_percent: Some(16),
            ..Default::default()
        };
        assert_eq!(global.metric(), "asa_vpn device_load_percent=16i");
    }
}
