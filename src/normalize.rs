//! Normalization: raw command output into canonical records.
//!
//! Each resource kind has a processor per executor. A processor takes the
//! executed command batch for one device, picks the command carrying its
//! resource, and flattens whatever raw shape the driver produced into
//! canonical records. Every record serializes itself to one line-protocol
//! line with a fixed tag/field partition.
//!
//! Absence and failure are kept apart throughout: a value the source did
//! not report is simply omitted from the record (and from the metric),
//! while output that cannot be interpreted at all is a typed error.

use thiserror::Error;
use tracing::debug;

use crate::catalog::{Command, Executor, ResourceKind};
use crate::config::ConnectionParams;
use crate::dispatch::RawResult;

mod bgp;
mod interface;
mod lldp;
pub mod transform;
mod vpn;

pub use bgp::BgpSession;
pub use interface::{
    AddressRole, Interface, InterfaceAddress, InterfaceCounters, OperStatus, PortChannel,
};
pub use lldp::LldpNeighbor;
pub use vpn::{VpnGlobalStats, VpnSessionStats, VpnTunnelStats};

/// Normalization failures.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The batch holds no command for the requested resource.
    #[error("no command for resource '{resource}' in batch")]
    NoCommand { resource: ResourceKind },
    /// The command for the resource carries no usable result.
    #[error("command for resource '{resource}' produced no result")]
    NoResult { resource: ResourceKind },
    /// The raw result shape does not match what the processor handles.
    #[error("executor '{executor}' produced unsupported shape '{shape}' for resource '{resource}'")]
    UnsupportedShape {
        resource: ResourceKind,
        executor: Executor,
        shape: &'static str,
    },
    /// No processor exists for this resource/executor pair.
    #[error("no processor for resource '{resource}' via executor '{executor}'")]
    NotImplemented {
        resource: ResourceKind,
        executor: Executor,
    },
    /// The raw output was structurally broken.
    #[error("malformed output for resource '{resource}': {detail}")]
    Malformed {
        resource: ResourceKind,
        detail: String,
    },
}

/// A canonical record produced by normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Bgp(BgpSession),
    Interface(Interface),
    Lldp(LldpNeighbor),
    VpnSession(VpnSessionStats),
    VpnTunnel(VpnTunnelStats),
    VpnGlobal(VpnGlobalStats),
}

impl Record {
    /// Serialize to one line-protocol line.
    pub fn to_line(&self) -> String {
        match self {
            Self::Bgp(session) => session.metric(),
            Self::Interface(interface) => interface.metric(),
            Self::Lldp(neighbor) => neighbor.metric(),
            Self::VpnSession(stats) => stats.metric(),
            Self::VpnTunnel(stats) => stats.metric(),
            Self::VpnGlobal(stats) => stats.metric(),
        }
    }
}

/// First command in the batch carrying a non-empty result for `resource`.
fn first_with_result<'a>(
    commands: &'a [Command],
    resource: ResourceKind,
) -> Result<(&'a Command, &'a RawResult), NormalizeError> {
    let command = commands
        .iter()
        .find(|command| command.resource == resource)
        .ok_or(NormalizeError::NoCommand { resource })?;
    match &command.result {
        Some(result) if !result.is_empty() => Ok((command, result)),
        _ => Err(NormalizeError::NoResult { resource }),
    }
}

fn unsupported_shape(
    resource: ResourceKind,
    command: &Command,
    result: &RawResult,
) -> NormalizeError {
    NormalizeError::UnsupportedShape {
        resource,
        executor: command.executor,
        shape: result.shape(),
    }
}

/// Normalize an executed command batch for one resource kind.
///
/// Dispatches to the processor registered for the resource/executor pair;
/// unknown pairs are a [`NormalizeError::NotImplemented`] error, never a
/// silent empty result.
pub fn normalize(
    resource: ResourceKind,
    executor: Executor,
    commands: &[Command],
    conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let records = match (resource, executor) {
        (ResourceKind::BgpSession, Executor::Cli) => bgp::from_cli(commands, conn)?,
        (ResourceKind::BgpSession, Executor::Netconf) => bgp::from_table(commands, conn)?,
        (ResourceKind::Interface, Executor::Cli) => interface::from_cli(commands, conn)?,
        (ResourceKind::LldpNeighbors, Executor::Cli) => lldp::from_cli(commands, conn)?,
        (ResourceKind::VpnSession, Executor::Cli) => vpn::from_cli(commands, conn)?,
        (resource, executor) => {
            return Err(NormalizeError::NotImplemented { resource, executor })
        }
    };
    debug!(
        host = %conn.host,
        %resource,
        %executor,
        records = records.len(),
        "normalized command batch"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AccessMethod, ParseHints, RawShape};
    use crate::dispatch::RawRow;

    fn conn() -> ConnectionParams {
        ConnectionParams::new("192.0.2.1", "cisco_ios", "ops", "hunter2")
    }

    fn lldp_command(result: Option<RawResult>) -> Command {
        Command {
            executor: Executor::Cli,
            resource: ResourceKind::LldpNeighbors,
            access: AccessMethod::Ssh,
            text: "show lldp neighbors".to_string(),
            hints: ParseHints {
                shape: Some(RawShape::Rows),
                table: None,
            },
            result,
            timing: None,
        }
    }

    #[test]
    fn test_dispatch_to_processor() {
        let rows = RawResult::Rows(vec![RawRow::new()
            .with("local_interface", "Gi0/1")
            .with("neighbor", "sw-core-01")
            .with("neighbor_interface", "Te1/0/4")]);
        let records = normalize(
            ResourceKind::LldpNeighbors,
            Executor::Cli,
            &[lldp_command(Some(rows))],
            &conn(),
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Record::Lldp(_)));
    }

    #[test]
    fn test_unknown_pair_is_not_implemented() {
        let err = normalize(
            ResourceKind::LldpNeighbors,
            Executor::Netconf,
            &[lldp_command(None)],
            &conn(),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizeError::NotImplemented { .. }));
    }

    #[test]
    fn test_missing_command_and_empty_result() {
        let err = first_with_result(&[], ResourceKind::BgpSession).unwrap_err();
        assert!(matches!(err, NormalizeError::NoCommand { .. }));

        let empty = lldp_command(Some(RawResult::Rows(Vec::new())));
        let err = first_with_result(&[empty], ResourceKind::LldpNeighbors).unwrap_err();
        assert!(matches!(err, NormalizeError::NoResult { .. }));

        let unexecuted = lldp_command(None);
        let err = first_with_result(&[unexecuted], ResourceKind::LldpNeighbors).unwrap_err();
        assert!(matches!(err, NormalizeError::NoResult { .. }));
    }

    #[test]
    fn test_record_to_line_delegates() {
        let record = Record::VpnSession(VpnSessionStats {
            active: Some(5),
            name: Some("group-1".to_string()),
            ..Default::default()
        });
        assert_eq!(record.to_line(), "vpn_session,name=group-1 active=5i");
    }
}
