//! One full collection cycle for one device.
//!
//! Ties the pipeline together: route the requested resources through the
//! command catalog, execute the batch through the dispatcher, then
//! normalize each resource's output into canonical records.

use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{AccessMethod, Catalog, Command, ResourceKind, RoutingError};
use crate::config::ConnectionParams;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::normalize::{normalize, NormalizeError, Record};

/// Poll failures.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    /// Execution stopped partway; the batch is returned so callers can
    /// inspect the commands that did complete.
    #[error("dispatch failed: {error}")]
    Dispatch {
        error: DispatchError,
        commands: Vec<Command>,
    },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Poll one device for the requested resources.
///
/// Commands are built from the embedded catalog, executed strictly in
/// order over cached-or-fresh sessions, and normalized per resource. A
/// dispatch failure aborts the cycle before normalization.
pub async fn poll_device(
    dispatcher: &Dispatcher,
    conn: &ConnectionParams,
    requests: &[(ResourceKind, AccessMethod)],
) -> Result<Vec<Record>, PollError> {
    let mut commands = Catalog::builtin().build(&conn.device_type, requests)?;

    let outcome = dispatcher.execute(&mut commands, conn).await;
    if let Some(error) = outcome.error {
        warn!(
            host = %conn.host,
            executed = outcome.executed,
            %error,
            "dispatch aborted"
        );
        return Err(PollError::Dispatch { error, commands });
    }

    let mut records = Vec::new();
    for &(resource, access) in requests {
        let group: Vec<Command> = commands
            .iter()
            .filter(|command| command.resource == resource && command.access == access)
            .cloned()
            .collect();
        let executor = match group.first() {
            Some(command) => command.executor,
            None => continue,
        };
        records.extend(normalize(resource, executor, &group, conn)?);
    }

    info!(
        host = %conn.host,
        commands = commands.len(),
        records = records.len(),
        "poll cycle complete"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::catalog::ParseHints;
    use crate::dispatch::{
        CliSession, NetconfSession, RawResult, RawRow, SessionError, SessionFactory, TableRow,
    };
    use crate::tables::TableSpec;

    struct FixedCli;

    #[async_trait]
    impl CliSession for FixedCli {
        async fn run(
            &mut self,
            command: &str,
            _hints: &ParseHints,
        ) -> Result<RawResult, SessionError> {
            if command.contains("lldp") {
                Ok(RawResult::Rows(vec![RawRow::new()
                    .with("local_interface", "Gi0/1")
                    .with("neighbor", "sw-core-01")
                    .with("neighbor_interface", "Te1/0/4")]))
            } else {
                Ok(RawResult::Tree(json!({
                    "vrf": {
                        "default": {
                            "neighbor": {
                                "10.0.0.2": { "session_state": "Established" }
                            }
                        }
                    }
                })))
            }
        }

        async fn close(&mut self) {}
    }

    struct FixedNetconf;

    #[async_trait]
    impl NetconfSession for FixedNetconf {
        async fn rpc(&mut self, _rpc: &str) -> Result<RawResult, SessionError> {
            Ok(RawResult::Tree(json!({})))
        }

        async fn fetch_table(&mut self, _spec: &TableSpec) -> Result<Vec<TableRow>, SessionError> {
            Ok(vec![TableRow::new()
                .with("peer_address", "192.168.7.7+54921")
                .with("peer_state", "Established")
                .with("prefixes_received", "100")
                .with("prefixes_accepted", "80")])
        }

        async fn close(&mut self) {}
    }

    struct FixedFactory;

    #[async_trait]
    impl SessionFactory for FixedFactory {
        async fn connect_cli(
            &self,
            _conn: &ConnectionParams,
        ) -> Result<Box<dyn CliSession>, SessionError> {
            Ok(Box::new(FixedCli))
        }

        async fn connect_netconf(
            &self,
            _conn: &ConnectionParams,
        ) -> Result<Box<dyn NetconfSession>, SessionError> {
            Ok(Box::new(FixedNetconf))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(FixedFactory))
    }

    #[tokio::test]
    async fn test_poll_ios_device() {
        let conn = ConnectionParams::new("192.0.2.1", "cisco_ios", "ops", "hunter2");
        let records = poll_device(
            &dispatcher(),
            &conn,
            &[
                (ResourceKind::BgpSession, AccessMethod::Ssh),
                (ResourceKind::LldpNeighbors, AccessMethod::Ssh),
            ],
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], Record::Bgp(_)));
        assert!(matches!(records[1], Record::Lldp(_)));
    }

    #[tokio::test]
    async fn test_poll_junos_device_via_table() {
        let conn = ConnectionParams::new("junos01", "juniper_junos", "ops", "hunter2");
        let records = poll_device(
            &dispatcher(),
            &conn,
            &[(ResourceKind::BgpSession, AccessMethod::Netconf)],
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            Record::Bgp(session) => {
                assert_eq!(
                    session.neighbor_address,
                    Some("192.168.7.7".parse().unwrap())
                );
                assert_eq!(session.prefixes_denied, Some(20));
            }
            other => panic!("expected bgp record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unroutable_request_fails_before_dispatch() {
        let conn = ConnectionParams::new("192.0.2.1", "cisco_ios", "ops", "hunter2");
        let err = poll_device(
            &dispatcher(),
            &conn,
            &[(ResourceKind::VpnSession, AccessMethod::Ssh)],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PollError::Routing(_)));
    }

    #[tokio::test]
    async fn test_dispatch_failure_carries_partial_batch() {
        struct FailingFactory;

        #[async_trait]
        impl SessionFactory for FailingFactory {
            async fn connect_cli(
                &self,
                _conn: &ConnectionParams,
            ) -> Result<Box<dyn CliSession>, SessionError> {
                Err(SessionError::Protocol("authentication failed".to_string()))
            }

            async fn connect_netconf(
                &self,
                _conn: &ConnectionParams,
            ) -> Result<Box<dyn NetconfSession>, SessionError> {
                Err(SessionError::Protocol("authentication failed".to_string()))
            }
        }

        let conn = ConnectionParams::new("192.0.2.1", "cisco_ios", "ops", "hunter2");
        let err = poll_device(
            &Dispatcher::new(Arc::new(FailingFactory)),
            &conn,
            &[(ResourceKind::BgpSession, AccessMethod::Ssh)],
        )
        .await
        .unwrap_err();

        match err {
            PollError::Dispatch { error, commands } => {
                assert!(matches!(error, DispatchError::Connect { .. }));
                assert_eq!(commands.len(), 1);
                assert!(commands[0].result.is_none());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
