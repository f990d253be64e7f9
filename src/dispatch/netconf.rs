//! NETCONF-style structured-query driver.
//!
//! Two retrieval modes per command: when the catalog route carries a `table`
//! hint the named table is resolved (custom definitions first, builtins
//! second) and its rows fetched; otherwise the raw command text is issued as
//! a direct RPC. Resolution and fetch are timed together.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::timeout;

use crate::catalog::{Command, Timing};
use crate::tables::{TableProvider, TableResolver};

use super::session::{NetconfSession, RawResult};
use super::DispatchError;

pub(super) struct NetconfDriver;

impl NetconfDriver {
    pub(super) async fn run_one(
        session: &mut dyn NetconfSession,
        resolver: &TableResolver,
        command: &mut Command,
        limit: Duration,
    ) -> Result<(), DispatchError> {
        let started = Utc::now();
        let clock = Instant::now();

        let outcome = match &command.hints.table {
            Some(table) => {
                let protocol = command.resource.protocol();
                match resolver.resolve(protocol, table) {
                    Ok(spec) => timeout(limit, session.fetch_table(&spec))
                        .await
                        .map(|fetched| fetched.map(RawResult::Table)),
                    Err(err) => {
                        command.timing = Some(Timing {
                            started,
                            finished: Utc::now(),
                            elapsed: clock.elapsed(),
                        });
                        return Err(DispatchError::Table(err));
                    }
                }
            }
            None => timeout(limit, session.rpc(&command.text)).await,
        };

        let timing = Timing {
            started,
            finished: Utc::now(),
            elapsed: clock.elapsed(),
        };
        command.timing = Some(timing);

        match outcome {
            Err(_) => Err(DispatchError::Timeout {
                command: command.text.clone(),
                limit,
            }),
            Ok(Err(source)) => Err(DispatchError::Command {
                command: command.text.clone(),
                source,
            }),
            Ok(Ok(raw)) => {
                tracing::debug!(
                    command = %command.text,
                    table = command.hints.table.as_deref().unwrap_or(""),
                    shape = raw.shape(),
                    elapsed_ms = timing.elapsed.as_millis() as u64,
                    "Netconf command executed"
                );
                command.result = Some(raw);
                Ok(())
            }
        }
    }
}
