//! Session Dispatcher.
//!
//! Executes a command batch against one device, in strict order, through one
//! of two interchangeable drivers selected per command. Each command's
//! result and timing are recorded in place; the first failure stops the
//! batch and is returned as data in [`DispatchOutcome`], never raised, so
//! callers can inspect the commands that did complete.
//!
//! Session handles are cached per device in a [`SessionPool`] when the
//! connection's `persist` flag is set; with `persist` off the session is
//! torn down unconditionally at the end of the dispatch call, success or
//! failure.

mod cli;
mod netconf;
mod session;

pub use session::{
    CliSession, NetconfSession, RawResult, RawRow, SessionError, SessionFactory, SessionPool,
    TableRow,
};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::{Command, Executor};
use crate::config::ConnectionParams;
use crate::tables::{TableLookupError, TableResolver};

use cli::CliDriver;
use netconf::NetconfDriver;

/// Session or transport failure during dispatch.
///
/// Returned as data inside [`DispatchOutcome`] rather than propagated, so
/// partially completed commands are preserved.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Session establishment failed.
    #[error("failed to connect to {host} ({device_type}): {source}")]
    Connect {
        host: String,
        device_type: String,
        source: SessionError,
    },

    /// A command failed on an established session.
    #[error("command '{command}' failed: {source}")]
    Command {
        command: String,
        source: SessionError,
    },

    /// A command exceeded the caller-supplied timeout.
    #[error("command '{command}' timed out after {limit:?}")]
    Timeout { command: String, limit: Duration },

    /// Table-retrieval mode could not resolve the named table.
    #[error(transparent)]
    Table(#[from] TableLookupError),
}

/// Outcome of one dispatch call.
///
/// The batch is best-effort: `executed` commands retain their populated
/// result and timing even when `error` is set.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// The failure that stopped the batch, if any.
    pub error: Option<DispatchError>,
    /// Number of commands that completed successfully.
    pub executed: usize,
}

impl DispatchOutcome {
    fn success(executed: usize) -> Self {
        Self {
            error: None,
            executed,
        }
    }

    fn failure(executed: usize, error: DispatchError) -> Self {
        Self {
            error: Some(error),
            executed,
        }
    }

    /// Whether the whole batch completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Human-readable outcome description.
    pub fn message(&self) -> String {
        match &self.error {
            None => "ok".to_string(),
            Some(error) => error.to_string(),
        }
    }
}

/// Executes command batches against devices.
///
/// Owns the per-device [`SessionPool`] and the [`TableResolver`] used by the
/// NETCONF driver's table-retrieval mode. One dispatcher is shared across
/// concurrent per-device pollers; each poll checks sessions out of the pool
/// exclusively.
pub struct Dispatcher {
    factory: Arc<dyn SessionFactory>,
    resolver: TableResolver,
    pool: SessionPool,
}

impl Dispatcher {
    /// Dispatcher over a transport factory, with the builtin table set.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self::with_resolver(factory, TableResolver::new())
    }

    /// Dispatcher with an explicit table resolver.
    pub fn with_resolver(factory: Arc<dyn SessionFactory>, resolver: TableResolver) -> Self {
        Self {
            factory,
            resolver,
            pool: SessionPool::new(),
        }
    }

    /// The table resolver, for process-start custom registration.
    pub fn tables(&self) -> &TableResolver {
        &self.resolver
    }

    /// The per-device session cache.
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Execute a command batch against one device.
    ///
    /// Commands run in order; the first failure stops the batch. Sessions
    /// are acquired lazily per driver variant (new or reused from the pool)
    /// and released at the end per the connection's persist policy.
    pub async fn execute(
        &self,
        commands: &mut [Command],
        conn: &ConnectionParams,
    ) -> DispatchOutcome {
        let mut cli_session: Option<Box<dyn CliSession>> = None;
        let mut netconf_session: Option<Box<dyn NetconfSession>> = None;
        let mut executed = 0;
        let mut failure: Option<DispatchError> = None;

        for command in commands.iter_mut() {
            let step = match command.executor {
                Executor::Cli => {
                    match self.acquire_cli(&mut cli_session, conn).await {
                        Ok(session) => CliDriver::run_one(session, command, conn.timeout).await,
                        Err(err) => Err(err),
                    }
                }
                Executor::Netconf => {
                    match self.acquire_netconf(&mut netconf_session, conn).await {
                        Ok(session) => {
                            NetconfDriver::run_one(session, &self.resolver, command, conn.timeout)
                                .await
                        }
                        Err(err) => Err(err),
                    }
                }
            };

            match step {
                Ok(()) => executed += 1,
                Err(err) => {
                    tracing::warn!(
                        host = %conn.host,
                        device_type = %conn.device_type,
                        command = %command.text,
                        error = %err,
                        "Dispatch stopped"
                    );
                    failure = Some(err);
                    break;
                }
            }
        }

        self.release_cli(cli_session, conn).await;
        self.release_netconf(netconf_session, conn).await;

        match failure {
            None => DispatchOutcome::success(executed),
            Some(error) => DispatchOutcome::failure(executed, error),
        }
    }

    async fn acquire_cli<'a>(
        &self,
        slot: &'a mut Option<Box<dyn CliSession>>,
        conn: &ConnectionParams,
    ) -> Result<&'a mut (dyn CliSession + 'static), DispatchError> {
        if slot.is_none() {
            let session = match self.pool.take_cli(conn).await {
                Some(session) => {
                    tracing::debug!(device = %conn.device_key(), "Reusing cached cli session");
                    session
                }
                None => self.factory.connect_cli(conn).await.map_err(|source| {
                    DispatchError::Connect {
                        host: conn.host.clone(),
                        device_type: conn.device_type.clone(),
                        source,
                    }
                })?,
            };
            *slot = Some(session);
        }
        Ok(&mut **slot.as_mut().expect("session slot populated above"))
    }

    async fn acquire_netconf<'a>(
        &self,
        slot: &'a mut Option<Box<dyn NetconfSession>>,
        conn: &ConnectionParams,
    ) -> Result<&'a mut (dyn NetconfSession + 'static), DispatchError> {
        if slot.is_none() {
            let session = match self.pool.take_netconf(conn).await {
                Some(session) => {
                    tracing::debug!(device = %conn.device_key(), "Reusing cached netconf session");
                    session
                }
                None => self.factory.connect_netconf(conn).await.map_err(|source| {
                    DispatchError::Connect {
                        host: conn.host.clone(),
                        device_type: conn.device_type.clone(),
                        source,
                    }
                })?,
            };
            *slot = Some(session);
        }
        Ok(&mut **slot.as_mut().expect("session slot populated above"))
    }

    async fn release_cli(&self, session: Option<Box<dyn CliSession>>, conn: &ConnectionParams) {
        if let Some(mut session) = session {
            if conn.persist {
                self.pool.store_cli(conn, session).await;
            } else {
                session.close().await;
            }
        }
    }

    async fn release_netconf(
        &self,
        session: Option<Box<dyn NetconfSession>>,
        conn: &ConnectionParams,
    ) {
        if let Some(mut session) = session {
            if conn.persist {
                self.pool.store_netconf(conn, session).await;
            } else {
                session.close().await;
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
