//! SSH-style command-interpreter driver.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::timeout;

use crate::catalog::{Command, Timing};

use super::session::CliSession;
use super::DispatchError;

pub(super) struct CliDriver;

impl CliDriver {
    /// Run one command, capturing timing whether it succeeds or not. The
    /// result is stored on the command only on success.
    pub(super) async fn run_one(
        session: &mut dyn CliSession,
        command: &mut Command,
        limit: Duration,
    ) -> Result<(), DispatchError> {
        let started = Utc::now();
        let clock = Instant::now();
        let outcome = timeout(limit, session.run(&command.text, &command.hints)).await;
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
                    shape = raw.shape(),
                    elapsed_ms = timing.elapsed.as_millis() as u64,
                    "Cli command executed"
                );
                command.result = Some(raw);
                Ok(())
            }
        }
    }
}
