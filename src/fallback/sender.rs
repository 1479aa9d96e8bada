//! Ordered probe-then-try delivery
//!
//! The sender owns the mechanism ladder and walks it strictly in priority
//! order: console-session injection, direct stdin write, drop-file
//! handoff. The first mechanism whose probe passes and whose delivery
//! succeeds wins; a probe or delivery failure moves on to the next rung
//! instead of aborting.

use crate::channel::ProcessChannel;
use crate::config::{DockerConfig, Timeouts, TransportMethod};
use crate::dispatch::api::{CommandOutcome, ErrorKind, PlayerListResult};
use crate::fallback::scrape::{self, PLAYER_LIST_COMMAND};
use crate::fallback::{DeliveryMechanism, DropFile, SessionInjection, StreamWrite};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Availability of one delivery mechanism, as reported by `probe`
#[derive(Debug, Clone, Serialize)]
pub struct MechanismProbe {
    /// Mechanism name
    pub mechanism: String,
    /// Whether the probe passed just now
    pub available: bool,
}

/// Best-effort command sender over the fallback mechanism ladder
pub struct FallbackSender {
    channel: Arc<dyn ProcessChannel>,
    mechanisms: Vec<Box<dyn DeliveryMechanism>>,
    send_lock: Mutex<()>,
    log_lookback: u32,
    settle: std::time::Duration,
}

impl FallbackSender {
    /// Build the standard ladder from configuration.
    pub fn new(channel: Arc<dyn ProcessChannel>, config: &DockerConfig, timeouts: Timeouts) -> Self {
        let mechanisms: Vec<Box<dyn DeliveryMechanism>> = vec![
            Box::new(SessionInjection::new(
                channel.clone(),
                config.console_session.clone(),
            )),
            Box::new(StreamWrite::new(channel.clone())),
            Box::new(DropFile::new(config.spool_dir.clone())),
        ];

        Self {
            channel,
            mechanisms,
            send_lock: Mutex::new(()),
            log_lookback: config.log_lookback,
            settle: timeouts.settle(),
        }
    }

    /// Deliver one command through the first usable mechanism.
    ///
    /// The sender lock serializes deliveries so concurrent keystroke
    /// injections cannot interleave characters.
    pub async fn send(&self, command: &str) -> CommandOutcome {
        let _guard = self.send_lock.lock().await;

        for mechanism in &self.mechanisms {
            if !mechanism.probe().await {
                debug!(mechanism = mechanism.name(), "mechanism unavailable, skipping");
                continue;
            }

            match mechanism.deliver(command).await {
                Ok(()) => {
                    info!(mechanism = mechanism.name(), "command delivered");
                    return CommandOutcome::delivered_unconfirmed(TransportMethod::DockerAttach);
                }
                Err(e) => {
                    warn!(
                        mechanism = mechanism.name(),
                        error = %e,
                        "delivery failed, trying next mechanism"
                    );
                }
            }
        }

        warn!("all delivery mechanisms exhausted");
        CommandOutcome::not_delivered(TransportMethod::DockerAttach, ErrorKind::DeliveryUnavailable)
    }

    /// Ask the server for its player list and scrape the answer from
    /// recent output.
    ///
    /// Observation failures come back as an empty result with `degraded`
    /// set, never as an error: nobody-online and nothing-observed are
    /// indistinguishable on this transport.
    pub async fn list_players(&self) -> PlayerListResult {
        let outcome = self.send(PLAYER_LIST_COMMAND).await;
        if !outcome.succeeded {
            warn!("player list command could not be delivered");
            return PlayerListResult::degraded(TransportMethod::DockerAttach);
        }

        // The server prints asynchronously; give it a moment.
        sleep(self.settle).await;

        let output = match self.channel.recent_output(self.log_lookback).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "could not read recent output for player list");
                return PlayerListResult::degraded(TransportMethod::DockerAttach);
            }
        };

        match scrape::scan_output(&output) {
            Some(parsed) => PlayerListResult::from_parsed(parsed, TransportMethod::DockerAttach),
            None => {
                debug!(
                    lookback = self.log_lookback,
                    "no player list line within lookback window"
                );
                PlayerListResult::degraded(TransportMethod::DockerAttach)
            }
        }
    }

    /// Run every mechanism's availability probe, in ladder order.
    pub async fn probe_report(&self) -> Vec<MechanismProbe> {
        let mut report = Vec::with_capacity(self.mechanisms.len());
        for mechanism in &self.mechanisms {
            report.push(MechanismProbe {
                mechanism: mechanism.name().to_string(),
                available: mechanism.probe().await,
            });
        }
        report
    }
}
