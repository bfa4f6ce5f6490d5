//! Reconciliation wait state machine
//!
//! The packaging controller reconciles asynchronously, so create, update and
//! delete commands only submit intent. This module polls the affected
//! resource's status until it reaches a terminal condition, the resource
//! disappears (for delete-waits), or a timeout elapses.
//!
//! One parameterized loop serves every wait: the caller names the succeeded
//! and failed condition types and whether absence counts as success. The
//! getter and the clock are both injectable (the latter via tokio's paused
//! test clock), so the state machine is testable without a cluster and
//! without real time passing.

mod deduper;

#[cfg(test)]
pub use deduper::RecordingSink;
pub use deduper::{MessageDeduper, ProgressSink, StdoutSink};

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::models::{ConditionStatus, ConditionType, ObservedResource};

/// Poll timing for a wait operation.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between consecutive status reads.
    pub interval: Duration,
    /// Total budget before the wait fails with [`WaitError::TimedOut`].
    pub timeout: Duration,
    /// When false the caller skips waiting entirely (fire-and-forget).
    pub enabled: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            enabled: true,
        }
    }
}

/// Names the condition types that end a wait, and how absence is treated.
#[derive(Debug, Clone)]
pub struct TerminalConditions {
    /// Verb used in error messages ("Reconciling", "Deleting").
    pub verb: &'static str,
    /// Condition type that ends the wait successfully, if any.
    pub succeeded: Option<ConditionType>,
    /// Condition type that converts to an error.
    pub failed: ConditionType,
    /// Delete-waits end successfully when the resource is gone.
    pub absence_is_success: bool,
}

impl TerminalConditions {
    /// Terminal states for create/update waits.
    pub fn reconcile() -> Self {
        Self {
            verb: "Reconciling",
            succeeded: Some(ConditionType::ReconcileSucceeded),
            failed: ConditionType::ReconcileFailed,
            absence_is_success: false,
        }
    }

    /// Terminal states for delete waits.
    pub fn delete() -> Self {
        Self {
            verb: "Deleting",
            succeeded: None,
            failed: ConditionType::DeleteFailed,
            absence_is_success: true,
        }
    }
}

/// Ways a wait operation can fail.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The controller reported a terminal failure condition. Message and
    /// description are carried verbatim from the resource's status.
    #[error("{description}: {verb}: {message}. {friendly_description}")]
    ConditionFailed {
        description: String,
        verb: &'static str,
        message: String,
        friendly_description: String,
    },

    /// No terminal condition was observed within the wait budget.
    #[error("{description}: {verb}: timed out waiting for a terminal condition (after {timeout:?})")]
    TimedOut {
        description: String,
        verb: &'static str,
        timeout: Duration,
    },

    /// The resource is absent where absence is not an accepted terminal state.
    #[error("{description}: not found")]
    NotFound { description: String },

    /// Any other API failure. Never retried at this layer; retry policy, if
    /// any, belongs to the transport.
    #[error("{description}: {source}")]
    Transport {
        description: String,
        #[source]
        source: kube::Error,
    },
}

/// Poll a resource's status until it reaches a terminal state.
///
/// `fetch` returns `Ok(None)` when the resource is absent; any `Err` aborts
/// the wait immediately. Conditions are only inspected once the controller
/// has observed the latest generation, and each condition type seen is
/// reported once through `progress`.
pub async fn await_terminal_state<R, G, Fut, S>(
    description: &str,
    terminal: &TerminalConditions,
    config: &WaitConfig,
    progress: &mut MessageDeduper<S>,
    mut fetch: G,
) -> Result<(), WaitError>
where
    R: ObservedResource,
    G: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<R>, kube::Error>>,
    S: ProgressSink,
{
    let start = Instant::now();

    loop {
        match fetch().await {
            Err(source) => {
                return Err(WaitError::Transport {
                    description: description.to_string(),
                    source,
                });
            }
            Ok(None) if terminal.absence_is_success => {
                progress.notify(
                    "DeletionSucceeded",
                    format!("{}: DeletionSucceeded", description),
                );
                return Ok(());
            }
            Ok(None) => {
                return Err(WaitError::NotFound {
                    description: description.to_string(),
                });
            }
            Ok(Some(resource)) => {
                // Conditions from a stale generation describe the previous
                // spec; wait for the controller to observe the latest one.
                if let Some(status) = resource.status() {
                    if status.observed_generation == resource.generation() {
                        for condition in &status.conditions {
                            progress.notify(
                                condition.type_.as_str(),
                                format!("{}: {}", description, condition.type_),
                            );

                            if condition.status != ConditionStatus::True {
                                continue;
                            }
                            if condition.type_ == terminal.failed {
                                return Err(WaitError::ConditionFailed {
                                    description: description.to_string(),
                                    verb: terminal.verb,
                                    message: status.useful_error_message.clone(),
                                    friendly_description: status.friendly_description.clone(),
                                });
                            }
                            if terminal.succeeded.as_ref() == Some(&condition.type_) {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }

        if start.elapsed() >= config.timeout {
            return Err(WaitError::TimedOut {
                description: description.to_string(),
                verb: terminal.verb,
                timeout: config.timeout,
            });
        }
        sleep(config.interval).await;
    }
}
