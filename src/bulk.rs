//! Bulk relation changes over the whole following list.
//!
//! A run moves through `Fetching → [LimitingDryRun] → ConfirmPending →
//! Executing → Done`, or ends in `Cancelled` when the confirmation gate
//! declines. Individual failures never abort the run; they are counted.
//! Runs over an explicit candidate list (an imported file, a selection)
//! start at `LimitingDryRun` instead of fetching.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::RelationClient;
use crate::transport::Transport;
use crate::types::{RelationAction, RelationRecord};

/// Upper bound on the pause between items during a dry run
const DRY_RUN_DELAY_CEILING: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BulkState {
    Fetching,
    LimitingDryRun,
    ConfirmPending,
    Executing,
    Done,
    Cancelled,
}

/// Progress notifications emitted while a bulk run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkEvent {
    State(BulkState),
    /// One candidate has been processed; `index` is 1-based
    Item {
        index: usize,
        total: usize,
        id: u64,
        name: String,
        succeeded: bool,
    },
}

/// Counts for one bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// The confirmation gate declined; nothing was touched
    pub cancelled: bool,
    pub dry_run: bool,
    /// Stopped early by the cancellation token
    pub interrupted: bool,
}

type ConfirmFn<'a> = Box<dyn FnMut(usize) -> bool + Send + 'a>;
type EventFn<'a> = Box<dyn FnMut(&BulkEvent) + Send + 'a>;

/// A configured bulk run. Call [`BulkOperation::run`] to execute it.
pub struct BulkOperation<'a, T> {
    client: &'a RelationClient<T>,
    action: RelationAction,
    /// `None` fetches the whole following list
    candidates: Option<Vec<RelationRecord>>,
    confirm: Option<ConfirmFn<'a>>,
    on_event: Option<EventFn<'a>>,
    cancel: Option<CancellationToken>,
}

impl<'a, T: Transport> BulkOperation<'a, T> {
    pub(crate) fn new(
        client: &'a RelationClient<T>,
        action: RelationAction,
        candidates: Option<Vec<RelationRecord>>,
    ) -> Self {
        Self {
            client,
            action,
            candidates,
            confirm: None,
            on_event: None,
            cancel: None,
        }
    }

    /// Gate asked once with the candidate count; `false` cancels the run.
    pub fn confirm(mut self, gate: impl FnMut(usize) -> bool + Send + 'a) -> Self {
        self.confirm = Some(Box::new(gate));
        self
    }

    pub fn on_event(mut self, sink: impl FnMut(&BulkEvent) + Send + 'a) -> Self {
        self.on_event = Some(Box::new(sink));
        self
    }

    /// Allow stopping between items once execution has started.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn emit(&mut self, event: BulkEvent) {
        if let Some(sink) = self.on_event.as_mut() {
            sink(&event);
        }
    }

    fn enter(&mut self, state: BulkState) {
        debug!(?state, "Bulk state");
        self.emit(BulkEvent::State(state));
    }

    pub async fn run(mut self) -> BulkOutcome {
        let client = self.client;
        let action = self.action;
        let dry_run = client.is_dry_run();

        let mut candidates = match self.candidates.take() {
            Some(list) => list,
            None => {
                self.enter(BulkState::Fetching);
                client.list_all().await
            }
        };
        if candidates.is_empty() {
            self.enter(BulkState::Done);
            return BulkOutcome {
                dry_run,
                ..Default::default()
            };
        }

        if dry_run {
            self.enter(BulkState::LimitingDryRun);
            let limit = client.config().settings.dry_run_limit;
            if candidates.len() > limit {
                debug!(from = candidates.len(), to = limit, "Dry run: limiting candidates");
                candidates.truncate(limit);
            }
        }
        let total = candidates.len();

        self.enter(BulkState::ConfirmPending);
        if let Some(gate) = self.confirm.as_mut()
            && !gate(total)
        {
            info!("Bulk {} cancelled by user", action);
            self.enter(BulkState::Cancelled);
            return BulkOutcome {
                total,
                cancelled: true,
                dry_run,
                ..Default::default()
            };
        }

        self.enter(BulkState::Executing);
        info!("Starting bulk {}: {} accounts", action, total);

        let delay = if dry_run {
            client.delay().min(DRY_RUN_DELAY_CEILING)
        } else {
            client.delay()
        };
        let cancel = self.cancel.clone();
        let mut outcome = BulkOutcome {
            total,
            dry_run,
            ..Default::default()
        };

        for (i, record) in candidates.iter().enumerate() {
            if cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                warn!(processed = i, total, "Bulk {} interrupted", action);
                outcome.interrupted = true;
                break;
            }

            let index = i + 1;
            info!("[{}/{}] {} {} (id {})", index, total, action, record.uname, record.mid);
            let succeeded = client.mutate(record.mid, action).await;
            if succeeded {
                outcome.success += 1;
                info!("Done: {}", record.uname);
            } else {
                outcome.failed += 1;
                error!("Failed: {}", record.uname);
            }
            self.emit(BulkEvent::Item {
                index,
                total,
                id: record.mid,
                name: record.uname.clone(),
                succeeded,
            });

            if index < total {
                match cancel {
                    Some(ref token) => {
                        tokio::select! {
                            _ = token.cancelled() => {}
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }
        }

        info!(
            "Bulk {} finished: total {}, succeeded {}, failed {}",
            action, outcome.total, outcome.success, outcome.failed
        );
        self.enter(BulkState::Done);
        outcome
    }
}
