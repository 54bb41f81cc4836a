//! Live tail of exchange and token events.
//!
//! A [`Subscription`] owns a polling task over one installed log filter.
//! Events arrive in ledger order through [`Subscription::next`]; `stop()` (or
//! dropping the handle) ends polling and uninstalls the filter. A request
//! that is already in flight when the stop signal lands is not aborted, its
//! result is discarded.
//!
//! When the node forgets the filter, the task installs it again and fetches
//! the blocks it may have missed with `eth_getLogs`. Logs mined while that
//! happens can be delivered twice. If the filter cannot be installed again
//! the subscription ends and `next()` returns `None`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::events::{EventDecoder, LedgerEvent};
use crate::ledger::{FilterId, Ledger, LogFilter, RawLog};

const CHANNEL_CAPACITY: usize = 1024;

pub struct Subscription {
    events: mpsc::Receiver<LedgerEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// What the polling task needs to reinstall its filter.
pub(crate) struct InstalledFilter {
    pub id: FilterId,
    pub filter: LogFilter,
    /// Head at install time; catch-up after a lost filter starts above it.
    pub head: u64,
}

impl Subscription {
    pub(crate) fn spawn<L: Ledger + 'static>(
        ledger: Arc<L>,
        installed: InstalledFilter,
        decoder: EventDecoder,
        poll_interval: Duration,
    ) -> Self {
        let (tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(poll_loop(ledger, installed, decoder, poll_interval, tx, stop_rx));
        Self {
            events,
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Next event in delivery order; `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<LedgerEvent> {
        self.events.recv().await
    }

    /// Next event if one is already buffered.
    pub fn try_next(&mut self) -> Option<LedgerEvent> {
        self.events.try_recv().ok()
    }

    /// Stop polling and wait until the filter is uninstalled.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "subscription task panicked");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn poll_loop<L: Ledger>(
    ledger: Arc<L>,
    installed: InstalledFilter,
    decoder: EventDecoder,
    poll_interval: Duration,
    tx: mpsc::Sender<LedgerEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    let InstalledFilter {
        mut id,
        filter,
        head,
    } = installed;
    let mut last_block = head;
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    debug!(filter = %id.0, head, "subscription started");

    'poll: loop {
        tokio::select! {
            _ = &mut stop => break 'poll,
            _ = interval.tick() => {}
        }
        let logs = match ledger.filter_changes(&id).await {
            Ok(logs) => logs,
            Err(e) if e.is_filter_not_found() => {
                warn!(filter = %id.0, "filter lost by the node, installing it again");
                id = match ledger.install_filter(&filter).await {
                    Ok(id) => id,
                    Err(e) => {
                        error!(error = %e, "could not reinstall filter, subscription ended");
                        return;
                    }
                };
                catch_up(ledger.as_ref(), &filter, last_block).await
            }
            Err(e) => {
                warn!(filter = %id.0, error = %e, "polling filter failed");
                continue;
            }
        };
        for log in logs {
            if let Some(block) = log.block_number {
                last_block = last_block.max(block);
            }
            let event = match decoder.decode(&log) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(address = %log.address, error = %e, "undecodable log skipped");
                    continue;
                }
            };
            debug!(kind = event.kind(), block = ?log.block_number, "event delivered");
            if tx.send(event).await.is_err() {
                debug!("subscriber gone");
                break 'poll;
            }
        }
    }

    match ledger.uninstall_filter(&id).await {
        Ok(_) => debug!(filter = %id.0, "subscription stopped"),
        Err(e) => warn!(filter = %id.0, error = %e, "failed to uninstall filter"),
    }
}

/// Logs mined after `last_block`, fetched once after a reinstall.
async fn catch_up<L: Ledger>(ledger: &L, filter: &LogFilter, last_block: u64) -> Vec<RawLog> {
    match ledger.logs(&filter.since(last_block + 1)).await {
        Ok(logs) => {
            debug!(from = last_block + 1, logs = logs.len(), "caught up after reinstall");
            logs
        }
        Err(e) => {
            warn!(from = last_block + 1, error = %e, "catch-up after reinstall failed, logs may be missing");
            Vec::new()
        }
    }
}
