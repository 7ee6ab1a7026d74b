//! Host-side event loop with redelivery of deferred events.
//!
//! The [`Reconciler`] never retries on its own. This loop plays the part of
//! the hosting runtime: it feeds events one at a time and redelivers those
//! whose outcome was [`ReconcileOutcome::Deferred`].

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use waltz_events::LifecycleEvent;

use crate::error::{Error, Result};
use crate::reconciler::Reconciler;
use crate::types::ReconcileOutcome;

/// Configuration for the event loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between redelivery attempts when no new events arrive.
    pub redelivery_interval: Duration,
    /// Redeliveries of one event before it is dropped. `None` keeps
    /// redelivering until the event is handled.
    pub max_redeliveries: Option<u32>,
    /// Capacity of the inbound event channel.
    pub channel_capacity: usize,
    /// Whether to stop on the first reconcile error.
    pub stop_on_error: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            redelivery_interval: Duration::from_secs(5),
            max_redeliveries: None,
            channel_capacity: 64,
            stop_on_error: false,
        }
    }
}

#[derive(Debug, Clone)]
struct DeferredEvent {
    event: LifecycleEvent,
    redeliveries: u32,
}

/// Sending half of the event loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LifecycleEvent>,
}

impl EventSender {
    /// Queue an event for processing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoopStopped`] if the loop is no longer running.
    pub async fn send(&self, event: LifecycleEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::LoopStopped)
    }
}

/// Drives a [`Reconciler`] from a channel of lifecycle events.
pub struct EventLoop {
    reconciler: Reconciler,
    events: mpsc::Receiver<LifecycleEvent>,
    deferred: VecDeque<DeferredEvent>,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl EventLoop {
    /// Create a loop and the sender that feeds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the redelivery interval is zero.
    pub fn new(reconciler: Reconciler, config: LoopConfig) -> Result<(Self, EventSender)> {
        if config.redelivery_interval.is_zero() {
            return Err(Error::invalid_config("redelivery interval must be non-zero"));
        }

        let (tx, events) = mpsc::channel(config.channel_capacity.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);
        let event_loop = Self {
            reconciler,
            events,
            deferred: VecDeque::new(),
            config,
            stop_rx,
            stop_tx,
        };
        Ok((event_loop, EventSender { tx }))
    }

    /// Run until stopped or until every sender is dropped.
    ///
    /// On shutdown, deferred events are redelivered one final time.
    ///
    /// # Errors
    ///
    /// Returns the first reconcile error if `stop_on_error` is set.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            interval_ms = self.config.redelivery_interval.as_millis(),
            "Starting event loop"
        );

        let mut interval = tokio::time::interval(self.config.redelivery_interval);

        loop {
            tokio::select! {
                received = self.events.recv() => {
                    match received {
                        Some(event) => self.accept(event).await?,
                        None => {
                            self.redeliver().await?;
                            info!(pending = self.deferred.len(), "Event channel closed");
                            return Ok(());
                        }
                    }
                }
                _ = interval.tick() => {
                    self.redeliver().await?;
                }
                _ = self.stop_rx.changed() => {
                    if *self.stop_rx.borrow() {
                        info!("Event loop stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Process a newly arrived event, after redelivering anything deferred.
    ///
    /// A new config-changed event supersedes deferred ones, so stale
    /// configuration is never re-applied.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error if `stop_on_error` is set.
    pub async fn accept(&mut self, event: LifecycleEvent) -> Result<()> {
        if matches!(event, LifecycleEvent::ConfigChanged { .. }) {
            self.deferred
                .retain(|d| !matches!(d.event, LifecycleEvent::ConfigChanged { .. }));
        }

        self.redeliver().await?;
        self.dispatch(DeferredEvent {
            event,
            redeliveries: 0,
        })
        .await
    }

    /// Redeliver every deferred event, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns a reconcile error if `stop_on_error` is set.
    pub async fn redeliver(&mut self) -> Result<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }

        debug!(pending = self.deferred.len(), "Redelivering deferred events");
        let pending = std::mem::take(&mut self.deferred);
        for mut deferred in pending {
            deferred.redeliveries = deferred.redeliveries.saturating_add(1);
            self.dispatch(deferred).await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, deferred: DeferredEvent) -> Result<()> {
        let event_type = deferred.event.event_type();

        match self.reconciler.handle(deferred.event.clone()).await {
            Ok(ReconcileOutcome::Deferred) => {
                let exhausted = self
                    .config
                    .max_redeliveries
                    .is_some_and(|max| deferred.redeliveries >= max);
                if exhausted {
                    error!(
                        event = event_type,
                        redeliveries = deferred.redeliveries,
                        "Dropping event after too many redeliveries"
                    );
                } else {
                    debug!(event = event_type, "Event deferred");
                    self.deferred.push_back(deferred);
                }
                Ok(())
            }
            Ok(outcome) => {
                debug!(event = event_type, outcome = ?outcome, "Event handled");
                Ok(())
            }
            Err(e) => {
                warn!(event = event_type, error = %e, "Reconcile failed");
                if self.config.stop_on_error {
                    return Err(e);
                }
                Ok(())
            }
        }
    }

    /// Number of events awaiting redelivery.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// The reconciler driven by this loop.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop an event loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
