//! The bot's event loop.
//!
//! Chat lines are admitted one at a time, in arrival order. Admitted commands
//! and engagement replies then run as independent tasks, and every reply
//! batch funnels through a single writer so chunks of different replies never
//! interleave.

use crate::error::BotResult;
use crate::transport::{ChatSink, ChatSource};
use governor::{DefaultDirectRateLimiter, Quota};
use overlord_commands::{Admission, Dispatcher};
use overlord_common::ChatMessage;
use overlord_config::ConfigCache;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const OUTBOUND_QUEUE: usize = 64;
const OUTBOUND_WINDOW: Duration = Duration::from_secs(30);

/// Counters from one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Chat lines read from the source.
    pub received: u64,
    /// Commands admitted for execution.
    pub admitted: u64,
    /// Tasks still running when the grace period ran out.
    pub aborted: usize,
    /// Lines written to the sink.
    pub sent: usize,
}

/// Limiter allowing `messages_per_30s` lines per 30 seconds, all of them
/// available as a burst.
pub fn outbound_limiter(messages_per_30s: u32) -> DefaultDirectRateLimiter {
    let per_window = NonZeroU32::new(messages_per_30s).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(OUTBOUND_WINDOW / per_window.get())
        .unwrap_or_else(|| Quota::per_second(per_window))
        .allow_burst(per_window);
    DefaultDirectRateLimiter::direct(quota)
}

/// Writes queued reply batches until every sender is gone.
async fn write_batches<K: ChatSink>(
    mut sink: K,
    mut batches: mpsc::Receiver<Vec<String>>,
    limiter: DefaultDirectRateLimiter,
) -> usize {
    let mut sent = 0;
    while let Some(batch) = batches.recv().await {
        for chunk in batch {
            limiter.until_ready().await;
            if let Err(e) = sink.send(&chunk).await {
                error!("Failed to send reply, dropping rest of batch: {}", e);
                break;
            }
            sent += 1;
        }
    }
    debug!(sent, "Writer drained");
    sent
}

/// Drives a [`Dispatcher`] from a chat transport.
pub struct Runtime {
    dispatcher: Arc<Dispatcher>,
    config: Arc<ConfigCache>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Creates the runtime.
    pub fn new(dispatcher: Arc<Dispatcher>, config: Arc<ConfigCache>) -> Self {
        Self {
            dispatcher,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until the source ends, fails, or shutdown is requested.
    ///
    /// On the way out running tasks get the configured grace period, then
    /// are aborted, and the writer flushes what was already queued.
    pub async fn run<S, K>(&self, mut source: S, sink: K) -> BotResult<RunSummary>
    where
        S: ChatSource,
        K: ChatSink + 'static,
    {
        let config = self.config.get();
        let (outbound, queued) = mpsc::channel(OUTBOUND_QUEUE);
        let writer = tokio::spawn(write_batches(
            sink,
            queued,
            outbound_limiter(config.chat.messages_per_30s),
        ));

        let mut summary = RunSummary::default();
        let mut tasks = JoinSet::new();
        info!("Runtime started");

        let outcome = loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Reply task failed: {}", e);
                    }
                }
                next = source.recv() => match next {
                    Ok(Some(message)) => {
                        summary.received += 1;
                        if self.admit(message, &mut tasks, &outbound).await {
                            summary.admitted += 1;
                        }
                    }
                    Ok(None) => {
                        info!("Chat source ended");
                        break Ok(());
                    }
                    Err(e) => {
                        error!("Chat source failed: {}", e);
                        break Err(e);
                    }
                }
            }
        };

        summary.aborted = self.drain(&mut tasks).await;
        drop(outbound);
        summary.sent = match writer.await {
            Ok(sent) => sent,
            Err(e) => {
                error!("Writer task failed: {}", e);
                0
            }
        };
        info!(
            received = summary.received,
            admitted = summary.admitted,
            aborted = summary.aborted,
            sent = summary.sent,
            "Runtime stopped"
        );
        outcome.map(|()| summary)
    }

    /// Admits one message and schedules whatever it calls for. Returns
    /// whether a command was admitted.
    async fn admit(
        &self,
        message: ChatMessage,
        tasks: &mut JoinSet<()>,
        outbound: &mpsc::Sender<Vec<String>>,
    ) -> bool {
        match self.dispatcher.admit(&message) {
            Admission::Execute(invocation) => {
                let dispatcher = self.dispatcher.clone();
                let outbound = outbound.clone();
                tasks.spawn(async move {
                    let chunks = dispatcher.run(*invocation).await;
                    queue(&outbound, chunks).await;
                });
                true
            }
            Admission::Chatter => {
                let dispatcher = self.dispatcher.clone();
                let outbound = outbound.clone();
                tasks.spawn(async move {
                    let chunks = dispatcher.engage(&message).await;
                    queue(&outbound, chunks).await;
                });
                false
            }
            Admission::Denied(Some(notice)) => {
                queue(outbound, vec![notice]).await;
                false
            }
            other => {
                debug!(user = %message.login, ?other, "Message not executed");
                false
            }
        }
    }

    /// Waits out the grace period, then aborts stragglers. Returns how many
    /// were aborted.
    async fn drain(&self, tasks: &mut JoinSet<()>) -> usize {
        if tasks.is_empty() {
            return 0;
        }
        let grace = Duration::from_secs(self.config.get().dispatch.shutdown_grace_secs);
        info!(running = tasks.len(), ?grace, "Waiting for running replies");

        let finished = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if finished.is_ok() {
            return 0;
        }

        let aborted = tasks.len();
        warn!(aborted, "Grace period over, aborting remaining replies");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        aborted
    }
}

async fn queue(outbound: &mpsc::Sender<Vec<String>>, chunks: Vec<String>) {
    if chunks.is_empty() {
        return;
    }
    if outbound.send(chunks).await.is_err() {
        warn!("Writer is gone, reply dropped");
    }
}
