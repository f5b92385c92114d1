//! The FIFO batcher loop, the densest part of this service:
//! a single-consumer channel feeds a dedicated task that assembles
//! GPU-sized batches and fans results back to each caller.

use crate::backend::GenerationBackend;
use crate::config::Config;
use crate::error::ServerError;
use crate::lifecycle::{Lifecycle, State};
use arena_common::model::{DetailedTextToMusicPrompt, GenerationMetadata, TextToMusicResponse};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Notify};

struct PendingBatchRequest {
    prompt: DetailedTextToMusicPrompt,
    seed: u32,
    result_tx: oneshot::Sender<Result<TextToMusicResponse, ServerError>>,
    enqueued_at: Instant,
    cancelled: Arc<AtomicBool>,
}

struct CancelGuard(Arc<AtomicBool>);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Handle callers use to submit a prompt and await its response. Cloning is
/// cheap — it's just a channel sender plus shared lifecycle/warm-trigger
/// handles.
#[derive(Clone)]
pub struct BatchQueue {
    tx: mpsc::Sender<PendingBatchRequest>,
    warm_trigger: Arc<Notify>,
    lifecycle: Arc<Lifecycle>,
    max_queue_wait: Duration,
}

impl BatchQueue {
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// `GET /health?warm=1`: ask the batcher to warm the model without
    /// waiting for a real request to trigger it.
    pub fn trigger_warm(&self) {
        self.warm_trigger.notify_one();
    }

    /// Enqueue `prompt` and await its generated response. A dropped future
    /// (client disconnect) is observed by the batcher via `cancelled`.
    pub async fn generate(
        &self,
        prompt: DetailedTextToMusicPrompt,
    ) -> Result<TextToMusicResponse, ServerError> {
        if self.max_queue_wait.is_zero() {
            // Unreachable in practice (always configured > 0); guards
            // against a degenerate config silently hanging forever.
        }

        let seed = prompt.seed;
        let (result_tx, result_rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let request = PendingBatchRequest {
            prompt,
            seed,
            result_tx,
            enqueued_at: Instant::now(),
            cancelled: cancelled.clone(),
        };

        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ServerError::Busy,
            mpsc::error::TrySendError::Closed(_) => {
                ServerError::Internal("batcher loop has stopped".to_string())
            }
        })?;

        let guard = CancelGuard(cancelled);
        let result = result_rx
            .await
            .map_err(|_| ServerError::Internal("batcher dropped the request".to_string()))?;
        drop(guard);
        result
    }
}

/// Spawns the batcher task and returns the handle callers submit work
/// through. The task runs until every [`BatchQueue`] clone is dropped.
pub fn spawn(
    config: Config,
    backend: Arc<dyn GenerationBackend>,
) -> (BatchQueue, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let lifecycle = Arc::new(Lifecycle::new());
    let warm_trigger = Arc::new(Notify::new());
    let max_queue_wait = Duration::from_secs_f64((config.max_delay_secs * 15.0).max(30.0));

    let queue = BatchQueue {
        tx,
        warm_trigger: warm_trigger.clone(),
        lifecycle: lifecycle.clone(),
        max_queue_wait,
    };

    let handle = tokio::spawn(batcher_loop(
        rx,
        config,
        backend,
        lifecycle,
        warm_trigger,
        max_queue_wait,
    ));

    (queue, handle)
}

async fn next_or_shutdown(
    rx: &mut mpsc::Receiver<PendingBatchRequest>,
    warm_trigger: &Notify,
    backend: &Arc<dyn GenerationBackend>,
    lifecycle: &Lifecycle,
) -> Option<PendingBatchRequest> {
    loop {
        tokio::select! {
            maybe = rx.recv() => return maybe,
            _ = warm_trigger.notified(), if lifecycle.get() == State::Cold => {
                ensure_warm(backend, lifecycle).await;
            }
        }
    }
}

/// Returns `true` if this call performed the COLD -> WARMING -> READY
/// transition (i.e. the batch that follows is the first on a freshly warmed
/// model).
async fn ensure_warm(backend: &Arc<dyn GenerationBackend>, lifecycle: &Lifecycle) -> bool {
    if lifecycle.get() != State::Cold {
        return false;
    }
    lifecycle.set(State::Warming);
    backend.prepare().await;
    lifecycle.set(State::Ready);
    true
}

/// Drops `req` with [`ServerError::BatchTimeout`] if it has been queued
/// longer than `max_queue_wait`; otherwise passes it through.
fn timeout_stale(req: PendingBatchRequest, max_queue_wait: Duration) -> Option<PendingBatchRequest> {
    if req.cancelled.load(Ordering::SeqCst) {
        return None;
    }
    if req.enqueued_at.elapsed() > max_queue_wait {
        let _ = req.result_tx.send(Err(ServerError::BatchTimeout));
        return None;
    }
    Some(req)
}

async fn batcher_loop(
    mut rx: mpsc::Receiver<PendingBatchRequest>,
    config: Config,
    backend: Arc<dyn GenerationBackend>,
    lifecycle: Arc<Lifecycle>,
    warm_trigger: Arc<Notify>,
    max_queue_wait: Duration,
) {
    let limit = config.effective_batch_limit();
    let max_delay = Duration::from_secs_f64(config.max_delay_secs);

    loop {
        let Some(first) = next_or_shutdown(&mut rx, &warm_trigger, &backend, &lifecycle).await
        else {
            break;
        };
        let just_warmed = ensure_warm(&backend, &lifecycle).await;

        let mut batch = Vec::with_capacity(limit);
        if let Some(first) = timeout_stale(first, max_queue_wait) {
            batch.push(first);
        }

        let deadline = Instant::now() + max_delay;
        let mut channel_closed = false;
        while batch.len() < limit && !channel_closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(req) => {
                        if let Some(req) = timeout_stale(req, max_queue_wait) {
                            batch.push(req);
                        }
                    }
                    None => channel_closed = true,
                },
                _ = tokio::time::sleep(remaining) => break,
            }
        }

        if !batch.is_empty() {
            process_batch(batch, &backend, !just_warmed).await;
        }
        if channel_closed {
            break;
        }
    }
}

async fn process_batch(batch: Vec<PendingBatchRequest>, backend: &Arc<dyn GenerationBackend>, model_warm: bool) {
    let batch_size = batch.len();
    let batch_start = Instant::now();

    // Cancelled requests are dropped before invoking the model at all;
    // requests already in flight are never aborted.
    let mut groups: Vec<(u32, Vec<PendingBatchRequest>)> = Vec::new();
    for req in batch {
        if req.cancelled.load(Ordering::SeqCst) {
            continue;
        }
        if let Some((_, group)) = groups.iter_mut().find(|(seed, _)| *seed == req.seed) {
            group.push(req);
        } else {
            let seed = req.seed;
            groups.push((seed, vec![req]));
        }
    }

    for (seed, group) in groups {
        let prompts: Vec<DetailedTextToMusicPrompt> =
            group.iter().map(|r| r.prompt.clone()).collect();
        let generate_start = Instant::now();
        let outcome = backend.generate_batch(&prompts, seed).await;
        let generate_ms = generate_start.elapsed().as_millis() as u64;
        let queue_wait_ms = group
            .iter()
            .map(|r| batch_start.duration_since(r.enqueued_at).as_millis() as u64)
            .collect::<Vec<_>>();

        match outcome {
            Ok(results) => {
                for ((req, result), queue_wait_ms) in
                    group.into_iter().zip(results).zip(queue_wait_ms)
                {
                    let response = result.map(|raw| TextToMusicResponse {
                        audio_bytes: raw.pcm,
                        sample_rate: raw.sample_rate,
                        lyrics: raw.lyrics,
                        metadata: GenerationMetadata {
                            batch_size,
                            queue_wait_ms,
                            generate_ms,
                            model_warm,
                        },
                    });
                    let _ = req
                        .result_tx
                        .send(response.map_err(ServerError::GenerationFailed));
                }
            }
            Err(err) => {
                for req in group {
                    let _ = req
                        .result_tx
                        .send(Err(ServerError::GenerationFailed(err.clone())));
                }
            }
        }
    }
}
