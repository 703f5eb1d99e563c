//! Stream actors and the buffering engine handle.

use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use stream_core::{AdmittedRecord, Error, PipelineConfig, Result, SealTrigger, SealedBatch};
use telemetry::metrics;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::backlog::Backlog;
use crate::batch::{BufferState, StreamBuffer};
use crate::partitioner::{shard_for, stream_name};

/// Point-in-time view of a stream's open batch.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSnapshot {
    pub stream: String,
    pub generation: u64,
    pub state: BufferState,
    pub records: usize,
    pub size_bytes: usize,
}

enum StreamCommand {
    Admit(AdmittedRecord),
    Seal {
        /// `None` seals whatever generation is open
        generation: Option<u64>,
        trigger: SealTrigger,
        reply: oneshot::Sender<Option<u64>>,
    },
    Snapshot {
        reply: oneshot::Sender<StreamSnapshot>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

struct StreamHandle {
    name: String,
    tx: mpsc::Sender<StreamCommand>,
}

/// Owns one actor per stream.
pub struct BufferEngine {
    epoch: u64,
    streams: Vec<StreamHandle>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl BufferEngine {
    /// Spawn one actor per configured shard. Sealed batches are sent on
    /// `handoff`; a full hand-off channel blocks the sealing stream.
    pub fn start(
        config: &PipelineConfig,
        handoff: mpsc::Sender<SealedBatch>,
        backlog: Arc<Backlog>,
    ) -> Self {
        let shards = config.stream_shards.max(1);
        let epoch = Utc::now().timestamp_millis().max(0) as u64;
        let mut streams = Vec::with_capacity(shards);
        let mut tasks = Vec::with_capacity(shards);

        for shard in 0..shards {
            let name = stream_name(&config.stream_name, shard);
            let (tx, rx) = mpsc::channel(config.stream_channel_capacity.max(1));
            let actor = StreamActor {
                buffer: StreamBuffer::new(
                    name.clone(),
                    config.buffer_interval(),
                    config.buffer_size_threshold_bytes,
                )
                .with_epoch(epoch),
                rx,
                handoff: handoff.clone(),
                backlog: backlog.clone(),
            };
            tasks.push(tokio::spawn(actor.run()));
            streams.push(StreamHandle { name, tx });
        }

        info!(
            streams = shards,
            epoch,
            interval_secs = config.buffer_interval_seconds,
            size_threshold = config.buffer_size_threshold_bytes,
            "Buffering engine started"
        );

        Self {
            epoch,
            streams,
            tasks: parking_lot::Mutex::new(tasks),
        }
    }

    /// Start time (ms) of this run; stamped on every sealed batch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Names of all streams.
    pub fn streams(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|s| s.name.as_str())
    }

    /// Stream a recording is routed to.
    pub fn stream_for(&self, recording_id: &str) -> &str {
        &self.streams[shard_for(recording_id, self.streams.len())].name
    }

    /// Forward an admitted record to its stream without waiting.
    ///
    /// On failure the record is handed back with the error so the caller can
    /// release its reservation.
    pub fn try_enqueue(
        &self,
        record: AdmittedRecord,
    ) -> std::result::Result<&str, (Error, AdmittedRecord)> {
        let handle = &self.streams[shard_for(&record.record.recording_id, self.streams.len())];
        match handle.tx.try_reserve() {
            Ok(permit) => {
                permit.send(StreamCommand::Admit(record));
                Ok(&handle.name)
            }
            Err(mpsc::error::TrySendError::Full(())) => Err((
                Error::capacity(format!("stream {} is at capacity", handle.name)),
                record,
            )),
            Err(mpsc::error::TrySendError::Closed(())) => Err((
                Error::capacity(format!("stream {} is closed", handle.name)),
                record,
            )),
        }
    }

    /// Force a time-based seal of the stream's open batch.
    ///
    /// Returns the sealed batch sequence, or `None` if nothing was open.
    pub async fn force_seal(&self, stream: &str) -> Result<Option<u64>> {
        self.seal(stream, None, SealTrigger::Interval).await
    }

    /// Seal a specific generation; a no-op if it was already sealed.
    pub async fn seal_generation(&self, stream: &str, generation: u64) -> Result<Option<u64>> {
        self.seal(stream, Some(generation), SealTrigger::Interval).await
    }

    /// Force a time-based seal on every stream.
    pub async fn force_seal_all(&self) -> Vec<u64> {
        let mut sealed = Vec::new();
        for handle in &self.streams {
            if let Ok(Some(seq)) = self.seal(&handle.name, None, SealTrigger::Interval).await {
                sealed.push(seq);
            }
        }
        sealed
    }

    /// Seal every open batch with the flush trigger. Returns the number of
    /// batches sealed.
    pub async fn flush(&self) -> usize {
        let mut sealed = 0;
        for handle in &self.streams {
            if let Ok(Some(_)) = self.seal(&handle.name, None, SealTrigger::Flush).await {
                sealed += 1;
            }
        }
        info!(batches = sealed, "Flushed open batches");
        sealed
    }

    pub async fn snapshot(&self, stream: &str) -> Result<StreamSnapshot> {
        let handle = self.handle(stream)?;
        let (reply, rx) = oneshot::channel();
        request(&handle.tx, StreamCommand::Snapshot { reply }, rx).await
    }

    /// Flush and stop every stream actor.
    pub async fn shutdown(&self) {
        for handle in &self.streams {
            let (reply, rx) = oneshot::channel();
            if let Err(e) = request(&handle.tx, StreamCommand::Close { reply }, rx).await {
                debug!(stream = %handle.name, error = %e, "Stream already closed");
            }
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Stream actor panicked");
            }
        }
        info!("Buffering engine stopped");
    }

    async fn seal(
        &self,
        stream: &str,
        generation: Option<u64>,
        trigger: SealTrigger,
    ) -> Result<Option<u64>> {
        let handle = self.handle(stream)?;
        let (reply, rx) = oneshot::channel();
        request(
            &handle.tx,
            StreamCommand::Seal {
                generation,
                trigger,
                reply,
            },
            rx,
        )
        .await
    }

    fn handle(&self, stream: &str) -> Result<&StreamHandle> {
        self.streams
            .iter()
            .find(|s| s.name == stream)
            .ok_or_else(|| Error::internal(format!("unknown stream {}", stream)))
    }
}

async fn request<T>(
    tx: &mpsc::Sender<StreamCommand>,
    command: StreamCommand,
    rx: oneshot::Receiver<T>,
) -> Result<T> {
    tx.send(command)
        .await
        .map_err(|_| Error::internal("stream actor stopped"))?;
    rx.await
        .map_err(|_| Error::internal("stream actor dropped the request"))
}

/// Single writer of one stream's open batch.
struct StreamActor {
    buffer: StreamBuffer,
    rx: mpsc::Receiver<StreamCommand>,
    handoff: mpsc::Sender<SealedBatch>,
    backlog: Arc<Backlog>,
}

impl StreamActor {
    async fn run(mut self) {
        debug!(stream = %self.buffer.stream(), "Stream actor started");

        loop {
            let deadline = self.buffer.due_at();
            tokio::select! {
                biased;

                _ = wait_until(deadline) => {
                    if let Some(batch) = self.buffer.poll_interval(Instant::now()) {
                        self.hand_off(batch).await;
                    }
                }

                command = self.rx.recv() => match command {
                    Some(StreamCommand::Admit(record)) => {
                        if let Some(batch) = self.buffer.push(record, Instant::now()) {
                            self.hand_off(batch).await;
                        }
                    }
                    Some(StreamCommand::Seal { generation, trigger, reply }) => {
                        let generation = generation.unwrap_or(self.buffer.generation());
                        let sealed = match self.buffer.seal(generation, trigger) {
                            Some(batch) => {
                                let seq = batch.metadata.sequence;
                                self.hand_off(batch).await;
                                Some(seq)
                            }
                            None => None,
                        };
                        let _ = reply.send(sealed);
                    }
                    Some(StreamCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(StreamCommand::Close { reply }) => {
                        self.close().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.close().await;
                        break;
                    }
                },
            }
        }

        debug!(stream = %self.buffer.stream(), "Stream actor stopped");
    }

    async fn close(&mut self) {
        // Records still queued behind the close command were admitted too.
        while let Ok(command) = self.rx.try_recv() {
            if let StreamCommand::Admit(record) = command {
                if let Some(batch) = self.buffer.push(record, Instant::now()) {
                    self.hand_off(batch).await;
                }
            }
        }
        if let Some(batch) = self.buffer.seal_current(SealTrigger::Flush) {
            self.hand_off(batch).await;
        }
        self.rx.close();
    }

    async fn hand_off(&self, batch: SealedBatch) {
        let m = metrics();
        match batch.metadata.trigger {
            SealTrigger::Interval => m.batches_sealed_interval.inc(),
            SealTrigger::Size => m.batches_sealed_size.inc(),
            SealTrigger::Flush => m.batches_sealed_flush.inc(),
        }

        debug!(
            stream = %batch.metadata.stream,
            batch_seq = batch.metadata.sequence,
            records = batch.len(),
            size_bytes = batch.metadata.size_bytes,
            trigger = batch.metadata.trigger.as_str(),
            "Sealed batch"
        );

        let records = batch.len();
        self.backlog.batch_sealed();
        if let Err(e) = self.handoff.send(batch).await {
            let batch = e.0;
            error!(
                stream = %batch.metadata.stream,
                batch_seq = batch.metadata.sequence,
                records,
                "Dispatcher is gone, sealed batch could not be handed off"
            );
            self.backlog.batch_settled(records);
        }
    }

    fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            stream: self.buffer.stream().to_string(),
            generation: self.buffer.generation(),
            state: self.buffer.state(),
            records: self.buffer.len(),
            size_bytes: self.buffer.size_bytes(),
        }
    }
}

fn wait_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
