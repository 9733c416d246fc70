//! Print protocol engine.
//!
//! Drives one label through handshake, chunked transfer, end of stream and
//! completion polling. Requests that need an answer are sent one at a time:
//! the slot is reset, the command written, and the next notification taken
//! as its reply. Nothing is retried; the first fatal condition ends the job
//! and leaves the link connected for the caller to clean up.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::link::Link;
use crate::notification::NotificationSlot;
use crate::protocol::commands::{self, encode_depth, Opcode};
use crate::protocol::raster::RasterJob;
use crate::protocol::status::PrintStatus;
use crate::utils::hex;

/// Timing and flow-control parameters of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Upper bound on every wait for a notification.
    pub reply_timeout: Duration,
    /// Delay after writing the ready probe.
    pub probe_delay: Duration,
    /// Delay after every other write. Doubles as the status poll interval.
    pub command_delay: Duration,
    /// Extra pause after a chunk that is not followed by a flow-control wait.
    pub chunk_pause: Duration,
    /// Number of chunks the printer buffers before it must drain.
    pub flow_control_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(10),
            probe_delay: Duration::from_millis(100),
            command_delay: Duration::from_millis(50),
            chunk_pause: Duration::from_millis(20),
            flow_control_interval: 6,
        }
    }
}

impl EngineConfig {
    /// Set the per-wait reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Set the post-write delay used for all commands except the probe.
    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    /// Set the pause after chunks that are not flow-control points.
    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }
}

/// Stage of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JobStage {
    /// No job has run yet.
    #[default]
    Idle,
    /// Ready probe and depth negotiation.
    Handshaking,
    /// Streaming raster chunks.
    Transferring,
    /// End of stream sent, waiting for acknowledgement.
    Finishing,
    /// Polling the printer until it stops printing.
    Polling,
    /// The last job completed.
    Done,
    /// The last job failed.
    Failed,
}

impl JobStage {
    /// Check if the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Reason reported when a wait in this stage goes unanswered.
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::Handshaking => "failed to get ready",
            Self::Transferring => "transfer stalled",
            Self::Finishing => "end of stream unacknowledged",
            Self::Polling => "status poll unanswered",
            Self::Idle | Self::Done | Self::Failed => "no job running",
        }
    }
}

/// Summary of a completed print job.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrintReport {
    /// Chunk commands written.
    pub chunks_sent: usize,
    /// Flow-control waits performed during the transfer.
    pub flow_control_waits: usize,
    /// Status polls sent, including the final one.
    pub status_polls: usize,
    /// Raw status byte of the final poll reply.
    pub final_status: u8,
    /// When the job started.
    pub started_at: DateTime<Utc>,
    /// When the printer reported it was no longer busy.
    pub finished_at: DateTime<Utc>,
}

/// Flattened job result for callers that only need a yes/no and a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrintOutcome {
    /// Whether the label printed.
    pub success: bool,
    /// Human-readable failure reason; empty on success.
    pub reason: String,
}

impl<T> From<&Result<T>> for PrintOutcome {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                reason: String::new(),
            },
            Err(e) => Self {
                success: false,
                reason: e.to_string(),
            },
        }
    }
}

/// Sequences print jobs over a [`Link`].
pub struct PrintEngine<L> {
    link: L,
    slot: NotificationSlot,
    config: EngineConfig,
    stage: JobStage,
}

impl<L: Link> PrintEngine<L> {
    /// Create an engine with default timings.
    ///
    /// `slot` must be the reading half of the mailbox the link's
    /// notification subscription delivers into.
    pub fn new(link: L, slot: NotificationSlot) -> Self {
        Self::with_config(link, slot, EngineConfig::default())
    }

    /// Create an engine with custom timings.
    pub fn with_config(link: L, slot: NotificationSlot, config: EngineConfig) -> Self {
        Self {
            link,
            slot,
            config,
            stage: JobStage::Idle,
        }
    }

    /// Stage of the current or last job.
    pub fn stage(&self) -> JobStage {
        self.stage
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the underlying link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Consume the engine, returning the link.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Print one label.
    ///
    /// Validates `depth` and `raster` before writing anything, then runs the
    /// job to completion or to the first fatal condition.
    pub async fn print_job(&mut self, depth: i32, raster: &[u8]) -> Result<PrintReport> {
        let result = self.run_job(depth, raster).await;

        match &result {
            Ok(report) => {
                self.set_stage(JobStage::Done);
                info!(
                    "Print job done: {} chunks, {} status polls",
                    report.chunks_sent, report.status_polls
                );
            }
            Err(e) => {
                self.set_stage(JobStage::Failed);
                warn!("Print job failed: {}", e);
            }
        }

        result
    }

    /// Print one label, flattening the result into a [`PrintOutcome`].
    pub async fn print(&mut self, depth: i32, raster: &[u8]) -> PrintOutcome {
        PrintOutcome::from(&self.print_job(depth, raster).await)
    }

    async fn run_job(&mut self, depth: i32, raster: &[u8]) -> Result<PrintReport> {
        let job = RasterJob::new(raster)?;
        let depth_byte = encode_depth(depth)?;
        let started_at = Utc::now();

        info!(
            "Starting print job: {} bytes, {} chunks, depth {}",
            raster.len(),
            job.chunk_count(),
            depth
        );

        self.handshake(depth, depth_byte).await?;
        let (chunks_sent, flow_control_waits) = self.transfer(&job).await?;
        self.finish().await;
        let (status_polls, final_status) = self.poll_until_done().await?;

        Ok(PrintReport {
            chunks_sent,
            flow_control_waits,
            status_polls,
            final_status,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn handshake(&mut self, depth: i32, depth_byte: u8) -> Result<()> {
        self.set_stage(JobStage::Handshaking);

        let reply = self
            .request(&commands::ready_probe(), self.config.probe_delay)
            .await
            .ok_or_else(|| self.no_reply())?;
        debug!("Ready probe reply: {}", hex(&reply));

        debug!("Depth: {} ({:02x})", depth, depth_byte);
        let reply = self
            .request(&commands::set_depth(depth_byte), self.config.command_delay)
            .await
            .ok_or_else(|| self.no_reply())?;
        debug!("Set depth reply: {}", hex(&reply));

        Ok(())
    }

    /// Stream every chunk. Returns the number of chunks the link accepted
    /// and the number of flow-control waits.
    ///
    /// A rejected chunk write is not fatal on its own; the next flow-control
    /// wait decides whether the printer kept up.
    async fn transfer(&mut self, job: &RasterJob<'_>) -> Result<(usize, usize)> {
        self.set_stage(JobStage::Transferring);

        let total = job.chunk_count();
        let interval = self.config.flow_control_interval.max(1);
        let mut sent = 0;
        let mut waits = 0;

        for (index, chunk) in job.chunks().enumerate() {
            let number = index + 1;

            // Only a notification that follows the chunk opening a flow-control
            // point may release it.
            self.slot.reset();
            if self
                .send(&commands::chunk(chunk), self.config.command_delay)
                .await
            {
                sent += 1;
                trace!("Sent chunk {}/{}", number, total);
            }

            if number % interval == 0 {
                debug!("Waiting for buffer drain after chunk {}", number);
                waits += 1;
                if self.slot.wait_for_value(self.config.reply_timeout).await.is_none() {
                    return Err(Error::BufferStall {
                        chunk: number,
                        total,
                    });
                }
            } else {
                tokio::time::sleep(self.config.chunk_pause).await;
            }
        }

        Ok((sent, waits))
    }

    async fn finish(&mut self) {
        self.set_stage(JobStage::Finishing);

        match self
            .request(&commands::end_of_stream(), self.config.command_delay)
            .await
        {
            Some(reply) => debug!("End of stream reply: {}", hex(&reply)),
            None => warn!("No reply to end of stream, polling anyway"),
        }
    }

    /// Poll until the printer stops reporting busy. Returns the number of
    /// polls and the final status byte.
    async fn poll_until_done(&mut self) -> Result<(usize, u8)> {
        self.set_stage(JobStage::Polling);
        info!("Waiting for the print to finish");

        let mut polls = 0;
        loop {
            polls += 1;
            let reply = self
                .request(&commands::status_poll(), self.config.command_delay)
                .await
                .ok_or_else(|| self.no_reply())?;

            match PrintStatus::parse(&reply)? {
                PrintStatus::Busy => trace!("Printer busy (poll {})", polls),
                PrintStatus::Finished(status) => {
                    debug!("Printer finished with status {:#04x}", status);
                    return Ok((polls, status));
                }
            }
        }
    }

    /// Send a command and wait for the notification that answers it.
    async fn request(&mut self, frame: &[u8], delay: Duration) -> Option<Bytes> {
        self.slot.reset();
        if !self.send(frame, delay).await {
            return None;
        }

        let reply = self.slot.wait_for_value(self.config.reply_timeout).await;
        if reply.is_none() {
            warn!(
                "Timeout awaiting reply to {}",
                Opcode::of_frame(frame).map_or_else(|| hex(frame), |op| op.to_string())
            );
        }
        reply
    }

    /// Write a frame and wait out the post-write delay. Returns whether the
    /// write was accepted by the transport.
    async fn send(&self, frame: &[u8], delay: Duration) -> bool {
        trace!("Write: {}", hex(frame));

        if let Err(e) = self.link.write_no_response(frame).await {
            warn!("Failed to write {}: {}", hex(frame), e);
            return false;
        }

        tokio::time::sleep(delay).await;
        true
    }

    fn no_reply(&self) -> Error {
        Error::NoReply {
            stage: self.stage,
            timeout: self.config.reply_timeout,
        }
    }

    fn set_stage(&mut self, stage: JobStage) {
        if self.stage != stage {
            debug!("Job stage changed: {:?} -> {:?}", self.stage, stage);
            self.stage = stage;
        }
    }
}

impl<L> std::fmt::Debug for PrintEngine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintEngine")
            .field("stage", &self.stage)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MockLink;
    use crate::notification::notification_slot;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    type Writes = Arc<Mutex<Vec<Vec<u8>>>>;

    const DONE: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
    const BUSY: [u8; 4] = [0x00, 0x00, 0x01, 0x00];

    /// Build an engine whose link answers each written frame with whatever
    /// `responder` returns for it.
    fn scripted<F>(responder: F) -> (PrintEngine<MockLink>, Writes)
    where
        F: FnMut(Opcode) -> Option<Vec<u8>> + Send + 'static,
    {
        lossy(|_| false, responder)
    }

    /// Like [`scripted`], but writes for which `rejects` returns true fail
    /// and never reach `responder`. Every attempted write is recorded.
    fn lossy<R, F>(mut rejects: R, mut responder: F) -> (PrintEngine<MockLink>, Writes)
    where
        R: FnMut(Opcode) -> bool + Send + 'static,
        F: FnMut(Opcode) -> Option<Vec<u8>> + Send + 'static,
    {
        let (tx, slot) = notification_slot();
        let writes: Writes = Arc::new(Mutex::new(Vec::new()));

        let log = writes.clone();
        let mut link = MockLink::new();
        link.expect_write_no_response().returning(move |frame: &[u8]| {
            log.lock().push(frame.to_vec());
            let op = Opcode::of_frame(frame).expect("engine wrote an unknown frame");
            if rejects(op) {
                return Err(Error::NotConnected);
            }
            if let Some(reply) = responder(op) {
                tx.deliver(reply);
            }
            Ok(())
        });

        (PrintEngine::new(link, slot), writes)
    }

    /// Rejects the `n`th chunk write (one-based) and nothing else.
    fn reject_chunk(n: usize) -> impl FnMut(Opcode) -> bool + Send {
        let mut chunks = 0;
        move |op| {
            if op != Opcode::Chunk {
                return false;
            }
            chunks += 1;
            chunks == n
        }
    }

    /// A printer that acknowledges everything, drains its buffer on every
    /// sixth chunk and reports busy `busy_polls` times before finishing.
    fn cooperative_printer(busy_polls: usize) -> impl FnMut(Opcode) -> Option<Vec<u8>> + Send {
        let mut chunks = 0;
        let mut polls = 0;
        move |op| match op {
            Opcode::ReadyProbe | Opcode::SetDepth | Opcode::EndOfStream => Some(vec![0x00]),
            Opcode::Chunk => {
                chunks += 1;
                (chunks % 6 == 0).then(|| vec![0x00])
            }
            Opcode::StatusPoll => {
                polls += 1;
                Some((if polls > busy_polls { DONE } else { BUSY }).to_vec())
            }
        }
    }

    fn opcodes(writes: &Writes) -> Vec<Opcode> {
        writes
            .lock()
            .iter()
            .filter_map(|w| Opcode::of_frame(w))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_two_chunks() {
        let (mut engine, writes) = scripted(cooperative_printer(0));

        let report = engine.print_job(0, &[0u8; 32]).await.unwrap();

        let mut expected = vec![vec![0xF0, 0x5A], vec![0xF0, 0x5B, 0x00, 0x06]];
        let mut zero_chunk = vec![0xF0, 0x5C];
        zero_chunk.extend_from_slice(&[0u8; 16]);
        expected.push(zero_chunk.clone());
        expected.push(zero_chunk);
        expected.push(vec![0xF0, 0x5D, 0x00]);
        expected.push(vec![0xF0, 0x5E]);

        assert_eq!(*writes.lock(), expected);
        assert_eq!(report.chunks_sent, 2);
        assert_eq!(report.flow_control_waits, 0);
        assert_eq!(report.status_polls, 1);
        assert_eq!(report.final_status, 0x00);
        assert_eq!(engine.stage(), JobStage::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_success() {
        let (mut engine, _writes) = scripted(cooperative_printer(0));
        let outcome = engine.print(0, &[0u8; 32]).await;
        assert_eq!(
            outcome,
            PrintOutcome {
                success: true,
                reason: String::new()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_depth_byte() {
        let (mut engine, writes) = scripted(cooperative_printer(0));
        engine.print_job(-2, &[0u8; 16]).await.unwrap();
        assert_eq!(writes.lock()[1], vec![0xF0, 0x5B, 0x12, 0x06]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_are_permuted_on_the_wire() {
        let (mut engine, writes) = scripted(cooperative_printer(0));
        let raster: Vec<u8> = (0u8..16).collect();

        engine.print_job(0, &raster).await.unwrap();

        assert_eq!(
            writes.lock()[2],
            vec![
                0xF0, 0x5C, 0x06, 0x07, 0x04, 0x05, 0x02, 0x03, 0x00, 0x01, 0x0E, 0x0F, 0x0C,
                0x0D, 0x0A, 0x0B, 0x08, 0x09
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_depth_writes_nothing() {
        let (_tx, slot) = notification_slot();
        let mut link = MockLink::new();
        link.expect_write_no_response().never();
        let mut engine = PrintEngine::new(link, slot);

        for depth in [-4, 4, i32::MIN, i32::MAX] {
            let err = engine.print_job(depth, &[0u8; 32]).await.unwrap_err();
            assert!(matches!(err, Error::InvalidDepth { depth: d } if d == depth));
            assert_eq!(engine.stage(), JobStage::Failed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_fails_to_get_ready() {
        let (mut engine, writes) = scripted(|_| None);

        let outcome = engine.print(0, &[0u8; 32]).await;

        assert!(!outcome.success);
        assert!(outcome.reason.starts_with("failed to get ready"));
        assert_eq!(opcodes(&writes), vec![Opcode::ReadyProbe]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_timeout_is_no_reply() {
        let (mut engine, writes) = scripted(|op| (op == Opcode::ReadyProbe).then(|| vec![0x01]));

        let err = engine.print_job(1, &[0u8; 32]).await.unwrap_err();

        assert!(matches!(
            err,
            Error::NoReply {
                stage: JobStage::Handshaking,
                ..
            }
        ));
        assert_eq!(opcodes(&writes), vec![Opcode::ReadyProbe, Opcode::SetDepth]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_six_chunks_wait_once() {
        let (mut engine, writes) = scripted(cooperative_printer(0));

        let report = engine.print_job(0, &[0u8; 96]).await.unwrap();

        assert_eq!(report.flow_control_waits, 1);
        let chunk_writes = opcodes(&writes)
            .into_iter()
            .filter(|op| *op == Opcode::Chunk)
            .count();
        assert_eq!(chunk_writes, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_chunks_wait_twice() {
        let (mut engine, _writes) = scripted(cooperative_printer(0));
        let report = engine.print_job(0, &[0u8; 192]).await.unwrap();
        assert_eq!(report.chunks_sent, 12);
        assert_eq!(report.flow_control_waits, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_stall_aborts_transfer() {
        let (mut engine, writes) = scripted(|op| match op {
            Opcode::Chunk => None,
            _ => Some(vec![0x00]),
        });

        let err = engine.print_job(0, &[0u8; 160]).await.unwrap_err();

        assert!(matches!(err, Error::BufferStall { chunk: 6, total: 10 }));
        let ops = opcodes(&writes);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Chunk).count(), 6);
        assert!(!ops.contains(&Opcode::EndOfStream));
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_chunk_reply_does_not_release_flow_control() {
        let mut chunks = 0;
        let (mut engine, _writes) = scripted(move |op| match op {
            Opcode::Chunk => {
                chunks += 1;
                (chunks == 3).then(|| vec![0x00])
            }
            _ => Some(DONE.to_vec()),
        });

        let err = engine.print_job(0, &[0u8; 96]).await.unwrap_err();
        assert!(matches!(err, Error::BufferStall { chunk: 6, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_end_of_stream_reply_is_tolerated() {
        let mut inner = cooperative_printer(0);
        let (mut engine, writes) = scripted(move |op| match op {
            Opcode::EndOfStream => None,
            other => inner(other),
        });

        engine.print_job(0, &[0u8; 32]).await.unwrap();
        assert_eq!(opcodes(&writes).last(), Some(&Opcode::StatusPoll));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_chunk_is_not_counted() {
        let (mut engine, writes) = lossy(reject_chunk(1), cooperative_printer(0));

        let report = engine.print_job(0, &[0u8; 32]).await.unwrap();

        assert_eq!(report.chunks_sent, 1);
        let chunk_writes = opcodes(&writes)
            .into_iter()
            .filter(|op| *op == Opcode::Chunk)
            .count();
        assert_eq!(chunk_writes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_chunk_stalls_at_next_flow_control_point() {
        let (mut engine, writes) = lossy(reject_chunk(3), cooperative_printer(0));

        let err = engine.print_job(0, &[0u8; 192]).await.unwrap_err();

        // The printer only saw five chunks, so it has nothing to drain yet.
        assert!(matches!(err, Error::BufferStall { chunk: 6, total: 12 }));
        let ops = opcodes(&writes);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Chunk).count(), 6);
        assert!(!ops.contains(&Opcode::EndOfStream));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_end_of_stream_still_polls() {
        let (mut engine, writes) = lossy(|op| op == Opcode::EndOfStream, cooperative_printer(1));

        let report = engine.print_job(0, &[0u8; 32]).await.unwrap();

        assert_eq!(report.status_polls, 2);
        assert_eq!(
            opcodes(&writes)[4..],
            [Opcode::EndOfStream, Opcode::StatusPoll, Opcode::StatusPoll]
        );
        assert_eq!(engine.stage(), JobStage::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_not_busy() {
        let (mut engine, writes) = scripted(cooperative_printer(3));

        let report = engine.print_job(0, &[0u8; 16]).await.unwrap();

        assert_eq!(report.status_polls, 4);
        let polls = opcodes(&writes)
            .into_iter()
            .filter(|op| *op == Opcode::StatusPoll)
            .count();
        assert_eq!(polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_non_busy_status_is_terminal() {
        let mut inner = cooperative_printer(0);
        let (mut engine, _writes) = scripted(move |op| match op {
            Opcode::StatusPoll => Some(vec![0x00, 0x00, 0x42, 0x00]),
            other => inner(other),
        });

        let report = engine.print_job(0, &[0u8; 16]).await.unwrap();
        assert_eq!(report.final_status, 0x42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_status_reply_is_malformed() {
        let mut inner = cooperative_printer(0);
        let (mut engine, _writes) = scripted(move |op| match op {
            Opcode::StatusPoll => Some(vec![0x00, 0x00, 0x00]),
            other => inner(other),
        });

        let outcome = engine.print(0, &[0u8; 16]).await;
        assert!(!outcome.success);
        assert_eq!(outcome.reason, "received an invalid reply: 000000");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_status_reply_is_no_reply() {
        let mut inner = cooperative_printer(0);
        let (mut engine, _writes) = scripted(move |op| match op {
            Opcode::StatusPoll => None,
            other => inner(other),
        });

        let start = tokio::time::Instant::now();
        let err = engine.print_job(0, &[0u8; 16]).await.unwrap_err();

        assert!(matches!(
            err,
            Error::NoReply {
                stage: JobStage::Polling,
                ..
            }
        ));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_no_reply() {
        let (_tx, slot) = notification_slot();
        let mut link = MockLink::new();
        link.expect_write_no_response()
            .times(1)
            .returning(|_| Err(Error::NotConnected));
        let mut engine = PrintEngine::new(link, slot);

        let err = engine.print_job(0, &[0u8; 16]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::NoReply {
                stage: JobStage::Handshaking,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_reply_timeout() {
        let (_tx, slot) = notification_slot();
        let mut link = MockLink::new();
        link.expect_write_no_response().returning(|_| Ok(()));
        let config = EngineConfig::default().with_reply_timeout(Duration::from_secs(2));
        let mut engine = PrintEngine::with_config(link, slot, config);

        let start = tokio::time::Instant::now();
        let err = engine.print_job(0, &[0u8; 16]).await.unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(err.to_string(), "failed to get ready: no reply within 2s");
    }

    proptest! {
        #[test]
        fn prop_misaligned_raster_writes_nothing(len in (0usize..512).prop_filter("misaligned", |l| l % 16 != 0)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let (_tx, slot) = notification_slot();
            let mut link = MockLink::new();
            link.expect_write_no_response().never();
            let mut engine = PrintEngine::new(link, slot);

            let raster = vec![0u8; len];
            let err = runtime.block_on(engine.print_job(0, &raster)).unwrap_err();
            prop_assert!(matches!(err, Error::MisalignedData { len: l } if l == len), "expected MisalignedData {{ len: {} }}, got {:?}", len, err);
        }
    }
}
