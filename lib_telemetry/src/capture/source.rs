//! # Event Sources
//!
//! An event source is an opaque producer of JSON event payloads. The pipeline
//! subscribes to it exactly once and never unsubscribes; from then on the
//! source pushes every payload it produces into the `Recorder`.
//!
//! ## Provided adapters:
//! - **`ChannelSource`**: payloads arrive on an MPSC channel. Handy for
//!   embedding and tests.
//! - **`JsonLinesSource`**: newline-delimited JSON read from any
//!   `AsyncBufRead` (stdin, a file, a socket).
//! - **`FnSource`**: a closure that receives the recorder and wires it up
//!   however it likes.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::record::RecordError;
use super::recorder::Recorder;

/// A once-only producer of event payloads.
pub trait EventSource: Send + 'static {
    /// Starts delivering payloads into `recorder`. Consumes the source, so a
    /// source can never be subscribed twice.
    fn subscribe(self, recorder: Recorder);
}

/// Payloads pushed through an unbounded channel.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl ChannelSource {
    /// Creates the source and the sender that feeds it.
    pub fn new() -> (Self, mpsc::UnboundedSender<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver }, sender)
    }
}

impl EventSource for ChannelSource {
    fn subscribe(mut self, recorder: Recorder) {
        tokio::spawn(async move {
            while let Some(payload) = self.receiver.recv().await {
                recorder.record(payload);
            }
            log::debug!("Event channel closed.");
        });
    }
}

/// Newline-delimited JSON payloads.
///
/// Blank lines are skipped. A line that is not JSON is logged and skipped.
/// End of input simply stops the stream; the flusher keeps running.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
}

impl<R> JsonLinesSource<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> EventSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn subscribe(self, recorder: Recorder) {
        tokio::spawn(async move {
            let mut lines = self.reader.lines();
            let mut line_no: u64 = 0;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        line_no += 1;
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Value>(line) {
                            Ok(payload) => {
                                recorder.record(payload);
                            }
                            Err(e) => {
                                log::warn!("Line {}: {}", line_no, RecordError::from(e));
                            }
                        }
                    }
                    Ok(None) => {
                        log::info!("Event stream ended after {} lines.", line_no);
                        break;
                    }
                    Err(e) => {
                        log::warn!("Event stream read failed after {} lines: {}", line_no, e);
                        break;
                    }
                }
            }
        });
    }
}

/// A closure acting as a source.
pub struct FnSource<F>(pub F);

impl<F> EventSource for FnSource<F>
where
    F: FnOnce(Recorder) + Send + 'static,
{
    fn subscribe(self, recorder: Recorder) {
        (self.0)(recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::dedup::SequenceCursor;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for(recorder: &Recorder, count: usize) {
        for _ in 0..100 {
            if recorder.buffered() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("recorder never reached {} records", count);
    }

    #[tokio::test]
    async fn test_json_lines_skips_blank_and_malformed_lines() {
        let input = b"{\"timestamp\": 1}\n\nnot json\n{\"timestamp\": 2, \"type\": 3}\n{\"type\": 4}\n";
        let recorder = Recorder::new(Box::new(SequenceCursor::new()));

        JsonLinesSource::new(&input[..]).subscribe(recorder.clone());
        wait_for(&recorder, 2).await;

        let stamps: Vec<i64> = recorder.snapshot().iter().filter_map(|r| r.timestamp().as_i64()).collect();
        assert_eq!(stamps, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_channel_source_forwards_in_order() {
        let recorder = Recorder::new(Box::new(SequenceCursor::new()));
        let (source, sender) = ChannelSource::new();
        source.subscribe(recorder.clone());

        for ts in [3, 1, 2] {
            sender.send(json!({"timestamp": ts})).unwrap();
        }
        wait_for(&recorder, 3).await;

        let stamps: Vec<i64> = recorder.snapshot().iter().filter_map(|r| r.timestamp().as_i64()).collect();
        assert_eq!(stamps, vec![3, 1, 2]);
    }

    #[test]
    fn test_fn_source_gets_the_recorder() {
        let recorder = Recorder::new(Box::new(SequenceCursor::new()));
        FnSource(|r: Recorder| {
            r.record(json!({"timestamp": 42}));
        })
        .subscribe(recorder.clone());
        assert_eq!(recorder.buffered(), 1);
    }
}
