//! Serialized writes to an output stream.
//!
//! Every write is handed to one writer task over a channel and acknowledged
//! only once it has been flushed, so concurrent producers never interleave.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

struct WriteJob {
    bytes: Vec<u8>,
    done: oneshot::Sender<io::Result<()>>,
}

pub struct OutputQueue<W> {
    tx: mpsc::UnboundedSender<WriteJob>,
    writer: JoinHandle<W>,
}

impl OutputQueue<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> OutputQueue<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn new(mut sink: W) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
        let writer = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let outcome = async {
                    sink.write_all(&job.bytes).await?;
                    sink.flush().await
                }
                .await;
                // The producer may have stopped waiting; nothing to report then.
                let _ = job.done.send(outcome);
            }
            sink
        });
        Self { tx, writer }
    }

    /// Queue `bytes` and wait until they have been written and flushed.
    pub async fn write(&self, bytes: impl Into<Vec<u8>>) -> io::Result<()> {
        let (done, ack) = oneshot::channel();
        self.tx
            .send(WriteJob {
                bytes: bytes.into(),
                done,
            })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output writer stopped"))?;
        ack.await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output writer stopped"))?
    }

    pub async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write(bytes).await
    }

    /// Drain pending writes and hand the sink back.
    pub async fn shutdown(self) -> io::Result<W> {
        drop(self.tx);
        self.writer
            .await
            .map_err(|e| io::Error::other(format!("output writer failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn writes_land_in_submission_order() {
        let queue = OutputQueue::new(Vec::<u8>::new());
        queue.write_line("first").await.unwrap();
        queue.write("second\n").await.unwrap();
        let sink = queue.shutdown().await.unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn concurrent_writers_never_interleave() {
        let queue = Arc::new(OutputQueue::new(Vec::<u8>::new()));
        let lines: Vec<String> = (0..20).map(|i| format!("{{\"n\":{}}}", i).repeat(50)).collect();

        let writes = lines.iter().map(|line| {
            let queue = Arc::clone(&queue);
            async move { queue.write_line(line).await }
        });
        for outcome in futures::future::join_all(writes).await {
            outcome.unwrap();
        }

        let queue = Arc::try_unwrap(queue).ok().expect("sole owner");
        let out = String::from_utf8(queue.shutdown().await.unwrap()).unwrap();
        let written: Vec<&str> = out.lines().collect();
        assert_eq!(written.len(), lines.len());
        for line in written {
            assert!(lines.iter().any(|l| l == line));
        }
    }
}
