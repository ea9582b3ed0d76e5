use std::io::{self, Cursor, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const CHUNK_SIZE: usize = 64 * 1024;
const QUEUED_CHUNKS: usize = 16;

/// Reads `inner` on a worker thread and fails with `TimedOut` when no bytes arrive
/// for `timeout`. A stalled worker is left behind blocked on its read.
pub struct IdleTimeoutReader {
    chunks: Receiver<io::Result<Vec<u8>>>,
    pending: Cursor<Vec<u8>>,
    timeout: Duration,
    finished: bool,
}

impl IdleTimeoutReader {
    pub fn spawn<R>(mut inner: R, timeout: Duration) -> Self
    where
        R: Read + Send + 'static,
    {
        let (sender, chunks) = mpsc::sync_channel(QUEUED_CHUNKS);
        thread::spawn(move || {
            let mut buffer = vec![0; CHUNK_SIZE];
            loop {
                let chunk = match inner.read(&mut buffer) {
                    // An empty chunk marks the end of the stream.
                    Ok(read) => Ok(buffer[..read].to_vec()),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => Err(err),
                };
                let last = !matches!(&chunk, Ok(bytes) if !bytes.is_empty());
                if sender.send(chunk).is_err() || last {
                    return;
                }
            }
        });
        Self {
            chunks,
            pending: Cursor::new(Vec::new()),
            timeout,
            finished: false,
        }
    }
}

impl Read for IdleTimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let read = self.pending.read(buf)?;
            if read > 0 || self.finished || buf.is_empty() {
                return Ok(read);
            }
            match self.chunks.recv_timeout(self.timeout) {
                Ok(Ok(chunk)) if chunk.is_empty() => self.finished = true,
                Ok(Ok(chunk)) => self.pending = Cursor::new(chunk),
                Ok(Err(err)) => return Err(err),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no audio data for {} seconds", self.timeout.as_secs_f32()),
                    ))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "audio reader stopped before the end of the stream",
                    ))
                }
            }
        }
    }
}
