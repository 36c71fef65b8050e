//! Forward-only follow stream over a single growing file.
//!
//! A [`FollowStream`] never reports end-of-file while the file may still grow:
//! when the underlying source has no more bytes it sleeps for the poll
//! interval and tries again. The only way out is closing the stream, either
//! through [`FollowStream::close`] or through a [`CloseHandle`] held by
//! another task.

use crate::error::{Error, Result};
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, ReadBuf};
use tokio::time::Sleep;

/// Delay between read attempts once the end of the file has been reached.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const RESOURCE: &str = "FollowStream";

/// Shared closed flag of a [`FollowStream`].
///
/// Closing through the handle only flips the flag. A blocked read notices it
/// after its current sleep or underlying read and returns end-of-stream.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Marks the stream closed. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// An append-only forward cursor over a file that may still be written to.
pub struct FollowStream<R = File> {
    inner: Option<R>,
    closed: CloseHandle,
    from_end: bool,
    poll_interval: Duration,
    backoff: Option<Pin<Box<Sleep>>>,
}

impl FollowStream<File> {
    /// Opens `path` read-only and follows it.
    pub async fn open<P: AsRef<Path>>(path: P, from_end: bool) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Self::new(file, from_end).await
    }
}

impl<R> FollowStream<R>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    /// Wraps an already-open source.
    ///
    /// With `from_end` set, the source is first positioned at its current end
    /// so only bytes appended afterwards are delivered.
    pub async fn new(source: R, from_end: bool) -> Result<Self> {
        Self::with_poll_interval(source, from_end, DEFAULT_POLL_INTERVAL).await
    }

    pub async fn with_poll_interval(
        mut source: R,
        from_end: bool,
        poll_interval: Duration,
    ) -> Result<Self> {
        if from_end {
            source.seek(SeekFrom::End(0)).await?;
        }
        ensure_readable(&mut source).await?;

        Ok(Self {
            inner: Some(source),
            closed: CloseHandle::default(),
            from_end,
            poll_interval,
            backoff: None,
        })
    }
}

impl<R> FollowStream<R>
where
    R: AsyncRead + Unpin,
{
    /// Reads the next available bytes, waiting while the file has not grown.
    ///
    /// Returns `Ok(0)` only once the stream has been closed.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.inner.is_none() {
            return Err(Error::Disposed { resource: RESOURCE });
        }
        Ok(AsyncReadExt::read(self, buf).await?)
    }

    /// Performs a single read attempt without waiting for growth.
    pub async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let inner = self
            .inner
            .as_mut()
            .ok_or(Error::Disposed { resource: RESOURCE })?;
        Ok(inner.read(buf).await?)
    }
}

impl<R> FollowStream<R> {
    /// Returns a handle that can close this stream from another task.
    pub fn close_handle(&self) -> CloseHandle {
        self.closed.clone()
    }

    /// Closes the stream and releases the underlying source. Idempotent.
    pub fn close(&mut self) {
        self.closed.close();
        self.backoff = None;
        self.inner = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    pub fn from_end(&self) -> bool {
        self.from_end
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn can_read(&self) -> bool {
        self.inner.is_some()
    }

    pub fn can_write(&self) -> bool {
        false
    }

    pub fn can_seek(&self) -> bool {
        false
    }

    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::Unsupported { operation: "write" })
    }

    pub fn flush(&mut self) -> Result<()> {
        Err(Error::Unsupported { operation: "flush" })
    }

    pub fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::Unsupported { operation: "seek" })
    }

    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(Error::Unsupported {
            operation: "set_len",
        })
    }

    pub fn stream_position(&self) -> Result<u64> {
        Err(Error::Unsupported {
            operation: "stream_position",
        })
    }

    pub fn set_position(&mut self, _position: u64) -> Result<()> {
        Err(Error::Unsupported {
            operation: "set_position",
        })
    }

    pub fn stream_len(&self) -> Result<u64> {
        Err(Error::Unsupported {
            operation: "stream_len",
        })
    }
}

impl<R> AsyncRead for FollowStream<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if let Some(backoff) = this.backoff.as_mut() {
                if this.closed.is_closed() {
                    this.backoff = None;
                    return Poll::Ready(Ok(()));
                }
                ready!(backoff.as_mut().poll(cx));
                this.backoff = None;
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(Err(io::Error::other(Error::Disposed {
                    resource: RESOURCE,
                })));
            };
            if this.closed.is_closed() || buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            let filled = buf.filled().len();
            ready!(Pin::new(inner).poll_read(cx, buf))?;

            // The close flag is checked right after the underlying read so a
            // slow read never leads into another sleep.
            if buf.filled().len() > filled || this.closed.is_closed() {
                return Poll::Ready(Ok(()));
            }

            this.backoff = Some(Box::pin(tokio::time::sleep(this.poll_interval)));
        }
    }
}

/// Probes the source with a one byte read and undoes it.
async fn ensure_readable<R>(source: &mut R) -> Result<()>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut probe = [0u8; 1];
    let read = source
        .read(&mut probe)
        .await
        .map_err(|source| Error::NotReadable { source })?;
    if read > 0 {
        source.seek(SeekFrom::Current(-(read as i64))).await?;
    }
    Ok(())
}
