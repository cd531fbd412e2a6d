//! Streaming of raw, unframed file bodies.

use std::io;

use ferry_protocol::{Checksum, Digest};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransferError;

/// Which end of a body copy failed.
#[derive(Debug)]
pub(crate) enum CopyError {
    Source(io::Error),
    Sink(io::Error),
    /// The source hit EOF with `remaining` bytes still owed.
    SourceEnded { remaining: u64 },
}

impl CopyError {
    /// Maps a failed copy from a local file onto the connection.
    pub(crate) fn sending(self) -> TransferError {
        match self {
            CopyError::Source(e) => TransferError::LocalIo(e),
            CopyError::Sink(e) => TransferError::Connection(e),
            CopyError::SourceEnded { remaining } => TransferError::LocalIo(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("local file ended {remaining} bytes short of its announced size"),
            )),
        }
    }

    /// Maps a failed copy from the connection into a local file.
    pub(crate) fn receiving(self) -> TransferError {
        match self {
            CopyError::Source(e) => TransferError::Connection(e),
            CopyError::Sink(e) => TransferError::LocalIo(e),
            CopyError::SourceEnded { remaining } => TransferError::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed with {remaining} body bytes outstanding"),
            )),
        }
    }
}

/// Copies exactly `len` bytes from `src` to `dst`, digesting them on the way.
///
/// Memory use is bounded by `buf`; the body is never held whole. `dst` is
/// flushed before returning.
pub(crate) async fn copy_exact<R, W>(
    src: &mut R,
    dst: &mut W,
    len: u64,
    buf: &mut [u8],
) -> Result<Digest, CopyError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut checksum = Checksum::new();
    let mut remaining = len;

    while remaining > 0 {
        let to_read = remaining.min(buf.len() as u64) as usize;
        let n = src
            .read(&mut buf[..to_read])
            .await
            .map_err(CopyError::Source)?;
        if n == 0 {
            return Err(CopyError::SourceEnded { remaining });
        }

        checksum.update(&buf[..n]);
        dst.write_all(&buf[..n]).await.map_err(CopyError::Sink)?;
        remaining -= n as u64;
    }

    dst.flush().await.map_err(CopyError::Sink)?;
    Ok(checksum.finalize())
}
