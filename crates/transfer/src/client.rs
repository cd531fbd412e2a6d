//! Client role.
//!
//! Drives storage (put) and retrieval (get) exchanges over one connection.
//! Exchanges are strictly sequential; several can share a connection as long
//! as the server kept the session open.

use std::path::Path;

use ferry_protocol::checksum::to_hex;
use ferry_protocol::{
    Digest, Envelope, Message, read_message, verify, write_envelope, write_message,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use crate::body::{CopyError, copy_exact};
use crate::error::TransferError;
use crate::expect;
use crate::store::FileStore;
use crate::validation::sanitize_file_name;
use crate::{CHECKSUM_MISMATCH, DEFAULT_BUFFER_SIZE};

/// Outcome of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    /// Name the file travelled under.
    pub file_name: String,
    /// Body length in bytes.
    pub bytes: u64,
    /// Digest both sides agreed on.
    pub checksum: Digest,
}

/// TCP file client bound to a local working directory.
pub struct TransferClient<R, W> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    store: FileStore,
    buf: Vec<u8>,
}

impl TransferClient<OwnedReadHalf, OwnedWriteHalf> {
    /// Opens a TCP connection to the server.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        store: FileStore,
    ) -> Result<Self, TransferError> {
        Self::connect_with_buffer_size(addr, store, DEFAULT_BUFFER_SIZE).await
    }

    pub async fn connect_with_buffer_size(
        addr: impl ToSocketAddrs,
        store: FileStore,
        buffer_size: usize,
    ) -> Result<Self, TransferError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransferError::Connection)?;
        if let Ok(peer) = stream.peer_addr() {
            info!(%peer, "connected");
        }
        let (reader, writer) = stream.into_split();
        Ok(Self::with_buffer_size(reader, writer, store, buffer_size))
    }
}

impl<R, W> TransferClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, store: FileStore) -> Self {
        Self::with_buffer_size(reader, writer, store, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(reader: R, writer: W, store: FileStore, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            writer: BufWriter::with_capacity(buffer_size, writer),
            store,
            buf: vec![0u8; buffer_size],
        }
    }

    /// Uploads a local file.
    ///
    /// `local_path` is resolved against the working directory; only its final
    /// component is sent as the remote name.
    pub async fn put(&mut self, local_path: &Path) -> Result<TransferSummary, TransferError> {
        let remote_name = sanitize_file_name(&local_path.to_string_lossy())?;
        let path = self.store.root().join(local_path);

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(TransferError::LocalIo)?;
        let size = file
            .metadata()
            .await
            .map_err(TransferError::LocalIo)?
            .len();

        self.store_from(&remote_name, size, &mut file).await
    }

    /// Runs a storage exchange, streaming `size` bytes from `source`.
    pub async fn store_from<S>(
        &mut self,
        file_name: &str,
        size: u64,
        source: &mut S,
    ) -> Result<TransferSummary, TransferError>
    where
        S: AsyncRead + Unpin,
    {
        info!(file = %file_name, size, "storage request");
        write_message(&mut self.writer, &Message::storage_request(file_name, size)).await?;

        let resp = expect::response(read_message(&mut self.reader).await?)?;
        if !resp.ok {
            warn!(file = %file_name, reason = %resp.message, "storage rejected");
            return Err(TransferError::Rejected(resp.message));
        }
        debug!(reason = %resp.message, "server ready");

        let local = copy_exact(source, &mut self.writer, size, &mut self.buf)
            .await
            .map_err(CopyError::sending)?;
        debug!(file = %file_name, checksum = %to_hex(&local), "body sent");

        write_message(&mut self.writer, &Message::checksum(local.to_vec())).await?;

        let resp = expect::response(read_message(&mut self.reader).await?)?;
        if !resp.ok {
            warn!(file = %file_name, reason = %resp.message, "server refused stored body");
            if resp.message == CHECKSUM_MISMATCH {
                return Err(TransferError::ChecksumMismatch(resp.message));
            }
            return Err(TransferError::Rejected(resp.message));
        }

        info!(file = %file_name, bytes = size, "storage complete");
        Ok(TransferSummary {
            file_name: file_name.to_string(),
            bytes: size,
            checksum: local,
        })
    }

    /// Downloads `file_name` into the working directory.
    ///
    /// Fails before touching the network if the destination already exists.
    /// On any later failure the partially written destination is deleted.
    pub async fn retrieve(&mut self, file_name: &str) -> Result<TransferSummary, TransferError> {
        let name = sanitize_file_name(file_name)?;
        let mut file = self.store.create_exclusive(&name).await?;

        let result = match self.retrieve_to(&name, &mut file).await {
            Ok(summary) => file
                .sync_all()
                .await
                .map(|()| summary)
                .map_err(TransferError::LocalIo),
            Err(e) => Err(e),
        };
        drop(file);

        if result.is_err() {
            match self.store.remove(&name).await {
                Ok(()) => debug!(file = %name, "partial download removed"),
                Err(e) => warn!(file = %name, error = %e, "failed to remove partial download"),
            }
        }
        result
    }

    /// Runs a retrieval exchange, writing the body into `sink`.
    ///
    /// The caller owns `sink` and must discard it if this returns an error.
    pub async fn retrieve_to<S>(
        &mut self,
        file_name: &str,
        sink: &mut S,
    ) -> Result<TransferSummary, TransferError>
    where
        S: AsyncWrite + Unpin,
    {
        info!(file = %file_name, "retrieval request");
        write_message(&mut self.writer, &Message::retrieval_request(file_name)).await?;

        let resp = expect::retrieval_response(read_message(&mut self.reader).await?)?;
        if !resp.ok() {
            warn!(file = %file_name, reason = %resp.message(), "retrieval rejected");
            return Err(TransferError::Rejected(resp.message().to_string()));
        }
        debug!(size = resp.size, "server sending");

        let local = copy_exact(&mut self.reader, sink, resp.size, &mut self.buf)
            .await
            .map_err(CopyError::receiving)?;

        let remote = expect::checksum(read_message(&mut self.reader).await)?;
        debug!(
            file = %file_name,
            client = %to_hex(&local),
            server = %to_hex(&remote),
            "comparing checksums"
        );

        if !verify(&local, &remote) {
            warn!(file = %file_name, "checksum mismatch");
            return Err(TransferError::ChecksumMismatch(format!(
                "{file_name}: received {} but server sent {}",
                to_hex(&local),
                to_hex(&remote)
            )));
        }

        info!(file = %file_name, bytes = resp.size, "retrieval complete");
        Ok(TransferSummary {
            file_name: file_name.to_string(),
            bytes: resp.size,
            checksum: local,
        })
    }

    /// Tells the server we are done and shuts down the write side.
    pub async fn close(mut self) -> Result<(), TransferError> {
        write_envelope(&mut self.writer, &Envelope::default()).await?;
        self.writer
            .shutdown()
            .await
            .map_err(TransferError::Connection)?;
        Ok(())
    }
}
