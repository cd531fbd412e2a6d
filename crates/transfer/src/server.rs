//! Server role.
//!
//! Accepts connections and runs one [`Session`] task per connection. Sessions
//! share nothing except the [`FileStore`]; the exclusive create of an upload's
//! staging file is the only point where concurrent uploads meet.

use std::time::Duration;

use ferry_protocol::checksum::to_hex;
use ferry_protocol::{
    FrameError, Inbound, Message, RetrievalRequest, StorageRequest, read_message, verify,
    write_message,
};
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::body::{CopyError, copy_exact};
use crate::error::TransferError;
use crate::expect;
use crate::store::{FileStore, PendingUpload};
use crate::validation::sanitize_file_name;
use crate::{CHECKSUM_MISMATCH, DEFAULT_BUFFER_SIZE, READY_FOR_DATA, READY_TO_SEND, STORED_OK};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP file server.
pub struct TransferServer {
    store: FileStore,
    cancel: CancellationToken,
    buffer_size: usize,
}

impl TransferServer {
    pub fn new(store: FileStore, cancel: CancellationToken) -> Self {
        Self {
            store,
            cancel,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Sets the body streaming buffer size used by every session.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Binds the listening socket.
    pub async fn listen(&self, addr: impl ToSocketAddrs) -> Result<TcpListener, TransferError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransferError::Connection)?;
        let local = listener.local_addr().map_err(TransferError::Connection)?;
        info!(addr = %local, root = %self.store.root().display(), "listening");
        Ok(listener)
    }

    /// Accepts connections until the cancellation token fires.
    ///
    /// Each connection gets its own task; a failing session is logged and
    /// never affects the others.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), TransferError> {
        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            info!(%peer, "connection accepted");
            let (reader, writer) = stream.into_split();
            let session = Session::with_buffer_size(
                reader,
                writer,
                self.store.clone(),
                self.buffer_size,
            )
            .with_peer(peer.to_string());

            tokio::spawn(async move {
                match session.run().await {
                    Ok(exchanges) => info!(%peer, exchanges, "session ended"),
                    Err(e) => warn!(%peer, error = %e, "session failed"),
                }
            });
        }
    }
}

/// Whether a session keeps reading requests after an exchange.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    End,
}

/// One connection's worth of sequential put/get exchanges.
pub struct Session<R, W> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    store: FileStore,
    buf: Vec<u8>,
    peer: String,
}

impl<R, W> Session<R, W>
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
            peer: String::from("-"),
        }
    }

    /// Labels log lines with the remote address.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Serves requests until the peer leaves or an exchange ends the session.
    ///
    /// Returns the number of exchanges handled. A closed or unreadable
    /// connection is a normal end; protocol violations, checksum mismatches
    /// and local I/O failures mid-exchange are returned as errors.
    pub async fn run(mut self) -> Result<u32, TransferError> {
        let mut exchanges = 0u32;

        loop {
            let message = match read_message(&mut self.reader).await {
                Ok(Inbound::Message(msg)) => msg,
                Ok(Inbound::Empty) => {
                    debug!(peer = %self.peer, "empty message, ending session");
                    return Ok(exchanges);
                }
                Err(FrameError::Truncated) => {
                    debug!(peer = %self.peer, "peer closed connection");
                    return Ok(exchanges);
                }
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "unreadable frame, ending session");
                    return Ok(exchanges);
                }
            };

            let flow = match message {
                Message::StorageRequest(req) => self.handle_storage(req).await?,
                Message::RetrievalRequest(req) => self.handle_retrieval(req).await?,
                other => {
                    return Err(TransferError::unexpected(
                        "StorageRequest or RetrievalRequest",
                        other.kind(),
                    ));
                }
            };

            exchanges += 1;
            if flow == Flow::End {
                return Ok(exchanges);
            }
        }
    }

    async fn handle_storage(&mut self, req: StorageRequest) -> Result<Flow, TransferError> {
        let name = match sanitize_file_name(&req.file_name) {
            Ok(name) => name,
            Err(e) => return self.reject_storage(&req.file_name, e).await,
        };
        info!(peer = %self.peer, file = %name, size = req.size, "storage request");

        let mut upload = match self.store.begin_upload(&name).await {
            Ok(upload) => upload,
            Err(e) => return self.reject_storage(&name, e).await,
        };
        debug!(dest = %upload.dest().display(), "upload staged");

        let ready = Message::response(true, READY_FOR_DATA);
        if let Err(e) = write_message(&mut self.writer, &ready).await {
            discard(&name, upload).await;
            return Err(e.into());
        }

        let copied = copy_exact(&mut self.reader, upload.file(), req.size, &mut self.buf).await;
        let local = match copied {
            Ok(digest) => digest,
            Err(e) => {
                discard(&name, upload).await;
                return Err(CopyError::receiving(e));
            }
        };

        let remote = match expect::checksum(read_message(&mut self.reader).await) {
            Ok(remote) => remote,
            Err(e) => {
                discard(&name, upload).await;
                return Err(e);
            }
        };

        debug!(
            file = %name,
            server = %to_hex(&local),
            client = %to_hex(&remote),
            "comparing checksums"
        );

        if !verify(&local, &remote) {
            discard(&name, upload).await;
            let mismatch = Message::response(false, CHECKSUM_MISMATCH);
            write_message(&mut self.writer, &mismatch).await?;
            return Err(TransferError::ChecksumMismatch(format!(
                "{name}: received {} but client sent {}",
                to_hex(&local),
                to_hex(&remote)
            )));
        }

        if let Err(e) = upload.commit().await {
            warn!(peer = %self.peer, file = %name, error = %e, "failed to publish upload");
            let refused = Message::response(false, e.peer_message());
            write_message(&mut self.writer, &refused).await?;
            return Err(e);
        }

        info!(peer = %self.peer, file = %name, bytes = req.size, "file stored");
        write_message(&mut self.writer, &Message::response(true, STORED_OK)).await?;
        Ok(Flow::Continue)
    }

    /// Refuses a storage request before any body was sent.
    ///
    /// The session ends because the client may already be streaming.
    async fn reject_storage(
        &mut self,
        file_name: &str,
        err: TransferError,
    ) -> Result<Flow, TransferError> {
        let reason = err.peer_message();
        warn!(peer = %self.peer, file = %file_name, reason = %reason, "storage rejected");
        write_message(&mut self.writer, &Message::response(false, reason)).await?;
        Ok(Flow::End)
    }

    async fn handle_retrieval(&mut self, req: RetrievalRequest) -> Result<Flow, TransferError> {
        let (mut file, size) = match self.store.open_read(&req.file_name).await {
            Ok(opened) => opened,
            Err(e) => {
                let reason = e.peer_message();
                info!(
                    peer = %self.peer,
                    file = %req.file_name,
                    reason = %reason,
                    "retrieval rejected"
                );
                write_message(
                    &mut self.writer,
                    &Message::retrieval_response(false, reason, 0),
                )
                .await?;
                return Ok(Flow::Continue);
            }
        };
        info!(peer = %self.peer, file = %req.file_name, size, "retrieval request");

        write_message(
            &mut self.writer,
            &Message::retrieval_response(true, READY_TO_SEND, size),
        )
        .await?;

        let local = copy_exact(&mut file, &mut self.writer, size, &mut self.buf)
            .await
            .map_err(CopyError::sending)?;

        debug!(file = %req.file_name, checksum = %to_hex(&local), "body sent");
        write_message(&mut self.writer, &Message::checksum(local.to_vec())).await?;
        Ok(Flow::Continue)
    }
}

/// Throws away an unfinished upload.
async fn discard(name: &str, upload: PendingUpload) {
    match upload.discard().await {
        Ok(()) => debug!(file = %name, "partial upload removed"),
        Err(e) => warn!(file = %name, error = %e, "failed to remove partial upload"),
    }
}
