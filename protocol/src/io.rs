//! Deadline-bounded reads and writes of fixed-size messages over a stream

use crate::error::ProtocolError;
use crate::messages::WireMessage;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("No data within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Unexpected data after the final message")]
    TrailingData,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Read exactly one `M` within `deadline`.
///
/// A peer closing mid-message is reported as [`ReadError::ConnectionClosed`],
/// never as a short message.
pub async fn read_message<M, R>(reader: &mut R, deadline: Duration) -> Result<M, ReadError>
where
    M: WireMessage,
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; M::SIZE];
    match timeout(deadline, reader.read_exact(&mut buf)).await {
        Err(_) => return Err(ReadError::Timeout(deadline)),
        Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(ReadError::ConnectionClosed);
        }
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(_)) => {}
    }
    Ok(M::from_bytes(&buf)?)
}

pub async fn write_message<M, W>(writer: &mut W, message: &M) -> std::io::Result<()>
where
    M: WireMessage,
    W: AsyncWrite + Unpin,
{
    writer.write_all(&message.to_bytes()).await
}

/// Wait for the peer to close the stream cleanly.
pub async fn wait_for_close<R>(reader: &mut R, deadline: Duration) -> Result<(), ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    match timeout(deadline, reader.read(&mut byte)).await {
        Err(_) => Err(ReadError::Timeout(deadline)),
        Ok(Ok(0)) => Ok(()),
        Ok(Ok(_)) => Err(ReadError::TrailingData),
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionReset => Ok(()),
        Ok(Err(e)) => Err(e.into()),
    }
}
