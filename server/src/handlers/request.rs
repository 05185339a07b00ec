//! Session request handler

use super::SessionError;
use protocol::Request;
use protocol::io::read_message;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::debug;

/// Wait for the opening Request.
///
/// Anything other than a well-formed Request within `deadline` fails the
/// session; the caller closes the connection.
pub async fn handle_request<R>(stream: &mut R, deadline: Duration) -> Result<Request, SessionError>
where
    R: AsyncRead + Unpin,
{
    let request: Request = read_message(stream, deadline).await?;
    debug!(
        "Received REQUEST: rounds={}, name={:?}",
        request.num_rounds, request.client_name
    );
    Ok(request)
}
