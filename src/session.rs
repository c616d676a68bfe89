//! One client session: read a command, dispatch it, reply, repeat.
//!
//! The loop ends when the client sends `Quit`, closes the stream between
//! messages, or triggers a fatal error. Range errors are answered with
//! `{Error, code}` and the loop continues; every other error is answered
//! the same way (when the socket still works) and then ends the session.

use crate::dispatcher::{Dispatcher, Outcome};
use dhm_core::{DhmError, DhmResult};
use dhm_proto::{Response, WireReader};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, warn};

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The client sent `Quit`.
    Quit,
    /// The client closed the stream between messages.
    Disconnected,
    /// A fatal error ended the session.
    Failed(DhmError),
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Quit => f.write_str("quit"),
            SessionOutcome::Disconnected => f.write_str("disconnected"),
            SessionOutcome::Failed(e) => write!(f, "failed [{}]: {}", e.code(), e),
        }
    }
}

/// Serve one client on `stream` until the session ends.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn run_session<S>(stream: S, peer: &str, dispatcher: &Dispatcher) -> SessionOutcome
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = WireReader::new(read_half);
    let mut handled: u64 = 0;

    let outcome = loop {
        let id = match reader.read_command().await {
            Ok(Some(id)) => id,
            Ok(None) => break SessionOutcome::Disconnected,
            Err(e) => break fail(&mut writer, e).await,
        };

        match dispatcher.dispatch(id, &mut reader).await {
            Ok(Outcome::Reply(response)) => {
                handled += 1;
                if let Err(e) = send(&mut writer, &response).await {
                    break SessionOutcome::Failed(e);
                }
            }
            Ok(Outcome::Quit) => break SessionOutcome::Quit,
            Err(e) if !e.is_fatal() => {
                debug!(command = format_args!("0x{:08x}", id), error = %e, "command rejected");
                if let Err(e) = send(&mut writer, &Response::error(e.code())).await {
                    break SessionOutcome::Failed(e);
                }
            }
            Err(e) => break fail(&mut writer, e).await,
        }
    };

    let _ = writer.shutdown().await;
    debug!(handled, %outcome, "session ended");
    outcome
}

async fn send<W>(writer: &mut W, response: &Response) -> DhmResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Best-effort `{Error, code}` before giving up on the session.
async fn fail<W>(writer: &mut W, error: DhmError) -> SessionOutcome
where
    W: AsyncWrite + Unpin,
{
    if error.wants_reply() {
        if let Err(e) = send(writer, &Response::error(error.code())).await {
            warn!(error = %e, "could not report session error");
        }
    }
    SessionOutcome::Failed(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhm_core::{Microscope, ResultCode};
    use dhm_driver_mock::MockDhm;
    use dhm_proto::{Command, Payload, Request};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tracing_test::traced_test;

    fn ready() -> Dispatcher {
        let dhm = MockDhm::builder().running().active_config(137).build();
        Dispatcher::new(Microscope::new(Arc::new(dhm)))
    }

    #[tokio::test]
    #[traced_test]
    async fn test_quit_ends_without_reply() {
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(&Request::new(Command::Quit).encode())
            .await
            .unwrap();

        let d = ready();
        let outcome = run_session(server, "test", &d).await;
        assert!(matches!(outcome, SessionOutcome::Quit));

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert!(logs_contain("session ended"));
    }

    #[tokio::test]
    async fn test_range_error_keeps_session() {
        let (mut client, server) = tokio::io::duplex(1024);
        let d = ready();
        let session = tokio::spawn(async move { run_session(server, "test", &d).await });

        let mut request = Request::with_arg(Command::SetCameraGain, Payload::Int32(-1))
            .encode()
            .to_vec();
        request.extend_from_slice(&Request::new(Command::GetVersion).encode());
        client.write_all(&request).await.unwrap();

        let mut buf = [0u8; 16];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[0..4], &Command::Error.code().to_le_bytes());
        assert_eq!(&buf[4..8], &ResultCode::GainUnderflow.code().to_le_bytes());
        assert_eq!(&buf[8..12], &Command::GetVersion.code().to_le_bytes());
        assert_eq!(&buf[12..16], &4i32.to_le_bytes());

        drop(client);
        assert!(matches!(
            session.await.unwrap(),
            SessionOutcome::Disconnected
        ));
    }

    #[tokio::test]
    async fn test_partial_command_id_is_reported_then_fatal() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&[0x5f, 0x95]).await.unwrap();
        client.shutdown().await.unwrap();

        let d = ready();
        let outcome = run_session(server, "test", &d).await;
        match outcome {
            SessionOutcome::Failed(e) => assert_eq!(e.code(), ResultCode::RecvIntSize),
            other => panic!("unexpected outcome {}", other),
        }

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, Response::error(ResultCode::RecvIntSize).encode().to_vec());
    }
}
