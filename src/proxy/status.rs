//! Status relay: one request/response exchange plus ping/pong.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::status::{is_ping, read_status_response, PING_FRAME_LEN, PONG, STATUS_REQUEST};
use crate::protocol::Handshake;
use crate::proxy::session::SessionError;
use crate::resilience::{within, Stage, Timeouts};

/// Relay a status probe between `client` and `backend`.
///
/// The handshake goes to the backend verbatim, followed by the status
/// request. The backend's response (length prefix included) is forwarded to
/// the client unchanged. A well-formed ping is then answered with a fixed
/// pong; anything else ends the exchange with no reply.
pub async fn relay<C, B>(
    client: &mut C,
    backend: &mut B,
    handshake: &Handshake,
    timeouts: &Timeouts,
) -> Result<(), SessionError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let limit = timeouts.for_stage(Stage::Status);

    let mut request =
        Vec::with_capacity(handshake.header().len() + handshake.payload().len() + STATUS_REQUEST.len());
    request.extend_from_slice(handshake.header());
    request.extend_from_slice(handshake.payload());
    request.extend_from_slice(&STATUS_REQUEST);
    within(Stage::Status, limit, backend.write_all(&request)).await??;

    let response = within(Stage::Status, limit, read_status_response(backend))
        .await??
        .ok_or(SessionError::MalformedStatus)?;
    within(Stage::Status, limit, client.write_all(&response.to_bytes())).await??;

    let mut ping = [0u8; PING_FRAME_LEN];
    within(Stage::Status, limit, client.read_exact(&mut ping)).await??;
    if !is_ping(&ping) {
        return Err(SessionError::BadPing);
    }

    within(Stage::Status, limit, client.write_all(&PONG)).await??;
    within(Stage::Status, limit, client.flush()).await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::status::PING_TAG;
    use tokio::io::{duplex, DuplexStream};

    fn status_handshake() -> Handshake {
        let host = b"play.example.com";
        let header = [(host.len() + 7) as u8, 0x00, 0xFB, 0x05, host.len() as u8];
        let mut payload = host.to_vec();
        payload.extend_from_slice(&[0x63, 0xDD, 0x01]);
        Handshake::parse(header, payload).unwrap()
    }

    /// Backend that checks the request and answers with `response`.
    async fn fake_backend(mut stream: DuplexStream, expected: Vec<u8>, response: Vec<u8>) {
        let mut request = vec![0u8; expected.len()];
        stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request, expected);
        stream.write_all(&response).await.unwrap();
    }

    fn expected_request(handshake: &Handshake) -> Vec<u8> {
        let mut bytes = handshake.header().to_vec();
        bytes.extend_from_slice(handshake.payload());
        bytes.extend_from_slice(&STATUS_REQUEST);
        bytes
    }

    #[tokio::test]
    async fn forwards_response_and_answers_ping() {
        let handshake = status_handshake();
        let body = br#"{"version":{"name":"1.20.1","protocol":763}}"#;
        let mut response = vec![body.len() as u8];
        response.extend_from_slice(body);

        let (mut proxy_client, mut client) = duplex(1024);
        let (mut proxy_backend, backend) = duplex(1024);
        let backend_task = tokio::spawn(fake_backend(backend, expected_request(&handshake), response.clone()));

        let mut ping = PING_TAG.to_vec();
        ping.extend_from_slice(&[0xAA; 8]);
        client.write_all(&ping).await.unwrap();

        relay(&mut proxy_client, &mut proxy_backend, &handshake, &Timeouts::default())
            .await
            .unwrap();
        backend_task.await.unwrap();
        drop(proxy_client);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        let mut expected = response;
        expected.extend_from_slice(&PONG);
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn two_byte_length_prefix_is_forwarded_verbatim() {
        let handshake = status_handshake();
        let body = vec![b'{'; 300];
        let mut response = vec![0xAC, 0x02];
        response.extend_from_slice(&body);

        let (mut proxy_client, mut client) = duplex(4096);
        let (mut proxy_backend, backend) = duplex(4096);
        tokio::spawn(fake_backend(backend, expected_request(&handshake), response.clone()));

        client.write_all(&[0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 1]).await.unwrap();
        relay(&mut proxy_client, &mut proxy_backend, &handshake, &Timeouts::default())
            .await
            .unwrap();
        drop(proxy_client);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..response.len()], &response[..]);
    }

    #[tokio::test]
    async fn bad_ping_gets_no_pong() {
        let handshake = status_handshake();
        let response = b"\x02{}".to_vec();

        let (mut proxy_client, mut client) = duplex(1024);
        let (mut proxy_backend, backend) = duplex(1024);
        tokio::spawn(fake_backend(backend, expected_request(&handshake), response.clone()));

        client.write_all(&[0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]).await.unwrap();
        let err = relay(&mut proxy_client, &mut proxy_backend, &handshake, &Timeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BadPing));
        drop(proxy_client);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, response);
    }

    #[tokio::test]
    async fn overlong_length_prefix_is_malformed() {
        let handshake = status_handshake();
        let (mut proxy_client, _client) = duplex(1024);
        let (mut proxy_backend, backend) = duplex(1024);
        tokio::spawn(fake_backend(backend, expected_request(&handshake), vec![0x80, 0x80, 0x80, 0x01]));

        let err = relay(&mut proxy_client, &mut proxy_backend, &handshake, &Timeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MalformedStatus));
    }

    #[tokio::test]
    async fn backend_closing_early_is_an_io_error() {
        let handshake = status_handshake();
        let (mut proxy_client, _client) = duplex(1024);
        let (mut proxy_backend, backend) = duplex(1024);
        // Announces 16 bytes, sends 3, then hangs up.
        tokio::spawn(fake_backend(backend, expected_request(&handshake), b"\x10abc".to_vec()));

        let err = relay(&mut proxy_client, &mut proxy_backend, &handshake, &Timeouts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
