use parking_lot::Mutex;
use queue_autoscale_agent::Config;
use queue_autoscale_agent::sender::{ApiResponse, ReportParams, ReportingClient};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK";

/// HTTPS endpoint with a freshly generated self-signed certificate.
/// Answers every request with `200 OK` and records the raw request text.
struct SelfSignedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl SelfSignedServer {
    async fn start() -> Self {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();

        let server_cert = CertificateDer::from(cert.der().to_vec());
        let server_key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let server_config = rustls::ServerConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![server_cert], server_key)
        .unwrap();

        let acceptor = TlsAcceptor::from(Arc::new(server_config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    // Clients that reject the certificate fail the handshake here
                    let Ok(mut tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    if let Ok(request) = read_request(&mut tls).await {
                        recorded.lock().push(request);
                        let _ = tls.write_all(RESPONSE).await;
                        let _ = tls.shutdown().await;
                    }
                });
            }
        });

        Self { addr, requests }
    }

    fn base_url(&self) -> String {
        format!("https://127.0.0.1:{}/api/token", self.addr.port())
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// Reads one HTTP/1.1 request: headers plus a `content-length` body.
async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<String> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);

        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]);
            let body_len = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + body_len {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&data).into_owned())
}

fn client_for(api_base_url: String, dev_mode: bool) -> ReportingClient {
    let config = Config {
        api_base_url,
        dev_mode,
        request_timeout_secs: 2,
        ..Config::default()
    };
    ReportingClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_https_report_in_dev_mode_returns_success() {
    let server = SelfSignedServer::start().await;
    let client = client_for(server.base_url(), true);

    let result = client
        .report_metrics(&ReportParams::new("web.1", "1232"), "1700000000,11\n")
        .await;

    assert_eq!(result, ApiResponse::success("OK"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("POST /api/token/reports?dyno=web.1&pid=1232 HTTP/1.1\r\n"));
    assert!(requests[0].ends_with("\r\n\r\n1700000000,11\n"));
}

#[tokio::test]
async fn test_https_with_untrusted_certificate_is_service_unavailable() {
    let server = SelfSignedServer::start().await;
    let client = client_for(server.base_url(), false);

    let result = client
        .report_metrics(&ReportParams::new("web.1", "1232"), "1700000000,11\n")
        .await;

    assert_eq!(result.failure_message(), Some("503 - Service Unavailable"));
    assert!(server.requests().is_empty());
}
