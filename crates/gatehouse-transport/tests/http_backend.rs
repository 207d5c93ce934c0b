//! Integration tests for the HTTP backend.
//!
//! A tiny stub server on a random local port plays the backend. It answers
//! every request through a routing closure and records each request head so
//! tests can assert on paths, query strings and cookies.

#[cfg(feature = "http")]
mod http {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use gatehouse_protocol::Capability;
    use gatehouse_transport::{
        HttpBackend, HttpConfig, PermissionEndpoint, ProfileEndpoint, SessionEndpoint,
        TransportError,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Log = Arc<Mutex<Vec<String>>>;

    fn respond(status: &str, extra_headers: &[&str], body: &str) -> String {
        let mut out = format!("HTTP/1.1 {status}\r\n");
        for header in extra_headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("Content-Type: application/json\r\n");
        out.push_str(&format!("Content-Length: {}\r\n", body.len()));
        out.push_str("Connection: close\r\n\r\n");
        out.push_str(body);
        out
    }

    /// Starts the stub and returns its base URL plus the request log.
    async fn start_stub<F>(route: F) -> (String, Log)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        let log: Log = Arc::default();
        let route = Arc::new(route);

        let task_log = Arc::clone(&log);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let route = Arc::clone(&route);
                let log = Arc::clone(&task_log);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    // Read the head, then as much body as Content-Length says.
                    let head_end = loop {
                        let n = stream.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            break pos + 4;
                        }
                    };
                    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                    let content_length = head
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    while buf.len() < head_end + content_length {
                        let n = stream.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

                    let response = route(&head);
                    log.lock().unwrap().push(format!("{head}{body}"));
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("http://{addr}"), log)
    }

    fn backend(base_url: String) -> HttpBackend {
        HttpBackend::new(HttpConfig {
            base_url,
            timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        })
        .expect("backend should build")
    }

    #[tokio::test]
    async fn test_login_success_returns_evidence_from_cookies() {
        let (base, log) = start_stub(|head| {
            if head.starts_with("POST /api/method/login ") {
                respond(
                    "200 OK",
                    &[
                        "Set-Cookie: sid=s3cr3t; Path=/; HttpOnly",
                        "Set-Cookie: user_id=alice%40example.com; Path=/",
                    ],
                    r#"{"message": "Logged In", "full_name": "Alice"}"#,
                )
            } else {
                respond("404 Not Found", &[], "{}")
            }
        })
        .await;

        let response = backend(base)
            .login("alice@example.com", "hunter2")
            .await
            .expect("login should reach endpoint");

        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Logged In"));
        assert_eq!(response.evidence, "sid=s3cr3t; user_id=alice%40example.com");

        let requests = log.lock().unwrap();
        assert!(requests[0].contains(r#""usr":"alice@example.com""#));
        assert!(requests[0].contains(r#""pwd":"hunter2""#));
    }

    #[tokio::test]
    async fn test_login_unauthorized_is_unsuccessful_not_error() {
        let (base, _log) = start_stub(|_| {
            respond("401 Unauthorized", &[], r#"{"message": "Invalid Login. Try again."}"#)
        })
        .await;

        let response = backend(base)
            .login("alice@example.com", "wrong")
            .await
            .expect("rejection is not a transport error");

        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Invalid Login. Try again."));
        assert!(response.evidence.is_empty());
    }

    #[tokio::test]
    async fn test_login_server_error_is_status_error() {
        let (base, _log) = start_stub(|_| respond("500 Internal Server Error", &[], "{}")).await;

        let result = backend(base).login("alice@example.com", "pw").await;

        assert!(matches!(
            result,
            Err(TransportError::Status { endpoint: "login", status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_get_permissions_passes_identity_and_reuses_session_cookie() {
        let (base, log) = start_stub(|head| {
            if head.starts_with("POST /api/method/login ") {
                respond("200 OK", &["Set-Cookie: sid=abc; Path=/"], r#"{"message": "Logged In"}"#)
            } else {
                respond(
                    "200 OK",
                    &[],
                    r#"{"message": {"can_submit_invoice": true, "can_delete_invoice": false}}"#,
                )
            }
        })
        .await;
        let backend = backend(base);
        backend.login("alice@example.com", "pw").await.unwrap();

        let set = backend
            .get_permissions("alice@example.com")
            .await
            .expect("should fetch permissions");

        assert!(set.get(Capability::SubmitInvoice));
        assert!(!set.get(Capability::DeleteInvoice));

        let requests = log.lock().unwrap();
        let query = &requests[1];
        assert!(query.starts_with(
            "GET /api/method/invoice_form_vue.api.check_user_permission?user=alice%40example.com "
        ));
        assert!(query.to_ascii_lowercase().contains("cookie: sid=abc"));
    }

    #[tokio::test]
    async fn test_get_permissions_without_message_is_protocol_error() {
        let (base, _log) = start_stub(|_| respond("200 OK", &[], r#"{"exc": "Traceback"}"#)).await;

        let result = backend(base).get_permissions("alice@example.com").await;

        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_with_evidence_seeds_cookie_jar() {
        let (base, log) = start_stub(|_| respond("200 OK", &[], r#"{"message": "alice@example.com"}"#)).await;
        let backend = backend(base).with_evidence("sid=restored; user_id=alice%40example.com");

        let identity = backend.current_identity().await.expect("should answer");

        assert_eq!(identity.as_deref(), Some("alice@example.com"));
        let requests = log.lock().unwrap();
        assert!(requests[0].contains("sid=restored"));
    }

    #[tokio::test]
    async fn test_current_identity_forbidden_is_none() {
        let (base, _log) = start_stub(|_| respond("403 Forbidden", &[], "{}")).await;

        let identity = backend(base).current_identity().await.expect("should answer");

        assert_eq!(identity, None);
    }

    #[tokio::test]
    async fn test_profile_reads_language_from_user_document() {
        let (base, log) = start_stub(|_| {
            respond(
                "200 OK",
                &[],
                r#"{"data": {"name": "alice@example.com", "language": "ar", "full_name": "Alice"}}"#,
            )
        })
        .await;

        let profile = backend(base)
            .profile("alice@example.com")
            .await
            .expect("should fetch profile");

        assert_eq!(profile.preferred_locale.as_deref(), Some("ar"));
        assert_eq!(profile.full_name.as_deref(), Some("Alice"));
        assert!(log.lock().unwrap()[0].starts_with("GET /api/resource/User/alice%40example.com "));
    }

    #[tokio::test]
    async fn test_logout_non_success_is_error() {
        let (base, _log) = start_stub(|_| respond("502 Bad Gateway", &[], "")).await;

        let result = backend(base).logout().await;

        assert!(matches!(
            result,
            Err(TransportError::Status { endpoint: "logout", status: 502 })
        ));
    }
}
