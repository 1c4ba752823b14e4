// ABOUTME: Integration tests for the SSH session state machine and reachability probe.
// ABOUTME: Uses local TCP listeners in place of real SSH servers.

use hoist::ssh::{
    Auth, Credentials, Error, ReachabilityOptions, RemoteShell, Session, SessionConfig,
    SessionState,
};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Listener that greets every connection with `banner` and keeps it open.
async fn greeting_server(banner: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(banner.as_bytes()).await;
            open.push(stream);
        }
    });
    port
}

fn quick(port: u16) -> ReachabilityOptions<'static> {
    ReachabilityOptions {
        port,
        timeout: Duration::from_millis(500),
        retry_interval: Duration::from_millis(20),
        grace_period: Duration::ZERO,
        on_retry: None,
    }
}

mod state {
    use super::*;

    #[test]
    fn new_session_is_disconnected() {
        let session = Session::new(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
        assert_eq!(session.command_timeout(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut session = Session::new(SessionConfig::default());
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn operations_require_a_connection() {
        let mut session = Session::new(SessionConfig::default());

        assert!(matches!(
            session.exec("echo hello").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            session.upload_content(b"x", "/tmp/x", None).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(session.mkdir("/opt/app").await, Err(Error::NotConnected)));
        assert!(!session.file_exists("/etc/hostname").await);
    }

    #[tokio::test]
    async fn silent_server_times_out_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });

        let config = SessionConfig::default().connect_timeout(Duration::from_millis(300));
        let mut session = Session::new(config);
        let credentials =
            Credentials::new("127.0.0.1", "root", Auth::Password("pw".to_string())).port(port);

        let err = session.connect(&credentials).await.unwrap_err();

        assert!(matches!(err, Error::ConnectTimeout { port: p, .. } if p == port));
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}

mod reachability {
    use super::*;

    #[tokio::test]
    async fn ssh_banner_counts_as_reachable() {
        let port = greeting_server("SSH-2.0-OpenSSH_9.6\r\n").await;

        Session::wait_for_ssh("127.0.0.1", &quick(port))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_banner_is_unreachable() {
        let port = greeting_server("220 smtp.example.com ESMTP\r\n").await;
        let reasons = Mutex::new(Vec::new());
        let on_retry = |_attempt: u32, reason: &str| {
            reasons.lock().unwrap().push(reason.to_string());
        };
        let options = ReachabilityOptions {
            on_retry: Some(&on_retry),
            ..quick(port)
        };

        let err = Session::wait_for_ssh("127.0.0.1", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unreachable { .. }));
        let reasons = reasons.lock().unwrap();
        assert!(!reasons.is_empty());
        assert!(reasons[0].contains("unexpected identification"));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Session::wait_for_ssh("127.0.0.1", &quick(port))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unreachable { port: p, .. } if p == port));
    }

    #[tokio::test]
    async fn trait_default_uses_the_probe() {
        let port = greeting_server("SSH-2.0-dropbear\n").await;
        let session = Session::new(SessionConfig::default());

        session
            .wait_reachable("127.0.0.1", &quick(port))
            .await
            .unwrap();
    }
}
