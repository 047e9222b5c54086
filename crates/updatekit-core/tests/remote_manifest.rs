use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use updatekit_core::{
    ApplicationDeployment, CancellationToken, NetworkError, UpdateChecker, UpdateError,
    UpdateLauncher, UpdateLocation, Version,
};

fn manifest_xml(version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<asmv1:assembly manifestVersion="1.0" xmlns:asmv1="urn:schemas-microsoft-com:asm.v1" xmlns="urn:schemas-microsoft-com:asm.v2">
  <asmv1:assemblyIdentity name="Contoso.application" version="{version}" publicKeyToken="0000000000000000" language="neutral" processorArchitecture="msil" />
  <deployment install="true" mapFileExtensions="true" />
</asmv1:assembly>"#
    )
}

async fn serve(status: &'static str, body: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => request.extend_from_slice(&chunk[..read]),
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/x-ms-application\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn checker(current: &str, location: &str) -> UpdateChecker<HashMap<String, String>> {
    let vars = HashMap::from([
        ("ClickOnce_IsNetworkDeployed".to_string(), "true".to_string()),
        ("ClickOnce_CurrentVersion".to_string(), current.to_string()),
        ("ClickOnce_UpdateLocation".to_string(), location.to_string()),
    ]);
    let deployment = ApplicationDeployment::detect(vars).expect("deployment should be detected");
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    UpdateChecker::new(Arc::new(deployment), client)
}

#[tokio::test]
async fn web_manifest_with_newer_version_reports_update() {
    let addr = serve("200 OK", manifest_xml("1.2.0.0")).await;
    let checker = checker("1.0.0.0", &format!("http://{addr}/Contoso.application"));

    let found = checker
        .check_for_update(&CancellationToken::new())
        .await
        .expect("remote check should succeed");

    assert!(found);
    assert!(checker.is_update_available());
    assert_eq!(checker.available_version(), Some(Version::new(1, 2, 0, 0)));
    assert!(matches!(
        checker.deployment().update_location(),
        Some(UpdateLocation::Web(_))
    ));
}

#[tokio::test]
async fn web_manifest_with_older_version_reports_no_update() {
    let addr = serve("200 OK", manifest_xml("1.9.9.9")).await;
    let checker = checker("2.0.0.0", &format!("http://{addr}/Contoso.application"));

    let found = checker
        .check_for_update(&CancellationToken::new())
        .await
        .expect("remote check should succeed");

    assert!(!found);
    assert!(!checker.is_update_available());
}

#[tokio::test]
async fn http_error_status_is_a_network_error() {
    let addr = serve("404 Not Found", "no such deployment".to_string()).await;
    let checker = checker("1.0.0.0", &format!("http://{addr}/Contoso.application"));

    let error = checker
        .check_for_update(&CancellationToken::new())
        .await
        .expect_err("404 should fail the check");

    match error {
        UpdateError::Network(NetworkError::HttpStatus {
            status,
            body_snippet,
            ..
        }) => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            assert_eq!(body_snippet, ": no such deployment");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    drop(listener);

    let checker = checker("1.0.0.0", &format!("http://{addr}/Contoso.application"));
    let error = checker
        .check_for_update(&CancellationToken::new())
        .await
        .expect_err("closed port should fail the check");

    assert!(matches!(
        error,
        UpdateError::Network(NetworkError::Request { .. })
    ));
}

#[tokio::test]
async fn cancelled_remote_check_keeps_previous_state() {
    let addr = serve("200 OK", manifest_xml("1.2.0.0")).await;
    let checker = checker("1.0.0.0", &format!("http://{addr}/Contoso.application"));
    let before = checker.state();

    let token = CancellationToken::new();
    token.cancel();
    let error = checker
        .check_for_update(&token)
        .await
        .expect_err("cancelled check should fail");

    assert!(matches!(error, UpdateError::Cancelled));
    assert_eq!(checker.state(), before);
}

#[tokio::test]
async fn web_update_cannot_be_launched() {
    let addr = serve("200 OK", manifest_xml("1.2.0.0")).await;
    let checker = Arc::new(checker(
        "1.0.0.0",
        &format!("http://{addr}/Contoso.application"),
    ));
    assert!(
        checker
            .check_for_update(&CancellationToken::new())
            .await
            .expect("remote check should succeed")
    );

    let launcher = UpdateLauncher::new(Arc::clone(&checker));

    assert!(matches!(
        launcher.launch(),
        Err(UpdateError::NotSupported { .. })
    ));
}
