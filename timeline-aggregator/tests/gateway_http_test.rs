use std::sync::{Arc, Mutex, Once};
use timeline_aggregator::{types::*, FeedGateway, GatewayClient, TimelineAggregator, AccountRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

const ALICE_FEED: &str = r#"{
    "version": "https://jsonfeed.org/version/1.1",
    "title": "Twitter @alice",
    "items": [
        {
            "id": "https://x.com/alice/status/2",
            "url": "https://x.com/alice/status/2",
            "title": "Re @bob thanks",
            "content_html": "↩️ Re @bob thanks",
            "date_published": "2024-12-02T10:00:00.000Z",
            "authors": [{"name": "Alice", "url": "https://x.com/alice", "avatar": "https://pbs.twimg.com/profile_images/1/alice_normal.jpg"}]
        },
        {
            "id": "https://x.com/alice/status/1",
            "url": "https://x.com/alice/status/1",
            "title": "shipped",
            "content_html": "shipped<br><img src=\"https://pbs.twimg.com/media/x.jpg\">",
            "date_published": "2024-12-01T10:00:00.000Z",
            "authors": [{"name": "Alice", "url": "https://x.com/alice", "avatar": "https://pbs.twimg.com/profile_images/1/alice_normal.jpg"}]
        }
    ]
}"#;

/// Serves canned responses keyed by a path fragment; records request lines.
async fn spawn_gateway(routes: Vec<(&'static str, u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request).to_string();
                let request_line = head.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push(request_line.clone());

                let (status, body) = routes
                    .iter()
                    .find(|(fragment, _, _)| request_line.contains(fragment))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((404, "not found"));
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), seen)
}

fn client(base_url: &str) -> GatewayClient {
    GatewayClient::new(&GatewayConfig {
        base_url: base_url.to_string(),
        ..GatewayConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_decodes_json_feed() -> Result<()> {
    init_tracing();

    let (base_url, seen) = spawn_gateway(vec![("/twitter/user/alice/", 200, ALICE_FEED)]).await;
    let payload = client(&base_url).fetch(&Source::user("alice")).await?;

    assert_eq!(payload.items.len(), 2);
    assert_eq!(payload.items[1].authors[0].name, "Alice");

    let requests = seen.lock().unwrap().clone();
    info!("Gateway saw: {:?}", requests);
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /twitter/user/alice/readable=1&includeRts=0&excludeReplies=1"));
    assert!(requests[0].contains("?format=json"));
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_is_gateway_error() {
    init_tracing();

    let (base_url, _) = spawn_gateway(vec![("/twitter/user/", 503, "{}")]).await;
    let err = client(&base_url).fetch(&Source::user("alice")).await.unwrap_err();

    match err {
        AggregatorError::Gateway { identifier, cause } => {
            assert_eq!(identifier, "alice");
            assert_eq!(cause, GatewayFailure::Status(503));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_gateway_error() {
    init_tracing();

    let (base_url, _) = spawn_gateway(vec![("/twitter/list/", 200, "<rss>not json</rss>")]).await;
    let err = client(&base_url)
        .fetch(&Source::list("mylist", "42"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AggregatorError::Gateway { ref identifier, cause: GatewayFailure::Decode(_) } if identifier == "mylist"
    ));
}

#[tokio::test]
async fn test_connection_refused_is_gateway_error() {
    init_tracing();

    // Grab a free port, then close it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .fetch(&Source::user("alice"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::Gateway { cause: GatewayFailure::Transport(_), .. }
    ));
}

#[tokio::test]
async fn test_end_to_end_over_http() -> Result<()> {
    init_tracing();

    let (base_url, seen) = spawn_gateway(vec![
        ("/twitter/list/1863684093000749519/", 200, r#"{"items": []}"#),
        ("/twitter/user/alice/", 200, ALICE_FEED),
    ])
    .await;

    let config = TimelineConfig {
        gateway: GatewayConfig {
            base_url,
            ..GatewayConfig::default()
        },
        full_size_avatars: true,
        ..TimelineConfig::default()
    };
    let registry = AccountRegistry::new(vec![
        Source::list("mylist", "1863684093000749519").with_display(None, Some("/home.svg")),
        Source::user("alice"),
    ]);
    let gateway = Arc::new(GatewayClient::new(&config.gateway)?);
    let aggregator = TimelineAggregator::new(registry, gateway, &config);

    let timeline = aggregator.aggregate(Some("alice")).await?;

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(timeline.active.len(), 1);
    assert_eq!(timeline.active[0].id, "https://x.com/alice/status/1");
    assert!(timeline.active[0].content_markup.contains("<img"));
    assert_eq!(
        timeline.sidebar[1].avatar_url.as_deref(),
        Some("https://pbs.twimg.com/profile_images/1/alice.jpg")
    );
    assert_eq!(timeline.sidebar[0].avatar_url.as_deref(), Some("/home.svg"));
    Ok(())
}
