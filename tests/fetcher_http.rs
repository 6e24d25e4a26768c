// tests/fetcher_http.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;

use finance_news_relay::config::FetchSettings;
use finance_news_relay::ingest::{FeedFetcher, FeedSource, FetchError, FetchFeed};

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
  <item><title>First</title><link>https://n.test/1</link></item>
  <item><title>Second</title><link>https://n.test/2</link></item>
</channel></rss>"#;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fetch_settings() -> FetchSettings {
    FetchSettings {
        timeout: Duration::from_secs(5),
        retries: 2,
        retry_delay: Duration::from_millis(20),
        ..Default::default()
    }
}

#[tokio::test]
async fn retries_then_succeeds() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let app = Router::new().route(
        "/flaky",
        get(move || {
            let h = h.clone();
            async move {
                if h.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
                } else {
                    ([(header::CONTENT_TYPE, "application/rss+xml")], RSS).into_response()
                }
            }
        }),
    );
    let base = serve(app).await;

    let fetcher = FeedFetcher::new(&fetch_settings()).unwrap();
    let items = fetcher.fetch(&FeedSource::new(format!("{base}/flaky"))).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "First");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_give_empty_list() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let app = Router::new().route(
        "/gone",
        get(move || {
            let h = h.clone();
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                StatusCode::NOT_FOUND
            }
        }),
    );
    let base = serve(app).await;

    let fetcher = FeedFetcher::new(&fetch_settings()).unwrap();
    let url = format!("{base}/gone");
    assert!(matches!(
        fetcher.get_with_retries(&url).await,
        Err(FetchError::Status(s)) if s == StatusCode::NOT_FOUND
    ));
    assert!(fetcher.fetch(&FeedSource::new(url)).await.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn html_error_page_yields_no_items() {
    let app = Router::new().route(
        "/html",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "text/html")],
                "<!DOCTYPE html><html><body><h1>Maintenance</h1></body></html>",
            )
        }),
    );
    let base = serve(app).await;

    let fetcher = FeedFetcher::new(&fetch_settings()).unwrap();
    assert!(fetcher
        .fetch(&FeedSource::new(format!("{base}/html")))
        .await
        .is_empty());
}

#[tokio::test]
async fn sends_feed_accept_and_user_agent() {
    let seen: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
    let s = seen.clone();
    let app = Router::new().route(
        "/rss",
        get(move |headers: HeaderMap| {
            let s = s.clone();
            async move {
                let value = |k: header::HeaderName| {
                    headers
                        .get(k)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                *s.lock() = Some((value(header::ACCEPT), value(header::USER_AGENT)));
                RSS
            }
        }),
    );
    let base = serve(app).await;

    let fetcher = FeedFetcher::new(&fetch_settings()).unwrap();
    let items = fetcher.fetch(&FeedSource::new(format!("{base}/rss"))).await;
    assert_eq!(items.len(), 2);

    let (accept, ua) = seen.lock().clone().unwrap();
    assert!(accept.contains("application/rss+xml"));
    assert!(accept.contains("application/atom+xml"));
    assert!(ua.starts_with("finance-news-relay/"));
}

#[tokio::test]
async fn unreachable_host_gives_empty_list() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut cfg = fetch_settings();
    cfg.retries = 1;
    let fetcher = FeedFetcher::new(&cfg).unwrap();
    assert!(fetcher
        .fetch(&FeedSource::new(format!("http://{addr}/rss")))
        .await
        .is_empty());
}
