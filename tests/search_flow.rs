use breach_lookup_bot::bot::navigation::{render_page, resolve_download, CallbackAction};
use breach_lookup_bot::cache::{CacheError, QueryId, ReportCache};
use breach_lookup_bot::config::Settings;
use breach_lookup_bot::report::{ReportBuilder, ReportOutcome, NO_RESULTS};
use breach_lookup_bot::search::{SearchClient, SearchError, SearchProvider};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn settings_for(api_url: &str) -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        api_token: "test-token".to_string(),
        api_url: api_url.to_string(),
        limit: 100,
        lang: "en".to_string(),
        html_preamble_path: None,
        report_cache_ttl_secs: 60,
        report_cache_max_size: 100,
        search_http_timeout_secs: 5,
    }
}

fn builder_for(api_url: &str) -> Result<ReportBuilder, SearchError> {
    let settings = settings_for(api_url);
    Ok(ReportBuilder::new(
        Arc::new(SearchClient::new(&settings)?),
        ReportCache::new(60, 100),
    ))
}

#[tokio::test]
async fn single_database_query_yields_one_page() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::Json(json!({
            "token": "test-token",
            "request": "test@example.com",
            "limit": 100,
            "lang": "en"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"List": {"SiteA": {
                "InfoLeak": "Leak of 2020",
                "Data": [{"Email": "test@example.com", "Password": "123"}]
            }}})
            .to_string(),
        )
        .create_async()
        .await;

    let builder = builder_for(&server.url())?;
    let id = QueryId::new("q1");
    let report = builder.build("test@example.com", id.clone()).await;

    mock.assert_async().await;
    assert_eq!(report.outcome, ReportOutcome::Found);
    assert_eq!(report.page_count(), 1);
    assert!(report.pages[0].contains("<b>SiteA</b>"));
    assert!(report.pages[0].contains("Leak of 2020"));
    assert!(report.pages[0].contains("test@example.com"));
    assert!(report.pages[0].contains("123"));
    assert_eq!(report.full_export, "Email: test@example.com\nPassword: 123");

    let page = render_page(builder.cache(), &id, 0).await?;
    assert_eq!(page.text, report.pages[0]);
    assert_eq!(page.page_count, 1);
    Ok(())
}

#[tokio::test]
async fn api_error_code_becomes_single_page() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(json!({"Error code": "bad token"}).to_string())
        .create_async()
        .await;

    let builder = builder_for(&server.url())?;
    let id = QueryId::new("q2");
    let report = builder.build("x", id.clone()).await;

    assert_eq!(report.outcome, ReportOutcome::ApiError);
    assert_eq!(report.pages, vec!["⚠️ Error: bad token".to_string()]);
    assert_eq!(builder.cache().get_export(&id).await?, NO_RESULTS);
    Ok(())
}

#[tokio::test]
async fn non_json_server_error_is_reported() -> Result<(), SearchError> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let builder = builder_for(&server.url())?;
    let report = builder.build("x", QueryId::new("q3")).await;

    assert_eq!(report.outcome, ReportOutcome::RequestFailed);
    assert_eq!(report.page_count(), 1);
    assert!(report.pages[0].starts_with("⚠️ Request failed: "));
    assert!(report.pages[0].contains("500"));
    Ok(())
}

#[tokio::test]
async fn configured_timeout_is_applied() -> Result<(), SearchError> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body_from_request(|_| {
            std::thread::sleep(Duration::from_secs(3));
            b"{}".to_vec()
        })
        .create_async()
        .await;

    let settings = Settings {
        search_http_timeout_secs: 1,
        ..settings_for(&server.url())
    };
    let client = SearchClient::new(&settings)?;

    let started = Instant::now();
    let result = client.search("x").await;

    assert!(matches!(result, Err(SearchError::Network(_))));
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn unreachable_api_is_cached_as_failure_page() -> Result<(), Box<dyn std::error::Error>> {
    let builder = builder_for("http://127.0.0.1:1/")?;
    let id = QueryId::new("q4");
    let report = builder.build("x", id.clone()).await;

    assert_eq!(report.outcome, ReportOutcome::RequestFailed);
    assert!(report.pages[0].starts_with("⚠️ Request failed: "));

    // Failure pages are still navigable and downloadable
    let page = render_page(builder.cache(), &id, 0).await?;
    assert_eq!(page.text, report.pages[0]);
    assert!(resolve_download(builder.cache(), &id).await.is_some());
    Ok(())
}

#[tokio::test]
async fn two_databases_paginate_in_api_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(
            json!({"List": {
                "Zeta": {"InfoLeak": "z", "Data": [{"Email": "z@example.com"}]},
                "Alpha": {"InfoLeak": "a", "Data": [{"Email": "a@example.com"}]}
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let builder = builder_for(&server.url())?;
    let id = QueryId::new("q5");
    builder.build("x", id.clone()).await;

    let first = render_page(builder.cache(), &id, 0).await?;
    assert!(first.text.contains("<b>Zeta</b>"));
    assert_eq!(first.page_count, 2);

    let action = format!("page {id} 1").parse::<CallbackAction>()?;
    let CallbackAction::Page { id: parsed, index } = action else {
        return Err("expected a page action".into());
    };
    let second = render_page(builder.cache(), &parsed, index).await?;
    assert!(second.text.contains("<b>Alpha</b>"));
    assert_eq!(second.index, 1);

    // Requests past the end are clamped to the last page
    let clamped = render_page(builder.cache(), &id, 7).await?;
    assert_eq!(clamped.index, 1);

    let export = builder.cache().get_export(&id).await?;
    assert_eq!(export, "Email: z@example.com\nEmail: a@example.com");
    Ok(())
}

#[tokio::test]
async fn unknown_id_is_expired() {
    let cache = ReportCache::new(60, 100);
    let id = QueryId::new("999999");

    assert!(resolve_download(&cache, &id).await.is_none());
    assert_eq!(
        render_page(&cache, &id, 0).await,
        Err(CacheError::NotFound(id.clone()))
    );
}
