mod common;

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;

use cms_api_rust::populate::{DryRunApi, HttpApi, PopulateError, Populator};
use cms_api_rust::seed::parse_seed;

const SEED: &str = r##"# Acme Corp

## METADATA

client_name: Acme Corp
domain: acme.test
contact_email: hello@acme.test

## GLOBAL STYLES

```json
{ "primaryColor": "#0044ff" }
```

## PAGES

### PAGE: Home

```
title: Home
slug: home
path: /
```

**BLOCK 1: Hero**

```
block_type: hero
order: 1
CONTENT:
{ "title": "Welcome", "ctaText": "Start" }
```

**BLOCK 2: Footer**

```
block_type: footer
order: 2
CONTENT:
{ "copyright": "Acme" }
```

---
"##;

fn http_api(server: &common::TestServer, token: &str) -> Result<HttpApi> {
    Ok(HttpApi::new(&server.base_url, token, Duration::from_secs(5))?)
}

#[tokio::test]
async fn populates_application_pages_and_blocks() -> Result<()> {
    let server = common::start_server().await?;
    let doc = parse_seed(SEED)?;
    let api = http_api(&server, common::TOKEN)?;

    let report = Populator::new(&api).run(&doc).await?;
    assert!(report.is_success());
    assert!(!report.dry_run);
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.blocks_created, 2);

    let (status, body) = server
        .get(&format!("/api/applications/{}?status=draft", report.application_id))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme Corp");
    assert_eq!(body["data"]["contactEmail"], "hello@acme.test");
    assert_eq!(body["data"]["globalStyles"]["primaryColor"], "#0044ff");

    // Nothing is published without --publish
    let (_, site) = server.get("/api/applications/domain/acme.test").await?;
    assert_eq!(site["data"]["pages"], serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn rerun_reuses_existing_records() -> Result<()> {
    let server = common::start_server().await?;
    let doc = parse_seed(SEED)?;
    let api = http_api(&server, common::TOKEN)?;

    let first = Populator::new(&api).run(&doc).await?;
    let second = Populator::new(&api).run(&doc).await?;

    assert!(second.is_success());
    assert!(second.application_reused);
    assert_eq!(second.application_id, first.application_id);
    assert_eq!(second.pages, first.pages);
    assert_eq!(second.pages_reused, 1);
    assert_eq!(second.blocks_created, 0);
    assert_eq!(second.blocks_reused, 2);

    let (_, blocks) = server.get("/api/content-blocks").await?;
    assert_eq!(blocks["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn publish_flag_makes_the_site_visible() -> Result<()> {
    let server = common::start_server().await?;
    let doc = parse_seed(SEED)?;
    let api = http_api(&server, common::TOKEN)?;

    Populator::new(&api).with_publish(true).run(&doc).await?;

    let (status, body) = server.get("/api/applications/domain/acme.test/page").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["page"]["title"], "Home");
    let blocks = body["data"]["page"]["contentBlocks"].as_array().cloned().unwrap_or_default();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["content"]["title"], "Welcome");
    Ok(())
}

#[tokio::test]
async fn bad_token_fails_the_application() -> Result<()> {
    let server = common::start_server().await?;
    let doc = parse_seed(SEED)?;
    let api = http_api(&server, "wrong")?;

    let err = Populator::new(&api).run(&doc).await.unwrap_err();
    assert!(matches!(err, PopulateError::Status { status: 401, .. }));
    Ok(())
}

#[tokio::test]
async fn dry_run_touches_nothing() -> Result<()> {
    let server = common::start_server().await?;
    let doc = parse_seed(SEED)?;

    let report = Populator::new(&DryRunApi::new()).with_publish(true).run(&doc).await?;
    assert!(report.dry_run);
    assert_eq!(report.application_id, 1);
    assert_eq!(report.pages, vec![("Home".to_string(), 1)]);
    assert_eq!(report.blocks_created, 2);

    let (_, body) = server.get("/api/applications?status=draft").await?;
    assert_eq!(body["data"], serde_json::json!([]));
    Ok(())
}
