mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect()
}

async fn two_tenants(server: &common::TestServer) -> Result<((i64, i64), (i64, i64))> {
    let acme = common::seed_site(server, "acme.test").await?;
    let globex = common::seed_site(server, "globex.test").await?;
    Ok((acme, globex))
}

#[tokio::test]
async fn query_parameter_scopes_pages() -> Result<()> {
    let server = common::start_server().await?;
    let ((acme, acme_page), _) = two_tenants(&server).await?;

    let (status, body) = server
        .get(&format!("/api/pages?status=draft&applicationId={}", acme))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![acme_page]);
    Ok(())
}

#[tokio::test]
async fn header_takes_precedence_over_query() -> Result<()> {
    let server = common::start_server().await?;
    let ((acme, _), (globex, globex_page)) = two_tenants(&server).await?;

    let (_, body) = server
        .get_with_header(
            &format!("/api/pages?status=draft&applicationId={}", acme),
            "x-application-id",
            &globex.to_string(),
        )
        .await?;
    assert_eq!(ids(&body), vec![globex_page]);
    Ok(())
}

#[tokio::test]
async fn blocks_are_scoped_through_their_page() -> Result<()> {
    let server = common::start_server().await?;
    let (_, (globex, _)) = two_tenants(&server).await?;

    let (_, all) = server.get("/api/content-blocks").await?;
    assert_eq!(ids(&all).len(), 4);

    let (_, scoped) = server
        .get(&format!("/api/content-blocks?applicationId={}", globex))
        .await?;
    assert_eq!(ids(&scoped).len(), 2);
    assert_eq!(scoped["meta"]["pagination"]["total"], json!(2));
    Ok(())
}

#[tokio::test]
async fn tenant_filter_merges_with_client_filters() -> Result<()> {
    let server = common::start_server().await?;
    let ((acme, _), (globex, _)) = two_tenants(&server).await?;

    let (_, body) = server
        .get(&format!("/api/pages?status=draft&filters[slug][$eq]=home&applicationId={}", globex))
        .await?;
    let rows = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["application"], json!(globex));
    assert_ne!(rows[0]["application"], json!(acme));
    Ok(())
}

#[tokio::test]
async fn tenant_management_is_not_filtered() -> Result<()> {
    let server = common::start_server().await?;
    let ((acme, _), _) = two_tenants(&server).await?;

    let (status, body) = server
        .get(&format!("/api/applications?status=draft&applicationId={}", acme))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body).len(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_tenant_leaves_reads_unscoped() -> Result<()> {
    let server = common::start_server().await?;
    two_tenants(&server).await?;

    let (_, body) = server.get("/api/pages?status=draft").await?;
    assert_eq!(ids(&body).len(), 2);
    Ok(())
}

#[tokio::test]
async fn reads_by_id_stay_inside_the_tenant() -> Result<()> {
    let server = common::start_server().await?;
    let ((acme, acme_page), (globex, globex_page)) = two_tenants(&server).await?;
    let (_, globex_blocks) = server
        .get(&format!("/api/content-blocks?applicationId={}", globex))
        .await?;
    let globex_block = ids(&globex_blocks)[0];

    let as_acme = acme.to_string();
    let (status, body) = server
        .get_with_header(&format!("/api/pages/{}?status=draft", globex_page), "x-application-id", &as_acme)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);

    let (status, _) = server
        .get_with_header(&format!("/api/content-blocks/{}", globex_block), "x-application-id", &as_acme)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees its own records
    let (status, body) = server
        .get_with_header(&format!("/api/pages/{}?status=draft", acme_page), "x-application-id", &as_acme)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], acme_page);

    let (status, _) = server
        .get(&format!("/api/content-blocks/{}?applicationId={}", globex_block, globex))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
