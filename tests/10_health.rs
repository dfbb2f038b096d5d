mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::start_server().await?;
    let (status, body) = server.get("/_health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::start_server().await?;
    let (status, body) = server.get("/").await?;

    assert_eq!(status, StatusCode::OK);
    let collections = body["data"]["collections"].as_array().cloned().unwrap_or_default();
    assert!(collections.iter().any(|c| c == "pages"));
    assert!(!collections.iter().any(|c| c == "api-tokens"));
    Ok(())
}
