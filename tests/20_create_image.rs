mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use image_analyzer::testing::{FailingImageMetadataRepo, MemoryImageMetadataRepo};

const GENERIC_DESCRIPTION: &str = "Something went wrong, please try again in some time.";

async fn post_image(
    server: &common::TestServer,
    user_id: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let mut request = reqwest::Client::new().post(server.url("/v1/images")).json(&body);
    if let Some(user_id) = user_id {
        request = request.header("x-user-id", user_id);
    }
    let res = request.send().await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn creates_initiated_image_for_user() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let (status, body) = post_image(&server, Some("u1"), json!({ "file_name": "cat.png" })).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].as_str().unwrap_or_default().starts_with("image_"));
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["filename"], "cat.png");
    assert_eq!(body["file_type"], "");
    assert_eq!(body["file_size"], 0);
    assert_eq!(body["width"], 0);
    assert_eq!(body["height"], 0);
    assert_eq!(body["status"], "INITIATED");
    assert_eq!(body["analysis_result"], "");
    assert_eq!(body["upload_url"], "");
    assert_eq!(body["download_url"], "");

    let stored = repo.records();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].public_id(), body["id"].as_str().unwrap_or_default());
    Ok(())
}

#[tokio::test]
async fn identical_requests_get_distinct_ids() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let (_, first) = post_image(&server, Some("u1"), json!({ "file_name": "cat.png" })).await?;
    let (_, second) = post_image(&server, Some("u1"), json!({ "file_name": "cat.png" })).await?;

    assert_ne!(first["id"], second["id"]);
    assert_eq!(repo.len(), 2);
    Ok(())
}

#[tokio::test]
async fn blank_file_name_is_rejected() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let (status, body) = post_image(&server, Some("u1"), json!({ "file_name": "" })).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "code": "bad_request_error", "description": "file_name: cannot be blank" })
    );
    assert!(repo.is_empty());
    Ok(())
}

#[tokio::test]
async fn overlong_file_name_is_rejected() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let (status, body) = post_image(&server, Some("u1"), json!({ "file_name": "x".repeat(256) })).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request_error");
    assert_eq!(body["description"], "file_name: the length must be between 1 and 255");
    assert!(repo.is_empty());

    let (status, _) = post_image(&server, Some("u1"), json!({ "file_name": "x".repeat(255) })).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let (status, body) = post_image(&server, None, json!({ "file_name": "cat.png" })).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "code": "unauthorized", "description": "unauthorized" }));
    assert!(repo.is_empty());
    Ok(())
}

#[tokio::test]
async fn persistence_failure_is_generic_500() -> Result<()> {
    let server = common::TestServer::spawn(Arc::new(FailingImageMetadataRepo)).await?;

    let (status, body) = post_image(&server, Some("u1"), json!({ "file_name": "cat.png" })).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "code": "server_error", "description": GENERIC_DESCRIPTION })
    );
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_500() -> Result<()> {
    let repo = MemoryImageMetadataRepo::new();
    let server = common::TestServer::spawn(Arc::new(repo.clone())).await?;

    let res = reqwest::Client::new()
        .post(server.url("/v1/images"))
        .header("x-user-id", "u1")
        .header("content-type", "application/json")
        .body("{\"file_name\":")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json::<Value>().await?["code"], "server_error");
    assert!(repo.is_empty());
    Ok(())
}
