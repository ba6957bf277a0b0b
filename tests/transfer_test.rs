//! Integration tests for the transfer flow.

mod helpers;

use http::StatusCode;
use serde_json::json;

const TRANSFER_HEADERS: [(&str, &str); 2] = [
    ("porter-source-token", "alice-token"),
    ("porter-destination-token", "bob-token"),
];

#[tokio::test]
async fn test_transfer_moves_project_and_writes_provenance() {
    let app = helpers::TestApp::new();
    app.seed_source_project();

    let created = app
        .request(
            "POST",
            "/api/transfers",
            Some(json!({
                "source_target": "src",
                "source_resource_id": "project",
                "destination_target": "dst",
            })),
            &TRANSFER_HEADERS,
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();

    let done = app.poll_until_terminal(&ticket, &TRANSFER_HEADERS).await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["message"], "Transfer successful.");
    assert_eq!(done.body["download"]["status"], "finished");
    assert_eq!(done.body["upload"]["status"], "finished");

    let project_id = done.body["result"]["project_id"].as_str().expect("project id");
    let container = app.dest_root.join(project_id);
    assert!(container.join("project/readme.txt").is_file());
    assert!(container.join("project/docs/a.txt").is_file());

    let log: serde_json::Value = serde_json::from_slice(
        &std::fs::read(container.join("porter_fts_metadata.json")).expect("read log"),
    )
    .expect("parse log");
    let actions = log["actions"].as_array().expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["source_target"], "src");
    assert_eq!(actions[0]["destination_target"], "dst");
    assert_eq!(actions[0]["files_transferred"], 2);
}

#[tokio::test]
async fn test_flat_transfer_artifact_is_downloadable() {
    let app = helpers::TestApp::new();
    app.seed_source_project();

    let created = app
        .request(
            "POST",
            "/api/transfers",
            Some(json!({
                "source_target": "src",
                "source_resource_id": "project",
                "destination_target": "vault",
            })),
            &TRANSFER_HEADERS,
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();

    let done = app.poll_until_terminal(&ticket, &TRANSFER_HEADERS).await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["result"]["zip_name"], "bag.zip");

    let project_id = done.body["result"]["project_id"].as_str().expect("project id");
    assert!(app.vault_root.join(project_id).join("bag.zip").is_file());

    let artifact = app
        .request(
            "GET",
            &format!("/api/jobs/{ticket}/download"),
            None,
            &TRANSFER_HEADERS,
        )
        .await;
    assert_eq!(artifact.status, StatusCode::OK);
    // Zip local file header magic.
    assert_eq!(&artifact.raw[..2], b"PK");
}

#[tokio::test]
async fn test_nested_transfer_has_no_artifact() {
    let app = helpers::TestApp::new();
    app.seed_source_project();

    let created = app
        .request(
            "POST",
            "/api/transfers",
            Some(json!({
                "source_target": "src",
                "source_resource_id": "project",
                "destination_target": "dst",
            })),
            &TRANSFER_HEADERS,
        )
        .await;
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();
    app.poll_until_terminal(&ticket, &TRANSFER_HEADERS).await;

    let artifact = app
        .request(
            "GET",
            &format!("/api/jobs/{ticket}/download"),
            None,
            &TRANSFER_HEADERS,
        )
        .await;
    assert_eq!(artifact.status, StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn test_transfer_poll_requires_both_tokens() {
    let app = helpers::TestApp::new();
    app.seed_source_project();

    let created = app
        .request(
            "POST",
            "/api/transfers",
            Some(json!({
                "source_target": "src",
                "source_resource_id": "project",
                "destination_target": "dst",
            })),
            &TRANSFER_HEADERS,
        )
        .await;
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();
    app.poll_until_terminal(&ticket, &TRANSFER_HEADERS).await;

    let response = app
        .request(
            "GET",
            &format!("/api/jobs/{ticket}"),
            None,
            &[("porter-source-token", "alice-token")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            "GET",
            &format!("/api/jobs/{ticket}"),
            None,
            &[
                ("porter-source-token", "alice-token"),
                ("porter-destination-token", "wrong"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transfer_from_empty_resource_fails() {
    let app = helpers::TestApp::new();
    std::fs::create_dir_all(app.source_root.join("empty")).expect("mkdir");

    let created = app
        .request(
            "POST",
            "/api/transfers",
            Some(json!({
                "source_target": "src",
                "source_resource_id": "empty",
                "destination_target": "dst",
            })),
            &TRANSFER_HEADERS,
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();

    let done = app.poll_until_terminal(&ticket, &TRANSFER_HEADERS).await;
    assert_eq!(done.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(done.body["status_code"], 400);
    assert_eq!(done.body["download"]["status"], "failed");
}
