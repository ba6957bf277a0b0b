//! Integration tests for the download flow.

mod helpers;

use http::StatusCode;

use porter_bagit::{Bag, extract_zip, validate};

#[tokio::test]
async fn test_download_produces_valid_bag() {
    let app = helpers::TestApp::new();
    app.seed_source_project();
    let headers = [("porter-token", "alice-token")];

    let created = app
        .request(
            "POST",
            "/api/targets/src/resources/project/download",
            None,
            &headers,
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();
    assert_eq!(
        created.body["job_link"].as_str().expect("job link"),
        format!("/api/jobs/{ticket}")
    );

    let done = app.poll_until_terminal(&ticket, &headers).await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["message"], "Download successful.");
    assert_eq!(done.body["percent_complete"], 100);
    assert_eq!(done.body["result"]["failed_fixity"], serde_json::json!([]));

    let artifact = app
        .send(
            "GET",
            &format!("/api/jobs/{ticket}/download"),
            &headers,
            None,
            Vec::new(),
        )
        .await;
    assert_eq!(artifact.status, StatusCode::OK);

    // The served zip must be a valid bag.
    let tmp = tempfile::tempdir().expect("tempdir");
    let zip_path = tmp.path().join("bag.zip");
    std::fs::write(&zip_path, &artifact.raw).expect("write zip");
    let extracted = tmp.path().join("extracted");
    extract_zip(&zip_path, &extracted).expect("extract");
    let bag = Bag::open(&extracted).expect("open bag");
    let report = validate(&bag).expect("validate");
    assert!(report.is_valid(), "issues: {:?}", report.issues);
    assert!(bag.data_dir().join("project/readme.txt").is_file());
}

#[tokio::test]
async fn test_download_missing_resource_fails_with_target_code() {
    let app = helpers::TestApp::new();
    let headers = [("porter-token", "alice-token")];

    let created = app
        .request(
            "POST",
            "/api/targets/src/resources/missing/download",
            None,
            &headers,
        )
        .await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();

    let done = app.poll_until_terminal(&ticket, &headers).await;
    assert_eq!(done.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(done.body["status"], "failed");
    assert_eq!(done.body["status_code"], 404);
}

#[tokio::test]
async fn test_unknown_target_is_rejected_synchronously() {
    let app = helpers::TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/targets/nowhere/resources/project/download",
            None,
            &[("porter-token", "alice-token")],
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = helpers::TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/targets/src/resources/project/download",
            None,
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_artifact_requires_finished_download() {
    let app = helpers::TestApp::new();
    app.seed_source_project();
    let headers = [("porter-token", "alice-token")];

    let created = app
        .request(
            "POST",
            "/api/targets/src/resources/project/download",
            None,
            &headers,
        )
        .await;
    let ticket = created.body["ticket_number"].as_str().expect("ticket").to_string();
    app.poll_until_terminal(&ticket, &headers).await;

    // Wrong token cannot fetch the artifact.
    let response = app
        .send(
            "GET",
            &format!("/api/jobs/{ticket}/download"),
            &[("porter-token", "wrong")],
            None,
            Vec::new(),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
