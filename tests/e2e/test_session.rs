use crate::e2e::helpers;

use helpers::{spawn_app, FakeSpeech, TestContext, MAX_UPLOAD_BYTES, SAMPLE_TEXT};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_split_uploaded_file_into_pending_sections(ctx: &TestContext) {
    let response = ctx
        .client
        .post_bytes("/api/session?file_name=novel.txt", SAMPLE_TEXT.as_bytes())
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.field("/file_name"), "novel.txt");
    assert_eq!(response.field("/section_count"), 3);
    assert_eq!(response.field("/sections/0/content"), "First sentence here.");
    assert_eq!(response.field("/sections/1/content"), "Second one follows.");
    assert_eq!(response.field("/sections/2/content"), "Third closes it.");
    for index in 0..3 {
        assert_eq!(
            response.field(&format!("/sections/{}/status", index)),
            "pending"
        );
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_upload(ctx: &TestContext) {
    let response = ctx
        .client
        .post_bytes("/api/session?file_name=empty.txt", b"")
        .await
        .unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);

    // Nothing was loaded
    ctx.client
        .get("/api/session")
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_playback_when_upload_is_rejected(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.client
        .post_empty("/api/playback/0/play")
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    ctx.client
        .post_bytes("/api/session?file_name=empty.txt", b"")
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST);

    let status = ctx.client.get("/api/playback").await.unwrap();
    assert_eq!(status.field("/active_section"), 0);

    // The loaded document is untouched too
    let session = ctx.client.get("/api/session").await.unwrap();
    assert_eq!(session.field("/file_name"), "novel.txt");
    assert_eq!(session.field("/sections/0/status"), "ready");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_upload_over_size_limit(ctx: &TestContext) {
    let oversized = vec![b'a'; MAX_UPLOAD_BYTES + 1];

    let response = ctx
        .client
        .post_bytes("/api/session?file_name=big.txt", &oversized)
        .await
        .unwrap();

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    ctx.client
        .get("/api/session")
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_whitespace_only_upload(ctx: &TestContext) {
    let response = ctx
        .client
        .post_bytes("/api/session?file_name=blank.txt", b" \n\t \n")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("file is empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_decode_euc_kr_files(ctx: &TestContext) {
    let text = "안녕하세요. 반갑습니다.";
    let (encoded, _, had_errors) = encoding_rs::EUC_KR.encode(text);
    assert!(!had_errors);
    assert!(std::str::from_utf8(&encoded).is_err());

    let path = format!(
        "/api/session?file_name={}",
        urlencoding::encode("소설.txt")
    );
    let response = ctx.client.post_bytes(&path, &encoded).await.unwrap();

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.field("/file_name"), "소설.txt");
    assert_eq!(response.field("/sections/0/content"), text);

    let original = ctx.client.get("/api/session/text").await.unwrap();
    original.assert_status(StatusCode::OK).assert_header(
        "content-disposition",
        "attachment; filename*=UTF-8''%EC%86%8C%EC%84%A4.txt",
    );
    assert_eq!(String::from_utf8(original.body_bytes.clone()).unwrap(), text);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_only_the_base_file_name(ctx: &TestContext) {
    let path = format!(
        "/api/session?file_name={}",
        urlencoding::encode("../../etc/novel.txt")
    );
    let response = ctx
        .client
        .post_bytes(&path, SAMPLE_TEXT.as_bytes())
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.field("/file_name"), "novel.txt");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_require_file_name(ctx: &TestContext) {
    let response = ctx
        .client
        .post_bytes("/api/session", SAMPLE_TEXT.as_bytes())
        .await
        .unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reset_session_and_delete_saved_records(ctx: &TestContext) {
    ctx.load_sample().await;
    assert!(ctx.state_dir.path().join("reader-session.json").exists());

    ctx.client
        .delete("/api/session")
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);

    ctx.client
        .get("/api/session")
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    assert!(!ctx.state_dir.path().join("reader-session.json").exists());
    assert!(!ctx.state_dir.path().join("reader-view.json").exists());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_update_settings(ctx: &TestContext) {
    let response = ctx
        .client
        .patch(
            "/api/settings",
            &json!({ "voice": "Charon", "playback_rate": 1.5, "auto_next": false }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("/voice"), "Charon");
    assert_eq!(response.field("/playback_rate"), 1.5);
    assert_eq!(response.field("/auto_next"), false);

    let current = ctx.client.get("/api/settings").await.unwrap();
    assert_eq!(current.field("/voice"), "Charon");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_out_of_range_playback_rate(ctx: &TestContext) {
    let response = ctx
        .client
        .patch("/api/settings", &json!({ "playback_rate": 3.0 }))
        .await
        .unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);

    let current = ctx.client.get("/api/settings").await.unwrap();
    assert_eq!(current.field("/playback_rate"), 1.0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clamp_view_to_existing_pages(ctx: &TestContext) {
    ctx.load_sample().await;

    let response = ctx
        .client
        .patch("/api/view", &json!({ "current_page": 7, "page_size": 2 }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("/page_size"), 2);
    assert_eq!(response.field("/current_page"), 1);

    let view = ctx.client.get("/api/view").await.unwrap();
    assert_eq!(view.field("/current_page"), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_resume_point_after_progress(ctx: &TestContext) {
    ctx.load_sample().await;

    let response = ctx.client.get("/api/session/resume").await.unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.body, Some(serde_json::Value::Null));

    ctx.client
        .put(
            "/api/sections/1/progress",
            &json!({ "time_secs": 12.5, "percent": 40.0 }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx.client.get("/api/session/resume").await.unwrap();
    assert_eq!(response.field("/section_index"), 1);
    assert_eq!(response.field("/time_secs"), 12.5);
    assert_eq!(response.field("/progress"), 40.0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_restore_session_after_restart(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.client
        .patch("/api/settings", &json!({ "voice": "Zephyr" }))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    ctx.client
        .put(
            "/api/sections/0/progress",
            &json!({ "time_secs": 3.0, "percent": 75.0 }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let restarted = spawn_app(
        ctx.state_dir.path(),
        ctx.export_dir.path(),
        Arc::new(FakeSpeech::default()),
    )
    .await;

    let session = restarted.client.get("/api/session").await.unwrap();
    session.assert_status(StatusCode::OK);
    assert_eq!(session.field("/file_name"), "novel.txt");
    assert_eq!(session.field("/section_count"), 3);
    // Audio is never persisted
    assert_eq!(session.field("/sections/0/status"), "pending");
    assert_eq!(session.field("/sections/0/progress"), 75.0);
    assert_eq!(session.field("/settings/voice"), "Zephyr");

    let resume = restarted.client.get("/api/session/resume").await.unwrap();
    assert_eq!(resume.field("/section_index"), 0);
    assert_eq!(resume.field("/time_secs"), 3.0);
}
