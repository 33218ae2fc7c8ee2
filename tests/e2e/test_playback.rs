use crate::e2e::helpers;

use helpers::{wait_for_playback, TestContext};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_start_idle(ctx: &TestContext) {
    let response = ctx.client.get("/api/playback").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("/queue"), json!({ "state": "idle" }));
    assert_eq!(response.field("/autoplay"), false);
    assert_eq!(response.field("/active_section"), Value::Null);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_refuse_to_play_section_without_audio(ctx: &TestContext) {
    ctx.load_sample().await;

    ctx.client
        .post_empty("/api/playback/0/play")
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_a_single_active_section(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.generate(1).await;

    let first = ctx.client.post_empty("/api/playback/0/play").await.unwrap();
    first.assert_status(StatusCode::OK);
    assert_eq!(first.field("/active_section"), 0);

    let second = ctx.client.post_empty("/api/playback/1/play").await.unwrap();
    assert_eq!(second.field("/active_section"), 1);
    assert_eq!(second.field("/autoplay"), false);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_auto_advance_to_next_section(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.client
        .post_empty("/api/playback/0/play")
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let ended = ctx.client.post_empty("/api/playback/0/ended").await.unwrap();
    ended.assert_status(StatusCode::OK);
    assert_eq!(ended.field("/queue"), json!({ "state": "waiting", "next": 1 }));

    let status = wait_for_playback(&ctx.client, |body| body["active_section"] == 1).await;
    assert_eq!(status["active_section"], 1);
    assert_eq!(status["autoplay"], true);
    assert_eq!(status["queue"], json!({ "state": "idle" }));

    // The next section was generated on the way
    let section = ctx.client.get("/api/sections/1").await.unwrap();
    assert_eq!(section.field("/status"), "ready");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_halt_queue_when_next_section_fails(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.speech.fail_on("Second");

    ctx.client
        .post_empty("/api/playback/0/ended")
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let status =
        wait_for_playback(&ctx.client, |body| body["queue"]["state"] == "halted").await;
    assert_eq!(status["queue"]["state"], "halted");
    assert_eq!(status["queue"]["section"], 1);
    assert!(status["notice"]
        .as_str()
        .unwrap()
        .contains("No audio payload returned"));
    assert_eq!(status["active_section"], Value::Null);

    let section = ctx.client.get("/api/sections/1").await.unwrap();
    assert_eq!(section.field("/status"), "error");

    // No automatic retry
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ctx.speech.voices().len(), 2);

    let dismissed = ctx.client.delete("/api/playback/notice").await.unwrap();
    dismissed.assert_status(StatusCode::OK);
    assert_eq!(dismissed.field("/notice"), Value::Null);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_advance_when_auto_next_is_off(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;
    ctx.client
        .patch("/api/settings", &json!({ "auto_next": false }))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let ended = ctx.client.post_empty("/api/playback/0/ended").await.unwrap();
    assert_eq!(ended.field("/queue"), json!({ "state": "idle" }));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let section = ctx.client.get("/api/sections/1").await.unwrap();
    assert_eq!(section.field("/status"), "pending");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_cancel_pending_advance_on_reset(ctx: &TestContext) {
    ctx.load_sample().await;
    ctx.generate(0).await;

    ctx.client
        .post_empty("/api/playback/0/ended")
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    ctx.client
        .delete("/api/session")
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = ctx.client.get("/api/playback").await.unwrap();
    assert_eq!(status.field("/queue"), json!({ "state": "idle" }));
    assert_eq!(status.field("/active_section"), Value::Null);
    assert_eq!(ctx.speech.voices().len(), 1);
}
