mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, location};
use serde_json::Value;

async fn active(app: &TestApp, cookie: &str) -> Vec<Value> {
    let response = app.get("/notes", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await.as_array().cloned().unwrap()
}

async fn completed(app: &TestApp, cookie: &str) -> Vec<Value> {
    let response = app.get("/completed_notes", Some(cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await.as_array().cloned().unwrap()
}

fn id_of(note: &Value) -> i64 {
    note["id"].as_i64().unwrap()
}

#[tokio::test]
async fn pages_redirect_anonymous_users() {
    let app = TestApp::new();
    for uri in ["/notes", "/completed_notes"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), Some("/login"));
    }

    let response = app.post_form("/notes", "content=x", None).await;
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn api_endpoints_answer_401_for_anonymous_users() {
    let app = TestApp::new();

    let response = app.get("/search_notes?q=x", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.post_form("/reminded/1", "", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_list_notes() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    let response = app
        .post_form(
            "/notes",
            "title=Dentist&content=Tuesday+morning&reminder_at=2025-04-01T09%3A00",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/notes"));

    app.post_form("/notes", "content=no+title", Some(&cookie))
        .await;

    let notes = active(&app, &cookie).await;
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0]["title"], "Untitled");
    assert_eq!(notes[1]["title"], "Dentist");
    assert_eq!(notes[1]["reminder_at"], "2025-04-01 09:00:00");
    assert_eq!(notes[1]["completed"], false);
    assert_eq!(notes[1]["attachments"], serde_json::json!([]));
}

#[tokio::test]
async fn blank_content_is_rejected() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    let response = app
        .post_form("/notes", "title=T&content=+++", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Note content cannot be empty"
    );
}

#[tokio::test]
async fn malformed_reminder_is_rejected() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    let response = app
        .post_form("/notes", "content=x&reminder_at=tomorrow", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_are_private() {
    let app = TestApp::new();
    let ana = app.login_as("ana").await;
    let bob = app.login_as("bob").await;

    app.post_form("/notes", "content=secret", Some(&ana)).await;
    let id = id_of(&active(&app, &ana).await[0]);

    assert!(active(&app, &bob).await.is_empty());

    let response = app
        .post_form(&format!("/edit/{id}"), "content=hijacked", Some(&bob))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post_form(&format!("/done/{id}"), "", Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(active(&app, &ana).await[0]["content"], "secret");
}

#[tokio::test]
async fn edit_complete_delete_lifecycle() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    app.post_form("/notes", "title=Draft&content=v1", Some(&cookie))
        .await;
    let id = id_of(&active(&app, &cookie).await[0]);

    let response = app
        .post_form(&format!("/edit/{id}"), "title=Final&content=v2", Some(&cookie))
        .await;
    assert_eq!(location(&response), Some("/notes"));
    let note = &active(&app, &cookie).await[0];
    assert_eq!(note["title"], "Final");
    assert_eq!(note["content"], "v2");

    // active notes cannot be deleted
    let response = app
        .post_form(&format!("/delete/{id}"), "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post_form(&format!("/done/{id}"), "", Some(&cookie)).await;
    assert_eq!(location(&response), Some("/notes"));
    assert!(active(&app, &cookie).await.is_empty());
    assert_eq!(completed(&app, &cookie).await.len(), 1);

    // completed notes cannot be edited
    let response = app
        .post_form(&format!("/edit/{id}"), "content=v3", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_form(&format!("/delete/{id}"), "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/completed_notes"));
    assert!(completed(&app, &cookie).await.is_empty());
}

#[tokio::test]
async fn search_filters_by_state_and_text() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    app.post_form("/notes", "title=Shopping&content=milk", Some(&cookie))
        .await;
    app.post_form("/notes", "title=Work&content=Milk+the+deadline", Some(&cookie))
        .await;
    app.post_form("/notes", "title=Other&content=bread", Some(&cookie))
        .await;

    let response = app.get("/search_notes?q=MILK", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let found = body_json(response).await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let work = found
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["title"] == "Work")
        .map(id_of)
        .unwrap();
    app.post_form(&format!("/done/{work}"), "", Some(&cookie))
        .await;

    let active_hits = body_json(app.get("/search_notes?q=milk", Some(&cookie)).await).await;
    assert_eq!(active_hits.as_array().unwrap().len(), 1);

    let completed_hits = body_json(
        app.get("/search_notes?q=milk&completed=True", Some(&cookie))
            .await,
    )
    .await;
    assert_eq!(completed_hits.as_array().unwrap().len(), 1);
    assert_eq!(completed_hits[0]["title"], "Work");

    let everything = body_json(app.get("/search_notes", Some(&cookie)).await).await;
    assert_eq!(everything.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    app.post_form("/notes", "content=100%25+done", Some(&cookie))
        .await;
    app.post_form("/notes", "content=plain", Some(&cookie)).await;

    let hits = body_json(app.get("/search_notes?q=%25", Some(&cookie)).await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["content"], "100% done");
}

#[tokio::test]
async fn mark_reminded_answers_no_content() {
    let app = TestApp::new();
    let cookie = app.login_as("ana").await;

    app.post_form(
        "/notes",
        "content=call&reminder_at=2000-01-01T00%3A00",
        Some(&cookie),
    )
    .await;
    let id = id_of(&active(&app, &cookie).await[0]);

    let response = app
        .post_form(&format!("/reminded/{id}"), "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(active(&app, &cookie).await[0]["reminder_sent"], true);

    let response = app
        .post_form("/reminded/424242", "", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
