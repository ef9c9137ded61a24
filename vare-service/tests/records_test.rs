//! Persistence tests. Run against a scratch PostgreSQL:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;

fn seqs(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["order_seq"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn create_record_stores_children_in_order() {
    let app = common::spawn_app().await;

    let stored = app.post_record(&common::sample_submission()).await;

    assert!(stored["id"].as_i64().unwrap() > 0);
    assert_eq!(stored["category"], "커리어");
    assert_eq!(stored["succ_description"], "자신 있게 팀을 이끄는 모습");
    assert_eq!(stored["fail_description"], "기회를 계속 놓치는 모습");

    assert_eq!(seqs(&stored["todos"]), vec![1, 2]);
    assert_eq!(seqs(&stored["reasons"]), vec![1, 2, 3, 4]);
    assert_eq!(seqs(&stored["actions"]), vec![1, 2]);

    assert_eq!(stored["todos"][1]["todo_text"], "회의에서 한 번 이상 발언");
    assert_eq!(stored["todos"][1]["todo_category"], "실전");
    assert_eq!(stored["todos"][0]["is_completed"], false);
    assert_eq!(stored["reasons"][0]["percent"], 40);
    assert_eq!(stored["actions"][0]["action_desc"], "스터디에서 5분 발표");
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn create_record_truncates_mismatched_pairs() {
    let app = common::spawn_app().await;

    let mut submission = common::sample_submission();
    submission["succ"]["todo_cata"] = json!(["연습"]);
    submission["fail"]["percent"] = json!([60, 40]);
    submission["fail"]["action_desc"] = json!([]);

    let stored = app.post_record(&submission).await;

    assert_eq!(seqs(&stored["todos"]), vec![1]);
    assert_eq!(seqs(&stored["reasons"]), vec![1, 2]);
    assert!(stored["actions"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn get_record_round_trips_and_404s() {
    let app = common::spawn_app().await;
    let stored = app.post_record(&common::sample_submission()).await;
    let id = stored["id"].as_i64().unwrap();

    let response = app
        .client
        .get(app.url(&format!("/db/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.unwrap();
    assert_eq!(fetched, stored);

    let response = app
        .client
        .get(app.url(&format!("/db/{}", id + 1000)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "해당 기록을 찾을 수 없습니다.");
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn latest_is_404_when_empty() {
    let app = common::spawn_app().await;

    let response = app.client.get(app.url("/db/latest")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "저장된 기록이 없습니다.");
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn latest_returns_three_newest() {
    let app = common::spawn_app().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let mut submission = common::sample_submission();
        submission["title"] = json!(format!("기록 {}", i));
        ids.push(app.post_record(&submission).await["id"].as_i64().unwrap());
    }

    let latest: Vec<Value> = app
        .client
        .get(app.url("/db/latest"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let latest_ids: Vec<i64> = latest.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(latest_ids, vec![ids[4], ids[3], ids[2]]);
    assert_eq!(latest[0]["reasons"].as_array().unwrap().len(), 4);
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn list_pages_newest_first() {
    let app = common::spawn_app().await;

    for i in 0..12 {
        let mut submission = common::sample_submission();
        submission["title"] = json!(format!("기록 {}", i));
        app.post_record(&submission).await;
    }

    let first: Vec<Value> = app
        .client
        .get(app.url("/db/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[0]["title"], "기록 11");

    let rest: Vec<Value> = app
        .client
        .get(app.url("/db/?skip=10&limit=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[1]["title"], "기록 0");
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn list_is_empty_not_404() {
    let app = common::spawn_app().await;

    let response = app.client.get(app.url("/db/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn delete_removes_record_and_children() {
    let app = common::spawn_app().await;
    let stored = app.post_record(&common::sample_submission()).await;
    let id = stored["id"].as_i64().unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/db/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for table in ["vare_todos", "vare_reasons", "vare_actions"] {
        let (remaining,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {} WHERE vare_id = $1", table))
                .bind(id)
                .fetch_one(app.db.pool())
                .await
                .unwrap();
        assert_eq!(remaining, 0, "{} still holds rows for record {}", table, id);
    }

    let response = app
        .client
        .delete(app.url(&format!("/db/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
#[ignore = "Requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn toggling_todo_touches_parent() {
    let app = common::spawn_app().await;
    let stored = app.post_record(&common::sample_submission()).await;
    let todo_id = stored["todos"][0]["id"].as_i64().unwrap();

    let response = app
        .client
        .patch(app.url(&format!("/db/todos/{}", todo_id)))
        .json(&json!({"is_completed": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let todo: Value = response.json().await.unwrap();
    assert_eq!(todo["is_completed"], true);

    let fetched: Value = app
        .client
        .get(app.url(&format!("/db/{}", stored["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["todos"][0]["is_completed"], true);
    assert_eq!(fetched["todos"][1]["is_completed"], false);
    assert_ne!(fetched["updated_at"], stored["updated_at"]);

    let response = app
        .client
        .patch(app.url("/db/todos/999999"))
        .json(&json!({"is_completed": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
