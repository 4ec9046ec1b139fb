//! HTTP tests for /api/accounts

mod common;

use api::repositories::account_repository::is_unique_violation;
use api::repositories::AccountRepository;
use common::spawn_app;
use serde_json::json;
use shared::validation::AccountInput;

fn account(login: &str) -> serde_json::Value {
    json!({
        "broker": "ICMarkets",
        "server": "ICMarkets-Demo02",
        "login": login,
        "alias": "Gold scalper",
        "balance": 10000.0,
        "equity": 10250.5,
        "marginLevel": 850.0,
        "status": "connected",
    })
}

#[tokio::test]
async fn test_post_creates_then_updates_same_identity() {
    let app = spawn_app().await;
    let repo = AccountRepository::new(app.db.clone());

    let (status, body) = app.post("/api/accounts", &account("5012345")).await;
    assert_eq!(status, 201);
    assert_eq!(body["account"]["login"], "5012345");
    assert_eq!(body["account"]["marginLevel"], 850.0);
    let id = body["account"]["id"].as_i64().unwrap();

    let mut changed = account("5012345");
    changed["balance"] = json!(12000.0);
    let (status, body) = app.post("/api/accounts", &changed).await;
    assert_eq!(status, 200);
    assert_eq!(body["account"]["id"].as_i64().unwrap(), id);
    assert_eq!(body["account"]["balance"], 12000.0);

    assert_eq!(repo.count().await.unwrap(), 1);
    let actions = app.wait_for_audit(2).await;
    assert_eq!(actions, vec!["account_created", "account_updated"]);
}

#[tokio::test]
async fn test_repost_keeps_fields_the_payload_leaves_out() {
    let app = spawn_app().await;
    let (status, _) = app.post("/api/accounts", &account("5012345")).await;
    assert_eq!(status, 201);

    let (status, body) = app
        .post(
            "/api/accounts",
            &json!({
                "broker": "ICMarkets",
                "server": "ICMarkets-Demo02",
                "login": "5012345",
                "balance": 9000.0,
                "alias": null,
            }),
        )
        .await;

    assert_eq!(status, 200);
    let account = &body["account"];
    assert_eq!(account["balance"], 9000.0);
    assert_eq!(account["equity"], 10250.5);
    assert_eq!(account["marginLevel"], 850.0);
    assert_eq!(account["status"], "connected");
    assert_eq!(account["alias"], "Gold scalper");
}

#[tokio::test]
async fn test_second_insert_of_same_identity_hits_unique_index() {
    let app = spawn_app().await;
    let repo = AccountRepository::new(app.db.clone());
    let input = AccountInput::from_json(&account("6000")).unwrap();

    repo.insert(&input).await.unwrap();
    let err = repo.insert(&input).await.unwrap_err();

    assert!(is_unique_violation(&err));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_post_rejects_invalid_payload_without_writing() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/accounts",
            &json!({ "broker": "Exness", "server": "Exness-Real", "login": "50 12", "marginLevel": 20000 }),
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["login", "marginLevel"]);
    assert_eq!(AccountRepository::new(app.db.clone()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_post_rejects_malformed_json() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/api/accounts"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_limit_is_clamped_and_defaulted() {
    let app = spawn_app().await;
    for i in 0..55 {
        let (status, _) = app.post("/api/accounts", &account(&format!("70000{}", i))).await;
        assert_eq!(status, 201);
    }

    let (status, body) = app.get("/api/accounts?limit=100").await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 50);

    let (_, body) = app.get("/api/accounts?limit=abc").await;
    assert_eq!(body.as_array().unwrap().len(), 10);

    let (_, body) = app.get("/api/accounts?limit=50&offset=50").await;
    assert_eq!(body.as_array().unwrap().len(), 5);

    // newest first
    let (_, body) = app.get("/api/accounts?limit=1").await;
    assert_eq!(body[0]["login"], "7000054");
}

#[tokio::test]
async fn test_list_filters_and_search() {
    let app = spawn_app().await;
    app.post("/api/accounts", &account("1001")).await;
    app.post(
        "/api/accounts",
        &json!({ "broker": "Pepperstone", "server": "Pepperstone-Edge", "login": "2002", "alias": "swing" }),
    )
    .await;
    app.post(
        "/api/accounts",
        &json!({ "broker": "Pepperstone", "server": "Pepperstone-Live", "login": "3003", "status": "connected" }),
    )
    .await;

    let (_, body) = app.get("/api/accounts?broker=Pepperstone").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/accounts?broker=Pepperstone&status=connected").await;
    let logins: Vec<&str> = body.as_array().unwrap().iter().map(|a| a["login"].as_str().unwrap()).collect();
    assert_eq!(logins, vec!["3003"]);

    let (_, body) = app.get("/api/accounts?search=swing").await;
    assert_eq!(body[0]["login"], "2002");

    let (_, body) = app.get("/api/accounts?search=Demo02").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/accounts?status=paused").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_QUERY_PARAMS");
}

#[tokio::test]
async fn test_search_treats_wildcards_as_text() {
    let app = spawn_app().await;
    app.post("/api/accounts", &account("1001")).await;
    app.post("/api/accounts", &json!({ "broker": "Exness", "server": "Exness-Real", "login": "2002" }))
        .await;
    app.post(
        "/api/accounts",
        &json!({ "broker": "Exness", "server": "Exness-Real", "login": "3003", "alias": "swing_trader" }),
    )
    .await;

    let (status, body) = app.get("/api/accounts?search=_").await;
    assert_eq!(status, 200);
    let logins: Vec<&str> = body.as_array().unwrap().iter().map(|a| a["login"].as_str().unwrap()).collect();
    assert_eq!(logins, vec!["3003"]);

    let (_, body) = app.get("/api/accounts?search=%25").await;
    assert_eq!(body, json!([]));

    let (_, body) = app.get("/api/accounts?search=Real").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_put_rejects_non_numeric_id() {
    let app = spawn_app().await;

    let (status, body) = app.put("/api/accounts?id=abc", &json!({ "balance": 1.0 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_ID");

    let (status, body) = app.put("/api/accounts", &json!({ "balance": 1.0 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_ID");
}

#[tokio::test]
async fn test_put_applies_only_present_fields() {
    let app = spawn_app().await;
    let (_, created) = app.post("/api/accounts", &account("5012345")).await;
    let id = created["account"]["id"].as_i64().unwrap();
    app.wait_for_audit(1).await;

    let (status, body) = app
        .put(&format!("/api/accounts?id={}", id), &json!({ "balance": 9000.0, "status": "disconnected" }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["account"]["balance"], 9000.0);
    assert_eq!(body["account"]["status"], "disconnected");
    assert_eq!(body["account"]["equity"], 10250.5);
    assert_eq!(body["account"]["alias"], "Gold scalper");
    assert_eq!(body["changedFields"], json!(["balance", "status"]));

    let actions = app.wait_for_audit(4).await;
    assert_eq!(
        actions,
        vec!["account_created", "account_field_updated", "account_field_updated", "account_updated"]
    );
}

#[tokio::test]
async fn test_put_validation_and_not_found() {
    let app = spawn_app().await;

    let (status, body) = app.put("/api/accounts?id=999", &json!({ "balance": 5.0 })).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");

    let (status, body) = app.put("/api/accounts?id=999", &json!({ "balance": -5.0 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_put_identity_collision_is_a_conflict() {
    let app = spawn_app().await;
    app.post("/api/accounts", &account("1111")).await;
    let (_, second) = app.post("/api/accounts", &account("2222")).await;
    let id = second["account"]["id"].as_i64().unwrap();

    let (status, body) = app.put(&format!("/api/accounts?id={}", id), &json!({ "login": "1111" })).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "DUPLICATE_ACCOUNT");
}

#[tokio::test]
async fn test_delete_missing_account_deletes_nothing() {
    let app = spawn_app().await;
    app.post("/api/accounts", &account("5012345")).await;
    let repo = AccountRepository::new(app.db.clone());

    let (status, body) = app.delete("/api/accounts?id=4242").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");
    assert_eq!(repo.count().await.unwrap(), 1);

    let (status, body) = app.delete("/api/accounts?id=-1").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_ID");
}

#[tokio::test]
async fn test_delete_removes_account_and_audits() {
    let app = spawn_app().await;
    let (_, created) = app.post("/api/accounts", &account("5012345")).await;
    let id = created["account"]["id"].as_i64().unwrap();

    let (status, body) = app.delete(&format!("/api/accounts?id={}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(AccountRepository::new(app.db.clone()).count().await.unwrap(), 0);

    let actions = app.wait_for_audit(2).await;
    assert_eq!(actions.last().map(String::as_str), Some("account_deleted"));
}
