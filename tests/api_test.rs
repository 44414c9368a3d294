mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use common::{Fixture, test_ledger};
use nummus::api::{AppState, router};
use nummus::application::LedgerService;
use nummus::notify::NotificationHub;
use serde_json::{Value, json};

struct Api {
    server: TestServer,
    fx: Fixture,
    _hub: NotificationHub,
}

async fn api() -> Result<Api> {
    let fx = test_ledger().await?;
    let hub = NotificationHub::start(fx.repo.clone());
    let ledger = Arc::new(LedgerService::new(
        fx.repo.clone(),
        hub.notifier(),
        fx.service.settings().clone(),
    ));
    let server = TestServer::new(router(AppState::new(ledger, hub.feed())))?;
    Ok(Api {
        server,
        fx,
        _hub: hub,
    })
}

impl Api {
    async fn deposit(&self, account: i64, amount: i64) -> Value {
        self.server
            .post("/transactions/depot")
            .json(&json!({ "amount": amount, "compteId": account, "agentId": self.fx.agent.id }))
            .await
            .json::<Value>()
    }
}

/// The hub stores notifications in the background; poll until they land.
async fn wait_for_inbox(fx: &Fixture, account_id: i64, expected: usize) -> Result<()> {
    for _ in 0..100 {
        if fx.service.notifications(account_id, false).await?.len() >= expected {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    anyhow::bail!("inbox never reached {} notifications", expected)
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let api = api().await?;

    let response = api.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_deposit_returns_created() -> Result<()> {
    let api = api().await?;

    let response = api
        .server
        .post("/transactions/depot")
        .json(&json!({ "amount": 1500, "compteId": api.fx.client.id, "agentId": api.fx.agent.id }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["solde"], 1500);
    assert_eq!(body["transaction"]["kind"], "DEPOSIT");
    assert_eq!(body["transaction"]["status"], "SUCCESS");
    assert_eq!(body["transaction"]["accountId"], api.fx.client.id);
    Ok(())
}

#[tokio::test]
async fn test_deposit_validation() -> Result<()> {
    let api = api().await?;

    let missing_amount = api
        .server
        .post("/transactions/depot")
        .json(&json!({ "compteId": api.fx.client.id, "agentId": api.fx.agent.id }))
        .await;
    assert_eq!(missing_amount.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing_amount.json::<Value>()["success"], false);

    let negative = api
        .server
        .post("/transactions/depot")
        .json(&json!({ "amount": -10, "compteId": api.fx.client.id, "agentId": api.fx.agent.id }))
        .await;
    assert_eq!(negative.status_code(), StatusCode::BAD_REQUEST);

    let unknown = api
        .server
        .post("/transactions/depot")
        .json(&json!({ "amount": 10, "compteId": 999, "agentId": api.fx.agent.id }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_withdraw_insufficient_balance_body() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.client.id, 300).await;

    let response = api
        .server
        .post("/transactions/retrait")
        .json(&json!({ "amount": 500, "compteId": api.fx.client.id, "agentId": api.fx.agent.id }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["soldeActuel"], 300);
    assert_eq!(body["montantDemande"], 500);
    assert!(body.get("frais").is_none());
    Ok(())
}

#[tokio::test]
async fn test_transfer_and_cancel() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.client.id, 1500).await;

    let response = api
        .server
        .post("/transferts")
        .json(&json!({
            "senderId": api.fx.client.id,
            "receiverId": api.fx.friend.id,
            "amount": 200
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["frais"], 1);
    assert_eq!(body["transfert"]["status"], "COMPLETED");
    let id = body["transfert"]["id"].as_i64().unwrap();

    let response = api.server.post(&format!("/transferts/{}/cancel", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["transfert"]["status"], "CANCELLED");

    let again = api.server.post(&format!("/transferts/{}/cancel", id)).await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);

    let wallet = api
        .server
        .get(&format!("/portefeuilles/{}", api.fx.client.id))
        .await
        .json::<Value>();
    assert_eq!(wallet["data"]["wallet"]["balance"], 1500);
    Ok(())
}

#[tokio::test]
async fn test_transfer_insufficient_balance_body() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.client.id, 1000).await;

    let response = api
        .server
        .post("/transferts")
        .json(&json!({
            "senderId": api.fx.client.id,
            "receiverId": api.fx.friend.id,
            "amount": 1000
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["soldeActuel"], 1000);
    assert_eq!(body["montantRequis"], 1005);
    assert_eq!(body["frais"], 5);
    Ok(())
}

#[tokio::test]
async fn test_payment_role_gate() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.agent.id, 1000).await;

    let response = api
        .server
        .post("/paiements")
        .json(&json!({
            "compteId": api.fx.agent.id,
            "operateurId": api.fx.operator.id,
            "amount": 100
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_payment_lookup() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.client.id, 1000).await;

    let created = api
        .server
        .post("/paiements")
        .json(&json!({
            "compteId": api.fx.client.id,
            "operateurId": api.fx.operator.id,
            "amount": 250
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let id = created.json::<Value>()["data"]["id"].as_i64().unwrap();

    let fetched = api.server.get(&format!("/paiements/{}", id)).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(fetched.json::<Value>()["data"]["amount"], 250);

    let missing = api.server.get("/paiements/9999").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_transfer_history_pagination() -> Result<()> {
    let api = api().await?;
    api.deposit(api.fx.client.id, 10_000).await;
    for amount in [100, 200, 300] {
        api.server
            .post("/transferts")
            .json(&json!({
                "senderId": api.fx.client.id,
                "receiverId": api.fx.friend.id,
                "amount": amount
            }))
            .await;
    }

    let response = api
        .server
        .get(&format!("/transferts/history/{}", api.fx.client.id))
        .add_query_param("page", 2)
        .add_query_param("limit", 2)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["transferts"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);
    assert_eq!(body["pagination"]["currentPage"], 2);

    let bad = api
        .server
        .get(&format!("/transferts/history/{}", api.fx.client.id))
        .add_query_param("limit", 500)
        .await;
    assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_cancel_transaction_reason_is_optional() -> Result<()> {
    let api = api().await?;
    let first = api.deposit(api.fx.client.id, 500).await;
    let second = api.deposit(api.fx.client.id, 300).await;
    let third = api.deposit(api.fx.client.id, 200).await;

    let blank = api
        .server
        .post(&format!("/transactions/annuler/{}", first["transaction"]["id"]))
        .json(&json!({ "reason": "   " }))
        .await;
    assert_eq!(blank.status_code(), StatusCode::OK);
    assert!(blank.json::<Value>()["transaction"]["cancelReason"].is_null());

    let no_body = api
        .server
        .post(&format!("/transactions/annuler/{}", second["transaction"]["id"]))
        .await;
    assert_eq!(no_body.status_code(), StatusCode::OK);
    assert_eq!(no_body.json::<Value>()["solde"], 200);

    let response = api
        .server
        .post(&format!("/transactions/annuler/{}", third["transaction"]["id"]))
        .json(&json!({ "reason": "wrong account" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["solde"], 0);
    assert_eq!(body["transaction"]["status"], "FAILED");
    assert_eq!(body["transaction"]["cancelReason"], "wrong account");
    Ok(())
}

#[tokio::test]
async fn test_oversized_amount_is_rejected() -> Result<()> {
    let api = api().await?;

    let deposit = api
        .server
        .post("/transactions/depot")
        .json(&json!({
            "amount": i64::MAX,
            "compteId": api.fx.client.id,
            "agentId": api.fx.agent.id
        }))
        .await;
    assert_eq!(deposit.status_code(), StatusCode::BAD_REQUEST);

    let transfer = api
        .server
        .post("/transferts")
        .json(&json!({
            "senderId": api.fx.client.id,
            "receiverId": api.fx.friend.id,
            "amount": i64::MAX
        }))
        .await;
    assert_eq!(transfer.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(transfer.json::<Value>()["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_notification_inbox_routes() -> Result<()> {
    let Api { server, fx, .. } = api().await?;
    let client = fx.client.id;
    let agent = fx.agent.id;
    for amount in [100, 200] {
        server
            .post("/transactions/depot")
            .json(&json!({ "amount": amount, "compteId": client, "agentId": agent }))
            .await;
    }

    wait_for_inbox(&fx, client, 2).await?;

    let listed = server.get(&format!("/notifications/{}", client)).await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    let items = listed.json::<Value>()["data"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    let first_id = items[0]["id"].as_i64().unwrap();

    let marked = server
        .put(&format!("/notifications/{}/read", first_id))
        .await;
    assert_eq!(marked.status_code(), StatusCode::OK);

    let unread = server
        .get(&format!("/notifications/{}", client))
        .add_query_param("unread", true)
        .await
        .json::<Value>();
    assert_eq!(unread["data"].as_array().unwrap().len(), 1);

    let all = server
        .put(&format!("/notifications/compte/{}/read-all", client))
        .await;
    assert_eq!(all.status_code(), StatusCode::OK);
    assert_eq!(all.json::<Value>()["message"], "1 notifications marked as read");

    let missing = server.put("/notifications/424242/read").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_notification_delete_routes() -> Result<()> {
    let Api { server, fx, .. } = api().await?;
    let client = fx.client.id;
    let agent = fx.agent.id;
    for amount in [100, 200, 300] {
        server
            .post("/transactions/depot")
            .json(&json!({ "amount": amount, "compteId": client, "agentId": agent }))
            .await;
    }

    wait_for_inbox(&fx, client, 3).await?;
    let inbox = fx.service.notifications(client, false).await?;

    let deleted = server.delete(&format!("/notifications/{}", inbox[0].id)).await;
    assert_eq!(deleted.status_code(), StatusCode::OK);
    assert_eq!(deleted.json::<Value>()["success"], true);

    let again = server.delete(&format!("/notifications/{}", inbox[0].id)).await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);

    server
        .put(&format!("/notifications/{}/read", inbox[1].id))
        .await;
    let purged = server
        .delete(&format!("/notifications/compte/{}/read", client))
        .await;
    assert_eq!(purged.status_code(), StatusCode::OK);
    assert_eq!(purged.json::<Value>()["message"], "1 read notifications deleted");

    let listed = server
        .get(&format!("/notifications/{}", client))
        .await
        .json::<Value>();
    let items = listed["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], inbox[2].id);
    Ok(())
}
