// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use circulation_core::application::{CatalogAdministration, PolicyEngine, TransactionOrchestrator};
use circulation_core::domain::catalog::{CatalogClient, CatalogError, CatalogScope, Credential};
use circulation_core::domain::config::CatalogConfig;
use circulation_core::domain::errors::{CirculationError, EntityKind};
use circulation_core::domain::ids::{ItemId, LoanId, PatronId};
use circulation_core::domain::item::{Item, ItemStatus};
use circulation_core::domain::clock::FixedClock;
use circulation_core::domain::loan::{default_loan_period, Loan, LOAN_PERIOD_SECS};
use circulation_core::domain::policy::{PolicyDefinition, PolicyStore};
use circulation_core::infrastructure::{EventBus, HttpCatalogClient, InMemoryPolicyStore};
use chrono::{DateTime, Utc};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn scope() -> CatalogScope {
    CatalogScope::new("hbz", Credential::new("aaaaa"))
}

fn client_for(server: &mockito::ServerGuard) -> HttpCatalogClient {
    HttpCatalogClient::new(server.url())
}

#[tokio::test]
async fn get_patron_sends_scope_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/patrons/p-1")
        .match_header("authorization", "aaaaa")
        .match_header("x-okapi-tenant", "hbz")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"p-1","status":"ACTIVE","type":"STAFF","name":"Ada"}"#)
        .create_async()
        .await;

    let patron = client_for(&server)
        .get_patron(&scope(), &PatronId::new("p-1"))
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(patron.status, "ACTIVE");
    assert_eq!(patron.patron_type, "STAFF");
    assert_eq!(patron.extra.get("name"), Some(&json!("Ada")));
}

#[tokio::test]
async fn missing_item_is_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/items/i-404")
        .with_status(404)
        .create_async()
        .await;

    let item = client_for(&server)
        .get_item(&scope(), &ItemId::new("i-404"))
        .await
        .unwrap();

    assert!(item.is_none());
}

#[tokio::test]
async fn server_error_on_lookup_is_unexpected_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-1/loans/l-1")
        .with_status(503)
        .create_async()
        .await;

    let err = client_for(&server)
        .get_loan(&scope(), &PatronId::new("p-1"), &LoanId::new("l-1"))
        .await
        .unwrap_err();

    assert_eq!(err, CatalogError::UnexpectedStatus { status: 503 });
}

#[tokio::test]
async fn create_loan_posts_to_patron_loans() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/patrons/p-1/loans/")
        .match_body(Matcher::PartialJson(json!({
            "patronId": "p-1",
            "itemId": "i-1",
            "itemBarcode": "0001",
            "renewCount": 0,
            "renewable": true
        })))
        .with_status(201)
        .with_body(r#"{"id":"l-7","patronId":"p-1","itemId":"i-1","dueDate":1701209600,"loanDate":1700000000}"#)
        .create_async()
        .await;

    let item = Item::new("i-1", "0001", "BOOK", ItemStatus::available());
    let draft = Loan::open(&PatronId::new("p-1"), &item, Utc::now(), default_loan_period());

    let created = client_for(&server)
        .create_loan(&scope(), &PatronId::new("p-1"), &draft)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, Some(LoanId::new("l-7")));
}

#[tokio::test]
async fn create_loan_with_empty_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/patrons/p-1/loans/")
        .with_status(201)
        .create_async()
        .await;

    let item = Item::new("i-1", "0001", "BOOK", ItemStatus::available());
    let draft = Loan::open(&PatronId::new("p-1"), &item, Utc::now(), default_loan_period());

    let err = client_for(&server)
        .create_loan(&scope(), &PatronId::new("p-1"), &draft)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Decode(_)));
}

#[tokio::test]
async fn update_item_requires_no_content() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/items/i-1")
        .with_status(500)
        .create_async()
        .await;

    let item = Item::new("i-1", "0001", "BOOK", ItemStatus::on_loan());
    let err = client_for(&server)
        .update_item(&scope(), &item.id, &item)
        .await
        .unwrap_err();

    assert_eq!(err, CatalogError::UnexpectedStatus { status: 500 });
}

#[tokio::test]
async fn list_loans_reads_envelope() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-1/loans")
        .with_status(200)
        .with_body(
            r#"{"loans":[
                {"id":"l-1","patronId":"p-1","itemId":"i-1","dueDate":1.7012096E9,"loanDate":1700000000},
                {"id":"l-2","patronId":"p-1","itemId":"i-2","dueDate":1701209600,"loanDate":1700000000}
            ]}"#,
        )
        .create_async()
        .await;

    let loans = client_for(&server)
        .list_loans(&scope(), &PatronId::new("p-1"))
        .await
        .unwrap();

    assert_eq!(loans.len(), 2);
    assert_eq!(loans[1].item_id, ItemId::new("i-2"));
}

#[tokio::test]
async fn configured_paths_are_used() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/members/p-1")
        .with_status(204)
        .create_async()
        .await;

    let config = CatalogConfig {
        endpoint: server.url(),
        patrons_path: "/api/members/".to_string(),
        ..CatalogConfig::default()
    };
    let client = HttpCatalogClient::from_config(&config).unwrap();

    client
        .delete_patron(&scope(), &PatronId::new("p-1"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_catalog_is_a_transport_error() {
    // port 9 (discard) is closed on test hosts
    let client = HttpCatalogClient::new("http://127.0.0.1:9");
    let err = client.list_items(&scope()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));
}

#[tokio::test]
async fn checkout_over_http() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-1")
        .with_status(200)
        .with_body(r#"{"id":"p-1","status":"ACTIVE","type":"STAFF"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/items/i-1")
        .with_status(200)
        .with_body(r#"{"id":"i-1","barcode":"0001","type":"BOOK","itemStatus":{"value":"AVAILABLE","desc":"ITEM_STATUS_AVAILABLE"}}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/patrons/p-1/loans/")
        .with_status(201)
        .with_body(r#"{"id":"l-1","patronId":"p-1","itemId":"i-1","dueDate":1701209600,"loanDate":1700000000}"#)
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/items/i-1")
        .match_body(Matcher::PartialJson(json!({
            "itemStatus": { "value": "ON_LOAN", "desc": "ITEM_STATUS_ON_LOAN" }
        })))
        .with_status(204)
        .create_async()
        .await;

    let store = Arc::new(InMemoryPolicyStore::new());
    store
        .add(PolicyDefinition::new("Staff books", "ACTIVE", "STAFF", "AVAILABLE", "BOOK"))
        .unwrap();
    let orchestrator = TransactionOrchestrator::new(
        Arc::new(client_for(&server)),
        PolicyEngine::new(store),
        Arc::new(EventBus::default()),
    );

    let outcome = orchestrator
        .checkout(&scope(), &PatronId::new("p-1"), &ItemId::new("i-1"))
        .await
        .unwrap();

    update.assert_async().await;
    assert_eq!(outcome.loan_id(), Some(&LoanId::new("l-1")));
    assert_eq!(outcome.item_status(), "ITEM_STATUS_ON_LOAN");
}

fn orchestrator_for(server: &mockito::ServerGuard) -> TransactionOrchestrator {
    TransactionOrchestrator::new(
        Arc::new(client_for(server)),
        PolicyEngine::new(Arc::new(InMemoryPolicyStore::new())),
        Arc::new(EventBus::default()),
    )
}

#[tokio::test]
async fn slash_in_id_does_not_reach_nested_resource() {
    let mut server = mockito::Server::new_async().await;
    let nested = server
        .mock("GET", "/patrons/p-1/loans/l-1")
        .with_status(200)
        .with_body(r#"{"id":"l-1","status":"ACTIVE","type":"STAFF"}"#)
        .expect(0)
        .create_async()
        .await;
    let encoded = server
        .mock("GET", "/patrons/p-1%2Floans%2Fl-1")
        .with_status(404)
        .create_async()
        .await;

    let patron = client_for(&server)
        .get_patron(&scope(), &PatronId::new("p-1/loans/l-1"))
        .await
        .unwrap();

    nested.assert_async().await;
    encoded.assert_async().await;
    assert!(patron.is_none());
}

#[tokio::test]
async fn dot_segment_ids_are_refused_before_sending() {
    let mut server = mockito::Server::new_async().await;
    let any = server
        .mock("DELETE", Matcher::Any)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let err = client_for(&server)
        .delete_loan(&scope(), &PatronId::new("p-1"), &LoanId::new(".."))
        .await
        .unwrap_err();

    any.assert_async().await;
    assert_eq!(err, CatalogError::InvalidIdentifier("..".to_string()));
}

#[tokio::test]
async fn traversal_loan_id_cannot_return_another_patrons_loan() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-2/loans/l-9")
        .with_status(200)
        .with_body(r#"{"id":"l-9","patronId":"p-2","itemId":"i-9","dueDate":1701209600,"loanDate":1700000000}"#)
        .create_async()
        .await;
    server
        .mock("GET", Matcher::Any)
        .with_status(404)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", Matcher::Any)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let err = orchestrator_for(&server)
        .return_item(&scope(), &PatronId::new("p-1"), &LoanId::new("../../p-2/loans/l-9"))
        .await
        .unwrap_err();

    delete.assert_async().await;
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn return_refuses_loan_owned_by_another_patron() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-1/loans/l-9")
        .with_status(200)
        .with_body(r#"{"id":"l-9","patronId":"p-2","itemId":"i-9","dueDate":1701209600,"loanDate":1700000000}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", Matcher::Any)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let err = orchestrator_for(&server)
        .return_item(&scope(), &PatronId::new("p-1"), &LoanId::new("l-9"))
        .await
        .unwrap_err();

    delete.assert_async().await;
    assert_eq!(err, CirculationError::not_found(EntityKind::Loan, "l-9"));
}

#[tokio::test]
async fn renew_refuses_loan_owned_by_another_patron() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/patrons/p-1")
        .with_status(200)
        .with_body(r#"{"id":"p-1","status":"ACTIVE","type":"STAFF"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/patrons/p-1/loans/l-9")
        .with_status(200)
        .with_body(r#"{"id":"l-9","patronId":"p-2","itemId":"i-9","dueDate":1701209600,"loanDate":1700000000}"#)
        .create_async()
        .await;
    let update = server
        .mock("PUT", Matcher::Any)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let err = orchestrator_for(&server)
        .renew(&scope(), &PatronId::new("p-1"), &LoanId::new("l-9"))
        .await
        .unwrap_err();

    update.assert_async().await;
    assert_eq!(err, CirculationError::not_found(EntityKind::Loan, "l-9"));
}

#[tokio::test]
async fn renew_puts_back_the_loan_with_only_a_new_due_date() {
    let mut server = mockito::Server::new_async().await;
    let received = json!({
        "patronId": "p-1",
        "itemId": "i-1",
        "dueDate": 1701209600,
        "loanDate": 1700000000.75,
        "renewCount": 1,
        "loanStatus": "open"
    });
    let mut expected = received.clone();
    expected["dueDate"] = json!(1_700_500_000 + LOAN_PERIOD_SECS);

    server
        .mock("GET", "/patrons/p-1")
        .with_status(200)
        .with_body(r#"{"id":"p-1","status":"ACTIVE","type":"STAFF"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/patrons/p-1/loans/l-1")
        .with_status(200)
        .with_body(received.to_string())
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/patrons/p-1/loans/l-1")
        .match_body(Matcher::Json(expected))
        .with_status(204)
        .create_async()
        .await;

    let renewal_time = DateTime::from_timestamp(1_700_500_000, 0).unwrap();
    let outcome = orchestrator_for(&server)
        .with_clock(Arc::new(FixedClock(renewal_time)))
        .renew(&scope(), &PatronId::new("p-1"), &LoanId::new("l-1"))
        .await
        .unwrap();

    update.assert_async().await;
    assert_eq!(outcome.loan.id, None);
    assert_eq!(outcome.loan.renewable, None);
}

#[tokio::test]
async fn empty_item_id_never_deletes_the_collection() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", Matcher::Any)
        .with_status(204)
        .expect(0)
        .create_async()
        .await;
    let admin = CatalogAdministration::new(Arc::new(client_for(&server)), Duration::from_secs(1));

    let err = admin.delete_item(&scope(), &ItemId::new("")).await.unwrap_err();

    delete.assert_async().await;
    assert!(matches!(err, CirculationError::Validation(_)));
}
