use crm_rust::config::ClientOptions;
use crm_rust::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCOPE: &str = "co-1";

fn setup_crm(server_uri: &str) -> Crm {
    let _ = pretty_env_logger::try_init();
    let options = ClientOptions::default()
        .with_request_timeout(Some(Duration::from_secs(5)))
        .with_reconcile_delay(Duration::from_millis(10));
    Crm::new_with_options(server_uri, "test-token", options).unwrap()
}

fn leads_page(ids: &[&str]) -> Value {
    let leads: Vec<Value> = ids
        .iter()
        .map(|id| json!({"_id": id, "name": format!("Lead {}", id), "status": "new"}))
        .collect();
    json!({
        "success": true,
        "result": {
            "leads": leads,
            "totalCount": ids.len(),
            "currentPage": 1,
            "totalPages": 1
        }
    })
}

fn ids(store: &ResourceStore<Lead>) -> Vec<String> {
    store.items().into_iter().map(|lead| lead.id).collect()
}

#[tokio::test]
async fn test_bulk_delete_reconciles_with_server() {
    let server = MockServer::start().await;
    let crm = setup_crm(&server.uri());

    Mock::given(method("GET"))
        .and(path("/leads"))
        .and(query_param("companyId", SCOPE))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(leads_page(&["a", "b", "c"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(leads_page(&["c"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/leads/bulk-delete"))
        .and(body_json(json!({"ids": ["a", "b"], "companyId": SCOPE})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let leads = crm.leads();
    leads.fetch_collection(SCOPE, ListQuery::new(1, 10)).await.unwrap();
    assert_eq!(ids(leads), vec!["a", "b", "c"]);

    leads
        .bulk_delete(&["a".to_string(), "b".to_string()], SCOPE)
        .await
        .unwrap();
    assert_eq!(ids(leads), vec!["c"]);
    assert_eq!(leads.snapshot().collection.total_count, 1);

    leads.settle().await;
    assert_eq!(ids(leads), vec!["c"]);
    assert!(leads.error().is_none());
}

#[tokio::test]
async fn test_rejected_bulk_delete_refetches_with_prior_filters() {
    let server = MockServer::start().await;
    let crm = setup_crm(&server.uri());

    Mock::given(method("GET"))
        .and(path("/leads"))
        .and(query_param("companyId", SCOPE))
        .and(query_param("status", "new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(leads_page(&["a", "b", "c"])))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/leads/bulk-delete"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "message": "Only admins can bulk delete leads"
        })))
        .mount(&server)
        .await;

    let leads = crm.leads();
    leads
        .fetch_collection(SCOPE, ListQuery::new(1, 10).filter("status", "new"))
        .await
        .unwrap();

    let result = leads.bulk_delete(&["a".to_string()], SCOPE).await;

    assert_eq!(
        result,
        Err(StoreError::Validation("Only admins can bulk delete leads".to_string()))
    );
    assert_eq!(ids(leads), vec!["a", "b", "c"]);
    assert_eq!(
        leads.error().as_deref(),
        Some("Only admins can bulk delete leads")
    );
}

#[tokio::test]
async fn test_task_detail_and_owner_lookup() {
    let server = MockServer::start().await;
    let crm = setup_crm(&server.uri());

    Mock::given(method("GET"))
        .and(path("/tasks/t1"))
        .and(query_param("companyId", SCOPE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"data": {"_id": "t1", "title": "Call back", "assignedTo": "u1"}}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "u1", "name": "Sam Ortiz", "email": "sam@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    crm.tasks().fetch_item("t1", SCOPE).await.unwrap();
    let task = crm.tasks().current().unwrap();
    assert_eq!(task.title, "Call back");

    let directory = crm.directory();
    assert_eq!(
        directory.resolve_owner(&task, SCOPE).await.as_deref(),
        Some("Sam Ortiz")
    );
    assert_eq!(directory.label("u1").as_deref(), Some("Sam Ortiz"));
}

#[tokio::test]
async fn test_navigate_resets_every_store() {
    let server = MockServer::start().await;
    let crm = setup_crm(&server.uri());

    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(leads_page(&["a", "b"])))
        .mount(&server)
        .await;

    crm.leads().fetch_collection(SCOPE, ListQuery::default()).await.unwrap();
    crm.leads().set_selected(["a"]);
    crm.navigate();

    assert!(crm.leads().selected_ids().is_empty());
    assert_eq!(ids(crm.leads()), vec!["a", "b"]);
}
