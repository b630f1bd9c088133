//! Store outage and malformed stored orders during writes.
//!
//! GREEN when:
//! - a write whose load or save failed is answered 503 and never reaches the
//!   store;
//! - a stored order that does not decode hides nothing else, and survives
//!   every later save unchanged.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use printshop_daemon::{desk::OrderDesk, routes, session::SessionGate, state::AppState};
use printshop_orders::OrderPolicy;
use printshop_store::{MemoryStore, StoreClient};
use serde_json::json;
use tower::ServiceExt;

fn make_state(mem: &MemoryStore) -> Arc<AppState> {
    let desk = OrderDesk::new(StoreClient::new(Arc::new(mem.clone())), OrderPolicy::default());
    let gate = SessionGate::new("outage-secret", "pw", Duration::from_secs(3600)).unwrap();
    Arc::new(AppState::new(desk, gate, true))
}

async fn post(st: &Arc<AppState>, uri: &str, form: &str, cookie: Option<&str>) -> StatusCode {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    routes::build_router(Arc::clone(st))
        .oneshot(b.body(Body::from(form.to_string())).unwrap())
        .await
        .unwrap()
        .status()
}

async fn get_json(st: &Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}

fn seeded() -> MemoryStore {
    MemoryStore::with_raw(json!({
        "orders": [{
            "id": "AAAA1111",
            "name": "Vase",
            "link": "http://example/vase",
            "color": "Red",
            "status": "Waiting for Approval",
            "print_price": "25"
        }],
        "settings": { "filaments": ["Red", "Blue"] }
    }))
}

#[tokio::test]
async fn writes_during_read_outage_never_reach_the_store() {
    let mem = seeded();
    let before = mem.raw();
    let st = make_state(&mem);
    let cookie = format!(
        "printshop_session={}",
        st.gate.issue(chrono::Utc::now().timestamp())
    );

    mem.set_fail_fetch(true);

    let status = post(&st, "/submit_order", "link=http%3A%2F%2Fexample%2Fm&color=Red", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        post(&st, "/approve_price/AAAA1111", "", None).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        post(&st, "/update_colors", "colors_list=Green", Some(&cookie)).await,
        StatusCode::SERVICE_UNAVAILABLE
    );

    assert_eq!(mem.replace_count(), 0);
    assert_eq!(mem.raw(), before);

    // once the store is back, the original order is intact and can proceed
    mem.set_fail_fetch(false);
    assert_eq!(post(&st, "/approve_price/AAAA1111", "", None).await, StatusCode::SEE_OTHER);
    assert_eq!(mem.raw()["orders"][0]["status"], "Approved");
    assert_eq!(mem.raw()["settings"]["filaments"], json!(["Red", "Blue"]));
}

#[tokio::test]
async fn failed_save_is_reported() {
    let mem = seeded();
    let before = mem.raw();
    let st = make_state(&mem);

    mem.set_fail_replace(true);
    assert_eq!(
        post(&st, "/approve_price/AAAA1111", "", None).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
    let (_, json) = get_json(&st, "/order/AAAA1111").await;
    assert_eq!(json["status"], "Waiting for Approval");
    assert_eq!(mem.raw(), before);
}

#[tokio::test]
async fn malformed_stored_order_does_not_empty_the_shop() {
    let mem = MemoryStore::with_raw(json!({
        "orders": [
            {
                "id": "GOOD0001",
                "link": "http://example/vase",
                "color": "Red",
                "status": "Printing"
            },
            {
                "id": "LEGACY01",
                "link": "http://example/old",
                "color": "Blue",
                "status": "Waiting for Approval",
                "print_price": "$25"
            }
        ],
        "settings": { "filaments": ["Red", "Blue"] }
    }));
    let legacy = mem.raw()["orders"][1].clone();
    let st = make_state(&mem);

    let (status, json) = get_json(&st, "/order/GOOD0001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Printing");
    let (_, json) = get_json(&st, "/").await;
    assert_eq!(json["filaments"], json!(["Red", "Blue"]));

    let resp = routes::build_router(Arc::clone(&st))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/submit_order")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("link=http%3A%2F%2Fexample%2Fnew&color=Blue"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let (status, json) = get_json(&st, &location).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Pending Quote");

    assert_eq!(mem.replace_count(), 1);
    let stored = mem.raw();
    let stored = stored["orders"].as_array().unwrap().clone();
    assert_eq!(stored.len(), 3);
    assert!(stored.contains(&legacy));

    // unreadable orders are not addressable, but they are not lost either
    assert_eq!(get_json(&st, "/order/LEGACY01").await.0, StatusCode::NOT_FOUND);
    assert!(mem.raw()["orders"].as_array().unwrap().contains(&legacy));
}
