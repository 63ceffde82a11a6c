#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use danci_progress::persistence::{ProgressKeys, ProgressStore};
use danci_progress::state::AppState;
use danci_progress::storage::MemorySlotStore;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub slots: Arc<MemorySlotStore>,
}

pub fn create_test_app() -> TestApp {
    let slots = Arc::new(MemorySlotStore::new());
    let store = ProgressStore::new(slots.clone(), ProgressKeys::for_user("test"));
    let state = AppState::new(Arc::new(store), Duration::from_millis(1000));
    TestApp {
        router: danci_progress::create_app(state.clone()),
        state,
        slots,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request(Method::POST, uri, Some(body)).await
    }
}
