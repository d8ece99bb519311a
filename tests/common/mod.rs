#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use demo_bank_api::config::AppConfig;
use demo_bank_api::services::mailer::{Delivery, MailerError, OtpMailer};
use demo_bank_api::services::otp::{DeliveryPolicy, OtpService};
use demo_bank_api::store::RecordStore;
use demo_bank_api::AppState;

/// Captures every code it is asked to deliver
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// Most recent code sent to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to.eq_ignore_ascii_case(email))
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpMailer for RecordingMailer {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<Delivery, MailerError> {
        self.sent.lock().push((to.to_string(), code.to_string()));
        Ok(Delivery::Sent)
    }
}

/// Provider that is always down
pub struct FailingMailer;

#[async_trait]
impl OtpMailer for FailingMailer {
    async fn send_otp(
        &self,
        _to: &str,
        _code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<Delivery, MailerError> {
        Err(MailerError::Rejected {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<RecordStore>,
}

pub fn build_app(mailer: Arc<dyn OtpMailer>, policy: DeliveryPolicy, demo_mode: bool) -> TestApp {
    let store = Arc::new(RecordStore::in_memory());
    let config = AppConfig {
        demo_mode,
        delivery_policy: policy,
        ..AppConfig::default()
    };

    let state = AppState {
        store: store.clone(),
        otp: OtpService::new(mailer, policy),
        config: Arc::new(config),
    };

    TestApp {
        router: demo_bank_api::router(state),
        store,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    /// Create a user through the API and return its `data` payload
    pub async fn create_user(&self, email: &str) -> Value {
        let (status, json) = self
            .post(
                "/api/users/create",
                serde_json::json!({
                    "firstName": "Alice",
                    "lastName": "Smith",
                    "email": email,
                    "phone": "555-0100",
                    "dateOfBirth": "1990-05-15"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true, "create failed: {}", json);
        json["data"].clone()
    }
}
