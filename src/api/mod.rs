mod customers;
mod health;

use actix_web::{error::InternalError, http::StatusCode, web};

use crate::messaging::ProducerFactory;
use crate::metrics::metrics_handler;

pub use customers::create_customer;
pub use health::health_handler;

// ============================================================================
// HTTP API
// ============================================================================
//
//   POST /customers  - publish a customer, 201 once the broker confirms
//   GET  /health     - subscriber loop health
//   GET  /metrics    - Prometheus exposition
//
// Shared state is registered by the caller as app data:
//   web::Data<Publisher<F>>, web::Data<Metrics>,
//   web::Data<watch::Receiver<SubscriberState>>
//
// ============================================================================

pub fn configure<F: ProducerFactory>(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!(error = %err, "Rejected customer payload");
        let response = customers::error_response(StatusCode::BAD_REQUEST, &err);
        InternalError::from_response(err, response).into()
    });

    cfg.service(
        web::resource("/customers")
            .app_data(json)
            .route(web::post().to(create_customer::<F>)),
    )
    .route("/health", web::get().to(health_handler))
    .route("/metrics", web::get().to(metrics_handler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::Value;
    use tokio::sync::watch;

    use crate::messaging::memory::{InMemoryBroker, MemoryProducerFactory};
    use crate::messaging::{codec, MessageHeader, Publisher};
    use crate::metrics::Metrics;
    use crate::models::Customer;
    use crate::subscriber::SubscriberState;

    macro_rules! app {
        ($broker:expr, $state:expr) => {{
            let metrics = Arc::new(Metrics::new().unwrap());
            let publisher = Publisher::new(
                $broker.producer_factory(),
                "demo",
                vec![MessageHeader::new("source", "api")],
                metrics.clone(),
            );
            test::init_service(
                App::new()
                    .app_data(web::Data::new(publisher))
                    .app_data(web::Data::from(metrics))
                    .app_data(web::Data::new($state))
                    .configure(configure::<MemoryProducerFactory>),
            )
            .await
        }};
    }

    const CUSTOMER_JSON: &str = r#"{"id":"42","email":"a@b.com"}"#;

    fn post_customer(body: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/customers")
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_string())
    }

    #[actix_web::test]
    async fn test_create_customer_publishes_and_echoes() {
        let broker = InMemoryBroker::new();
        let (_tx, rx) = watch::channel(SubscriberState::Polling);
        let app = app!(broker, rx);

        let resp = test::call_service(&app, post_customer(CUSTOMER_JSON).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains('\n'), "echo should be pretty-printed");
        let echoed: Customer = serde_json::from_str(&text).unwrap();
        assert_eq!(echoed, Customer::new("42", "a@b.com"));

        let messages = broker.messages("demo");
        assert_eq!(messages.len(), 1);
        assert_eq!(codec::decode(&messages[0].payload).unwrap(), echoed);
    }

    #[actix_web::test]
    async fn test_malformed_body_is_rejected_without_publishing() {
        let broker = InMemoryBroker::new();
        let (_tx, rx) = watch::channel(SubscriberState::Polling);
        let app = app!(broker, rx);

        for body in ["not json", r#"{"id":"42"}"#, ""] {
            let resp = test::call_service(&app, post_customer(body).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body:?}");

            let json: Value = test::read_body_json(resp).await;
            assert!(json["error"].is_string());
        }

        assert!(broker.messages("demo").is_empty());
        assert_eq!(broker.open_producers(), 0);
    }

    #[actix_web::test]
    async fn test_failed_delivery_returns_bad_gateway() {
        let broker = InMemoryBroker::new();
        broker.reject_next_delivery("Local: Message timed out");
        let (_tx, rx) = watch::channel(SubscriberState::Polling);
        let app = app!(broker, rx);

        let resp = test::call_service(&app, post_customer(CUSTOMER_JSON).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let json: Value = test::read_body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("Message timed out"));
        assert!(broker.messages("demo").is_empty());
    }

    #[actix_web::test]
    async fn test_unreachable_broker_returns_service_unavailable() {
        let broker = InMemoryBroker::new();
        broker.refuse_connections();
        let (_tx, rx) = watch::channel(SubscriberState::Polling);
        let app = app!(broker, rx);

        let resp = test::call_service(&app, post_customer(CUSTOMER_JSON).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_health_follows_subscriber_state() {
        let broker = InMemoryBroker::new();
        let (tx, rx) = watch::channel(SubscriberState::Starting);
        let app = app!(broker, rx);

        let get = || test::TestRequest::get().uri("/health").to_request();

        let resp = test::call_service(&app, get()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["status"], "degraded");

        tx.send(SubscriberState::Polling).unwrap();
        let resp = test::call_service(&app, get()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["status"], "healthy");
        assert!(json["last_check"].is_string());

        tx.send(SubscriberState::Closed).unwrap();
        let resp = test::call_service(&app, get()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_metrics_route_reports_publishes() {
        let broker = InMemoryBroker::new();
        let (_tx, rx) = watch::channel(SubscriberState::Polling);
        let app = app!(broker, rx);

        test::call_service(&app, post_customer(CUSTOMER_JSON).to_request()).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("messages_published_total{topic=\"demo\"} 1"));
    }
}
