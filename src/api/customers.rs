use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;

use crate::messaging::{ProducerFactory, PublishError, Publisher};
use crate::models::Customer;

/// POST /customers - publish the customer and echo it once the broker has
/// confirmed the write.
pub async fn create_customer<F: ProducerFactory>(
    publisher: web::Data<Publisher<F>>,
    body: web::Json<Customer>,
) -> HttpResponse {
    let customer = body.into_inner();
    tracing::info!(customer_id = %customer.id, email = %customer.email, "Creating customer");

    // Detached so a dropped client connection cannot abandon an in-flight delivery.
    let publisher = publisher.into_inner();
    let echoed = customer.clone();
    let outcome = tokio::spawn(async move { publisher.publish(&customer).await }).await;

    match outcome {
        Ok(Ok(_)) => match serde_json::to_string_pretty(&echoed) {
            Ok(body) => HttpResponse::Created()
                .content_type("application/json")
                .body(body),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
        },
        Ok(Err(e)) => error_response(status_for(&e), e),
        Err(e) => {
            tracing::error!(error = %e, "Publish task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

fn status_for(err: &PublishError) -> StatusCode {
    match err {
        PublishError::Connection(_) | PublishError::Enqueue { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PublishError::Delivery { .. } | PublishError::ReportDropped { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PublishError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(super) fn error_response(status: StatusCode, err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": err.to_string() }))
}
