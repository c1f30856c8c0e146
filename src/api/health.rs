use actix_web::{web, HttpResponse};
use tokio::sync::watch;

use crate::health::ComponentHealth;
use crate::subscriber::SubscriberState;

/// GET /health - reports the subscriber loop's current state.
pub async fn health_handler(state: web::Data<watch::Receiver<SubscriberState>>) -> HttpResponse {
    let current = *state.borrow();
    let health = ComponentHealth::from_subscriber(current);

    if health.status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(health)
    } else {
        HttpResponse::Ok().json(health)
    }
}
