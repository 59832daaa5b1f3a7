use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics - Prometheus counters for the commerce flows
// ============================================================================
//
// Registered once at startup and scraped from /metrics on the main server.
//
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub order_transitions: IntCounterVec,
    pub rejected_transitions: IntCounterVec,
    pub basket_items_added: IntCounter,
    pub payments_recorded: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created =
            IntCounter::new("orders_created_total", "Orders successfully placed")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions applied"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let rejected_transitions = IntCounterVec::new(
            Opts::new(
                "order_transitions_rejected_total",
                "Order status transitions rejected by the transition table",
            ),
            &["from", "to"],
        )?;
        registry.register(Box::new(rejected_transitions.clone()))?;

        let basket_items_added =
            IntCounter::new("basket_items_added_total", "Basket line additions")?;
        registry.register(Box::new(basket_items_added.clone()))?;

        let payments_recorded =
            IntCounter::new("payments_recorded_total", "Payments recorded")?;
        registry.register(Box::new(payments_recorded.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_transitions,
            rejected_transitions,
            basket_items_added,
            payments_recorded,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

pub async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "stoneshop",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_increment() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_created.inc();
        metrics
            .order_transitions
            .with_label_values(&["Pending", "Confirmed"])
            .inc();
        assert!(!metrics.registry().gather().is_empty());
        assert_eq!(metrics.orders_created.get(), 1);
    }
}
