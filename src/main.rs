use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stoneshop::api::{self, AppState};
use stoneshop::config::Config;
use stoneshop::metrics::{health_handler, metrics_handler, Metrics};
use stoneshop::repository::postgres::PgStore;
use stoneshop::services::auth::{AuthService, JwtKeys};
use stoneshop::services::basket::BasketService;
use stoneshop::services::catalog::CatalogService;
use stoneshop::services::crud::CrudService;
use stoneshop::services::customer::CustomerService;
use stoneshop::services::delivery::DeliveryService;
use stoneshop::services::order::OrderService;
use stoneshop::services::payment::PaymentService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stoneshop=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(bind_addr = %config.bind_addr, "starting stoneshop");

    tracing::info!("connecting to Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let metrics = Arc::new(Metrics::new()?);
    let store = Arc::new(PgStore::new(pool));
    let keys = JwtKeys::new(&config.jwt_secret, config.token_ttl_hours);

    let state = web::Data::new(AppState {
        auth: AuthService::new(store.clone(), store.clone(), keys),
        customers: CustomerService::new(store.clone(), store.clone()),
        catalog: CatalogService::new(store.clone(), store.clone()),
        categories: CrudService::new(store.clone()),
        baskets: BasketService::new(store.clone(), store.clone(), store.clone(), metrics.clone()),
        orders: OrderService::new(store.clone(), store.clone(), store.clone(), metrics.clone()),
        deliveries: DeliveryService::new(store.clone(), store.clone(), store.clone()),
        payments: PaymentService::new(store.clone(), store.clone(), store.clone(), metrics.clone()),
        payment_methods: CrudService::new(store.clone()),
    });

    let metrics_data = web::Data::new(metrics);
    let bind_addr = config.bind_addr.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(metrics_data.clone())
            .route("/health", web::get().to(health_handler))
            .route("/metrics", web::get().to(metrics_handler))
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
