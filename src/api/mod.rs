use actix_web::web;

use crate::services::auth::AuthService;
use crate::services::basket::BasketService;
use crate::services::catalog::{CatalogService, CategoryMapper};
use crate::services::crud::CrudService;
use crate::services::customer::CustomerService;
use crate::services::delivery::DeliveryService;
use crate::services::order::OrderService;
use crate::services::payment::{PaymentMethodMapper, PaymentService};

pub mod auth;
pub mod basket;
pub mod catalog;
pub mod customers;
pub mod deliveries;
pub mod orders;
pub mod payments;

// ============================================================================
// HTTP Surface
// ============================================================================
//
// Public routes cover registration, login, and catalog reads. Everything
// under /api/basket, /api/orders, /api/me, and /api/payments requires a
// bearer token; /api/admin additionally requires the Admin role. Guards run
// in the extractors, so a handler that takes `AdminAuth` cannot be reached
// without the role.
//
// ============================================================================

pub struct AppState {
    pub auth: AuthService,
    pub customers: CustomerService,
    pub catalog: CatalogService,
    pub categories: CrudService<CategoryMapper>,
    pub baskets: BasketService,
    pub orders: OrderService,
    pub deliveries: DeliveryService,
    pub payments: PaymentService,
    pub payment_methods: CrudService<PaymentMethodMapper>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/auth/register", web::post().to(auth::register))
            .route("/auth/login", web::post().to(auth::login))
            // public catalog reads
            .route("/catalog/categories", web::get().to(catalog::list_categories))
            .route("/catalog/categories/{id}", web::get().to(catalog::get_category))
            .route("/catalog/products", web::get().to(catalog::list_products))
            .route("/catalog/products/{id}", web::get().to(catalog::get_product))
            .route("/payment-methods", web::get().to(payments::list_methods))
            // customer profile
            .route("/me", web::get().to(customers::me))
            .route("/me", web::put().to(customers::update_me))
            // basket
            .route("/basket", web::get().to(basket::get_basket))
            .route("/basket", web::delete().to(basket::clear_basket))
            .route("/basket/items", web::post().to(basket::add_item))
            .route("/basket/items/{product_id}", web::put().to(basket::update_item))
            .route("/basket/items/{product_id}", web::delete().to(basket::remove_item))
            // customer orders
            .route("/orders", web::post().to(orders::create_order))
            .route("/orders", web::get().to(orders::list_own_orders))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/orders/{id}/cancel", web::post().to(orders::cancel_own_order))
            // customer payments
            .route("/payments", web::post().to(payments::record_payment))
            .route("/payments", web::get().to(payments::list_own_payments))
            .service(admin_scope()),
    );
}

fn admin_scope() -> actix_web::Scope {
    web::scope("/admin")
        // catalog management
        .route("/catalog/categories", web::post().to(catalog::create_category))
        .route("/catalog/categories/{id}", web::put().to(catalog::update_category))
        .route("/catalog/categories/{id}", web::delete().to(catalog::delete_category))
        .route("/catalog/products", web::post().to(catalog::create_product))
        .route("/catalog/products/{id}", web::put().to(catalog::update_product))
        .route("/catalog/products/{id}", web::delete().to(catalog::delete_product))
        // customers
        .route("/customers", web::get().to(customers::list_customers))
        .route("/customers/{id}", web::get().to(customers::get_customer))
        // order management
        .route("/orders", web::get().to(orders::search_orders))
        .route("/orders/{id}", web::get().to(orders::get_order_admin))
        .route("/orders/{id}/confirm", web::post().to(orders::confirm_order))
        .route("/orders/{id}/processing", web::post().to(orders::mark_processing))
        .route("/orders/{id}/ship", web::post().to(orders::mark_shipped))
        .route("/orders/{id}/deliver", web::post().to(orders::mark_delivered))
        .route("/orders/{id}/returned", web::post().to(orders::mark_returned))
        .route("/orders/{id}/cancel", web::post().to(orders::cancel_order))
        .route("/orders/{id}/set-status/{name}", web::post().to(orders::set_order_status))
        // deliveries
        .route("/deliveries", web::get().to(deliveries::list_deliveries))
        .route("/deliveries", web::post().to(deliveries::create_delivery))
        .route("/deliveries/{id}", web::get().to(deliveries::get_delivery))
        .route("/deliveries/{id}", web::put().to(deliveries::update_delivery))
        .route("/deliveries/{id}", web::delete().to(deliveries::delete_delivery))
        .route("/deliveries/{id}/status/{name}", web::post().to(deliveries::set_delivery_status))
        // delivery status rows
        .route("/delivery-statuses", web::get().to(deliveries::list_statuses))
        .route("/delivery-statuses", web::post().to(deliveries::create_status))
        .route("/delivery-statuses/{id}", web::get().to(deliveries::get_status))
        .route("/delivery-statuses/{id}", web::put().to(deliveries::update_status))
        .route("/delivery-statuses/{id}", web::delete().to(deliveries::delete_status))
        // payment settlement and methods
        .route("/payments/{id}/complete", web::post().to(payments::complete_payment))
        .route("/payments/{id}/fail", web::post().to(payments::fail_payment))
        .route("/payments/{id}/refund", web::post().to(payments::refund_payment))
        .route("/payments/{id}/cancel", web::post().to(payments::cancel_payment))
        .route("/payment-methods", web::post().to(payments::create_method))
        .route("/payment-methods/{id}", web::put().to(payments::update_method))
        .route("/payment-methods/{id}", web::delete().to(payments::delete_method))
}
