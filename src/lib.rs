pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod query;
pub mod referrals;
pub mod reviews;
pub mod support;
pub mod validation;
pub mod wishlist;

use axum::{
    extract::FromRef,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use addresses::AddressService;
use auth::TokenService;
use cart::CartService;
use config::AppConfig;
use inventory::InventoryService;
use models::{CreateBox, MysteryBox, UpdateBox};
use notifications::NotificationRepository;
use orders::OrderService;
use referrals::ReferralService;
use reviews::ReviewService;
use support::SupportService;
use wishlist::WishlistRepository;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::create_box,
        catalog::search_boxes,
        catalog::get_box,
        catalog::update_box,
        catalog::deactivate_box,
    ),
    components(
        schemas(MysteryBox, CreateBox, UpdateBox)
    ),
    tags(
        (name = "boxes", description = "Mystery box catalog endpoints")
    ),
    info(
        title = "Surprise Tokri API",
        version = "0.1.0",
        description = "Storefront API for Surprise Tokri mystery boxes"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenService,
    pub referral_service: ReferralService,
    pub inventory_service: InventoryService,
    pub order_service: OrderService,
    pub review_service: ReviewService,
    pub cart_service: CartService,
    pub wishlist: WishlistRepository,
    pub address_service: AddressService,
    pub support_service: SupportService,
    pub notifications: NotificationRepository,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        let referral_service = ReferralService::new(db.clone());
        let notifications = NotificationRepository::new(db.clone());
        Self {
            tokens: TokenService::new(config.jwt_secret.clone()),
            inventory_service: InventoryService::new(db.clone()),
            order_service: OrderService::new(
                db.clone(),
                referral_service.clone(),
                notifications.clone(),
                config.checkout.clone(),
            ),
            review_service: ReviewService::new(db.clone()),
            cart_service: CartService::new(db.clone()),
            wishlist: WishlistRepository::new(db.clone()),
            address_service: AddressService::new(db.clone()),
            support_service: SupportService::new(db.clone(), notifications.clone()),
            referral_service,
            notifications,
            db,
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Public order tracking, rate limited per client IP when configured
///
/// The limiter keys on the peer address, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
fn tracking_routes(rate_limit_per_second: Option<u64>) -> Router<AppState> {
    let routes = Router::new().route("/tracking", get(orders::track_order_handler));

    let Some(per_second) = rate_limit_per_second else {
        return routes;
    };

    let burst = u32::try_from(per_second).unwrap_or(u32::MAX).saturating_mul(2);
    match GovernorConfigBuilder::default()
        .per_second(per_second)
        .burst_size(burst)
        .finish()
    {
        Some(governor_conf) => {
            tracing::info!("Public tracking limited to {} requests per second", per_second);
            routes.layer(GovernorLayer {
                config: Box::leak(Box::new(governor_conf)),
            })
        }
        None => {
            tracing::warn!("Invalid tracking rate limit {}, serving without a limiter", per_second);
            routes
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog and reviews
        .route("/boxes", get(catalog::search_boxes))
        .route("/boxes/:id", get(catalog::get_box))
        .route("/boxes/:id/reviews", get(reviews::list_box_reviews_handler))
        .route("/search", get(catalog::search_boxes))
        .route("/reviews", post(reviews::create_review_handler))
        .route(
            "/reviews/:id",
            put(reviews::update_review_handler).delete(reviews::delete_review_handler),
        )
        // Customer orders and referrals
        .route("/checkout", post(orders::checkout_handler))
        .route("/orders", get(orders::list_my_orders_handler))
        .route("/orders/:id", get(orders::get_my_order_handler))
        .route(
            "/referrals",
            get(referrals::list_my_referrals_handler).post(referrals::create_my_referral_handler),
        )
        .route("/referrals/validate", post(referrals::validate_referral_handler))
        .route("/user/notifications", get(notifications::list_notifications_handler))
        .route(
            "/user/notifications/:id/read",
            put(notifications::mark_notification_read_handler),
        )
        // Cart, wishlist, address book and support
        .route(
            "/cart",
            get(cart::get_cart_handler)
                .post(cart::add_to_cart_handler)
                .delete(cart::clear_cart_handler),
        )
        .route(
            "/cart/:box_id",
            put(cart::update_cart_item_handler).delete(cart::remove_cart_item_handler),
        )
        .route(
            "/user/wishlist",
            get(wishlist::list_wishlist_handler).post(wishlist::add_wishlist_item_handler),
        )
        .route("/user/wishlist/:box_id", delete(wishlist::remove_wishlist_item_handler))
        .route(
            "/user/addresses",
            get(addresses::list_addresses_handler).post(addresses::create_address_handler),
        )
        .route(
            "/user/addresses/:id",
            put(addresses::update_address_handler).delete(addresses::delete_address_handler),
        )
        .route(
            "/user/support",
            get(support::list_my_tickets_handler).post(support::create_ticket_handler),
        )
        .route("/user/support/:id", get(support::get_my_ticket_handler))
        .route("/user/support/:id/close", put(support::close_my_ticket_handler))
        // Admin
        .route("/admin/boxes", post(catalog::create_box))
        .route(
            "/admin/boxes/:id",
            put(catalog::update_box).delete(catalog::deactivate_box),
        )
        .route("/admin/orders", get(orders::admin_list_orders_handler))
        .route(
            "/admin/orders/:id",
            get(orders::admin_get_order_handler).put(orders::update_order_status_handler),
        )
        .route("/admin/orders/:id/tracking", post(orders::add_tracking_update_handler))
        .route("/admin/orders/:id/refund", post(orders::refund_order_handler))
        .route(
            "/admin/referrals",
            get(referrals::list_referrals_handler).post(referrals::create_referral_handler),
        )
        .route(
            "/admin/referrals/:id",
            get(referrals::get_referral_handler).put(referrals::update_referral_handler),
        )
        .route("/admin/referrals/:id/usages", get(referrals::list_referral_usages_handler))
        .route("/admin/referral-usages/:id", put(referrals::update_usage_status_handler))
        .route(
            "/admin/inventory/transactions",
            get(inventory::list_transactions_handler).post(inventory::record_transaction_handler),
        )
        .route("/admin/inventory/alerts", get(inventory::list_alerts_handler))
        .route(
            "/admin/inventory/alerts/:id/acknowledge",
            put(inventory::acknowledge_alert_handler),
        )
        .route("/admin/inventory/summary", get(inventory::inventory_summary_handler))
        .route("/admin/support", get(support::admin_list_tickets_handler))
        .route("/admin/support/:id", put(support::admin_update_ticket_handler))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and request tracing
pub fn create_router(state: AppState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(
            "/api",
            api_routes().merge(tracking_routes(config.tracking_rate_limit_per_second)),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

#[cfg(test)]
mod tests;
