// storefront_server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, checkout_handlers, event_handlers, order_handlers, product_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Authentication Routes
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/signout", web::post().to(auth_handlers::signout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      // Cart Routes
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::get_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/items/{product_id}", web::put().to(cart_handlers::set_quantity_handler))
          .route("/items/{product_id}", web::delete().to(cart_handlers::remove_from_cart_handler))
          .route("/checkout", web::post().to(cart_handlers::stage_checkout_handler)),
      )
      // Checkout Routes
      .service(
        web::scope("/checkout")
          .route("/review", web::post().to(checkout_handlers::review_handler))
          .route("/place", web::post().to(checkout_handlers::place_order_handler))
          .route("/session", web::get().to(checkout_handlers::get_session_handler))
          .route("/session", web::delete().to(checkout_handlers::clear_session_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/payment", web::post().to(order_handlers::submit_payment_handler)),
      )
      // Admin Routes
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::list_orders_handler))
          .route("/orders/stats", web::get().to(admin_handlers::stats_handler))
          .route("/orders/{owner}/{order_id}/verify", web::post().to(admin_handlers::verify_payment_handler))
          .route("/orders/{owner}/{order_id}/status", web::post().to(admin_handlers::update_status_handler))
          .route("/orders/{owner}/{order_id}/notes", web::post().to(admin_handlers::add_note_handler))
          .route("/migrate", web::post().to(admin_handlers::migrate_handler)),
      )
      .service(
        web::scope("/events")
          .route("", web::get().to(event_handlers::list_events_handler))
          .route("/{event_id}", web::get().to(event_handlers::get_event_handler)),
      ),
  );
}
