use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use rekber_payment_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    OrderFlowApi,
    OrderQueryApi,
};
use serde_json::json;

use super::{
    helpers::{get_request, issue_token, patch_request, post_request},
    mocks::{sample_order, MockEscrowDb},
};
use crate::{
    auth::Role,
    routes::{MyOrdersRoute, NewOrderRoute, OrderByIdRoute, UpdateOrderStatusRoute},
};

#[actix_web::test]
async fn create_order_requires_authentication() {
    let _ = env_logger::try_init();
    let body = json!({ "title": "PlayStation 5", "total_amount": 5_125_000 });
    let (status, body) = post_request("", "/orders", body, configure_create).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token"), "{body}");
}

#[actix_web::test]
async fn create_order_with_legacy_total() {
    let _ = env_logger::try_init();
    let token = issue_token("seller-1", Role::User);
    let body = json!({ "title": "PlayStation 5", "total_amount": 5_125_000 });
    let (status, body) = post_request(&token, "/orders", body, configure_create).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body.contains("ORD-20260801-00042"), "{body}");
    assert!(body.contains("awaiting_payment"), "{body}");
}

#[actix_web::test]
async fn create_order_inside_the_cooldown_window() {
    let _ = env_logger::try_init();
    let token = issue_token("seller-1", Role::User);
    let body = json!({ "title": "PlayStation 5", "total_amount": 5_125_000 });
    let (status, body) = post_request(&token, "/orders", body, configure_create_on_cooldown).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "{body}");
    assert!(body.contains("retry_after_secs"), "{body}");
}

#[actix_web::test]
async fn my_orders_lists_the_users_orders() {
    let _ = env_logger::try_init();
    let token = issue_token("seller-1", Role::User);
    let (status, body) = get_request(&token, "/orders", configure_my_orders).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("ORD-20260801-00042"), "{body}");
}

#[actix_web::test]
async fn participants_can_view_an_order() {
    let _ = env_logger::try_init();
    for user in ["seller-1", "buyer-1"] {
        let token = issue_token(user, Role::User);
        let (status, body) = get_request(&token, "/orders/order-1", configure_order_by_id).await;
        assert_eq!(status, StatusCode::OK, "{user}: {body}");
    }
}

#[actix_web::test]
async fn strangers_get_the_same_answer_as_for_a_missing_order() {
    let _ = env_logger::try_init();
    let token = issue_token("someone-else", Role::User);
    let (status, body) = get_request(&token, "/orders/order-1", configure_order_by_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[actix_web::test]
async fn admins_can_view_any_order() {
    let _ = env_logger::try_init();
    let token = issue_token("admin-1", Role::Admin);
    let (status, body) = get_request(&token, "/orders/order-1", configure_order_by_id).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn sellers_may_move_their_order_between_fulfilment_states() {
    let _ = env_logger::try_init();
    let token = issue_token("seller-1", Role::User);
    let body = json!({ "status": "shipped" });
    let (status, body) = patch_request(&token, "/orders/order-1/status", body, configure_update_status).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("shipped"), "{body}");
}

#[actix_web::test]
async fn sellers_cannot_mark_their_own_order_paid() {
    let _ = env_logger::try_init();
    let token = issue_token("seller-1", Role::User);
    let body = json!({ "status": "paid" });
    let (status, body) = patch_request(&token, "/orders/order-1/status", body, configure_update_status).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert!(body.contains("Sellers cannot move an order"), "{body}");
}

//----------------------------------------------   Fixtures  ----------------------------------------------------

fn configure_create(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_last_order_created_at().returning(|_| Ok(None));
    db.expect_create_order().returning(|order| {
        let mut stored = sample_order(&order.seller_id, None);
        stored.title = order.title;
        stored.product_price = order.product_price;
        stored.platform_fee = order.platform_fee;
        stored.total_amount = order.total_amount;
        Ok(stored)
    });
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(NewOrderRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_create_on_cooldown(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_last_order_created_at().returning(|_| Ok(Some(Utc::now())));
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(NewOrderRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_my_orders(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_orders_for_user().returning(|_| Ok(vec![sample_order("seller-1", Some("buyer-1"))]));
    let api = OrderQueryApi::new(db);
    cfg.service(MyOrdersRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_order_by_id(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(sample_order("seller-1", Some("buyer-1")))));
    let api = OrderQueryApi::new(db);
    cfg.service(OrderByIdRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_update_status(cfg: &mut ServiceConfig) {
    let mut query_db = MockEscrowDb::new();
    query_db.expect_fetch_order().returning(|_| {
        let mut order = sample_order("seller-1", Some("buyer-1"));
        order.status = OrderStatusType::Paid;
        Ok(Some(order))
    });
    let mut flow_db = MockEscrowDb::new();
    flow_db.expect_set_order_status().returning(|_, status, _| {
        let mut order = sample_order("seller-1", Some("buyer-1"));
        order.status = status;
        Ok(order)
    });
    cfg.service(UpdateOrderStatusRoute::<MockEscrowDb>::new())
        .app_data(web::Data::new(OrderQueryApi::new(query_db)))
        .app_data(web::Data::new(OrderFlowApi::new(flow_db, EventProducers::default())));
}
