use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use rekber_payment_engine::{db_types::QrisTransaction, QrisApi};
use serde_json::json;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::{sample_settings, MockQrisDb},
};
use crate::{
    auth::Role,
    routes::{CurrentQrisRoute, GenerateQrisRoute, QrisTransactionRoute, UploadQrisRoute},
};

const STATIC_QRIS: &str = "00020101021126550014ID.CO.QRIS.WWW0118936000140300012345020412340303UMI52045812530336058\
                           02ID5914Toko Sejahtera6007Jakarta6105123456304B02D";

#[actix_web::test]
async fn generating_a_payment_requires_authentication() {
    let _ = env_logger::try_init();
    let body = json!({ "amount": 110_000 });
    let (status, body) = post_request("", "/qris/generate", body, configure_generate).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
}

#[actix_web::test]
async fn generated_payment_embeds_the_amount() {
    let _ = env_logger::try_init();
    let token = issue_token("buyer-1", Role::User);
    let body = json!({ "amount": 110_000 });
    let (status, body) = post_request(&token, "/qris/generate", body, configure_generate).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body.contains("54061100005802ID"), "{body}");
    assert!(body.contains("Toko Sejahtera"), "{body}");
}

#[actix_web::test]
async fn generation_without_an_active_configuration() {
    let _ = env_logger::try_init();
    let token = issue_token("buyer-1", Role::User);
    let body = json!({ "amount": 110_000 });
    let (status, body) = post_request(&token, "/qris/generate", body, configure_generate_unconfigured).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert!(body.contains("No active QRIS configuration"), "{body}");
}

#[actix_web::test]
async fn uploading_a_configuration_is_admin_only() {
    let _ = env_logger::try_init();
    let body = json!({ "qris_data": STATIC_QRIS });
    let user_token = issue_token("buyer-1", Role::User);
    let (status, _) = post_request(&user_token, "/admin/qris/upload", body.clone(), configure_upload).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = issue_token("admin-1", Role::Admin);
    let (status, response) = post_request(&admin_token, "/admin/qris/upload", body, configure_upload).await;
    assert_eq!(status, StatusCode::CREATED, "{response}");
    assert!(response.contains("Toko Sejahtera"), "{response}");
}

#[actix_web::test]
async fn current_configuration_for_admins() {
    let _ = env_logger::try_init();
    let token = issue_token("admin-1", Role::Admin);
    let (status, body) = get_request(&token, "/admin/qris/current", configure_current).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("Toko Sejahtera"), "{body}");
}

#[actix_web::test]
async fn transactions_are_private_to_their_owner() {
    let _ = env_logger::try_init();
    let owner = issue_token("buyer-1", Role::User);
    let (status, body) = get_request(&owner, "/qris/transaction/qtx-1", configure_transaction).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stranger = issue_token("buyer-2", Role::User);
    let (status, body) = get_request(&stranger, "/qris/transaction/qtx-1", configure_transaction).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

//----------------------------------------------   Fixtures  ----------------------------------------------------

fn stored_transaction(user_id: &str) -> QrisTransaction {
    QrisTransaction {
        id: "qtx-1".to_string(),
        user_id: user_id.to_string(),
        order_id: None,
        amount: rpg_common::Rupiah::from(110_000),
        generated_qris: "dynamic-payload".to_string(),
        status: "pending".to_string(),
        expires_at: Utc::now() + chrono::Duration::minutes(30),
        created_at: Utc::now(),
    }
}

fn configure_generate(cfg: &mut ServiceConfig) {
    let mut db = MockQrisDb::new();
    db.expect_fetch_active_qris_settings().returning(|| Ok(Some(sample_settings(STATIC_QRIS))));
    db.expect_insert_qris_transaction().returning(|tx| {
        Ok(QrisTransaction {
            id: "qtx-1".to_string(),
            user_id: tx.user_id,
            order_id: tx.order_id,
            amount: tx.amount,
            generated_qris: tx.generated_qris,
            status: "pending".to_string(),
            expires_at: tx.expires_at,
            created_at: Utc::now(),
        })
    });
    cfg.service(GenerateQrisRoute::<MockQrisDb>::new()).app_data(web::Data::new(QrisApi::new(db)));
}

fn configure_generate_unconfigured(cfg: &mut ServiceConfig) {
    let mut db = MockQrisDb::new();
    db.expect_fetch_active_qris_settings().returning(|| Ok(None));
    cfg.service(GenerateQrisRoute::<MockQrisDb>::new()).app_data(web::Data::new(QrisApi::new(db)));
}

fn configure_upload(cfg: &mut ServiceConfig) {
    let mut db = MockQrisDb::new();
    db.expect_activate_qris_settings().returning(|settings| {
        let mut stored = sample_settings(&settings.qris_data);
        stored.merchant_name = settings.merchant_name;
        stored.merchant_city = settings.merchant_city;
        stored.created_by = settings.created_by;
        Ok(stored)
    });
    cfg.service(UploadQrisRoute::<MockQrisDb>::new()).app_data(web::Data::new(QrisApi::new(db)));
}

fn configure_current(cfg: &mut ServiceConfig) {
    let mut db = MockQrisDb::new();
    db.expect_fetch_active_qris_settings().returning(|| Ok(Some(sample_settings(STATIC_QRIS))));
    cfg.service(CurrentQrisRoute::<MockQrisDb>::new()).app_data(web::Data::new(QrisApi::new(db)));
}

fn configure_transaction(cfg: &mut ServiceConfig) {
    let mut db = MockQrisDb::new();
    db.expect_fetch_qris_transaction().returning(|_| Ok(Some(stored_transaction("buyer-1"))));
    cfg.service(QrisTransactionRoute::<MockQrisDb>::new()).app_data(web::Data::new(QrisApi::new(db)));
}
