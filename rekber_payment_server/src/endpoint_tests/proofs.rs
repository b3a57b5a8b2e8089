use actix_web::{http::StatusCode, web, web::ServiceConfig};
use rekber_payment_engine::{
    db_types::{OrderStatusType, ProofStatusType, ReviewDecision},
    events::EventProducers,
    OrderFlowApi,
    OrderQueryApi,
};
use serde_json::json;

use super::{
    helpers::{get_request, issue_token, patch_request, post_request},
    mocks::{sample_order, sample_proof, MockEscrowDb},
};
use crate::{
    auth::Role,
    routes::{PendingProofsRoute, ReviewProofRoute, SubmitProofRoute},
};

#[actix_web::test]
async fn anonymous_submission_requires_a_buyer_id() {
    let _ = env_logger::try_init();
    let body = json!({ "order_id": "order-1", "proof_url": "https://files.example.com/transfer.png" });
    let (status, body) = post_request("", "/payment-proofs", body, configure_submit).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body.contains("buyer_id is required"), "{body}");
}

#[actix_web::test]
async fn anonymous_submission_with_a_buyer_id() {
    let _ = env_logger::try_init();
    let body = json!({
        "order_id": "order-1",
        "amount": 5_125_000,
        "proof_url": "https://files.example.com/transfer.png",
        "buyer_id": "buyer-1"
    });
    let (status, body) = post_request("", "/payment-proofs", body, configure_submit).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body.contains("verification"), "{body}");
}

#[actix_web::test]
async fn authenticated_submission_takes_the_identity_from_the_token() {
    let _ = env_logger::try_init();
    let token = issue_token("buyer-1", Role::User);
    // The body names someone else; the token wins.
    let body = json!({ "order_id": "order-1", "buyer_id": "impostor" });
    let (status, body) = post_request(&token, "/payment-proofs", body, configure_submit_checking_identity).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[actix_web::test]
async fn reviewing_a_proof_requires_the_admin_role() {
    let _ = env_logger::try_init();
    let token = issue_token("buyer-1", Role::User);
    let body = json!({ "action": "approve" });
    let (status, body) = patch_request(&token, "/admin/payment-proofs/proof-1", body, configure_review).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert!(body.contains("Insufficient Permissions"), "{body}");
}

#[actix_web::test]
async fn approving_a_proof_marks_the_order_paid() {
    let _ = env_logger::try_init();
    let token = issue_token("admin-1", Role::Admin);
    let body = json!({ "action": "approve" });
    let (status, body) = patch_request(&token, "/admin/payment-proofs/proof-1", body, configure_review).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("\"paid\""), "{body}");
}

#[actix_web::test]
async fn rejecting_a_proof_records_the_reason() {
    let _ = env_logger::try_init();
    let token = issue_token("admin-1", Role::Admin);
    let body = json!({ "action": "reject", "rejection_reason": "Amount does not match the order total" });
    let (status, body) = patch_request(&token, "/admin/payment-proofs/proof-1", body, configure_review).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("Amount does not match the order total"), "{body}");
    assert!(body.contains("\"rejected\""), "{body}");
}

#[actix_web::test]
async fn the_verification_queue_is_admin_only() {
    let _ = env_logger::try_init();
    let user_token = issue_token("buyer-1", Role::User);
    let (status, _) = get_request(&user_token, "/admin/payment-proofs", configure_queue).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = issue_token("admin-1", Role::Admin);
    let (status, body) = get_request(&admin_token, "/admin/payment-proofs", configure_queue).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("proof-1"), "{body}");
}

//----------------------------------------------   Fixtures  ----------------------------------------------------

fn submitted(order_status: OrderStatusType) -> (rekber_payment_engine::db_types::PaymentProof, rekber_payment_engine::db_types::Order) {
    let mut order = sample_order("seller-1", Some("buyer-1"));
    order.status = order_status;
    let proof = sample_proof(&order.id);
    (proof, order)
}

fn configure_submit(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_submit_payment_proof().returning(|_, _| Ok(submitted(OrderStatusType::Verification)));
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(SubmitProofRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_submit_checking_identity(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_submit_payment_proof()
        .withf(|_, submitted_by| submitted_by == "buyer-1")
        .returning(|_, _| Ok(submitted(OrderStatusType::Verification)));
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(SubmitProofRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_review(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_review_payment_proof().returning(|proof_id, decision, _, reason| {
        let mut order = sample_order("seller-1", Some("buyer-1"));
        let mut proof = sample_proof(&order.id);
        proof.id = proof_id.to_string();
        if decision == ReviewDecision::Approve {
            proof.status = ProofStatusType::Approved;
            order.status = OrderStatusType::Paid;
        } else {
            proof.status = ProofStatusType::Rejected;
            proof.rejection_reason = reason;
        }
        Ok((proof, order))
    });
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(ReviewProofRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}

fn configure_queue(cfg: &mut ServiceConfig) {
    let mut db = MockEscrowDb::new();
    db.expect_fetch_pending_proofs().returning(|| {
        let order = sample_order("seller-1", Some("buyer-1"));
        Ok(vec![sample_proof(&order.id)])
    });
    let api = OrderQueryApi::new(db);
    cfg.service(PendingProofsRoute::<MockEscrowDb>::new()).app_data(web::Data::new(api));
}
