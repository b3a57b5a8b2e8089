//! End-to-end order lifecycle tests against a real SQLite database.

use chrono::{Duration, Utc};
use rekber_payment_engine::{
    db_types::*,
    events::{EventProducers, OrderPaidEvent},
    order_objects::OrderQueryFilter,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    EscrowDatabase,
    OrderFlowApi,
    OrderFlowError,
    OrderManagement,
    SqliteDatabase,
};
use rpg_common::Rupiah;

async fn setup() -> (SqliteDatabase, OrderFlowApi<SqliteDatabase>) {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    (db, api)
}

fn new_order(seller: &str) -> NewOrder {
    NewOrder::new(seller.to_string(), "PS5 bundle".to_string(), Rupiah::from(100_000), Rupiah::from(10_000))
}

fn proof_for(order: &Order) -> NewPaymentProof {
    NewPaymentProof {
        order_id: order.id.clone(),
        amount: Some(order.total_amount),
        proof_url: Some("https://files.example.com/transfer.jpg".to_string()),
        note: "Paid via BCA transfer".to_string(),
    }
}

#[tokio::test]
async fn happy_path_from_creation_to_fund_release() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-1")).await.unwrap();
    assert_eq!(order.status, OrderStatusType::AwaitingPayment);
    assert_eq!(order.total_amount, Rupiah::from(110_000));
    assert!(order.order_number.as_str().starts_with("ORD-"));

    // The payment record was created alongside the order.
    let payment = db.fetch_payment_for_order(&order.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Pending);
    assert_eq!(payment.amount, order.total_amount);

    // Buyer submits proof
    let (proof, order) = api.submit_payment_proof(proof_for(&order), "buyer-1").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Verification);
    assert_eq!(order.buyer_id.as_deref(), Some("buyer-1"));
    assert_eq!(proof.status, ProofStatusType::Pending);

    // Admin approves
    let (proof, order) = api.review_payment_proof(&proof.id, ReviewDecision::Approve, "admin-1", None).await.unwrap();
    assert_eq!(proof.status, ProofStatusType::Approved);
    assert_eq!(order.status, OrderStatusType::Paid);
    let payment = db.fetch_payment_for_order(&order.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Paid);

    // Admin confirms delivery; the seller's payout appears
    let (order, release) = api.mark_delivered(&order.id, "admin-1").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Delivered);
    assert!(order.delivered_at.is_some());
    assert_eq!(release.status, FundReleaseStatusType::Pending);
    assert_eq!(release.amount, order.total_amount);
    assert_eq!(release.seller_id, "seller-1");

    // Admin transfers the funds
    let (release, order) = api
        .complete_fund_release(&order.id, "admin-1", Some("https://files.example.com/payout.jpg".into()), None)
        .await
        .unwrap();
    assert_eq!(release.status, FundReleaseStatusType::Completed);
    assert_eq!(release.transferred_by.as_deref(), Some("admin-1"));
    assert_eq!(order.status, OrderStatusType::Completed);

    // The money never goes out twice
    let err = api.complete_fund_release(&order.id, "admin-2", None, None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ReleaseAlreadyCompleted));
}

#[tokio::test]
async fn rejected_proof_reopens_the_order() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-2")).await.unwrap();
    let (proof, order) = api.submit_payment_proof(proof_for(&order), "buyer-2").await.unwrap();

    let (proof, order) = api
        .review_payment_proof(&proof.id, ReviewDecision::Reject, "admin-1", Some("Transfer screenshot is unreadable".into()))
        .await
        .unwrap();
    assert_eq!(proof.status, ProofStatusType::Rejected);
    assert_eq!(proof.rejection_reason.as_deref(), Some("Transfer screenshot is unreadable"));
    assert_eq!(order.status, OrderStatusType::AwaitingPayment);
    let payment = db.fetch_payment_for_order(&order.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Rejected);

    // Re-reviewing the same proof is an error
    let err = api.review_payment_proof(&proof.id, ReviewDecision::Approve, "admin-1", None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProofAlreadyReviewed));

    // The buyer can try again, and the order keeps its buyer
    let (_, order) = api.submit_payment_proof(proof_for(&order), "buyer-2").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Verification);
    assert_eq!(db.fetch_proofs_for_order(&order.id).await.unwrap().len(), 2);

    // But nobody else can hijack the order
    let err = api.submit_payment_proof(proof_for(&order), "buyer-3").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Forbidden(_)));
}

#[tokio::test]
async fn cancellation_is_immediate_before_any_proof() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-3")).await.unwrap();

    // A stranger cannot cancel
    let err = api.cancel_or_request(&order.id, "someone-else", false, "buyer stopped responding").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Forbidden(_)));

    // A thin reason is rejected
    let err = api.cancel_or_request(&order.id, "seller-3", false, "test").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));

    let outcome = api.cancel_or_request(&order.id, "seller-3", false, "buyer stopped responding").await.unwrap();
    assert!(outcome.cancelled_immediately());
    assert_eq!(outcome.order.status, OrderStatusType::Cancelled);
    assert_eq!(outcome.order.cancelled_by.as_deref(), Some("seller-3"));
    assert!(outcome.order.cancelled_at.is_some());
    assert!(db.fetch_cancellation_request_for_order(&order.id).await.unwrap().is_none());

    // Cancelling twice fails
    let err = api.cancel_or_request(&order.id, "seller-3", false, "buyer stopped responding").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn cancellation_needs_review_once_a_proof_exists() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-4")).await.unwrap();
    api.submit_payment_proof(proof_for(&order), "buyer-4").await.unwrap();

    let outcome = api.cancel_or_request(&order.id, "seller-4", false, "item is no longer available").await.unwrap();
    assert!(!outcome.cancelled_immediately());
    let request = outcome.request.unwrap();
    assert_eq!(request.status, CancellationStatusType::Pending);
    // The order itself is untouched until an admin decides
    assert_eq!(db.fetch_order(&order.id).await.unwrap().unwrap().status, OrderStatusType::Verification);

    // Only one request at a time
    let err = api.cancel_or_request(&order.id, "seller-4", false, "item is no longer available").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PendingRequestExists));

    // Admin approves; the order is cancelled
    let (request, order) = api
        .review_cancellation_request(&request.id, ReviewDecision::Approve, "admin-1", Some("Refund issued".into()))
        .await
        .unwrap();
    assert_eq!(request.status, CancellationStatusType::Approved);
    assert_eq!(request.reviewed_by.as_deref(), Some("admin-1"));
    assert_eq!(order.status, OrderStatusType::Cancelled);

    // A closed request cannot be reviewed again
    let err = api.review_cancellation_request(&request.id, ReviewDecision::Reject, "admin-2", None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::RequestAlreadyProcessed));
}

#[tokio::test]
async fn rejected_cancellation_leaves_the_order_alone() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-5")).await.unwrap();
    api.submit_payment_proof(proof_for(&order), "buyer-5").await.unwrap();
    let outcome = api.cancel_or_request(&order.id, "seller-5", false, "changed my mind about selling").await.unwrap();
    let request = outcome.request.unwrap();

    let (request, order) =
        api.review_cancellation_request(&request.id, ReviewDecision::Reject, "admin-1", None).await.unwrap();
    assert_eq!(request.status, CancellationStatusType::Rejected);
    assert_eq!(order.status, OrderStatusType::Verification);
    assert_eq!(db.fetch_order(&order.id).await.unwrap().unwrap().status, OrderStatusType::Verification);
}

#[tokio::test]
async fn approved_cancellation_clears_the_verification_queue() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-13")).await.unwrap();
    let (proof, _) = api.submit_payment_proof(proof_for(&order), "buyer-13").await.unwrap();
    let outcome = api.cancel_or_request(&order.id, "seller-13", false, "item damaged in storage").await.unwrap();
    let request = outcome.request.unwrap();
    api.review_cancellation_request(&request.id, ReviewDecision::Approve, "admin-1", None).await.unwrap();

    // The orphaned proof was rejected along with the order, so the queue is empty
    assert!(db.fetch_pending_proofs().await.unwrap().is_empty());
    let proofs = db.fetch_proofs_for_order(&order.id).await.unwrap();
    assert_eq!(proofs[0].status, ProofStatusType::Rejected);
    assert_eq!(proofs[0].rejection_reason.as_deref(), Some("Order cancelled"));

    // And reviewing it reports a closed proof instead of wedging
    let err = api.review_payment_proof(&proof.id, ReviewDecision::Approve, "admin-1", None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProofAlreadyReviewed));
}

#[tokio::test]
async fn buyer_confirmation_completes_the_order() {
    let (_db, api) = setup().await;
    let order = api.create_order(new_order("seller-6")).await.unwrap();
    let (proof, order) = api.submit_payment_proof(proof_for(&order), "buyer-6").await.unwrap();
    api.review_payment_proof(&proof.id, ReviewDecision::Approve, "admin-1", None).await.unwrap();

    // Someone other than the buyer cannot confirm receipt
    let err = api.confirm_received(&order.id, "buyer-7").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Forbidden(_)));

    let (order, release) = api.confirm_received(&order.id, "buyer-6").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(release.status, FundReleaseStatusType::Pending);
    assert_eq!(release.amount, order.total_amount);

    // Confirming again changes nothing
    let (order2, release2) = api.confirm_received(&order.id, "buyer-6").await.unwrap();
    assert_eq!(order2.status, OrderStatusType::Completed);
    assert_eq!(release.id, release2.id);

    // The payout is settled separately, and the order stays completed
    let (release, order) = api.complete_fund_release(&order.id, "admin-1", None, None).await.unwrap();
    assert_eq!(release.status, FundReleaseStatusType::Completed);
    assert_eq!(order.status, OrderStatusType::Completed);
}

#[tokio::test]
async fn order_creation_is_rate_limited_per_seller() {
    let (_db, api) = setup().await;
    api.create_order(new_order("seller-7")).await.unwrap();
    let err = api.create_order(new_order("seller-7")).await.unwrap_err();
    match err {
        OrderFlowError::OrderCooldown { retry_after_secs } => {
            assert!(retry_after_secs > 0 && retry_after_secs <= 120);
        },
        other => panic!("Expected cooldown error, got {other}"),
    }
    // A different seller is unaffected
    api.create_order(new_order("seller-8")).await.unwrap();
}

#[tokio::test]
async fn direct_status_changes_respect_the_transition_table() {
    let (_db, api) = setup().await;
    let order = api.create_order(new_order("seller-9")).await.unwrap();

    // awaiting_payment cannot jump straight to shipped
    let err = api.set_order_status(&order.id, OrderStatusType::Shipped, "admin-1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { .. }));

    let (proof, order) = api.submit_payment_proof(proof_for(&order), "buyer-9").await.unwrap();
    api.review_payment_proof(&proof.id, ReviewDecision::Approve, "admin-1", None).await.unwrap();
    let order = api.set_order_status(&order.id, OrderStatusType::Processing, "admin-1").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Processing);
    let order = api.set_order_status(&order.id, OrderStatusType::Shipped, "admin-1").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Shipped);
}

#[tokio::test]
async fn expired_orders_are_swept_but_only_once() {
    let (db, api) = setup().await;
    let stale = api.create_order(new_order("seller-10")).await.unwrap();
    let fresh = api.create_order(new_order("seller-11")).await.unwrap();
    let paid_for = api.create_order(new_order("seller-12")).await.unwrap();
    api.submit_payment_proof(proof_for(&paid_for), "buyer-12").await.unwrap();

    // Backdate two of the orders past the deadline
    let cutoff = Utc::now() - Duration::hours(25);
    for id in [&stale.id, &paid_for.id] {
        sqlx::query("UPDATE orders SET created_at = $1 WHERE id = $2")
            .bind(cutoff)
            .bind(id.as_str())
            .execute(db.pool())
            .await
            .unwrap();
    }

    let cancelled = api.cancel_expired_orders(Duration::hours(24)).await.unwrap();
    // Only the stale order without a proof is cancelled. The fresh one is in time, and the one with a proof is
    // waiting on verification, not on the buyer.
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, stale.id);
    assert_eq!(cancelled[0].status, OrderStatusType::Cancelled);
    assert_eq!(cancelled[0].cancelled_by.as_deref(), Some("system"));
    assert_eq!(db.fetch_order(&fresh.id).await.unwrap().unwrap().status, OrderStatusType::AwaitingPayment);

    // The sweep is idempotent
    let cancelled = api.cancel_expired_orders(Duration::hours(24)).await.unwrap();
    assert!(cancelled.is_empty());
}

#[tokio::test]
async fn order_search_ignores_an_empty_status_list() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-14")).await.unwrap();

    let filter = OrderQueryFilter { status: Some(Vec::new()), ..Default::default() };
    let orders = db.search_orders(filter).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order.id);
}

#[tokio::test]
async fn order_records_round_trip_unchanged() {
    let (db, api) = setup().await;
    let order = api.create_order(new_order("seller-15")).await.unwrap();
    let fetched = db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(order, fetched);
    // Events wrap the records, so they compare the same way
    assert_eq!(OrderPaidEvent::new(order), OrderPaidEvent::new(fetched));
}

#[tokio::test]
async fn user_order_listing_covers_both_roles() {
    let (db, api) = setup().await;
    let sold = api.create_order(new_order("user-a")).await.unwrap();
    let bought = api.create_order(new_order("user-b")).await.unwrap();
    api.submit_payment_proof(proof_for(&bought), "user-a").await.unwrap();

    let orders = db.fetch_orders_for_user("user-a").await.unwrap();
    let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(orders.len(), 2);
    assert!(ids.contains(&sold.id.as_str()));
    assert!(ids.contains(&bought.id.as_str()));
}
