//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a few lines MUST go into a separate module.
//! Keep this module neat and tidy 🙏
//!
//! Handlers are async and must never block the worker thread; anything that waits (database calls in particular)
//! goes through the engine's async APIs.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use rekber_payment_engine::{
    db_types::{NewPaymentProof, Order, OrderId, OrderNumber, OrderStatusType, ReviewDecision},
    order_objects::OrderQueryFilter,
    EscrowDatabase,
    OrderFlowApi,
    OrderFlowError,
    OrderManagement,
    OrderQueryApi,
    QrisApi,
    QrisManagement,
};
use serde_json::json;

use crate::{
    auth::{JwtClaims, MaybeAuthenticated, Role},
    data_objects::{
        CancelOrderParams,
        CancellationResult,
        CancellationReviewParams,
        FundReleaseParams,
        JsonResponse,
        NewOrderParams,
        OrderSearchQuery,
        ProofReviewParams,
        QrisGenerateParams,
        QrisPaymentResult,
        QrisUploadParams,
        SetStatusParams,
        StatusQuery,
        SubmitProofParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(new_order => Post "/orders" impl EscrowDatabase, OrderManagement where requires [Role::User]);
/// Creates a new escrow order with the authenticated user as the seller.
///
/// Clients send either `product_price` and `platform_fee`, or a bare `total_amount` (legacy clients), in which case
/// the fee is carved out at 2.5%, rounded up. Sellers are rate limited to one new order every two minutes; a second
/// order inside the window gets a 429 with a `Retry-After` header.
pub async fn new_order<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    body: web::Json<NewOrderParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new order for seller {}", claims.sub);
    let order = body.into_inner().into_new_order(claims.sub)?;
    let order = api.create_order(order).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderManagement where requires [Role::User]);
/// Every order the authenticated user participates in, as seller or buyer, newest first.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my orders for {}", claims.sub);
    let orders = api.fetch_orders_for_user(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_number => Get "/orders/number/{order_number}" impl OrderManagement);
/// Public lookup by the `ORD-...` reference. This is what the payment page loads, so it requires no token; the
/// order number itself is the shared secret between seller and buyer.
pub async fn order_by_number<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.into_inner());
    debug!("💻️ GET order by number [{number}]");
    let order = api
        .fetch_order_by_number(&number)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {number}")))?;
    let payment = api.fetch_payment_for_order(&order.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "payment": payment })))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement where requires [Role::User]);
pub async fn order_by_id<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order [{order_id}] for {}", claims.sub);
    let order = fetch_visible_order(&claims, &order_id, api.as_ref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl EscrowDatabase, OrderManagement where requires [Role::User]);
/// Cancels an order, or files a cancellation request for admin review when a payment proof already exists.
pub async fn cancel_order<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<CancelOrderParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST cancel order [{order_id}] by {}", claims.sub);
    let outcome = api.cancel_or_request(&order_id, &claims.sub, claims.role.is_admin(), &body.reason).await?;
    let result = CancellationResult {
        cancelled_immediately: outcome.cancelled_immediately(),
        order: outcome.order,
        request: outcome.request,
    };
    Ok(HttpResponse::Ok().json(result))
}

route!(my_cancellation_requests => Get "/orders/my-cancellation-requests" impl OrderManagement where requires [Role::User]);
pub async fn my_cancellation_requests<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cancellation requests filed by {}", claims.sub);
    let requests = api.fetch_cancellation_requests(None).await?;
    let mine = requests.into_iter().filter(|r| r.requested_by == claims.sub).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(mine))
}

route!(cancellation_for_order => Get "/orders/{id}/cancellation-request" impl OrderManagement where requires [Role::User]);
/// The most recent cancellation request for an order, visible to the order's participants.
pub async fn cancellation_for_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET cancellation request for order [{order_id}]");
    let _ = fetch_visible_order(&claims, &order_id, api.as_ref()).await?;
    let request = api.fetch_cancellation_request_for_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(confirm_received => Post "/orders/{id}/confirm-received" impl EscrowDatabase, OrderManagement where requires [Role::User]);
/// Buyer confirmation of receipt. Completes the order and queues the seller's payout.
pub async fn confirm_received<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST confirm received for order [{order_id}] by {}", claims.sub);
    let (order, release) = api.confirm_received(&order_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "fund_release": release })))
}

route!(update_order_status => Patch "/orders/{id}/status" impl EscrowDatabase, OrderManagement where requires [Role::User]);
/// Moves an order to a new status, subject to the lifecycle transition table. Sellers may only move their own
/// orders between the fulfilment states; admins can make any legal transition.
pub async fn update_order_status<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<SetStatusParams>,
    flow: web::Data<OrderFlowApi<B>>,
    query: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let status = body.status;
    debug!("💻️ PATCH order [{order_id}] status to {status} by {}", claims.sub);
    if !claims.role.is_admin() {
        let order = query
            .fetch_order(&order_id)
            .await?
            .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
        if order.seller_id != claims.sub {
            return Err(ServerError::NoRecordFound(format!("Order {order_id}")));
        }
        let seller_may_set =
            matches!(status, OrderStatusType::Processing | OrderStatusType::Shipped | OrderStatusType::Delivered);
        if !seller_may_set {
            return Err(OrderFlowError::Forbidden(format!("Sellers cannot move an order to {status}")).into());
        }
    }
    let order = flow.set_order_status(&order_id, status, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(payment_for_order => Get "/payments/order/{order_id}" impl OrderManagement where requires [Role::User]);
pub async fn payment_for_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET payment for order [{order_id}]");
    let _ = fetch_visible_order(&claims, &order_id, api.as_ref()).await?;
    let payment = api
        .fetch_payment_for_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Payment for order {order_id}")))?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Proofs  ----------------------------------------------------

route!(submit_proof => Post "/payment-proofs" impl EscrowDatabase, OrderManagement);
/// Lodges a payment proof against an order and moves it into verification.
///
/// The payment page allows submissions without an account, so authentication is optional. Anonymous submissions
/// must identify the buyer in the body; authenticated ones take the identity from the token. The first submitter
/// becomes the order's buyer.
pub async fn submit_proof<B: EscrowDatabase + OrderManagement>(
    auth: MaybeAuthenticated,
    body: web::Json<SubmitProofParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    let submitted_by = match auth.0 {
        Some(claims) => claims.sub,
        None => params.buyer_id.clone().ok_or_else(|| {
            OrderFlowError::ValidationError("A buyer_id is required for anonymous proof submissions".to_string())
        })?,
    };
    debug!("💻️ POST payment proof for order [{}] by {submitted_by}", params.order_id);
    let proof = NewPaymentProof {
        order_id: params.order_id,
        amount: params.amount,
        proof_url: params.proof_url,
        note: params.note,
    };
    let (proof, order) = api.submit_payment_proof(proof, &submitted_by).await?;
    Ok(HttpResponse::Created().json(json!({ "proof": proof, "order": order })))
}

route!(pending_proofs => Get "/admin/payment-proofs" impl OrderManagement where requires [Role::Admin]);
/// The verification queue: proofs still waiting for an admin verdict, oldest first.
pub async fn pending_proofs<B: OrderManagement>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET pending payment proofs");
    let proofs = api.fetch_pending_proofs().await?;
    Ok(HttpResponse::Ok().json(proofs))
}

route!(review_proof => Patch "/admin/payment-proofs/{id}" impl EscrowDatabase, OrderManagement where requires [Role::Admin]);
/// Applies an admin verdict to a payment proof. Approval puts the buyer's money in escrow; rejection reopens the
/// order for payment.
pub async fn review_proof<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ProofReviewParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let proof_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ PATCH proof [{proof_id}]: {} by {}", params.action, claims.sub);
    let rejection_reason = match params.action {
        ReviewDecision::Reject => params.rejection_reason,
        ReviewDecision::Approve => None,
    };
    let (proof, order) = api.review_payment_proof(&proof_id, params.action, &claims.sub, rejection_reason).await?;
    Ok(HttpResponse::Ok().json(json!({ "proof": proof, "order": order })))
}

//----------------------------------------------   Admin: orders  ----------------------------------------------------

route!(orders_search => Get "/admin/orders" impl OrderManagement where requires [Role::Admin]);
/// Admin search across all orders. All query parameters are optional and combine with AND.
pub async fn orders_search<B: OrderManagement>(
    query: web::Query<OrderSearchQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let q = query.into_inner();
    let mut filter = OrderQueryFilter::default();
    if let Some(order_id) = q.order_id {
        filter = filter.with_order_id(order_id);
    }
    if let Some(number) = q.order_number {
        filter = filter.with_order_number(number);
    }
    if let Some(seller_id) = q.seller_id {
        filter = filter.with_seller_id(seller_id);
    }
    if let Some(buyer_id) = q.buyer_id {
        filter = filter.with_buyer_id(buyer_id);
    }
    if let Some(since) = q.since {
        filter = filter.since(since);
    }
    if let Some(until) = q.until {
        filter = filter.until(until);
    }
    if let Some(status) = q.status {
        filter = filter.with_status(status);
    }
    debug!("💻️ GET admin order search. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(deliver_order => Patch "/admin/orders/{id}/deliver" impl EscrowDatabase, OrderManagement where requires [Role::Admin]);
/// Admin confirmation that the goods reached the buyer. Queues the seller's payout.
pub async fn deliver_order<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ PATCH deliver order [{order_id}] by {}", claims.sub);
    let (order, release) = api.mark_delivered(&order_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "fund_release": release })))
}

//----------------------------------------------   Admin: cancellations  ----------------------------------------------

route!(cancellation_requests => Get "/admin/cancellation-requests" impl OrderManagement where requires [Role::Admin]);
pub async fn cancellation_requests<B: OrderManagement>(
    query: web::Query<StatusQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cancellation requests");
    let requests = api.fetch_cancellation_requests(query.into_inner().status).await?;
    Ok(HttpResponse::Ok().json(requests))
}

route!(review_cancellation => Patch "/admin/cancellation-requests/{id}" impl EscrowDatabase, OrderManagement where requires [Role::Admin]);
/// Applies an admin verdict to a pending cancellation request. Approval cancels the order.
pub async fn review_cancellation<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<CancellationReviewParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ PATCH cancellation request [{request_id}]: {} by {}", params.action, claims.sub);
    let (request, order) =
        api.review_cancellation_request(&request_id, params.action, &claims.sub, params.admin_notes).await?;
    Ok(HttpResponse::Ok().json(json!({ "request": request, "order": order })))
}

//----------------------------------------------   Admin: fund releases  ----------------------------------------------

route!(fund_releases => Get "/admin/fund-releases" impl OrderManagement where requires [Role::Admin]);
/// Payouts that still need to be transferred to sellers, oldest first.
pub async fn fund_releases<B: OrderManagement>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET pending fund releases");
    let releases = api.fetch_pending_fund_releases().await?;
    Ok(HttpResponse::Ok().json(releases))
}

route!(complete_fund_release => Patch "/admin/fund-releases/{order_id}" impl EscrowDatabase, OrderManagement where requires [Role::Admin]);
/// Records the transfer of the seller's payout and completes the order. A release can only be completed once.
pub async fn complete_fund_release<B: EscrowDatabase + OrderManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<FundReleaseParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let params = body.into_inner();
    debug!("💻️ PATCH complete fund release for order [{order_id}] by {}", claims.sub);
    let (release, order) =
        api.complete_fund_release(&order_id, &claims.sub, params.transfer_proof, params.transfer_note).await?;
    Ok(HttpResponse::Ok().json(json!({ "fund_release": release, "order": order })))
}

//----------------------------------------------   QRIS  ----------------------------------------------------

route!(upload_qris => Post "/admin/qris/upload" impl QrisManagement where requires [Role::Admin]);
/// Uploads and activates a static QRIS payload. Any previously active configuration is deactivated.
pub async fn upload_qris<B: QrisManagement>(
    claims: JwtClaims,
    body: web::Json<QrisUploadParams>,
    api: web::Data<QrisApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST QRIS configuration upload by {}", claims.sub);
    let params = body.into_inner();
    let settings =
        api.upload_settings(params.qris_data, params.merchant_name, params.merchant_city, &claims.sub).await?;
    Ok(HttpResponse::Created().json(settings))
}

route!(current_qris => Get "/admin/qris/current" impl QrisManagement where requires [Role::Admin]);
pub async fn current_qris<B: QrisManagement>(api: web::Data<QrisApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET active QRIS configuration");
    let settings = api
        .active_settings()
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("No active QRIS configuration".to_string()))?;
    Ok(HttpResponse::Ok().json(settings))
}

route!(delete_qris => Delete "/admin/qris/{id}" impl QrisManagement where requires [Role::Admin]);
pub async fn delete_qris<B: QrisManagement>(
    path: web::Path<String>,
    api: web::Data<QrisApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE QRIS configuration [{id}]");
    api.delete_settings(&id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("QRIS configuration {id} deleted"))))
}

route!(generate_qris => Post "/qris/generate" impl QrisManagement where requires [Role::User]);
/// Generates a dynamic QRIS payload with the amount embedded, valid for 30 minutes.
pub async fn generate_qris<B: QrisManagement>(
    claims: JwtClaims,
    body: web::Json<QrisGenerateParams>,
    api: web::Data<QrisApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST generate QRIS payment of {} for {}", params.amount, claims.sub);
    let (tx, settings) = api.generate_payment(&claims.sub, params.amount, params.order_id).await?;
    Ok(HttpResponse::Created().json(QrisPaymentResult::new(tx, &settings)))
}

route!(qris_transaction => Get "/qris/transaction/{id}" impl QrisManagement where requires [Role::User]);
/// Re-displays a generated payment while it is still valid. Users only ever see their own transactions.
pub async fn qris_transaction<B: QrisManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<QrisApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET QRIS transaction [{id}] for {}", claims.sub);
    let tx = api.fetch_transaction(&id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(tx))
}

//----------------------------------------------   Helpers  ----------------------------------------------------

/// Fetches an order if the caller is allowed to see it. Strangers get the same answer as for an order that does not
/// exist.
async fn fetch_visible_order<B: OrderManagement>(
    claims: &JwtClaims,
    order_id: &OrderId,
    api: &OrderQueryApi<B>,
) -> Result<Order, ServerError> {
    let order =
        api.fetch_order(order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    let is_participant = order.seller_id == claims.sub || order.buyer_id.as_deref() == Some(claims.sub.as_str());
    if claims.role.is_admin() || is_participant {
        Ok(order)
    } else {
        Err(ServerError::NoRecordFound(format!("Order {order_id}")))
    }
}
