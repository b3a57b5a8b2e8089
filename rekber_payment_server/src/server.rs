use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use rekber_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    OrderQueryApi,
    QrisApi,
    SqliteDatabase,
};

use crate::{
    auto_cancel_worker::start_auto_cancel_worker,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        CancelOrderRoute,
        CancellationForOrderRoute,
        CancellationRequestsRoute,
        CompleteFundReleaseRoute,
        ConfirmReceivedRoute,
        CurrentQrisRoute,
        DeleteQrisRoute,
        DeliverOrderRoute,
        FundReleasesRoute,
        GenerateQrisRoute,
        MyCancellationRequestsRoute,
        MyOrdersRoute,
        NewOrderRoute,
        OrderByIdRoute,
        OrderByNumberRoute,
        OrdersSearchRoute,
        PaymentForOrderRoute,
        PendingProofsRoute,
        QrisTransactionRoute,
        ReviewCancellationRoute,
        ReviewProofRoute,
        SubmitProofRoute,
        UpdateOrderStatusRoute,
        UploadQrisRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_auto_cancel_worker(db.clone(), producers.clone(), config.payment_deadline, config.sweep_interval_secs);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default notification hooks. A real push provider would subscribe here; until one is wired in, lifecycle
/// events are delivered to the log.
fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_proof_submitted(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ New payment proof for order [{}]. An admin should review it.",
                    ev.order.order_number
                );
            })
        })
        .on_order_paid(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Payment of {} verified for order [{}]. Notifying seller {}.",
                    ev.order.total_amount, ev.order.order_number, ev.order.seller_id
                );
            })
        })
        .on_order_cancelled(|ev| {
            Box::pin(async move {
                let by = ev.order.cancelled_by.as_deref().unwrap_or("unknown");
                info!("📬️ Order [{}] was cancelled by {by}.", ev.order.order_number);
            })
        })
        .on_order_completed(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Order [{}] is complete. {} released to seller {}.",
                    ev.order.order_number, ev.release.amount, ev.release.seller_id
                );
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let auth_config = config.auth.clone();
    let srv = HttpServer::new(move || {
        let flow_api = OrderFlowApi::new(db.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let qris_api = QrisApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rpg::access_log"))
            .app_data(web::Data::new(auth_config.clone()))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(qris_api))
            .service(health)
            // Literal order paths must register before `/orders/{id}`, or they get captured as ids
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(MyCancellationRequestsRoute::<SqliteDatabase>::new())
            .service(NewOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(CancellationForOrderRoute::<SqliteDatabase>::new())
            .service(ConfirmReceivedRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase>::new())
            .service(SubmitProofRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(DeliverOrderRoute::<SqliteDatabase>::new())
            .service(PendingProofsRoute::<SqliteDatabase>::new())
            .service(ReviewProofRoute::<SqliteDatabase>::new())
            .service(CancellationRequestsRoute::<SqliteDatabase>::new())
            .service(ReviewCancellationRoute::<SqliteDatabase>::new())
            .service(FundReleasesRoute::<SqliteDatabase>::new())
            .service(CompleteFundReleaseRoute::<SqliteDatabase>::new())
            .service(UploadQrisRoute::<SqliteDatabase>::new())
            .service(CurrentQrisRoute::<SqliteDatabase>::new())
            .service(DeleteQrisRoute::<SqliteDatabase>::new())
            .service(GenerateQrisRoute::<SqliteDatabase>::new())
            .service(QrisTransactionRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
