use chrono::Duration;
use log::*;
use rekber_payment_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the auto-cancel worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_auto_cancel_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    payment_deadline: Duration,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let api = OrderFlowApi::new(db, producers);
        info!(
            "🕰️ Auto-cancel worker started. Orders left unpaid for more than {} hrs will be swept.",
            payment_deadline.num_hours()
        );
        loop {
            timer.tick().await;
            info!("🕰️ Running unpaid order sweep");
            match api.cancel_expired_orders(payment_deadline).await {
                Ok(cancelled) if cancelled.is_empty() => debug!("🕰️ No orders missed the payment deadline"),
                Ok(cancelled) => info!("🕰️ {} orders auto-cancelled: {}", cancelled.len(), order_list(&cancelled)),
                Err(e) => error!("🕰️ Error running the unpaid order sweep: {e}"),
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders.iter().map(|o| format!("[{}] seller: {}", o.order_number, o.seller_id)).collect::<Vec<String>>().join(", ")
}
