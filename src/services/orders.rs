//! Order lifecycle and the periodic status sweep.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CreateOrder, Order, OrderFilter, OrderStatus, StatusUpdate},
    repository::{RepoResult, Repository},
};

/// Statuses the sweep looks at; everything else is left to people.
const SWEPT_STATUSES: [OrderStatus; 2] = [OrderStatus::NewOrder, OrderStatus::Pending];

#[derive(Debug, Clone, Copy)]
pub struct SweepPolicy {
    /// Age after which a `pending` order with no delivery time is completed.
    pub completion_window: ChronoDuration,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            completion_window: ChronoDuration::hours(2),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub advanced: usize,
    pub conflicts: usize,
    pub failed: usize,
}

fn is_due(order: &Order, now: DateTime<Utc>, policy: SweepPolicy) -> bool {
    match order.delivery_date_time {
        Some(at) => at <= now,
        None => order.created_at + policy.completion_window <= now,
    }
}

/// The status an order should settle at given the rules:
///
/// - `neworder` with every line confirmed becomes `pending`
/// - `pending` past its delivery time (or the completion window) becomes `completed`
///
/// Rules are applied until none matches, so the result is a fixed point and
/// a second evaluation at the same instant yields the same status.
pub fn settle_status(order: &Order, now: DateTime<Utc>, policy: SweepPolicy) -> OrderStatus {
    let mut status = order.status;
    loop {
        status = match status {
            OrderStatus::NewOrder if order.all_lines_confirmed() => OrderStatus::Pending,
            OrderStatus::Pending if is_due(order, now, policy) => OrderStatus::Completed,
            settled => return settled,
        };
    }
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn Repository>,
    policy: SweepPolicy,
}

impl OrderService {
    pub fn new(repo: Arc<dyn Repository>, policy: SweepPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn create_order(&self, request: CreateOrder) -> Result<Order, AppError> {
        if request.tab.trim().is_empty() {
            return Err(AppError::Validation("tab is required".to_string()));
        }
        if request.payment_method.trim().is_empty() {
            return Err(AppError::Validation("paymentMethod is required".to_string()));
        }
        let order = request.into_order(Utc::now());
        self.repo.insert_order(&order).await?;
        log::info!("Created order {} ({})", order.order_id, order.status);
        Ok(order)
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders(filter).await?)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.repo
            .find_order(id)
            .await?
            .ok_or(AppError::NotFound("Order"))
    }

    /// User-initiated status change, guarded by the order's version so it
    /// cannot silently overwrite a concurrent sweep or another user.
    pub async fn update_status(&self, id: Uuid, update: StatusUpdate) -> Result<Order, AppError> {
        let current = self.get_order(id).await?;
        let expected = update.version.unwrap_or(current.version);

        if !self.repo.update_order_status(id, expected, update.status).await? {
            return Err(AppError::Conflict(format!(
                "order {} is no longer at version {}",
                current.order_id, expected
            )));
        }
        log::info!(
            "Order {} moved from {} to {}",
            current.order_id,
            current.status,
            update.status
        );
        self.get_order(id).await
    }

    /// One pass over in-flight orders. A failure on one order is logged and
    /// counted; the pass carries on with the rest.
    pub async fn run_status_sweep(&self, now: DateTime<Utc>) -> RepoResult<SweepReport> {
        let candidates = self.repo.list_orders_in(&SWEPT_STATUSES).await?;
        let mut report = SweepReport::default();

        for candidate in candidates {
            report.examined += 1;
            let order = match candidate {
                Ok(order) => order,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Skipping unreadable order: {}", e);
                    continue;
                }
            };
            let target = settle_status(&order, now, self.policy);
            if target == order.status {
                continue;
            }

            match self
                .repo
                .update_order_status(order.id, order.version, target)
                .await
            {
                Ok(true) => {
                    report.advanced += 1;
                    log::info!("Order {} advanced {} -> {}", order.order_id, order.status, target);
                }
                Ok(false) => {
                    report.conflicts += 1;
                    log::warn!(
                        "Order {} changed while the sweep was running; leaving it for the next pass",
                        order.order_id
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to update status of order {}: {}", order.order_id, e);
                }
            }
        }

        Ok(report)
    }
}

/// Starts the periodic sweep on its own task. The first pass runs immediately.
pub fn spawn_status_sweep(service: OrderService, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            log::info!("Running scheduled task to update order status");
            match service.run_status_sweep(Utc::now()).await {
                Ok(report) => log::info!(
                    "Order sweep done: {} examined, {} advanced, {} conflicts, {} failed",
                    report.examined,
                    report.advanced,
                    report.conflicts,
                    report.failed
                ),
                Err(e) => log::error!("Order sweep could not load orders: {}", e),
            }
        }
    })
}
