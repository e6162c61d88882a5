use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Local;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::CartRepository;
use crate::config::CheckoutConfig;
use crate::inventory::{InventoryService, StockMovement, TransactionReference, TransactionType};
use crate::models::MysteryBox;
use crate::notifications::{NewNotification, NotificationKind, NotificationRepository};
use crate::orders::{
    digits_only, format_order_number, AdminOrderQuery, CheckoutItem, CheckoutRequest, NewOrder, Order,
    OrderDetail, OrderError, OrderStatus, OrdersRepository, PriceCalculator, PricedItem, PublicTracking,
    RefundRequest, StatusMachine, TrackingUpdateRequest,
};
use crate::referrals::{ReferralRules, ReferralService};

/// Attempts at a status compare-and-swap before giving up
pub const MAX_STATUS_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 25;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Backoff before retry number `attempt + 1`: 25ms, 50ms, 100ms...
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS << attempt.min(8))
}

/// Snapshot names and prices of the requested boxes
///
/// Every box must be present in `boxes` and appear only once in the request.
pub fn price_items(items: &[CheckoutItem], boxes: &HashMap<i32, MysteryBox>) -> Result<Vec<PricedItem>, OrderError> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| {
            if !seen.insert(item.box_id) {
                return Err(OrderError::ValidationError(format!(
                    "Box {} appears more than once in the order",
                    item.box_id
                )));
            }
            let mystery_box = boxes.get(&item.box_id).ok_or(OrderError::BoxNotFound(item.box_id))?;
            Ok(PricedItem {
                box_id: mystery_box.id,
                name: mystery_box.name.clone(),
                unit_price: mystery_box.price,
                quantity: item.quantity,
                line_total: PriceCalculator::line_total(item.quantity, mystery_box.price),
                personalization: item.personalization.clone(),
            })
        })
        .collect()
}

/// Refund amount to store; defaults to the whole order total
pub fn refund_amount(order_total: Decimal, requested: Option<Decimal>) -> Result<Decimal, OrderError> {
    let amount = requested.unwrap_or(order_total);
    if amount <= Decimal::ZERO {
        return Err(OrderError::ValidationError("Refund amount must be positive".to_string()));
    }
    if amount > order_total {
        return Err(OrderError::RefundExceedsTotal {
            requested: amount,
            total: order_total,
        });
    }
    Ok(amount)
}

/// Statuses an admin may set directly; a refund needs an amount and reason
pub fn check_manual_status(status: OrderStatus) -> Result<(), OrderError> {
    if status == OrderStatus::Refunded {
        return Err(OrderError::ValidationError(
            "Use POST /api/admin/orders/{id}/refund to refund an order".to_string(),
        ));
    }
    Ok(())
}

/// Whether a phone given on the tracking page matches the shipping phone
pub fn phone_matches(given: &str, order: &Order) -> bool {
    let given = digits_only(given);
    !given.is_empty() && given == order.shipping_address.phone_digits()
}

fn status_notification(order: &Order, description: &str) -> NewNotification {
    let kind = match order.status {
        OrderStatus::Refunded => NotificationKind::OrderRefunded,
        _ => NotificationKind::OrderStatus,
    };
    NewNotification {
        user_id: order.user_id,
        kind,
        title: format!("Order {} is {}", order.order_number, order.status),
        message: description.to_string(),
    }
}

/// Service for order business logic
#[derive(Clone)]
pub struct OrderService {
    repository: OrdersRepository,
    referrals: ReferralService,
    notifications: NotificationRepository,
    checkout: CheckoutConfig,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        referrals: ReferralService,
        notifications: NotificationRepository,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            repository: OrdersRepository::new(pool),
            referrals,
            notifications,
            checkout,
        }
    }

    /// Place an order
    ///
    /// Prices are snapshotted from the active boxes and an optional referral code is
    /// quoted first. The order number, order rows, sale ledger entries and referral
    /// usage are then written in one transaction, so a stock shortfall or an exhausted
    /// code leaves nothing behind. Ordered boxes leave the cart in the same transaction.
    pub async fn checkout(&self, user_id: i32, request: CheckoutRequest) -> Result<OrderDetail, OrderError> {
        request
            .validate_all()
            .map_err(|e| OrderError::ValidationError(e.to_string()))?;

        let box_ids: Vec<i32> = request.items.iter().map(|item| item.box_id).collect();
        let boxes: HashMap<i32, MysteryBox> = self
            .repository
            .find_active_boxes(&box_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let mut priced = price_items(&request.items, &boxes)?;
        // Lock box rows in a fixed order so concurrent checkouts cannot deadlock
        priced.sort_by_key(|item| item.box_id);

        let line_totals: Vec<Decimal> = priced.iter().map(|item| item.line_total).collect();
        let subtotal = PriceCalculator::calculate_subtotal(&line_totals);

        let quote = match request.referral_code.as_deref() {
            Some(code) => Some(self.referrals.validate_and_apply(code, user_id, subtotal).await?),
            None => None,
        };
        let discount = quote.as_ref().map(|q| q.discount).unwrap_or(Decimal::ZERO);
        let rewards_earned = quote
            .as_ref()
            .map(|q| ReferralRules::points_for(&q.referral.reward))
            .and_then(|points| points.to_i32())
            .unwrap_or(0);

        let totals = PriceCalculator::calculate_total(
            &line_totals,
            PriceCalculator::shipping_for(subtotal, &self.checkout),
            PriceCalculator::tax_for(subtotal, &self.checkout),
            discount,
        );

        let billing_address = request
            .billing_address
            .clone()
            .unwrap_or_else(|| request.shipping_address.clone());

        let mut tx = self.repository.pool().begin().await?;

        let today = Local::now().date_naive();
        let sequence = OrdersRepository::next_sequence(&mut *tx, today).await?;
        let order = OrdersRepository::insert_order(
            &mut *tx,
            &NewOrder {
                order_number: format_order_number(today, sequence),
                user_id,
                totals,
                payment_method: request.payment_method,
                shipping_address: request.shipping_address,
                billing_address,
                notes: request.notes,
                referral_code: quote.as_ref().map(|q| q.referral.code.clone()),
                rewards_earned,
            },
        )
        .await?;

        let mut items = Vec::with_capacity(priced.len());
        for item in &priced {
            items.push(OrdersRepository::insert_item(&mut *tx, order.id, item).await?);
        }

        let placed = OrdersRepository::insert_timeline(
            &mut *tx,
            order.id,
            OrderStatus::Pending,
            OrderStatus::Pending.describe(),
            Some(user_id),
        )
        .await?;

        for item in &priced {
            let movement = StockMovement {
                box_id: item.box_id,
                transaction_type: TransactionType::Sale,
                quantity: item.quantity,
                reason: format!("Order {}", order.order_number),
                performed_by: user_id,
                reference: TransactionReference::for_order(order.id),
                unit_cost: Some(item.unit_price),
                notes: None,
            };
            InventoryService::record_transaction_in(&mut *tx, &movement).await?;
        }

        if let Some(quote) = &quote {
            ReferralService::record_usage_in(&mut *tx, &quote.referral, user_id, order.id, quote.discount).await?;
        }

        CartRepository::remove_boxes(&mut *tx, user_id, &box_ids).await?;

        tx.commit().await?;

        tracing::info!(
            "User {} placed order {} for {} ({} items)",
            user_id,
            order.order_number,
            order.total,
            items.len()
        );

        self.notifications
            .notify(NewNotification {
                user_id,
                kind: NotificationKind::OrderPlaced,
                title: format!("Order {} placed", order.order_number),
                message: format!("We received your order of {}.", order.total),
            })
            .await;

        Ok(OrderDetail {
            order,
            items,
            timeline: vec![placed],
            tracking_updates: Vec::new(),
        })
    }

    /// Move an order to `new_status` and append a timeline entry
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        description: Option<String>,
        updated_by: Option<i32>,
    ) -> Result<Order, OrderError> {
        check_manual_status(new_status)?;
        self.change_status(order_id, new_status, description, updated_by, None).await
    }

    /// Refund an order through the regular status flow and record the refund details
    pub async fn refund(&self, order_id: Uuid, request: RefundRequest, admin_id: i32) -> Result<Order, OrderError> {
        let description = format!("Refunded: {}", request.reason);
        self.change_status(
            order_id,
            OrderStatus::Refunded,
            Some(description),
            Some(admin_id),
            Some(request),
        )
        .await
    }

    async fn change_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        description: Option<String>,
        updated_by: Option<i32>,
        refund: Option<RefundRequest>,
    ) -> Result<Order, OrderError> {
        let description = description.unwrap_or_else(|| new_status.describe().to_string());

        for attempt in 0..MAX_STATUS_ATTEMPTS {
            let order = self.repository.find_by_id(order_id).await?.ok_or(OrderError::NotFound)?;
            StatusMachine::transition(order.status, new_status)?;
            let refund = match &refund {
                Some(request) => Some((refund_amount(order.total, request.amount)?, request.reason.as_str())),
                None => None,
            };

            let mut tx = self.repository.pool().begin().await?;

            let Some(mut updated) =
                OrdersRepository::compare_and_set_status(&mut *tx, order.id, order.version, new_status).await?
            else {
                drop(tx);
                tracing::warn!(
                    "Order {} changed during status update (attempt {}), retrying",
                    order.order_number,
                    attempt + 1
                );
                if attempt + 1 < MAX_STATUS_ATTEMPTS {
                    tokio::time::sleep(retry_delay(attempt)).await;
                }
                continue;
            };

            OrdersRepository::insert_timeline(&mut *tx, order.id, new_status, &description, updated_by).await?;

            if new_status == OrderStatus::Cancelled {
                let mut items = OrdersRepository::items_in(&mut *tx, order.id).await?;
                items.sort_by_key(|item| item.box_id);
                for item in items {
                    let movement = StockMovement {
                        box_id: item.box_id,
                        transaction_type: TransactionType::Return,
                        quantity: item.quantity,
                        reason: format!("Order {} cancelled", order.order_number),
                        performed_by: updated_by.unwrap_or(order.user_id),
                        reference: TransactionReference::for_order(order.id),
                        unit_cost: Some(item.unit_price),
                        notes: None,
                    };
                    InventoryService::record_transaction_in(&mut *tx, &movement).await?;
                }
                ReferralService::cancel_usage_in(&mut *tx, order.id).await?;
            }

            if let Some((amount, reason)) = refund {
                updated = OrdersRepository::set_refund(&mut *tx, order.id, amount, reason).await?;
            }

            tx.commit().await?;

            tracing::info!("Order {} moved from {} to {}", order.order_number, order.status, new_status);
            self.notifications
                .notify(status_notification(&updated, &description))
                .await;

            return Ok(updated);
        }

        tracing::error!(
            "Giving up on status update for order {} after {} attempts",
            order_id,
            MAX_STATUS_ATTEMPTS
        );
        Err(OrderError::Conflict)
    }

    /// Record a carrier update and return the refreshed order
    pub async fn add_tracking_update(
        &self,
        order_id: Uuid,
        request: TrackingUpdateRequest,
    ) -> Result<OrderDetail, OrderError> {
        let update = self
            .repository
            .add_tracking_update(order_id, &request)
            .await?
            .ok_or(OrderError::NotFound)?;

        let detail = self.admin_get(order_id).await?;
        tracing::info!("Tracking update '{}' on order {}", update.status, detail.order.order_number);

        self.notifications
            .notify(NewNotification {
                user_id: detail.order.user_id,
                kind: NotificationKind::OrderTracking,
                title: format!("Order {} tracking update", detail.order.order_number),
                message: update
                    .description
                    .clone()
                    .unwrap_or_else(|| update.status.clone()),
            })
            .await;

        Ok(detail)
    }

    async fn detail(&self, order: Order) -> Result<OrderDetail, OrderError> {
        let items = self.repository.items(order.id).await?;
        let timeline = self.repository.timeline(order.id).await?;
        let tracking_updates = self.repository.tracking_updates(order.id).await?;
        Ok(OrderDetail {
            order,
            items,
            timeline,
            tracking_updates,
        })
    }

    pub async fn list_user_orders(&self, user_id: i32) -> Result<Vec<Order>, OrderError> {
        self.repository.list_for_user(user_id).await
    }

    /// Order detail for its owner; other users see NotFound
    pub async fn get_user_order(&self, user_id: i32, order_id: Uuid) -> Result<OrderDetail, OrderError> {
        let order = self
            .repository
            .find_by_id(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(OrderError::NotFound)?;

        self.detail(order).await
    }

    pub async fn admin_list(&self, query: &AdminOrderQuery) -> Result<Vec<Order>, OrderError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let offset = i64::from(page - 1) * i64::from(limit);
        self.repository.list_all(query.status, i64::from(limit), offset).await
    }

    pub async fn admin_get(&self, order_id: Uuid) -> Result<OrderDetail, OrderError> {
        let order = self.repository.find_by_id(order_id).await?.ok_or(OrderError::NotFound)?;
        self.detail(order).await
    }

    /// Public tracking by order number; a phone mismatch looks like a missing order
    pub async fn track(&self, order_number: &str, phone: Option<&str>) -> Result<PublicTracking, OrderError> {
        let order = self
            .repository
            .find_by_number(order_number)
            .await?
            .ok_or(OrderError::NotFound)?;

        if let Some(phone) = phone {
            if !phone_matches(phone, &order) {
                tracing::debug!("Tracking phone mismatch for order {}", order.order_number);
                return Err(OrderError::NotFound);
            }
        }

        Ok(self.detail(order).await?.into())
    }
}
