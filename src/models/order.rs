use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    NewOrder,
    Pending,
    Completed,
    Delivered,
    Received,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Draft,
        Self::NewOrder,
        Self::Pending,
        Self::Completed,
        Self::Delivered,
        Self::Received,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::NewOrder => "neworder",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Delivered => "delivered",
            Self::Received => "received",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub sending_qty: Decimal,
    pub price: Decimal,
    pub unit: String,
    pub gst_rate: Decimal,
    pub product_total: Decimal,
    #[serde(rename = "productGST")]
    pub product_gst: Decimal,
    #[serde(default)]
    pub bminstock: Decimal,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_id: String,
    pub bill_no: Option<String>,
    pub branch_id: Uuid,
    pub tab: String,
    pub products: Vec<OrderLine>,
    pub payment_method: String,
    pub subtotal: Decimal,
    #[serde(rename = "totalGST")]
    pub total_gst: Decimal,
    #[serde(rename = "totalWithGST")]
    pub total_with_gst: Decimal,
    pub total_items: i32,
    pub status: OrderStatus,
    pub waiter_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub delivery_date_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Order {
    pub fn all_lines_confirmed(&self) -> bool {
        !self.products.is_empty() && self.products.iter().all(|line| line.confirmed)
    }
}

/// Request body for placing an order. Totals are computed by the caller and
/// stored as given.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub branch_id: Uuid,
    pub tab: String,
    pub products: Vec<OrderLine>,
    pub payment_method: String,
    pub subtotal: Decimal,
    #[serde(rename = "totalGST")]
    pub total_gst: Decimal,
    #[serde(rename = "totalWithGST")]
    pub total_with_gst: Decimal,
    pub total_items: i32,
    #[serde(default)]
    pub status: OrderStatus,
    pub bill_no: Option<String>,
    pub waiter_id: Option<Uuid>,
    pub table_id: Option<Uuid>,
    pub delivery_date_time: Option<DateTime<Utc>>,
}

impl CreateOrder {
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_id: generate_order_id(now),
            bill_no: self.bill_no.filter(|b| !b.trim().is_empty()),
            branch_id: self.branch_id,
            tab: self.tab,
            products: self.products,
            payment_method: self.payment_method,
            subtotal: self.subtotal,
            total_gst: self.total_gst,
            total_with_gst: self.total_with_gst,
            total_items: self.total_items,
            status: self.status,
            waiter_id: self.waiter_id,
            table_id: self.table_id,
            delivery_date_time: self.delivery_date_time,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

/// `ORD-<epoch millis>-<0..999>`
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("ORD-{}-{}", now.timestamp_millis(), suffix)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    /// When given, the update only applies if the order is still at this version.
    pub version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::NewOrder).unwrap(), "\"neworder\"");
    }

    #[test]
    fn order_id_has_expected_shape() {
        let now = Utc::now();
        let id = generate_order_id(now);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert!(parts[2].parse::<u16>().unwrap() < 1000);
    }

    #[test]
    fn create_order_defaults_to_draft() {
        let body = serde_json::json!({
            "branchId": Uuid::new_v4(),
            "tab": "dine-in",
            "products": [{
                "productId": Uuid::new_v4(),
                "name": "Black Forest",
                "quantity": 1,
                "price": 500,
                "unit": "kg",
                "gstRate": 5,
                "productTotal": 500,
                "productGST": 25
            }],
            "paymentMethod": "cash",
            "subtotal": 500,
            "totalGST": 25,
            "totalWithGST": 525,
            "totalItems": 1
        });
        let req: CreateOrder = serde_json::from_value(body).unwrap();
        let order = req.into_order(Utc::now());
        assert_eq!(order.status, OrderStatus::Draft);
        assert!(!order.products[0].confirmed);
        assert_eq!(order.products[0].sending_qty, Decimal::ZERO);
        assert_eq!(order.version, 0);
    }
}
