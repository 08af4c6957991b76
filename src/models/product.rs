use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const PRODUCT_ID_WIDTH: usize = 5;
pub const MAX_PRODUCT_NUMBER: u32 = 99_999;
pub const DEFAULT_UNIT: &str = "kg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductIdError {
    #[error("product id {0} does not fit in five digits")]
    Exhausted(u64),

    #[error("malformed product id {0:?}")]
    Malformed(String),
}

/// Zero-padded, five digit, human readable product number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn from_number(n: u64) -> Result<Self, ProductIdError> {
        if n == 0 || n > MAX_PRODUCT_NUMBER as u64 {
            return Err(ProductIdError::Exhausted(n));
        }
        Ok(Self(format!("{n:0width$}", width = PRODUCT_ID_WIDTH)))
    }

    pub fn parse(raw: &str) -> Result<Self, ProductIdError> {
        if raw.len() != PRODUCT_ID_WIDTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProductIdError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "cake")]
    Cake,
    #[serde(rename = "non-cake")]
    NonCake,
}

impl ProductType {
    pub fn from_cake_flag(is_cake: bool) -> Self {
        if is_cake {
            Self::Cake
        } else {
            Self::NonCake
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cake => "cake",
            Self::NonCake => "non-cake",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cake" => Some(Self::Cake),
            "non-cake" => Some(Self::NonCake),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CakeType {
    FreshCream,
    ButterCream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetail {
    pub price: Decimal,
    pub rate: Decimal,
    pub offer_percent: Decimal,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cake_type: Option<CakeType>,
    pub gst: Decimal,
}

/// A pricing tier as submitted by a client, before defaults and validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetailInput {
    pub price: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub offer_percent: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub cake_type: Option<CakeType>,
    pub gst: Option<Decimal>,
}

#[derive(Debug, Error, PartialEq)]
#[error("price tier {index}: {reason}")]
pub struct PriceTierError {
    pub index: usize,
    pub reason: String,
}

/// Context for turning raw tiers into stored ones.
#[derive(Debug, Clone, Copy)]
pub struct TierContext<'a> {
    pub is_cake: bool,
    /// Tiers already stored on the product; empty when creating.
    pub existing: &'a [PriceDetail],
    /// On update a cake type is only kept for tiers sold by the kilogram.
    pub cake_type_requires_kg: bool,
}

impl PriceDetailInput {
    pub fn resolve(self, index: usize, ctx: TierContext<'_>) -> Result<PriceDetail, PriceTierError> {
        let fail = |reason: &str| PriceTierError {
            index,
            reason: reason.to_string(),
        };

        let unit = match self.unit {
            Some(u) if u.trim().is_empty() => return Err(fail("unit must not be empty")),
            Some(u) => u.trim().to_string(),
            None => DEFAULT_UNIT.to_string(),
        };
        let price = self.price.unwrap_or(Decimal::ZERO);
        let rate = match self.rate {
            Some(rate) => rate,
            None if !price.is_zero() => price,
            None => ctx
                .existing
                .iter()
                .find(|tier| tier.unit == unit)
                .map(|tier| tier.rate)
                .unwrap_or(Decimal::ZERO),
        };
        let offer_percent = self.offer_percent.unwrap_or(Decimal::ZERO);
        let quantity = self.quantity.unwrap_or(Decimal::ONE);
        let gst = self.gst.unwrap_or(Decimal::ZERO);

        if price.is_sign_negative() || rate.is_sign_negative() {
            return Err(fail("price and rate must not be negative"));
        }
        if gst.is_sign_negative() {
            return Err(fail("gst must not be negative"));
        }
        if offer_percent.is_sign_negative() || offer_percent > Decimal::ONE_HUNDRED {
            return Err(fail("offerPercent must be between 0 and 100"));
        }
        if quantity <= Decimal::ZERO {
            return Err(fail("quantity must be positive"));
        }

        let cake_allowed = ctx.is_cake && (!ctx.cake_type_requires_kg || unit == DEFAULT_UNIT);
        let cake_type = self.cake_type.filter(|_| cake_allowed);

        Ok(PriceDetail {
            price,
            rate,
            offer_percent,
            quantity,
            unit,
            cake_type,
            gst,
        })
    }
}

/// Parses the JSON-encoded `priceDetails` form field and applies defaults.
pub fn parse_price_details(
    raw: &str,
    ctx: TierContext<'_>,
) -> Result<Vec<PriceDetail>, PriceTierError> {
    let inputs: Vec<PriceDetailInput> = serde_json::from_str(raw).map_err(|e| PriceTierError {
        index: 0,
        reason: format!("malformed priceDetails: {e}"),
    })?;
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| input.resolve(i, ctx))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub product_id: ProductId,
    pub upc: String,
    pub barcode: String,
    pub name: String,
    pub category: Option<Uuid>,
    pub album: Option<Uuid>,
    pub product_type: ProductType,
    pub description: String,
    pub food_notes: String,
    pub ingredients: String,
    pub available: bool,
    pub is_veg: bool,
    pub is_pastry: bool,
    pub images: Vec<String>,
    pub price_details: Vec<PriceDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_cake(&self) -> bool {
        self.product_type == ProductType::Cake
    }
}

/// Text fields and flags of a create or update request. Every field is
/// optional so the same shape serves partial updates.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub category: Option<Uuid>,
    pub album: Option<Uuid>,
    pub description: Option<String>,
    pub food_notes: Option<String>,
    pub ingredients: Option<String>,
    pub available: Option<bool>,
    pub is_veg: Option<bool>,
    pub is_cake_product: Option<bool>,
    pub is_pastry: Option<bool>,
    /// Raw JSON from the `priceDetails` field, resolved once the product
    /// type is known.
    pub price_details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn create_ctx(is_cake: bool) -> TierContext<'static> {
        TierContext {
            is_cake,
            existing: &[],
            cake_type_requires_kg: false,
        }
    }

    #[test]
    fn product_ids_are_zero_padded() {
        assert_eq!(ProductId::from_number(1).unwrap().as_str(), "00001");
        assert_eq!(ProductId::from_number(43).unwrap().as_str(), "00043");
        assert_eq!(ProductId::from_number(99_999).unwrap().as_str(), "99999");
    }

    #[test]
    fn product_id_space_is_bounded() {
        assert_eq!(
            ProductId::from_number(100_000),
            Err(ProductIdError::Exhausted(100_000))
        );
        assert_eq!(ProductId::from_number(0), Err(ProductIdError::Exhausted(0)));
        assert!(ProductId::parse("123").is_err());
        assert!(ProductId::parse("12a45").is_err());
    }

    #[test]
    fn tiers_get_defaults() {
        let tiers = parse_price_details(r#"[{"price": 450}]"#, create_ctx(false)).unwrap();
        let tier = &tiers[0];
        assert_eq!(tier.price, dec("450"));
        assert_eq!(tier.rate, dec("450"));
        assert_eq!(tier.offer_percent, Decimal::ZERO);
        assert_eq!(tier.quantity, Decimal::ONE);
        assert_eq!(tier.unit, "kg");
        assert_eq!(tier.gst, Decimal::ZERO);
        assert_eq!(tier.cake_type, None);
    }

    #[test]
    fn cake_type_only_kept_for_cakes() {
        let raw = r#"[{"price": 900, "cakeType": "freshCream"}]"#;
        let cake = parse_price_details(raw, create_ctx(true)).unwrap();
        assert_eq!(cake[0].cake_type, Some(CakeType::FreshCream));

        let bread = parse_price_details(raw, create_ctx(false)).unwrap();
        assert_eq!(bread[0].cake_type, None);
    }

    #[test]
    fn update_keeps_cake_type_only_for_kg_tiers() {
        let ctx = TierContext {
            is_cake: true,
            existing: &[],
            cake_type_requires_kg: true,
        };
        let raw = r#"[{"price": 90, "unit": "piece", "cakeType": "butterCream"},
                      {"price": 900, "unit": "kg", "cakeType": "butterCream"}]"#;
        let tiers = parse_price_details(raw, ctx).unwrap();
        assert_eq!(tiers[0].cake_type, None);
        assert_eq!(tiers[1].cake_type, Some(CakeType::ButterCream));
    }

    #[test]
    fn rate_falls_back_to_existing_tier_with_same_unit() {
        let existing = vec![PriceDetail {
            price: dec("100"),
            rate: dec("95"),
            offer_percent: Decimal::ZERO,
            quantity: Decimal::ONE,
            unit: "piece".to_string(),
            cake_type: None,
            gst: dec("5"),
        }];
        let ctx = TierContext {
            is_cake: false,
            existing: &existing,
            cake_type_requires_kg: true,
        };
        let tiers = parse_price_details(r#"[{"unit": "piece"}]"#, ctx).unwrap();
        assert_eq!(tiers[0].rate, dec("95"));
    }

    #[test]
    fn malformed_tiers_are_rejected() {
        let ctx = create_ctx(true);
        assert!(parse_price_details("not json", ctx).is_err());
        assert!(parse_price_details(r#"[{"price": -1}]"#, ctx).is_err());
        assert!(parse_price_details(r#"[{"offerPercent": 120}]"#, ctx).is_err());
        assert!(parse_price_details(r#"[{"quantity": 0}]"#, ctx).is_err());
        assert!(parse_price_details(r#"[{"unit": " "}]"#, ctx).is_err());
        assert!(parse_price_details(r#"[{"cakeType": "icecream"}]"#, ctx).is_err());

        let err = parse_price_details(r#"[{"price": 1}, {"gst": -5}]"#, ctx).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn duplicate_units_are_allowed() {
        let raw = r#"[{"price": 1, "unit": "kg"}, {"price": 2, "unit": "kg"}]"#;
        assert_eq!(parse_price_details(raw, create_ctx(false)).unwrap().len(), 2);
    }
}
