use super::event::{CreatedEvent, TemplateId};
use crate::error::{BridgeError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Module holding the dual currency note (DCN) templates this bridge reacts to.
pub const DCN_MODULE: &str = "DA.RefApps.StructuredProducts.DCN";

/// Reason reported when a knock-out event carries none.
pub const UNKNOWN_REASON: &str = "unknown";

/// The sealed set of templates with a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    CouponEvent,
    KnockOutEvent,
    PaymentInstructions,
}

impl Template {
    pub const ALL: [Template; 3] = [
        Template::CouponEvent,
        Template::KnockOutEvent,
        Template::PaymentInstructions,
    ];

    pub fn entity_name(self) -> &'static str {
        match self {
            Template::CouponEvent => "CouponEvent",
            Template::KnockOutEvent => "KnockOutEvent",
            Template::PaymentInstructions => "PaymentInstructions",
        }
    }

    pub fn from_id(id: &TemplateId) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| id.matches(DCN_MODULE, t.entity_name()))
    }

    pub fn id(self, package_id: impl Into<String>) -> TemplateId {
        TemplateId::new(package_id, DCN_MODULE, self.entity_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAndCcy {
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingPrice {
    pub underlying: String,
    pub price: PriceAndCcy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCountFraction {
    pub numerator: i64,
    pub denominator: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponEvent {
    pub trade_id: String,
    pub product_id: String,
    pub coupon_rate: Decimal,
    pub day_count_fraction: DayCountFraction,
    pub event_time: DateTime<Utc>,
    pub strike_index1: PriceAndCcy,
    pub closing_price_index1: ClosingPrice,
    pub strike_index2: PriceAndCcy,
    pub closing_price_index2: ClosingPrice,
    pub issuer: String,
    pub owner: String,
    pub regulator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockOutEvent {
    pub trade_id: String,
    pub product_id: String,
    pub event_time: DateTime<Utc>,
    pub knock_out_level_index1: PriceAndCcy,
    pub closing_price_index1: ClosingPrice,
    pub knock_out_level_index2: PriceAndCcy,
    pub closing_price_index2: ClosingPrice,
    #[serde(default)]
    pub knock_out_reason: Option<String>,
    pub issuer: String,
    pub owner: String,
    pub regulator: String,
}

impl KnockOutEvent {
    pub fn reason(&self) -> &str {
        self.knock_out_reason.as_deref().unwrap_or(UNKNOWN_REASON)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub name: String,
    pub bic: String,
    pub iban: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstruction {
    pub payer_details: AccountDetails,
    pub payee_details: AccountDetails,
    pub transaction_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_date: DateTime<Utc>,
    pub regulator: String,
}

/// A created contract classified by template and decoded into its domain record.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    Coupon(CouponEvent),
    KnockOut(KnockOutEvent),
    Payment(PaymentInstruction),
    Other(TemplateId),
}

impl LedgerEvent {
    /// Decodes the contract arguments for a known template.
    ///
    /// Unknown templates never fail; a known template whose payload does not decode does.
    pub fn decode(event: CreatedEvent) -> Result<Self> {
        let Some(template) = Template::from_id(&event.template_id) else {
            return Ok(LedgerEvent::Other(event.template_id));
        };

        let arguments = Value::Object(event.arguments);
        let decoded = match template {
            Template::CouponEvent => LedgerEvent::Coupon(decode_as(&event.template_id, arguments)?),
            Template::KnockOutEvent => {
                LedgerEvent::KnockOut(decode_as(&event.template_id, arguments)?)
            }
            Template::PaymentInstructions => {
                LedgerEvent::Payment(decode_as(&event.template_id, arguments)?)
            }
        };
        Ok(decoded)
    }
}

fn decode_as<T: DeserializeOwned>(template: &TemplateId, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|source| BridgeError::DecodeError {
        template: template.to_string(),
        source,
    })
}
