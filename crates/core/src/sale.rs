use serde::Deserialize;
use thiserror::Error;

use crate::types::{parse_timestamp, NewCommission};

/// Fixed share of every sale paid out as commission.
pub const COMMISSION_RATE: f64 = 0.05;

/// Upper bound on salesperson and product names, in characters.
pub const MAX_TEXT_LEN: usize = 100;

/// Largest accepted sale value. Keeps dashboard sums finite.
pub const MAX_SALE_VALUE: f64 = 1e12;

/// Computes the commission owed on a sale.
pub fn compute_commission(sale_value: f64) -> f64 {
    sale_value * COMMISSION_RATE
}

/// Request body accepted when registering a sale.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaleRequest {
    #[serde(default, rename = "vendedor")]
    pub salesperson: Option<String>,
    #[serde(default, rename = "produto")]
    pub product: Option<String>,
    #[serde(default, rename = "valor_venda")]
    pub sale_value: Option<SaleValueInput>,
    #[serde(default, rename = "data_venda")]
    pub sold_at: Option<String>,
}

/// Sale values arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SaleValueInput {
    Number(f64),
    Text(String),
}

impl SaleValueInput {
    fn parse(&self) -> Result<f64, ValidationError> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyField("valor_venda"));
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ValidationError::InvalidSaleValue(raw.clone()))?
            }
        };

        if !value.is_finite() {
            return Err(ValidationError::InvalidSaleValue(value.to_string()));
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeSaleValue(value));
        }
        if value > MAX_SALE_VALUE {
            return Err(ValidationError::SaleValueTooLarge {
                value,
                max: MAX_SALE_VALUE,
            });
        }
        Ok(value)
    }
}

impl SaleRequest {
    /// Validates the request and derives the commission.
    ///
    /// Presence of all required fields is checked before any value is
    /// inspected, so a request missing `produto` reports that field even when
    /// `valor_venda` is also malformed.
    pub fn validate(self) -> Result<NewCommission, ValidationError> {
        let salesperson = self
            .salesperson
            .ok_or(ValidationError::MissingField("vendedor"))?;
        let product = self.product.ok_or(ValidationError::MissingField("produto"))?;
        let sale_value = self
            .sale_value
            .ok_or(ValidationError::MissingField("valor_venda"))?;

        let salesperson = required_text("vendedor", &salesperson)?;
        let product = required_text("produto", &product)?;
        let sale_value = sale_value.parse()?;

        let sold_at = match self.sold_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw)
                    .map_err(|_| ValidationError::InvalidTimestamp(raw.to_string()))?,
            ),
            None => None,
        };

        Ok(NewCommission {
            salesperson,
            product,
            sale_value,
            commission_value: compute_commission(sale_value),
            sold_at,
        })
    }
}

fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter(field));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Parses the record identifier received from a client.
pub fn parse_record_id(raw: Option<&str>) -> Result<i64, ValidationError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ValidationError::MissingId);
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidId(raw.to_string())),
    }
}

/// Client input rejected before reaching storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("field `{0}` must not contain control characters")]
    ControlCharacter(&'static str),
    #[error("field `{field}` exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("valor_venda is not a number: {0}")]
    InvalidSaleValue(String),
    #[error("valor_venda must not be negative (got {0})")]
    NegativeSaleValue(f64),
    #[error("valor_venda must not exceed {max} (got {value})")]
    SaleValueTooLarge { value: f64, max: f64 },
    #[error("data_venda must use the YYYY-MM-DD HH:MM:SS format (got {0})")]
    InvalidTimestamp(String),
    #[error("id is required")]
    MissingId,
    #[error("id must be a positive integer (got {0})")]
    InvalidId(String),
}
