use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Wire and display format for sale timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted sale together with the commission derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    #[serde(rename = "vendedor")]
    pub salesperson: String,
    #[serde(rename = "produto")]
    pub product: String,
    #[serde(rename = "valor_venda")]
    pub sale_value: f64,
    #[serde(rename = "comissao_calculada")]
    pub commission_value: f64,
    #[serde(rename = "data_venda", with = "sale_timestamp")]
    pub sold_at: DateTime<Utc>,
}

/// A validated sale that has not been assigned an id yet.
///
/// `commission_value` is fixed here and travels unchanged into storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommission {
    pub salesperson: String,
    pub product: String,
    pub sale_value: f64,
    pub commission_value: f64,
    pub sold_at: Option<DateTime<Utc>>,
}

impl NewCommission {
    /// Resolves the sale timestamp, defaulting to `now` when none was supplied.
    ///
    /// Sub-second precision is dropped so the stored value matches its
    /// serialized form.
    pub fn sold_at_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.sold_at.unwrap_or(now).trunc_subsecs(0)
    }

    /// Attaches the storage-assigned identifier.
    pub fn into_commission(self, id: i64, sold_at: DateTime<Utc>) -> Commission {
        Commission {
            id,
            salesperson: self.salesperson,
            product: self.product,
            sale_value: self.sale_value,
            commission_value: self.commission_value,
            sold_at,
        }
    }
}

/// Aggregate totals over every stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(rename = "total_vendas")]
    pub total_sales: f64,
    #[serde(rename = "total_comissoes")]
    pub total_commissions: f64,
    #[serde(rename = "quantidade_vendas")]
    pub sale_count: i64,
}

/// Renders a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp, interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

mod sale_timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(D::Error::custom)
    }
}
