use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Customer segment; selects which price tier an order is charged at.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerCategory {
    #[default]
    #[sea_orm(string_value = "CUSTOMER")]
    Customer,
    #[sea_orm(string_value = "DROPSHIPPER")]
    Dropshipper,
    #[sea_orm(string_value = "MEMBER")]
    Member,
    #[sea_orm(string_value = "RESELLER")]
    Reseller,
    #[sea_orm(string_value = "AGENT")]
    Agent,
}

/// Payment state of an order detail.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SETTLEMENT")]
    Settlement,
    #[sea_orm(string_value = "CANCEL")]
    Cancel,
    #[sea_orm(string_value = "INSTALLMENTS")]
    Installments,
}

impl FromStr for PaymentStatus {
    type Err = String;

    /// Case-insensitive; callers send `settlement`, `Settlement` or `SETTLEMENT`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SETTLEMENT" => Ok(Self::Settlement),
            "CANCEL" => Ok(Self::Cancel),
            "INSTALLMENTS" => Ok(Self::Installments),
            other => Err(format!("unknown payment status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("settlement", PaymentStatus::Settlement)]
    #[test_case("Pending", PaymentStatus::Pending)]
    #[test_case(" CANCEL ", PaymentStatus::Cancel)]
    #[test_case("installments", PaymentStatus::Installments)]
    fn parses_payment_status_case_insensitively(input: &str, expected: PaymentStatus) {
        assert_eq!(input.parse::<PaymentStatus>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_payment_status() {
        assert!("PAID".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn categories_serialize_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&CustomerCategory::Reseller).unwrap(),
            "\"RESELLER\""
        );
        assert_eq!(CustomerCategory::Dropshipper.to_string(), "DROPSHIPPER");
        assert_eq!(CustomerCategory::default(), CustomerCategory::Customer);
    }
}
