use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection status reported by the provider for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Created,
    Updating,
    Updated,
    WaitingUserInput,
    LoginError,
    Outdated,
    #[serde(other)]
    Unknown,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Created => "CREATED",
            ItemStatus::Updating => "UPDATING",
            ItemStatus::Updated => "UPDATED",
            ItemStatus::WaitingUserInput => "WAITING_USER_INPUT",
            ItemStatus::LoginError => "LOGIN_ERROR",
            ItemStatus::Outdated => "OUTDATED",
            ItemStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Bank,
    Credit,
    PaymentAccount,
    #[serde(other)]
    Unknown,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Bank => "BANK",
            AccountType::Credit => "CREDIT",
            AccountType::PaymentAccount => "PAYMENT_ACCOUNT",
            AccountType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
    #[serde(other)]
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Posted,
    Pending,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Posted => "POSTED",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestmentTransactionType {
    Buy,
    Sell,
    Dividend,
    Split,
    Bonus,
    #[serde(other)]
    Unknown,
}

impl InvestmentTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentTransactionType::Buy => "BUY",
            InvestmentTransactionType::Sell => "SELL",
            InvestmentTransactionType::Dividend => "DIVIDEND",
            InvestmentTransactionType::Split => "SPLIT",
            InvestmentTransactionType::Bonus => "BONUS",
            InvestmentTransactionType::Unknown => "UNKNOWN",
        }
    }
}

/// Paginated list envelope used by the provider's collection endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// An end-user connection to a financial institution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderItem {
    pub id: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub connector: Option<Value>,
    #[serde(default)]
    pub client_user_id: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub parameter: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,

    /// Any additional fields the provider sends.
    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub marketing_name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub balance: Option<BigDecimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub tax_number: Option<String>,
    #[serde(default)]
    pub bank_data: Option<Value>,
    #[serde(default)]
    pub credit_data: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTransaction {
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub balance: Option<BigDecimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(rename = "type", default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub merchant: Option<Value>,
    #[serde(default)]
    pub payment_data: Option<Value>,
    #[serde(default)]
    pub credit_card_metadata: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCreditCardBill {
    pub id: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub total_amount: Option<BigDecimal>,
    #[serde(default)]
    pub total_amount_currency_code: Option<String>,
    #[serde(default)]
    pub minimum_payment: Option<BigDecimal>,
    #[serde(default)]
    pub allows_installments: Option<bool>,
    #[serde(default)]
    pub finance_charges: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

/// Personal/company identification data; the provider exposes at most one
/// identity per item.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderIdentity {
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub tax_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub investor_profile: Option<String>,
    #[serde(default)]
    pub addresses: Option<Value>,
    #[serde(default)]
    pub phone_numbers: Option<Value>,
    #[serde(default)]
    pub emails: Option<Value>,
    #[serde(default)]
    pub relations: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInvestment {
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub isin: Option<String>,
    /// Broad product class (e.g. FIXED_INCOME, EQUITY); open-ended set.
    #[serde(rename = "type", default)]
    pub investment_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub rate: Option<BigDecimal>,
    #[serde(default)]
    pub rate_type: Option<String>,
    #[serde(default)]
    pub fixed_annual_rate: Option<BigDecimal>,
    #[serde(default)]
    pub balance: Option<BigDecimal>,
    #[serde(default)]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub value: Option<BigDecimal>,
    #[serde(default)]
    pub taxes: Option<BigDecimal>,
    #[serde(default)]
    pub taxes2: Option<BigDecimal>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInvestmentTransaction {
    pub id: String,
    #[serde(rename = "type", default)]
    pub transaction_type: Option<InvestmentTransactionType>,
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub quantity: Option<BigDecimal>,
    #[serde(default)]
    pub value: Option<BigDecimal>,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub brokerage_number: Option<String>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLoan {
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub ipoc_code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub contract_date: Option<String>,
    #[serde(default)]
    pub settlement_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub contract_amount: Option<BigDecimal>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub installment_periodicity: Option<String>,
    #[serde(default)]
    pub interest_rates: Option<Value>,
    #[serde(default)]
    pub contracted_fees: Option<Value>,
    #[serde(default)]
    pub contracted_finance_charges: Option<Value>,
    #[serde(default)]
    pub warranties: Option<Value>,
    #[serde(default)]
    pub installments: Option<Value>,
    #[serde(default)]
    pub payments: Option<Value>,

    #[serde(flatten)]
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_with_extra_fields() {
        let json = r#"
        {
            "id": "it-1",
            "status": "WAITING_USER_INPUT",
            "connector": {"id": 201, "name": "Test Bank"},
            "executionStatus": "USER_INPUT_TIMEOUT"
        }
        "#;

        let item: ProviderItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "it-1");
        assert_eq!(item.status, ItemStatus::WaitingUserInput);
        assert_eq!(item.raw["executionStatus"], "USER_INPUT_TIMEOUT");
    }

    #[test]
    fn unknown_enum_tags_do_not_fail_parsing() {
        let item: ProviderItem =
            serde_json::from_str(r#"{"id": "it-2", "status": "SOME_FUTURE_STATUS"}"#).unwrap();
        assert_eq!(item.status, ItemStatus::Unknown);

        let account: ProviderAccount =
            serde_json::from_str(r#"{"id": "ac-1", "type": "BROKERAGE"}"#).unwrap();
        assert_eq!(account.account_type, AccountType::Unknown);
    }

    #[test]
    fn parses_paginated_transactions() {
        let json = r#"
        {
            "results": [
                {"id": "tx-1", "accountId": "ac-1", "date": "2024-03-05T00:00:00Z",
                 "amount": 12.5, "type": "DEBIT", "status": "POSTED"}
            ],
            "page": 1,
            "totalPages": 3,
            "total": 1200
        }
        "#;

        let page: PageResponse<ProviderTransaction> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(
            page.results[0].transaction_type,
            Some(TransactionType::Debit)
        );
    }
}
