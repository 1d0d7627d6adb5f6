//! Persisted rows, one struct per table. Every table is keyed by the
//! provider-assigned natural id (first field), never by a surrogate row id;
//! `created_at`/`updated_at` are database-defaulted and never written by the
//! application.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItemRecord {
    pub item_id: String,
    pub status: String,
    pub connector: Option<Value>,
    pub client_user_id: Option<String>,
    pub webhook_url: Option<String>,
    pub parameter: Option<Value>,
    pub error: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRecord {
    pub account_id: String,
    pub item_id: String,
    pub account_type: String,
    pub subtype: Option<String>,
    pub name: Option<String>,
    pub marketing_name: Option<String>,
    pub number: Option<String>,
    pub balance: Option<BigDecimal>,
    pub currency_code: Option<String>,
    pub owner: Option<String>,
    pub tax_number: Option<String>,
    pub bank_data: Option<Value>,
    pub credit_data: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
    pub currency_code: Option<String>,
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub merchant: Option<Value>,
    pub payment_data: Option<Value>,
    pub credit_card_metadata: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditCardBillRecord {
    pub bill_id: String,
    pub account_id: String,
    pub due_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
    pub minimum_payment_amount: Option<BigDecimal>,
    pub allows_installments: Option<bool>,
    pub finance_charges: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IdentityRecord {
    pub identity_id: String,
    pub item_id: String,
    pub full_name: Option<String>,
    pub document: Option<String>,
    pub document_type: Option<String>,
    pub tax_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub investor_profile: Option<String>,
    pub addresses: Option<Value>,
    pub phone_numbers: Option<Value>,
    pub emails: Option<Value>,
    pub relations: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvestmentRecord {
    pub investment_id: String,
    pub item_id: String,
    pub name: Option<String>,
    pub number: Option<String>,
    pub code: Option<String>,
    pub isin: Option<String>,
    pub investment_type: Option<String>,
    pub subtype: Option<String>,
    pub rate: Option<BigDecimal>,
    pub rate_type: Option<String>,
    pub fixed_annual_rate: Option<BigDecimal>,
    pub balance: Option<BigDecimal>,
    pub quantity: Option<BigDecimal>,
    pub amount: Option<BigDecimal>,
    pub value: Option<BigDecimal>,
    pub taxes: Option<BigDecimal>,
    pub taxes2: Option<BigDecimal>,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub issue_date: Option<NaiveDate>,
    pub issuer: Option<String>,
    pub status: Option<String>,
    pub currency_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvestmentTransactionRecord {
    pub transaction_id: String,
    pub investment_id: String,
    pub trade_date: NaiveDate,
    pub transaction_type: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub value: Option<BigDecimal>,
    pub amount: Option<BigDecimal>,
    pub brokerage_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoanRecord {
    pub loan_id: String,
    pub item_id: String,
    pub contract_number: Option<String>,
    pub ipoc_code: Option<String>,
    pub product_name: Option<String>,
    pub contract_date: Option<NaiveDate>,
    pub settlement_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub contract_amount: Option<BigDecimal>,
    pub currency_code: Option<String>,
    pub installment_periodicity: Option<String>,
    pub interest_rates: Option<Value>,
    pub contracted_fees: Option<Value>,
    pub contracted_finance_charges: Option<Value>,
    pub warranties: Option<Value>,
    pub installments: Option<Value>,
    pub payments: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
