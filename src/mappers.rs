//! Pure conversion from provider resources to persistence records.
//!
//! No I/O happens here. Opaque provider sub-objects (merchant data, credit
//! limits, installment schedules, ...) pass through untouched as jsonb.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::*;
use crate::provider_models::*;

/// Normalize any provider date representation to a calendar date.
///
/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates, and naive
/// `YYYY-MM-DD HH:MM:SS` timestamps. Anything absent or unparseable
/// falls back to today (UTC).
pub fn normalize_date(raw: Option<&str>) -> NaiveDate {
    normalize_date_opt(raw).unwrap_or_else(|| Utc::now().date_naive())
}

/// Variant for genuinely optional date fields: absent stays absent.
pub fn normalize_date_opt(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map(|dt| dt.date())
                .ok()
        })
        // Last resort: a date-like prefix (e.g. "2024-03-05T26:00" from a
        // buggy connector)
        .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

pub fn map_item(item: &ProviderItem) -> ItemRecord {
    ItemRecord {
        item_id: item.id.clone(),
        status: item.status.as_str().to_string(),
        connector: item.connector.clone(),
        client_user_id: item.client_user_id.clone(),
        webhook_url: item.webhook_url.clone(),
        parameter: item.parameter.clone(),
        error: item.error.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_account(account: &ProviderAccount, item_id: &str) -> AccountRecord {
    AccountRecord {
        account_id: account.id.clone(),
        item_id: item_id.to_string(),
        account_type: account.account_type.as_str().to_string(),
        subtype: account.subtype.clone(),
        name: account.name.clone(),
        marketing_name: account.marketing_name.clone(),
        number: account.number.clone(),
        balance: account.balance.clone(),
        currency_code: account.currency_code.clone(),
        owner: account.owner.clone(),
        tax_number: account.tax_number.clone(),
        bank_data: account.bank_data.clone(),
        credit_data: account.credit_data.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_transaction(tx: &ProviderTransaction, account_id: &str) -> TransactionRecord {
    TransactionRecord {
        transaction_id: tx.id.clone(),
        account_id: account_id.to_string(),
        date: normalize_date(tx.date.as_deref()),
        // description is the one optional field that defaults to "" instead
        // of NULL
        description: tx.description.clone().unwrap_or_default(),
        amount: tx.amount.clone(),
        balance: tx.balance.clone(),
        currency_code: tx.currency_code.clone(),
        transaction_type: tx.transaction_type.map(|t| t.as_str().to_string()),
        status: tx.status.map(|s| s.as_str().to_string()),
        category: tx.category.clone(),
        merchant: tx.merchant.clone(),
        payment_data: tx.payment_data.clone(),
        credit_card_metadata: tx.credit_card_metadata.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_credit_card_bill(
    bill: &ProviderCreditCardBill,
    account_id: &str,
) -> CreditCardBillRecord {
    CreditCardBillRecord {
        bill_id: bill.id.clone(),
        account_id: account_id.to_string(),
        due_date: normalize_date_opt(bill.due_date.as_deref()),
        total_amount: bill.total_amount.clone(),
        minimum_payment_amount: bill.minimum_payment.clone(),
        allows_installments: bill.allows_installments,
        finance_charges: bill.finance_charges.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_identity(identity: &ProviderIdentity, item_id: &str) -> IdentityRecord {
    IdentityRecord {
        identity_id: identity.id.clone(),
        item_id: item_id.to_string(),
        full_name: identity.full_name.clone(),
        document: identity.document.clone(),
        document_type: identity.document_type.clone(),
        tax_number: identity.tax_number.clone(),
        birth_date: normalize_date_opt(identity.birth_date.as_deref()),
        company_name: identity.company_name.clone(),
        job_title: identity.job_title.clone(),
        investor_profile: identity.investor_profile.clone(),
        addresses: identity.addresses.clone(),
        phone_numbers: identity.phone_numbers.clone(),
        emails: identity.emails.clone(),
        relations: identity.relations.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_investment(investment: &ProviderInvestment, item_id: &str) -> InvestmentRecord {
    InvestmentRecord {
        investment_id: investment.id.clone(),
        item_id: item_id.to_string(),
        name: investment.name.clone(),
        number: investment.number.clone(),
        code: investment.code.clone(),
        isin: investment.isin.clone(),
        investment_type: investment.investment_type.clone(),
        subtype: investment.subtype.clone(),
        rate: investment.rate.clone(),
        rate_type: investment.rate_type.clone(),
        fixed_annual_rate: investment.fixed_annual_rate.clone(),
        balance: investment.balance.clone(),
        quantity: investment.quantity.clone(),
        amount: investment.amount.clone(),
        value: investment.value.clone(),
        taxes: investment.taxes.clone(),
        taxes2: investment.taxes2.clone(),
        date: normalize_date_opt(investment.date.as_deref()),
        due_date: normalize_date_opt(investment.due_date.as_deref()),
        issue_date: normalize_date_opt(investment.issue_date.as_deref()),
        issuer: investment.issuer.clone(),
        status: investment.status.clone(),
        currency_code: investment.currency_code.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_investment_transaction(
    tx: &ProviderInvestmentTransaction,
    investment_id: &str,
) -> InvestmentTransactionRecord {
    InvestmentTransactionRecord {
        transaction_id: tx.id.clone(),
        investment_id: investment_id.to_string(),
        trade_date: normalize_date(tx.trade_date.as_deref().or(tx.date.as_deref())),
        transaction_type: tx.transaction_type.map(|t| t.as_str().to_string()),
        quantity: tx.quantity.clone(),
        value: tx.value.clone(),
        amount: tx.amount.clone(),
        brokerage_number: tx.brokerage_number.clone(),
        created_at: None,
        updated_at: None,
    }
}

pub fn map_loan(loan: &ProviderLoan, item_id: &str) -> LoanRecord {
    LoanRecord {
        loan_id: loan.id.clone(),
        item_id: item_id.to_string(),
        contract_number: loan.contract_number.clone(),
        ipoc_code: loan.ipoc_code.clone(),
        product_name: loan.product_name.clone(),
        contract_date: normalize_date_opt(loan.contract_date.as_deref()),
        settlement_date: normalize_date_opt(loan.settlement_date.as_deref()),
        due_date: normalize_date_opt(loan.due_date.as_deref()),
        contract_amount: loan.contract_amount.clone(),
        currency_code: loan.currency_code.clone(),
        installment_periodicity: loan.installment_periodicity.clone(),
        interest_rates: loan.interest_rates.clone(),
        contracted_fees: loan.contracted_fees.clone(),
        contracted_finance_charges: loan.contracted_finance_charges.clone(),
        warranties: loan.warranties.clone(),
        installments: loan.installments.clone(),
        payments: loan.payments.clone(),
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_rfc3339_timestamp_to_date() {
        let date = normalize_date(Some("2024-03-05T00:00:00Z"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn normalizes_bare_date() {
        let date = normalize_date(Some("2023-11-30"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 30).unwrap());
    }

    #[test]
    fn absent_date_defaults_to_today() {
        assert_eq!(normalize_date(None), Utc::now().date_naive());
    }

    #[test]
    fn optional_date_stays_absent() {
        assert_eq!(normalize_date_opt(None), None);
        assert_eq!(normalize_date_opt(Some("")), None);
        assert_eq!(normalize_date_opt(Some("garbage")), None);
    }

    #[test]
    fn transaction_mapping_translates_fields() {
        let tx: ProviderTransaction = serde_json::from_value(json!({
            "id": "tx-9",
            "date": "2024-03-05T00:00:00Z",
            "amount": -42.9,
            "type": "DEBIT",
            "status": "POSTED",
            "merchant": {"name": "Padaria", "cnpj": "123"}
        }))
        .unwrap();

        let record = map_transaction(&tx, "ac-1");
        assert_eq!(record.transaction_id, "tx-9");
        assert_eq!(record.account_id, "ac-1");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(record.transaction_type.as_deref(), Some("DEBIT"));
        assert_eq!(record.status.as_deref(), Some("POSTED"));
        assert_eq!(record.merchant.as_ref().unwrap()["name"], "Padaria");
        // description defaults to empty string, not NULL
        assert_eq!(record.description, "");
    }

    #[test]
    fn bill_mapping_keeps_optional_fields_absent() {
        let bill: ProviderCreditCardBill =
            serde_json::from_value(json!({"id": "bill-1"})).unwrap();

        let record = map_credit_card_bill(&bill, "ac-2");
        assert_eq!(record.bill_id, "bill-1");
        assert_eq!(record.account_id, "ac-2");
        assert!(record.due_date.is_none());
        assert!(record.total_amount.is_none());
        assert!(record.finance_charges.is_none());
    }

    #[test]
    fn investment_transaction_falls_back_to_date_field() {
        let tx: ProviderInvestmentTransaction = serde_json::from_value(json!({
            "id": "itx-1",
            "type": "DIVIDEND",
            "date": "2024-01-15"
        }))
        .unwrap();

        let record = map_investment_transaction(&tx, "inv-1");
        assert_eq!(record.trade_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(record.transaction_type.as_deref(), Some("DIVIDEND"));
    }
}
