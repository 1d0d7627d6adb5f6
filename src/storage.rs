use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::*;

/// Persistence gateway for synced financial data.
///
/// Every write is an upsert keyed by the provider-assigned natural id with
/// last-write-wins conflict resolution, so webhook redeliveries and
/// overlapping sync passes are harmless. Batch variants run sequentially;
/// the first failure aborts the batch and raises.
pub struct SyncStorage {
    pool: PgPool,
}

impl SyncStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- items ----

    pub async fn upsert_item(&self, record: &ItemRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO items (item_id, status, connector, client_user_id, webhook_url, parameter, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (item_id) DO UPDATE
            SET status = EXCLUDED.status,
                connector = EXCLUDED.connector,
                client_user_id = EXCLUDED.client_user_id,
                webhook_url = EXCLUDED.webhook_url,
                parameter = EXCLUDED.parameter,
                error = EXCLUDED.error,
                updated_at = now()
            "#,
        )
        .bind(&record.item_id)
        .bind(&record.status)
        .bind(&record.connector)
        .bind(&record.client_user_id)
        .bind(&record.webhook_url)
        .bind(&record.parameter)
        .bind(&record.error)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Upserted item {}", record.item_id);
        Ok(())
    }

    pub async fn get_item(&self, item_id: &str) -> Result<Option<ItemRecord>, AppError> {
        let item = sqlx::query_as::<_, ItemRecord>("SELECT * FROM items WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Delete an item and everything under it, children before parents.
    /// The schema also declares ON DELETE CASCADE, but the explicit order
    /// keeps the operation correct against backends without it.
    pub async fn delete_item_cascade(&self, item_id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM investment_transactions
            WHERE investment_id IN (SELECT investment_id FROM investments WHERE item_id = $1)
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM investments WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM transactions
            WHERE account_id IN (SELECT account_id FROM accounts WHERE item_id = $1)
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM credit_card_bills
            WHERE account_id IN (SELECT account_id FROM accounts WHERE item_id = $1)
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM identities WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM loans WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM accounts WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM items WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Deleting an unknown item is a success: the desired end state
            // already holds
            tracing::debug!("Item {} was not present, nothing to delete", item_id);
        } else {
            tracing::info!("Deleted item {} and its dependents", item_id);
        }

        Ok(())
    }

    // ---- accounts ----

    pub async fn upsert_account(&self, record: &AccountRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id, item_id, account_type, subtype, name, marketing_name,
                number, balance, currency_code, owner, tax_number, bank_data, credit_data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (account_id) DO UPDATE
            SET item_id = EXCLUDED.item_id,
                account_type = EXCLUDED.account_type,
                subtype = EXCLUDED.subtype,
                name = EXCLUDED.name,
                marketing_name = EXCLUDED.marketing_name,
                number = EXCLUDED.number,
                balance = EXCLUDED.balance,
                currency_code = EXCLUDED.currency_code,
                owner = EXCLUDED.owner,
                tax_number = EXCLUDED.tax_number,
                bank_data = EXCLUDED.bank_data,
                credit_data = EXCLUDED.credit_data,
                updated_at = now()
            "#,
        )
        .bind(&record.account_id)
        .bind(&record.item_id)
        .bind(&record.account_type)
        .bind(&record.subtype)
        .bind(&record.name)
        .bind(&record.marketing_name)
        .bind(&record.number)
        .bind(&record.balance)
        .bind(&record.currency_code)
        .bind(&record.owner)
        .bind(&record.tax_number)
        .bind(&record.bank_data)
        .bind(&record.credit_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_accounts(&self, records: &[AccountRecord]) -> Result<usize, AppError> {
        for record in records {
            self.upsert_account(record).await?;
        }
        Ok(records.len())
    }

    pub async fn get_accounts_by_item(
        &self,
        item_id: &str,
    ) -> Result<Vec<AccountRecord>, AppError> {
        let accounts = sqlx::query_as::<_, AccountRecord>(
            "SELECT * FROM accounts WHERE item_id = $1 ORDER BY created_at DESC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    // ---- transactions ----

    pub async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id, account_id, date, description, amount, balance,
                currency_code, transaction_type, status, category, merchant,
                payment_data, credit_card_metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (transaction_id) DO UPDATE
            SET account_id = EXCLUDED.account_id,
                date = EXCLUDED.date,
                description = EXCLUDED.description,
                amount = EXCLUDED.amount,
                balance = EXCLUDED.balance,
                currency_code = EXCLUDED.currency_code,
                transaction_type = EXCLUDED.transaction_type,
                status = EXCLUDED.status,
                category = EXCLUDED.category,
                merchant = EXCLUDED.merchant,
                payment_data = EXCLUDED.payment_data,
                credit_card_metadata = EXCLUDED.credit_card_metadata,
                updated_at = now()
            "#,
        )
        .bind(&record.transaction_id)
        .bind(&record.account_id)
        .bind(record.date)
        .bind(&record.description)
        .bind(&record.amount)
        .bind(&record.balance)
        .bind(&record.currency_code)
        .bind(&record.transaction_type)
        .bind(&record.status)
        .bind(&record.category)
        .bind(&record.merchant)
        .bind(&record.payment_data)
        .bind(&record.credit_card_metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_transactions(
        &self,
        records: &[TransactionRecord],
    ) -> Result<usize, AppError> {
        for record in records {
            self.upsert_transaction(record).await?;
        }
        Ok(records.len())
    }

    pub async fn get_transactions_by_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let transactions = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    /// Zero rows affected is a success: the row is already gone.
    pub async fn delete_transaction(&self, transaction_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM transactions WHERE transaction_id = $1")
            .bind(transaction_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Transaction {} was not present", transaction_id);
        }
        Ok(result.rows_affected())
    }

    pub async fn delete_transactions(&self, transaction_ids: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM transactions WHERE transaction_id = ANY($1)")
            .bind(transaction_ids)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Deleted {} of {} requested transaction(s)",
            result.rows_affected(),
            transaction_ids.len()
        );
        Ok(result.rows_affected())
    }

    // ---- credit card bills ----

    pub async fn upsert_credit_card_bill(
        &self,
        record: &CreditCardBillRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO credit_card_bills (
                bill_id, account_id, due_date, total_amount, minimum_payment_amount,
                allows_installments, finance_charges
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (bill_id) DO UPDATE
            SET account_id = EXCLUDED.account_id,
                due_date = EXCLUDED.due_date,
                total_amount = EXCLUDED.total_amount,
                minimum_payment_amount = EXCLUDED.minimum_payment_amount,
                allows_installments = EXCLUDED.allows_installments,
                finance_charges = EXCLUDED.finance_charges,
                updated_at = now()
            "#,
        )
        .bind(&record.bill_id)
        .bind(&record.account_id)
        .bind(record.due_date)
        .bind(&record.total_amount)
        .bind(&record.minimum_payment_amount)
        .bind(record.allows_installments)
        .bind(&record.finance_charges)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_credit_card_bills(
        &self,
        records: &[CreditCardBillRecord],
    ) -> Result<usize, AppError> {
        for record in records {
            self.upsert_credit_card_bill(record).await?;
        }
        Ok(records.len())
    }

    // ---- identities ----

    pub async fn upsert_identity(&self, record: &IdentityRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO identities (
                identity_id, item_id, full_name, document, document_type, tax_number,
                birth_date, company_name, job_title, investor_profile, addresses,
                phone_numbers, emails, relations
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (identity_id) DO UPDATE
            SET item_id = EXCLUDED.item_id,
                full_name = EXCLUDED.full_name,
                document = EXCLUDED.document,
                document_type = EXCLUDED.document_type,
                tax_number = EXCLUDED.tax_number,
                birth_date = EXCLUDED.birth_date,
                company_name = EXCLUDED.company_name,
                job_title = EXCLUDED.job_title,
                investor_profile = EXCLUDED.investor_profile,
                addresses = EXCLUDED.addresses,
                phone_numbers = EXCLUDED.phone_numbers,
                emails = EXCLUDED.emails,
                relations = EXCLUDED.relations,
                updated_at = now()
            "#,
        )
        .bind(&record.identity_id)
        .bind(&record.item_id)
        .bind(&record.full_name)
        .bind(&record.document)
        .bind(&record.document_type)
        .bind(&record.tax_number)
        .bind(record.birth_date)
        .bind(&record.company_name)
        .bind(&record.job_title)
        .bind(&record.investor_profile)
        .bind(&record.addresses)
        .bind(&record.phone_numbers)
        .bind(&record.emails)
        .bind(&record.relations)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- investments ----

    pub async fn upsert_investment(&self, record: &InvestmentRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO investments (
                investment_id, item_id, name, number, code, isin, investment_type,
                subtype, rate, rate_type, fixed_annual_rate, balance, quantity,
                amount, value, taxes, taxes2, date, due_date, issue_date, issuer,
                status, currency_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23)
            ON CONFLICT (investment_id) DO UPDATE
            SET item_id = EXCLUDED.item_id,
                name = EXCLUDED.name,
                number = EXCLUDED.number,
                code = EXCLUDED.code,
                isin = EXCLUDED.isin,
                investment_type = EXCLUDED.investment_type,
                subtype = EXCLUDED.subtype,
                rate = EXCLUDED.rate,
                rate_type = EXCLUDED.rate_type,
                fixed_annual_rate = EXCLUDED.fixed_annual_rate,
                balance = EXCLUDED.balance,
                quantity = EXCLUDED.quantity,
                amount = EXCLUDED.amount,
                value = EXCLUDED.value,
                taxes = EXCLUDED.taxes,
                taxes2 = EXCLUDED.taxes2,
                date = EXCLUDED.date,
                due_date = EXCLUDED.due_date,
                issue_date = EXCLUDED.issue_date,
                issuer = EXCLUDED.issuer,
                status = EXCLUDED.status,
                currency_code = EXCLUDED.currency_code,
                updated_at = now()
            "#,
        )
        .bind(&record.investment_id)
        .bind(&record.item_id)
        .bind(&record.name)
        .bind(&record.number)
        .bind(&record.code)
        .bind(&record.isin)
        .bind(&record.investment_type)
        .bind(&record.subtype)
        .bind(&record.rate)
        .bind(&record.rate_type)
        .bind(&record.fixed_annual_rate)
        .bind(&record.balance)
        .bind(&record.quantity)
        .bind(&record.amount)
        .bind(&record.value)
        .bind(&record.taxes)
        .bind(&record.taxes2)
        .bind(record.date)
        .bind(record.due_date)
        .bind(record.issue_date)
        .bind(&record.issuer)
        .bind(&record.status)
        .bind(&record.currency_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_investments(
        &self,
        records: &[InvestmentRecord],
    ) -> Result<usize, AppError> {
        for record in records {
            self.upsert_investment(record).await?;
        }
        Ok(records.len())
    }

    // ---- investment transactions ----

    pub async fn upsert_investment_transaction(
        &self,
        record: &InvestmentTransactionRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO investment_transactions (
                transaction_id, investment_id, trade_date, transaction_type,
                quantity, value, amount, brokerage_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (transaction_id) DO UPDATE
            SET investment_id = EXCLUDED.investment_id,
                trade_date = EXCLUDED.trade_date,
                transaction_type = EXCLUDED.transaction_type,
                quantity = EXCLUDED.quantity,
                value = EXCLUDED.value,
                amount = EXCLUDED.amount,
                brokerage_number = EXCLUDED.brokerage_number,
                updated_at = now()
            "#,
        )
        .bind(&record.transaction_id)
        .bind(&record.investment_id)
        .bind(record.trade_date)
        .bind(&record.transaction_type)
        .bind(&record.quantity)
        .bind(&record.value)
        .bind(&record.amount)
        .bind(&record.brokerage_number)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_investment_transactions(
        &self,
        records: &[InvestmentTransactionRecord],
    ) -> Result<usize, AppError> {
        for record in records {
            self.upsert_investment_transaction(record).await?;
        }
        Ok(records.len())
    }

    // ---- loans ----

    pub async fn upsert_loan(&self, record: &LoanRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id, item_id, contract_number, ipoc_code, product_name,
                contract_date, settlement_date, due_date, contract_amount,
                currency_code, installment_periodicity, interest_rates,
                contracted_fees, contracted_finance_charges, warranties,
                installments, payments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17)
            ON CONFLICT (loan_id) DO UPDATE
            SET item_id = EXCLUDED.item_id,
                contract_number = EXCLUDED.contract_number,
                ipoc_code = EXCLUDED.ipoc_code,
                product_name = EXCLUDED.product_name,
                contract_date = EXCLUDED.contract_date,
                settlement_date = EXCLUDED.settlement_date,
                due_date = EXCLUDED.due_date,
                contract_amount = EXCLUDED.contract_amount,
                currency_code = EXCLUDED.currency_code,
                installment_periodicity = EXCLUDED.installment_periodicity,
                interest_rates = EXCLUDED.interest_rates,
                contracted_fees = EXCLUDED.contracted_fees,
                contracted_finance_charges = EXCLUDED.contracted_finance_charges,
                warranties = EXCLUDED.warranties,
                installments = EXCLUDED.installments,
                payments = EXCLUDED.payments,
                updated_at = now()
            "#,
        )
        .bind(&record.loan_id)
        .bind(&record.item_id)
        .bind(&record.contract_number)
        .bind(&record.ipoc_code)
        .bind(&record.product_name)
        .bind(record.contract_date)
        .bind(record.settlement_date)
        .bind(record.due_date)
        .bind(&record.contract_amount)
        .bind(&record.currency_code)
        .bind(&record.installment_periodicity)
        .bind(&record.interest_rates)
        .bind(&record.contracted_fees)
        .bind(&record.contracted_finance_charges)
        .bind(&record.warranties)
        .bind(&record.installments)
        .bind(&record.payments)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_loans(&self, records: &[LoanRecord]) -> Result<usize, AppError> {
        for record in records {
            self.upsert_loan(record).await?;
        }
        Ok(records.len())
    }
}
