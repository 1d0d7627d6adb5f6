use serde::Serialize;

use crate::errors::AppError;
use crate::mappers;
use crate::pluggy_client::PluggyClient;
use crate::provider_models::AccountType;
use crate::storage::SyncStorage;

/// Row counts and failures for one sync pass, for the completion log line.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub accounts: usize,
    pub transactions: usize,
    pub credit_card_bills: usize,
    pub identities: usize,
    pub investments: usize,
    pub investment_transactions: usize,
    pub loans: usize,
    pub failed_steps: usize,
}

/// One full fetch-and-persist pass over every resource family of an item.
///
/// The pass is stateless and re-entrant: every write is a keyed upsert, so
/// re-running it (or running two passes concurrently for the same item) is
/// safe. Only the initial account fetch propagates an error; every other
/// step is isolated so one failing resource family cannot starve the rest.
pub struct SyncService<'a> {
    provider: &'a PluggyClient,
    storage: &'a SyncStorage,
}

impl<'a> SyncService<'a> {
    pub fn new(provider: &'a PluggyClient, storage: &'a SyncStorage) -> Self {
        Self { provider, storage }
    }

    pub async fn sync_item(&self, item_id: &str) -> Result<SyncReport, AppError> {
        tracing::info!("Starting sync pass for item {}", item_id);
        let mut report = SyncReport::default();

        // Step 1: the only step whose failure aborts the pass.
        let accounts = self.provider.fetch_accounts(item_id).await?;

        if accounts.is_empty() {
            tracing::info!("Item {} has no accounts yet", item_id);
        } else {
            // Step 2: persist the accounts themselves.
            let records: Vec<_> = accounts
                .iter()
                .map(|a| mappers::map_account(a, item_id))
                .collect();
            match self.storage.upsert_accounts(&records).await {
                Ok(n) => report.accounts = n,
                Err(e) => {
                    report.failed_steps += 1;
                    tracing::error!("Failed to upsert accounts for item {}: {}", item_id, e);
                }
            }

            // Step 3: per-account transactions and, for credit accounts,
            // bills. Isolated per account per resource family.
            for account in &accounts {
                match self.sync_account_transactions(&account.id).await {
                    Ok(n) => report.transactions += n,
                    Err(e) => {
                        report.failed_steps += 1;
                        tracing::error!(
                            "Failed to sync transactions for account {}: {}",
                            account.id,
                            e
                        );
                    }
                }

                if account.account_type == AccountType::Credit {
                    match self.sync_account_bills(&account.id).await {
                        Ok(n) => report.credit_card_bills += n,
                        Err(e) => {
                            report.failed_steps += 1;
                            tracing::error!(
                                "Failed to sync bills for account {}: {}",
                                account.id,
                                e
                            );
                        }
                    }
                }
            }
        }

        // Step 4: identity (at most one per item; absent is not an error).
        match self.sync_identity(item_id).await {
            Ok(n) => report.identities = n,
            Err(e) => {
                report.failed_steps += 1;
                tracing::error!("Failed to sync identity for item {}: {}", item_id, e);
            }
        }

        // Step 5: investments and their own transactions.
        match self.sync_investments(item_id, &mut report).await {
            Ok(()) => {}
            Err(e) => {
                report.failed_steps += 1;
                tracing::error!("Failed to sync investments for item {}: {}", item_id, e);
            }
        }

        // Step 6: loans.
        match self.sync_loans(item_id).await {
            Ok(n) => report.loans = n,
            Err(e) => {
                report.failed_steps += 1;
                tracing::error!("Failed to sync loans for item {}: {}", item_id, e);
            }
        }

        tracing::info!(
            "Sync pass for item {} finished: {} account(s), {} transaction(s), {} bill(s), \
             {} identity record(s), {} investment(s), {} investment transaction(s), \
             {} loan(s), {} failed step(s)",
            item_id,
            report.accounts,
            report.transactions,
            report.credit_card_bills,
            report.identities,
            report.investments,
            report.investment_transactions,
            report.loans,
            report.failed_steps
        );

        Ok(report)
    }

    async fn sync_account_transactions(&self, account_id: &str) -> Result<usize, AppError> {
        let transactions = self.provider.fetch_all_transactions(account_id).await?;
        let records: Vec<_> = transactions
            .iter()
            .map(|t| mappers::map_transaction(t, account_id))
            .collect();
        self.storage.upsert_transactions(&records).await
    }

    async fn sync_account_bills(&self, account_id: &str) -> Result<usize, AppError> {
        let bills = self.provider.fetch_credit_card_bills(account_id).await?;
        let records: Vec<_> = bills
            .iter()
            .map(|b| mappers::map_credit_card_bill(b, account_id))
            .collect();
        self.storage.upsert_credit_card_bills(&records).await
    }

    async fn sync_identity(&self, item_id: &str) -> Result<usize, AppError> {
        match self.provider.fetch_identity_by_item(item_id).await? {
            Some(identity) => {
                let record = mappers::map_identity(&identity, item_id);
                self.storage.upsert_identity(&record).await?;
                Ok(1)
            }
            None => {
                tracing::debug!("No identity product for item {}", item_id);
                Ok(0)
            }
        }
    }

    async fn sync_investments(
        &self,
        item_id: &str,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let investments = self.provider.fetch_investments(item_id).await?;
        if investments.is_empty() {
            return Ok(());
        }

        let records: Vec<_> = investments
            .iter()
            .map(|i| mappers::map_investment(i, item_id))
            .collect();
        report.investments += self.storage.upsert_investments(&records).await?;

        // Per-investment transaction history, isolated per investment.
        for investment in &investments {
            match self.sync_investment_transactions(&investment.id).await {
                Ok(n) => report.investment_transactions += n,
                Err(e) => {
                    report.failed_steps += 1;
                    tracing::error!(
                        "Failed to sync transactions for investment {}: {}",
                        investment.id,
                        e
                    );
                }
            }
        }

        Ok(())
    }

    async fn sync_investment_transactions(&self, investment_id: &str) -> Result<usize, AppError> {
        let transactions = self
            .provider
            .fetch_investment_transactions(investment_id)
            .await?;
        let records: Vec<_> = transactions
            .iter()
            .map(|t| mappers::map_investment_transaction(t, investment_id))
            .collect();
        self.storage.upsert_investment_transactions(&records).await
    }

    async fn sync_loans(&self, item_id: &str) -> Result<usize, AppError> {
        let loans = self.provider.fetch_loans(item_id).await?;
        let records: Vec<_> = loans
            .iter()
            .map(|l| mappers::map_loan(l, item_id))
            .collect();
        self.storage.upsert_loans(&records).await
    }
}
