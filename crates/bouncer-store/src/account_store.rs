use bouncer_core::Account;

use crate::db::Database;
use crate::error::StoreResult;

const TABLE: &str = "account";

/// Row-level operations over target-account configuration (spec §3, §4.2).
pub struct AccountStore<'a> {
    db: &'a Database,
}

impl<'a> AccountStore<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register or update an account.
    pub async fn put(&self, account: &Account) -> StoreResult<()> {
        let key = account.account_id.0.clone();
        let _: Option<Account> = self.db.client().update((TABLE, key.as_str())).content(account.clone()).await?;
        Ok(())
    }

    /// Fetch an account by id.
    pub async fn get(&self, account_id: &str) -> StoreResult<Option<Account>> {
        let row: Option<Account> = self.db.client().select((TABLE, account_id)).await?;
        Ok(row)
    }

    /// Remove an account's registration (does not affect history).
    pub async fn remove(&self, account_id: &str) -> StoreResult<()> {
        let _: Option<Account> = self.db.client().delete((TABLE, account_id)).await?;
        Ok(())
    }

    /// All registered accounts, enabled or not.
    pub async fn list(&self) -> StoreResult<Vec<Account>> {
        let mut response = self.db.client().query("SELECT * FROM type::table($table)").bind(("table", TABLE)).await?;
        let rows: Vec<Account> = response.take(0)?;
        Ok(rows)
    }

    /// The account with `is_default = true`, if one is registered.
    pub async fn default_account(&self) -> StoreResult<Option<Account>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM type::table($table) WHERE is_default = true LIMIT 1")
            .bind(("table", TABLE))
            .await?;
        let rows: Vec<Account> = response.take(0)?;
        Ok(rows.into_iter().next())
    }
}
