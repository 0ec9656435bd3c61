use crate::domain::{
    name_key, Account, AccountType, AccountUpdate, ArbitrageChanges, ArbitrageFilter,
    ArbitrageOpportunity, Bet, BetStatus, LedgerTransaction, NewAccount, NewArbitrage, NewBet,
    NewSportsbook, Sportsbook, SportsbookUpdate, SportsbookUsage, TransactionType,
};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, Transaction};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

const BET_SELECT: &str = r#"
    SELECT b.id, b.sport, b.event_name, b.bet_type, b.selection,
           b.sportsbook_id, s.name AS sportsbook_name,
           b.account_id, a.account_identifier, a.name AS account_name,
           b.arbitrage_id, b.odds, b.stake, b.status, b.potential_payout,
           b.actual_payout, b.profit_loss, b.date_placed, b.date_settled,
           b.kickoff, b.notes
    FROM bet b
    LEFT JOIN sportsbook s ON s.id = b.sportsbook_id
    LEFT JOIN accounts a ON a.id = b.account_id
"#;

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.transaction_type, t.sportsbook_id, s.name AS sportsbook_name,
           t.account_id, a.account_identifier, a.name AS account_name,
           t.amount, t.tax, t.transaction_charges, t.payment_method,
           t.reference_id, t.status, t.date_created, t.date_processed, t.notes
    FROM transactions t
    LEFT JOIN sportsbook s ON s.id = t.sportsbook_id
    LEFT JOIN accounts a ON a.id = t.account_id
"#;

const ARBITRAGE_COLUMNS: &str = "id, match_signature, profit, kickoff_datetime, \
     combination_details, is_active, created_at, updated_at";

/// Filters for the transaction listing
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// SQLite storage adapter
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    /// Create a new SQLite store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if database_url.contains(":memory:") {
            // Every connection to :memory: is a separate database, so keep
            // exactly one alive for the lifetime of the pool.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?
        };

        info!(url = %database_url, "Connected to SQLite");
        Ok(Self { pool })
    }

    /// Fresh migrated in-memory store
    pub async fn in_memory() -> Result<Self> {
        let store = Self::new("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        self.backfill_name_keys().await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Fill `name_key` for rows written before the column existed
    async fn backfill_name_keys(&self) -> Result<()> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM sportsbook WHERE name_key IS NULL")
                .fetch_all(&self.pool)
                .await?;
        for (id, name) in rows {
            let updated = sqlx::query("UPDATE sportsbook SET name_key = ? WHERE id = ?")
                .bind(name_key(&name))
                .bind(id)
                .execute(&self.pool)
                .await;
            if let Err(e) = updated {
                warn!(id, name = %name, error = %e, "Sportsbook name collides after case folding");
            }
        }
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a unit of work; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== Sportsbooks ====================

    pub async fn find_sportsbook<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<Sportsbook>> {
        let row = sqlx::query("SELECT * FROM sportsbook WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(sportsbook_from_row).transpose()
    }

    /// Case-insensitive exact name match, Unicode aware
    pub async fn find_sportsbook_by_name<'e, E: SqliteExecutor<'e>>(
        executor: E,
        name: &str,
    ) -> Result<Option<Sportsbook>> {
        let row = sqlx::query("SELECT * FROM sportsbook WHERE name_key = ? LIMIT 1")
            .bind(name_key(name))
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(sportsbook_from_row).transpose()
    }

    #[instrument(skip(executor, sportsbook), fields(name = %sportsbook.name))]
    pub async fn insert_sportsbook<'e, E: SqliteExecutor<'e>>(
        executor: E,
        sportsbook: &NewSportsbook,
    ) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO sportsbook
                (name, name_key, display_name, website_url, logo_url, is_active, country,
                 description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sportsbook.name)
        .bind(name_key(&sportsbook.name))
        .bind(&sportsbook.display_name)
        .bind(&sportsbook.website_url)
        .bind(&sportsbook.logo_url)
        .bind(sportsbook.is_active.unwrap_or(true))
        .bind(&sportsbook.country)
        .bind(&sportsbook.description)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(|e| {
            LedgerError::from_constraint(e, "A sportsbook with this name already exists")
        })?;

        debug!(id = result.last_insert_rowid(), "Inserted sportsbook");
        Ok(result.last_insert_rowid())
    }

    pub async fn list_sportsbooks(&self, active_only: bool) -> Result<Vec<Sportsbook>> {
        let sql = if active_only {
            "SELECT * FROM sportsbook WHERE is_active = 1 ORDER BY name"
        } else {
            "SELECT * FROM sportsbook ORDER BY name"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(sportsbook_from_row).collect()
    }

    pub async fn create_sportsbook(&self, sportsbook: &NewSportsbook) -> Result<Sportsbook> {
        let mut tx = self.begin().await?;
        if Self::find_sportsbook_by_name(&mut *tx, &sportsbook.name)
            .await?
            .is_some()
        {
            return Err(LedgerError::Conflict(
                "A sportsbook with this name already exists".to_string(),
            ));
        }
        let id = Self::insert_sportsbook(&mut *tx, sportsbook).await?;
        let created = Self::find_sportsbook(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::Internal(format!("sportsbook {id} vanished after insert")))?;
        tx.commit().await?;
        Ok(created)
    }

    /// Write back every mutable column of a sportsbook
    #[instrument(skip(executor, sportsbook), fields(id = sportsbook.id))]
    pub async fn save_sportsbook<'e, E: SqliteExecutor<'e>>(
        executor: E,
        sportsbook: &Sportsbook,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sportsbook
            SET name = ?, name_key = ?, display_name = ?, website_url = ?, logo_url = ?,
                is_active = ?, country = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&sportsbook.name)
        .bind(name_key(&sportsbook.name))
        .bind(&sportsbook.display_name)
        .bind(&sportsbook.website_url)
        .bind(&sportsbook.logo_url)
        .bind(sportsbook.is_active)
        .bind(&sportsbook.country)
        .bind(&sportsbook.description)
        .bind(sportsbook.updated_at)
        .bind(sportsbook.id)
        .execute(executor)
        .await
        .map_err(|e| {
            LedgerError::from_constraint(e, "A sportsbook with this name already exists")
        })?;
        Ok(())
    }

    /// Apply a partial edit. `None` when the id is unknown.
    pub async fn update_sportsbook(
        &self,
        id: i64,
        update: &SportsbookUpdate,
    ) -> Result<Option<Sportsbook>> {
        let mut tx = self.begin().await?;
        let Some(mut sportsbook) = Self::find_sportsbook(&mut *tx, id).await? else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            if let Some(existing) = Self::find_sportsbook_by_name(&mut *tx, name).await? {
                if existing.id != id {
                    return Err(LedgerError::Conflict(
                        "A sportsbook with this name already exists".to_string(),
                    ));
                }
            }
        }
        sportsbook.apply(update, Utc::now());
        Self::save_sportsbook(&mut *tx, &sportsbook).await?;
        tx.commit().await?;
        Ok(Some(sportsbook))
    }

    /// Flip `is_active`. `None` when the id is unknown.
    pub async fn toggle_sportsbook(&self, id: i64) -> Result<Option<Sportsbook>> {
        let mut tx = self.begin().await?;
        let Some(mut sportsbook) = Self::find_sportsbook(&mut *tx, id).await? else {
            return Ok(None);
        };
        sportsbook.is_active = !sportsbook.is_active;
        sportsbook.updated_at = Utc::now();
        Self::save_sportsbook(&mut *tx, &sportsbook).await?;
        tx.commit().await?;
        info!(id, active = sportsbook.is_active, "Toggled sportsbook");
        Ok(Some(sportsbook))
    }

    /// Insert a batch in one transaction. Entries without a name are
    /// ignored; names that already exist, including earlier entries of the
    /// same batch, are returned as skipped.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_sportsbooks(
        &self,
        items: Vec<NewSportsbook>,
    ) -> Result<(Vec<Sportsbook>, Vec<String>)> {
        let mut tx = self.begin().await?;
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        for item in items {
            if item.name.trim().is_empty() {
                continue;
            }
            if Self::find_sportsbook_by_name(&mut *tx, &item.name).await?.is_some() {
                skipped.push(item.name);
                continue;
            }
            let id = Self::insert_sportsbook(&mut *tx, &item.normalized()?).await?;
            let sportsbook = Self::find_sportsbook(&mut *tx, id).await?.ok_or_else(|| {
                LedgerError::Internal(format!("sportsbook {id} vanished after insert"))
            })?;
            created.push(sportsbook);
        }
        tx.commit().await?;

        info!(created = created.len(), skipped = skipped.len(), "Bulk-created sportsbooks");
        Ok((created, skipped))
    }

    /// Total and active sportsbook counts
    pub async fn sportsbook_counts(&self) -> Result<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0) FROM sportsbook",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Sportsbooks with at least one bet, busiest first
    pub async fn sportsbook_usage(&self, limit: i64) -> Result<Vec<SportsbookUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.name, COUNT(b.id) AS bet_count,
                   COALESCE(SUM(b.stake), 0.0) AS total_stake,
                   COALESCE(AVG(b.odds), 0.0) AS avg_odds
            FROM sportsbook s
            JOIN bet b ON b.sportsbook_id = s.id
            GROUP BY s.id, s.name
            ORDER BY bet_count DESC, s.id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SportsbookUsage {
                    sportsbook_id: row.try_get("id")?,
                    sportsbook_name: row.try_get("name")?,
                    bet_count: row.try_get("bet_count")?,
                    total_stake: row.try_get("total_stake")?,
                    avg_odds: row.try_get("avg_odds")?,
                    is_registered: true,
                })
            })
            .collect()
    }

    /// Deletes a sportsbook; fails with a conflict while bets or
    /// transactions still reference it.
    pub async fn delete_sportsbook(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sportsbook WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                LedgerError::from_constraint(
                    e,
                    "Sportsbook is referenced by bets or transactions",
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Accounts ====================

    pub async fn find_account<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    /// Exact, case-sensitive identifier match
    pub async fn find_account_by_identifier<'e, E: SqliteExecutor<'e>>(
        executor: E,
        identifier: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE account_identifier = ? LIMIT 1")
            .bind(identifier)
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip(self, account), fields(identifier = %account.account_identifier))]
    pub async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let mut tx = self.begin().await?;
        if Self::find_account_by_identifier(&mut *tx, &account.account_identifier)
            .await?
            .is_some()
        {
            return Err(LedgerError::Conflict(
                "Account with this identifier already exists".to_string(),
            ));
        }
        let name_taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE name = ?")
            .bind(&account.name)
            .fetch_one(&mut *tx)
            .await?;
        if name_taken > 0 {
            return Err(LedgerError::Conflict(
                "Account with this name already exists".to_string(),
            ));
        }

        let account_type = account
            .account_type
            .unwrap_or_else(|| AccountType::detect(&account.account_identifier));
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts
                (account_identifier, account_type, name, is_active, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.account_identifier)
        .bind(account_type.as_str())
        .bind(&account.name)
        .bind(account.is_active.unwrap_or(true))
        .bind(&account.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::from_constraint(e, "Account already exists"))?;

        let id = result.last_insert_rowid();
        let created = Self::find_account(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::Internal(format!("account {id} vanished after insert")))?;
        tx.commit().await?;
        Ok(created)
    }

    /// Apply a partial edit, keeping identifiers and names unique.
    /// `None` when the id is unknown.
    #[instrument(skip(self, update))]
    pub async fn update_account(&self, id: i64, update: &AccountUpdate) -> Result<Option<Account>> {
        let mut tx = self.begin().await?;
        let Some(mut account) = Self::find_account(&mut *tx, id).await? else {
            return Ok(None);
        };

        if let Some(identifier) = &update.account_identifier {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM accounts WHERE account_identifier = ? AND id != ?",
            )
            .bind(identifier)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(LedgerError::Conflict(
                    "Account with this identifier already exists".to_string(),
                ));
            }
        }
        if let Some(name) = &update.name {
            let taken: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE name = ? AND id != ?")
                    .bind(name)
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            if taken > 0 {
                return Err(LedgerError::Conflict(
                    "Account with this name already exists".to_string(),
                ));
            }
        }

        account.apply(update, Utc::now());
        sqlx::query(
            r#"
            UPDATE accounts
            SET account_identifier = ?, account_type = ?, name = ?, is_active = ?, notes = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.account_identifier)
        .bind(account.account_type.as_str())
        .bind(&account.name)
        .bind(account.is_active)
        .bind(&account.notes)
        .bind(account.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| LedgerError::from_constraint(e, "Account already exists"))?;
        tx.commit().await?;
        Ok(Some(account))
    }

    /// Delete an account. Bets and transactions that pointed at it keep
    /// their rows with no account.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: i64) -> Result<bool> {
        let mut tx = self.begin().await?;
        let detached_bets = sqlx::query("UPDATE bet SET account_id = NULL WHERE account_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let detached_transactions =
            sqlx::query("UPDATE transactions SET account_id = NULL WHERE account_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }
        tx.commit().await?;

        debug!(id, detached_bets, detached_transactions, "Deleted account");
        Ok(true)
    }

    /// `(total, active, email, phone)`
    pub async fn account_counts(&self) -> Result<(i64, i64, i64, i64)> {
        let counts: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN account_type = 'email' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN account_type = 'phone' THEN 1 ELSE 0 END), 0)
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    // ==================== Bets ====================

    #[instrument(skip(executor, bet), fields(event = %bet.event_name, stake = bet.stake))]
    pub async fn insert_bet<'e, E: SqliteExecutor<'e>>(executor: E, bet: &NewBet) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO bet
                (sport, event_name, bet_type, selection, sportsbook_id, account_id, arbitrage_id,
                 odds, stake, status, potential_payout, actual_payout, profit_loss,
                 date_placed, date_settled, kickoff, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0.0, 0.0, ?, NULL, ?, ?)
            "#,
        )
        .bind(&bet.sport)
        .bind(&bet.event_name)
        .bind(&bet.bet_type)
        .bind(&bet.selection)
        .bind(bet.sportsbook_id)
        .bind(bet.account_id)
        .bind(bet.arbitrage_id)
        .bind(bet.odds)
        .bind(bet.stake)
        .bind(BetStatus::Pending.as_str())
        .bind(bet.potential_payout())
        .bind(Utc::now())
        .bind(bet.kickoff)
        .bind(&bet.notes)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_bet<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<Option<Bet>> {
        let sql = format!("{BET_SELECT} WHERE b.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(bet_from_row).transpose()
    }

    pub async fn get_bet(&self, id: i64) -> Result<Option<Bet>> {
        Self::find_bet(&self.pool, id).await
    }

    /// Pending bets first, then newest first
    pub async fn list_bets(&self, status: Option<&str>, sport: Option<&str>) -> Result<Vec<Bet>> {
        let mut qb = QueryBuilder::<Sqlite>::new(BET_SELECT);
        qb.push(" WHERE 1=1");
        if let Some(status) = status {
            qb.push(" AND b.status = ").push_bind(status);
        }
        if let Some(sport) = sport {
            qb.push(" AND b.sport = ").push_bind(sport);
        }
        qb.push(
            " ORDER BY CASE WHEN b.status = 'pending' THEN 0 ELSE 1 END, b.date_placed DESC, b.id DESC",
        );

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(bet_from_row).collect()
    }

    /// Write back every mutable column of a bet
    #[instrument(skip(executor, bet), fields(id = bet.id, status = %bet.status))]
    pub async fn save_bet<'e, E: SqliteExecutor<'e>>(executor: E, bet: &Bet) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bet SET
                sport = ?, event_name = ?, bet_type = ?, selection = ?,
                sportsbook_id = ?, account_id = ?, odds = ?, stake = ?, status = ?,
                potential_payout = ?, actual_payout = ?, profit_loss = ?,
                date_settled = ?, kickoff = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(&bet.sport)
        .bind(&bet.event_name)
        .bind(&bet.bet_type)
        .bind(&bet.selection)
        .bind(bet.sportsbook_id)
        .bind(bet.account_id)
        .bind(bet.odds)
        .bind(bet.stake)
        .bind(bet.status.as_str())
        .bind(bet.potential_payout)
        .bind(bet.actual_payout)
        .bind(bet.profit_loss)
        .bind(bet.date_settled)
        .bind(bet.kickoff)
        .bind(&bet.notes)
        .bind(bet.id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_bet(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bet WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Transactions ====================

    #[instrument(skip(executor, tx), fields(kind = %tx.transaction_type.as_str(), amount = tx.amount))]
    pub async fn insert_transaction<'e, E: SqliteExecutor<'e>>(
        executor: E,
        tx: &LedgerTransaction,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions
                (transaction_type, sportsbook_id, account_id, amount, tax, transaction_charges,
                 payment_method, reference_id, status, date_created, date_processed, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.transaction_type.as_str())
        .bind(tx.sportsbook_id)
        .bind(tx.account_id)
        .bind(tx.amount)
        .bind(tx.tax)
        .bind(tx.transaction_charges)
        .bind(&tx.payment_method)
        .bind(&tx.reference_id)
        .bind(&tx.status)
        .bind(tx.date_created)
        .bind(tx.date_processed)
        .bind(&tx.notes)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_transaction<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<LedgerTransaction>> {
        let sql = format!("{TRANSACTION_SELECT} WHERE t.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    /// Newest first; returns the page and the unpaginated total
    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<(Vec<LedgerTransaction>, i64)> {
        fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &TransactionQuery) {
            qb.push(" WHERE 1=1");
            if let Some(kind) = &query.transaction_type {
                qb.push(" AND t.transaction_type = ").push_bind(kind.clone());
            }
            if let Some(status) = &query.status {
                qb.push(" AND t.status = ").push_bind(status.clone());
            }
        }

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM transactions t");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut qb = QueryBuilder::<Sqlite>::new(TRANSACTION_SELECT);
        push_filters(&mut qb, query);
        qb.push(" ORDER BY t.date_created DESC, t.id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);
        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    /// Write back every mutable column of a transaction
    #[instrument(skip(executor, tx), fields(id = tx.id, status = %tx.status))]
    pub async fn save_transaction<'e, E: SqliteExecutor<'e>>(
        executor: E,
        tx: &LedgerTransaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET transaction_type = ?, sportsbook_id = ?, account_id = ?, amount = ?, tax = ?,
                transaction_charges = ?, payment_method = ?, reference_id = ?, status = ?,
                date_processed = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(tx.transaction_type.as_str())
        .bind(tx.sportsbook_id)
        .bind(tx.account_id)
        .bind(tx.amount)
        .bind(tx.tax)
        .bind(tx.transaction_charges)
        .bind(&tx.payment_method)
        .bind(&tx.reference_id)
        .bind(&tx.status)
        .bind(tx.date_processed)
        .bind(&tx.notes)
        .bind(tx.id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Every transaction with status `completed`, oldest first
    pub async fn completed_transactions(&self) -> Result<Vec<LedgerTransaction>> {
        let sql = format!("{TRANSACTION_SELECT} WHERE t.status = 'completed' ORDER BY t.id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(transaction_from_row).collect()
    }

    pub async fn delete_transaction(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Arbitrages ====================

    #[instrument(skip(executor, arb), fields(signature = %arb.match_signature, profit = arb.profit))]
    pub async fn insert_arbitrage<'e, E: SqliteExecutor<'e>>(
        executor: E,
        arb: &NewArbitrage,
    ) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO arbitrage
                (match_signature, profit, kickoff_datetime, combination_details, is_active,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&arb.match_signature)
        .bind(arb.profit)
        .bind(&arb.kickoff_datetime)
        .bind(&arb.combination_details)
        .bind(arb.is_active)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_arbitrage<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: i64,
    ) -> Result<Option<ArbitrageOpportunity>> {
        let sql = format!("SELECT {ARBITRAGE_COLUMNS} FROM arbitrage WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
        row.as_ref().map(arbitrage_from_row).transpose()
    }

    pub async fn get_arbitrage(&self, id: i64) -> Result<Option<ArbitrageOpportunity>> {
        Self::find_arbitrage(&self.pool, id).await
    }

    pub async fn create_arbitrage(&self, arb: &NewArbitrage) -> Result<ArbitrageOpportunity> {
        let id = Self::insert_arbitrage(&self.pool, arb).await?;
        self.get_arbitrage(id)
            .await?
            .ok_or_else(|| LedgerError::Internal(format!("arbitrage {id} vanished after insert")))
    }

    /// Opportunities matching `filter`, in insertion order.
    ///
    /// Profit bounds and the active flag run in SQL; leg-level predicates
    /// are applied on the decoded rows.
    pub async fn list_arbitrages(&self, filter: &ArbitrageFilter) -> Result<Vec<ArbitrageOpportunity>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ARBITRAGE_COLUMNS} FROM arbitrage WHERE 1=1"
        ));
        if let Some(min) = filter.min_profit {
            qb.push(" AND profit >= ").push_bind(min);
        }
        if let Some(max) = filter.max_profit {
            qb.push(" AND profit <= ").push_bind(max);
        }
        if let Some(active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        qb.push(" ORDER BY id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let opp = arbitrage_from_row(row)?;
            if filter.matches(&opp) {
                items.push(opp);
            }
        }
        debug!(count = items.len(), "Loaded arbitrage opportunities");
        Ok(items)
    }

    pub async fn arbitrages_by_signature(&self, signature: &str) -> Result<Vec<ArbitrageOpportunity>> {
        let sql = format!(
            "SELECT {ARBITRAGE_COLUMNS} FROM arbitrage WHERE match_signature = ? ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql).bind(signature).fetch_all(&self.pool).await?;
        rows.iter().map(arbitrage_from_row).collect()
    }

    /// True when an opportunity with the same signature, profit and
    /// first-leg market already exists
    pub async fn arbitrage_exists<'e, E: SqliteExecutor<'e>>(
        executor: E,
        arb: &NewArbitrage,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT {ARBITRAGE_COLUMNS} FROM arbitrage WHERE match_signature = ? AND profit = ?"
        );
        let rows = sqlx::query(&sql)
            .bind(&arb.match_signature)
            .bind(arb.profit)
            .fetch_all(executor)
            .await?;
        for row in &rows {
            if arbitrage_from_row(row)?.market() == arb.market {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn update_arbitrage(
        &self,
        id: i64,
        changes: &ArbitrageChanges,
    ) -> Result<Option<ArbitrageOpportunity>> {
        let mut tx = self.begin().await?;
        let Some(mut current) = Self::find_arbitrage(&mut *tx, id).await? else {
            return Ok(None);
        };

        if let Some(profit) = changes.profit {
            current.profit = profit;
        }
        if let Some(signature) = &changes.match_signature {
            current.match_signature = signature.clone();
        }
        if let Some(kickoff) = &changes.kickoff_datetime {
            current.kickoff_datetime = Some(kickoff.clone()).filter(|k| !k.trim().is_empty());
        }
        if let Some(details) = &changes.combination_details {
            current.combination_details = details.clone();
        }
        if let Some(active) = changes.is_active {
            current.is_active = active;
        }

        sqlx::query(
            r#"
            UPDATE arbitrage SET
                match_signature = ?, profit = ?, kickoff_datetime = ?,
                combination_details = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&current.match_signature)
        .bind(current.profit)
        .bind(&current.kickoff_datetime)
        .bind(&current.combination_details)
        .bind(current.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = Self::find_arbitrage(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_arbitrage(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM arbitrage WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_arbitrages<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<u64> {
        let result = sqlx::query("DELETE FROM arbitrage").execute(executor).await?;
        Ok(result.rows_affected())
    }
}

// ==================== Row mapping ====================

fn sportsbook_from_row(row: &SqliteRow) -> Result<Sportsbook> {
    Ok(Sportsbook {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        website_url: row.try_get("website_url")?,
        logo_url: row.try_get("logo_url")?,
        is_active: row.try_get("is_active")?,
        country: row.try_get("country")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    let account_type: String = row.try_get("account_type")?;
    Ok(Account {
        id: row.try_get("id")?,
        account_identifier: row.try_get("account_identifier")?,
        account_type: AccountType::try_from(account_type.as_str())?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet> {
    let status: String = row.try_get("status")?;
    Ok(Bet {
        id: row.try_get("id")?,
        sport: row.try_get("sport")?,
        event_name: row.try_get("event_name")?,
        bet_type: row.try_get("bet_type")?,
        selection: row.try_get("selection")?,
        sportsbook_id: row.try_get("sportsbook_id")?,
        sportsbook: row.try_get("sportsbook_name")?,
        account_id: row.try_get("account_id")?,
        account: row.try_get("account_identifier")?,
        account_name: row.try_get("account_name")?,
        arbitrage_id: row.try_get("arbitrage_id")?,
        odds: row.try_get("odds")?,
        stake: row.try_get("stake")?,
        status: BetStatus::try_from(status.as_str())?,
        potential_payout: row.try_get("potential_payout")?,
        actual_payout: row.try_get("actual_payout")?,
        profit_loss: row.try_get("profit_loss")?,
        date_placed: row.try_get("date_placed")?,
        date_settled: row.try_get("date_settled")?,
        kickoff: row.try_get("kickoff")?,
        notes: row.try_get("notes")?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<LedgerTransaction> {
    let kind: String = row.try_get("transaction_type")?;
    Ok(LedgerTransaction {
        id: row.try_get("id")?,
        transaction_type: TransactionType::try_from(kind.as_str())?,
        sportsbook_id: row.try_get("sportsbook_id")?,
        sportsbook: row.try_get("sportsbook_name")?,
        account_id: row.try_get("account_id")?,
        account: row.try_get("account_identifier")?,
        account_name: row.try_get("account_name")?,
        amount: row.try_get("amount")?,
        tax: row.try_get("tax")?,
        transaction_charges: row.try_get("transaction_charges")?,
        payment_method: row.try_get("payment_method")?,
        reference_id: row.try_get("reference_id")?,
        status: row.try_get("status")?,
        date_created: row.try_get("date_created")?,
        date_processed: row.try_get("date_processed")?,
        notes: row.try_get("notes")?,
    })
}

fn arbitrage_from_row(row: &SqliteRow) -> Result<ArbitrageOpportunity> {
    Ok(ArbitrageOpportunity {
        id: row.try_get("id")?,
        match_signature: row.try_get("match_signature")?,
        profit: row.try_get("profit")?,
        kickoff_datetime: row.try_get("kickoff_datetime")?,
        combination_details: row.try_get("combination_details")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
