use std::collections::HashMap;

use sqlx::{Row, SqlitePool};

use common::{Result, Trade};

/// Persistence for the trade ledger: one row per trade, keyed by trade id,
/// with the full record as a JSON document column. The open→closed
/// transition moves the row between tables inside one transaction, so a
/// crash mid-write can never leave a trade in both tables or neither.
pub struct TradeStore {
    pool: SqlitePool,
}

impl TradeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent DDL, run once at startup.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS active_trades (
                trade_id TEXT PRIMARY KEY,
                asset    TEXT NOT NULL,
                doc      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_history (
                trade_id  TEXT PRIMARY KEY,
                asset     TEXT NOT NULL,
                exit_time TEXT NOT NULL,
                doc       TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert an open trade (used on open and on last-update refresh).
    pub async fn save_active(&self, trade: &Trade) -> Result<()> {
        let doc = serde_json::to_string(trade)?;
        sqlx::query(
            r#"
            INSERT INTO active_trades (trade_id, asset, doc) VALUES (?1, ?2, ?3)
            ON CONFLICT(trade_id) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.asset)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move a trade from the active table to history, transactionally.
    pub async fn save_closed(&self, trade: &Trade) -> Result<()> {
        let doc = serde_json::to_string(trade)?;
        let exit_time = trade
            .exit_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM active_trades WHERE trade_id = ?1")
            .bind(&trade.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO trade_history (trade_id, asset, exit_time, doc)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(trade_id) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.asset)
        .bind(exit_time)
        .bind(doc)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Reload both trade sets, field-for-field.
    pub async fn load(&self) -> Result<(HashMap<String, Trade>, HashMap<String, Trade>)> {
        let active = self.load_table("active_trades").await?;
        let history = self.load_table("trade_history").await?;
        Ok((active, history))
    }

    async fn load_table(&self, table: &str) -> Result<HashMap<String, Trade>> {
        let rows = sqlx::query(&format!("SELECT trade_id, doc FROM {table}"))
            .fetch_all(&self.pool)
            .await?;

        let mut trades = HashMap::new();
        for row in rows {
            let trade_id: String = row.get("trade_id");
            let doc: String = row.get("doc");
            trades.insert(trade_id, serde_json::from_str(&doc)?);
        }
        Ok(trades)
    }
}
