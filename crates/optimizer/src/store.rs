use std::collections::HashMap;
use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use common::{Error, PerformanceRecord, Result, StrategyKind};

use crate::params::StrategyState;

/// Persistence for optimizer state: one row per strategy for weight/param
/// state, one row per trade id for performance records. Rows carry the full
/// value as a JSON document next to their key columns, so a write is one
/// transactional upsert, never a full-map rewrite.
pub struct OptimizerStore {
    pool: SqlitePool,
}

impl OptimizerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent DDL, run once at startup.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS strategy_state (
                strategy TEXT PRIMARY KEY,
                doc      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance_records (
                trade_id    TEXT PRIMARY KEY,
                strategy    TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                doc         TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_state(&self, kind: StrategyKind, state: &StrategyState) -> Result<()> {
        let doc = serde_json::to_string(state)?;
        sqlx::query(
            r#"
            INSERT INTO strategy_state (strategy, doc) VALUES (?1, ?2)
            ON CONFLICT(strategy) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(kind.name())
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_state(&self) -> Result<HashMap<StrategyKind, StrategyState>> {
        let rows = sqlx::query("SELECT strategy, doc FROM strategy_state")
            .fetch_all(&self.pool)
            .await?;

        let mut state = HashMap::new();
        for row in rows {
            let name: String = row.get("strategy");
            let doc: String = row.get("doc");
            let kind = StrategyKind::from_str(&name).map_err(Error::Other)?;
            state.insert(kind, serde_json::from_str(&doc)?);
        }
        Ok(state)
    }

    pub async fn save_record(&self, record: &PerformanceRecord) -> Result<()> {
        let doc = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO performance_records (trade_id, strategy, recorded_at, doc)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(trade_id) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(&record.trade_id)
        .bind(record.strategy.name())
        .bind(record.recorded_at.to_rfc3339())
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_records(&self) -> Result<HashMap<String, PerformanceRecord>> {
        let rows = sqlx::query("SELECT trade_id, doc FROM performance_records")
            .fetch_all(&self.pool)
            .await?;

        let mut records = HashMap::new();
        for row in rows {
            let trade_id: String = row.get("trade_id");
            let doc: String = row.get("doc");
            records.insert(trade_id, serde_json::from_str(&doc)?);
        }
        Ok(records)
    }
}
