//! SQLite-backed store.
//!
//! Currency columns are stored as canonical decimal TEXT so the exact
//! fixed-point values round-trip without float drift; risk metrics are
//! a JSON blob (cosmetic data, never queried); timestamps are RFC 3339
//! strings. The schema is applied idempotently at connect time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

use super::{Store, StoreError};
use crate::types::{Bankroll, BetCategory, RiskMetrics, Wager};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS bankrolls (
    agent_id         TEXT PRIMARY KEY,
    season           TEXT,
    starting_balance TEXT NOT NULL,
    current_balance  TEXT NOT NULL,
    status           TEXT NOT NULL,
    risk_tier        TEXT NOT NULL,
    metrics          TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wagers (
    id             TEXT PRIMARY KEY,
    agent_id       TEXT NOT NULL,
    game_id        TEXT NOT NULL,
    category       TEXT NOT NULL,
    amount         TEXT NOT NULL,
    odds           TEXT NOT NULL,
    confidence     TEXT NOT NULL,
    result         TEXT NOT NULL,
    balance_before TEXT NOT NULL,
    balance_after  TEXT,
    payout         TEXT NOT NULL,
    kelly_fraction TEXT NOT NULL,
    multiplier     TEXT NOT NULL,
    edge           TEXT NOT NULL,
    reasoning      TEXT,
    placed_at      TEXT NOT NULL,
    settled_at     TEXT
);

CREATE INDEX IF NOT EXISTS idx_wagers_agent ON wagers (agent_id, placed_at);
CREATE INDEX IF NOT EXISTS idx_wagers_game_result ON wagers (game_id, result);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to the given SQLite URL (creating the file if needed)
    /// and apply the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .create_if_missing(true);
        // One connection: SQLite serializes writers anyway, and a
        // `sqlite::memory:` URL would otherwise open a fresh empty
        // database per pooled connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(%url, "SQLite store ready");
        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn get_decimal(row: &SqliteRow, col: &str) -> Result<Decimal, StoreError> {
    let raw: String = row.try_get(col)?;
    Decimal::from_str(&raw)
        .map_err(|e| StoreError::Unavailable(format!("bad decimal in {col}: {e}")))
}

fn get_opt_decimal(row: &SqliteRow, col: &str) -> Result<Option<Decimal>, StoreError> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|s| {
        Decimal::from_str(&s)
            .map_err(|e| StoreError::Unavailable(format!("bad decimal in {col}: {e}")))
    })
    .transpose()
}

fn get_timestamp(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw: String = row.try_get(col)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Unavailable(format!("bad timestamp in {col}: {e}")))
}

fn get_opt_timestamp(row: &SqliteRow, col: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StoreError::Unavailable(format!("bad timestamp in {col}: {e}")))
    })
    .transpose()
}

fn parse_field<T>(raw: &str, col: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| StoreError::Unavailable(format!("bad {col}: {e}")))
}

fn bankroll_from_row(row: &SqliteRow) -> Result<Bankroll, StoreError> {
    let status: String = row.try_get("status")?;
    let risk_tier: String = row.try_get("risk_tier")?;
    let metrics_json: String = row.try_get("metrics")?;
    let metrics: RiskMetrics = serde_json::from_str(&metrics_json)
        .map_err(|e| StoreError::Unavailable(format!("bad metrics JSON: {e}")))?;
    Ok(Bankroll {
        agent_id: row.try_get("agent_id")?,
        season: row.try_get("season")?,
        starting_balance: get_decimal(row, "starting_balance")?,
        current_balance: get_decimal(row, "current_balance")?,
        status: parse_field(&status, "status")?,
        risk_tier: parse_field(&risk_tier, "risk_tier")?,
        metrics,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn wager_from_row(row: &SqliteRow) -> Result<Wager, StoreError> {
    let category: String = row.try_get("category")?;
    let odds: String = row.try_get("odds")?;
    let result: String = row.try_get("result")?;
    Ok(Wager {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        game_id: row.try_get("game_id")?,
        category: BetCategory::parse(&category),
        amount: get_decimal(row, "amount")?,
        odds: odds
            .parse()
            .map_err(|e| StoreError::Unavailable(format!("bad odds: {e}")))?,
        confidence: get_decimal(row, "confidence")?,
        result: parse_field(&result, "result")?,
        balance_before: get_decimal(row, "balance_before")?,
        balance_after: get_opt_decimal(row, "balance_after")?,
        payout: get_decimal(row, "payout")?,
        kelly_fraction: get_decimal(row, "kelly_fraction")?,
        multiplier: get_decimal(row, "multiplier")?,
        edge: get_decimal(row, "edge")?,
        reasoning: row.try_get("reasoning")?,
        placed_at: get_timestamp(row, "placed_at")?,
        settled_at: get_opt_timestamp(row, "settled_at")?,
    })
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for SqliteStore {
    async fn get_bankroll(&self, agent_id: &str) -> Result<Option<Bankroll>, StoreError> {
        let row = sqlx::query("SELECT * FROM bankrolls WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(bankroll_from_row).transpose()
    }

    async fn put_bankroll(&self, bankroll: &Bankroll) -> Result<(), StoreError> {
        let metrics = serde_json::to_string(&bankroll.metrics)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO bankrolls
                (agent_id, season, starting_balance, current_balance,
                 status, risk_tier, metrics, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&bankroll.agent_id)
        .bind(&bankroll.season)
        .bind(bankroll.starting_balance.to_string())
        .bind(bankroll.current_balance.to_string())
        .bind(bankroll.status.to_string())
        .bind(bankroll.risk_tier.to_string())
        .bind(metrics)
        .bind(bankroll.created_at.to_rfc3339())
        .bind(bankroll.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_bankrolls(&self) -> Result<Vec<Bankroll>, StoreError> {
        let rows = sqlx::query("SELECT * FROM bankrolls")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(bankroll_from_row).collect()
    }

    async fn insert_wager(&self, wager: &Wager) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO wagers
                (id, agent_id, game_id, category, amount, odds, confidence,
                 result, balance_before, balance_after, payout,
                 kelly_fraction, multiplier, edge, reasoning,
                 placed_at, settled_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&wager.id)
        .bind(&wager.agent_id)
        .bind(&wager.game_id)
        .bind(wager.category.to_string())
        .bind(wager.amount.to_string())
        .bind(wager.odds.to_string())
        .bind(wager.confidence.to_string())
        .bind(wager.result.to_string())
        .bind(wager.balance_before.to_string())
        .bind(wager.balance_after.map(|d| d.to_string()))
        .bind(wager.payout.to_string())
        .bind(wager.kelly_fraction.to_string())
        .bind(wager.multiplier.to_string())
        .bind(wager.edge.to_string())
        .bind(&wager.reasoning)
        .bind(wager.placed_at.to_rfc3339())
        .bind(wager.settled_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(wager.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_wager(&self, wager: &Wager) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE wagers SET
                result = ?2, balance_after = ?3, payout = ?4, settled_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&wager.id)
        .bind(wager.result.to_string())
        .bind(wager.balance_after.map(|d| d.to_string()))
        .bind(wager.payout.to_string())
        .bind(wager.settled_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(wager.id.clone()));
        }
        Ok(())
    }

    async fn get_wager(&self, wager_id: &str) -> Result<Option<Wager>, StoreError> {
        let row = sqlx::query("SELECT * FROM wagers WHERE id = ?1")
            .bind(wager_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(wager_from_row).transpose()
    }

    async fn wagers_for_agent(&self, agent_id: &str) -> Result<Vec<Wager>, StoreError> {
        let rows = sqlx::query("SELECT * FROM wagers WHERE agent_id = ?1 ORDER BY placed_at")
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(wager_from_row).collect()
    }

    async fn pending_for_game(&self, game_id: &str) -> Result<Vec<Wager>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM wagers WHERE game_id = ?1 AND result = 'pending' ORDER BY placed_at",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(wager_from_row).collect()
    }
}
