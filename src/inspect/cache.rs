use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::inspect::INSPECTABLE_TABLES;

/// Injected time source so cache staleness is testable without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
}

struct Snapshot {
    fetched_at: OffsetDateTime,
    tables: Vec<TableMeta>,
}

/// Short-TTL cache over `information_schema` metadata for the allow-listed
/// tables. Refreshes at most once per TTL unless forced; explicit
/// invalidation drops the snapshot outright.
pub struct SchemaCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: RwLock<Option<Snapshot>>,
}

impl SchemaCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: RwLock::new(None),
        }
    }

    fn is_fresh(&self, fetched_at: OffsetDateTime) -> bool {
        self.clock.now() < fetched_at + self.ttl
    }

    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }

    /// Current metadata, refreshed from the store if stale or `force` is set.
    pub async fn tables(&self, db: &PgPool, force: bool) -> sqlx::Result<Vec<TableMeta>> {
        if !force {
            let guard = self.inner.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if self.is_fresh(snapshot.fetched_at) {
                    return Ok(snapshot.tables.clone());
                }
            }
        }

        let mut guard = self.inner.write().await;
        // Another request may have refreshed while we waited on the lock.
        if !force {
            if let Some(snapshot) = guard.as_ref() {
                if self.is_fresh(snapshot.fetched_at) {
                    return Ok(snapshot.tables.clone());
                }
            }
        }

        let tables = fetch_metadata(db).await?;
        debug!(tables = tables.len(), "schema metadata refreshed");
        *guard = Some(Snapshot {
            fetched_at: self.clock.now(),
            tables: tables.clone(),
        });
        Ok(tables)
    }
}

async fn fetch_metadata(db: &PgPool) -> sqlx::Result<Vec<TableMeta>> {
    let allowed: Vec<String> = INSPECTABLE_TABLES.iter().map(|t| t.to_string()).collect();
    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT table_name, column_name, data_type, is_nullable
         FROM information_schema.columns
         WHERE table_schema = 'public' AND table_name = ANY($1)
         ORDER BY table_name, ordinal_position",
    )
    .bind(allowed)
    .fetch_all(db)
    .await?;
    Ok(group_columns(rows))
}

fn group_columns(rows: Vec<(String, String, String, String)>) -> Vec<TableMeta> {
    let mut tables: Vec<TableMeta> = Vec::new();
    for (table, column, data_type, is_nullable) in rows {
        let column = ColumnMeta {
            name: column,
            data_type,
            is_nullable: is_nullable.eq_ignore_ascii_case("yes"),
        };
        match tables.last_mut() {
            Some(last) if last.name == table => last.columns.push(column),
            _ => tables.push(TableMeta {
                name: table,
                columns: vec![column],
            }),
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ManualClock {
        now: Mutex<OffsetDateTime>,
    }

    impl ManualClock {
        fn new(start: OffsetDateTime) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, by: Duration) {
            let mut guard = self.now.lock().unwrap();
            *guard += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn freshness_follows_the_injected_clock() {
        let clock = Arc::new(ManualClock::new(OffsetDateTime::UNIX_EPOCH));
        let cache = SchemaCache::new(Duration::from_secs(60), clock.clone());

        let fetched_at = clock.now();
        assert!(cache.is_fresh(fetched_at));

        clock.advance(Duration::from_secs(59));
        assert!(cache.is_fresh(fetched_at));

        clock.advance(Duration::from_secs(2));
        assert!(!cache.is_fresh(fetched_at));
    }

    #[tokio::test]
    async fn invalidate_drops_the_snapshot() {
        let clock = Arc::new(ManualClock::new(OffsetDateTime::UNIX_EPOCH));
        let cache = SchemaCache::new(Duration::from_secs(60), clock);
        {
            let mut guard = cache.inner.write().await;
            *guard = Some(Snapshot {
                fetched_at: OffsetDateTime::UNIX_EPOCH,
                tables: vec![],
            });
        }
        cache.invalidate().await;
        assert!(cache.inner.read().await.is_none());
    }

    #[test]
    fn group_columns_preserves_order_within_tables() {
        let rows = vec![
            ("sessions".into(), "id".into(), "uuid".into(), "NO".into()),
            ("sessions".into(), "token".into(), "text".into(), "NO".into()),
            ("users".into(), "id".into(), "uuid".into(), "NO".into()),
            ("users".into(), "name".into(), "text".into(), "YES".into()),
        ];
        let tables = group_columns(rows);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "sessions");
        assert_eq!(tables[0].columns.len(), 2);
        assert_eq!(tables[1].columns[1].name, "name");
        assert!(tables[1].columns[1].is_nullable);
        assert!(!tables[0].columns[0].is_nullable);
    }
}
