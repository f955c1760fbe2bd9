/// Persistence collaborators for flow records
///
/// `FlowPersistence` is the boundary the lifecycle saves and loads through.
/// `FlowStorage` backs it with SQLite: records are stored as a JSON column with a
/// few indexed lookup fields next to it. `InMemoryStorage` keeps records in a map.

use crate::error::{FlowError, Result};
use crate::flow::serializer::PersistedFlow;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;

/// Save/load boundary used by the lifecycle
///
/// Implementations own retries and timeouts; callers never retry.
#[async_trait]
pub trait FlowPersistence: Send + Sync {
    async fn save(&self, flow: &PersistedFlow) -> Result<()>;

    async fn load(&self, id: &str) -> Result<PersistedFlow>;
}

/// SQLite-based flow storage
#[derive(Debug, Clone)]
pub struct FlowStorage {
    /// SQLite connection pool for the flow database
    pool: SqlitePool,
}

impl FlowStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) a database file and initialize the schema
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("Failed to create data directory '{}': {}", parent.display(), e)
            })?;
        }

        tracing::info!("Opening flow database: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Private in-memory database on one connection that is never reaped
    ///
    /// The database lives exactly as long as that connection, so it must not be
    /// closed for idleness or age.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the flow storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                crew_id TEXT,
                status TEXT NOT NULL,
                definition JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_flows_crew ON flows(crew_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Store a new flow or update an existing one
    pub async fn save_flow(&self, flow: &PersistedFlow) -> anyhow::Result<()> {
        let definition_json = serde_json::to_string(flow)?;
        let status = flow.status.to_string();

        sqlx::query(
            r#"
            INSERT INTO flows (id, name, crew_id, status, definition, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                crew_id = excluded.crew_id,
                status = excluded.status,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&flow.id)
        .bind(&flow.name)
        .bind(&flow.crew_id)
        .bind(&status)
        .bind(&definition_json)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored flow '{}' ({} bytes)", flow.id, definition_json.len());
        Ok(())
    }

    /// Retrieve a flow record by ID
    pub async fn get_flow(&self, id: &str) -> anyhow::Result<Option<PersistedFlow>> {
        let row = sqlx::query("SELECT definition FROM flows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition_json: String = row.get("definition");
                let flow: PersistedFlow = serde_json::from_str(&definition_json)?;
                Ok(Some(flow))
            }
            None => Ok(None),
        }
    }

    /// List all flows with basic metadata, most recently updated first
    pub async fn list_flows(&self) -> anyhow::Result<Vec<FlowMetadata>> {
        let rows = sqlx::query(
            "SELECT id, name, crew_id, status, updated_at FROM flows ORDER BY updated_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let flows = rows
            .into_iter()
            .map(|row| FlowMetadata {
                id: row.get("id"),
                name: row.get("name"),
                crew_id: row.get("crew_id"),
                status: row.get("status"),
                updated_at: row.get("updated_at"),
            })
            .collect();

        Ok(flows)
    }
}

#[async_trait]
impl FlowPersistence for FlowStorage {
    async fn save(&self, flow: &PersistedFlow) -> Result<()> {
        self.save_flow(flow).await.map_err(FlowError::persistence)
    }

    async fn load(&self, id: &str) -> Result<PersistedFlow> {
        self.get_flow(id)
            .await
            .map_err(FlowError::persistence)?
            .ok_or_else(|| FlowError::NotFound(id.to_string()))
    }
}

/// Basic flow metadata for listing operations
#[derive(Debug, Clone, serde::Serialize)]
pub struct FlowMetadata {
    pub id: String,
    pub name: String,
    pub crew_id: Option<String>,
    pub status: String,
    pub updated_at: String,
}

/// Map-backed persistence for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    flows: RwLock<HashMap<String, PersistedFlow>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.flows.read().await.is_empty()
    }
}

#[async_trait]
impl FlowPersistence for InMemoryStorage {
    async fn save(&self, flow: &PersistedFlow) -> Result<()> {
        self.flows
            .write()
            .await
            .insert(flow.id.clone(), flow.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<PersistedFlow> {
        self.flows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::serializer::to_persisted;
    use crate::flow::types::{Flow, FlowStatus, Node, NodeType};

    fn record(id: &str) -> PersistedFlow {
        let mut flow = Flow::new(id, format!("Flow {id}")).with_crew("crew-1");
        flow.graph
            .add_node(Node::new("start", NodeType::Event, "Start"))
            .unwrap();
        flow.graph
            .add_node(Node::new("task", NodeType::Task, "Task"))
            .unwrap();
        flow.graph.connect("start", "task", None).unwrap();
        to_persisted(&flow)
    }

    #[tokio::test]
    async fn test_in_memory_connection_is_never_recycled() {
        let storage = FlowStorage::in_memory().await.unwrap();
        let options = storage.pool.options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_save_and_load() {
        let storage = FlowStorage::in_memory().await.unwrap();
        let flow = record("flow-a");

        storage.save(&flow).await.unwrap();
        let loaded = storage.load("flow-a").await.unwrap();
        assert_eq!(loaded, flow);
    }

    #[tokio::test]
    async fn test_sqlite_upsert_replaces() {
        let storage = FlowStorage::in_memory().await.unwrap();
        let mut flow = record("flow-a");
        storage.save(&flow).await.unwrap();

        flow.name = "Renamed".into();
        flow.status = FlowStatus::Running;
        storage.save(&flow).await.unwrap();

        let listed = storage.list_flows().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Renamed");
        assert_eq!(listed[0].status, "running");
        assert_eq!(listed[0].crew_id.as_deref(), Some("crew-1"));
        assert_eq!(storage.load("flow-a").await.unwrap(), flow);
    }

    #[tokio::test]
    async fn test_sqlite_missing_flow() {
        let storage = FlowStorage::in_memory().await.unwrap();
        let err = storage.load("nope").await.unwrap_err();
        assert!(matches!(err, FlowError::NotFound(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flows.db");
        let flow = record("flow-b");

        {
            let storage = FlowStorage::open(&path).await.unwrap();
            storage.save(&flow).await.unwrap();
        }

        let storage = FlowStorage::open(&path).await.unwrap();
        assert_eq!(storage.load("flow-b").await.unwrap(), flow);
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty().await);
        storage.save(&record("flow-c")).await.unwrap();
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.load("flow-c").await.unwrap().id, "flow-c");
        assert!(matches!(
            storage.load("other").await,
            Err(FlowError::NotFound(_))
        ));
    }
}
