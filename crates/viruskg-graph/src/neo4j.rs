//! Neo4j store over Bolt.
//!
//! Every batch is one `UNWIND $rows ... MERGE` statement, run as a single
//! auto-commit transaction. Relation labels travel inside `$rows`; the query
//! text is fixed per encoding.

use neo4rs::{query, BoltList, BoltMap, BoltString, BoltType, ConfigBuilder, Graph};
use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Runtime};

use crate::store::{EdgeUpsert, GraphStore};
use crate::{GraphError, Result};

/// How the relation label is stored on the edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationEncoding {
    /// The label is the relationship type (`$(...)` dynamic types, Neo4j 5.26+).
    #[default]
    DynamicType,
    /// One `RELATION` type with the label in a `type` property.
    TypeProperty,
}

impl RelationEncoding {
    pub fn merge_query(&self) -> &'static str {
        match self {
            RelationEncoding::DynamicType => MERGE_DYNAMIC_TYPE,
            RelationEncoding::TypeProperty => MERGE_TYPE_PROPERTY,
        }
    }
}

const MERGE_DYNAMIC_TYPE: &str = "UNWIND $rows AS row \
     MERGE (a:Entity {name: row.subject}) \
     MERGE (b:Entity {name: row.object}) \
     MERGE (a)-[:$(row.relation)]->(b)";

const MERGE_TYPE_PROPERTY: &str = "UNWIND $rows AS row \
     MERGE (a:Entity {name: row.subject}) \
     MERGE (b:Entity {name: row.object}) \
     MERGE (a)-[:RELATION {type: row.relation}]->(b)";

const ENTITY_NAME_CONSTRAINT: &str =
    "CREATE CONSTRAINT entity_name_unique IF NOT EXISTS FOR (n:Entity) REQUIRE n.name IS UNIQUE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub encoding: RelationEncoding,
    pub ensure_constraints: bool,
    pub max_connections: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            encoding: RelationEncoding::default(),
            ensure_constraints: true,
            max_connections: 2,
        }
    }
}

/// One long-lived session, opened on the first batch.
///
/// The driver is async; this store owns a current-thread runtime and blocks
/// on it, so callers stay synchronous.
pub struct Neo4jGraph {
    config: Neo4jConfig,
    runtime: Runtime,
    graph: Option<Graph>,
}

impl Neo4jGraph {
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        if config.password.is_empty() {
            return Err(GraphError::Config(
                "Neo4j password is required for graph ingestion".to_string(),
            ));
        }
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            config,
            runtime,
            graph: None,
        })
    }

    /// Connect if needed. A failed connect leaves no session behind, so the
    /// next batch retries.
    fn session(&mut self) -> Result<Graph> {
        if let Some(graph) = &self.graph {
            return Ok(graph.clone());
        }

        let mut builder = ConfigBuilder::default()
            .uri(self.config.uri.as_str())
            .user(self.config.user.as_str())
            .password(self.config.password.as_str())
            .max_connections(self.config.max_connections.max(1));
        if let Some(db) = &self.config.database {
            builder = builder.db(db.as_str());
        }
        let bolt_config = builder.build()?;

        let graph = self.runtime.block_on(Graph::connect(bolt_config))?;
        if self.config.ensure_constraints {
            self.runtime
                .block_on(graph.run(query(ENTITY_NAME_CONSTRAINT)))?;
        }
        tracing::info!(uri = %self.config.uri, encoding = ?self.config.encoding, "connected to Neo4j");

        self.graph = Some(graph.clone());
        Ok(graph)
    }
}

/// `[{subject, relation, object}, ...]` as a Bolt list parameter.
fn rows_param(batch: &[EdgeUpsert]) -> BoltType {
    let mut rows = BoltList::with_capacity(batch.len());
    for edge in batch {
        let mut row = BoltMap::with_capacity(3);
        row.put(BoltString::from("subject"), BoltType::from(edge.subject.as_str()));
        row.put(BoltString::from("relation"), BoltType::from(edge.relation.as_str()));
        row.put(BoltString::from("object"), BoltType::from(edge.object.as_str()));
        rows.push(BoltType::Map(row));
    }
    BoltType::List(rows)
}

impl GraphStore for Neo4jGraph {
    fn merge_batch(&mut self, batch: &[EdgeUpsert]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let graph = self.session()?;
        let q = query(self.config.encoding.merge_query()).param("rows", rows_param(batch));
        self.runtime.block_on(graph.run(q))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "neo4j"
    }
}
