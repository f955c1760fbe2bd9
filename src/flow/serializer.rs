/// Flow serialization
///
/// Converts between the in-memory `Flow` and the persisted record. The record's
/// JSON form doubles as the file export/import format.

use crate::error::Result;
use crate::flow::graph::GraphModel;
use crate::flow::types::{Edge, Flow, FlowStatus, InterventionPoint, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The persisted flow record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFlow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew_id: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: FlowStatus,
    #[serde(default)]
    pub human_intervention_points: Vec<InterventionPoint>,
}

pub fn to_persisted(flow: &Flow) -> PersistedFlow {
    PersistedFlow {
        id: flow.id.clone(),
        name: flow.name.clone(),
        description: flow.description.clone(),
        crew_id: flow.crew_id.clone(),
        nodes: flow.graph.nodes().cloned().collect(),
        edges: flow.graph.edges().cloned().collect(),
        created_at: flow.created_at,
        updated_at: flow.updated_at,
        last_run: flow.last_run,
        status: flow.status,
        human_intervention_points: flow.intervention_points.clone(),
    }
}

/// Rebuild a flow from its record
///
/// The graph is rebuilt through `GraphModel`, so a record with dangling edges,
/// duplicate ids or duplicate exclusive handles is rejected.
pub fn from_persisted(record: PersistedFlow) -> Result<Flow> {
    let graph = GraphModel::from_parts(record.nodes, record.edges)?;

    Ok(Flow {
        id: record.id,
        name: record.name,
        description: record.description,
        crew_id: record.crew_id,
        graph,
        created_at: record.created_at,
        updated_at: record.updated_at,
        last_run: record.last_run,
        status: record.status,
        intervention_points: record.human_intervention_points,
    })
}

pub fn to_json(flow: &Flow) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_persisted(flow))?)
}

pub fn from_json(json: &str) -> Result<Flow> {
    let record: PersistedFlow = serde_json::from_str(json)?;
    from_persisted(record)
}

/// Write a flow to `path` in the export format
pub fn export_to_file(flow: &Flow, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_json(flow)?)?;
    tracing::info!("Exported flow '{}' to {}", flow.id, path.display());
    Ok(())
}

/// Read a flow previously written by `export_to_file`
pub fn import_from_file(path: impl AsRef<Path>) -> Result<Flow> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let flow = from_json(&json)?;
    tracing::info!(
        "Imported flow '{}' ({} nodes, {} edges) from {}",
        flow.id,
        flow.graph.node_count(),
        flow.graph.edge_count(),
        path.display()
    );
    Ok(flow)
}
