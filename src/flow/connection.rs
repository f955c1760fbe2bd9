/// Connection rules: edge kind derivation
///
/// The only place edge semantics are decided. Every edge that enters a graph is
/// classified here from its source node type and the output handle it leaves from.

use crate::flow::types::{EdgeKind, NodeType};

pub const HANDLE_TRUE: &str = "true";
pub const HANDLE_FALSE: &str = "false";
pub const HANDLE_APPROVED: &str = "approved";
pub const HANDLE_REJECTED: &str = "rejected";

/// Map (source type, handle) to an edge kind
///
/// | source         | handle     | kind      |
/// |----------------|------------|-----------|
/// | condition      | "true"     | success   |
/// | condition      | "false"    | failure   |
/// | human_approval | "approved" | approval  |
/// | human_approval | "rejected" | rejection |
/// | anything else  |            | default   |
pub fn classify(source_type: NodeType, handle: Option<&str>) -> EdgeKind {
    match (source_type, handle) {
        (NodeType::Condition, Some(HANDLE_TRUE)) => EdgeKind::Success,
        (NodeType::Condition, Some(HANDLE_FALSE)) => EdgeKind::Failure,
        (NodeType::HumanApproval, Some(HANDLE_APPROVED)) => EdgeKind::Approval,
        (NodeType::HumanApproval, Some(HANDLE_REJECTED)) => EdgeKind::Rejection,
        _ => EdgeKind::Default,
    }
}

/// Whether at most one outgoing edge may use `handle` on a node of `source_type`
pub fn is_exclusive_handle(source_type: NodeType, handle: Option<&str>) -> bool {
    matches!(
        (source_type, handle),
        (NodeType::Condition, Some(HANDLE_TRUE | HANDLE_FALSE))
            | (NodeType::HumanApproval, Some(HANDLE_APPROVED | HANDLE_REJECTED))
    )
}
