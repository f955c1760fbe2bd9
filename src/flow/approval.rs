/// Approval gate for flow launches
///
/// A flow may only run once every human_approval node has had its pending
/// approval checkpoint completed. Pending approvals are always derived from the
/// intervention list and the graph, never stored.

use crate::flow::types::{
    Flow, InterventionKind, InterventionPoint, InterventionStatus, NodeType,
};
use std::collections::BTreeSet;

/// Node ids of human_approval nodes with a pending approval checkpoint
///
/// Checkpoints whose node is no longer in the graph are ignored; the node may
/// come back through undo.
pub fn pending_approvals(flow: &Flow) -> BTreeSet<String> {
    flow.intervention_points
        .iter()
        .filter(|point| point.kind == InterventionKind::Approval && point.is_pending())
        .filter(|point| {
            flow.graph
                .find_node(&point.node_id)
                .is_some_and(|node| node.node_type == NodeType::HumanApproval)
        })
        .map(|point| point.node_id.clone())
        .collect()
}

pub fn can_run(flow: &Flow) -> bool {
    pending_approvals(flow).is_empty()
}

/// Complete the approval checkpoint of `node_id`
///
/// The checkpoint becomes `completed` whether `approved` is true or false; the
/// decision itself is not kept on the checkpoint. Unknown nodes are a no-op.
pub fn approve(mut flow: Flow, node_id: &str, approved: bool) -> Flow {
    complete_approval(&mut flow, node_id, approved);
    flow
}

/// In-place form of `approve`; returns whether a checkpoint matched
pub fn complete_approval(flow: &mut Flow, node_id: &str, approved: bool) -> bool {
    let mut matched = false;
    for point in flow
        .intervention_points
        .iter_mut()
        .filter(|point| point.node_id == node_id && point.kind == InterventionKind::Approval)
    {
        point.status = InterventionStatus::Completed;
        matched = true;
    }

    if matched {
        tracing::info!(
            "Approval checkpoint '{}' in flow '{}' completed (approved: {})",
            node_id,
            flow.id,
            approved
        );
    } else {
        tracing::debug!("No approval checkpoint for node '{}', ignoring", node_id);
    }

    matched
}

/// Register a pending approval checkpoint unless one is already pending
pub fn request_approval(flow: &mut Flow, node_id: &str) -> bool {
    request(flow, node_id, InterventionKind::Approval)
}

/// Register a pending input checkpoint unless one is already pending
pub fn request_input(flow: &mut Flow, node_id: &str) -> bool {
    request(flow, node_id, InterventionKind::Input)
}

/// Complete the input checkpoint of `node_id`; unknown nodes are a no-op
pub fn complete_input(mut flow: Flow, node_id: &str) -> Flow {
    for point in flow
        .intervention_points
        .iter_mut()
        .filter(|point| point.node_id == node_id && point.kind == InterventionKind::Input)
    {
        point.status = InterventionStatus::Completed;
    }
    flow
}

fn request(flow: &mut Flow, node_id: &str, kind: InterventionKind) -> bool {
    let already_pending = flow
        .intervention_points
        .iter()
        .any(|point| point.node_id == node_id && point.kind == kind && point.is_pending());
    if already_pending {
        return false;
    }

    // a completed checkpoint is reopened rather than duplicated
    if let Some(point) = flow
        .intervention_points
        .iter_mut()
        .find(|point| point.node_id == node_id && point.kind == kind)
    {
        point.status = InterventionStatus::Pending;
    } else {
        flow.intervention_points
            .push(InterventionPoint::pending(node_id, kind));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::Node;

    fn flow_with_gate() -> Flow {
        let mut flow = Flow::new("flow-1", "Gated");
        flow.graph
            .add_node(Node::new("start", NodeType::Event, "Start"))
            .unwrap();
        flow.graph
            .add_node(Node::new("gate", NodeType::HumanApproval, "Sign off"))
            .unwrap();
        flow.graph
            .add_node(Node::new("gate-2", NodeType::HumanApproval, "Second sign off"))
            .unwrap();
        request_approval(&mut flow, "gate");
        request_approval(&mut flow, "gate-2");
        flow
    }

    #[test]
    fn test_pending_blocks_run() {
        let flow = flow_with_gate();
        let pending = pending_approvals(&flow);
        assert_eq!(
            pending.into_iter().collect::<Vec<_>>(),
            vec!["gate".to_string(), "gate-2".to_string()]
        );
        assert!(!can_run(&flow));
    }

    #[test]
    fn test_approving_everything_unblocks() {
        let flow = flow_with_gate();
        let flow = approve(flow, "gate", true);
        assert!(!can_run(&flow));
        let flow = approve(flow, "gate-2", false);
        assert!(can_run(&flow));
        assert!(flow
            .intervention_points
            .iter()
            .all(|p| p.status == InterventionStatus::Completed));
    }

    #[test]
    fn test_approve_unknown_node_is_noop() {
        let flow = flow_with_gate();
        let before = flow.clone();
        let after = approve(flow, "nobody", true);
        assert_eq!(after, before);
    }

    #[test]
    fn test_input_checkpoints_do_not_gate() {
        let mut flow = flow_with_gate();
        flow = approve(flow, "gate", true);
        flow = approve(flow, "gate-2", true);
        assert!(request_input(&mut flow, "start"));
        assert!(can_run(&flow));

        flow = complete_input(flow, "start");
        assert!(flow
            .intervention_points
            .iter()
            .all(|p| p.status == InterventionStatus::Completed));
    }

    #[test]
    fn test_non_approval_node_does_not_gate() {
        let mut flow = Flow::new("flow-2", "Ungated");
        flow.graph
            .add_node(Node::new("task", NodeType::Task, "Task"))
            .unwrap();
        request_approval(&mut flow, "task");
        assert!(pending_approvals(&flow).is_empty());
        assert!(can_run(&flow));
    }

    #[test]
    fn test_removed_node_stops_gating() {
        let mut flow = flow_with_gate();
        flow.graph.remove_node("gate");
        flow.graph.remove_node("gate-2");
        assert!(can_run(&flow));
        assert_eq!(flow.intervention_points.len(), 2);
    }

    #[test]
    fn test_request_is_idempotent_and_reopens() {
        let mut flow = flow_with_gate();
        assert!(!request_approval(&mut flow, "gate"));
        assert_eq!(flow.intervention_points.len(), 2);

        flow = approve(flow, "gate", true);
        assert!(request_approval(&mut flow, "gate"));
        assert_eq!(flow.intervention_points.len(), 2);
        assert!(pending_approvals(&flow).contains("gate"));
    }
}
