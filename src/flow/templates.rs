/// Built-in flow templates
///
/// A new flow starts either empty or from one of these. Templates build their
/// graph through the same `connect` path as the editor, then get auto-arranged.

use crate::error::Result;
use crate::flow::approval;
use crate::flow::connection::{HANDLE_APPROVED, HANDLE_FALSE, HANDLE_REJECTED, HANDLE_TRUE};
use crate::flow::layout::organize_layout;
use crate::flow::types::{Flow, Node, NodeData, NodeType};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowTemplate {
    /// No nodes at all
    Blank,
    /// Event -> condition -> success/failure tasks
    ConditionalBranch,
    /// Event -> task -> human approval -> publish or revise
    ApprovalPipeline,
    /// Event -> load -> loop over items -> store
    DataProcessing,
}

impl FlowTemplate {
    pub const ALL: [FlowTemplate; 4] = [
        FlowTemplate::Blank,
        FlowTemplate::ConditionalBranch,
        FlowTemplate::ApprovalPipeline,
        FlowTemplate::DataProcessing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FlowTemplate::Blank => "blank",
            FlowTemplate::ConditionalBranch => "conditional-branch",
            FlowTemplate::ApprovalPipeline => "approval-pipeline",
            FlowTemplate::DataProcessing => "data-processing",
        }
    }

    /// Build a new idle flow from this template
    pub fn instantiate(&self, id: impl Into<String>, name: impl Into<String>) -> Result<Flow> {
        let mut flow = Flow::new(id, name);
        let nodes = self.nodes();
        for node in organize_layout(&nodes) {
            flow.graph.add_node(node)?;
        }

        for (source, target, handle) in self.connections() {
            flow.graph.connect(source, target, handle)?;
        }

        let approval_nodes: Vec<String> = flow
            .graph
            .nodes()
            .filter(|node| node.node_type == NodeType::HumanApproval)
            .map(|node| node.id.clone())
            .collect();
        for node_id in approval_nodes {
            approval::request_approval(&mut flow, &node_id);
        }

        tracing::debug!(
            "Instantiated template '{}' as flow '{}' ({} nodes)",
            self,
            flow.id,
            flow.graph.node_count()
        );
        Ok(flow)
    }

    fn nodes(&self) -> Vec<Node> {
        match self {
            FlowTemplate::Blank => Vec::new(),
            FlowTemplate::ConditionalBranch => vec![
                Node::new("start", NodeType::Event, "Start"),
                Node::new("check", NodeType::Condition, "Check result").with_data(NodeData {
                    condition: Some("score > 0.8".into()),
                    ..Default::default()
                }),
                Node::new("on-success", NodeType::Task, "Handle success"),
                Node::new("on-failure", NodeType::Task, "Handle failure"),
            ],
            FlowTemplate::ApprovalPipeline => vec![
                Node::new("start", NodeType::Event, "Start"),
                Node::new("draft", NodeType::Task, "Draft"),
                Node::new("review", NodeType::HumanApproval, "Review").with_data(NodeData {
                    approval_required: Some(true),
                    ..Default::default()
                }),
                Node::new("publish", NodeType::Task, "Publish"),
                Node::new("revise", NodeType::Task, "Revise"),
            ],
            FlowTemplate::DataProcessing => vec![
                Node::new("start", NodeType::Event, "Start"),
                Node::new("load", NodeType::DataOperation, "Load records"),
                Node::new("each", NodeType::Loop, "For each record").with_data(NodeData {
                    iterations: Some(10),
                    ..Default::default()
                }),
                Node::new("process", NodeType::Task, "Process record"),
                Node::new("store", NodeType::DataOperation, "Store results"),
            ],
        }
    }

    fn connections(&self) -> Vec<(&'static str, &'static str, Option<&'static str>)> {
        match self {
            FlowTemplate::Blank => Vec::new(),
            FlowTemplate::ConditionalBranch => vec![
                ("start", "check", None),
                ("check", "on-success", Some(HANDLE_TRUE)),
                ("check", "on-failure", Some(HANDLE_FALSE)),
            ],
            FlowTemplate::ApprovalPipeline => vec![
                ("start", "draft", None),
                ("draft", "review", None),
                ("review", "publish", Some(HANDLE_APPROVED)),
                ("review", "revise", Some(HANDLE_REJECTED)),
                ("revise", "review", None),
            ],
            FlowTemplate::DataProcessing => vec![
                ("start", "load", None),
                ("load", "each", None),
                ("each", "process", None),
                ("process", "each", None),
                ("each", "store", None),
            ],
        }
    }
}

impl fmt::Display for FlowTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FlowTemplate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FlowTemplate::ALL
            .into_iter()
            .find(|template| template.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = FlowTemplate::ALL.iter().map(|t| t.name()).collect();
                format!("unknown template '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::types::EdgeKind;

    #[test]
    fn test_blank_is_empty() {
        let flow = FlowTemplate::Blank.instantiate("f", "Blank").unwrap();
        assert!(flow.graph.is_empty());
        assert!(flow.intervention_points.is_empty());
    }

    #[test]
    fn test_every_template_builds() {
        for template in FlowTemplate::ALL {
            let flow = template.instantiate("f", template.name()).unwrap();
            for edge in flow.graph.edges() {
                assert!(flow.graph.contains_node(&edge.source));
                assert!(flow.graph.contains_node(&edge.target));
            }
        }
    }

    #[test]
    fn test_conditional_branch_kinds() {
        let flow = FlowTemplate::ConditionalBranch.instantiate("f", "Branch").unwrap();
        let kinds: Vec<_> = flow.graph.outgoing("check").map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EdgeKind::Success, EdgeKind::Failure]);
    }

    #[test]
    fn test_approval_pipeline_is_gated() {
        let flow = FlowTemplate::ApprovalPipeline.instantiate("f", "Pipeline").unwrap();
        assert!(!approval::can_run(&flow));
        assert!(approval::pending_approvals(&flow).contains("review"));
    }

    #[test]
    fn test_templates_are_laid_out() {
        let flow = FlowTemplate::DataProcessing.instantiate("f", "Data").unwrap();
        let nodes: Vec<_> = flow.graph.nodes().cloned().collect();
        assert_eq!(organize_layout(&nodes), nodes);
    }

    #[test]
    fn test_parse_names() {
        for template in FlowTemplate::ALL {
            assert_eq!(template.name().parse::<FlowTemplate>(), Ok(template));
        }
        assert!("nope".parse::<FlowTemplate>().is_err());
    }
}
