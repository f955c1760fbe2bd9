/// Deterministic grid auto-layout
///
/// Nodes are grouped by type in first-seen order. Each group fills a three-column
/// grid band; bands stack vertically with a gap between them.

use crate::flow::types::{Node, NodeType, Position};

pub const COLUMNS: usize = 3;
pub const ORIGIN_X: f64 = 100.0;
pub const ORIGIN_Y: f64 = 100.0;
pub const COLUMN_SPACING: f64 = 250.0;
pub const ROW_SPACING: f64 = 150.0;
pub const GROUP_GAP: f64 = 100.0;

/// Compute grid positions for `nodes`
///
/// Returns the nodes in their input order with only `position` changed. Calling
/// it again on its own output yields the same positions.
pub fn organize_layout(nodes: &[Node]) -> Vec<Node> {
    let mut groups: Vec<(NodeType, Vec<usize>)> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        match groups.iter_mut().find(|(t, _)| *t == node.node_type) {
            Some((_, members)) => members.push(i),
            None => groups.push((node.node_type, vec![i])),
        }
    }

    let mut arranged = nodes.to_vec();
    let mut current_y = ORIGIN_Y;

    for (node_type, members) in &groups {
        for (index, &i) in members.iter().enumerate() {
            arranged[i].position = Position {
                x: ORIGIN_X + (index % COLUMNS) as f64 * COLUMN_SPACING,
                y: current_y + (index / COLUMNS) as f64 * ROW_SPACING,
            };
        }

        let rows = members.len().div_ceil(COLUMNS);
        tracing::debug!(
            "Laid out {} '{}' node(s) in {} row(s) at y={}",
            members.len(),
            node_type,
            rows,
            current_y
        );
        current_y += rows as f64 * ROW_SPACING + GROUP_GAP;
    }

    arranged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType) -> Node {
        Node::new(id, node_type, id).at(-5.0, 999.0)
    }

    fn positions(nodes: &[Node]) -> Vec<(f64, f64)> {
        nodes.iter().map(|n| (n.position.x, n.position.y)).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(organize_layout(&[]).is_empty());
    }

    #[test]
    fn test_single_group_wraps_every_three() {
        let nodes: Vec<_> = (0..5).map(|i| node(&format!("t{i}"), NodeType::Task)).collect();
        let laid = organize_layout(&nodes);
        assert_eq!(
            positions(&laid),
            vec![
                (100.0, 100.0),
                (350.0, 100.0),
                (600.0, 100.0),
                (100.0, 250.0),
                (350.0, 250.0),
            ]
        );
    }

    #[test]
    fn test_groups_stack_in_first_seen_order() {
        let nodes = vec![
            node("t1", NodeType::Task),
            node("e1", NodeType::Event),
            node("t2", NodeType::Task),
            node("t3", NodeType::Task),
            node("t4", NodeType::Task),
            node("c1", NodeType::Condition),
        ];
        let laid = organize_layout(&nodes);

        // tasks: 4 nodes -> 2 rows, next band at 100 + 300 + 100
        // events: 1 node -> 1 row, next band at 500 + 150 + 100
        assert_eq!(
            positions(&laid),
            vec![
                (100.0, 100.0),
                (100.0, 500.0),
                (350.0, 100.0),
                (600.0, 100.0),
                (100.0, 250.0),
                (100.0, 750.0),
            ]
        );
        let ids: Vec<_> = laid.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "e1", "t2", "t3", "t4", "c1"]);
    }

    #[test]
    fn test_only_positions_change() {
        let nodes = vec![node("a", NodeType::Loop).with_parent("group")];
        let laid = organize_layout(&nodes);
        assert_eq!(laid[0].id, "a");
        assert_eq!(laid[0].parent_id.as_deref(), Some("group"));
        assert_eq!(laid[0].label, nodes[0].label);
    }

    #[test]
    fn test_idempotent() {
        let nodes: Vec<_> = NodeType::ALL
            .iter()
            .cycle()
            .take(20)
            .enumerate()
            .map(|(i, t)| node(&format!("n{i}"), *t))
            .collect();
        let once = organize_layout(&nodes);
        let twice = organize_layout(&once);
        assert_eq!(once, twice);
    }
}
