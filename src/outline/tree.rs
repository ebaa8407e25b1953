use super::OutlineItem;

/// A bookmark together with the bookmarks nested under it. Parent and sibling relations are
/// implied by the shape of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub id: String,
    pub title: String,
    pub page_index: usize,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(id: impl Into<String>, title: impl Into<String>, page_index: usize) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            page_index,
            children: vec![],
        }
    }

    fn from_item(item: &OutlineItem) -> Self {
        Self::leaf(item.id.clone(), item.title.clone(), item.page_index)
    }

    /// Number of nodes below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        node_count(&self.children)
    }
}

// Deep chains would otherwise be dropped one stack frame per level.
impl Drop for OutlineNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Total number of nodes in a forest, at any depth.
pub fn node_count(forest: &[OutlineNode]) -> usize {
    let mut count = 0;
    let mut pending: Vec<&OutlineNode> = forest.iter().collect();
    while let Some(node) = pending.pop() {
        count += 1;
        pending.extend(&node.children);
    }
    count
}

/// Nests a flat outline purely from the `level` numbers.
///
/// Every item becomes the last child of the closest preceding item with a strictly smaller
/// level, or a root when there is none. For lists without level skips this is the inverse of
/// [`flatten`]. An item more than one level deeper than its predecessor is attached to that
/// nearest shallower ancestor, so its depth in the tree is smaller than its level.
pub fn build_tree(items: &[OutlineItem]) -> Vec<OutlineNode> {
    let mut roots = Vec::new();
    // Open nodes along the current path together with the level they were declared at. The
    // empty stack plays the part of the document root at level -1.
    let mut stack: Vec<(OutlineNode, usize)> = Vec::new();

    for item in items {
        while stack.last().is_some_and(|(_, level)| *level >= item.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push((OutlineNode::from_item(item), item.level));
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<(OutlineNode, usize)>, roots: &mut Vec<OutlineNode>) {
    if let Some((node, _)) = stack.pop() {
        match stack.last_mut() {
            Some((parent, _)) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Lists a forest in preorder, each node at `level` equal to its depth.
pub fn flatten(forest: &[OutlineNode]) -> Vec<OutlineItem> {
    let mut out = Vec::with_capacity(node_count(forest));
    // Reversed so that popping yields nodes in document order.
    let mut pending: Vec<(&OutlineNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, level)) = pending.pop() {
        out.push(OutlineItem {
            id: node.id.clone(),
            title: node.title.clone(),
            page_index: node.page_index,
            level,
        });
        pending.extend(node.children.iter().rev().map(|child| (child, level + 1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::outline::validate;

    fn item(id: &str, page_index: usize, level: usize) -> OutlineItem {
        OutlineItem {
            id: id.to_string(),
            title: format!("Title {id}"),
            page_index,
            level,
        }
    }

    #[test]
    fn empty_list_builds_empty_forest() {
        assert!(build_tree(&[]).is_empty());
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn nests_children_under_preceding_item() {
        let items = vec![
            item("cover", 0, 0),
            item("intro", 2, 0),
            item("goals", 3, 1),
            item("appendix", 10, 0),
        ];
        let forest = build_tree(&items);
        assert_eq!(forest.len(), 3);
        assert_eq!(forest[1].id, "intro");
        assert_eq!(forest[1].children.len(), 1);
        assert_eq!(forest[1].children[0].id, "goals");
        assert!(forest[2].children.is_empty());
    }

    #[test]
    fn returning_to_shallower_level_closes_subtrees() {
        let items = vec![
            item("a", 0, 0),
            item("b", 0, 1),
            item("c", 0, 2),
            item("d", 0, 1),
            item("e", 0, 0),
        ];
        let forest = build_tree(&items);
        assert_eq!(forest.len(), 2);
        let a = &forest[0];
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].children[0].id, "c");
        assert_eq!(a.children[1].id, "d");
        assert_eq!(a.descendant_count(), 3);
        assert_eq!(node_count(&forest), 5);
    }

    #[test]
    fn level_skip_attaches_to_nearest_shallower_item() {
        let items = vec![item("a", 0, 0), item("deep", 0, 3), item("b", 0, 1)];
        let forest = build_tree(&items);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children.len(), 2);
        let flat = flatten(&forest);
        assert_eq!(flat[1].level, 1);
    }

    #[test]
    fn leading_nested_item_becomes_root() {
        let forest = build_tree(&[item("a", 0, 2), item("b", 0, 0)]);
        assert_eq!(forest.len(), 2);
        assert_eq!(flatten(&forest)[0].level, 0);
    }

    #[test]
    fn flatten_restores_levels_and_order() {
        let items = vec![
            item("a", 1, 0),
            item("b", 2, 1),
            item("c", 3, 1),
            item("d", 4, 2),
            item("e", 5, 0),
        ];
        assert_eq!(flatten(&build_tree(&items)), items);
    }

    #[test]
    fn deep_chain_is_handled_without_recursion() {
        let depth = 50_000;
        let items: Vec<OutlineItem> = (0..depth).map(|i| item(&format!("n{i}"), 0, i)).collect();
        let forest = build_tree(&items);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].descendant_count(), depth - 1);
        let flat = flatten(&forest);
        assert_eq!(flat.len(), depth);
        assert_eq!(flat[depth - 1].level, depth - 1);
    }

    fn valid_outline() -> impl Strategy<Value = Vec<OutlineItem>> {
        // Each step either descends by one or climbs back up an arbitrary amount.
        prop::collection::vec((0usize..4, any::<bool>(), 0usize..50), 0..40).prop_map(|steps| {
            let mut level = 0usize;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (climb, descend, page_index))| {
                    if i > 0 {
                        level = if descend { level + 1 } else { level.saturating_sub(climb) };
                    }
                    OutlineItem {
                        id: format!("id-{i}"),
                        title: format!("Entry {i}"),
                        page_index,
                        level,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn flatten_inverts_build_tree(items in valid_outline()) {
            prop_assert!(validate(&items).is_empty());
            prop_assert_eq!(flatten(&build_tree(&items)), items);
        }

        #[test]
        fn node_count_matches_item_count(items in valid_outline()) {
            prop_assert_eq!(node_count(&build_tree(&items)), items.len());
        }
    }
}
