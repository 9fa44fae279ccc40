// Turns the flat `parent -> children` mapping into a tree, and the tree back
// into depth-ordered rows for layout.

use super::tree_models::{Member, TreeError, TreeNode};
use std::collections::{HashMap, HashSet};

/// Build the tree rooted at `root_name`.
///
/// A name missing from `children_by_parent` is a leaf. Sibling order follows
/// the order of each child list. The builder assumes the caller already
/// rejected multiple roots and dangling parents; it only guards against
/// cycles, which would otherwise recurse forever.
pub fn build_tree(
    children_by_parent: &HashMap<String, Vec<String>>,
    root_name: &str,
) -> Result<TreeNode, TreeError> {
    let mut ancestors = HashSet::new();
    build_subtree(children_by_parent, root_name, &mut ancestors)
}

fn build_subtree<'a>(
    children_by_parent: &'a HashMap<String, Vec<String>>,
    name: &'a str,
    ancestors: &mut HashSet<&'a str>,
) -> Result<TreeNode, TreeError> {
    let Some(child_names) = children_by_parent.get(name) else {
        return Ok(TreeNode::leaf(name));
    };

    if !ancestors.insert(name) {
        return Err(TreeError::Cycle {
            name: name.to_string(),
        });
    }

    let mut children = Vec::with_capacity(child_names.len());
    for child_name in child_names {
        children.push(build_subtree(children_by_parent, child_name, ancestors)?);
    }

    ancestors.remove(name);

    Ok(TreeNode {
        name: name.to_string(),
        children,
    })
}

/// Flatten the tree into rows by depth.
///
/// The root itself is not part of any row: its children are row 0. Rows are
/// filled by a pre-order walk, so within a row nodes appear grouped under
/// their parents in the parents' own left-to-right order.
pub fn extract_rows(root: &TreeNode) -> Vec<Vec<Member>> {
    let mut rows = Vec::new();
    for child in &root.children {
        collect_rows(child, &root.name, 0, &mut rows);
    }
    rows
}

fn collect_rows(node: &TreeNode, parent_name: &str, depth: usize, rows: &mut Vec<Vec<Member>>) {
    if rows.len() <= depth {
        rows.push(Vec::new());
    }

    rows[depth].push(Member {
        name: node.name.clone(),
        parent_name: parent_name.to_string(),
    });

    for child in &node.children {
        collect_rows(child, &node.name, depth + 1, rows);
    }
}
