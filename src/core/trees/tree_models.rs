// Data types for the guild tree chart.
//
// Stored members reference their parent by user ID. At layout time the chart
// works purely with display names, so names double as node keys and must be
// unique within one chart.

use thiserror::Error;

/// One stored membership record for a guild's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMember {
    pub guild_id: u64,
    pub user_id: u64,
    pub name: String,
    /// `None` marks the root of the tree.
    pub parent_id: Option<u64>,
}

/// Partial update for a stored member. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TreeMemberUpdate {
    pub name: Option<String>,
    pub parent_id: Option<u64>,
}

/// A node's edge to its parent, by name. An empty `parent_name` points at the root origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub parent_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("There are no users added to the tree.")]
    Empty,

    #[error("Names must not be empty.")]
    EmptyName,

    #[error("More than one member is called {0}, names in the tree must be unique.")]
    DuplicateName(String),

    #[error("A member cannot be their own parent.")]
    SelfParent,

    #[error(
        "There is a member whose parent is not in the tree.\n\n Member: {name} (<@{user_id}>), Parent: <@{parent_id}>"
    )]
    DanglingParent {
        name: String,
        user_id: u64,
        parent_id: u64,
    },

    #[error(
        "There are multiple origins (users with no parents), which is not supported.\n\nList of members: {}",
        .0.join(", ")
    )]
    MultipleRoots(Vec<String>),

    #[error("Every member has a parent, so the tree has no origin.")]
    NoRoot,

    #[error("The tree loops back on itself at {name}.")]
    Cycle { name: String },

    #[error("You've already added this user to the tree.")]
    AlreadyExists,

    #[error("User is not added to the tree.")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}
