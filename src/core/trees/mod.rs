pub mod tree_builder;
pub mod tree_layout;
pub mod tree_models;
pub mod tree_renderer;
pub mod tree_service;

pub use tree_layout::LayoutParams;
pub use tree_models::{TreeError, TreeMember, TreeMemberUpdate, TreeNode};
pub use tree_renderer::{ImageSink, InMemoryImage, RenderError, TreeRenderer};
pub use tree_service::{TreeService, TreeStore};
