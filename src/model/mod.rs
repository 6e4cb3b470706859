pub mod document;
pub mod edit_ops;
pub mod error;
pub mod find;
pub mod path;
pub mod reducer;
pub mod shadow_tree;
pub mod state;
