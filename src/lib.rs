//! JSON 树编辑器库
//!
//! 提供文档模型、查找、结构编辑、reducer 与视图同步，
//! 遵循 MVVM 架构：model 为纯数据与纯函数，vm 负责分发循环与视图命令，utils 封装文件与剪贴板。

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::error::EditorError;
pub use model::path::{Path, Seg};
pub use model::shadow_tree::{build_shadow_tree, JsonTreeNode, NodeKind};
pub use model::state::{Action, EditorState, SelectionKind, TextMode};
pub use vm::bridge::{CopyFormat, Editor};
pub use vm::prompt::Prompter;
pub use vm::sync::{View, ViewCommand};
