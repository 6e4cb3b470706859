//! 视图同步：比较新旧状态，只下发必要的视图更新命令
//!
//! 文档引用变化 => 重建树；否则只移动选中。树视图的节点 arena（`ShadowTree`）
//! 由同步器持有，重建时按路径保留展开状态。

use std::collections::BTreeSet;

use crate::model::document::{extract_embedded_config, first_bifurcation, get, render_for_text};
use crate::model::path::Path;
use crate::model::shadow_tree::{JsonTreeNode, NodeId, ShadowTree};
use crate::model::state::{Action, EditKind, EditorState};

pub const TITLE_BASE: &str = "JSON Tree Editor";

/// 文本面板刷新后的光标位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPolicy {
    /// 光标置于开头，不选中
    Start,
    /// 选中全部文本，便于直接输入替换
    SelectAll,
}

/// 编辑菜单项
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MenuItem {
    Search,
    RepeatSearch,
    Raise,
    Rename,
    Delete,
    Duplicate,
    Insert,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// 整树重建，节点先序排列，`expanded` 已按保留策略设置
    RebuildTree { nodes: Vec<JsonTreeNode> },
    /// 选中并滚动到节点；`revealed` 为此次为使其可见而展开的祖先
    SyncSelection {
        path: Option<Path>,
        node: Option<NodeId>,
        revealed: Vec<NodeId>,
    },
    RefreshTextPane { text: String, cursor: CursorPolicy },
    RefreshMenuEnablement { enabled: BTreeSet<MenuItem> },
    UpdateTitle(String),
    UpdateStatusPath(String),
    UpdateDirtyIndicator(bool),
    UpdateStatusLabels { validity: String, error: String },
}

/// 外部视图协作者
pub trait View {
    fn apply(&mut self, command: ViewCommand);

    /// 文本面板当前内容
    fn text(&self) -> String;

    /// 文本面板自上次 `RefreshTextPane` 以来是否被用户修改
    fn text_modified(&self) -> bool;
}

/// 编辑菜单的可用集合
pub fn enabled_menu_items(state: &EditorState) -> BTreeSet<MenuItem> {
    let mut enabled = BTreeSet::new();
    if state.can_edit_structure() {
        enabled.extend([
            MenuItem::Search,
            MenuItem::RepeatSearch,
            MenuItem::Raise,
            MenuItem::Delete,
            MenuItem::Duplicate,
            MenuItem::Insert,
            MenuItem::Lower,
        ]);
    }
    if state.can_rename() {
        enabled.insert(MenuItem::Rename);
    }
    enabled
}

/// 窗口标题：嵌入式配置优先，其次文件名
pub fn window_title(state: &EditorState) -> String {
    let suffix = state
        .doc()
        .and_then(extract_embedded_config)
        .and_then(|cfg| cfg.window_title)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(suffix) = suffix {
        return format!("{}: {}", TITLE_BASE, suffix);
    }
    match state.source.as_ref().and_then(|p| p.file_name()) {
        Some(name) => format!("{} - {}", TITLE_BASE, name.to_string_lossy()),
        None => TITLE_BASE.to_string(),
    }
}

/// 状态栏路径文字
pub fn status_path_text(path: Option<&Path>) -> String {
    path.map(|p| p.to_string()).unwrap_or_default()
}

/// 插入 / 复制后选中全部文本，其余情况光标置于开头
pub fn cursor_policy_for(action: Option<&Action>) -> CursorPolicy {
    match action.and_then(Action::edit_kind) {
        Some(EditKind::InsertAfter) | Some(EditKind::Duplicate) => CursorPolicy::SelectAll,
        _ => CursorPolicy::Start,
    }
}

/// 文本面板内容：字符串取原文，其余格式化输出
pub fn text_pane_contents(state: &EditorState) -> String {
    let Some(doc) = state.doc() else {
        return String::new();
    };
    let value = match state.selected_path.as_ref() {
        Some(path) => match get(doc, path) {
            Ok(v) => v,
            Err(_) => return String::new(),
        },
        None => doc,
    };
    render_for_text(value)
}

#[derive(Debug, Default)]
pub struct ViewSynchronizer {
    tree: ShadowTree,
}

impl ViewSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &ShadowTree {
        &self.tree
    }

    /// 用户在视图中展开 / 折叠节点；返回是否找到该节点
    pub fn toggle_expanded(&mut self, path: &Path) -> bool {
        self.tree.toggle_expanded(path)
    }

    /// 启动时按初始状态渲染一次
    pub fn initialize<V: View + ?Sized>(&mut self, state: &EditorState, view: &mut V) {
        view.apply(ViewCommand::UpdateStatusLabels {
            validity: state.status_validity.clone(),
            error: state.status_error.clone(),
        });
        view.apply(ViewCommand::UpdateStatusPath(status_path_text(state.selected_path.as_ref())));
        view.apply(ViewCommand::UpdateDirtyIndicator(state.dirty));
        view.apply(ViewCommand::RefreshMenuEnablement {
            enabled: enabled_menu_items(state),
        });
        view.apply(ViewCommand::UpdateTitle(window_title(state)));
    }

    fn sync_selection<V: View + ?Sized>(&mut self, state: &EditorState, view: &mut V) {
        let path = state.selected_path.clone();
        let mut revealed = Vec::new();
        if let Some(p) = path.as_ref() {
            let before = self.tree.expanded_paths();
            self.tree.reveal(p);
            if let Some(parent) = p.parent() {
                revealed = parent
                    .ancestors_inclusive()
                    .iter()
                    .filter(|a| !before.contains(*a))
                    .filter_map(|a| self.tree.id_of(a))
                    .collect();
            }
        }
        let node = path.as_ref().and_then(|p| self.tree.id_of(p));
        view.apply(ViewCommand::SyncSelection { path, node, revealed });
    }

    fn refresh_text_pane<V: View + ?Sized>(&self, state: &EditorState, action: &Action, view: &mut V) {
        let cursor = if state.document.is_some() {
            cursor_policy_for(Some(action))
        } else {
            CursorPolicy::Start
        };
        view.apply(ViewCommand::RefreshTextPane {
            text: text_pane_contents(state),
            cursor,
        });
    }

    /// 比较 (old, new, action)，下发视图更新命令
    pub fn realize<V: View + ?Sized>(&mut self, old: &EditorState, new: &EditorState, action: &Action, view: &mut V) {
        let doc_changed = !new.same_document(old);
        let refresh_text = !action.suppresses_text_refresh();

        if doc_changed {
            self.tree.rebuild(new.doc());
            if action.is_load() {
                if let Some(doc) = new.doc() {
                    self.tree.expand_to(&first_bifurcation(doc));
                }
            }
            view.apply(ViewCommand::RebuildTree {
                nodes: self.tree.nodes().to_vec(),
            });
            self.sync_selection(new, view);
            if refresh_text {
                self.refresh_text_pane(new, action, view);
            }
            view.apply(ViewCommand::RefreshMenuEnablement {
                enabled: enabled_menu_items(new),
            });
            view.apply(ViewCommand::UpdateTitle(window_title(new)));
            view.apply(ViewCommand::UpdateStatusPath(status_path_text(new.selected_path.as_ref())));
        } else {
            if new.selected_path != old.selected_path {
                self.sync_selection(new, view);
                if refresh_text {
                    self.refresh_text_pane(new, action, view);
                }
                view.apply(ViewCommand::UpdateStatusPath(status_path_text(new.selected_path.as_ref())));
            }
            if new.selected_kind != old.selected_kind {
                view.apply(ViewCommand::RefreshMenuEnablement {
                    enabled: enabled_menu_items(new),
                });
            }
        }

        if new.dirty != old.dirty {
            view.apply(ViewCommand::UpdateDirtyIndicator(new.dirty));
        }
        if new.status_validity != old.status_validity || new.status_error != old.status_error {
            view.apply(ViewCommand::UpdateStatusLabels {
                validity: new.status_validity.clone(),
                error: new.status_error.clone(),
            });
        }
        if new.source != old.source && !doc_changed {
            view.apply(ViewCommand::UpdateTitle(window_title(new)));
        }
    }
}
