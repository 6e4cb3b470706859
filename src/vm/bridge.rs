//! VM桥接层：分发循环与用户命令处理
//!
//! 每个命令先基于当前状态算出 Action（文件 IO、解析、提示都在这一步完成），
//! 再经 `dispatch` 走 reduce -> realize -> 提交新状态。命令失败时不分发，状态保持不变。

use std::path::{Path as FsPath, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::model::document::{compact, get, is_container, kind_of, parse_json_text, pretty, PathError};
use crate::model::edit_ops::{
    commit_text, delete_item, duplicate, insert_after, move_item, rename_key, Direction, EditError,
    STATUS_UNCOMMITTED_EDITS,
};
use crate::model::error::EditorError;
use crate::model::find::{advance_find, start_find};
use crate::model::path::Path;
use crate::model::reducer::reduce;
use crate::model::shadow_tree::ShadowTree;
use crate::model::state::{Action, EditorState, SelectionKind};
use crate::utils::clipboard::{Clipboard, ClipboardError};
use crate::utils::fs::{read_json_file, write_json_file};
use crate::vm::prompt::Prompter;
use crate::vm::sync::{View, ViewSynchronizer};

// === 状态与提示文字 ===
pub const STATUS_COPIED: &str = "copied";
pub const STATUS_COPIED_NODE: &str = "copied node";
pub const STATUS_FIND_STALE: &str = "Find: document changed, search cleared";
pub const ERROR_NO_PREVIOUS_FILE: &str = "No file loaded previously.";
pub const ERROR_ROOT_MUST_BE_CONTAINER: &str = "Root must be an object {} or array [].";

const TITLE_OPEN: &str = "Open";
const TITLE_RELOAD: &str = "Reload";
const TITLE_SAVE: &str = "Save";
const TITLE_CLIPBOARD: &str = "Clipboard";
const TITLE_NEW_KEY: &str = "New JSON Key";
const TITLE_RENAME: &str = "Rename Key";
const TITLE_DELETE: &str = "Delete Item";

/// 复制到剪贴板的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyFormat {
    /// 2 空格缩进
    Pretty,
    /// 无空白
    Compact,
}

/// 编辑器：持有唯一的 `EditorState`，串联 reducer、视图同步器与外部协作者
pub struct Editor<V: View, P: Prompter, C: Clipboard> {
    state: EditorState,
    sync: ViewSynchronizer,
    view: V,
    prompter: P,
    clipboard: C,
}

fn ensure_container(doc: &Value) -> Result<(), EditorError> {
    if is_container(doc) {
        Ok(())
    } else {
        Err(EditorError::Validation(ERROR_ROOT_MUST_BE_CONTAINER.to_string()))
    }
}

impl<V: View, P: Prompter, C: Clipboard> Editor<V, P, C> {
    /// 以初始状态创建并渲染一次视图
    pub fn new(view: V, prompter: P, clipboard: C) -> Self {
        let mut editor = Self {
            state: EditorState::default(),
            sync: ViewSynchronizer::new(),
            view,
            prompter,
            clipboard,
        };
        editor.sync.initialize(&editor.state, &mut editor.view);
        editor
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn tree(&self) -> &ShadowTree {
        self.sync.tree()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn prompter_mut(&mut self) -> &mut P {
        &mut self.prompter
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.clipboard
    }

    /// 分发一个 Action：reduce -> realize -> 提交
    ///
    /// 同步执行，realize 期间不会再次分发。
    pub fn dispatch(&mut self, action: Action) {
        let new_state = reduce(&self.state, &action);
        self.sync.realize(&self.state, &new_state, &action, &mut self.view);
        self.state = new_state;
    }

    /// 统一的失败出口：静默类只记 debug，其余记 error 并提示用户
    fn finish(&mut self, title: &str, result: Result<(), EditorError>) -> Result<(), EditorError> {
        if let Err(e) = &result {
            if e.is_silent() {
                debug!("{}: 未执行 ({})", title, e);
            } else {
                error!("{}失败: {}", title, e);
                self.prompter.show_error(title, &e.to_string());
            }
        }
        result
    }

    // === 文件 ===

    /// 打开文件；与当前来源相同时按重新加载处理
    pub fn open_file(&mut self, path: &FsPath) -> Result<(), EditorError> {
        let result = self.load_from_path(path);
        self.finish(TITLE_OPEN, result)
    }

    pub fn reload(&mut self) -> Result<(), EditorError> {
        let result = match self.state.source.clone() {
            Some(source) => self.load_from_path(&source),
            None => Err(EditorError::Validation(ERROR_NO_PREVIOUS_FILE.to_string())),
        };
        self.finish(TITLE_RELOAD, result)
    }

    fn load_from_path(&mut self, path: &FsPath) -> Result<(), EditorError> {
        let doc = read_json_file(path)?;
        ensure_container(&doc)?;

        let doc = Rc::new(doc);
        let source = path.to_path_buf();
        let action = if self.state.source.as_deref() == Some(path) {
            info!("重新加载文件: {}", path.display());
            Action::ReloadDocument { doc, source }
        } else {
            info!("文件加载成功: {}", path.display());
            Action::LoadDocument { doc, source }
        };
        self.dispatch(action);
        Ok(())
    }

    /// 保存到来源文件；没有来源时询问保存位置
    pub fn save(&mut self) -> Result<(), EditorError> {
        let result = self.save_document();
        self.finish(TITLE_SAVE, result)
    }

    fn save_document(&mut self) -> Result<(), EditorError> {
        let Some(doc) = self.state.document.clone() else {
            return Ok(());
        };
        let path: PathBuf = match self.state.source.clone() {
            Some(p) => p,
            None => self.prompter.ask_save_path().ok_or(EditError::Cancelled)?,
        };
        write_json_file(&path, &doc)?;
        info!("文件保存成功: {}", path.display());
        self.dispatch(Action::SaveCompleted { source: path });
        Ok(())
    }

    // === 剪贴板 ===

    pub fn create_from_clipboard(&mut self) -> Result<(), EditorError> {
        let result = self.load_from_clipboard();
        self.finish(TITLE_CLIPBOARD, result)
    }

    fn load_from_clipboard(&mut self) -> Result<(), EditorError> {
        let text = self.clipboard.get_text().map_err(|e| {
            warn!("读取剪贴板失败: {}", e);
            ClipboardError::Empty
        })?;
        let doc = parse_json_text(&text)?;
        ensure_container(&doc)?;
        info!("从剪贴板创建文档，长度: {} 字符", text.len());
        self.dispatch(Action::LoadFromClipboard { doc: Rc::new(doc) });
        Ok(())
    }

    pub fn copy_document(&mut self, format: CopyFormat) -> Result<(), EditorError> {
        let result = self.copy_value(true, format);
        self.finish(TITLE_CLIPBOARD, result)
    }

    pub fn copy_node(&mut self, format: CopyFormat) -> Result<(), EditorError> {
        let result = self.copy_value(false, format);
        self.finish(TITLE_CLIPBOARD, result)
    }

    fn copy_value(&mut self, whole: bool, format: CopyFormat) -> Result<(), EditorError> {
        let doc = self.state.doc().ok_or(EditError::NoDocument)?;
        let value = match (whole, self.state.selected_path.as_ref()) {
            (false, Some(path)) => get(doc, path)?,
            _ => doc,
        };
        let text = match format {
            CopyFormat::Pretty => pretty(value),
            CopyFormat::Compact => compact(value),
        };
        self.clipboard.set_text(&text)?;
        info!("内容已复制到剪贴板，长度: {} 字符", text.len());

        let validity = if whole { STATUS_COPIED } else { STATUS_COPIED_NODE };
        self.dispatch(Action::SetStatus {
            validity: Some(validity.to_string()),
            error: Some(String::new()),
        });
        Ok(())
    }

    // === 文本面板 ===

    /// 将文本面板内容提交到选中位置
    pub fn apply_text(&mut self) -> Result<(), EditorError> {
        let text = self.view.text();
        let result = commit_text(&self.state, &text)
            .map(|action| {
                if let Action::CommitFailed { message } = &action {
                    warn!("提交失败: {}", message);
                }
                self.dispatch(action);
            })
            .map_err(EditorError::from);
        self.finish("Update Tree", result)
    }

    /// 文本面板被修改后调用，在状态栏提示有未提交的编辑
    pub fn note_text_modified(&mut self) {
        if self.state.document.is_some() && self.view.text_modified() {
            self.dispatch(Action::SetStatus {
                validity: Some(STATUS_UNCOMMITTED_EDITS.to_string()),
                error: None,
            });
        }
    }

    // === 树 ===

    pub fn select_path(&mut self, path: Path) -> Result<(), EditorError> {
        let result = self.select(path);
        self.finish("Select", result)
    }

    fn select(&mut self, path: Path) -> Result<(), EditorError> {
        let doc = self.state.doc().ok_or(EditError::NoDocument)?;
        get(doc, &path)?;
        let kind = kind_of(doc, &path)?;
        debug!("选中节点: {}", path);
        self.dispatch(Action::SelectPath { path, kind });
        Ok(())
    }

    /// 视图内的展开 / 折叠，不经过 reducer
    pub fn toggle_expanded(&mut self, path: &Path) -> Result<(), EditorError> {
        if self.sync.toggle_expanded(path) {
            Ok(())
        } else {
            Err(EditorError::State(format!("节点不存在: {}", path)))
        }
    }

    // === 结构编辑 ===

    pub fn raise(&mut self) -> Result<(), EditorError> {
        let result = self.move_selected(Direction::Raise);
        self.finish("Raise", result)
    }

    pub fn lower(&mut self) -> Result<(), EditorError> {
        let result = self.move_selected(Direction::Lower);
        self.finish("Lower", result)
    }

    fn move_selected(&mut self, direction: Direction) -> Result<(), EditorError> {
        let action = move_item(&self.state, direction)?;
        info!("移动节点: {:?}", direction);
        self.dispatch(action);
        Ok(())
    }

    pub fn insert_after(&mut self) -> Result<(), EditorError> {
        let result = self.insert_sibling(false);
        self.finish(TITLE_NEW_KEY, result)
    }

    pub fn duplicate(&mut self) -> Result<(), EditorError> {
        let result = self.insert_sibling(true);
        self.finish(TITLE_NEW_KEY, result)
    }

    fn insert_sibling(&mut self, copy: bool) -> Result<(), EditorError> {
        if !self.state.can_edit_structure() {
            return Err(EditError::NotEditable.into());
        }
        let key = if self.state.selected_kind == Some(SelectionKind::ObjectKey) {
            let message = if copy {
                "Enter a name for the duplicated key:"
            } else {
                "Enter a name for the new key:"
            };
            Some(self.prompt_key(TITLE_NEW_KEY, message)?)
        } else {
            None
        };
        let action = if copy {
            duplicate(&self.state, key)?
        } else {
            insert_after(&self.state, key)?
        };
        info!("{}节点", if copy { "复制" } else { "插入" });
        self.dispatch(action);
        Ok(())
    }

    pub fn rename(&mut self) -> Result<(), EditorError> {
        let result = self.rename_selected();
        self.finish(TITLE_RENAME, result)
    }

    fn rename_selected(&mut self) -> Result<(), EditorError> {
        if !self.state.can_rename() {
            return Err(EditError::NotEditable.into());
        }
        let key = self.prompt_key(TITLE_RENAME, "Enter the new key name:")?;
        let action = rename_key(&self.state, &key)?;
        info!("重命名键为: {}", key);
        self.dispatch(action);
        Ok(())
    }

    /// 确认后删除选中项
    pub fn delete(&mut self) -> Result<(), EditorError> {
        let result = self.delete_selected();
        self.finish(TITLE_DELETE, result)
    }

    fn delete_selected(&mut self) -> Result<(), EditorError> {
        if !self.state.can_edit_structure() {
            return Err(EditError::NotEditable.into());
        }
        if !self.prompter.ask_yes_no(TITLE_DELETE, "Delete the selected item?") {
            return Err(EditError::Cancelled.into());
        }
        // 必须在构造 Action 之前读取文本面板的修改标记
        let had_uncommitted = self.view.text_modified();
        let action = delete_item(&self.state, had_uncommitted)?;
        info!("删除节点，未提交编辑: {}", had_uncommitted);
        self.dispatch(action);
        Ok(())
    }

    fn prompt_key(&mut self, title: &str, message: &str) -> Result<String, EditorError> {
        self.prompter
            .ask_non_empty_string(title, message)
            .ok_or_else(|| EditError::Cancelled.into())
    }

    // === 查找 ===

    /// 询问查找词；默认值为当前会话的查找词
    pub fn find(&mut self) -> Result<(), EditorError> {
        let previous = self.state.find.as_ref().map(|f| f.term.clone()).unwrap_or_default();
        let result = match self.prompter.ask_search_term(&previous) {
            Some(term) => {
                let action = start_find(&self.state, &term);
                self.dispatch_find(action);
                Ok(())
            }
            None => Err(EditError::Cancelled.into()),
        };
        self.finish("Find", result)
    }

    pub fn repeat_find(&mut self) {
        let action = advance_find(&self.state);
        self.dispatch_find(action);
    }

    /// 匹配路径在编辑后可能失效，此时结束查找会话
    fn dispatch_find(&mut self, action: Result<Action, PathError>) {
        let action = action.unwrap_or_else(|e| {
            warn!("查找结果已失效: {}", e);
            Action::FindCleared {
                status_error: STATUS_FIND_STALE.to_string(),
            }
        });
        if let Action::FindStarted { matches, .. } = &action {
            info!("查找到 {} 个匹配", matches.len());
        }
        self.dispatch(action);
    }
}
