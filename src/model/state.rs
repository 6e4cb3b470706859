//! EditorState：编辑器的唯一状态值，以及驱动其变迁的 Action

use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;

use crate::model::path::Path;

/// 初始状态栏文字
pub const STATUS_NO_DOCUMENT: &str = "(no document)";

/// 选中节点的种类，只由路径和父容器推导，不单独存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    Root,
    ObjectKey,
    ArrayElement,
}

impl SelectionKind {
    /// 根节点永远不能做结构编辑
    pub fn is_structural(self) -> bool {
        matches!(self, SelectionKind::ObjectKey | SelectionKind::ArrayElement)
    }
}

/// 文本面板的编辑模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextMode {
    /// 面板内容按 JSON 解析
    #[default]
    Json,
    /// 选中值是字符串，面板内容即原文
    RawString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindSession {
    pub term: String,
    pub matches: Vec<Path>,
    pub current_index: usize,
}

/// 结构编辑的类别，决定视图同步时的光标策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Raise,
    Lower,
    InsertAfter,
    Duplicate,
    Rename,
    Delete,
}

/// 状态栏字段的可选覆盖
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOverrides {
    pub validity: Option<String>,
    pub error: Option<String>,
}

/// 所有状态变迁的输入；I/O 与解析都在构造 Action 之前完成
#[derive(Debug, Clone)]
pub enum Action {
    LoadDocument { doc: Rc<Value>, source: PathBuf },
    ReloadDocument { doc: Rc<Value>, source: PathBuf },
    LoadFromClipboard { doc: Rc<Value> },
    SaveCompleted { source: PathBuf },
    SelectPath { path: Path, kind: SelectionKind },
    CommitText { doc: Rc<Value> },
    CommitFailed { message: String },
    StructuralChange {
        edit: EditKind,
        doc: Rc<Value>,
        selected_path: Path,
        selected_kind: SelectionKind,
        status: StatusOverrides,
        /// 视图同步时跳过文本面板刷新
        suppress_text_refresh: bool,
    },
    FindStarted {
        term: String,
        matches: Vec<Path>,
        index: usize,
        selected_path: Path,
        selected_kind: SelectionKind,
        status_error: String,
    },
    FindAdvanced {
        index: usize,
        selected_path: Path,
        selected_kind: SelectionKind,
        status_error: String,
    },
    FindCleared { status_error: String },
    SetStatus {
        validity: Option<String>,
        error: Option<String>,
    },
}

impl Action {
    /// 全新加载（需要展开分叉路径）
    pub fn is_load(&self) -> bool {
        matches!(
            self,
            Action::LoadDocument { .. } | Action::ReloadDocument { .. } | Action::LoadFromClipboard { .. }
        )
    }

    pub fn suppresses_text_refresh(&self) -> bool {
        matches!(self, Action::StructuralChange { suppress_text_refresh: true, .. })
    }

    pub fn edit_kind(&self) -> Option<EditKind> {
        match self {
            Action::StructuralChange { edit, .. } => Some(*edit),
            _ => None,
        }
    }
}

/// 编辑器状态
///
/// 每次变迁整体替换，从不原地修改。文档用 `Rc` 持有，
/// 克隆状态只复制指针；文档是否变化通过 `Rc::ptr_eq` 判断。
#[derive(Debug, Clone)]
pub struct EditorState {
    pub document: Option<Rc<Value>>,
    pub source: Option<PathBuf>,
    pub selected_path: Option<Path>,
    pub selected_kind: Option<SelectionKind>,
    pub dirty: bool,
    pub text_mode: TextMode,
    pub status_validity: String,
    pub status_error: String,
    pub find: Option<FindSession>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            document: None,
            source: None,
            selected_path: None,
            selected_kind: None,
            dirty: false,
            text_mode: TextMode::Json,
            status_validity: STATUS_NO_DOCUMENT.to_string(),
            status_error: String::new(),
            find: None,
        }
    }
}

impl EditorState {
    pub fn doc(&self) -> Option<&Value> {
        self.document.as_deref()
    }

    /// 两个状态是否持有同一份文档（同一引用，或都为空）
    pub fn same_document(&self, other: &EditorState) -> bool {
        match (&self.document, &other.document) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// 当前选中值
    pub fn selected_value(&self) -> Option<&Value> {
        let doc = self.doc()?;
        let path = self.selected_path.as_ref()?;
        crate::model::document::get(doc, path).ok()
    }

    /// 结构编辑是否可用
    pub fn can_edit_structure(&self) -> bool {
        self.document.is_some() && self.selected_kind.is_some_and(SelectionKind::is_structural)
    }

    pub fn can_rename(&self) -> bool {
        self.document.is_some() && self.selected_kind == Some(SelectionKind::ObjectKey)
    }
}
