//! 影子树（Shadow Tree）：树视图节点的平铺 arena
//!
//! 节点以下标（`NodeId`）寻址，另维护 路径 <-> 下标 的双向映射。
//! 每次重建都会重新分配下标，因此跨重建只保留“路径”，不保留下标。

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::model::path::Path;
use crate::model::state::SelectionKind;

/// JSON 节点类型（与 UI 展示解耦）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

/// arena 中的不透明下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// 树视图显示的标签，如 `"name": {}` / `[0]: leaf`
    pub label: String,
    /// 节点在文档中的路径
    pub path: Path,
    /// RFC 9535 JSONPath（用于展示）
    pub json_path: String,
    /// 节点类型
    pub kind: NodeKind,
    /// 选中该节点时的选中种类
    pub selection_kind: SelectionKind,
    /// 子元素数量（对象字段数 / 数组长度）
    pub children: u32,
    /// 轻量预览（字符串截断、数字/布尔/空的简短描述）
    pub preview: String,
    /// 节点深度（用于UI缩进显示）
    pub depth: u32,
    /// 是否展开
    pub expanded: bool,
}

fn kind_of(v: &Value) -> NodeKind {
    match v {
        Value::Object(_) => NodeKind::Object,
        Value::Array(_) => NodeKind::Array,
        Value::String(_) => NodeKind::String,
        Value::Number(_) => NodeKind::Number,
        Value::Bool(_) => NodeKind::Bool,
        Value::Null => NodeKind::Null,
    }
}

fn preview_of(v: &Value) -> String {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if s.chars().count() > 32 {
                let truncated: String = s.chars().take(32).collect();
                format!("\"{}...\"", truncated)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(m) => format!("{{..}} ({} keys)", m.len()),
        Value::Array(a) => format!("[..] ({} items)", a.len()),
    }
}

fn type_marker(v: &Value) -> &'static str {
    match v {
        Value::Object(_) => "{}",
        Value::Array(_) => "[]",
        _ => "leaf",
    }
}

/// 树节点标签
pub fn label_for(path: &Path, kind: SelectionKind, v: &Value) -> String {
    match (kind, path.last()) {
        (SelectionKind::Root, _) | (_, None) => match v {
            Value::Object(_) => "root {}".to_string(),
            Value::Array(_) => "root []".to_string(),
            _ => "root".to_string(),
        },
        (SelectionKind::ObjectKey, Some(seg)) => {
            if matches!(v, Value::Object(_) | Value::Array(_)) {
                format!("{}: {}", seg, type_marker(v))
            } else {
                seg.to_string()
            }
        }
        (SelectionKind::ArrayElement, Some(seg)) => format!("[{}]: {}", seg, type_marker(v)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShadowTree {
    nodes: Vec<JsonTreeNode>,
    path_to_id: HashMap<Path, NodeId>,
}

/// 从根 Value 构建全树影子索引（全部折叠）
pub fn build_shadow_tree(root: &Value) -> ShadowTree {
    let mut tree = ShadowTree {
        nodes: Vec::with_capacity(1024),
        path_to_id: HashMap::new(),
    };
    tree.walk(root, Path::root(), SelectionKind::Root, None, 0);
    tree
}

impl ShadowTree {
    fn push_node(&mut self, v: &Value, path: Path, kind: SelectionKind, parent: Option<NodeId>, depth: u32) -> NodeId {
        let id = NodeId(self.nodes.len());
        let children = match v {
            Value::Object(m) => m.len() as u32,
            Value::Array(a) => a.len() as u32,
            _ => 0,
        };
        self.nodes.push(JsonTreeNode {
            id,
            parent,
            label: label_for(&path, kind, v),
            json_path: path.to_json_path(),
            path: path.clone(),
            kind: kind_of(v),
            selection_kind: kind,
            children,
            preview: preview_of(v),
            depth,
            expanded: false, // 默认折叠
        });
        self.path_to_id.insert(path, id);
        id
    }

    fn walk(&mut self, v: &Value, path: Path, kind: SelectionKind, parent: Option<NodeId>, depth: u32) {
        let id = self.push_node(v, path.clone(), kind, parent, depth);
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    self.walk(child, path.child(k.as_str()), SelectionKind::ObjectKey, Some(id), depth + 1);
                }
            }
            Value::Array(arr) => {
                for (idx, child) in arr.iter().enumerate() {
                    self.walk(child, path.child(idx), SelectionKind::ArrayElement, Some(id), depth + 1);
                }
            }
            _ => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 先序排列的全部节点
    pub fn nodes(&self) -> &[JsonTreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&JsonTreeNode> {
        self.nodes.get(id.0)
    }

    pub fn id_of(&self, path: &Path) -> Option<NodeId> {
        self.path_to_id.get(path).copied()
    }

    pub fn path_of(&self, id: NodeId) -> Option<&Path> {
        self.node(id).map(|n| &n.path)
    }

    /// 当前展开节点的路径集合
    pub fn expanded_paths(&self) -> HashSet<Path> {
        self.nodes
            .iter()
            .filter(|n| n.expanded)
            .map(|n| n.path.clone())
            .collect()
    }

    /// 重建：先记录展开路径，再逐节点重建，最后恢复仍能解析的展开路径
    pub fn rebuild(&mut self, doc: Option<&Value>) {
        let expanded = self.expanded_paths();
        *self = match doc {
            Some(doc) => build_shadow_tree(doc),
            None => ShadowTree::default(),
        };
        for p in &expanded {
            self.set_expanded(p, true);
        }
    }

    /// 返回是否找到该节点
    pub fn set_expanded(&mut self, path: &Path, expanded: bool) -> bool {
        match self.id_of(path) {
            Some(id) => {
                self.nodes[id.0].expanded = expanded;
                true
            }
            None => false,
        }
    }

    pub fn toggle_expanded(&mut self, path: &Path) -> bool {
        match self.id_of(path) {
            Some(id) => {
                let node = &mut self.nodes[id.0];
                node.expanded = !node.expanded;
                true
            }
            None => false,
        }
    }

    /// 展开从根到 `path` 的每个节点（含自身）
    pub fn expand_to(&mut self, path: &Path) {
        for p in path.ancestors_inclusive() {
            self.set_expanded(&p, true);
        }
    }

    /// 展开 `path` 的所有祖先，使其可见
    pub fn reveal(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            self.expand_to(&parent);
        }
    }

    /// 节点可见当且仅当所有祖先都已展开
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cur = self.node(id).and_then(|n| n.parent);
        while let Some(pid) = cur {
            let Some(parent) = self.node(pid) else {
                return false;
            };
            if !parent.expanded {
                return false;
            }
            cur = parent.parent;
        }
        self.node(id).is_some()
    }

    /// 按展开状态过滤出的可见节点（先序）
    pub fn visible_nodes(&self) -> Vec<&JsonTreeNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        // 记录被折叠的子树深度，跳过其中的节点
        let mut collapsed_at: Option<u32> = None;
        for node in &self.nodes {
            if let Some(d) = collapsed_at {
                if node.depth > d {
                    continue;
                }
                collapsed_at = None;
            }
            out.push(node);
            if !node.expanded {
                collapsed_at = Some(node.depth);
            }
        }
        out
    }
}
