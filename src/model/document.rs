//! 文档模型：基于路径的读取 / 替换 / 删除，以及解析、渲染与嵌入式配置
//!
//! 所有对外变更接口都是写时复制：先克隆整棵树，再修改副本并返回，
//! 输入值保持不变，状态层依赖这一点用引用同一性判断文档是否变化。

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::path::{Path, Seg};
use crate::model::state::SelectionKind;

/// 嵌入式配置所在的成员键
pub const EMBEDDED_CONFIG_KEY: &str = "jsonedit";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("路径无法解析: {path} (第 {depth} 段)")]
    Unresolved { path: Path, depth: usize },
    #[error("不能删除文档根")]
    RootNotDeletable,
}

/// JSON 文本解析失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {line}, col {column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json 的 Display 自带 " at line X column Y" 后缀，这里拆成结构化字段
        let full = e.to_string();
        let message = match full.rsplit_once(" at line ") {
            Some((msg, _)) => msg.to_string(),
            None => full,
        };
        Self {
            message,
            line: e.line(),
            column: e.column(),
        }
    }
}

/// 文本解析协作者
pub fn parse_json_text(text: &str) -> Result<Value, ParseError> {
    Ok(serde_json::from_str(text)?)
}

pub fn is_container(v: &Value) -> bool {
    matches!(v, Value::Object(_) | Value::Array(_))
}

fn step<'a>(cur: &'a Value, seg: &Seg) -> Option<&'a Value> {
    match (cur, seg) {
        (Value::Object(map), Seg::Key(k)) => map.get(k),
        (Value::Array(arr), Seg::Index(i)) => arr.get(*i),
        _ => None,
    }
}

fn step_mut<'a>(cur: &'a mut Value, seg: &Seg) -> Option<&'a mut Value> {
    match (cur, seg) {
        (Value::Object(map), Seg::Key(k)) => map.get_mut(k),
        (Value::Array(arr), Seg::Index(i)) => arr.get_mut(*i),
        _ => None,
    }
}

/// 读取路径处的值
pub fn get<'a>(doc: &'a Value, path: &Path) -> Result<&'a Value, PathError> {
    let mut cur = doc;
    for (depth, seg) in path.segments().iter().enumerate() {
        cur = step(cur, seg).ok_or_else(|| PathError::Unresolved {
            path: path.clone(),
            depth,
        })?;
    }
    Ok(cur)
}

/// 可变读取，仅供本模块与结构编辑在副本上使用
pub(crate) fn get_mut<'a>(doc: &'a mut Value, path: &Path) -> Result<&'a mut Value, PathError> {
    let mut cur = doc;
    for (depth, seg) in path.segments().iter().enumerate() {
        cur = step_mut(cur, seg).ok_or_else(|| PathError::Unresolved {
            path: path.clone(),
            depth,
        })?;
    }
    Ok(cur)
}

/// 返回一份在 `path` 处被替换为 `value` 的新文档；空路径替换整个文档
pub fn set(doc: &Value, path: &Path, value: Value) -> Result<Value, PathError> {
    if path.is_root() {
        return Ok(value);
    }
    let mut out = doc.clone();
    *get_mut(&mut out, path)? = value;
    Ok(out)
}

/// 返回一份移除了 `path` 处成员 / 元素的新文档
pub fn delete(doc: &Value, path: &Path) -> Result<Value, PathError> {
    let mut out = doc.clone();
    remove_in_place(&mut out, path)?;
    Ok(out)
}

/// 在已复制的文档上原地移除成员，返回被移除的值
///
/// 对象删除保持其余键的顺序；数组删除后续下标整体前移。
pub(crate) fn remove_in_place(doc: &mut Value, path: &Path) -> Result<Value, PathError> {
    let (parent, last) = match (path.parent(), path.last()) {
        (Some(p), Some(l)) => (p, l.clone()),
        _ => return Err(PathError::RootNotDeletable),
    };
    let unresolved = || PathError::Unresolved {
        path: path.clone(),
        depth: path.len() - 1,
    };
    match (get_mut(doc, &parent)?, &last) {
        (Value::Object(map), Seg::Key(k)) => {
            if !map.contains_key(k) {
                return Err(unresolved());
            }
            let mut removed = Value::Null;
            let rebuilt: Map<String, Value> = std::mem::take(map)
                .into_iter()
                .filter_map(|(kk, vv)| {
                    if &kk == k {
                        removed = vv;
                        None
                    } else {
                        Some((kk, vv))
                    }
                })
                .collect();
            *map = rebuilt;
            Ok(removed)
        }
        (Value::Array(arr), Seg::Index(i)) if *i < arr.len() => Ok(arr.remove(*i)),
        _ => Err(unresolved()),
    }
}

/// 从根沿单子容器一路向下，返回仍可到达的最深路径
///
/// 仅用于新加载后决定预展开哪些树节点。
pub fn first_bifurcation(doc: &Value) -> Path {
    let mut path = Path::root();
    let mut cur = doc;
    loop {
        match cur {
            Value::Array(arr) if arr.len() == 1 => {
                path = path.child(0usize);
                cur = &arr[0];
            }
            Value::Object(map) if map.len() == 1 => {
                let Some((k, v)) = map.iter().next() else {
                    return path;
                };
                path = path.child(k.as_str());
                cur = v;
            }
            _ => return path,
        }
    }
}

/// 选中节点的种类由父容器类型推导
pub fn kind_of(doc: &Value, path: &Path) -> Result<SelectionKind, PathError> {
    let Some(parent) = path.parent() else {
        return Ok(SelectionKind::Root);
    };
    match get(doc, &parent)? {
        Value::Object(_) => Ok(SelectionKind::ObjectKey),
        Value::Array(_) => Ok(SelectionKind::ArrayElement),
        _ => Err(PathError::Unresolved {
            path: path.clone(),
            depth: parent.len(),
        }),
    }
}

/// 2 空格缩进的格式化输出，保持原始键顺序
pub fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_default()
}

/// 紧凑输出（`,` / `:` 分隔，无空白）
pub fn compact(v: &Value) -> String {
    serde_json::to_string(v).unwrap_or_default()
}

/// 文本面板渲染：字符串取原文，其余格式化输出
pub fn render_for_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => pretty(other),
    }
}

/// 持久化文件内容：格式化 JSON + 结尾换行
pub fn render_for_file(v: &Value) -> String {
    let mut s = pretty(v);
    s.push('\n');
    s
}

/// 文档内嵌的编辑器配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmbeddedConfig {
    #[serde(rename = "window-title", default)]
    pub window_title: Option<String>,
}

/// 根对象的 `jsonedit` 成员，或根数组首元素的 `jsonedit` 成员
pub fn extract_embedded_config(doc: &Value) -> Option<EmbeddedConfig> {
    let holder = match doc {
        Value::Object(_) => doc,
        Value::Array(arr) => arr.first()?,
        _ => return None,
    };
    let cfg = holder.as_object()?.get(EMBEDDED_CONFIG_KEY)?;
    if !cfg.is_object() {
        return None;
    }
    match EmbeddedConfig::deserialize(cfg) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::debug!("忽略无法解析的嵌入式配置: {}", e);
            None
        }
    }
}
