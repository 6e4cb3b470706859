//! 结构编辑：上移 / 下移、插入、复制、重命名、删除，以及文本提交
//!
//! 每个操作都先完整复制文档，在副本上修改，再计算新的选中路径，
//! 最终产出一个 `StructuralChange`（或 `CommitText`）Action。
//! 失败时不产出任何 Action，状态保持不变。

use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::document::{get, get_mut, is_container, kind_of, parse_json_text, remove_in_place, set, PathError};
use crate::model::path::{Path, Seg};
use crate::model::state::{Action, EditKind, EditorState, StatusOverrides, TextMode};

pub const STATUS_UNCOMMITTED_EDITS: &str = "(uncommitted edits)";
pub const STATUS_TEXT_NOT_REFRESHED: &str = "Selection changed; text not refreshed (uncommitted edits).";
pub const ERROR_ROOT_NOT_CONTAINER: &str = "Root must be {} or [].";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("没有加载文档")]
    NoDocument,
    #[error("当前选中项不支持结构编辑")]
    NotEditable,
    #[error("父容器成员不足，无需移动")]
    NothingToMove,
    #[error("对象键需要一个新名称")]
    KeyRequired,
    #[error("键名未改变")]
    Unchanged,
    #[error("操作已取消")]
    Cancelled,
    #[error("Key already exists in this object: {0}")]
    KeyExists(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// 上移（-1）/ 下移（+1）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Raise,
    Lower,
}

impl Direction {
    fn offset(self) -> isize {
        match self {
            Direction::Raise => -1,
            Direction::Lower => 1,
        }
    }

    fn edit_kind(self) -> EditKind {
        match self {
            Direction::Raise => EditKind::Raise,
            Direction::Lower => EditKind::Lower,
        }
    }
}

/// 删除后选中项的归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reassignment {
    Parent,
    NextSibling,
    PreviousSibling,
}

/// 结构编辑的前置条件：有文档、选中项是对象键或数组元素
fn structural_target(state: &EditorState) -> Result<(&Value, &Path, Path), EditError> {
    let doc = state.doc().ok_or(EditError::NoDocument)?;
    if !state.can_edit_structure() {
        return Err(EditError::NotEditable);
    }
    let path = state.selected_path.as_ref().ok_or(EditError::NotEditable)?;
    let parent = path.parent().ok_or(EditError::NotEditable)?;
    Ok((doc, path, parent))
}

fn structural_change(edit: EditKind, doc: Value, selected_path: Path) -> Result<Action, EditError> {
    let selected_kind = kind_of(&doc, &selected_path)?;
    Ok(Action::StructuralChange {
        edit,
        doc: Rc::new(doc),
        selected_path,
        selected_kind,
        status: StatusOverrides::default(),
        suppress_text_refresh: false,
    })
}

fn unresolved(path: &Path) -> EditError {
    EditError::Path(PathError::Unresolved {
        path: path.clone(),
        depth: path.len().saturating_sub(1),
    })
}

/// 按给定键顺序重建对象，值不变
fn reorder_keys(map: &mut Map<String, Value>, keys: &[String]) {
    let mut old = std::mem::take(map);
    for k in keys {
        if let Some(v) = old.remove(k) {
            map.insert(k.clone(), v);
        }
    }
}

/// 在 `after` 之后插入新键，其余键相对顺序不变
fn insert_key_after(map: &mut Map<String, Value>, after: &str, key: String, value: Value) {
    let mut pending = Some((key, value));
    let rebuilt: Map<String, Value> = std::mem::take(map)
        .into_iter()
        .flat_map(|(k, v)| {
            let extra = if k == after { pending.take() } else { None };
            std::iter::once((k, v)).chain(extra)
        })
        .collect();
    *map = rebuilt;
}

/// 与相邻成员交换位置，越界时回绕
pub fn move_item(state: &EditorState, direction: Direction) -> Result<Action, EditError> {
    let (doc, path, parent_path) = structural_target(state)?;
    let mut new_doc = doc.clone();

    let new_path = match (get_mut(&mut new_doc, &parent_path)?, path.last()) {
        (Value::Array(arr), Some(Seg::Index(i))) => {
            let n = arr.len();
            if n <= 1 {
                return Err(EditError::NothingToMove);
            }
            if *i >= n {
                return Err(unresolved(path));
            }
            let j = (*i as isize + direction.offset()).rem_euclid(n as isize) as usize;
            arr.swap(*i, j);
            parent_path.child(j)
        }
        (Value::Object(map), Some(Seg::Key(k))) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            if keys.len() <= 1 {
                return Err(EditError::NothingToMove);
            }
            let i = keys.iter().position(|kk| kk == k).ok_or_else(|| unresolved(path))?;
            let j = (i as isize + direction.offset()).rem_euclid(keys.len() as isize) as usize;
            keys.swap(i, j);
            reorder_keys(map, &keys);
            parent_path.child(k.as_str())
        }
        _ => return Err(unresolved(path)),
    };

    structural_change(direction.edit_kind(), new_doc, new_path)
}

/// 插入或复制的公共实现：`duplicate` 为真时新值是选中值的深拷贝，否则为 null
fn insert_sibling(state: &EditorState, new_key: Option<String>, duplicate: bool) -> Result<Action, EditError> {
    let (doc, path, parent_path) = structural_target(state)?;
    let edit = if duplicate { EditKind::Duplicate } else { EditKind::InsertAfter };
    let value = if duplicate { get(doc, path)?.clone() } else { Value::Null };
    let mut new_doc = doc.clone();

    let new_path = match (get_mut(&mut new_doc, &parent_path)?, path.last()) {
        (Value::Array(arr), Some(Seg::Index(i))) => {
            if *i >= arr.len() {
                return Err(unresolved(path));
            }
            arr.insert(i + 1, value);
            parent_path.child(i + 1)
        }
        (Value::Object(map), Some(Seg::Key(old))) => {
            let key = new_key.ok_or(EditError::KeyRequired)?;
            if map.contains_key(&key) {
                return Err(EditError::KeyExists(key));
            }
            if !map.contains_key(old) {
                return Err(unresolved(path));
            }
            insert_key_after(map, old, key.clone(), value);
            parent_path.child(key)
        }
        _ => return Err(unresolved(path)),
    };

    structural_change(edit, new_doc, new_path)
}

/// 在选中项之后插入 null；对象需要提供新键名
pub fn insert_after(state: &EditorState, new_key: Option<String>) -> Result<Action, EditError> {
    insert_sibling(state, new_key, false)
}

/// 在选中项之后插入其深拷贝；对象需要提供新键名
pub fn duplicate(state: &EditorState, new_key: Option<String>) -> Result<Action, EditError> {
    insert_sibling(state, new_key, true)
}

/// 原位重命名对象键，值不变；文本面板不刷新
pub fn rename_key(state: &EditorState, new_key: &str) -> Result<Action, EditError> {
    let (doc, path, parent_path) = structural_target(state)?;
    if !state.can_rename() {
        return Err(EditError::NotEditable);
    }
    let Some(Seg::Key(old)) = path.last() else {
        return Err(EditError::NotEditable);
    };
    if old == new_key {
        return Err(EditError::Unchanged);
    }

    let mut new_doc = doc.clone();
    let Value::Object(map) = get_mut(&mut new_doc, &parent_path)? else {
        return Err(EditError::NotEditable);
    };
    if map.contains_key(new_key) {
        return Err(EditError::KeyExists(new_key.to_string()));
    }
    if !map.contains_key(old) {
        return Err(unresolved(path));
    }
    let rebuilt: Map<String, Value> = std::mem::take(map)
        .into_iter()
        .map(|(k, v)| if &k == old { (new_key.to_string(), v) } else { (k, v) })
        .collect();
    *map = rebuilt;

    match structural_change(EditKind::Rename, new_doc, parent_path.child(new_key))? {
        Action::StructuralChange { edit, doc, selected_path, selected_kind, status, .. } => Ok(Action::StructuralChange {
            edit,
            doc,
            selected_path,
            selected_kind,
            status,
            suppress_text_refresh: true,
        }),
        other => Ok(other),
    }
}

/// 删除后的选中策略
///
/// 数组：空则选父；原下标仍有效选该下标（后一个兄弟）；否则选前一个。
/// 对象：空则选父；否则选剩余的最后一个键。
pub fn pick_selection_after_delete(
    doc: &Value,
    parent_path: &Path,
    removed: &Seg,
) -> Result<(Path, Reassignment), PathError> {
    let selection = match (get(doc, parent_path)?, removed) {
        (Value::Array(arr), Seg::Index(i)) => {
            if arr.is_empty() {
                (parent_path.clone(), Reassignment::Parent)
            } else if *i < arr.len() {
                (parent_path.child(*i), Reassignment::NextSibling)
            } else {
                (parent_path.child(arr.len() - 1), Reassignment::PreviousSibling)
            }
        }
        (Value::Object(map), _) => match map.keys().last() {
            Some(k) => (parent_path.child(k.as_str()), Reassignment::PreviousSibling),
            None => (parent_path.clone(), Reassignment::Parent),
        },
        _ => (parent_path.clone(), Reassignment::Parent),
    };
    Ok(selection)
}

/// 删除选中项
///
/// `text_had_uncommitted` 必须在复制文档之前、由文本面板的修改标记取得；
/// 为真时覆盖状态栏并跳过文本面板刷新，保留用户未提交的文本。
pub fn delete_item(state: &EditorState, text_had_uncommitted: bool) -> Result<Action, EditError> {
    let (doc, path, parent_path) = structural_target(state)?;
    let removed = path.last().cloned().ok_or(EditError::NotEditable)?;

    let mut new_doc = doc.clone();
    remove_in_place(&mut new_doc, path)?;
    let (selected_path, _) = pick_selection_after_delete(&new_doc, &parent_path, &removed)?;
    let selected_kind = kind_of(&new_doc, &selected_path)?;

    let status = if text_had_uncommitted {
        StatusOverrides {
            validity: Some(STATUS_UNCOMMITTED_EDITS.to_string()),
            error: Some(STATUS_TEXT_NOT_REFRESHED.to_string()),
        }
    } else {
        StatusOverrides::default()
    };
    Ok(Action::StructuralChange {
        edit: EditKind::Delete,
        doc: Rc::new(new_doc),
        selected_path,
        selected_kind,
        status,
        suppress_text_refresh: text_had_uncommitted,
    })
}

/// 文本面板提交：原文模式直接作为字符串，否则按 JSON 解析
///
/// 解析失败或根不是容器时返回 `CommitFailed`，文档不变。
pub fn commit_text(state: &EditorState, text: &str) -> Result<Action, EditError> {
    let doc = state.doc().ok_or(EditError::NoDocument)?;
    let path = state.selected_path.as_ref().ok_or(EditError::NotEditable)?;

    let value = match state.text_mode {
        TextMode::RawString => Value::String(text.to_string()),
        TextMode::Json => match parse_json_text(text) {
            Ok(v) => v,
            Err(e) => return Ok(Action::CommitFailed { message: e.to_string() }),
        },
    };
    if path.is_root() && !is_container(&value) {
        return Ok(Action::CommitFailed {
            message: ERROR_ROOT_NOT_CONTAINER.to_string(),
        });
    }

    let new_doc = set(doc, path, value)?;
    Ok(Action::CommitText { doc: Rc::new(new_doc) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::reducer::reduce;
    use crate::model::state::SelectionKind;
    use crate::path;
    use serde_json::json;
    use std::path::PathBuf;

    fn select(doc: Value, p: Path) -> EditorState {
        let s = reduce(
            &EditorState::default(),
            &Action::LoadDocument { doc: Rc::new(doc), source: PathBuf::from("t.json") },
        );
        let kind = kind_of(s.doc().unwrap(), &p).unwrap();
        reduce(&s, &Action::SelectPath { path: p, kind })
    }

    fn apply(s: &EditorState, action: Action) -> EditorState {
        reduce(s, &action)
    }

    fn keys(v: &Value) -> Vec<String> {
        v.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_move_array_and_wrap() {
        let s = select(json!([1, 2, 3]), path![0usize]);
        let r = apply(&s, move_item(&s, Direction::Lower).unwrap());
        assert_eq!(r.doc().unwrap(), &json!([2, 1, 3]));
        assert_eq!(r.selected_path, Some(path![1usize]));
        assert!(r.dirty);

        let w = apply(&s, move_item(&s, Direction::Raise).unwrap());
        assert_eq!(w.doc().unwrap(), &json!([3, 2, 1]), "上移首元素应与末元素交换");
        assert_eq!(w.selected_path, Some(path![2usize]));
    }

    #[test]
    fn test_move_object_reorders_keys() {
        let s = select(json!({"a": 1, "b": 2, "c": 3}), path!["b"]);
        let r = apply(&s, move_item(&s, Direction::Raise).unwrap());
        assert_eq!(keys(r.doc().unwrap()), vec!["b", "a", "c"]);
        assert_eq!(r.selected_path, Some(path!["b"]));
        assert_eq!(r.doc().unwrap()["b"], json!(2));
    }

    #[test]
    fn test_move_is_self_inverse() {
        for (doc, p) in [
            (json!({"a": 1, "b": {"c": 2}, "d": [3]}), path!["a"]),
            (json!({"a": 1, "b": {"c": 2}, "d": [3]}), path!["d"]),
            (json!([[1], 2, {"x": 3}]), path![2usize]),
        ] {
            let s = select(doc.clone(), p);
            let lowered = apply(&s, move_item(&s, Direction::Lower).unwrap());
            let back = apply(&lowered, move_item(&lowered, Direction::Raise).unwrap());
            assert_eq!(back.doc().unwrap(), &doc);
            assert_eq!(keys_or_len(back.doc().unwrap()), keys_or_len(&doc), "键顺序应还原");
        }
    }

    fn keys_or_len(v: &Value) -> Vec<String> {
        match v {
            Value::Object(_) => keys(v),
            Value::Array(a) => vec![a.len().to_string()],
            _ => vec![],
        }
    }

    #[test]
    fn test_move_single_member_is_noop() {
        let s = select(json!({"only": [1]}), path!["only", 0usize]);
        assert_eq!(move_item(&s, Direction::Lower).unwrap_err(), EditError::NothingToMove);
        let s = select(json!({"only": 1}), path!["only"]);
        assert_eq!(move_item(&s, Direction::Raise).unwrap_err(), EditError::NothingToMove);
    }

    #[test]
    fn test_root_is_never_editable() {
        let s = select(json!({"a": 1}), Path::root());
        assert_eq!(move_item(&s, Direction::Lower).unwrap_err(), EditError::NotEditable);
        assert_eq!(delete_item(&s, false).unwrap_err(), EditError::NotEditable);
        assert_eq!(insert_after(&s, Some("k".into())).unwrap_err(), EditError::NotEditable);
        assert_eq!(
            move_item(&EditorState::default(), Direction::Lower).unwrap_err(),
            EditError::NoDocument
        );
    }

    #[test]
    fn test_insert_after_object_preserves_order() {
        let s = select(json!({"a": 1, "b": 2}), path!["a"]);
        let action = insert_after(&s, Some("c".into())).unwrap();
        assert_eq!(action.edit_kind(), Some(EditKind::InsertAfter));
        let r = apply(&s, action);
        assert_eq!(r.doc().unwrap(), &json!({"a": 1, "c": null, "b": 2}));
        assert_eq!(keys(r.doc().unwrap()), vec!["a", "c", "b"]);
        assert_eq!(r.selected_path, Some(path!["c"]));
        assert_eq!(r.selected_kind, Some(SelectionKind::ObjectKey));
    }

    #[test]
    fn test_insert_after_object_rejections() {
        let s = select(json!({"a": 1, "b": 2}), path!["a"]);
        assert_eq!(insert_after(&s, Some("b".into())).unwrap_err(), EditError::KeyExists("b".into()));
        assert_eq!(insert_after(&s, None).unwrap_err(), EditError::KeyRequired);
        assert_eq!(s.doc().unwrap(), &json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_insert_after_array() {
        let s = select(json!({"l": [1, 2]}), path!["l", 0usize]);
        let r = apply(&s, insert_after(&s, None).unwrap());
        assert_eq!(r.doc().unwrap(), &json!({"l": [1, null, 2]}));
        assert_eq!(r.selected_path, Some(path!["l", 1usize]));
        assert_eq!(r.selected_kind, Some(SelectionKind::ArrayElement));
    }

    #[test]
    fn test_duplicate_deep_copies() {
        let s = select(json!([{"x": [1]}]), path![0usize]);
        let r = apply(&s, duplicate(&s, None).unwrap());
        assert_eq!(r.doc().unwrap(), &json!([{"x": [1]}, {"x": [1]}]));
        assert_eq!(r.selected_path, Some(path![1usize]));

        let s = select(json!({"a": {"n": 1}, "z": 0}), path!["a"]);
        let r = apply(&s, duplicate(&s, Some("a2".into())).unwrap());
        assert_eq!(keys(r.doc().unwrap()), vec!["a", "a2", "z"]);
        assert_eq!(r.doc().unwrap()["a2"], json!({"n": 1}));
    }

    #[test]
    fn test_rename_key_in_place() {
        let s = select(json!({"a": 1, "b": 2, "c": 3}), path!["b"]);
        let action = rename_key(&s, "x").unwrap();
        assert!(action.suppresses_text_refresh(), "重命名不应刷新文本面板");
        let r = apply(&s, action);
        assert_eq!(keys(r.doc().unwrap()), vec!["a", "x", "c"]);
        assert_eq!(r.doc().unwrap()["x"], json!(2));
        assert_eq!(r.selected_path, Some(path!["x"]));
    }

    #[test]
    fn test_rename_rejections() {
        let s = select(json!({"a": 1, "b": 2}), path!["a"]);
        assert_eq!(rename_key(&s, "b").unwrap_err(), EditError::KeyExists("b".into()));
        assert_eq!(rename_key(&s, "a").unwrap_err(), EditError::Unchanged);
        let arr = select(json!([1, 2]), path![0usize]);
        assert_eq!(rename_key(&arr, "x").unwrap_err(), EditError::NotEditable, "数组元素不能重命名");
    }

    #[test]
    fn test_delete_selection_policy_array() {
        let s = select(json!([1, 2, 3]), path![1usize]);
        let r = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(r.doc().unwrap(), &json!([1, 3]));
        assert_eq!(r.selected_path, Some(path![1usize]), "应选中后一个兄弟");

        let s = select(json!([1, 2, 3]), path![2usize]);
        let r = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(r.selected_path, Some(path![1usize]), "应选中前一个兄弟");

        let s = select(json!([1]), path![0usize]);
        let r = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(r.doc().unwrap(), &json!([]));
        assert_eq!(r.selected_path, Some(Path::root()));
        assert_eq!(r.selected_kind, Some(SelectionKind::Root));
    }

    #[test]
    fn test_delete_selection_policy_object() {
        let s = select(json!({"o": {"a": 1, "b": 2, "c": 3}}), path!["o", "a"]);
        let r = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(r.selected_path, Some(path!["o", "c"]), "对象删除后选中最后一个键");

        let s = select(json!({"o": {"a": 1}}), path!["o", "a"]);
        let r = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(r.selected_path, Some(path!["o"]));
        assert_eq!(r.selected_kind, Some(SelectionKind::ObjectKey));
    }

    #[test]
    fn test_delete_with_uncommitted_text_overrides_status() {
        let s = select(json!([1, 2]), path![0usize]);
        let action = delete_item(&s, true).unwrap();
        assert!(action.suppresses_text_refresh());
        let r = apply(&s, action);
        assert_eq!(r.status_validity, STATUS_UNCOMMITTED_EDITS);
        assert_eq!(r.status_error, STATUS_TEXT_NOT_REFRESHED);

        let clean = apply(&s, delete_item(&s, false).unwrap());
        assert_eq!(clean.status_validity, s.status_validity, "无未提交编辑时状态栏不变");
    }

    #[test]
    fn test_pick_selection_reports_reassignment() {
        let doc = json!({"l": [1, 2]});
        assert_eq!(
            pick_selection_after_delete(&doc, &path!["l"], &Seg::Index(2)).unwrap(),
            (path!["l", 1usize], Reassignment::PreviousSibling)
        );
        assert_eq!(
            pick_selection_after_delete(&doc, &path!["l"], &Seg::Index(0)).unwrap(),
            (path!["l", 0usize], Reassignment::NextSibling)
        );
    }

    #[test]
    fn test_commit_text_json_and_raw() {
        let s = select(json!({"n": 1, "s": "old"}), path!["n"]);
        let r = apply(&s, commit_text(&s, "[1, 2]").unwrap());
        assert_eq!(r.doc().unwrap(), &json!({"n": [1, 2], "s": "old"}));
        assert!(!r.same_document(&s), "提交必须产生新的文档引用");

        let s = select(json!({"n": 1, "s": "old"}), path!["s"]);
        let r = apply(&s, commit_text(&s, "not json {").unwrap());
        assert_eq!(r.doc().unwrap()["s"], json!("not json {"), "原文模式不解析");
    }

    #[test]
    fn test_commit_text_failures_leave_document() {
        let s = select(json!({"n": 1}), path!["n"]);
        match commit_text(&s, "{oops").unwrap() {
            Action::CommitFailed { message } => assert!(message.contains("line 1")),
            other => panic!("意外的 action: {:?}", other),
        }
        let root = select(json!({"n": 1}), Path::root());
        match commit_text(&root, "42").unwrap() {
            Action::CommitFailed { message } => assert_eq!(message, ERROR_ROOT_NOT_CONTAINER),
            other => panic!("意外的 action: {:?}", other),
        }
        let r = apply(&root, commit_text(&root, "[]").unwrap());
        assert_eq!(r.doc().unwrap(), &json!([]));
    }
}
