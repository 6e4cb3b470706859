//! 查找引擎：按键名收集路径，并生成开始 / 推进查找的 Action

use serde_json::Value;

use crate::model::document::{get, kind_of, PathError};
use crate::model::state::SelectionKind;
use crate::model::path::Path;
use crate::model::state::{Action, EditorState};

pub const STATUS_NO_ACTIVE_SEARCH: &str = "No active search";

/// 深度优先、先序遍历，收集最后一段等于 `target_key` 的所有路径（文档顺序）
///
/// 命中的成员仍会继续向下递归。
pub fn collect_key_paths(doc: &Value, target_key: &str) -> Vec<Path> {
    fn walk(node: &Value, current: &Path, target_key: &str, out: &mut Vec<Path>) {
        match node {
            Value::Object(map) => {
                for (k, v) in map {
                    let child = current.child(k.as_str());
                    if k == target_key {
                        out.push(child.clone());
                    }
                    walk(v, &child, target_key, out);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter().enumerate() {
                    walk(v, &current.child(i), target_key, out);
                }
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(doc, &Path::root(), target_key, &mut out);
    out
}

/// 新的查找词开启新会话；空词或与当前会话相同的词等价于推进
pub fn start_find(state: &EditorState, term: &str) -> Result<Action, PathError> {
    let same_term = state.find.as_ref().is_some_and(|f| f.term == term);
    if term.is_empty() || same_term {
        return advance_find(state);
    }

    let matches = state
        .doc()
        .map(|doc| collect_key_paths(doc, term))
        .unwrap_or_default();
    let (Some(doc), Some(first)) = (state.doc(), matches.first().cloned()) else {
        return Ok(Action::FindCleared {
            status_error: format!("Find \"{}\": no matches", term),
        });
    };

    let selected_kind = match_kind(doc, &first)?;
    let status_error = format!("Find \"{}\": 1 of {}", term, matches.len());
    Ok(Action::FindStarted {
        term: term.to_string(),
        matches,
        index: 0,
        selected_path: first,
        selected_kind,
        status_error,
    })
}

/// 推进到下一个匹配，越过末尾时回绕到第一个
pub fn advance_find(state: &EditorState) -> Result<Action, PathError> {
    let (Some(doc), Some(session)) = (state.doc(), state.find.as_ref()) else {
        return Ok(no_active_search());
    };
    if session.matches.is_empty() {
        return Ok(no_active_search());
    }

    let total = session.matches.len();
    let mut index = session.current_index + 1;
    let wrapped = index >= total;
    if wrapped {
        index = 0;
    }

    let path = session.matches[index].clone();
    let selected_kind = match_kind(doc, &path)?;
    let status_error = if wrapped {
        format!("Find \"{}\": wrapped (1 of {})", session.term, total)
    } else {
        format!("Find \"{}\": {} of {}", session.term, index + 1, total)
    };
    Ok(Action::FindAdvanced {
        index,
        selected_path: path,
        selected_kind,
        status_error,
    })
}

/// 匹配路径必须仍能解析，编辑后被删掉的键返回 `PathError`
fn match_kind(doc: &Value, path: &Path) -> Result<SelectionKind, PathError> {
    get(doc, path)?;
    kind_of(doc, path)
}

fn no_active_search() -> Action {
    Action::SetStatus {
        validity: None,
        error: Some(STATUS_NO_ACTIVE_SEARCH.to_string()),
    }
}
