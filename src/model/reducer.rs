//! Reducer：`(state, action) -> state'` 纯函数，所有状态变迁的唯一入口

use serde_json::Value;

use crate::model::document::get;
use crate::model::path::Path;
use crate::model::state::{Action, EditorState, SelectionKind, TextMode};

pub const STATUS_LOADED: &str = "loaded";
pub const STATUS_RELOADED: &str = "reloaded";
pub const STATUS_CREATED: &str = "created";
pub const STATUS_SAVED: &str = "saved";
pub const STATUS_VALID: &str = "valid";
pub const STATUS_INVALID: &str = "INVALID";

/// 选中值是字符串时进入原文模式
fn derive_text_mode(doc: Option<&Value>, path: Option<&Path>) -> TextMode {
    match (doc, path) {
        (Some(doc), Some(path)) => match get(doc, path) {
            Ok(Value::String(_)) => TextMode::RawString,
            _ => TextMode::Json,
        },
        _ => TextMode::Json,
    }
}

pub fn reduce(state: &EditorState, action: &Action) -> EditorState {
    match action {
        Action::LoadDocument { doc, source } | Action::ReloadDocument { doc, source } => {
            let validity = if matches!(action, Action::ReloadDocument { .. }) {
                STATUS_RELOADED
            } else {
                STATUS_LOADED
            };
            EditorState {
                document: Some(doc.clone()),
                source: Some(source.clone()),
                selected_path: Some(Path::root()),
                selected_kind: Some(SelectionKind::Root),
                dirty: false,
                text_mode: derive_text_mode(Some(&**doc), Some(&Path::root())),
                status_validity: validity.to_string(),
                status_error: String::new(),
                find: None,
            }
        }
        Action::LoadFromClipboard { doc } => EditorState {
            document: Some(doc.clone()),
            source: None,
            selected_path: Some(Path::root()),
            selected_kind: Some(SelectionKind::Root),
            dirty: false,
            text_mode: derive_text_mode(Some(&**doc), Some(&Path::root())),
            status_validity: STATUS_CREATED.to_string(),
            status_error: String::new(),
            find: None,
        },
        Action::SaveCompleted { source } => EditorState {
            source: Some(source.clone()),
            dirty: false,
            status_validity: STATUS_SAVED.to_string(),
            status_error: String::new(),
            ..state.clone()
        },
        Action::SelectPath { path, kind } => EditorState {
            selected_path: Some(path.clone()),
            selected_kind: Some(*kind),
            text_mode: derive_text_mode(state.doc(), Some(path)),
            ..state.clone()
        },
        Action::CommitText { doc } => EditorState {
            document: Some(doc.clone()),
            dirty: true,
            text_mode: derive_text_mode(Some(&**doc), state.selected_path.as_ref()),
            status_validity: STATUS_VALID.to_string(),
            status_error: String::new(),
            ..state.clone()
        },
        Action::CommitFailed { message } => EditorState {
            status_validity: STATUS_INVALID.to_string(),
            status_error: message.clone(),
            ..state.clone()
        },
        Action::StructuralChange {
            doc,
            selected_path,
            selected_kind,
            status,
            ..
        } => EditorState {
            document: Some(doc.clone()),
            selected_path: Some(selected_path.clone()),
            selected_kind: Some(*selected_kind),
            dirty: true,
            text_mode: derive_text_mode(Some(&**doc), Some(selected_path)),
            status_validity: status
                .validity
                .clone()
                .unwrap_or_else(|| state.status_validity.clone()),
            status_error: status
                .error
                .clone()
                .unwrap_or_else(|| state.status_error.clone()),
            ..state.clone()
        },
        Action::FindStarted {
            term,
            matches,
            index,
            selected_path,
            selected_kind,
            status_error,
        } => EditorState {
            find: Some(crate::model::state::FindSession {
                term: term.clone(),
                matches: matches.clone(),
                current_index: *index,
            }),
            selected_path: Some(selected_path.clone()),
            selected_kind: Some(*selected_kind),
            text_mode: derive_text_mode(state.doc(), Some(selected_path)),
            status_error: status_error.clone(),
            ..state.clone()
        },
        Action::FindAdvanced {
            index,
            selected_path,
            selected_kind,
            status_error,
        } => {
            let find = state.find.clone().map(|mut session| {
                session.current_index = *index;
                session
            });
            EditorState {
                find,
                selected_path: Some(selected_path.clone()),
                selected_kind: Some(*selected_kind),
                text_mode: derive_text_mode(state.doc(), Some(selected_path)),
                status_error: status_error.clone(),
                ..state.clone()
            }
        }
        Action::FindCleared { status_error } => EditorState {
            find: None,
            status_error: status_error.clone(),
            ..state.clone()
        },
        Action::SetStatus { validity, error } => EditorState {
            status_validity: validity.clone().unwrap_or_else(|| state.status_validity.clone()),
            status_error: error.clone().unwrap_or_else(|| state.status_error.clone()),
            ..state.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::state::{EditKind, FindSession, StatusOverrides};
    use crate::path;
    use serde_json::json;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn loaded(doc: Value) -> EditorState {
        reduce(
            &EditorState::default(),
            &Action::LoadDocument { doc: Rc::new(doc), source: PathBuf::from("a.json") },
        )
    }

    #[test]
    fn test_initial_state() {
        let s = EditorState::default();
        assert!(s.document.is_none());
        assert_eq!(s.status_validity, "(no document)");
        assert_eq!(s.text_mode, TextMode::Json);
        assert!(!s.dirty);
    }

    #[test]
    fn test_load_resets_selection_and_find() {
        let mut s = loaded(json!({"a": 1}));
        s.dirty = true;
        s.find = Some(FindSession { term: "a".into(), matches: vec![path!["a"]], current_index: 0 });
        let doc = Rc::new(json!(["x"]));
        let r = reduce(&s, &Action::ReloadDocument { doc: doc.clone(), source: PathBuf::from("a.json") });
        assert!(Rc::ptr_eq(r.document.as_ref().unwrap(), &doc), "应直接持有 action 中的文档");
        assert_eq!(r.selected_path, Some(Path::root()));
        assert_eq!(r.selected_kind, Some(SelectionKind::Root));
        assert!(!r.dirty);
        assert!(r.find.is_none());
        assert_eq!(r.status_validity, STATUS_RELOADED);
        assert_eq!(s.status_validity, STATUS_LOADED, "旧状态不应被修改");
    }

    #[test]
    fn test_load_from_clipboard_has_no_source() {
        let s = loaded(json!({}));
        let r = reduce(&s, &Action::LoadFromClipboard { doc: Rc::new(json!([])) });
        assert!(r.source.is_none());
        assert_eq!(r.status_validity, STATUS_CREATED);
    }

    #[test]
    fn test_save_keeps_document_identity() {
        let mut s = loaded(json!({"a": 1}));
        s.dirty = true;
        let r = reduce(&s, &Action::SaveCompleted { source: PathBuf::from("b.json") });
        assert!(r.same_document(&s));
        assert!(!r.dirty);
        assert_eq!(r.source, Some(PathBuf::from("b.json")));
        assert_eq!(r.status_validity, STATUS_SAVED);
    }

    #[test]
    fn test_select_recomputes_text_mode() {
        let s = loaded(json!({"name": "张三", "age": 30}));
        let r = reduce(&s, &Action::SelectPath { path: path!["name"], kind: SelectionKind::ObjectKey });
        assert_eq!(r.text_mode, TextMode::RawString);
        let r2 = reduce(&r, &Action::SelectPath { path: path!["age"], kind: SelectionKind::ObjectKey });
        assert_eq!(r2.text_mode, TextMode::Json);
    }

    #[test]
    fn test_commit_text_and_failure() {
        let s = loaded(json!({"a": 1}));
        let s = reduce(&s, &Action::SelectPath { path: path!["a"], kind: SelectionKind::ObjectKey });
        let r = reduce(&s, &Action::CommitText { doc: Rc::new(json!({"a": "x"})) });
        assert!(r.dirty);
        assert_eq!(r.status_validity, STATUS_VALID);
        assert_eq!(r.text_mode, TextMode::RawString);

        let f = reduce(&r, &Action::CommitFailed { message: "bad".into() });
        assert!(f.same_document(&r), "失败不应改变文档");
        assert_eq!(f.status_validity, STATUS_INVALID);
        assert_eq!(f.status_error, "bad");
    }

    #[test]
    fn test_structural_change_with_overrides() {
        let s = loaded(json!([1, 2]));
        let action = Action::StructuralChange {
            edit: EditKind::Delete,
            doc: Rc::new(json!([2])),
            selected_path: path![0usize],
            selected_kind: SelectionKind::ArrayElement,
            status: StatusOverrides { validity: Some("(uncommitted edits)".into()), error: None },
            suppress_text_refresh: true,
        };
        let r = reduce(&s, &action);
        assert!(r.dirty);
        assert_eq!(r.status_validity, "(uncommitted edits)");
        assert_eq!(r.status_error, s.status_error, "未覆盖的字段保持原值");
        assert_eq!(r.selected_path, Some(path![0usize]));
    }

    #[test]
    fn test_find_transitions() {
        let s = loaded(json!({"a": {"x": 1}, "b": {"x": 2}}));
        let started = reduce(
            &s,
            &Action::FindStarted {
                term: "x".into(),
                matches: vec![path!["a", "x"], path!["b", "x"]],
                index: 0,
                selected_path: path!["a", "x"],
                selected_kind: SelectionKind::ObjectKey,
                status_error: "Find \"x\": 1 of 2".into(),
            },
        );
        assert_eq!(started.find.as_ref().unwrap().current_index, 0);
        let adv = reduce(
            &started,
            &Action::FindAdvanced {
                index: 1,
                selected_path: path!["b", "x"],
                selected_kind: SelectionKind::ObjectKey,
                status_error: "Find \"x\": 2 of 2".into(),
            },
        );
        assert_eq!(adv.find.as_ref().unwrap().current_index, 1);
        assert_eq!(adv.selected_path, Some(path!["b", "x"]));

        let cleared = reduce(&adv, &Action::FindCleared { status_error: "none".into() });
        assert!(cleared.find.is_none());
        assert_eq!(cleared.selected_path, adv.selected_path, "清除查找不改变选中");
    }

    #[test]
    fn test_set_status_is_shallow_patch() {
        let s = loaded(json!({}));
        let r = reduce(&s, &Action::SetStatus { validity: None, error: Some("err".into()) });
        assert_eq!(r.status_validity, STATUS_LOADED);
        assert_eq!(r.status_error, "err");
        assert!(r.same_document(&s));
    }
}
