//! EditorError：命令处理层的统一错误

use thiserror::Error;

use crate::model::document::{ParseError, PathError};
use crate::model::edit_ops::EditError;
use crate::utils::clipboard::ClipboardError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Parse(#[from] ParseError),
    #[error("路径错误: {0}")]
    Path(#[from] PathError),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("状态错误: {0}")]
    State(String),
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl EditorError {
    /// 取消、无可操作对象等情况不打扰用户，只记日志
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            EditorError::Edit(
                EditError::Cancelled
                    | EditError::NoDocument
                    | EditError::NotEditable
                    | EditError::NothingToMove
                    | EditError::Unchanged
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_classification() {
        assert!(EditorError::from(EditError::Cancelled).is_silent());
        assert!(EditorError::from(EditError::Unchanged).is_silent());
        assert!(!EditorError::from(EditError::KeyExists("a".into())).is_silent());
        assert!(!EditorError::Validation("x".into()).is_silent());
    }

    #[test]
    fn test_parse_error_message_keeps_position() {
        let err: EditorError = crate::model::document::parse_json_text("{").unwrap_err().into();
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid JSON: "));
        assert!(msg.contains("(line 1, col 1)"), "消息应包含位置: {}", msg);
    }
}
