//! Clipboard  cross-platform clipboard helpers

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Clip(String),
    #[error("Clipboard is empty or unavailable.")]
    Empty,
}

/// 剪贴板协作者：读写纯文本
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
    fn get_text(&mut self) -> Result<String, ClipboardError>;
}

/// 系统剪贴板，每次访问时建立上下文
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        copy_to_clipboard(text)
    }

    fn get_text(&mut self) -> Result<String, ClipboardError> {
        get_clipboard_contents()
    }
}

/// 将文本复制到系统剪贴板
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    use copypasta::{ClipboardContext, ClipboardProvider};
    let mut ctx = ClipboardContext::new().map_err(|e| ClipboardError::Clip(e.to_string()))?;
    ctx.set_contents(text.to_string())
        .map_err(|e| ClipboardError::Clip(e.to_string()))
}

/// 从系统剪贴板获取文本；空内容视为不可用
pub fn get_clipboard_contents() -> Result<String, ClipboardError> {
    use copypasta::{ClipboardContext, ClipboardProvider};
    let mut ctx = ClipboardContext::new().map_err(|e| ClipboardError::Clip(e.to_string()))?;
    let text = ctx
        .get_contents()
        .map_err(|e| ClipboardError::Clip(e.to_string()))?;
    if text.is_empty() {
        return Err(ClipboardError::Empty);
    }
    Ok(text)
}
