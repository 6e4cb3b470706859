//! IO helper: 读取 JSON 文件与原子写回

use std::{
    fs,
    io::Write,
    path::Path,
};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::model::document::{parse_json_text, render_for_file};
use crate::model::error::EditorError;

/// 以 UTF-8 读取并解析 JSON 文件
pub fn read_json_file(p: &Path) -> Result<Value, EditorError> {
    let text = fs::read_to_string(p)?;
    Ok(parse_json_text(&text)?)
}

/// 原子写入文本：同目录临时文件写入并落盘后再替换目标
///
/// 失败时目标文件保持原样。
pub fn write_text_atomic(p: &Path, text: &str) -> Result<(), EditorError> {
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(p).map_err(|e| e.error)?;
    Ok(())
}

/// 将JSON数据保存到文件（2 空格缩进 + 结尾换行）
pub fn write_json_file(p: &Path, value: &Value) -> Result<(), EditorError> {
    write_text_atomic(p, &render_for_file(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_preserves_key_order() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("doc.json");
        let v = json!({"z": 1, "a": [true, null], "m": "文本"});

        write_json_file(&p, &v).unwrap();
        let text = fs::read_to_string(&p).unwrap();
        assert!(text.ends_with("}\n"), "应以换行结尾");
        assert!(text.starts_with("{\n  \"z\": 1,"), "应使用 2 空格缩进并保持键顺序");

        let back = read_json_file(&p).unwrap();
        assert_eq!(back, v);
        let keys: Vec<&String> = back.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("doc.json");
        fs::write(&p, "old contents").unwrap();
        write_text_atomic(&p, "new").unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "new");
        // 不应残留临时文件
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("missing").join("doc.json");
        assert!(matches!(write_text_atomic(&p, "x"), Err(EditorError::Io(_))));
        assert!(!p.exists());
    }

    #[test]
    fn test_read_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(read_json_file(&missing), Err(EditorError::Io(_))));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{\"a\": }").unwrap();
        match read_json_file(&bad) {
            Err(EditorError::Parse(e)) => assert_eq!(e.line, 1),
            other => panic!("应为解析错误: {:?}", other),
        }
    }
}
