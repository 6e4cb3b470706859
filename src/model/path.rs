//! 路径寻址：由对象键 / 数组下标组成的有序序列，空路径表示文档根

use std::fmt;

/// 路径中的单个段
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Seg {
    /// 对象成员键
    Key(String),
    /// 数组下标
    Index(usize),
}

impl Seg {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, "{:?}", k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Seg {
    fn from(k: &str) -> Self {
        Seg::Key(k.to_owned())
    }
}

impl From<String> for Seg {
    fn from(k: String) -> Self {
        Seg::Key(k)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// 文档内的绝对路径
///
/// 路径是不可变值：`child` / `parent` 都返回新路径。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// 根路径（空序列）
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// 追加一段，返回子路径
    pub fn child(&self, seg: impl Into<Seg>) -> Path {
        let mut segs = Vec::with_capacity(self.0.len() + 1);
        segs.extend_from_slice(&self.0);
        segs.push(seg.into());
        Path(segs)
    }

    /// 父路径；根没有父路径
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Path(rest.to_vec())),
            None => None,
        }
    }

    /// 最后一段；根没有最后一段
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// 从根到自身的所有前缀（含根与自身）
    pub fn ancestors_inclusive(&self) -> Vec<Path> {
        (0..=self.0.len())
            .map(|n| Path(self.0[..n].to_vec()))
            .collect()
    }

    /// RFC 9535 风格的 JSONPath 字符串，用于树节点展示
    pub fn to_json_path(&self) -> String {
        let mut out = String::from("$");
        for seg in &self.0 {
            match seg {
                // JSONPath 字段含特殊字符时使用 bracket-notation
                Seg::Key(k) if !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                    out.push('.');
                    out.push_str(k);
                }
                Seg::Key(k) => {
                    out.push_str(&format!("['{}']", k.replace('\'', "\\'")));
                }
                Seg::Index(i) => out.push_str(&format!("[{}]", i)),
            }
        }
        out
    }
}

/// 状态栏格式：`["a", 0]`，根为 `[]`
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", seg)?;
        }
        f.write_str("]")
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segs: Vec<Seg>) -> Self {
        Path(segs)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

/// 简写构造：`path!["a", 0usize, "b"]`
#[macro_export]
macro_rules! path {
    () => { $crate::model::path::Path::root() };
    ($($seg:expr),+ $(,)?) => {
        $crate::model::path::Path::from(vec![$($crate::model::path::Seg::from($seg)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_and_last() {
        let p = Path::root().child("a").child(2usize);
        assert_eq!(p.parent(), Some(Path::root().child("a")));
        assert_eq!(p.last(), Some(&Seg::Index(2)));
        assert_eq!(Path::root().parent(), None, "根没有父路径");
        assert_eq!(Path::root().last(), None);
    }

    #[test]
    fn test_display_status_format() {
        assert_eq!(Path::root().to_string(), "[]");
        let p = Path::root().child("user").child(0usize);
        assert_eq!(p.to_string(), "[\"user\", 0]");
    }

    #[test]
    fn test_json_path_rendering() {
        assert_eq!(Path::root().to_json_path(), "$");
        let p = Path::root().child("items").child(1usize).child("id");
        assert_eq!(p.to_json_path(), "$.items[1].id");
        let q = Path::root().child("key with spaces").child("it's");
        assert_eq!(q.to_json_path(), "$['key with spaces']['it\\'s']");
    }

    #[test]
    fn test_ancestors_inclusive() {
        let p = Path::root().child("a").child(0usize);
        let all = p.ancestors_inclusive();
        assert_eq!(all.len(), 3);
        assert!(all[0].is_root());
        assert_eq!(all[2], p);
    }

    #[test]
    fn test_path_macro() {
        let p = crate::path!["a", 1usize];
        assert_eq!(p, Path::root().child("a").child(1usize));
        assert!(crate::path![].is_root());
    }
}
