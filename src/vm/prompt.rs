//! 提示协作者：向用户询问字符串、确认、保存路径，以及显示错误

use std::path::PathBuf;

pub const ERROR_KEY_EMPTY: &str = "Key must be non-empty.";
pub const TITLE_FIND: &str = "Search for:";

pub trait Prompter {
    /// 询问一行文本；取消返回 `None`
    fn ask_string(&mut self, title: &str, message: &str, initial: &str) -> Option<String>;

    fn ask_yes_no(&mut self, title: &str, message: &str) -> bool;

    /// 文档没有来源文件时询问保存位置
    fn ask_save_path(&mut self) -> Option<PathBuf>;

    fn show_error(&mut self, title: &str, message: &str);

    /// 询问非空字符串（去除首尾空白），空输入提示后重新询问
    fn ask_non_empty_string(&mut self, title: &str, message: &str) -> Option<String> {
        loop {
            let answer = self.ask_string(title, message, "")?;
            let answer = answer.trim();
            if answer.is_empty() {
                self.show_error(title, ERROR_KEY_EMPTY);
                continue;
            }
            return Some(answer.to_string());
        }
    }

    /// 询问查找词，以上一次的查找词为默认值
    fn ask_search_term(&mut self, previous: &str) -> Option<String> {
        self.ask_string(TITLE_FIND, "", previous)
    }
}
