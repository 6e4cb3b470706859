//! 程序入口：初始化日志，运行基于终端的 JSON 树编辑器

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

use json_tree_editor::model::shadow_tree::NodeKind;
use json_tree_editor::utils::clipboard::SystemClipboard;
use json_tree_editor::vm::sync::CursorPolicy;
use json_tree_editor::{CopyFormat, Editor, Prompter, View, ViewCommand};

/// 日志级别环境变量（error|warn|info|debug|trace）
const LOG_ENV: &str = "JSON_TREE_EDITOR_LOG";

/// 提示中输入该值表示取消
const CANCEL_INPUT: &str = ":c";

const HELP_TEXT: &str = "\
JSON Tree Editor: browse a JSON document as a tree and edit any node as text.

LOADING
  open <file>          open a JSON file (root must be an object or array)
  reload               re-read the current file, discarding edits
  paste                create a document from the clipboard

NAVIGATING
  tree                 list visible nodes with their numbers
  sel <n>              select node n; its JSON appears in the text pane
  toggle <n>           expand or collapse node n
  show                 print the text pane

EDITING TEXT
  edit                 replace the text pane (finish with a line containing only '.')
  apply                commit the text pane into the selected node

  Text edits are NOT applied until you run 'apply'.
  Selecting another node without applying discards them.

STRUCTURE (object members and array elements only)
  raise / lower        move the selection up or down among its siblings
  insert               insert null after the selection (objects ask for a key)
  dup                  duplicate the selection after itself
  rename               rename the selected object key
  delete               delete the selection

SEARCH
  find                 search for a key name
  next                 jump to the next match

EXPORT
  copy / copy-compact            copy the whole document
  copy-node / copy-node-compact  copy the selected node
  save                           write the document to disk

  help, quit. At any prompt, enter ':c' to cancel.";

/// 终端视图：把视图命令打印到标准输出，并保存文本面板内容
#[derive(Default)]
struct TerminalView {
    text: String,
    modified: bool,
    status_path: String,
    dirty: bool,
    validity: String,
    error: String,
}

impl TerminalView {
    fn print_text(&self) {
        println!("----- text -----");
        println!("{}", self.text);
        println!("----------------");
    }

    fn print_status(&self) {
        let dirty = if self.dirty { " *" } else { "" };
        if self.error.is_empty() {
            println!("{}{} | {}", self.status_path, dirty, self.validity);
        } else {
            println!("{}{} | {} | {}", self.status_path, dirty, self.validity, self.error);
        }
    }
}

impl View for TerminalView {
    fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::RebuildTree { nodes } => println!("(tree rebuilt: {} nodes)", nodes.len()),
            ViewCommand::SyncSelection { .. } => {}
            ViewCommand::RefreshTextPane { text, cursor } => {
                self.text = text;
                self.modified = false;
                self.print_text();
                if cursor == CursorPolicy::SelectAll {
                    println!("(type 'edit' to replace the new value)");
                }
            }
            ViewCommand::RefreshMenuEnablement { enabled } => {
                tracing::debug!("可用编辑菜单: {:?}", enabled);
            }
            ViewCommand::UpdateTitle(title) => println!("== {} ==", title),
            ViewCommand::UpdateStatusPath(path) => self.status_path = path,
            ViewCommand::UpdateDirtyIndicator(dirty) => self.dirty = dirty,
            ViewCommand::UpdateStatusLabels { validity, error } => {
                self.validity = validity;
                self.error = error;
            }
        }
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn text_modified(&self) -> bool {
        self.modified
    }
}

/// 读一行；EOF 或读取失败返回 `None`
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    if let Err(e) = io::stdout().flush() {
        tracing::warn!("刷新标准输出失败: {}", e);
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(e) => {
            tracing::warn!("读取标准输入失败: {}", e);
            None
        }
    }
}

/// 基于标准输入的提示协作者
struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask_string(&mut self, title: &str, message: &str, initial: &str) -> Option<String> {
        let prompt = match (message.is_empty(), initial.is_empty()) {
            (true, true) => format!("{} ", title),
            (true, false) => format!("{} [{}] ", title, initial),
            (false, true) => format!("{} {} ", title, message),
            (false, false) => format!("{} {} [{}] ", title, message, initial),
        };
        let answer = read_line(&prompt)?;
        if answer == CANCEL_INPUT {
            return None;
        }
        if answer.is_empty() && !initial.is_empty() {
            return Some(initial.to_string());
        }
        Some(answer)
    }

    fn ask_yes_no(&mut self, title: &str, message: &str) -> bool {
        read_line(&format!("{}: {} [y/N] ", title, message))
            .is_some_and(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn ask_save_path(&mut self) -> Option<PathBuf> {
        let answer = self.ask_string("Save JSON", "file path:", "")?;
        let answer = answer.trim();
        if answer.is_empty() {
            None
        } else {
            Some(PathBuf::from(answer))
        }
    }

    fn show_error(&mut self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }
}

type TerminalEditor = Editor<TerminalView, StdinPrompter, SystemClipboard>;

fn print_tree(editor: &TerminalEditor) {
    let selected = editor.state().selected_path.as_ref();
    for (i, node) in editor.tree().visible_nodes().iter().enumerate() {
        let marker = match node.kind {
            NodeKind::Object | NodeKind::Array if node.children > 0 => {
                if node.expanded {
                    "-"
                } else {
                    "+"
                }
            }
            _ => " ",
        };
        let cursor = if selected == Some(&node.path) { ">" } else { " " };
        println!("{:>4}{} {}{} {}", i, cursor, "  ".repeat(node.depth as usize), marker, node.label);
    }
}

/// 按可见列表中的编号找到节点路径
fn visible_path(editor: &TerminalEditor, arg: &str) -> Option<json_tree_editor::Path> {
    let n: usize = arg.trim().parse().ok()?;
    editor.tree().visible_nodes().get(n).map(|node| node.path.clone())
}

/// 多行输入，以单独一行 `.` 结束
fn read_block() -> Option<String> {
    println!("(enter text, finish with a line containing only '.')");
    let mut lines = Vec::new();
    loop {
        let line = read_line("")?;
        if line == "." {
            break;
        }
        lines.push(line);
    }
    Some(lines.join("\n"))
}

fn main() -> Result<()> {
    // 初始化日志输出，写到 stderr 避免与视图输出混在一起
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_writer(io::stderr)
        .try_init();

    let mut editor = Editor::new(TerminalView::default(), StdinPrompter, SystemClipboard);
    tracing::info!("编辑器启动成功");

    if let Some(arg) = std::env::args_os().nth(1) {
        // 启动时打开失败只提示，不退出
        let _ = editor.open_file(&PathBuf::from(arg));
    }
    println!("type 'help' for commands");

    let stdin = io::stdin();
    loop {
        editor.view().print_status();
        print!("> ");
        io::stdout().flush().context("写入标准输出失败")?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("读取标准输入失败")? == 0 {
            break;
        }
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

        // 各命令的失败已通过提示协作者报告
        let _ = match cmd {
            "" => Ok(()),
            "help" => {
                println!("{}", HELP_TEXT);
                Ok(())
            }
            "quit" | "exit" => break,
            "open" => editor.open_file(&PathBuf::from(arg.trim())),
            "reload" => editor.reload(),
            "save" => editor.save(),
            "paste" => editor.create_from_clipboard(),
            "copy" => editor.copy_document(CopyFormat::Pretty),
            "copy-compact" => editor.copy_document(CopyFormat::Compact),
            "copy-node" => editor.copy_node(CopyFormat::Pretty),
            "copy-node-compact" => editor.copy_node(CopyFormat::Compact),
            "tree" => {
                print_tree(&editor);
                Ok(())
            }
            "sel" => match visible_path(&editor, arg) {
                Some(path) => editor.select_path(path),
                None => {
                    println!("no visible node '{}'", arg);
                    Ok(())
                }
            },
            "toggle" => match visible_path(&editor, arg) {
                Some(path) => {
                    let result = editor.toggle_expanded(&path);
                    print_tree(&editor);
                    result
                }
                None => {
                    println!("no visible node '{}'", arg);
                    Ok(())
                }
            },
            "show" => {
                editor.view().print_text();
                Ok(())
            }
            "edit" => {
                if let Some(text) = read_block() {
                    let view = editor.view_mut();
                    view.text = text;
                    view.modified = true;
                    editor.note_text_modified();
                }
                Ok(())
            }
            "apply" => editor.apply_text(),
            "raise" => editor.raise(),
            "lower" => editor.lower(),
            "insert" => editor.insert_after(),
            "dup" => editor.duplicate(),
            "rename" => editor.rename(),
            "delete" => editor.delete(),
            "find" => editor.find(),
            "next" => {
                editor.repeat_find();
                Ok(())
            }
            other => {
                println!("unknown command '{}', type 'help'", other);
                Ok(())
            }
        };
    }

    if editor.state().dirty {
        tracing::warn!("退出时仍有未保存的修改");
    }
    Ok(())
}
