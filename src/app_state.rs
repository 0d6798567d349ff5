use crate::commands::AppCommand;
use crate::form::{
    is_text_entry, slot_text, slots, text_to_value, FormEntry, FormError, FormSession, FormState,
    FormValues, Slot, Submission, WidgetKind,
};
use crate::schema::AppSchema;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone)]
pub enum ViewMode {
    Form,
    Schema,
    Submission,
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
    /// 正在编辑当前字段的文本
    Editing,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Schema(AppSchema),
}

pub const MENU_ITEMS: [&str; 3] = ["表单", "字段结构", "提交结果"];

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub form: FormSession,
    pub schema: Option<AppSchema>,
    pub field_index: usize,
    pub field_list_state: ListState,
    pub slot_index: usize,
    pub choice_cursor: usize,
    pub edit_buffer: String,
    pub edit_cursor: usize,
    pub last_submission: Option<FormValues>,
    pub detail_scroll: u16,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        App {
            view_mode: ViewMode::Form,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::MainView,
            menu_selected_index: 0,
            form: FormSession::new(),
            schema: None,
            field_index: 0,
            field_list_state: {
                let mut s = ListState::default();
                s.select(Some(0));
                s
            },
            slot_index: 0,
            choice_cursor: 0,
            edit_buffer: String::new(),
            edit_cursor: 0,
            last_submission: None,
            detail_scroll: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.add_log(msg)
            }
            AppEvent::Schema(schema) => self.apply_schema(schema),
        }
    }

    /// 用新的字段结构重建表单
    pub fn apply_schema(&mut self, schema: AppSchema) {
        let title = schema.title();
        match self.form.load(&schema.fields) {
            Ok(warnings) => {
                for w in warnings {
                    self.add_log(format!("⚠ {}", w));
                }
                self.add_log(format!(
                    "✓ 表单已生成: {}（{} 个控件）",
                    title,
                    self.form.entries().len()
                ));
            }
            Err(e) => {
                self.add_log(format!("✗ 字段结构无效: {}", e));
            }
        }
        self.schema = Some(schema);
        self.last_submission = None;
        self.select_field(0);
        self.view_mode = ViewMode::Form;
        self.menu_selected_index = 0;
    }

    pub fn current_entry(&self) -> Option<&FormEntry> {
        self.form.entries().get(self.field_index)
    }

    pub fn current_slot(&self) -> Slot {
        self.current_entry()
            .and_then(|e| slots(&e.widget.kind).get(self.slot_index).copied())
            .unwrap_or(Slot::Whole)
    }

    fn select_field(&mut self, index: usize) {
        let len = self.form.entries().len();
        self.field_index = if len == 0 { 0 } else { index.min(len - 1) };
        self.slot_index = 0;
        self.choice_cursor = 0;
        self.detail_scroll = 0;
        self.field_list_state.select(Some(self.field_index));
    }

    /// 当前位置上可左右切换的值（选项 id 或币种）
    pub fn slot_choices(&self) -> Vec<String> {
        let Some(entry) = self.current_entry() else {
            return Vec::new();
        };
        match &entry.widget.kind {
            WidgetKind::SingleSelect { choices, .. } | WidgetKind::MultiSelect { choices, .. } => {
                choices.iter().map(|c| c.value.clone()).collect()
            }
            WidgetKind::CurrencyPair { currencies } if self.current_slot() == Slot::Currency => {
                currencies.clone()
            }
            _ => Vec::new(),
        }
    }

    fn report(&mut self, result: Result<(), FormError>) {
        if let Err(e) = result {
            let hint = match e {
                FormError::NotEditable(FormState::Accepted) => "（使用 reset 重新开始）",
                FormError::NotEditable(FormState::Empty) => "（先使用 fetch 或 load 加载字段结构）",
                _ => "",
            };
            self.add_log(format!("✗ {}{}", e, hint));
        }
    }

    pub fn submit_form(&mut self) {
        let mut accepted = None;
        match self.form.submit(|record| accepted = Some(record)) {
            Ok(Submission::Accepted) => {
                let n = accepted.as_ref().map(FormValues::len).unwrap_or(0);
                self.last_submission = accepted;
                self.view_mode = ViewMode::Submission;
                self.menu_selected_index = 2;
                self.detail_scroll = 0;
                self.add_log(format!("✓ 提交成功，共 {} 个字段值", n));
            }
            Ok(Submission::Rejected(errors)) => {
                self.add_log(format!("✗ 提交失败：{} 个字段未通过校验", errors.len()));
                let first = self
                    .form
                    .entries()
                    .iter()
                    .position(|e| errors.contains_key(e.external_id()));
                if let Some(idx) = first {
                    self.select_field(idx);
                }
            }
            Err(e) => self.report(Err(e)),
        }
    }

    pub fn reset_form(&mut self) {
        if self.form.state() == FormState::Empty {
            self.add_log("表单为空，无需重置".to_string());
            return;
        }
        self.form.reset();
        self.select_field(self.field_index);
        self.add_log("表单已重置".to_string());
    }

    /// 执行命令，返回是否退出
    pub fn execute_command(&mut self, cmd: AppCommand) -> bool {
        if cmd.is_background() {
            let _ = self.cmd_tx.send(cmd);
            return false;
        }
        match cmd {
            AppCommand::Submit => self.submit_form(),
            AppCommand::Reset => self.reset_form(),
            AppCommand::Quit => return true,
            _ => {}
        }
        false
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = ["fetch", "load", "submit", "reset", "help", "quit"];
        let input = self.command_input.trim();
        if input.is_empty() || input.contains(' ') {
            return None;
        }
        commands
            .iter()
            .find(|cmd| cmd.starts_with(input) && **cmd != input)
            .map(|cmd| cmd[input.len()..].to_string())
    }

    fn move_choice(&mut self, forward: bool) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        if let WidgetKind::Slider { min, max, step } = entry.widget.kind {
            let id = entry.external_id().to_string();
            let current = self
                .form
                .value(&id)
                .and_then(Value::as_i64)
                .unwrap_or(min as i64);
            let next = if forward {
                (current + step as i64).min(max as i64)
            } else {
                (current - step as i64).max(min as i64)
            };
            let result = self.form.set_value(&id, Value::from(next));
            self.report(result);
            return;
        }

        let count = self.slot_choices().len();
        if count == 0 {
            return;
        }
        self.choice_cursor = if forward {
            (self.choice_cursor + 1) % count
        } else {
            (self.choice_cursor + count - 1) % count
        };
    }

    /// 在当前字段上按下 Enter / Space
    fn activate(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        let id = entry.external_id().to_string();
        let kind = entry.widget.kind.clone();
        let slot = self.current_slot();
        let choice = self.slot_choices().get(self.choice_cursor).cloned();

        match &kind {
            WidgetKind::Unsupported { type_name } => {
                self.add_log(format!("字段 {} 的类型 {} 暂不支持编辑", id, type_name));
            }
            WidgetKind::SingleSelect { .. } | WidgetKind::MultiSelect { .. } if choice.is_none() => {
                self.add_log(format!("字段 {} 没有可选项", id));
            }
            WidgetKind::SingleSelect { .. } => {
                if let Some(c) = choice {
                    let result = self.form.set_value(&id, Value::String(c));
                    self.report(result);
                }
            }
            WidgetKind::MultiSelect { .. } => {
                if let Some(c) = choice {
                    let result = self.form.toggle_option(&id, &c).map(|_| ());
                    self.report(result);
                }
            }
            WidgetKind::CurrencyPair { .. } if slot == Slot::Currency => match choice {
                Some(c) => {
                    let result = self.form.set_part(&id, "currency", Value::String(c));
                    self.report(result);
                }
                None => self.add_log(format!("字段 {} 没有可用币种", id)),
            },
            _ if is_text_entry(&kind, slot) => {
                if self.form.state() != FormState::Ready {
                    self.report(Err(FormError::NotEditable(self.form.state())));
                    return;
                }
                self.edit_buffer = slot_text(self.form.value(&id), slot);
                self.edit_cursor = self.edit_buffer.chars().count();
                self.input_mode = InputMode::Editing;
            }
            _ => {}
        }
    }

    fn commit_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(entry) = self.current_entry() else {
            return;
        };
        let id = entry.external_id().to_string();
        let slot = self.current_slot();
        let value = text_to_value(&entry.widget.kind, slot, &self.edit_buffer);
        let result = match slot.key() {
            Some(key) => self.form.set_part(&id, key, value),
            None => self.form.set_value(&id, value),
        };
        self.report(result);
        self.edit_buffer.clear();
        self.edit_cursor = 0;
    }

    fn clear_current(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        let id = entry.external_id().to_string();
        let slot = self.current_slot();
        let result = match slot.key() {
            Some(key) => self.form.set_part(&id, key, Value::Null),
            None => self.form.clear_value(&id),
        };
        self.report(result);
    }

    /// 光标按字符计数，这里换算成字节下标
    pub fn byte_index(s: &str, char_idx: usize) -> usize {
        s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
    }

    fn handle_editing_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.commit_edit(),
            KeyCode::Esc => {
                self.edit_buffer.clear();
                self.edit_cursor = 0;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                if self.edit_cursor > 0 {
                    let idx = Self::byte_index(&self.edit_buffer, self.edit_cursor - 1);
                    self.edit_buffer.remove(idx);
                    self.edit_cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.edit_cursor < self.edit_buffer.chars().count() {
                    let idx = Self::byte_index(&self.edit_buffer, self.edit_cursor);
                    self.edit_buffer.remove(idx);
                }
            }
            KeyCode::Left => self.edit_cursor = self.edit_cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.edit_cursor < self.edit_buffer.chars().count() {
                    self.edit_cursor += 1;
                }
            }
            KeyCode::Home => self.edit_cursor = 0,
            KeyCode::End => self.edit_cursor = self.edit_buffer.chars().count(),
            KeyCode::Char(c) => {
                let idx = Self::byte_index(&self.edit_buffer, self.edit_cursor);
                self.edit_buffer.insert(idx, c);
                self.edit_cursor += 1;
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => {
                let cmd_owned = self.command_input.trim().to_string();
                self.command_input.clear();
                self.command_cursor = 0;
                self.input_mode = InputMode::Normal;
                if cmd_owned.is_empty() {
                    return false;
                }
                let app_cmd = AppCommand::from_str(&cmd_owned)
                    .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));
                self.command_history.push(cmd_owned);
                self.command_history_index = None;
                return self.execute_command(app_cmd);
            }
            KeyCode::Esc => {
                self.command_input.clear();
                self.command_cursor = 0;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Tab => {
                if let Some(hint) = self.get_completion_hint() {
                    let insert = format!("{} ", hint);
                    let idx = Self::byte_index(&self.command_input, self.command_cursor);
                    self.command_input.insert_str(idx, &insert);
                    self.command_cursor += insert.chars().count();
                }
            }
            KeyCode::Up => {
                if self.command_history.is_empty() {
                    return false;
                }
                let next = match self.command_history_index {
                    None => self.command_history.len().saturating_sub(1),
                    Some(i) => i.saturating_sub(1),
                };
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_input.chars().count();
                }
            }
            KeyCode::Down => {
                let Some(i) = self.command_history_index else {
                    return false;
                };
                let n = i + 1;
                if n >= self.command_history.len() {
                    self.command_history_index = None;
                    self.command_input.clear();
                    self.command_cursor = 0;
                    return false;
                }
                self.command_history_index = Some(n);
                self.command_input = self.command_history[n].clone();
                self.command_cursor = self.command_input.chars().count();
            }
            KeyCode::Backspace => {
                if self.command_cursor > 0 {
                    let idx = Self::byte_index(&self.command_input, self.command_cursor - 1);
                    self.command_input.remove(idx);
                    self.command_cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.command_cursor < self.command_input.chars().count() {
                    let idx = Self::byte_index(&self.command_input, self.command_cursor);
                    self.command_input.remove(idx);
                }
            }
            KeyCode::Left => self.command_cursor = self.command_cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.command_cursor < self.command_input.chars().count() {
                    self.command_cursor += 1;
                }
            }
            KeyCode::Home => self.command_cursor = 0,
            KeyCode::End => self.command_cursor = self.command_input.chars().count(),
            KeyCode::Char(c) => {
                let idx = Self::byte_index(&self.command_input, self.command_cursor);
                self.command_input.insert(idx, c);
                self.command_cursor += 1;
            }
            _ => {}
        }
        false
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        match self.input_mode {
            InputMode::Command => return self.handle_command_key(key),
            InputMode::Editing => {
                self.handle_editing_key(key);
                return false;
            }
            InputMode::Normal => {}
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::Esc => {
                self.focus_area = FocusArea::Menu;
                false
            }
            _ if self.focus_area == FocusArea::Menu => {
                self.handle_menu_key(key);
                false
            }
            _ => {
                self.handle_main_key(key);
                false
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up => self.menu_selected_index = self.menu_selected_index.saturating_sub(1),
            KeyCode::Down => {
                if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                    self.menu_selected_index += 1;
                }
            }
            KeyCode::Right | KeyCode::Enter => {
                self.view_mode = match self.menu_selected_index {
                    0 => ViewMode::Form,
                    1 => ViewMode::Schema,
                    _ => ViewMode::Submission,
                };
                self.detail_scroll = 0;
                // 确认后自动切换焦点到主视图
                self.focus_area = FocusArea::MainView;
            }
            _ => {}
        }
    }

    fn handle_main_key(&mut self, key: KeyCode) {
        if self.view_mode != ViewMode::Form {
            match key {
                KeyCode::Up => self.detail_scroll = self.detail_scroll.saturating_sub(1),
                KeyCode::Down => self.detail_scroll = self.detail_scroll.saturating_add(1),
                KeyCode::Left => self.focus_area = FocusArea::Menu,
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Up => self.select_field(self.field_index.saturating_sub(1)),
            KeyCode::Down => self.select_field(self.field_index + 1),
            KeyCode::Tab => {
                if let Some(entry) = self.current_entry() {
                    let n = slots(&entry.widget.kind).len().max(1);
                    self.slot_index = (self.slot_index + 1) % n;
                    self.choice_cursor = 0;
                }
            }
            KeyCode::Left => self.move_choice(false),
            KeyCode::Right => self.move_choice(true),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(),
            KeyCode::Delete | KeyCode::Backspace => self.clear_current(),
            KeyCode::Char('s') => self.submit_form(),
            _ => {}
        }
    }
}
