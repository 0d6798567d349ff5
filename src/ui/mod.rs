use crate::app_state::{App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use crate::form::{slots, summarize, FormEntry, FormState, Slot, WidgetKind};
use crate::schema::is_eligible;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    // 创建布局
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    // 中间内容区域（左侧菜单 + 主视图）
    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn focus_style(app: &App) -> Style {
    if app.focus_area == FocusArea::MainView {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn state_label(state: FormState) -> (&'static str, Color) {
    match state {
        FormState::Empty => ("未加载", Color::Gray),
        FormState::Ready => ("编辑中", Color::Yellow),
        FormState::Submitting => ("校验中", Color::Cyan),
        FormState::Accepted => ("已提交", Color::Green),
    }
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let title = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));

    let (state, color) = state_label(app.form.state());
    let app_title = app
        .schema
        .as_ref()
        .map(|s| s.title())
        .unwrap_or_else(|| "未加载应用".to_string());

    let title_text = Line::from(vec![
        Span::styled(
            " Podio 表单 ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" - {} ", app_title)),
        Span::styled(format!("[{}]", state), Style::default().fg(color)),
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(title)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = matches!(
                (i, &app.view_mode),
                (0, ViewMode::Form) | (1, ViewMode::Schema) | (2, ViewMode::Submission)
            );

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter 确认)"
    } else {
        "菜单 (Esc 切换)"
    };

    let menu =
        List::new(menu_items).block(Block::default().borders(Borders::ALL).title(title).style(
            if app.focus_area == FocusArea::Menu {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            },
        ));

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    match app.view_mode {
        ViewMode::Form => render_form(f, area, app),
        ViewMode::Schema => render_schema(f, area, app),
        ViewMode::Submission => render_submission(f, area, app),
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &mut App) {
    if app.form.entries().is_empty() {
        let hint = if app.form.state() == FormState::Empty {
            "尚未加载字段结构。输入 /fetch [app_id] [app_token] 或 /load <path>"
        } else {
            "该应用没有可显示的字段"
        };
        let paragraph = Paragraph::new(hint)
            .block(Block::default().borders(Borders::ALL).title("表单").style(focus_style(app)));
        f.render_widget(paragraph, area);
        return;
    }

    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let items: Vec<ListItem> = app
        .form
        .entries()
        .iter()
        .map(|entry| {
            let id = entry.external_id();
            let marker = if entry.rule.required { "*" } else { " " };
            let (value_text, value_color) = match &entry.widget.kind {
                WidgetKind::Unsupported { type_name } => {
                    (format!("[不支持: {}]", type_name), Color::DarkGray)
                }
                kind => (summarize(kind, app.form.value(id)), Color::Green),
            };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Red)),
                Span::raw(format!("{:<20} ", entry.widget.label)),
                Span::styled(value_text, Style::default().fg(value_color)),
            ];
            if let Some(err) = app.form.error_for(id) {
                spans.push(Span::styled(
                    format!("  ✗ {}", err),
                    Style::default().fg(Color::Red),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if app.focus_area == FocusArea::MainView {
        format!(
            "字段 ({}/{}) (↑↓ 选择, s 提交, Esc 菜单)",
            app.field_index + 1,
            app.form.entries().len()
        )
    } else {
        "字段".to_string()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title).style(focus_style(app)))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    app.field_list_state.select(Some(app.field_index));
    f.render_stateful_widget(list, chunks[0], &mut app.field_list_state);

    let view: &App = app;
    let detail = view
        .current_entry()
        .map(|entry| field_detail_lines(view, entry))
        .unwrap_or_default();
    let paragraph = Paragraph::new(detail)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("控件 (Tab 子项, ←→ 选项, Space/Enter 选择或编辑, Del 清空)")
                .style(focus_style(view)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, chunks[1]);
}

fn field_detail_lines<'a>(app: &'a App, entry: &'a FormEntry) -> Vec<Line<'a>> {
    let id = entry.external_id();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("字段: ", bold),
            Span::styled(entry.widget.label.as_str(), Style::default().fg(Color::Cyan)),
            Span::raw(format!("  ({})", id)),
        ]),
        Line::from(vec![
            Span::styled("类型: ", bold),
            Span::raw(entry.field.field_type().to_string()),
            Span::raw(if entry.rule.required { "  必填" } else { "" }),
        ]),
    ];
    if let Some(desc) = entry.field.config.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::from(vec![Span::styled("说明: ", bold), Span::raw(desc)]));
    }
    lines.push(Line::from(""));

    let value = app.form.value(id);
    let current_slot = app.current_slot();
    let selected = Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD);

    match &entry.widget.kind {
        WidgetKind::SingleSelect { choices, .. } | WidgetKind::MultiSelect { choices, .. } => {
            let multi = matches!(entry.widget.kind, WidgetKind::MultiSelect { .. });
            if choices.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("{}（无可选项）", entry.widget.placeholder),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for (i, c) in choices.iter().enumerate() {
                let checked = match value {
                    Some(serde_json::Value::Array(ids)) => {
                        ids.iter().any(|v| v.as_str() == Some(c.value.as_str()))
                    }
                    Some(v) => v.as_str() == Some(c.value.as_str()),
                    None => false,
                };
                let mark = match (multi, checked) {
                    (true, true) => "[x]",
                    (true, false) => "[ ]",
                    (false, true) => "(•)",
                    (false, false) => "( )",
                };
                let style = if i == app.choice_cursor {
                    selected
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(format!("{} {}", mark, c.label), style)));
            }
        }
        WidgetKind::Slider { min, max, .. } => {
            let n = value.and_then(|v| v.as_f64()).unwrap_or(*min as f64);
            let width = 30usize;
            let span = (*max as f64 - *min as f64).max(1.0);
            let filled = (((n - *min as f64) / span) * width as f64)
                .round()
                .clamp(0.0, width as f64) as usize;
            lines.push(Line::from(format!(
                "[{}{}] {}",
                "█".repeat(filled),
                "░".repeat(width - filled),
                summarize(&entry.widget.kind, value)
            )));
        }
        WidgetKind::Unsupported { type_name } => {
            lines.push(Line::from(Span::styled(
                format!("⚠ 字段类型 {} 暂不支持，提交时忽略", type_name),
                Style::default().fg(Color::Yellow),
            )));
        }
        kind => {
            if let WidgetKind::CurrencyPair { currencies } = kind {
                let row: Vec<Span> = currencies
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let style = if current_slot == Slot::Currency && i == app.choice_cursor {
                            selected
                        } else {
                            Style::default()
                        };
                        Span::styled(format!(" {} ", c), style)
                    })
                    .collect();
                lines.push(Line::from(row));
            }
            for slot in slots(kind) {
                if slot == Slot::Currency {
                    continue;
                }
                let editing = app.input_mode == InputMode::Editing && slot == current_slot;
                let text = if editing {
                    let cur = app.edit_cursor.min(app.edit_buffer.chars().count());
                    let (left, right): (String, String) = (
                        app.edit_buffer.chars().take(cur).collect(),
                        app.edit_buffer.chars().skip(cur).collect(),
                    );
                    format!("{}_{}", left, right)
                } else {
                    let t = crate::form::slot_text(value, slot);
                    if t.is_empty() {
                        entry.widget.placeholder.clone()
                    } else {
                        t
                    }
                };
                let label = match slot {
                    Slot::Whole => "值".to_string(),
                    other => other.label().to_string(),
                };
                let style = if editing {
                    Style::default().fg(Color::Green)
                } else if slot == current_slot {
                    Style::default().add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", label), bold),
                    Span::styled(text, style),
                ]));
            }
            if let WidgetKind::FilePicker { accept } = kind {
                if !accept.is_empty() {
                    lines.push(Line::from(format!("允许类型: {}", accept.join(", "))));
                }
            }
        }
    }

    if let Some(err) = app.form.error_for(id) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("✗ {}", err),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

fn render_schema(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    match &app.schema {
        None => lines.push(Line::from("尚未加载字段结构")),
        Some(schema) => {
            lines.push(Line::from(vec![Span::styled(
                format!("--- {} ---", schema.title()),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )]));
            lines.push(Line::from(""));
            for field in &schema.fields {
                let eligible = is_eligible(field);
                let (mark, color) = if eligible {
                    ("✓", Color::Green)
                } else {
                    ("·", Color::DarkGray)
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{} ", mark), Style::default().fg(color)),
                    Span::styled(
                        format!("{:<24}", field.external_id),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("{:<12}", field.field_type().to_string())),
                    Span::raw(format!(
                        "status={:?} visible={} hidden={} required={}",
                        field.status,
                        field.config.visible,
                        field.config.hidden,
                        field.config.required
                    )),
                ]));
            }
        }
    }

    let title = if app.focus_area == FocusArea::MainView {
        "字段结构 (↑↓ 滚动, ← 切换菜单)"
    } else {
        "字段结构"
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title).style(focus_style(app)))
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_submission(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = match &app.last_submission {
        None => vec![Line::from("暂无提交记录")],
        Some(record) => serde_json::to_string_pretty(&record.to_json())
            .unwrap_or_default()
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect(),
    };

    let title = if app.focus_area == FocusArea::MainView {
        "提交结果 (↑↓ 滚动, ← 切换菜单)"
    } else {
        "提交结果"
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title).style(focus_style(app)))
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    // 命令输入区域
    let command_prompt = match app.input_mode {
        InputMode::Command => {
            let mut spans = vec![Span::styled(
                "命令: ",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )];
            let cur = App::byte_index(&app.command_input, app.command_cursor);
            let (left, right) = app.command_input.split_at(cur);
            spans.push(Span::raw(left));
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(right));

            // 如果有建议，添加浅灰色幽灵文本
            if let Some(hint) = app.get_completion_hint() {
                spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
            }

            vec![
                Line::from(spans),
                Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
            ]
        }
        InputMode::Editing => vec![
            Line::from(vec![
                Span::styled("编辑: ", Style::default().fg(Color::Green)),
                Span::raw(app.current_slot().label()),
            ]),
            Line::from("Enter确认 Esc取消 ←→光标 Home/End"),
        ],
        InputMode::Normal => vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式)"),
            ]),
            Line::from("/命令 ↑↓字段 Tab子项 ←→选项 Space/Enter选择 Del清空 s提交 Esc菜单 q退出"),
        ],
    };
    let (title, style) = match app.input_mode {
        InputMode::Command => ("命令输入模式", Style::default().fg(Color::Green)),
        InputMode::Editing => ("字段编辑", Style::default().fg(Color::Green)),
        InputMode::Normal => ("命令输入", Style::default().fg(Color::White)),
    };
    let command_paragraph = Paragraph::new(command_prompt)
        .block(Block::default().borders(Borders::ALL).title(title).style(style));
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 日志区域：最新的在顶部，最多 20 条
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
