mod app_service;
mod app_state;
mod commands;
mod form;
mod schema;
mod session;
mod ui;

use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::handle_command;
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::session::{PodioSession, SchemaSource};
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 核心：重定向输出到文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("rustpodio", log::LevelFilter::Info)
        .init();

    let mut startup_info = Vec::new();

    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    startup_info.push(format!("当前工作目录: {}", current_dir.display()));

    // 加载环境变量
    match dotenv::dotenv() {
        Ok(path) => startup_info.push(format!("✓ 已加载 .env 文件: {}", path.display())),
        Err(_) => startup_info.push("⚠ 未找到 .env 文件，从系统环境变量读取".to_string()),
    }

    // 读取客户端凭据并创建 session
    let source: Option<Arc<dyn SchemaSource>> = match PodioSession::from_env() {
        Ok(sess) => {
            startup_info.push(format!("✓ Session 已创建: {}", sess));
            Some(Arc::new(sess))
        }
        Err(e) => {
            startup_info.push(format!("⚠ 无法创建 Podio Session: {}", e));
            startup_info.push("请在 .env 文件中设置以下变量:".to_string());
            startup_info.push("  PODIO_CLIENT_ID=...".to_string());
            startup_info.push("  PODIO_CLIENT_SECRET=...".to_string());
            startup_info.push("  PODIO_APP_ID=... / PODIO_APP_TOKEN=...（可选）".to_string());
            None
        }
    };

    // 创建核心 Channel (使用 AppCommand)
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 启动时自动加载：离线文件优先，其次是环境变量中的应用
    if let Ok(path) = std::env::var("PODIO_SCHEMA_FILE") {
        startup_info.push(format!("正在加载离线字段结构: {}", path));
        let _ = cmd_tx.send(AppCommand::Load { path });
    } else if source.is_some()
        && std::env::var("PODIO_APP_ID").is_ok()
        && std::env::var("PODIO_APP_TOKEN").is_ok()
    {
        let _ = cmd_tx.send(AppCommand::Fetch {
            app_id: None,
            app_token: None,
        });
    }

    // 启动单后台任务模型 (Actor)
    let evt_tx_bg = evt_tx.clone();
    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            handle_command(cmd, source.as_ref(), &evt_tx_bg).await;
        }
    });

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, cmd_tx, evt_rx);

    // 主循环
    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.handle_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
