use crate::app_state::AppEvent;
use crate::commands::AppCommand;
use crate::schema::AppSchema;
use crate::session::{AppAccess, SchemaSource};
use anyhow::Context;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const HELP_TEXT: &str = "可用命令: fetch [app_id] [app_token] | load <path> | submit | reset | help | quit  \
按键: ↑/↓ 选择字段 · Tab 切换子项 · ←/→ 切换选项 · Space/Enter 选择或编辑 · Del 清空 · s 提交";

/// 从 JSON 文件加载字段结构（完整 app 响应或 `{ "fields": [...] }`）
pub fn load_schema_file(path: impl AsRef<Path>) -> anyhow::Result<AppSchema> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("JSON 解析失败: {}", path.display()))?;
    let schema = AppSchema::from_json(&value)
        .with_context(|| format!("字段结构无效: {}", path.display()))?;
    Ok(schema)
}

pub async fn fetch_schema(
    source: &dyn SchemaSource,
    access: &AppAccess,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let _ = tx.send(AppEvent::Log(format!("正在获取应用 {} 的字段结构...", access.app_id)));
    match source.fetch_schema(access).await {
        Ok(schema) => {
            info!("fetched schema for app {}: {} fields", access.app_id, schema.fields.len());
            let _ = tx.send(AppEvent::Message(format!(
                "✓ 已获取 {}，共 {} 个字段",
                schema.title(),
                schema.fields.len()
            )));
            let _ = tx.send(AppEvent::Schema(schema));
        }
        Err(e) => {
            warn!("fetch schema for app {} failed: {}", access.app_id, e);
            let _ = tx.send(AppEvent::Error(format!("✗ 获取字段结构失败: {}", e)));
        }
    }
}

pub fn load_schema(path: &str, tx: &mpsc::UnboundedSender<AppEvent>) {
    match load_schema_file(path) {
        Ok(schema) => {
            info!("loaded schema from {}: {} fields", path, schema.fields.len());
            let _ = tx.send(AppEvent::Message(format!(
                "✓ 已加载 {}，共 {} 个字段",
                path,
                schema.fields.len()
            )));
            let _ = tx.send(AppEvent::Schema(schema));
        }
        Err(e) => {
            warn!("load schema {} failed: {:#}", path, e);
            let _ = tx.send(AppEvent::Error(format!("✗ {:#}", e)));
        }
    }
}

/// 后台任务处理单条命令
pub async fn handle_command(
    cmd: AppCommand,
    source: Option<&Arc<dyn SchemaSource>>,
    tx: &mpsc::UnboundedSender<AppEvent>,
) {
    match cmd {
        AppCommand::Fetch { app_id, app_token } => {
            let Some(source) = source else {
                let _ = tx.send(AppEvent::Error(
                    "无法获取：未配置 PODIO_CLIENT_ID / PODIO_CLIENT_SECRET".to_string(),
                ));
                return;
            };
            match AppAccess::resolve(app_id.as_deref(), app_token.as_deref()) {
                Ok(access) => fetch_schema(&**source, &access, tx).await,
                Err(e) => {
                    let _ = tx.send(AppEvent::Error(format!("无法获取：{}", e)));
                }
            }
        }
        AppCommand::Load { path } => load_schema(&path, tx),
        AppCommand::Help => {
            let _ = tx.send(AppEvent::Message(HELP_TEXT.to_string()));
        }
        AppCommand::Unknown(msg) => {
            let _ = tx.send(AppEvent::Error(msg));
        }
        AppCommand::Submit | AppCommand::Reset | AppCommand::Quit => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FetchError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;

    struct StubSource {
        result: Result<serde_json::Value, u16>,
    }

    #[async_trait]
    impl SchemaSource for StubSource {
        async fn fetch_schema(&self, access: &AppAccess) -> Result<AppSchema, FetchError> {
            match &self.result {
                Ok(v) => {
                    let mut schema = AppSchema::from_json(v)?;
                    schema.app_id = Some(access.app_id);
                    Ok(schema)
                }
                Err(status) => Err(FetchError::Status {
                    status: *status,
                    message: "boom".into(),
                }),
            }
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    fn app_json() -> serde_json::Value {
        json!({
            "config": {"name": "Leads"},
            "fields": [{
                "field_id": 1,
                "external_id": "title",
                "label": "Title",
                "type": "text",
                "status": "active",
                "config": {"visible": true, "settings": {}}
            }]
        })
    }

    #[tokio::test]
    async fn fetch_success_emits_schema() {
        let source: Arc<dyn SchemaSource> = Arc::new(StubSource {
            result: Ok(app_json()),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cmd = AppCommand::Fetch {
            app_id: Some("42".into()),
            app_token: Some("tok".into()),
        };
        handle_command(cmd, Some(&source), &tx).await;

        let events = drain(&mut rx);
        let schema = events.iter().find_map(|e| match e {
            AppEvent::Schema(s) => Some(s),
            _ => None,
        });
        let schema = schema.expect("schema event");
        assert_eq!(schema.app_id, Some(42));
        assert_eq!(schema.fields.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_reports_once() {
        let source: Arc<dyn SchemaSource> = Arc::new(StubSource { result: Err(500) });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cmd = AppCommand::Fetch {
            app_id: Some("1".into()),
            app_token: Some("t".into()),
        };
        handle_command(cmd, Some(&source), &tx).await;

        let events = drain(&mut rx);
        let errors = events
            .iter()
            .filter(|e| matches!(e, AppEvent::Error(_)))
            .count();
        assert_eq!(errors, 1);
        assert!(!events.iter().any(|e| matches!(e, AppEvent::Schema(_))));
    }

    #[tokio::test]
    async fn fetch_without_source_is_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cmd = AppCommand::Fetch {
            app_id: Some("1".into()),
            app_token: Some("t".into()),
        };
        handle_command(cmd, None, &tx).await;
        assert!(matches!(drain(&mut rx).as_slice(), [AppEvent::Error(_)]));
    }

    #[test]
    fn loads_schema_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", app_json()).unwrap();
        let schema = load_schema_file(file.path()).unwrap();
        assert_eq!(schema.name.as_deref(), Some("Leads"));
        assert_eq!(schema.fields[0].external_id, "title");
    }

    #[test]
    fn load_errors_carry_context() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = load_schema_file(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("读取文件失败"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"app_id": 1}"#).unwrap();
        let err = load_schema_file(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("字段结构无效"));
    }

    #[test]
    fn load_command_emits_error_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        load_schema("/definitely/not/here.json", &tx);
        assert!(matches!(drain(&mut rx).as_slice(), [AppEvent::Error(_)]));
    }
}
