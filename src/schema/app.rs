use serde_json::Value;

use super::error::SchemaError;
use super::model::Field;
use super::normalize::parse_fields;

/// 一个远端应用的字段结构（未过滤）
#[derive(Debug, Clone, PartialEq)]
pub struct AppSchema {
    pub app_id: Option<i64>,
    pub name: Option<String>,
    pub item_name: Option<String>,
    pub fields: Vec<Field>,
}

impl AppSchema {
    /// 解析应用详情响应
    ///
    /// 兼容三种形态：完整的 app 对象、`{ "data": app }` 包装、仅含 `fields` 的对象。
    pub fn from_json(value: &Value) -> Result<AppSchema, SchemaError> {
        let root = match value.get("data") {
            Some(inner) if inner.get("fields").is_some() => inner,
            _ => value,
        };
        let raw_fields = root
            .get("fields")
            .and_then(Value::as_array)
            .ok_or(SchemaError::MissingFields)?;
        let fields = parse_fields(raw_fields)?;

        Ok(AppSchema {
            app_id: root.get("app_id").and_then(Value::as_i64),
            name: root
                .pointer("/config/name")
                .and_then(Value::as_str)
                .map(str::to_string),
            item_name: root
                .pointer("/config/item_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            fields,
        })
    }

    pub fn title(&self) -> String {
        match (&self.name, self.app_id) {
            (Some(name), Some(id)) => format!("{} (#{})", name, id),
            (Some(name), None) => name.clone(),
            (None, Some(id)) => format!("App #{}", id),
            (None, None) => "Untitled app".to_string(),
        }
    }
}
