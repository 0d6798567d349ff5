use std::fmt;

/// 字段结构错误：解析或规范化阶段发现，整个表单不会被渲染
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("malformed field at position {position}: {reason}")]
    MalformedField { position: usize, reason: String },
    #[error("invalid settings for field '{external_id}' ({type_name}): {reason}")]
    InvalidSettings {
        external_id: String,
        type_name: String,
        reason: String,
    },
    #[error("schema response has no fields array")]
    MissingFields,
    #[error("duplicate external_id '{0}' among eligible fields")]
    DuplicateExternalId(String),
}

/// 不支持的字段类型（非致命）：渲染为提示标记，不参与校验与提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedTypeWarning {
    pub external_id: String,
    pub type_name: String,
}

impl fmt::Display for UnsupportedTypeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported field type '{}' for '{}'",
            self.type_name, self.external_id
        )
    }
}
