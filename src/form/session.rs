use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::rule::{derive_rule, ValidationRule};
use super::widget::{select_widget, WidgetDescriptor};
use crate::schema::{normalize, Field, SchemaError, TypeSettings, UnsupportedTypeWarning};

/// external_id → 错误信息
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// 尚未加载字段结构
    Empty,
    Ready,
    Submitting,
    /// 已通过校验并交给回调，需 reset 后才能再次编辑
    Accepted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted,
    Rejected(FieldErrors),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("form is not editable in state {0:?}")]
    NotEditable(FormState),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is read-only")]
    ReadOnly(String),
}

/// 表单值记录：external_id → 值
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, Value>);

impl FormValues {
    pub fn get(&self, external_id: &str) -> Option<&Value> {
        self.0.get(external_id)
    }

    pub fn insert(&mut self, external_id: String, value: Value) {
        self.0.insert(external_id, value);
    }

    pub fn remove(&mut self, external_id: &str) -> Option<Value> {
        self.0.remove(external_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.0.contains_key(external_id)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

/// 一个可渲染字段编译后的结果
#[derive(Debug, Clone, PartialEq)]
pub struct FormEntry {
    pub field: Field,
    pub rule: ValidationRule,
    pub widget: WidgetDescriptor,
}

impl FormEntry {
    pub fn compile(field: Field) -> FormEntry {
        let rule = derive_rule(&field);
        let widget = select_widget(&field);
        FormEntry {
            field,
            rule,
            widget,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.field.external_id
    }

    fn is_submittable(&self) -> bool {
        self.widget.accepts_input() && self.rule.participates()
    }
}

/// 一次表单会话：持有唯一的表单值记录
#[derive(Debug)]
pub struct FormSession {
    state: FormState,
    entries: Vec<FormEntry>,
    values: FormValues,
    errors: FieldErrors,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            state: FormState::Empty,
            entries: Vec::new(),
            values: FormValues::default(),
            errors: FieldErrors::new(),
        }
    }

    /// 规范化字段并编译为表单项，成功后进入 Ready
    ///
    /// 失败时会话回到 Empty，不保留部分结果。
    pub fn load(&mut self, fields: &[Field]) -> Result<Vec<UnsupportedTypeWarning>, SchemaError> {
        let eligible = match normalize(fields) {
            Ok(list) => list,
            Err(e) => {
                *self = Self::new();
                return Err(e);
            }
        };

        let entries: Vec<FormEntry> = eligible
            .into_iter()
            .map(FormEntry::compile)
            .filter(|e| e.widget.is_rendered())
            .collect();

        let warnings: Vec<UnsupportedTypeWarning> = entries
            .iter()
            .filter_map(|e| match e.field.settings() {
                TypeSettings::Unsupported { type_name, .. } => Some(UnsupportedTypeWarning {
                    external_id: e.field.external_id.clone(),
                    type_name: type_name.clone(),
                }),
                _ => None,
            })
            .collect();
        for w in &warnings {
            warn!("{}", w);
        }

        self.entries = entries;
        self.errors.clear();
        self.values = self.default_values();
        self.state = FormState::Ready;
        info!(
            "form loaded: {} fields, {} defaults",
            self.entries.len(),
            self.values.len()
        );
        Ok(warnings)
    }

    fn default_values(&self) -> FormValues {
        let mut values = FormValues::default();
        for entry in self.entries.iter().filter(|e| e.widget.accepts_input()) {
            if let Some(v) = entry.field.config.default_value.as_ref() {
                if !v.is_null() {
                    values.insert(entry.field.external_id.clone(), v.clone());
                }
            }
        }
        values
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn entries(&self) -> &[FormEntry] {
        &self.entries
    }

    pub fn entry(&self, external_id: &str) -> Option<&FormEntry> {
        self.entries.iter().find(|e| e.external_id() == external_id)
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, external_id: &str) -> Option<&Value> {
        self.values.get(external_id)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error_for(&self, external_id: &str) -> Option<&str> {
        self.errors.get(external_id).map(String::as_str)
    }

    fn editable_entry(&self, external_id: &str) -> Result<&FormEntry, FormError> {
        if self.state != FormState::Ready {
            return Err(FormError::NotEditable(self.state));
        }
        let entry = self
            .entry(external_id)
            .ok_or_else(|| FormError::UnknownField(external_id.to_string()))?;
        if !entry.widget.accepts_input() {
            return Err(FormError::ReadOnly(external_id.to_string()));
        }
        Ok(entry)
    }

    /// 整体替换字段值，`Null` 等同于清空
    pub fn set_value(&mut self, external_id: &str, value: Value) -> Result<(), FormError> {
        self.editable_entry(external_id)?;
        if value.is_null() {
            self.values.remove(external_id);
        } else {
            self.values.insert(external_id.to_string(), value);
        }
        self.errors.remove(external_id);
        Ok(())
    }

    pub fn clear_value(&mut self, external_id: &str) -> Result<(), FormError> {
        self.set_value(external_id, Value::Null)
    }

    /// 更新复合值（金额 / 时长）中的一个子键，其余子键保持不变
    pub fn set_part(&mut self, external_id: &str, key: &str, part: Value) -> Result<(), FormError> {
        self.editable_entry(external_id)?;
        let mut obj = match self.values.get(external_id) {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };
        if part.is_null() {
            obj.remove(key);
        } else {
            obj.insert(key.to_string(), part);
        }
        let next = if obj.is_empty() {
            Value::Null
        } else {
            Value::Object(obj)
        };
        self.set_value(external_id, next)
    }

    /// 多选框勾选 / 取消，返回操作后是否处于选中状态
    pub fn toggle_option(&mut self, external_id: &str, option: &str) -> Result<bool, FormError> {
        self.editable_entry(external_id)?;
        let mut selected: Vec<Value> = match self.values.get(external_id) {
            Some(Value::Array(a)) => a.clone(),
            _ => Vec::new(),
        };
        let now_selected = match selected.iter().position(|v| v.as_str() == Some(option)) {
            Some(idx) => {
                selected.remove(idx);
                false
            }
            None => {
                selected.push(Value::String(option.to_string()));
                true
            }
        };
        // 保留空数组：多选字段的“已清空”与“未填写”同样按缺失处理
        self.values
            .insert(external_id.to_string(), Value::Array(selected));
        self.errors.remove(external_id);
        Ok(now_selected)
    }

    /// 校验全部字段，全部通过才把记录交给回调；否则收集错误并回到 Ready
    pub fn submit<F>(&mut self, on_accept: F) -> Result<Submission, FormError>
    where
        F: FnOnce(FormValues),
    {
        if self.state != FormState::Ready {
            return Err(FormError::NotEditable(self.state));
        }
        self.state = FormState::Submitting;

        let mut record = FormValues::default();
        let mut errors = FieldErrors::new();
        for entry in self.entries.iter().filter(|e| e.is_submittable()) {
            let id = entry.external_id();
            match entry.rule.validate(self.values.get(id)) {
                Ok(Some(v)) => record.insert(id.to_string(), v),
                Ok(None) => {}
                Err(e) => {
                    errors.insert(id.to_string(), e.to_string());
                }
            }
        }

        if errors.is_empty() {
            self.errors.clear();
            self.values = FormValues::default();
            self.state = FormState::Accepted;
            info!("form accepted: {} values", record.len());
            on_accept(record);
            Ok(Submission::Accepted)
        } else {
            warn!("form rejected: {} field errors", errors.len());
            self.errors = errors.clone();
            self.state = FormState::Ready;
            Ok(Submission::Rejected(errors))
        }
    }

    /// 重新填入默认值并回到 Ready；未加载结构时保持 Empty
    pub fn reset(&mut self) {
        if self.state == FormState::Empty {
            return;
        }
        self.values = self.default_values();
        self.errors.clear();
        self.state = FormState::Ready;
    }
}
