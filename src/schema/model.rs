use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Deleted,
}

/// 字段类型（线上格式为小写字符串）
///
/// 未识别的类型字符串统一落入 `Unsupported`，保留原始名称用于提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Money,
    Category,
    Question,
    Date,
    Duration,
    Image,
    File,
    Contact,
    AppRef,
    Embed,
    Phone,
    Email,
    Progress,
    Calculation,
    Unsupported(String),
}

impl FieldType {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "money" => FieldType::Money,
            "category" => FieldType::Category,
            "question" => FieldType::Question,
            "date" => FieldType::Date,
            "duration" => FieldType::Duration,
            "image" => FieldType::Image,
            "file" => FieldType::File,
            "contact" => FieldType::Contact,
            "app" => FieldType::AppRef,
            "embed" => FieldType::Embed,
            "phone" | "tel" => FieldType::Phone,
            "email" => FieldType::Email,
            "progress" => FieldType::Progress,
            "calculation" => FieldType::Calculation,
            other => FieldType::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Money => "money",
            FieldType::Category => "category",
            FieldType::Question => "question",
            FieldType::Date => "date",
            FieldType::Duration => "duration",
            FieldType::Image => "image",
            FieldType::File => "file",
            FieldType::Contact => "contact",
            FieldType::AppRef => "app",
            FieldType::Embed => "embed",
            FieldType::Phone => "phone",
            FieldType::Email => "email",
            FieldType::Progress => "progress",
            FieldType::Calculation => "calculation",
            FieldType::Unsupported(name) => name,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    #[default]
    Small,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextSettings {
    #[serde(default)]
    pub size: TextSize,
    #[serde(default)]
    pub format: TextFormat,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct NumberSettings {
    #[serde(default)]
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoneySettings {
    pub allowed_currencies: Vec<String>,
}

/// 分类 / 问题字段的选项
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryOption {
    pub id: i64,
    pub status: Status,
    pub text: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDisplay {
    Inline,
    #[default]
    List,
    Dropdown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategorySettings {
    pub options: Vec<CategoryOption>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub display: CategoryDisplay,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionSettings {
    pub options: Vec<CategoryOption>,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    #[default]
    Disabled,
    Enabled,
    Required,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DateSettings {
    #[serde(default)]
    pub calendar: bool,
    #[serde(default)]
    pub end: DateMode,
    #[serde(default)]
    pub time: DateMode,
    #[serde(default)]
    pub color: Option<String>,
}

/// 时长的子单位，声明顺序即规范顺序（天 → 时 → 分 → 秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 4] = [
        DurationUnit::Days,
        DurationUnit::Hours,
        DurationUnit::Minutes,
        DurationUnit::Seconds,
    ];

    /// 表单值对象中的键名
    pub fn key(self) -> &'static str {
        match self {
            DurationUnit::Days => "days",
            DurationUnit::Hours => "hours",
            DurationUnit::Minutes => "minutes",
            DurationUnit::Seconds => "seconds",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationUnit::Days => "Days",
            DurationUnit::Hours => "Hours",
            DurationUnit::Minutes => "Minutes",
            DurationUnit::Seconds => "Seconds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DurationSettings {
    pub fields: Vec<DurationUnit>,
}

impl DurationSettings {
    /// 按规范顺序返回出现过的单位（去重）
    pub fn units(&self) -> Vec<DurationUnit> {
        DurationUnit::ALL
            .into_iter()
            .filter(|u| self.fields.contains(u))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub allowed_mimetypes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    #[default]
    SpaceUsers,
    AllUsers,
    SpaceContacts,
    SpaceUsersAndContacts,
}

impl ContactType {
    /// 只有“用户”类联系人字段是单选
    pub fn is_multiple(self) -> bool {
        !matches!(self, ContactType::SpaceUsers | ContactType::AllUsers)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ContactSettings {
    #[serde(rename = "type", default)]
    pub contact_type: ContactType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferencedApp {
    pub app_id: i64,
    #[serde(default)]
    pub view_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub referenced_apps: Vec<ReferencedApp>,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PhoneSettings {
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub display_format: Option<String>,
    #[serde(default)]
    pub default_country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CalculationSettings {
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub decimals: Option<u32>,
}

/// 按字段类型区分的配置
///
/// 校验规则推导与控件选择两处都对它做穷尽匹配，新增类型时编译器会指出遗漏。
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSettings {
    Text(TextSettings),
    Number(NumberSettings),
    Money(MoneySettings),
    Category(CategorySettings),
    Question(QuestionSettings),
    Date(DateSettings),
    Duration(DurationSettings),
    Image(FileSettings),
    File(FileSettings),
    Contact(ContactSettings),
    AppRef(AppSettings),
    Embed,
    Phone(PhoneSettings),
    Email,
    Progress,
    Calculation(CalculationSettings),
    Unsupported { type_name: String, raw: Value },
}

impl TypeSettings {
    pub fn parse(field_type: &FieldType, raw: Value) -> Result<Self, serde_json::Error> {
        let raw = if raw.is_null() {
            Value::Object(Default::default())
        } else {
            raw
        };
        let settings = match field_type {
            FieldType::Text => TypeSettings::Text(serde_json::from_value(raw)?),
            FieldType::Number => TypeSettings::Number(serde_json::from_value(raw)?),
            FieldType::Money => TypeSettings::Money(serde_json::from_value(raw)?),
            FieldType::Category => TypeSettings::Category(serde_json::from_value(raw)?),
            FieldType::Question => TypeSettings::Question(serde_json::from_value(raw)?),
            FieldType::Date => TypeSettings::Date(serde_json::from_value(raw)?),
            FieldType::Duration => TypeSettings::Duration(serde_json::from_value(raw)?),
            FieldType::Image => TypeSettings::Image(serde_json::from_value(raw)?),
            FieldType::File => TypeSettings::File(serde_json::from_value(raw)?),
            FieldType::Contact => TypeSettings::Contact(serde_json::from_value(raw)?),
            FieldType::AppRef => TypeSettings::AppRef(serde_json::from_value(raw)?),
            FieldType::Embed => TypeSettings::Embed,
            FieldType::Phone => TypeSettings::Phone(serde_json::from_value(raw)?),
            FieldType::Email => TypeSettings::Email,
            FieldType::Progress => TypeSettings::Progress,
            FieldType::Calculation => TypeSettings::Calculation(serde_json::from_value(raw)?),
            FieldType::Unsupported(name) => TypeSettings::Unsupported {
                type_name: name.clone(),
                raw,
            },
        };
        Ok(settings)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            TypeSettings::Text(_) => FieldType::Text,
            TypeSettings::Number(_) => FieldType::Number,
            TypeSettings::Money(_) => FieldType::Money,
            TypeSettings::Category(_) => FieldType::Category,
            TypeSettings::Question(_) => FieldType::Question,
            TypeSettings::Date(_) => FieldType::Date,
            TypeSettings::Duration(_) => FieldType::Duration,
            TypeSettings::Image(_) => FieldType::Image,
            TypeSettings::File(_) => FieldType::File,
            TypeSettings::Contact(_) => FieldType::Contact,
            TypeSettings::AppRef(_) => FieldType::AppRef,
            TypeSettings::Embed => FieldType::Embed,
            TypeSettings::Phone(_) => FieldType::Phone,
            TypeSettings::Email => FieldType::Email,
            TypeSettings::Progress => FieldType::Progress,
            TypeSettings::Calculation(_) => FieldType::Calculation,
            TypeSettings::Unsupported { type_name, .. } => {
                FieldType::Unsupported(type_name.clone())
            }
        }
    }
}

/// 过滤掉已删除的选项，保持原有相对顺序
pub fn active_options(options: &[CategoryOption]) -> impl Iterator<Item = &CategoryOption> {
    options.iter().filter(|o| o.status == Status::Active)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub default_value: Option<Value>,
    pub description: Option<String>,
    pub delta: Option<i64>,
    pub required: bool,
    pub hidden: bool,
    pub visible: bool,
    pub settings: TypeSettings,
}

/// 远端应用中的一个字段定义，解析后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: i64,
    pub external_id: String,
    pub label: String,
    pub status: Status,
    pub config: FieldConfig,
}

#[derive(Deserialize)]
struct RawField {
    #[serde(alias = "id")]
    field_id: i64,
    external_id: String,
    label: String,
    #[serde(rename = "type")]
    type_name: String,
    status: Status,
    config: RawConfig,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    delta: Option<i64>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    settings: Value,
}

impl Field {
    /// 从接口返回的原始 JSON 解析一个字段，`position` 仅用于错误定位
    pub fn from_value(value: &Value, position: usize) -> Result<Field, SchemaError> {
        let raw = RawField::deserialize(value).map_err(|e| SchemaError::MalformedField {
            position,
            reason: e.to_string(),
        })?;

        let field_type = FieldType::from_wire(&raw.type_name);
        let settings = TypeSettings::parse(&field_type, raw.config.settings).map_err(|e| {
            SchemaError::InvalidSettings {
                external_id: raw.external_id.clone(),
                type_name: raw.type_name.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Field {
            id: raw.field_id,
            external_id: raw.external_id,
            label: raw.label,
            status: raw.status,
            config: FieldConfig {
                default_value: raw.config.default_value,
                description: raw.config.description,
                delta: raw.config.delta,
                required: raw.config.required,
                hidden: raw.config.hidden,
                visible: raw.config.visible,
                settings,
            },
        })
    }

    pub fn field_type(&self) -> FieldType {
        self.config.settings.field_type()
    }

    pub fn settings(&self) -> &TypeSettings {
        &self.config.settings
    }
}
