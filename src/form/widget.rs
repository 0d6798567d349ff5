use crate::schema::{
    active_options, CategoryDisplay, CategoryOption, DurationUnit, Field, TextSize, TypeSettings,
};

use crate::schema::model::DateMode;

pub const SLIDER_MIN: u8 = 0;
pub const SLIDER_MAX: u8 = 100;

/// 下拉 / 单选 / 复选中的一个可选项，`value` 为选项 id 的字符串形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectStyle {
    Radio,
    Dropdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiSelectStyle {
    CheckboxGroup,
    InlineGroup,
    Dropdown,
}

/// 抽象控件种类，与具体 UI 工具包无关
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    SingleLineText,
    MultiLineText,
    NumberInput { step: f64 },
    CurrencyPair { currencies: Vec<String> },
    SingleSelect { style: SelectStyle, choices: Vec<Choice> },
    MultiSelect { style: MultiSelectStyle, choices: Vec<Choice> },
    DatePicker { with_time: bool, with_end: bool },
    DurationInputs { units: Vec<DurationUnit> },
    FilePicker { accept: Vec<String> },
    UrlInput,
    TelInput,
    EmailInput,
    Slider { min: u8, max: u8, step: u8 },
    Unsupported { type_name: String },
    /// 计算字段，不绘制
    Derived,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescriptor {
    pub external_id: String,
    pub label: String,
    pub placeholder: String,
    pub kind: WidgetKind,
}

impl WidgetDescriptor {
    pub fn is_rendered(&self) -> bool {
        !matches!(self.kind, WidgetKind::Derived)
    }

    /// 能否编辑（不支持的类型只显示提示标记）
    pub fn accepts_input(&self) -> bool {
        !matches!(
            self.kind,
            WidgetKind::Derived | WidgetKind::Unsupported { .. }
        )
    }

    pub fn choices(&self) -> &[Choice] {
        match &self.kind {
            WidgetKind::SingleSelect { choices, .. } | WidgetKind::MultiSelect { choices, .. } => {
                choices
            }
            _ => &[],
        }
    }
}

fn choices_from(options: &[CategoryOption]) -> Vec<Choice> {
    active_options(options)
        .map(|o| Choice {
            value: o.id.to_string(),
            label: o.text.clone(),
        })
        .collect()
}

pub fn select_widget(field: &Field) -> WidgetDescriptor {
    let label = field.label.clone();
    let select_placeholder = format!("Select {}", label);

    let (kind, placeholder) = match field.settings() {
        TypeSettings::Text(s) => {
            let kind = if s.size == TextSize::Large {
                WidgetKind::MultiLineText
            } else {
                WidgetKind::SingleLineText
            };
            (kind, label.clone())
        }
        TypeSettings::Number(s) => (
            WidgetKind::NumberInput {
                step: 10f64.powi(-(s.decimals.unwrap_or(0) as i32)),
            },
            label.clone(),
        ),
        TypeSettings::Money(s) => (
            WidgetKind::CurrencyPair {
                currencies: s.allowed_currencies.clone(),
            },
            "Amount".to_string(),
        ),
        TypeSettings::Category(s) => {
            let choices = choices_from(&s.options);
            let kind = if s.multiple {
                let style = match s.display {
                    CategoryDisplay::Dropdown => MultiSelectStyle::Dropdown,
                    CategoryDisplay::Inline => MultiSelectStyle::InlineGroup,
                    CategoryDisplay::List => MultiSelectStyle::CheckboxGroup,
                };
                WidgetKind::MultiSelect { style, choices }
            } else {
                let style = match s.display {
                    CategoryDisplay::Dropdown => SelectStyle::Dropdown,
                    CategoryDisplay::Inline | CategoryDisplay::List => SelectStyle::Radio,
                };
                WidgetKind::SingleSelect { style, choices }
            };
            (kind, select_placeholder)
        }
        TypeSettings::Question(s) => {
            let choices = choices_from(&s.options);
            let kind = if s.multiple {
                WidgetKind::MultiSelect {
                    style: MultiSelectStyle::CheckboxGroup,
                    choices,
                }
            } else {
                WidgetKind::SingleSelect {
                    style: SelectStyle::Radio,
                    choices,
                }
            };
            (kind, select_placeholder)
        }
        TypeSettings::Date(s) => (
            WidgetKind::DatePicker {
                with_time: s.time != DateMode::Disabled,
                with_end: s.end != DateMode::Disabled,
            },
            "YYYY-MM-DD".to_string(),
        ),
        TypeSettings::Duration(s) => (
            WidgetKind::DurationInputs { units: s.units() },
            String::new(),
        ),
        TypeSettings::Image(s) | TypeSettings::File(s) => (
            WidgetKind::FilePicker {
                accept: s.allowed_mimetypes.clone(),
            },
            "Choose file".to_string(),
        ),
        // 引用目标无法在本地解析：渲染为零选项的选择框
        TypeSettings::Contact(s) => (
            empty_reference_shell(s.contact_type.is_multiple()),
            select_placeholder,
        ),
        TypeSettings::AppRef(s) => (empty_reference_shell(s.multiple), select_placeholder),
        TypeSettings::Embed => (WidgetKind::UrlInput, "Enter URL".to_string()),
        TypeSettings::Phone(_) => (WidgetKind::TelInput, "Enter phone number".to_string()),
        TypeSettings::Email => (WidgetKind::EmailInput, "Enter email".to_string()),
        TypeSettings::Progress => (
            WidgetKind::Slider {
                min: SLIDER_MIN,
                max: SLIDER_MAX,
                step: 1,
            },
            String::new(),
        ),
        TypeSettings::Calculation(_) => (WidgetKind::Derived, String::new()),
        TypeSettings::Unsupported { type_name, .. } => (
            WidgetKind::Unsupported {
                type_name: type_name.clone(),
            },
            String::new(),
        ),
    };

    WidgetDescriptor {
        external_id: field.external_id.clone(),
        label,
        placeholder,
        kind,
    }
}

fn empty_reference_shell(multiple: bool) -> WidgetKind {
    if multiple {
        WidgetKind::MultiSelect {
            style: MultiSelectStyle::Dropdown,
            choices: Vec::new(),
        }
    } else {
        WidgetKind::SingleSelect {
            style: SelectStyle::Dropdown,
            choices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn widget(type_name: &str, settings: Value) -> WidgetDescriptor {
        let field = Field::from_value(
            &json!({
                "field_id": 5,
                "external_id": "w",
                "label": "Widget",
                "type": type_name,
                "status": "active",
                "config": {"visible": true, "settings": settings}
            }),
            0,
        )
        .unwrap();
        select_widget(&field)
    }

    #[test]
    fn text_size_picks_single_or_multi_line() {
        assert_eq!(
            widget("text", json!({"size": "small"})).kind,
            WidgetKind::SingleLineText
        );
        assert_eq!(
            widget("text", json!({"size": "large"})).kind,
            WidgetKind::MultiLineText
        );
    }

    #[test]
    fn number_step_follows_decimals() {
        match widget("number", json!({"decimals": 2})).kind {
            WidgetKind::NumberInput { step } => assert!((step - 0.01).abs() < 1e-12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn multi_category_display_variants() {
        let options = json!([
            {"id": 1, "status": "active", "text": "A"},
            {"id": 2, "status": "deleted", "text": "B"},
            {"id": 3, "status": "active", "text": "C"}
        ]);
        let cases = [
            ("dropdown", MultiSelectStyle::Dropdown),
            ("inline", MultiSelectStyle::InlineGroup),
            ("list", MultiSelectStyle::CheckboxGroup),
        ];
        for (display, expected) in cases {
            let w = widget(
                "category",
                json!({"multiple": true, "display": display, "options": options}),
            );
            match &w.kind {
                WidgetKind::MultiSelect { style, choices } => {
                    assert_eq!(*style, expected);
                    let values: Vec<&str> = choices.iter().map(|c| c.value.as_str()).collect();
                    assert_eq!(values, vec!["1", "3"]);
                }
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(w.placeholder, "Select Widget");
        }
    }

    #[test]
    fn category_choices_keep_declared_order() {
        let options = json!([
            {"id": 3, "status": "active", "text": "C"},
            {"id": 1, "status": "deleted", "text": "A"},
            {"id": 2, "status": "active", "text": "B"}
        ]);
        for multiple in [true, false] {
            let w = widget("category", json!({"multiple": multiple, "options": options}));
            let choices = match &w.kind {
                WidgetKind::MultiSelect { choices, .. } | WidgetKind::SingleSelect { choices, .. } => {
                    choices
                }
                other => panic!("unexpected {:?}", other),
            };
            let values: Vec<&str> = choices.iter().map(|c| c.value.as_str()).collect();
            assert_eq!(values, vec!["3", "2"], "multiple={}", multiple);
            let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
            assert_eq!(labels, vec!["C", "B"]);
        }
    }

    #[test]
    fn single_category_dropdown_or_radio() {
        let options = json!([{"id": 1, "status": "active", "text": "A"}]);
        assert!(matches!(
            widget("category", json!({"display": "dropdown", "options": options})).kind,
            WidgetKind::SingleSelect { style: SelectStyle::Dropdown, .. }
        ));
        assert!(matches!(
            widget("category", json!({"display": "inline", "options": options})).kind,
            WidgetKind::SingleSelect { style: SelectStyle::Radio, .. }
        ));
    }

    #[test]
    fn duration_inputs_in_canonical_order() {
        let w = widget("duration", json!({"fields": ["minutes", "hours"]}));
        assert_eq!(
            w.kind,
            WidgetKind::DurationInputs {
                units: vec![DurationUnit::Hours, DurationUnit::Minutes]
            }
        );
    }

    #[test]
    fn reference_fields_render_empty_shells() {
        let users = widget("contact", json!({"type": "all_users"}));
        assert!(matches!(users.kind, WidgetKind::SingleSelect { .. }));
        assert!(users.choices().is_empty());
        assert!(users.accepts_input());

        let contacts = widget("contact", json!({"type": "space_users_and_contacts"}));
        assert!(matches!(contacts.kind, WidgetKind::MultiSelect { .. }));
        assert!(contacts.choices().is_empty());

        let app_multi = widget(
            "app",
            json!({"multiple": true, "referenced_apps": [{"app_id": 10, "view_id": null}]}),
        );
        assert!(matches!(app_multi.kind, WidgetKind::MultiSelect { .. }));
        let app_single = widget("app", json!({"multiple": false}));
        assert!(matches!(app_single.kind, WidgetKind::SingleSelect { .. }));
        assert!(app_single.choices().is_empty());
    }

    #[test]
    fn file_picker_carries_mimetypes() {
        let w = widget("image", json!({"allowed_mimetypes": ["image/png"]}));
        assert_eq!(
            w.kind,
            WidgetKind::FilePicker {
                accept: vec!["image/png".to_string()]
            }
        );
    }

    #[test]
    fn simple_inputs() {
        assert_eq!(widget("embed", json!({})).kind, WidgetKind::UrlInput);
        assert_eq!(widget("phone", json!({})).kind, WidgetKind::TelInput);
        assert_eq!(widget("email", json!({})).kind, WidgetKind::EmailInput);
        assert_eq!(
            widget("progress", json!({})).kind,
            WidgetKind::Slider { min: 0, max: 100, step: 1 }
        );
        assert!(matches!(
            widget("date", json!({"time": "enabled"})).kind,
            WidgetKind::DatePicker { with_time: true, with_end: false }
        ));
    }

    #[test]
    fn calculation_and_unknown_types() {
        let calc = widget("calculation", json!({"script": "@a + 1"}));
        assert!(!calc.is_rendered());

        let sig = widget("signature", json!({}));
        assert!(sig.is_rendered());
        assert!(!sig.accepts_input());
        assert_eq!(
            sig.kind,
            WidgetKind::Unsupported {
                type_name: "signature".into()
            }
        );
    }
}
