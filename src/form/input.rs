use serde_json::{Number, Value};

use super::widget::WidgetKind;
use crate::schema::DurationUnit;

/// 控件内可编辑的子位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Whole,
    Currency,
    Amount,
    Unit(DurationUnit),
}

impl Slot {
    /// 复合值中对应的子键
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Slot::Whole => None,
            Slot::Currency => Some("currency"),
            Slot::Amount => Some("amount"),
            Slot::Unit(u) => Some(u.key()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Slot::Whole => "value",
            Slot::Currency => "Currency",
            Slot::Amount => "Amount",
            Slot::Unit(u) => u.label(),
        }
    }
}

pub fn slots(kind: &WidgetKind) -> Vec<Slot> {
    match kind {
        WidgetKind::CurrencyPair { .. } => vec![Slot::Currency, Slot::Amount],
        WidgetKind::DurationInputs { units } => units.iter().copied().map(Slot::Unit).collect(),
        _ => vec![Slot::Whole],
    }
}

/// 该位置是否通过文本缓冲编辑（选择类控件用方向键与空格操作）
pub fn is_text_entry(kind: &WidgetKind, slot: Slot) -> bool {
    match kind {
        WidgetKind::SingleSelect { .. }
        | WidgetKind::MultiSelect { .. }
        | WidgetKind::Slider { .. }
        | WidgetKind::Unsupported { .. }
        | WidgetKind::Derived => false,
        WidgetKind::CurrencyPair { .. } => slot == Slot::Amount,
        _ => true,
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 当前值在某个位置上的文本形式，用于初始化编辑缓冲
pub fn slot_text(value: Option<&Value>, slot: Slot) -> String {
    let Some(v) = value else {
        return String::new();
    };
    match slot.key() {
        None => value_to_text(v),
        Some(key) => v.get(key).map(value_to_text).unwrap_or_default(),
    }
}

/// 把数字文本解析为 JSON 数值，整数优先
pub fn parse_number(text: &str) -> Option<Value> {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    t.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// 编辑缓冲 → 字段值
///
/// 空文本返回 `Null`（清空）。数字位置无法解析时保留原文本，由提交校验报告错误。
pub fn text_to_value(kind: &WidgetKind, slot: Slot, text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    let numeric = matches!(kind, WidgetKind::NumberInput { .. })
        || matches!(slot, Slot::Amount | Slot::Unit(_));
    if numeric {
        parse_number(text).unwrap_or_else(|| Value::String(text.to_string()))
    } else {
        Value::String(text.to_string())
    }
}

/// 列表中显示的值摘要
pub fn summarize(kind: &WidgetKind, value: Option<&Value>) -> String {
    let Some(v) = value.filter(|v| !v.is_null()) else {
        return String::new();
    };
    match kind {
        WidgetKind::SingleSelect { choices, .. } => {
            let id = value_to_text(v);
            choices
                .iter()
                .find(|c| c.value == id)
                .map(|c| c.label.clone())
                .unwrap_or(id)
        }
        WidgetKind::MultiSelect { choices, .. } => v
            .as_array()
            .map(|ids| {
                ids.iter()
                    .map(|id| {
                        let id = value_to_text(id);
                        choices
                            .iter()
                            .find(|c| c.value == id)
                            .map(|c| c.label.clone())
                            .unwrap_or(id)
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| value_to_text(v)),
        WidgetKind::CurrencyPair { .. } => {
            let currency = slot_text(Some(v), Slot::Currency);
            let amount = slot_text(Some(v), Slot::Amount);
            format!("{} {}", currency, amount).trim().to_string()
        }
        WidgetKind::DurationInputs { units } => units
            .iter()
            .filter_map(|u| v.get(u.key()).map(|n| format!("{}{}", value_to_text(n), u.key())))
            .collect::<Vec<_>>()
            .join(" "),
        WidgetKind::Slider { max, .. } => format!("{}/{}", value_to_text(v), max),
        _ => value_to_text(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::widget::{Choice, MultiSelectStyle};
    use serde_json::json;

    #[test]
    fn slots_per_widget() {
        assert_eq!(
            slots(&WidgetKind::CurrencyPair { currencies: vec![] }),
            vec![Slot::Currency, Slot::Amount]
        );
        assert_eq!(
            slots(&WidgetKind::DurationInputs {
                units: vec![DurationUnit::Hours, DurationUnit::Minutes]
            }),
            vec![
                Slot::Unit(DurationUnit::Hours),
                Slot::Unit(DurationUnit::Minutes)
            ]
        );
        assert_eq!(slots(&WidgetKind::EmailInput), vec![Slot::Whole]);
    }

    #[test]
    fn text_entry_positions() {
        let money = WidgetKind::CurrencyPair {
            currencies: vec!["USD".into()],
        };
        assert!(!is_text_entry(&money, Slot::Currency));
        assert!(is_text_entry(&money, Slot::Amount));
        assert!(!is_text_entry(
            &WidgetKind::Slider { min: 0, max: 100, step: 1 },
            Slot::Whole
        ));
        assert!(is_text_entry(&WidgetKind::DatePicker { with_time: false, with_end: false }, Slot::Whole));
    }

    #[test]
    fn numeric_text_parses_or_stays_text() {
        let number = WidgetKind::NumberInput { step: 1.0 };
        assert_eq!(text_to_value(&number, Slot::Whole, "42"), json!(42));
        assert_eq!(text_to_value(&number, Slot::Whole, "1.5"), json!(1.5));
        assert_eq!(text_to_value(&number, Slot::Whole, "12a"), json!("12a"));
        assert_eq!(text_to_value(&number, Slot::Whole, "  "), Value::Null);

        let money = WidgetKind::CurrencyPair { currencies: vec![] };
        assert_eq!(text_to_value(&money, Slot::Amount, "0"), json!(0));
        assert_eq!(
            text_to_value(&WidgetKind::SingleLineText, Slot::Whole, "007"),
            json!("007")
        );
    }

    #[test]
    fn slot_text_reads_sub_keys() {
        let v = json!({"currency": "EUR", "amount": 12.5});
        assert_eq!(slot_text(Some(&v), Slot::Currency), "EUR");
        assert_eq!(slot_text(Some(&v), Slot::Amount), "12.5");
        assert_eq!(slot_text(None, Slot::Whole), "");
    }

    #[test]
    fn summaries_use_choice_labels() {
        let kind = WidgetKind::MultiSelect {
            style: MultiSelectStyle::CheckboxGroup,
            choices: vec![
                Choice { value: "1".into(), label: "Red".into() },
                Choice { value: "2".into(), label: "Blue".into() },
            ],
        };
        assert_eq!(summarize(&kind, Some(&json!(["2", "1"]))), "Blue, Red");
        assert_eq!(summarize(&kind, None), "");

        let duration = WidgetKind::DurationInputs {
            units: vec![DurationUnit::Hours, DurationUnit::Minutes],
        };
        assert_eq!(summarize(&duration, Some(&json!({"hours": 2}))), "2hours");
    }
}
