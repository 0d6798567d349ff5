use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::schema::{DurationUnit, Field, TypeSettings};

pub const PHONE_MIN_LEN: usize = 6;
pub const PROGRESS_MIN: f64 = 0.0;
pub const PROGRESS_MAX: f64 = 100.0;

/// 与类型相关的基础校验规则
#[derive(Debug, Clone, PartialEq)]
pub enum BaseRule {
    AnyString,
    Numeric,
    Money { allowed_currencies: Vec<String> },
    /// 多选：选项 id 字符串数组
    OptionSet { min_len: usize },
    /// 单选：选项 id 字符串
    OptionId,
    Date,
    Duration { units: Vec<DurationUnit> },
    BlobRef,
    Reference { multiple: bool },
    Url,
    Phone { min_len: usize },
    Email,
    Percent,
    /// 计算字段：只读，不渲染也不提交
    Derived,
    /// 未识别类型的兜底规则，接受任何值
    Permissive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRule {
    pub required: bool,
    pub base: BaseRule,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("This field is required")]
    Required,
    #[error("Expected text")]
    ExpectedString,
    #[error("Expected a number")]
    ExpectedNumber,
    #[error("Expected an object")]
    ExpectedObject,
    #[error("Expected a list of ids")]
    ExpectedIdList,
    #[error("Select at least {0} option(s)")]
    TooFewOptions(usize),
    #[error("Currency '{0}' is not allowed")]
    CurrencyNotAllowed(String),
    #[error("Missing {0}")]
    MissingPart(&'static str),
    #[error("{0} must be a number")]
    PartNotNumeric(&'static str),
    #[error("Invalid date")]
    InvalidDate,
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Must be at least {0} characters")]
    TooShort(usize),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Must be between {min} and {max}")]
    OutOfRange { min: f64, max: f64 },
    #[error("Invalid file reference")]
    InvalidFileRef,
}

/// 从字段类型、配置和必填标记推导校验规则
pub fn derive_rule(field: &Field) -> ValidationRule {
    let required = field.config.required;
    let base = match field.settings() {
        TypeSettings::Text(_) => BaseRule::AnyString,
        TypeSettings::Number(_) => BaseRule::Numeric,
        TypeSettings::Money(s) => BaseRule::Money {
            allowed_currencies: s.allowed_currencies.clone(),
        },
        TypeSettings::Category(s) => option_rule(s.multiple, required),
        TypeSettings::Question(s) => option_rule(s.multiple, required),
        TypeSettings::Date(_) => BaseRule::Date,
        TypeSettings::Duration(s) => BaseRule::Duration { units: s.units() },
        TypeSettings::Image(_) | TypeSettings::File(_) => BaseRule::BlobRef,
        TypeSettings::Contact(s) => BaseRule::Reference {
            multiple: s.contact_type.is_multiple(),
        },
        TypeSettings::AppRef(s) => BaseRule::Reference {
            multiple: s.multiple,
        },
        TypeSettings::Embed => BaseRule::Url,
        TypeSettings::Phone(_) => BaseRule::Phone {
            min_len: PHONE_MIN_LEN,
        },
        TypeSettings::Email => BaseRule::Email,
        TypeSettings::Progress => BaseRule::Percent,
        TypeSettings::Calculation(_) => BaseRule::Derived,
        TypeSettings::Unsupported { .. } => BaseRule::Permissive,
    };
    ValidationRule { required, base }
}

fn option_rule(multiple: bool, required: bool) -> BaseRule {
    if multiple {
        BaseRule::OptionSet {
            min_len: if required { 1 } else { 0 },
        }
    } else {
        BaseRule::OptionId
    }
}

/// 必填检查的“空值”：缺失、null、空白字符串、空数组（对所有类型一致）
///
/// 数字 0、false、空对象都算有值。
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

impl ValidationRule {
    /// 是否参与校验与提交（计算字段和未识别类型不参与）
    pub fn participates(&self) -> bool {
        !matches!(self.base, BaseRule::Derived | BaseRule::Permissive)
    }

    /// 校验一个字段值，通过时返回写入提交记录的值（`None` 表示不写入）
    pub fn validate(&self, value: Option<&Value>) -> Result<Option<Value>, ValidationError> {
        match self.base {
            BaseRule::Derived => return Ok(None),
            BaseRule::Permissive => return Ok(value.cloned()),
            _ => {}
        }

        if is_missing(value) {
            if self.required {
                return Err(ValidationError::Required);
            }
            return Ok(value.filter(|v| !v.is_null()).cloned());
        }
        let Some(v) = value else {
            return Ok(None);
        };

        let out = match &self.base {
            BaseRule::AnyString | BaseRule::OptionId => expect_str(v)?.into(),
            BaseRule::Numeric => {
                if !v.is_number() {
                    return Err(ValidationError::ExpectedNumber);
                }
                v.clone()
            }
            BaseRule::Money { allowed_currencies } => check_money(v, allowed_currencies)?,
            BaseRule::OptionSet { min_len } => {
                let ids = expect_id_list(v)?;
                if ids.len() < *min_len {
                    return Err(ValidationError::TooFewOptions(*min_len));
                }
                v.clone()
            }
            BaseRule::Date => {
                let s = expect_str(v)?;
                if !is_valid_date(s) {
                    return Err(ValidationError::InvalidDate);
                }
                v.clone()
            }
            BaseRule::Duration { units } => check_duration(v, units)?,
            BaseRule::BlobRef => match v {
                Value::String(_) | Value::Object(_) => v.clone(),
                _ => return Err(ValidationError::InvalidFileRef),
            },
            BaseRule::Reference { multiple } => {
                if *multiple {
                    expect_id_list(v)?;
                } else {
                    expect_str(v)?;
                }
                v.clone()
            }
            BaseRule::Url => {
                let s = expect_str(v)?;
                reqwest::Url::parse(s).map_err(|_| ValidationError::InvalidUrl)?;
                v.clone()
            }
            BaseRule::Phone { min_len } => {
                let s = expect_str(v)?;
                if s.chars().count() < *min_len {
                    return Err(ValidationError::TooShort(*min_len));
                }
                v.clone()
            }
            BaseRule::Email => {
                let s = expect_str(v)?;
                if !email_regex().is_match(s) {
                    return Err(ValidationError::InvalidEmail);
                }
                v.clone()
            }
            BaseRule::Percent => {
                let n = v.as_f64().ok_or(ValidationError::ExpectedNumber)?;
                if !(PROGRESS_MIN..=PROGRESS_MAX).contains(&n) {
                    return Err(ValidationError::OutOfRange {
                        min: PROGRESS_MIN,
                        max: PROGRESS_MAX,
                    });
                }
                v.clone()
            }
            BaseRule::Derived | BaseRule::Permissive => v.clone(),
        };
        Ok(Some(out))
    }
}

fn expect_str(v: &Value) -> Result<&str, ValidationError> {
    v.as_str().ok_or(ValidationError::ExpectedString)
}

fn expect_id_list(v: &Value) -> Result<&Vec<Value>, ValidationError> {
    let arr = v.as_array().ok_or(ValidationError::ExpectedIdList)?;
    if arr.iter().all(Value::is_string) {
        Ok(arr)
    } else {
        Err(ValidationError::ExpectedIdList)
    }
}

fn check_money(v: &Value, allowed: &[String]) -> Result<Value, ValidationError> {
    let obj = v.as_object().ok_or(ValidationError::ExpectedObject)?;
    let currency = obj
        .get("currency")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingPart("currency"))?;
    if !allowed.iter().any(|c| c == currency) {
        return Err(ValidationError::CurrencyNotAllowed(currency.to_string()));
    }
    let amount = match obj.get("amount") {
        None | Some(Value::Null) => return Err(ValidationError::MissingPart("amount")),
        Some(a) if a.is_number() => a.clone(),
        Some(_) => return Err(ValidationError::PartNotNumeric("amount")),
    };

    let mut out = Map::new();
    out.insert("currency".to_string(), Value::String(currency.to_string()));
    out.insert("amount".to_string(), amount);
    Ok(Value::Object(out))
}

/// 只保留配置中声明的单位，未声明的键被丢弃
fn check_duration(v: &Value, units: &[DurationUnit]) -> Result<Value, ValidationError> {
    let obj = v.as_object().ok_or(ValidationError::ExpectedObject)?;
    let mut out = Map::new();
    for unit in units {
        match obj.get(unit.key()) {
            None | Some(Value::Null) => {}
            Some(n) if n.is_number() => {
                out.insert(unit.key().to_string(), n.clone());
            }
            Some(_) => return Err(ValidationError::PartNotNumeric(unit.key())),
        }
    }
    Ok(Value::Object(out))
}

pub fn is_valid_date(s: &str) -> bool {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
        )
        .expect("email pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(type_name: &str, required: bool, settings: Value) -> Field {
        Field::from_value(
            &json!({
                "field_id": 1,
                "external_id": "f",
                "label": "F",
                "type": type_name,
                "status": "active",
                "config": {"required": required, "visible": true, "settings": settings}
            }),
            0,
        )
        .unwrap()
    }

    fn rule(type_name: &str, required: bool, settings: Value) -> ValidationRule {
        derive_rule(&field(type_name, required, settings))
    }

    #[test]
    fn required_rejects_empty_shapes_for_every_type() {
        let r = rule("text", true, json!({}));
        assert_eq!(r.validate(None), Err(ValidationError::Required));
        assert_eq!(r.validate(Some(&Value::Null)), Err(ValidationError::Required));
        assert_eq!(r.validate(Some(&json!("   "))), Err(ValidationError::Required));
        // 空数组对非数组类型也视为缺失
        assert_eq!(r.validate(Some(&json!([]))), Err(ValidationError::Required));
    }

    #[test]
    fn optional_empty_skips_base_rule() {
        let r = rule("email", false, json!({}));
        assert_eq!(r.validate(None), Ok(None));
        assert_eq!(r.validate(Some(&json!(""))), Ok(Some(json!(""))));
    }

    #[test]
    fn money_with_zero_amount_is_present() {
        let r = rule("money", true, json!({"allowed_currencies": ["USD", "EUR"]}));
        let v = json!({"currency": "USD", "amount": 0});
        assert_eq!(r.validate(Some(&v)), Ok(Some(v.clone())));
    }

    #[test]
    fn money_checks_currency_and_amount() {
        let r = rule("money", false, json!({"allowed_currencies": ["USD"]}));
        assert_eq!(
            r.validate(Some(&json!({"currency": "GBP", "amount": 1}))),
            Err(ValidationError::CurrencyNotAllowed("GBP".into()))
        );
        assert_eq!(
            r.validate(Some(&json!({"currency": "USD"}))),
            Err(ValidationError::MissingPart("amount"))
        );
        assert_eq!(
            r.validate(Some(&json!({"currency": "USD", "amount": "ten"}))),
            Err(ValidationError::PartNotNumeric("amount"))
        );
        assert_eq!(
            r.validate(Some(&json!({"amount": 3}))),
            Err(ValidationError::MissingPart("currency"))
        );
    }

    #[test]
    fn multi_category_required_only_rejects_empty_when_required() {
        let settings = json!({
            "multiple": true,
            "display": "list",
            "options": [{"id": 1, "status": "active", "text": "A"}]
        });
        let required = rule("category", true, settings.clone());
        let optional = rule("category", false, settings);

        assert_eq!(required.validate(Some(&json!([]))), Err(ValidationError::Required));
        assert_eq!(optional.validate(Some(&json!([]))), Ok(Some(json!([]))));
        for r in [&required, &optional] {
            assert_eq!(r.validate(Some(&json!(["1"]))), Ok(Some(json!(["1"]))));
        }
        assert_eq!(
            optional.validate(Some(&json!([1]))),
            Err(ValidationError::ExpectedIdList)
        );
    }

    #[test]
    fn single_category_expects_id_string() {
        let r = rule(
            "category",
            false,
            json!({"options": [{"id": 1, "status": "active", "text": "A"}]}),
        );
        assert_eq!(r.base, BaseRule::OptionId);
        assert_eq!(r.validate(Some(&json!("1"))), Ok(Some(json!("1"))));
        assert_eq!(
            r.validate(Some(&json!(["1"]))),
            Err(ValidationError::ExpectedString)
        );
    }

    #[test]
    fn progress_bounds() {
        let r = rule("progress", true, json!({}));
        for ok in [0, 100, 55] {
            assert!(r.validate(Some(&json!(ok))).is_ok(), "{}", ok);
        }
        for bad in [-1, 101] {
            assert!(matches!(
                r.validate(Some(&json!(bad))),
                Err(ValidationError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn duration_keeps_declared_units_only() {
        let r = rule("duration", false, json!({"fields": ["hours", "minutes"]}));
        assert_eq!(
            r.validate(Some(&json!({"hours": 2}))),
            Ok(Some(json!({"hours": 2})))
        );
        assert_eq!(
            r.validate(Some(&json!({"hours": 1, "days": 4}))),
            Ok(Some(json!({"hours": 1})))
        );
        assert_eq!(
            r.validate(Some(&json!({"minutes": "x"}))),
            Err(ValidationError::PartNotNumeric("minutes"))
        );
    }

    #[test]
    fn string_formats() {
        let embed = rule("embed", false, json!({}));
        assert!(embed.validate(Some(&json!("https://example.com/a"))).is_ok());
        assert_eq!(
            embed.validate(Some(&json!("example"))),
            Err(ValidationError::InvalidUrl)
        );

        let phone = rule("phone", false, json!({}));
        assert!(phone.validate(Some(&json!("555123"))).is_ok());
        assert_eq!(
            phone.validate(Some(&json!("12345"))),
            Err(ValidationError::TooShort(6))
        );

        let email = rule("email", false, json!({}));
        assert!(email.validate(Some(&json!("ann@example.org"))).is_ok());
        assert_eq!(
            email.validate(Some(&json!("ann@"))),
            Err(ValidationError::InvalidEmail)
        );

        let date = rule("date", false, json!({}));
        assert!(date.validate(Some(&json!("2024-02-29"))).is_ok());
        assert!(date.validate(Some(&json!("2024-02-29 13:45:00"))).is_ok());
        assert_eq!(
            date.validate(Some(&json!("2023-02-30"))),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn number_rejects_text() {
        let r = rule("number", true, json!({"decimals": 2}));
        assert!(r.validate(Some(&json!(0))).is_ok());
        assert_eq!(
            r.validate(Some(&json!("12a"))),
            Err(ValidationError::ExpectedNumber)
        );
    }

    #[test]
    fn calculation_and_unknown_do_not_participate() {
        let calc = rule("calculation", true, json!({"script": "1+1"}));
        assert_eq!(calc.base, BaseRule::Derived);
        assert!(!calc.participates());
        assert_eq!(calc.validate(None), Ok(None));

        let sig = rule("signature", true, json!({}));
        assert_eq!(sig.base, BaseRule::Permissive);
        assert!(!sig.participates());
        assert_eq!(sig.validate(Some(&json!(5))), Ok(Some(json!(5))));
    }

    #[test]
    fn contact_reference_shape_follows_contact_type() {
        let users = rule("contact", false, json!({"type": "space_users"}));
        assert_eq!(users.base, BaseRule::Reference { multiple: false });
        let contacts = rule("contact", false, json!({"type": "space_contacts"}));
        assert_eq!(contacts.base, BaseRule::Reference { multiple: true });
    }
}
