use serde_json::Value;
use std::collections::HashSet;

use super::error::SchemaError;
use super::model::{Field, Status};

/// 字段可渲染条件：active 且 visible 且未 hidden
pub fn is_eligible(field: &Field) -> bool {
    field.status == Status::Active && field.config.visible && !field.config.hidden
}

pub fn parse_fields(values: &[Value]) -> Result<Vec<Field>, SchemaError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Field::from_value(v, i))
        .collect()
}

/// 保序过滤出可渲染字段
///
/// 可渲染字段之间 external_id 必须唯一，重复时报错而不是择一保留。
/// 对已规范化的列表再次调用结果不变。
pub fn normalize(fields: &[Field]) -> Result<Vec<Field>, SchemaError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for field in fields.iter().filter(|f| is_eligible(f)) {
        if !seen.insert(field.external_id.as_str()) {
            return Err(SchemaError::DuplicateExternalId(field.external_id.clone()));
        }
        out.push(field.clone());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize_raw(values: &[Value]) -> Result<Vec<Field>, SchemaError> {
        let fields = parse_fields(values)?;
        normalize(&fields)
    }

    fn text_field(external_id: &str, status: &str, visible: bool, hidden: bool) -> Value {
        json!({
            "field_id": 1,
            "external_id": external_id,
            "label": external_id,
            "type": "text",
            "status": status,
            "config": {
                "required": false,
                "visible": visible,
                "hidden": hidden,
                "settings": {"size": "small", "format": "plain"}
            }
        })
    }

    #[test]
    fn eligibility_is_exhaustive_over_flags() {
        for status in ["active", "deleted"] {
            for visible in [true, false] {
                for hidden in [true, false] {
                    let raw = vec![text_field("f", status, visible, hidden)];
                    let out = normalize_raw(&raw).unwrap();
                    let expected = status == "active" && visible && !hidden;
                    assert_eq!(
                        out.len() == 1,
                        expected,
                        "status={} visible={} hidden={}",
                        status,
                        visible,
                        hidden
                    );
                }
            }
        }
    }

    #[test]
    fn keeps_input_order() {
        let raw = vec![
            text_field("c", "active", true, false),
            text_field("a", "deleted", true, false),
            text_field("b", "active", true, false),
            text_field("d", "active", false, false),
            text_field("a2", "active", true, false),
        ];
        let ids: Vec<String> = normalize_raw(&raw)
            .unwrap()
            .into_iter()
            .map(|f| f.external_id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a2"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = vec![
            text_field("x", "active", true, false),
            text_field("y", "active", true, true),
            text_field("z", "active", true, false),
        ];
        let once = normalize_raw(&raw).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn duplicate_eligible_external_id_is_error() {
        let raw = vec![
            text_field("dup", "active", true, false),
            text_field("dup", "active", true, false),
        ];
        assert_eq!(
            normalize_raw(&raw),
            Err(SchemaError::DuplicateExternalId("dup".into()))
        );
    }

    #[test]
    fn duplicate_among_ineligible_is_ignored() {
        let raw = vec![
            text_field("dup", "active", true, false),
            text_field("dup", "deleted", true, false),
        ];
        assert_eq!(normalize_raw(&raw).unwrap().len(), 1);
    }

    #[test]
    fn malformed_field_aborts() {
        let raw = vec![text_field("ok", "active", true, false), json!({"label": "x"})];
        assert!(matches!(
            normalize_raw(&raw),
            Err(SchemaError::MalformedField { position: 1, .. })
        ));
    }
}
