use hub_domain::{Error, Result};
use serde_json::Value;

/// Validates that every key listed in `config_schema.required` is present
/// in `config`. Extra keys are permitted. Per spec.md §4.4: "Fails with
/// `invalid-config` if missing."
pub fn validate_required(config_schema: &Value, config: &Value) -> Result<()> {
    let missing = missing_required_keys(config_schema, config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid-config: missing required keys: {}", missing.join(", "))))
    }
}

/// Returns the schema-required keys absent from `config`.
pub fn missing_required_keys(config_schema: &Value, config: &Value) -> Vec<String> {
    let required = config_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();

    let config_obj = config.as_object();
    required
        .into_iter()
        .filter(|key| !config_obj.map(|obj| obj.contains_key(*key)).unwrap_or(false))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Value {
        serde_json::json!({"required": ["org", "token"]})
    }

    #[test]
    fn validate_required_passes_when_all_keys_present() {
        let config = serde_json::json!({"org": "acme", "token": "x", "extra": 1});
        assert!(validate_required(&schema(), &config).is_ok());
    }

    #[test]
    fn validate_required_fails_when_key_missing() {
        let config = serde_json::json!({"org": "acme"});
        let err = validate_required(&schema(), &config).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn missing_required_keys_reports_each_absent_key() {
        let config = serde_json::json!({});
        let missing = missing_required_keys(&schema(), &config);
        assert_eq!(missing, vec!["org", "token"]);
    }

    #[test]
    fn schema_without_required_array_has_no_missing_keys() {
        let schema = serde_json::json!({});
        assert!(missing_required_keys(&schema, &serde_json::json!({})).is_empty());
    }
}
