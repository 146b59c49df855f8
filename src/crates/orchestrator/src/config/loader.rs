//! YAML configuration loading with environment variable expansion and deep merge.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:default}` expansion inside string
//! scalars, and recursively merges a base document with an override document
//! so a deployment can layer `orchestrator.yaml` + `orchestrator.local.yaml`.

use crate::OrchestratorError;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::env;
use std::fs;
use std::path::Path;

/// Load and parse a YAML file, expanding `${VAR}`/`${VAR:default}` scalars.
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue, OrchestratorError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        OrchestratorError::General(format!("failed to read config file {:?}: {}", path, e))
    })?;
    load_yaml_str(&content)
}

/// Parse a YAML document from a string, expanding environment variables.
pub fn load_yaml_str(content: &str) -> Result<YamlValue, OrchestratorError> {
    let mut value: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| OrchestratorError::General(format!("failed to parse config: {}", e)))?;
    expand_variables(&mut value);
    Ok(value)
}

/// Load and deserialize a YAML file into a specific config type.
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
) -> Result<T, OrchestratorError> {
    let yaml = load_yaml_file(path)?;
    deserialize_yaml(&yaml)
}

/// Deserialize a YAML value into a specific config type, via JSON.
pub fn deserialize_yaml<T: DeserializeOwned>(yaml: &YamlValue) -> Result<T, OrchestratorError> {
    let json = yaml_to_json(yaml)?;
    serde_json::from_value(json)
        .map_err(|e| OrchestratorError::General(format!("invalid configuration: {}", e)))
}

fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

/// Expand `${VAR}` / `${VAR:default}` occurrences in `s` by hand, without pulling
/// in a regex dependency for a single-purpose scan.
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    let mut changed = false;

    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            result.push_str(rest);
            rest = "";
            break;
        };
        let end = start + end;

        result.push_str(&rest[..start]);
        let inner = &rest[start + 2..end];
        let (var_name, default_value) = match inner.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (inner, None),
        };

        let value = env::var(var_name).unwrap_or_else(|_| default_value.unwrap_or("").to_string());
        result.push_str(&value);
        changed = true;
        rest = &rest[end + 1..];
    }
    result.push_str(rest);

    changed.then_some(result)
}

fn yaml_to_json(yaml: &YamlValue) -> Result<JsonValue, OrchestratorError> {
    match yaml {
        YamlValue::Null => Ok(JsonValue::Null),
        YamlValue::Bool(b) => Ok(JsonValue::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(JsonValue::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(JsonValue::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| OrchestratorError::General(format!("invalid number: {}", f)))
            } else {
                Err(OrchestratorError::General("invalid number".to_string()))
            }
        }
        YamlValue::String(s) => Ok(JsonValue::String(s.clone())),
        YamlValue::Sequence(seq) => {
            let json_seq: Result<Vec<JsonValue>, _> = seq.iter().map(yaml_to_json).collect();
            Ok(JsonValue::Array(json_seq?))
        }
        YamlValue::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    _ => return Err(OrchestratorError::General("map keys must be strings".to_string())),
                };
                json_map.insert(key, yaml_to_json(v)?);
            }
            Ok(JsonValue::Object(json_map))
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Merge `other` into `base`, recursing into mappings. Any non-mapping value
/// in `other` overrides the corresponding value in `base` outright.
pub fn deep_merge(base: &mut YamlValue, other: &YamlValue) {
    match (base, other) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(other_map)) => {
            for (key, other_value) in other_map {
                if let Some(base_value) = base_map.get_mut(key) {
                    deep_merge(base_value, other_value);
                } else {
                    base_map.insert(key.clone(), other_value.clone());
                }
            }
        }
        (base, other) => {
            *base = other.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_substitutes_set_variable() {
        env::set_var("KERNEL_CFG_TEST_VAR", "test_value");
        let result = expand_env_in_string("prefix ${KERNEL_CFG_TEST_VAR} suffix");
        assert_eq!(result, Some("prefix test_value suffix".to_string()));
        env::remove_var("KERNEL_CFG_TEST_VAR");
    }

    #[test]
    fn expand_env_falls_back_to_default() {
        let result = expand_env_in_string("value: ${KERNEL_CFG_MISSING:default_val}");
        assert_eq!(result, Some("value: default_val".to_string()));
    }

    #[test]
    fn expand_env_returns_none_without_braces() {
        assert_eq!(expand_env_in_string("plain string"), None);
    }

    #[test]
    fn yaml_to_json_converts_scalars_and_collections() {
        let yaml_str = r#"
            string: "hello"
            number: 42
            bool: true
            null_val: null
            array: [1, 2, 3]
            object:
              nested: "value"
        "#;
        let yaml: YamlValue = serde_yaml::from_str(yaml_str).unwrap();
        let json = yaml_to_json(&yaml).unwrap();

        assert_eq!(json["string"], "hello");
        assert_eq!(json["number"], 42);
        assert_eq!(json["bool"], true);
        assert!(json["null_val"].is_null());
        assert_eq!(json["array"].as_array().unwrap().len(), 3);
        assert_eq!(json["object"]["nested"], "value");
    }

    #[test]
    fn deep_merge_overrides_leaves_and_keeps_untouched_keys() {
        let mut base: YamlValue = serde_yaml::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let other: YamlValue = serde_yaml::from_str("b:\n  c: 20\n  e: 4\nf: 5\n").unwrap();
        deep_merge(&mut base, &other);

        let json = yaml_to_json(&base).unwrap();
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"]["c"], 20);
        assert_eq!(json["b"]["d"], 3);
        assert_eq!(json["b"]["e"], 4);
        assert_eq!(json["f"], 5);
    }

    #[test]
    fn load_yaml_str_expands_variables_inline() {
        env::set_var("KERNEL_CFG_PORT", "9100");
        let yaml = load_yaml_str("bind: \"0.0.0.0:${KERNEL_CFG_PORT}\"\n").unwrap();
        let json = yaml_to_json(&yaml).unwrap();
        assert_eq!(json["bind"], "0.0.0.0:9100");
        env::remove_var("KERNEL_CFG_PORT");
    }
}
