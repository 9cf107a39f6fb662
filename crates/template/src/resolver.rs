//! Resolves `{$.path}` placeholders inside strings, mappings, and arrays
//! against a JSON context.
//!
//! Resolution never fails: every problem is recorded as a human-readable
//! message in the returned error list, and the best-effort result carries
//! a visible marker (or an empty string, per configuration) wherever a
//! placeholder could not be filled in.

use chrono::Local;
use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use stencil_jsonpath::{JsonPath, PathError, QueryOptions};

/// The visible marker substituted for an unresolvable placeholder.
pub const NO_VALUE: &str = "{No Value}";

/// The reserved context namespace carrying the per-call timestamp and
/// request identifier.
const RESERVED_NAMESPACE: &str = "sgnl";

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Matches `{$...}` non-greedily up to the first closing brace.
fn placeholder_pattern() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\$.*?)\}").expect("placeholder pattern is valid"))
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// When a string is exactly one placeholder and it cannot be
    /// resolved, substitute an empty string instead of the visible
    /// marker, and drop empty entries from mappings and arrays.
    pub omit_no_value_for_exact_templates: bool,
    /// Inject the reserved namespace into the context (on by default).
    pub inject_namespace: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            omit_no_value_for_exact_templates: false,
            inject_namespace: true,
        }
    }
}

pub struct TemplateResolver {
    engine: JsonPath,
    options: ResolveOptions,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new(ResolveOptions::default())
    }
}

impl TemplateResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            engine: JsonPath::new(QueryOptions {
                wrap: false,
                ..QueryOptions::default()
            }),
            options,
        }
    }

    /// Resolves every placeholder in `input` against `context`, returning
    /// the resolved structure together with the ordered list of
    /// resolution errors.
    pub fn resolve(&self, input: &Value, context: &Value) -> (Value, Vec<String>) {
        let context = self.augment(context);
        let mut errors = Vec::new();
        let resolved = self.resolve_value(input, &context, &mut errors);
        (resolved, errors)
    }

    /// Injects the reserved namespace, computed once per resolution call
    /// so every placeholder in one call sees the same timestamp and
    /// request id. Caller-supplied values under the namespace win.
    fn augment(&self, context: &Value) -> Value {
        if !self.options.inject_namespace {
            return context.clone();
        }
        let Value::Object(map) = context else {
            return context.clone();
        };
        let mut map = map.clone();
        match map.remove(RESERVED_NAMESPACE) {
            Some(Value::Object(existing)) => {
                let mut namespace = injected_namespace();
                for (key, value) in existing {
                    namespace.insert(key, value);
                }
                map.insert(RESERVED_NAMESPACE.to_string(), Value::Object(namespace));
            }
            // A non-object namespace supplied by the caller is kept as-is.
            Some(other) => {
                map.insert(RESERVED_NAMESPACE.to_string(), other);
            }
            None => {
                map.insert(
                    RESERVED_NAMESPACE.to_string(),
                    Value::Object(injected_namespace()),
                );
            }
        }
        Value::Object(map)
    }

    fn resolve_value(&self, input: &Value, context: &Value, errors: &mut Vec<String>) -> Value {
        match input {
            Value::String(s) => self.resolve_string(s, context, errors),
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, value) in map {
                    let resolved = self.resolve_value(value, context, errors);
                    if self.options.omit_no_value_for_exact_templates
                        && is_empty_or_marker(&resolved)
                    {
                        continue;
                    }
                    out.insert(key.clone(), resolved);
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items {
                    let resolved = self.resolve_value(item, context, errors);
                    if self.options.omit_no_value_for_exact_templates
                        && is_empty_or_marker(&resolved)
                    {
                        continue;
                    }
                    out.push(resolved);
                }
                Value::Array(out)
            }
            other => other.clone(),
        }
    }

    fn resolve_string(&self, input: &str, context: &Value, errors: &mut Vec<String>) -> Value {
        let pattern = placeholder_pattern();

        if let Some(caps) = pattern.captures(input) {
            if let Some(whole) = caps.get(0) {
                if whole.start() == 0 && whole.end() == input.len() {
                    return Value::String(self.resolve_exact(&caps[1], context, errors));
                }
            }
        } else {
            return Value::String(input.to_string());
        }

        let mut out = String::new();
        let mut last = 0;
        for caps in pattern.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&input[last..whole.start()]);
            out.push_str(&self.resolve_embedded(&caps[1], context, errors));
            last = whole.end();
        }
        out.push_str(&input[last..]);
        Value::String(out)
    }

    /// A string that is exactly one placeholder. An unresolvable path
    /// yields the marker, or an empty string under the omit option.
    fn resolve_exact(&self, path: &str, context: &Value, errors: &mut Vec<String>) -> String {
        match self.lookup(path, context) {
            Ok(Some(value)) => {
                let text = stringify(&value);
                if text.is_empty() {
                    errors.push(format!("field \"{path}\" is empty"));
                }
                text
            }
            Ok(None) => {
                log::debug!("no value found for \"{path}\"");
                errors.push(format!("field \"{path}\" not found"));
                self.unresolved_exact()
            }
            Err(e) => {
                errors.push(e.to_string());
                self.unresolved_exact()
            }
        }
    }

    fn unresolved_exact(&self) -> String {
        if self.options.omit_no_value_for_exact_templates {
            String::new()
        } else {
            NO_VALUE.to_string()
        }
    }

    /// A placeholder embedded among other text. An unresolvable path is
    /// replaced by the visible marker rather than removed.
    fn resolve_embedded(&self, path: &str, context: &Value, errors: &mut Vec<String>) -> String {
        match self.lookup(path, context) {
            Ok(Some(value)) => {
                let text = stringify(&value);
                if text.is_empty() {
                    errors.push(format!("field \"{path}\" is empty"));
                }
                text
            }
            Ok(None) => {
                log::debug!("no value found for \"{path}\"");
                errors.push(format!("field \"{path}\" not found"));
                NO_VALUE.to_string()
            }
            Err(e) => {
                errors.push(e.to_string());
                NO_VALUE.to_string()
            }
        }
    }

    fn lookup(&self, path: &str, context: &Value) -> Result<Option<Value>, PathError> {
        let matches = self.engine.find(path, context)?;
        let mut values: Vec<Value> = matches.into_iter().map(|m| m.value).collect();
        Ok(match values.len() {
            0 => None,
            1 => Some(values.remove(0)),
            _ => Some(Value::Array(values)),
        })
    }
}

fn injected_namespace() -> Map<String, Value> {
    let mut namespace = Map::new();
    namespace.insert(
        "timestamp".to_string(),
        Value::String(current_timestamp()),
    );
    namespace.insert(
        "requestId".to_string(),
        Value::String(random_identifier()),
    );
    namespace
}

/// A fixed-offset date-time with no sub-second precision, trimmed to the
/// minute.
fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M%:z").to_string()
}

fn random_identifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

fn is_empty_or_marker(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty() || s == NO_VALUE)
}

/// The canonical textual form of a resolved value: strings pass through
/// unchanged, everything else serializes to JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(input: Value, context: Value) -> (Value, Vec<String>) {
        TemplateResolver::default().resolve(&input, &context)
    }

    fn resolve_omitting(input: Value, context: Value) -> (Value, Vec<String>) {
        TemplateResolver::new(ResolveOptions {
            omit_no_value_for_exact_templates: true,
            ..ResolveOptions::default()
        })
        .resolve(&input, &context)
    }

    #[test]
    fn test_resolve_exact_placeholder() {
        let (result, errors) = resolve(
            json!({ "login": "{$.user.email}" }),
            json!({ "user": { "email": "a@b.com" } }),
        );
        assert_eq!(result, json!({ "login": "a@b.com" }));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_resolve_embedded_placeholders() {
        let (result, errors) = resolve(
            json!("Hello {$.name}, you have {$.count} messages"),
            json!({ "name": "Kim", "count": 3 }),
        );
        assert_eq!(result, json!("Hello Kim, you have 3 messages"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_non_string_values_serialize() {
        let (result, _) = resolve(
            json!({ "ids": "{$.ids}", "flag": "{$.flag}" }),
            json!({ "ids": [1, 2], "flag": true }),
        );
        assert_eq!(result, json!({ "ids": "[1,2]", "flag": "true" }));
    }

    #[test]
    fn test_missing_exact_yields_marker_and_error() {
        let (result, errors) = resolve(json!("{$.missing}"), json!({}));
        assert_eq!(result, json!(NO_VALUE));
        assert_eq!(errors, vec!["field \"$.missing\" not found".to_string()]);
    }

    #[test]
    fn test_missing_exact_omitted_when_configured() {
        let (result, errors) = resolve_omitting(json!("{$.missing}"), json!({}));
        assert_eq!(result, json!(""));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_missing_embedded_keeps_marker() {
        let (result, errors) = resolve(json!("id: {$.missing}!"), json!({}));
        assert_eq!(result, json!("id: {No Value}!"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_empty_value_records_error() {
        let (result, errors) = resolve(json!("{$.name}"), json!({ "name": "" }));
        assert_eq!(result, json!(""));
        assert_eq!(errors, vec!["field \"$.name\" is empty".to_string()]);
    }

    #[test]
    fn test_omit_drops_empty_map_entries_and_array_elements() {
        let (result, errors) = resolve_omitting(
            json!({
                "keep": "{$.a}",
                "drop": "{$.missing}",
                "list": ["{$.a}", "{$.missing}", "x"]
            }),
            json!({ "a": "v" }),
        );
        assert_eq!(result, json!({ "keep": "v", "list": ["v", "x"] }));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_without_omit_entries_are_kept() {
        let (result, _) = resolve(
            json!({ "drop": "{$.missing}" }),
            json!({}),
        );
        assert_eq!(result, json!({ "drop": NO_VALUE }));
    }

    #[test]
    fn test_malformed_path_records_error_and_continues() {
        let (result, errors) = resolve(
            json!({ "bad": "{$.}", "good": "{$.a}" }),
            json!({ "a": 1 }),
        );
        assert_eq!(result["good"], json!("1"));
        assert_eq!(result["bad"], json!(NO_VALUE));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_resolution_is_idempotent_on_plain_strings() {
        let input = json!({ "a": "no placeholders here", "n": 7 });
        let (result, errors) = resolve(input.clone(), json!({}));
        assert_eq!(result, input);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_non_containers_pass_through() {
        let (result, errors) = resolve(json!(42), json!({}));
        assert_eq!(result, json!(42));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_namespace_injection() {
        let (result, errors) = resolve(
            json!({
                "at": "{$.sgnl.timestamp}",
                "id1": "{$.sgnl.requestId}",
                "id2": "{$.sgnl.requestId}"
            }),
            json!({}),
        );
        assert!(errors.is_empty());
        let id1 = result["id1"].as_str().unwrap();
        assert_eq!(id1.len(), 16);
        // computed once per call, so repeated references agree
        assert_eq!(result["id1"], result["id2"]);
        assert!(result["at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_caller_supplied_namespace_values_win() {
        let (result, _) = resolve(
            json!({ "id": "{$.sgnl.requestId}", "at": "{$.sgnl.timestamp}" }),
            json!({ "sgnl": { "requestId": "fixed" } }),
        );
        assert_eq!(result["id"], json!("fixed"));
        // the injected timestamp is still present alongside caller values
        assert!(!result["at"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_namespace_injection_can_be_disabled() {
        let resolver = TemplateResolver::new(ResolveOptions {
            inject_namespace: false,
            ..ResolveOptions::default()
        });
        let (_, errors) = resolver.resolve(&json!("{$.sgnl.requestId}"), &json!({}));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_nested_structures() {
        let (result, errors) = resolve(
            json!({
                "request": {
                    "url": "https://svc.example.com/users/{$.user.id}/roles",
                    "body": { "roleId": "{$.role.id}" }
                }
            }),
            json!({ "user": { "id": "u-1" }, "role": { "id": "r-9" } }),
        );
        assert!(errors.is_empty());
        assert_eq!(
            result,
            json!({
                "request": {
                    "url": "https://svc.example.com/users/u-1/roles",
                    "body": { "roleId": "r-9" }
                }
            })
        );
    }

    #[test]
    fn test_filter_paths_inside_placeholders() {
        let (result, errors) = resolve(
            json!("{$.accounts[?(@.primary)].id}"),
            json!({ "accounts": [
                { "id": "a1", "primary": false },
                { "id": "a2", "primary": true }
            ] }),
        );
        assert!(errors.is_empty());
        assert_eq!(result, json!("a2"));
    }
}
