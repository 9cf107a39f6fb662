//! End-to-end template resolution checks through the crate facade.

use serde_json::json;
use stencil::{NO_VALUE, ResolveOptions, TemplateResolver, resolve_templates};

#[test]
fn resolves_a_login_payload() {
    let (result, errors) = resolve_templates(
        &json!({ "login": "{$.user.email}" }),
        &json!({ "user": { "email": "a@b.com" } }),
        ResolveOptions::default(),
    );
    assert_eq!(result, json!({ "login": "a@b.com" }));
    assert!(errors.is_empty());
}

#[test]
fn missing_exact_template_behavior_follows_configuration() {
    let (result, errors) = resolve_templates(
        &json!("{$.missing}"),
        &json!({}),
        ResolveOptions {
            omit_no_value_for_exact_templates: true,
            ..ResolveOptions::default()
        },
    );
    assert_eq!(result, json!(""));
    assert_eq!(errors, vec!["field \"$.missing\" not found".to_string()]);

    let (result, errors) = resolve_templates(
        &json!("{$.missing}"),
        &json!({}),
        ResolveOptions::default(),
    );
    assert_eq!(result, json!(NO_VALUE));
    assert_eq!(errors.len(), 1);
}

#[test]
fn resolution_is_idempotent_on_resolved_output() {
    let context = json!({ "user": { "email": "a@b.com" } });
    let resolver = TemplateResolver::default();
    let (first, errors) = resolver.resolve(&json!({ "login": "{$.user.email}" }), &context);
    assert!(errors.is_empty());
    let (second, errors) = resolver.resolve(&first, &context);
    assert_eq!(first, second);
    assert!(errors.is_empty());
}

#[test]
fn builds_sequential_request_payloads() {
    // the two calls of the role-removal action, resolved as plain data
    let resolver = TemplateResolver::default();

    let (lookup, errors) = resolver.resolve(
        &json!({
            "method": "GET",
            "url": "{$.config.baseUrl}/users?filter=principalName eq '{$.event.user.principalName}'"
        }),
        &json!({
            "config": { "baseUrl": "https://dir.example.com/v1" },
            "event": { "user": { "principalName": "kim@example.com" } }
        }),
    );
    assert!(errors.is_empty());
    assert_eq!(
        lookup["url"],
        json!("https://dir.example.com/v1/users?filter=principalName eq 'kim@example.com'")
    );

    let (removal, errors) = resolver.resolve(
        &json!({
            "method": "DELETE",
            "url": "{$.config.baseUrl}/users/{$.response.value[0].id}/roleAssignments/{$.event.roleAssignment.id}"
        }),
        &json!({
            "config": { "baseUrl": "https://dir.example.com/v1" },
            "event": { "roleAssignment": { "id": "ra-1" } },
            "response": { "value": [ { "id": "obj-9" } ] }
        }),
    );
    assert!(errors.is_empty());
    assert_eq!(
        removal["url"],
        json!("https://dir.example.com/v1/users/obj-9/roleAssignments/ra-1")
    );
}

#[test]
fn accumulates_errors_without_aborting() {
    let (result, errors) = resolve_templates(
        &json!({
            "a": "{$.present}",
            "b": "{$.absent}",
            "c": "text {$.also_absent} tail"
        }),
        &json!({ "present": 1 }),
        ResolveOptions::default(),
    );
    assert_eq!(result["a"], json!("1"));
    assert_eq!(result["b"], json!(NO_VALUE));
    assert_eq!(result["c"], json!(format!("text {NO_VALUE} tail")));
    assert_eq!(errors.len(), 2);
}

#[test]
fn namespace_is_shared_within_one_call_but_fresh_across_calls() {
    let resolver = TemplateResolver::default();
    let input = json!({ "a": "{$.sgnl.requestId}", "b": "{$.sgnl.requestId}" });
    let (first, _) = resolver.resolve(&input, &json!({}));
    assert_eq!(first["a"], first["b"]);

    let (second, _) = resolver.resolve(&input, &json!({}));
    assert_ne!(first["a"], second["a"]);
}
