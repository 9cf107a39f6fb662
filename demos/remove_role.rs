//! Builds the two request payloads of a "remove role from user" action by
//! resolving templates against a job context. The HTTP layer that would
//! send these requests belongs to the surrounding job runner, not to this
//! engine, so the demo stops at the resolved payloads.

use serde_json::json;
use stencil::{ResolveOptions, TemplateResolver};

fn main() {
    env_logger::init();

    // What the job runner would hand the action: instance configuration
    // plus the event payload.
    let context = json!({
        "config": { "baseUrl": "https://directory.example.com/v1" },
        "event": {
            "user": { "principalName": "kim@example.com" },
            "roleAssignment": { "id": "ra-77aa12" }
        }
    });

    let lookup_user = json!({
        "method": "GET",
        "url": "{$.config.baseUrl}/users?filter=principalName eq '{$.event.user.principalName}'",
        "headers": { "Accept": "application/json" }
    });

    // The second call uses the object id resolved out of the first
    // response; here the response is simulated.
    let resolver = TemplateResolver::new(ResolveOptions::default());
    let (lookup, errors) = resolver.resolve(&lookup_user, &context);
    log::info!("user lookup resolved with {} errors", errors.len());
    println!("--- user lookup request ---");
    println!("{}", serde_json::to_string_pretty(&lookup).unwrap());

    let response_context = json!({
        "config": { "baseUrl": "https://directory.example.com/v1" },
        "event": { "roleAssignment": { "id": "ra-77aa12" } },
        "response": { "value": [ { "id": "3f2a09c4-aa11-4b6e-9c02-58d1f2a7b310" } ] }
    });

    let remove_role = json!({
        "method": "DELETE",
        "url": "{$.config.baseUrl}/users/{$.response.value[0].id}/roleAssignments/{$.event.roleAssignment.id}",
        "headers": { "Accept": "application/json" }
    });

    let (removal, errors) = resolver.resolve(&remove_role, &response_context);
    log::info!("role removal resolved with {} errors", errors.len());
    println!("--- role removal request ---");
    println!("{}", serde_json::to_string_pretty(&removal).unwrap());
}
