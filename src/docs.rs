use crate::api::employee;
use crate::api::profile_change_request::{
    BatchDecision, BatchItem, ChangeRequestListResponse, ChangeRequestResponse,
    CreateChangeRequest, ReassignManager,
};
use crate::auth::handlers::LoginResponse;
use crate::model::employee::Employee;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Profile Change Request API",
        version = "1.0.0",
        description = r#"
## Employee Profile Change Requests

Employees propose changes to their own profile; their direct manager approves
or rejects them. Approval writes the requested fields onto the employee record.

### Workflow
- A request starts **pending**
- **Approve** applies every requested field or none of them
- **Reject** leaves the employee untouched
- Approved and rejected requests are final

### 🔐 Security
Every endpoint except `/auth/login` requires a JWT bearer token from it.
Only the request's manager, HR or Admin can decide a request.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        employee::get_employee,
        employee::delete_employee,

        crate::api::profile_change_request::submit_request,
        crate::api::profile_change_request::list_requests,
        crate::api::profile_change_request::get_request,
        crate::api::profile_change_request::approve_request,
        crate::api::profile_change_request::reject_request,
        crate::api::profile_change_request::reassign_manager,
        crate::api::profile_change_request::approve_batch,
        crate::api::profile_change_request::reject_batch
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Employee,
            CreateChangeRequest,
            ReassignManager,
            BatchDecision,
            BatchItem,
            ChangeRequestResponse,
            ChangeRequestListResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Authentication"),
        (name = "Employee", description = "Employee records"),
        (name = "Profile Change", description = "Profile change request workflow"),
    )
)]
pub struct ApiDoc;

/// The document with every protected path mounted under `api_prefix`.
/// `/auth` routes live outside the prefix and are left as they are.
pub fn api_doc(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| {
            if path.starts_with("/auth/") {
                (path, item)
            } else {
                (format!("{}{}", api_prefix.trim_end_matches('/'), path), item)
            }
        })
        .collect();
    doc
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
