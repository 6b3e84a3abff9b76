use crate::auth::auth::AuthUser;
use crate::model::profile_change_request::{ChangeRequest, RequestState};
use crate::store::RequestFilter;
use crate::workflow::{BatchOutcome, ChangeRequestWorkflow, Submission};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateChangeRequest {
    /// JSON object mapping employee fields to their new values
    #[schema(example = r#"{"job_title": "Senior Engineer"}"#)]
    pub requested_changes: String,
    #[schema(example = "Promoted in the last review cycle", nullable = true)]
    pub comment: Option<String>,
    /// Defaults to the employee's direct manager
    #[schema(example = 7, nullable = true)]
    pub manager_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReassignManager {
    #[schema(example = 7)]
    pub manager_id: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct BatchDecision {
    #[schema(example = json!([1, 2, 3]))]
    pub ids: Vec<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct ChangeRequestFilter {
    /// Filter by employee ID
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by approving manager ID
    #[param(example = 7)]
    pub manager_id: Option<u64>,
    /// Filter by state: pending, approved or rejected
    #[param(value_type = Option<String>, example = "pending")]
    pub state: Option<RequestState>,
    /// Pagination page number (start with 1)
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[param(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeRequestResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Profile Change Request #1 - John Doe")]
    pub display_name: String,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 7)]
    pub manager_id: u64,
    #[schema(example = r#"{"job_title": "Senior Engineer"}"#)]
    pub requested_changes: String,
    #[schema(nullable = true)]
    pub comment: Option<String>,
    #[schema(example = "pending", value_type = String)]
    pub state: RequestState,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub request_date: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_date: Option<DateTime<Utc>>,
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub rejected_date: Option<DateTime<Utc>>,
    pub rejected_by: Option<u64>,
    pub approval_comment: Option<String>,
    pub rejection_comment: Option<String>,
}

impl ChangeRequestResponse {
    fn new(request: ChangeRequest, display_name: String) -> Self {
        Self {
            id: request.id,
            display_name,
            employee_id: request.employee_id,
            manager_id: request.manager_id,
            requested_changes: request.requested_changes,
            comment: request.comment,
            state: request.state,
            request_date: request.request_date,
            approved_date: request.approved_date,
            approved_by: request.approved_by,
            rejected_date: request.rejected_date,
            rejected_by: request.rejected_by,
            approval_comment: request.approval_comment,
            rejection_comment: request.rejection_comment,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChangeRequestListResponse {
    pub data: Vec<ChangeRequestResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchItem {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "approved", value_type = Option<String>)]
    pub state: Option<RequestState>,
    /// Set when this request could not be decided
    #[schema(nullable = true)]
    pub error: Option<String>,
}

impl From<BatchOutcome> for BatchItem {
    fn from(outcome: BatchOutcome) -> Self {
        match outcome.result {
            Ok(request) => BatchItem {
                id: outcome.id,
                state: Some(request.state),
                error: None,
            },
            Err(e) => BatchItem {
                id: outcome.id,
                state: None,
                error: Some(e.to_string()),
            },
        }
    }
}

async fn respond_with(
    workflow: &ChangeRequestWorkflow,
    request: ChangeRequest,
) -> actix_web::Result<ChangeRequestResponse> {
    let label = workflow.label(&request).await?;
    Ok(ChangeRequestResponse::new(request, label))
}

/* =========================
Submit a profile change request
========================= */
#[utoipa::path(
    post,
    path = "/profile-change",
    request_body(
        content = CreateChangeRequest,
        description = "Profile change payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request submitted", body = ChangeRequestResponse),
        (status = 400, description = "Wrong manager, or a pending request already exists", body = Object, example = json!({
            "message": "the manager must be the direct manager of the employee"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
#[instrument(skip_all, fields(user_id = auth.user_id))]
pub async fn submit_request(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    payload: web::Json<CreateChangeRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.into_inner();

    let request = workflow
        .submit(Submission {
            employee_id,
            manager_id: payload.manager_id,
            requested_changes: payload.requested_changes,
            comment: payload.comment,
        })
        .await?;

    let body = respond_with(&workflow, request).await?;
    Ok(HttpResponse::Created().json(body))
}

/* =========================
List requests
========================= */
#[utoipa::path(
    get,
    path = "/profile-change",
    params(ChangeRequestFilter),
    responses(
        (status = 200, description = "Paginated request list", body = ChangeRequestListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
pub async fn list_requests(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    query: web::Query<ChangeRequestFilter>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();

    // Everyone but HR/Admin only sees requests they are part of
    let party = if auth.role.oversees_all_requests() {
        None
    } else {
        Some(auth.require_employee()?)
    };

    let filter = RequestFilter {
        employee_id: query.employee_id,
        manager_id: query.manager_id,
        party,
        state: query.state,
        page: query.page,
        per_page: query.per_page,
    };
    debug!(?party, "Listing profile change requests");

    let page = workflow.list(&filter).await?;
    let data = page
        .items
        .into_iter()
        .map(|listed| {
            let label = listed.request.label(&listed.employee_name);
            ChangeRequestResponse::new(listed.request, label)
        })
        .collect();

    Ok(HttpResponse::Ok().json(ChangeRequestListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/profile-change/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the change request")
    ),
    responses(
        (status = 200, description = "Change request found", body = ChangeRequestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Change request not found", body = Object, example = json!({
            "message": "profile change request #1 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
pub async fn get_request(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = workflow.get(path.into_inner()).await?;
    auth.require_can_view(&request)?;

    let body = respond_with(&workflow, request).await?;
    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Approve (manager or HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/profile-change/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the change request to approve")
    ),
    responses(
        (status = 200, description = "Approved and applied to the employee", body = ChangeRequestResponse),
        (status = 400, description = "Changes could not be parsed or applied", body = Object, example = json!({
            "message": "failed to apply changes: unknown employee field 'salary'"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Change request not found"),
        (status = 409, description = "Request already decided", body = Object, example = json!({
            "message": "only pending requests can be approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
#[instrument(skip_all, fields(user_id = auth.user_id, request_id = *path))]
pub async fn approve_request(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = workflow.get(path.into_inner()).await?;
    let acting_employee = auth.require_can_decide(&request)?;

    let approved = workflow.approve(request.id, acting_employee).await?;

    let body = respond_with(&workflow, approved).await?;
    Ok(HttpResponse::Ok().json(body))
}

/* =========================
Reject (manager or HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/profile-change/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the change request to reject")
    ),
    responses(
        (status = 200, description = "Rejected", body = ChangeRequestResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Change request not found"),
        (status = 409, description = "Request already decided", body = Object, example = json!({
            "message": "only pending requests can be rejected"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
#[instrument(skip_all, fields(user_id = auth.user_id, request_id = *path))]
pub async fn reject_request(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = workflow.get(path.into_inner()).await?;
    let acting_employee = auth.require_can_decide(&request)?;

    let rejected = workflow.reject(request.id, acting_employee).await?;

    let body = respond_with(&workflow, rejected).await?;
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    put,
    path = "/profile-change/{request_id}/manager",
    params(
        ("request_id" = u64, Path, description = "ID of the change request")
    ),
    request_body = ReassignManager,
    responses(
        (status = 200, description = "Manager updated", body = ChangeRequestResponse),
        (status = 400, description = "Not the employee's direct manager"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
pub async fn reassign_manager(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<ReassignManager>,
) -> actix_web::Result<impl Responder> {
    let request = workflow.get(path.into_inner()).await?;
    auth.require_can_decide(&request)?;

    let updated = workflow
        .reassign_manager(request.id, payload.manager_id)
        .await?;

    let body = respond_with(&workflow, updated).await?;
    Ok(HttpResponse::Ok().json(body))
}

/// Splits `ids` into the ones this user may decide and per-id refusals,
/// runs `decide` on the allowed ones and returns results in request order.
async fn decide_batch<F, Fut>(
    auth: &AuthUser,
    workflow: &ChangeRequestWorkflow,
    ids: Vec<u64>,
    decide: F,
) -> actix_web::Result<Vec<BatchItem>>
where
    F: FnOnce(Vec<u64>, u64) -> Fut,
    Fut: std::future::Future<Output = Vec<BatchOutcome>>,
{
    let acting_employee = auth.require_employee()?;

    let mut refused = Vec::new();
    let mut allowed = Vec::new();
    for id in &ids {
        match workflow.get(*id).await {
            Ok(request) => match auth.require_can_decide(&request) {
                Ok(_) => allowed.push(*id),
                Err(e) => refused.push(BatchItem {
                    id: *id,
                    state: None,
                    error: Some(e.to_string()),
                }),
            },
            Err(e) => refused.push(BatchItem {
                id: *id,
                state: None,
                error: Some(e.to_string()),
            }),
        }
    }

    let mut decided: Vec<BatchItem> = decide(allowed, acting_employee)
        .await
        .into_iter()
        .map(BatchItem::from)
        .collect();
    decided.append(&mut refused);

    // back to the caller's order
    decided.sort_by_key(|item| ids.iter().position(|id| *id == item.id));
    Ok(decided)
}

#[utoipa::path(
    post,
    path = "/profile-change/approve",
    request_body = BatchDecision,
    responses(
        (status = 200, description = "Per-request outcome", body = [BatchItem]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
pub async fn approve_batch(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    payload: web::Json<BatchDecision>,
) -> actix_web::Result<impl Responder> {
    let wf = workflow.get_ref();
    let items = decide_batch(&auth, wf, payload.into_inner().ids, |ids, actor| async move {
        wf.approve_batch(&ids, actor).await
    })
    .await?;

    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    post,
    path = "/profile-change/reject",
    request_body = BatchDecision,
    responses(
        (status = 200, description = "Per-request outcome", body = [BatchItem]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Profile Change"
)]
pub async fn reject_batch(
    auth: AuthUser,
    workflow: web::Data<ChangeRequestWorkflow>,
    payload: web::Json<BatchDecision>,
) -> actix_web::Result<impl Responder> {
    let wf = workflow.get_ref();
    let items = decide_batch(&auth, wf, payload.into_inner().ids, |ids, actor| async move {
        wf.reject_batch(&ids, actor).await
    })
    .await?;

    Ok(HttpResponse::Ok().json(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::routes::profile_change_routes;
    use crate::store::memory::fixtures::org_chart;
    use crate::workflow::clock::FixedClock;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use std::sync::Arc;

    const SECRET: &str = "test-secret";
    const EMPLOYEE: u8 = 3;
    const HR: u8 = 2;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".to_string()),
            "DATABASE_URL" => Some("mysql://unused".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn workflow() -> ChangeRequestWorkflow {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        ChangeRequestWorkflow::new(Arc::new(org_chart()), Arc::new(FixedClock(now)))
    }

    fn bearer(employee_id: u64, role: u8) -> (&'static str, String) {
        let token = generate_access_token(
            employee_id + 100,
            format!("user{employee_id}"),
            role,
            Some(employee_id),
            SECRET,
            300,
        )
        .unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config()))
                    .app_data(web::Data::new(workflow()))
                    .service(web::scope("/api/v1").configure(profile_change_routes)),
            )
            .await
        };
    }

    macro_rules! submit {
        ($app:expr, $employee:expr, $changes:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/v1/profile-change")
                .insert_header(bearer($employee, EMPLOYEE))
                .set_json(json!({ "requested_changes": $changes }))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: ChangeRequestResponse = test::read_body_json(resp).await;
            body
        }};
    }

    #[actix_web::test]
    async fn submit_defaults_to_direct_manager() {
        let app = app!();

        let created = submit!(app, 3, r#"{"job_title": "Lead"}"#);

        assert_eq!(created.manager_id, 2);
        assert_eq!(created.state, RequestState::Pending);
        assert_eq!(
            created.display_name,
            format!("Profile Change Request #{} - Alex Tester", created.id)
        );
    }

    #[actix_web::test]
    async fn submit_with_wrong_manager_is_bad_request() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/v1/profile-change")
            .insert_header(bearer(3, EMPLOYEE))
            .set_json(json!({ "requested_changes": "{}", "manager_id": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            "the manager must be the direct manager of the employee"
        );
    }

    #[actix_web::test]
    async fn second_pending_submission_is_bad_request() {
        let app = app!();
        submit!(app, 3, r#"{"job_title": "Lead"}"#);

        let req = test::TestRequest::post()
            .uri("/api/v1/profile-change")
            .insert_header(bearer(3, EMPLOYEE))
            .set_json(json!({ "requested_changes": r#"{"phone": "555-0100"}"# }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            "you already have a pending profile change request"
        );
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/v1/profile-change")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn manager_approves_once() {
        let app = app!();
        let created = submit!(app, 3, r#"{"job_title": "Lead"}"#);
        let uri = format!("/api/v1/profile-change/{}/approve", created.id);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(2, EMPLOYEE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let approved: ChangeRequestResponse = test::read_body_json(resp).await;
        assert_eq!(approved.state, RequestState::Approved);
        assert_eq!(approved.approved_by, Some(2));
        assert!(approved.approved_date.is_some());

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(2, EMPLOYEE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "only pending requests can be approved");
    }

    #[actix_web::test]
    async fn only_the_manager_or_hr_decides() {
        let app = app!();
        let created = submit!(app, 3, r#"{"job_title": "Lead"}"#);
        let uri = format!("/api/v1/profile-change/{}/reject", created.id);

        // a colleague with the same manager
        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(4, EMPLOYEE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(1, HR))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let rejected: ChangeRequestResponse = test::read_body_json(resp).await;
        assert_eq!(rejected.state, RequestState::Rejected);
        assert_eq!(rejected.rejected_by, Some(1));
        assert_eq!(rejected.approved_by, None);
    }

    #[actix_web::test]
    async fn malformed_changes_fail_approval_and_stay_pending() {
        let app = app!();
        let created = submit!(app, 3, "{not json");

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/profile-change/{}/approve", created.id))
            .insert_header(bearer(2, EMPLOYEE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/profile-change/{}", created.id))
            .insert_header(bearer(3, EMPLOYEE))
            .to_request();
        let fetched: ChangeRequestResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.state, RequestState::Pending);
    }

    #[actix_web::test]
    async fn listing_is_limited_to_own_requests() {
        let app = app!();
        submit!(app, 3, r#"{"job_title": "Lead"}"#);
        submit!(app, 4, r#"{"phone": "555-0100"}"#);
        submit!(app, 2, r#"{"job_title": "Director"}"#);

        let list = |employee_id: u64, role: u8| {
            test::TestRequest::get()
                .uri("/api/v1/profile-change")
                .insert_header(bearer(employee_id, role))
                .to_request()
        };

        let own: Value = test::call_and_read_body_json(&app, list(4, EMPLOYEE)).await;
        assert_eq!(own["total"], 1);
        assert_eq!(own["data"][0]["employee_id"], 4);

        // manager of 3 and 4, and the employee of the third request
        let managed: Value = test::call_and_read_body_json(&app, list(2, EMPLOYEE)).await;
        assert_eq!(managed["total"], 3);

        let everything: Value = test::call_and_read_body_json(&app, list(1, HR)).await;
        assert_eq!(everything["total"], 3);
    }

    #[actix_web::test]
    async fn outsider_cannot_view_a_request() {
        let app = app!();
        let created = submit!(app, 3, r#"{"job_title": "Lead"}"#);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/profile-change/{}", created.id))
            .insert_header(bearer(4, EMPLOYEE))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn batch_approval_reports_each_request_in_order() {
        let app = app!();
        let mine = submit!(app, 3, r#"{"job_title": "Lead"}"#);
        let not_mine = submit!(app, 2, r#"{"job_title": "Director"}"#);
        let broken = submit!(app, 4, r#"{"salary": 1}"#);

        let req = test::TestRequest::post()
            .uri("/api/v1/profile-change/approve")
            .insert_header(bearer(2, EMPLOYEE))
            .set_json(json!({ "ids": [broken.id, not_mine.id, 999, mine.id] }))
            .to_request();
        let items: Vec<BatchItem> = test::call_and_read_body_json(&app, req).await;

        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![broken.id, not_mine.id, 999, mine.id]);

        assert_eq!(items[0].state, None);
        assert_eq!(
            items[0].error.as_deref(),
            Some("failed to apply changes: unknown employee field 'salary'")
        );
        assert!(items[1].error.is_some());
        assert_eq!(
            items[2].error.as_deref(),
            Some("profile change request #999 not found")
        );
        assert_eq!(items[3].state, Some(RequestState::Approved));
        assert_eq!(items[3].error, None);
    }

    #[actix_web::test]
    async fn reassigning_to_a_non_manager_is_refused() {
        let app = app!();
        let created = submit!(app, 3, r#"{"job_title": "Lead"}"#);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/profile-change/{}/manager", created.id))
            .insert_header(bearer(1, HR))
            .set_json(json!({ "manager_id": 4 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
