use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::profile_change_request::ChangeRequest;
use crate::model::role::Role;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized,
    http::header::{self, HeaderMap},
    web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;

    value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already resolved by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req.headers()) {
            Ok(t) => t,
            Err(message) => return ready(Err(ErrorUnauthorized(message))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        ready(AuthUser::from_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn from_token(token: &str, secret: &str) -> Result<Self, &'static str> {
        let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.oversees_all_requests() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    /// The acting user's employee record, required to submit or decide.
    pub fn require_employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Employee or manager of the request, or HR/Admin.
    pub fn require_can_view(&self, request: &ChangeRequest) -> actix_web::Result<()> {
        let involved = self.employee_id.is_some_and(|id| request.involves(id));
        if involved || self.role.oversees_all_requests() {
            Ok(())
        } else {
            Err(ErrorForbidden("Not a party to this request"))
        }
    }

    /// The request's manager, or HR/Admin. Returns the employee id the
    /// decision is attributed to.
    pub fn require_can_decide(&self, request: &ChangeRequest) -> actix_web::Result<u64> {
        let employee_id = self.require_employee()?;
        if employee_id == request.manager_id || self.role.oversees_all_requests() {
            Ok(employee_id)
        } else {
            Err(ErrorForbidden("Only the employee's manager or HR can decide"))
        }
    }
}
