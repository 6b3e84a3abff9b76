use crate::{
    api::{employee, profile_change_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let burst = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // only fails for a zero period or burst, both excluded above
        .expect("valid rate limiter settings");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(login_limiter)
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .configure(employee_routes)
            .configure(profile_change_routes),
    );
}

pub fn employee_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employee")
            // /employee/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(employee::get_employee))
                    .route(web::delete().to(employee::delete_employee)),
            ),
    );
}

pub fn profile_change_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile-change")
            // /profile-change
            .service(
                web::resource("")
                    .route(web::get().to(profile_change_request::list_requests))
                    .route(web::post().to(profile_change_request::submit_request)),
            )
            // batch decisions, registered before /{id}
            .service(
                web::resource("/approve")
                    .route(web::post().to(profile_change_request::approve_batch)),
            )
            .service(
                web::resource("/reject")
                    .route(web::post().to(profile_change_request::reject_batch)),
            )
            // /profile-change/{id}
            .service(
                web::resource("/{id}").route(web::get().to(profile_change_request::get_request)),
            )
            // /profile-change/{id}/approve
            .service(
                web::resource("/{id}/approve")
                    .route(web::put().to(profile_change_request::approve_request)),
            )
            // /profile-change/{id}/reject
            .service(
                web::resource("/{id}/reject")
                    .route(web::put().to(profile_change_request::reject_request)),
            )
            // /profile-change/{id}/manager
            .service(
                web::resource("/{id}/manager")
                    .route(web::put().to(profile_change_request::reassign_manager)),
            ),
    );
}
