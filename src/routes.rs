use crate::{
    api::{
        attendance, certificate, contract, dashboard, document_request, employee, leave_request,
        message,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes. Literal segments go before `/{id}` so they are not
    // swallowed by the path parameter.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/employee")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out))
                            .route(web::get().to(attendance::attendance_board)),
                    )
                    .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/certificates")
                    .service(
                        web::resource("")
                            .route(web::post().to(certificate::create_certificate))
                            .route(web::get().to(certificate::list_certificates)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(certificate::get_certificate)),
                    )
                    .service(
                        web::resource("/{id}/issue")
                            .route(web::put().to(certificate::issue_certificate)),
                    ),
            )
            .service(
                web::scope("/contracts")
                    .service(
                        web::resource("")
                            .route(web::post().to(contract::create_contract))
                            .route(web::get().to(contract::list_contracts)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(contract::get_contract)))
                    .service(
                        web::resource("/{id}/sign").route(web::put().to(contract::sign_contract)),
                    ),
            )
            .service(
                web::scope("/documents")
                    .service(
                        web::resource("")
                            .route(web::post().to(document_request::create_document_request))
                            .route(web::get().to(document_request::list_document_requests)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(document_request::get_document_request))
                            .route(web::delete().to(document_request::delete_document_request)),
                    )
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::put().to(document_request::submit_document)),
                    ),
            )
            .service(
                web::scope("/messages")
                    .service(
                        web::resource("")
                            .route(web::post().to(message::send_message))
                            .route(web::get().to(message::list_messages)),
                    )
                    .service(
                        web::resource("/unread-count").route(web::get().to(message::unread_count)),
                    )
                    .service(
                        web::resource("/read-all").route(web::put().to(message::mark_all_read)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(message::get_message)))
                    .service(web::resource("/{id}/read").route(web::put().to(message::mark_read))),
            )
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard))),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, the old refresh token is revoked
