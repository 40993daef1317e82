use std::sync::Arc;

use axum::{routing::get, routing::post, Extension, Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers, problem};
use crate::contract::model::{MaterialKind, MaterialStatus, RequestKind, RequestStatus, Role};
use crate::domain::service::Service;

#[derive(OpenApi)]
#[openapi(
    info(title = "Equiploan API", description = "Equipment loan requests and notebook inventory"),
    paths(
        handlers::register,
        handlers::login,
        handlers::me,
        handlers::list_requests,
        handlers::create_request,
        handlers::get_request,
        handlers::approve,
        handlers::deny,
        handlers::return_item,
        handlers::list_available_materials,
        handlers::list_materials,
        handlers::list_teachers,
    ),
    components(schemas(
        problem::Problem,
        problem::FieldError,
        dto::UserDto,
        dto::ActorDto,
        dto::RequestDto,
        dto::MaterialDto,
        Role,
        RequestKind,
        RequestStatus,
        MaterialKind,
        MaterialStatus,
    )),
    modifiers(&BasicAuth),
    tags(
        (name = "auth", description = "Accounts and credentials"),
        (name = "requests", description = "Loan and assistance requests"),
        (name = "materials", description = "Tracked inventory"),
    )
)]
pub struct ApiDoc;

struct BasicAuth;

impl Modify for BasicAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Mount the loans routes on `router`. The service travels to handlers and
/// to the Basic-auth extractor as a request extension.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/me", get(handlers::me))
        .route(
            "/requests",
            get(handlers::list_requests).post(handlers::create_request),
        )
        .route("/requests/{id}", get(handlers::get_request))
        .route("/requests/{id}/approve", post(handlers::approve))
        .route("/requests/{id}/deny", post(handlers::deny))
        .route("/requests/{id}/return", post(handlers::return_item))
        .route(
            "/materials/available",
            get(handlers::list_available_materials),
        )
        .route("/materials", get(handlers::list_materials))
        .route("/teachers", get(handlers::list_teachers))
        .route("/openapi.json", get(openapi_json))
        .layer(Extension(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/auth/register",
            "/auth/login",
            "/me",
            "/requests",
            "/requests/{id}",
            "/requests/{id}/approve",
            "/requests/{id}/deny",
            "/requests/{id}/return",
            "/materials/available",
            "/materials",
            "/teachers",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("basic"));
    }
}
