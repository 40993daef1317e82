use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::rest::auth::CurrentActor;
use crate::api::rest::dto::{
    ActorDto, AvailableQuery, CreateRequestReq, LoginReq, MaterialDto, RegisterReq, RequestDto,
    RequestListDto, UserDto,
};
use crate::api::rest::error::{bad_request, map_domain_error};
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::contract::model::{MaterialKind, Registration};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

type Svc = Extension<Arc<Service>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>, uri: &Uri) -> Result<T, ProblemResponse> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| bad_request(e.body_text(), uri.path()))
}

fn request_id(id: Result<Path<Uuid>, PathRejection>, uri: &Uri) -> Result<Uuid, ProblemResponse> {
    id.map(|Path(v)| v)
        .map_err(|e| bad_request(e.body_text(), uri.path()))
}

/// Register a teacher account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Teacher created", body = UserDto),
        (status = 400, description = "Invalid input", body = Problem),
        (status = 409, description = "Name taken", body = Problem),
    )
)]
pub async fn register(
    uri: Uri,
    Extension(svc): Svc,
    payload: Result<Json<RegisterReq>, JsonRejection>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    let req = body(payload, &uri)?;
    info!(name = %req.name, "Registration attempt");

    if req.password != req.confirm_password {
        let e = DomainError::validation("confirm_password", "passwords do not match");
        return Err(map_domain_error(&e, uri.path()));
    }

    let registration = Registration {
        name: req.name,
        password: req.password,
    };
    match svc.register(registration).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            warn!("Registration failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Check credentials without keeping any session
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Credentials valid", body = UserDto),
        (status = 401, description = "Invalid credentials", body = Problem),
    )
)]
pub async fn login(
    uri: Uri,
    Extension(svc): Svc,
    payload: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let req = body(payload, &uri)?;
    svc.authenticate(&req.name, &req.password)
        .await
        .map(|u| Json(UserDto::from(u)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Authenticated caller", body = ActorDto),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn me(CurrentActor(actor): CurrentActor) -> Json<ActorDto> {
    Json(ActorDto::from(actor))
}

/// List requests visible to the caller
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Requests in creation order", body = RequestListDto),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn list_requests(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<RequestListDto>, ProblemResponse> {
    let requests = svc
        .list_requests(&actor)
        .await
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    let requests: Vec<RequestDto> = requests.into_iter().map(RequestDto::from).collect();
    Ok(Json(RequestListDto {
        total: requests.len(),
        requests,
    }))
}

/// File a new request
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("basic" = [])),
    request_body = CreateRequestReq,
    responses(
        (status = 201, description = "Request filed", body = RequestDto),
        (status = 400, description = "Invalid input", body = Problem),
        (status = 404, description = "Teacher or material not found", body = Problem),
        (status = 409, description = "Material unavailable", body = Problem),
    )
)]
pub async fn create_request(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    payload: Result<Json<CreateRequestReq>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestDto>), ProblemResponse> {
    let req = body(payload, &uri)?;
    info!("Creating {} request as {}", req.kind, actor.name);

    match svc.create_request(req.into(), &actor).await {
        Ok(r) => Ok((StatusCode::CREATED, Json(RequestDto::from(r)))),
        Err(e) => {
            warn!("Failed to create request: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("basic" = [])),
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request found", body = RequestDto),
        (status = 404, description = "Not found", body = Problem),
    )
)]
pub async fn get_request(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RequestDto>, ProblemResponse> {
    let id = request_id(id, &uri)?;
    svc.get_request(id, &actor)
        .await
        .map(|r| Json(RequestDto::from(r)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/requests/{id}/approve",
    tag = "requests",
    security(("basic" = [])),
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved", body = RequestDto),
        (status = 403, description = "Technicians only", body = Problem),
        (status = 404, description = "Not found", body = Problem),
        (status = 409, description = "Not pending or material taken", body = Problem),
    )
)]
pub async fn approve(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RequestDto>, ProblemResponse> {
    let id = request_id(id, &uri)?;
    svc.approve(id, &actor)
        .await
        .map(|r| Json(RequestDto::from(r)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Deny a pending request
#[utoipa::path(
    post,
    path = "/requests/{id}/deny",
    tag = "requests",
    security(("basic" = [])),
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request denied", body = RequestDto),
        (status = 403, description = "Technicians only", body = Problem),
        (status = 404, description = "Not found", body = Problem),
        (status = 409, description = "Not pending", body = Problem),
    )
)]
pub async fn deny(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RequestDto>, ProblemResponse> {
    let id = request_id(id, &uri)?;
    svc.deny(id, &actor)
        .await
        .map(|r| Json(RequestDto::from(r)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Mark a loaned item as returned
#[utoipa::path(
    post,
    path = "/requests/{id}/return",
    tag = "requests",
    security(("basic" = [])),
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Item returned", body = RequestDto),
        (status = 403, description = "Technicians only", body = Problem),
        (status = 404, description = "Not found", body = Problem),
        (status = 409, description = "Not on loan", body = Problem),
    )
)]
pub async fn return_item(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RequestDto>, ProblemResponse> {
    let id = request_id(id, &uri)?;
    svc.return_item(id, &actor)
        .await
        .map(|r| Json(RequestDto::from(r)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Materials of a kind that can be selected right now
#[utoipa::path(
    get,
    path = "/materials/available",
    tag = "materials",
    security(("basic" = [])),
    params(AvailableQuery),
    responses(
        (status = 200, description = "Available materials ordered by tag", body = [MaterialDto]),
        (status = 401, description = "Not authenticated", body = Problem),
    )
)]
pub async fn list_available_materials(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
    query: Result<Query<AvailableQuery>, QueryRejection>,
) -> Result<Json<Vec<MaterialDto>>, ProblemResponse> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text(), uri.path()))?;
    let kind = query.kind.unwrap_or(MaterialKind::Notebook);
    svc.list_available_materials(kind, &actor)
        .await
        .map(|ms| Json(ms.into_iter().map(MaterialDto::from).collect()))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Full inventory
#[utoipa::path(
    get,
    path = "/materials",
    tag = "materials",
    security(("basic" = [])),
    responses(
        (status = 200, description = "All materials ordered by tag", body = [MaterialDto]),
        (status = 403, description = "Technicians only", body = Problem),
    )
)]
pub async fn list_materials(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<MaterialDto>>, ProblemResponse> {
    svc.list_materials(&actor)
        .await
        .map(|ms| Json(ms.into_iter().map(MaterialDto::from).collect()))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

/// Teachers a technician can file requests for
#[utoipa::path(
    get,
    path = "/teachers",
    tag = "auth",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Teacher roster", body = [UserDto]),
        (status = 403, description = "Technicians only", body = Problem),
    )
)]
pub async fn list_teachers(
    uri: Uri,
    Extension(svc): Svc,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<UserDto>>, ProblemResponse> {
    svc.list_teachers(&actor)
        .await
        .map(|us| Json(us.into_iter().map(UserDto::from).collect()))
        .map_err(|e| map_domain_error(&e, uri.path()))
}
