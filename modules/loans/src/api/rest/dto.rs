use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::{
    Actor, Material, MaterialKind, MaterialStatus, NewRequest, Request, RequestKind,
    RequestStatus, Role, User,
};

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorDto {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

/// Self-registration form; always creates a teacher
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub name: String,
    pub password: String,
}

/// REST DTO for filing a request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRequestReq {
    pub kind: RequestKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Teacher the request is for; required when a technician files it.
    #[serde(default)]
    pub teacher_id: Option<Uuid>,
    /// Notebook to reserve; required for notebook requests.
    #[serde(default)]
    pub material_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDto {
    pub id: Uuid,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub material_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestListDto {
    pub requests: Vec<RequestDto>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MaterialDto {
    pub id: Uuid,
    pub kind: MaterialKind,
    pub tag: String,
    pub label: Option<String>,
    pub status: MaterialStatus,
    pub current_request: Option<Uuid>,
}

/// Query for `GET /materials/available`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableQuery {
    /// Material kind, defaults to `notebook`
    pub kind: Option<MaterialKind>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<Actor> for ActorDto {
    fn from(actor: Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name,
            role: actor.role,
        }
    }
}

impl From<CreateRequestReq> for NewRequest {
    fn from(req: CreateRequestReq) -> Self {
        Self {
            kind: req.kind,
            description: req.description,
            teacher_id: req.teacher_id,
            material_id: req.material_id,
        }
    }
}

impl From<Request> for RequestDto {
    fn from(r: Request) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
            status: r.status,
            description: r.description,
            teacher_id: r.teacher_id,
            technician_id: r.technician_id,
            material_id: r.material_id,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        }
    }
}

impl From<Material> for MaterialDto {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            kind: m.kind,
            tag: m.tag,
            label: m.label,
            status: m.status,
            current_request: m.current_request,
        }
    }
}
