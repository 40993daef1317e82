use anyhow::Context;
use sea_orm::Set;

use crate::contract::model::{Material, Request, User};
use crate::domain::repo::StoredUser;
use crate::infra::storage::entity::{material, request, user};

/// Convert a user row to the domain pair; fails on an unknown role string.
pub fn user_from_entity(entity: user::Model) -> anyhow::Result<StoredUser> {
    let role = entity
        .role
        .parse()
        .with_context(|| format!("user {} has a corrupt role", entity.id))?;
    Ok(StoredUser {
        user: User {
            id: entity.id,
            name: entity.name,
            role,
            created_at: entity.created_at,
        },
        password_hash: entity.password_hash,
    })
}

pub fn user_to_active(stored: StoredUser) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(stored.user.id),
        name: Set(stored.user.name),
        password_hash: Set(stored.password_hash),
        role: Set(stored.user.role.as_str().to_string()),
        created_at: Set(stored.user.created_at),
    }
}

pub fn request_from_entity(entity: request::Model) -> anyhow::Result<Request> {
    let kind = entity
        .kind
        .parse()
        .with_context(|| format!("request {} has a corrupt kind", entity.id))?;
    let status = entity
        .status
        .parse()
        .with_context(|| format!("request {} has a corrupt status", entity.id))?;
    Ok(Request {
        id: entity.id,
        kind,
        status,
        description: entity.description,
        teacher_id: entity.teacher_id,
        technician_id: entity.technician_id,
        material_id: entity.material_id,
        created_at: entity.created_at,
        resolved_at: entity.resolved_at,
    })
}

pub fn request_to_active(r: Request) -> request::ActiveModel {
    request::ActiveModel {
        id: Set(r.id),
        kind: Set(r.kind.as_str().to_string()),
        status: Set(r.status.as_str().to_string()),
        description: Set(r.description),
        teacher_id: Set(r.teacher_id),
        technician_id: Set(r.technician_id),
        material_id: Set(r.material_id),
        created_at: Set(r.created_at),
        resolved_at: Set(r.resolved_at),
    }
}

/// Columns a transition may change. Identity, kind, owner and creation time
/// stay as inserted.
pub fn request_transition_active(r: &Request) -> request::ActiveModel {
    request::ActiveModel {
        status: Set(r.status.as_str().to_string()),
        technician_id: Set(r.technician_id),
        resolved_at: Set(r.resolved_at),
        ..Default::default()
    }
}

pub fn material_from_entity(entity: material::Model) -> anyhow::Result<Material> {
    let kind = entity
        .kind
        .parse()
        .with_context(|| format!("material {} has a corrupt kind", entity.id))?;
    let status = entity
        .status
        .parse()
        .with_context(|| format!("material {} has a corrupt status", entity.id))?;
    Ok(Material {
        id: entity.id,
        kind,
        tag: entity.tag,
        label: entity.label,
        status,
        current_request: entity.current_request,
    })
}

pub fn material_to_active(m: Material) -> material::ActiveModel {
    material::ActiveModel {
        id: Set(m.id),
        kind: Set(m.kind.as_str().to_string()),
        tag: Set(m.tag),
        label: Set(m.label),
        status: Set(m.status.as_str().to_string()),
        current_request: Set(m.current_request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{RequestKind, RequestStatus, Role};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn corrupt_status_is_reported_not_defaulted() {
        let row = request::Model {
            id: Uuid::new_v4(),
            kind: "notebook".into(),
            status: "lost".into(),
            description: None,
            teacher_id: Uuid::new_v4(),
            technician_id: None,
            material_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        let err = request_from_entity(row).unwrap_err();
        assert!(format!("{err:#}").contains("unknown RequestStatus value 'lost'"));
    }

    #[test]
    fn user_row_maps_role_text() {
        let row = user::Model {
            id: Uuid::new_v4(),
            name: "Lucas".into(),
            password_hash: "$argon2id$...".into(),
            role: "technician".into(),
            created_at: Utc::now(),
        };
        let stored = user_from_entity(row).unwrap();
        assert_eq!(stored.user.role, Role::Technician);
        assert_eq!(stored.password_hash, "$argon2id$...");
    }

    #[test]
    fn stored_text_matches_enum_names() {
        let r = Request {
            id: Uuid::new_v4(),
            kind: RequestKind::HdmiCable,
            status: RequestStatus::OnLoan,
            description: None,
            teacher_id: Uuid::new_v4(),
            technician_id: None,
            material_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        let am = request_to_active(r);
        assert_eq!(am.kind, Set("hdmi_cable".to_string()));
        assert_eq!(am.status, Set("on_loan".to_string()));
    }
}
