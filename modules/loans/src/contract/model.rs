use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// A stored string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums persisted as lowercase text and exchanged as snake_case JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(
    /// Account role.
    Role {
        Teacher => "teacher",
        Technician => "technician",
    }
);

text_enum!(
    /// What a request asks for.
    RequestKind {
        Notebook => "notebook",
        HdmiCable => "hdmi_cable",
        AudioCable => "audio_cable",
        Assistance => "assistance",
    }
);

text_enum!(
    RequestStatus {
        Pending => "pending",
        Approved => "approved",
        Denied => "denied",
        OnLoan => "on_loan",
        Returned => "returned",
    }
);

text_enum!(
    /// Kind of tracked inventory item.
    MaterialKind {
        Notebook => "notebook",
    }
);

text_enum!(
    MaterialStatus {
        Available => "available",
        OnLoan => "on_loan",
    }
);

impl RequestKind {
    /// Kinds that go out on loan when approved.
    pub fn is_loanable(self) -> bool {
        matches!(
            self,
            RequestKind::Notebook | RequestKind::HdmiCable | RequestKind::AudioCable
        )
    }

    /// Inventory kind a request must reserve, if any.
    pub fn tracked_material(self) -> Option<MaterialKind> {
        match self {
            RequestKind::Notebook => Some(MaterialKind::Notebook),
            _ => None,
        }
    }
}

/// Account as seen by other modules. The password hash never leaves the
/// storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn is_technician(&self) -> bool {
        self.role == Role::Technician
    }
}

impl From<&User> for Actor {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            role: u.role,
        }
    }
}

impl From<User> for Actor {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            role: u.role,
        }
    }
}

/// Self-registration data; always yields a teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub password: String,
}

/// Loan or assistance ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: Uuid,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    /// Set exactly when the request leaves `pending`.
    pub technician_id: Option<Uuid>,
    /// Selected inventory item (notebook requests only).
    pub material_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    /// Set once, by the return transition.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Data for filing a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub kind: RequestKind,
    pub description: Option<String>,
    /// Teacher the request is filed for. Required when a technician files it;
    /// ignored for teachers.
    pub teacher_id: Option<Uuid>,
    /// Required for notebook requests.
    pub material_id: Option<Uuid>,
}

/// A physical loanable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub id: Uuid,
    pub kind: MaterialKind,
    pub tag: String,
    pub label: Option<String>,
    pub status: MaterialStatus,
    /// Request currently holding this item.
    pub current_request: Option<Uuid>,
}

/// Outcome of the startup roster seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub technicians_created: usize,
    pub technicians_existing: usize,
    pub materials_created: usize,
    pub materials_existing: usize,
}
