use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{
    Material, MaterialKind, MaterialStatus, Request, RequestStatus, Role, User,
};

/// Write failures the domain reacts to. Anything else is `Other`.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated")]
    Conflict,
    #[error("material {0} is no longer available")]
    MaterialTaken(Uuid),
    #[error("request {0} was modified concurrently")]
    StaleRequest(Uuid),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A user row including its credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

/// Inventory side effect committed in the same transaction as a request write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialChange {
    Keep,
    /// Flip the material from `available` to `on_loan` and point it at the
    /// request. Fails with [`RepoError::MaterialTaken`] if it is not available.
    Reserve(Uuid),
    /// Return whatever material points at the request to `available`.
    Release,
}

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Exact, case-sensitive lookup by login name.
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<StoredUser>>;
    async fn name_exists(&self, name: &str) -> anyhow::Result<bool>;
    /// Fails with [`RepoError::Conflict`] when the name is taken.
    async fn insert(&self, user: StoredUser) -> Result<(), RepoError>;
    /// Users with the given role, oldest first.
    async fn list_by_role(&self, role: Role) -> anyhow::Result<Vec<User>>;
}

#[async_trait]
pub trait MaterialsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Material>>;
    async fn tag_exists(&self, tag: &str) -> anyhow::Result<bool>;
    /// Fails with [`RepoError::Conflict`] when the tag is taken.
    async fn insert(&self, material: Material) -> Result<(), RepoError>;
    /// Materials ordered by tag, optionally filtered.
    async fn list(
        &self,
        kind: Option<MaterialKind>,
        status: Option<MaterialStatus>,
    ) -> anyhow::Result<Vec<Material>>;
}

/// Request persistence. Every write runs in a single transaction together
/// with its [`MaterialChange`].
#[async_trait]
pub trait RequestsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Request>>;
    /// Requests in creation order, optionally restricted to one teacher.
    async fn list(&self, teacher_id: Option<Uuid>) -> anyhow::Result<Vec<Request>>;
    async fn insert(&self, request: Request, change: MaterialChange) -> Result<(), RepoError>;
    /// Overwrite the stored request if its status is still `expected`;
    /// otherwise fail with [`RepoError::StaleRequest`] and change nothing.
    async fn transition(
        &self,
        expected: RequestStatus,
        request: Request,
        change: MaterialChange,
    ) -> Result<(), RepoError>;
}
