use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::LoansError,
    model::{Actor, Material, MaterialKind, NewRequest, Registration, Request, User},
};

/// Public API of the loans module for in-process callers.
#[async_trait]
pub trait LoansApi: Send + Sync {
    /// Create a teacher account
    async fn register(&self, registration: Registration) -> Result<User, LoansError>;

    /// Check a name/password pair
    async fn authenticate(&self, name: &str, password: &str) -> Result<User, LoansError>;

    async fn list_teachers(&self, actor: &Actor) -> Result<Vec<User>, LoansError>;

    /// File a request, for the caller or (technicians) for a teacher
    async fn create_request(&self, new: NewRequest, actor: &Actor)
        -> Result<Request, LoansError>;

    async fn get_request(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError>;

    /// Teachers get their own requests, technicians get every request
    async fn list_requests(&self, actor: &Actor) -> Result<Vec<Request>, LoansError>;

    async fn approve(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError>;

    async fn deny(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError>;

    async fn return_item(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError>;

    async fn list_available_materials(
        &self,
        kind: MaterialKind,
        actor: &Actor,
    ) -> Result<Vec<Material>, LoansError>;

    async fn list_materials(&self, actor: &Actor) -> Result<Vec<Material>, LoansError>;
}
