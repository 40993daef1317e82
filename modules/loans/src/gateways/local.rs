use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::LoansApi,
    error::LoansError,
    model::{Actor, Material, MaterialKind, NewRequest, Registration, Request, User},
};
use crate::domain::service::Service;

/// Local implementation of the LoansApi trait that delegates to the domain service
pub struct LoansLocalClient {
    service: Arc<Service>,
}

impl LoansLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LoansApi for LoansLocalClient {
    async fn register(&self, registration: Registration) -> Result<User, LoansError> {
        self.service.register(registration).await.map_err(Into::into)
    }

    async fn authenticate(&self, name: &str, password: &str) -> Result<User, LoansError> {
        self.service
            .authenticate(name, password)
            .await
            .map_err(Into::into)
    }

    async fn list_teachers(&self, actor: &Actor) -> Result<Vec<User>, LoansError> {
        self.service.list_teachers(actor).await.map_err(Into::into)
    }

    async fn create_request(
        &self,
        new: NewRequest,
        actor: &Actor,
    ) -> Result<Request, LoansError> {
        self.service
            .create_request(new, actor)
            .await
            .map_err(Into::into)
    }

    async fn get_request(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError> {
        self.service.get_request(id, actor).await.map_err(Into::into)
    }

    async fn list_requests(&self, actor: &Actor) -> Result<Vec<Request>, LoansError> {
        self.service.list_requests(actor).await.map_err(Into::into)
    }

    async fn approve(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError> {
        self.service.approve(id, actor).await.map_err(Into::into)
    }

    async fn deny(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError> {
        self.service.deny(id, actor).await.map_err(Into::into)
    }

    async fn return_item(&self, id: Uuid, actor: &Actor) -> Result<Request, LoansError> {
        self.service.return_item(id, actor).await.map_err(Into::into)
    }

    async fn list_available_materials(
        &self,
        kind: MaterialKind,
        actor: &Actor,
    ) -> Result<Vec<Material>, LoansError> {
        self.service
            .list_available_materials(kind, actor)
            .await
            .map_err(Into::into)
    }

    async fn list_materials(&self, actor: &Actor) -> Result<Vec<Material>, LoansError> {
        self.service.list_materials(actor).await.map_err(Into::into)
    }
}
