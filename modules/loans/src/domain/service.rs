use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    Actor, Material, MaterialKind, MaterialStatus, NewRequest, Registration, Request,
    RequestStatus, Role, User,
};
use crate::domain::error::DomainError;
use crate::domain::password::{hash_password, verify_password, HashingParams};
use crate::domain::repo::{
    MaterialChange, MaterialsRepository, RepoError, RequestsRepository, StoredUser,
    UsersRepository,
};

/// When a notebook request takes its material out of the available pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPolicy {
    /// Reserve while filing the request, before any technician looks at it.
    #[default]
    AtCreation,
    /// Reserve when a technician approves the request.
    AtApproval,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub reservation: ReservationPolicy,
    pub hashing: HashingParams,
    pub max_name_length: usize,
    pub max_description_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reservation: ReservationPolicy::default(),
            hashing: HashingParams::default(),
            max_name_length: 120,
            max_description_length: 2000,
        }
    }
}

/// Domain service owning accounts, the request lifecycle and the notebook
/// inventory. Depends only on the repository ports.
#[derive(Clone)]
pub struct Service {
    pub(crate) users: Arc<dyn UsersRepository>,
    pub(crate) materials: Arc<dyn MaterialsRepository>,
    requests: Arc<dyn RequestsRepository>,
    config: ServiceConfig,
    // hash checked for unknown names so a miss costs the same as a mismatch
    dummy_hash: Arc<OnceCell<String>>,
}

fn internal(e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("{e:#}"))
}

impl Service {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        materials: Arc<dyn MaterialsRepository>,
        requests: Arc<dyn RequestsRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            users,
            materials,
            requests,
            config,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // --- identity ---

    #[instrument(name = "loans.service.register", skip(self, reg), fields(name = %reg.name))]
    pub async fn register(&self, reg: Registration) -> Result<User, DomainError> {
        info!("Registering teacher");

        let name = self.validate_name(&reg.name)?;
        if reg.password.is_empty() {
            return Err(DomainError::validation("password", "must not be empty"));
        }

        if self.users.name_exists(&name).await.map_err(internal)? {
            return Err(DomainError::duplicate_user(name));
        }

        let password_hash = self.hash(reg.password).await?;
        let user = User {
            id: Uuid::new_v4(),
            name,
            role: Role::Teacher,
            created_at: Utc::now(),
        };

        match self
            .users
            .insert(StoredUser {
                user: user.clone(),
                password_hash,
            })
            .await
        {
            Ok(()) => {}
            // lost a race against another registration with the same name
            Err(RepoError::Conflict) => return Err(DomainError::duplicate_user(user.name)),
            Err(e) => return Err(internal(e)),
        }

        info!(user_id = %user.id, "Teacher registered");
        Ok(user)
    }

    #[instrument(name = "loans.service.authenticate", skip(self, password), fields(name = %name))]
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<User, DomainError> {
        debug!("Authenticating");

        let stored = self.users.find_by_name(name).await.map_err(internal)?;
        match stored {
            Some(s) => {
                if self.verify(password, s.password_hash).await {
                    Ok(s.user)
                } else {
                    warn!("Password mismatch");
                    Err(DomainError::InvalidCredentials)
                }
            }
            None => {
                let dummy = self.dummy_hash().await;
                let _ = self.verify(password, dummy).await;
                warn!("Unknown user");
                Err(DomainError::InvalidCredentials)
            }
        }
    }

    /// Teachers a technician can file requests for.
    #[instrument(name = "loans.service.list_teachers", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_teachers(&self, actor: &Actor) -> Result<Vec<User>, DomainError> {
        require_technician(actor, "list teachers")?;
        self.users
            .list_by_role(Role::Teacher)
            .await
            .map_err(internal)
    }

    // --- requests ---

    #[instrument(
        name = "loans.service.create_request",
        skip(self, new, actor),
        fields(kind = %new.kind, actor_id = %actor.id)
    )]
    pub async fn create_request(
        &self,
        new: NewRequest,
        actor: &Actor,
    ) -> Result<Request, DomainError> {
        info!("Creating request");

        let description = self.validate_description(new.description)?;

        let teacher_id = match actor.role {
            // teachers always file for themselves
            Role::Teacher => actor.id,
            Role::Technician => {
                let target = new.teacher_id.ok_or(DomainError::MissingTarget)?;
                let teacher = self
                    .users
                    .find_by_id(target)
                    .await
                    .map_err(internal)?
                    .ok_or_else(|| DomainError::teacher_not_found(target))?;
                if teacher.role != Role::Teacher {
                    return Err(DomainError::validation(
                        "teacher_id",
                        format!("'{}' is not a teacher", teacher.name),
                    ));
                }
                teacher.id
            }
        };

        let material_id = match new.kind.tracked_material() {
            Some(kind) => {
                let id = new
                    .material_id
                    .ok_or(DomainError::MissingMaterialSelection)?;
                self.check_selectable(id, kind).await?;
                Some(id)
            }
            None => None,
        };

        let request = Request {
            id: Uuid::new_v4(),
            kind: new.kind,
            status: RequestStatus::Pending,
            description,
            teacher_id,
            technician_id: None,
            material_id,
            created_at: Utc::now(),
            resolved_at: None,
        };

        let change = match (material_id, self.config.reservation) {
            (Some(m), ReservationPolicy::AtCreation) => MaterialChange::Reserve(m),
            _ => MaterialChange::Keep,
        };

        self.requests
            .insert(request.clone(), change)
            .await
            .map_err(|e| write_error(e, &request, "create"))?;

        info!(request_id = %request.id, teacher_id = %teacher_id, "Request created");
        Ok(request)
    }

    /// A teacher only sees their own requests; other ids read as missing.
    #[instrument(name = "loans.service.get_request", skip(self, actor), fields(request_id = %id, actor_id = %actor.id))]
    pub async fn get_request(&self, id: Uuid, actor: &Actor) -> Result<Request, DomainError> {
        let request = self.load_request(id).await?;
        if !actor.is_technician() && request.teacher_id != actor.id {
            return Err(DomainError::request_not_found(id));
        }
        Ok(request)
    }

    #[instrument(name = "loans.service.list_requests", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_requests(&self, actor: &Actor) -> Result<Vec<Request>, DomainError> {
        debug!("Listing requests");

        let scope = match actor.role {
            Role::Teacher => Some(actor.id),
            Role::Technician => None,
        };
        let requests = self.requests.list(scope).await.map_err(internal)?;

        debug!("Listed {} requests", requests.len());
        Ok(requests)
    }

    #[instrument(name = "loans.service.approve", skip(self, actor), fields(request_id = %id, actor_id = %actor.id))]
    pub async fn approve(&self, id: Uuid, actor: &Actor) -> Result<Request, DomainError> {
        info!("Approving request");
        require_technician(actor, "approve requests")?;

        let current = self.load_request(id).await?;
        if current.status != RequestStatus::Pending {
            return Err(DomainError::invalid_transition(id, current.status, "approve"));
        }

        let mut next = current.clone();
        next.technician_id = Some(actor.id);
        next.status = if current.kind.is_loanable() {
            RequestStatus::OnLoan
        } else {
            RequestStatus::Approved
        };

        let change = match (current.material_id, self.config.reservation) {
            (Some(m), ReservationPolicy::AtApproval) => MaterialChange::Reserve(m),
            _ => MaterialChange::Keep,
        };

        self.requests
            .transition(RequestStatus::Pending, next.clone(), change)
            .await
            .map_err(|e| write_error(e, &current, "approve"))?;

        info!(status = %next.status, "Request approved");
        Ok(next)
    }

    /// Deny a pending request. A material the request reserved goes back to
    /// the pool in the same transaction.
    #[instrument(name = "loans.service.deny", skip(self, actor), fields(request_id = %id, actor_id = %actor.id))]
    pub async fn deny(&self, id: Uuid, actor: &Actor) -> Result<Request, DomainError> {
        info!("Denying request");
        require_technician(actor, "deny requests")?;

        let current = self.load_request(id).await?;
        if current.status != RequestStatus::Pending {
            return Err(DomainError::invalid_transition(id, current.status, "deny"));
        }

        let mut next = current.clone();
        next.technician_id = Some(actor.id);
        next.status = RequestStatus::Denied;

        let change = if current.material_id.is_some() {
            MaterialChange::Release
        } else {
            MaterialChange::Keep
        };

        self.requests
            .transition(RequestStatus::Pending, next.clone(), change)
            .await
            .map_err(|e| write_error(e, &current, "deny"))?;

        info!("Request denied");
        Ok(next)
    }

    #[instrument(name = "loans.service.return_item", skip(self, actor), fields(request_id = %id, actor_id = %actor.id))]
    pub async fn return_item(&self, id: Uuid, actor: &Actor) -> Result<Request, DomainError> {
        info!("Marking request returned");
        require_technician(actor, "return items")?;

        let current = self.load_request(id).await?;
        if current.status != RequestStatus::OnLoan {
            return Err(DomainError::invalid_transition(id, current.status, "return"));
        }

        let mut next = current.clone();
        next.status = RequestStatus::Returned;
        next.resolved_at = Some(Utc::now());

        let change = if current.kind.tracked_material().is_some() {
            MaterialChange::Release
        } else {
            MaterialChange::Keep
        };

        self.requests
            .transition(RequestStatus::OnLoan, next.clone(), change)
            .await
            .map_err(|e| write_error(e, &current, "return"))?;

        info!("Request returned");
        Ok(next)
    }

    // --- inventory ---

    #[instrument(name = "loans.service.list_available_materials", skip(self, actor), fields(kind = %kind, actor_id = %actor.id))]
    pub async fn list_available_materials(
        &self,
        kind: MaterialKind,
        actor: &Actor,
    ) -> Result<Vec<Material>, DomainError> {
        self.materials
            .list(Some(kind), Some(MaterialStatus::Available))
            .await
            .map_err(internal)
    }

    /// Full inventory including items out on loan.
    #[instrument(name = "loans.service.list_materials", skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn list_materials(&self, actor: &Actor) -> Result<Vec<Material>, DomainError> {
        require_technician(actor, "view the inventory")?;
        self.materials.list(None, None).await.map_err(internal)
    }

    // --- helpers ---

    async fn load_request(&self, id: Uuid) -> Result<Request, DomainError> {
        self.requests
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| DomainError::request_not_found(id))
    }

    async fn check_selectable(&self, id: Uuid, kind: MaterialKind) -> Result<(), DomainError> {
        let material = self
            .materials
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| DomainError::material_not_found(id))?;

        if material.kind != kind {
            return Err(DomainError::validation(
                "material_id",
                format!("'{}' is not a {}", material.tag, kind),
            ));
        }
        if material.status != MaterialStatus::Available {
            return Err(DomainError::material_unavailable(id, material.status));
        }
        Ok(())
    }

    pub(crate) async fn hash(&self, password: String) -> Result<String, DomainError> {
        let params = self.config.hashing;
        tokio::task::spawn_blocking(move || hash_password(&password, &params))
            .await
            .map_err(internal)?
            .map_err(internal)
    }

    async fn verify(&self, password: &str, hash: String) -> bool {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or(false)
    }

    async fn dummy_hash(&self) -> String {
        if let Some(h) = self.dummy_hash.get() {
            return h.clone();
        }
        let h = self
            .hash("not-a-real-password".to_owned())
            .await
            .unwrap_or_default();
        let _ = self.dummy_hash.set(h.clone());
        h
    }

    fn validate_name(&self, raw: &str) -> Result<String, DomainError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if name.chars().count() > self.config.max_name_length {
            return Err(DomainError::validation(
                "name",
                format!("longer than {} characters", self.config.max_name_length),
            ));
        }
        if name.contains(':') {
            // the Basic credential separator
            return Err(DomainError::validation("name", "must not contain ':'"));
        }
        Ok(name.to_owned())
    }

    fn validate_description(&self, raw: Option<String>) -> Result<Option<String>, DomainError> {
        let Some(text) = raw else { return Ok(None) };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if text.chars().count() > self.config.max_description_length {
            return Err(DomainError::validation(
                "description",
                format!(
                    "longer than {} characters",
                    self.config.max_description_length
                ),
            ));
        }
        Ok(Some(text.to_owned()))
    }
}

fn require_technician(actor: &Actor, action: &'static str) -> Result<(), DomainError> {
    if actor.is_technician() {
        Ok(())
    } else {
        warn!(actor_id = %actor.id, "Forbidden: {}", action);
        Err(DomainError::forbidden(action))
    }
}

/// Translate a failed request write. `current` is the state the write
/// expected to find.
fn write_error(e: RepoError, current: &Request, action: &'static str) -> DomainError {
    match e {
        RepoError::MaterialTaken(id) => DomainError::material_unavailable(id, MaterialStatus::OnLoan),
        RepoError::StaleRequest(id) => DomainError::invalid_transition(id, current.status, action),
        other => internal(other),
    }
}
