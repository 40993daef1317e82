//! SeaORM-backed implementations of the domain repository ports.
//!
//! The repositories are generic over `C: ConnectionTrait`, so they can be
//! built on a `DatabaseConnection` or on a transaction. Request writes open
//! their own transaction and therefore additionally need `TransactionTrait`.

use anyhow::Context;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{
    Material, MaterialKind, MaterialStatus, Request, RequestStatus, Role, User,
};
use crate::domain::repo::{
    MaterialChange, MaterialsRepository, RepoError, RequestsRepository, StoredUser,
    UsersRepository,
};
use crate::infra::storage::entity::{material, request, user};
use crate::infra::storage::mapper;

/// Unique violations become [`RepoError::Conflict`]; everything else keeps
/// its context.
fn insert_error(err: DbErr, what: &'static str) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => RepoError::Conflict,
        _ => RepoError::Other(anyhow::Error::new(err).context(what)),
    }
}

fn db_error(err: DbErr, what: &'static str) -> RepoError {
    RepoError::Other(anyhow::Error::new(err).context(what))
}

// ---------------------------------------------------------------- users

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let found = user::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find user by id failed")?;
        found
            .map(|m| mapper::user_from_entity(m).map(|s| s.user))
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<StoredUser>> {
        let found = user::Entity::find()
            .filter(user::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("find user by name failed")?;
        found.map(mapper::user_from_entity).transpose()
    }

    async fn name_exists(&self, name: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Name.eq(name))
            .count(&self.conn)
            .await
            .context("name_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, stored: StoredUser) -> Result<(), RepoError> {
        mapper::user_to_active(stored)
            .insert(&self.conn)
            .await
            .map_err(|e| insert_error(e, "insert user failed"))?;
        Ok(())
    }

    async fn list_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let rows = user::Entity::find()
            .filter(user::Column::Role.eq(role.as_str()))
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list users by role failed")?;
        rows.into_iter()
            .map(|m| mapper::user_from_entity(m).map(|s| s.user))
            .collect()
    }
}

// ---------------------------------------------------------------- materials

pub struct SeaOrmMaterialsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmMaterialsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> MaterialsRepository for SeaOrmMaterialsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Material>> {
        let found = material::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find material failed")?;
        found.map(mapper::material_from_entity).transpose()
    }

    async fn tag_exists(&self, tag: &str) -> anyhow::Result<bool> {
        let count = material::Entity::find()
            .filter(material::Column::Tag.eq(tag))
            .count(&self.conn)
            .await
            .context("tag_exists failed")?;
        Ok(count > 0)
    }

    async fn insert(&self, m: Material) -> Result<(), RepoError> {
        mapper::material_to_active(m)
            .insert(&self.conn)
            .await
            .map_err(|e| insert_error(e, "insert material failed"))?;
        Ok(())
    }

    async fn list(
        &self,
        kind: Option<MaterialKind>,
        status: Option<MaterialStatus>,
    ) -> anyhow::Result<Vec<Material>> {
        let mut query = material::Entity::find();
        if let Some(kind) = kind {
            query = query.filter(material::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = status {
            query = query.filter(material::Column::Status.eq(status.as_str()));
        }
        let rows = query
            .order_by_asc(material::Column::Tag)
            .all(&self.conn)
            .await
            .context("list materials failed")?;
        rows.into_iter().map(mapper::material_from_entity).collect()
    }
}

// ---------------------------------------------------------------- requests

pub struct SeaOrmRequestsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRequestsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Apply a material side effect on `conn` (normally the open transaction).
async fn apply_material_change<T>(
    conn: &T,
    request_id: Uuid,
    change: MaterialChange,
) -> Result<(), RepoError>
where
    T: ConnectionTrait,
{
    match change {
        MaterialChange::Keep => Ok(()),
        MaterialChange::Reserve(material_id) => {
            // compare-and-swap on the availability flag
            let res = material::Entity::update_many()
                .col_expr(
                    material::Column::Status,
                    Expr::value(MaterialStatus::OnLoan.as_str()),
                )
                .col_expr(material::Column::CurrentRequest, Expr::value(Some(request_id)))
                .filter(material::Column::Id.eq(material_id))
                .filter(material::Column::Status.eq(MaterialStatus::Available.as_str()))
                .exec(conn)
                .await
                .map_err(|e| db_error(e, "reserve material failed"))?;
            if res.rows_affected == 0 {
                return Err(RepoError::MaterialTaken(material_id));
            }
            debug!(%material_id, %request_id, "Material reserved");
            Ok(())
        }
        MaterialChange::Release => {
            let res = material::Entity::update_many()
                .col_expr(
                    material::Column::Status,
                    Expr::value(MaterialStatus::Available.as_str()),
                )
                .col_expr(material::Column::CurrentRequest, Expr::value(None::<Uuid>))
                .filter(material::Column::CurrentRequest.eq(request_id))
                .exec(conn)
                .await
                .map_err(|e| db_error(e, "release material failed"))?;
            debug!(%request_id, released = res.rows_affected, "Material released");
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl<C> RequestsRepository for SeaOrmRequestsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Request>> {
        let found = request::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find request failed")?;
        found.map(mapper::request_from_entity).transpose()
    }

    async fn list(&self, teacher_id: Option<Uuid>) -> anyhow::Result<Vec<Request>> {
        let mut query = request::Entity::find();
        if let Some(teacher_id) = teacher_id {
            query = query.filter(request::Column::TeacherId.eq(teacher_id));
        }
        let rows = query
            .order_by_asc(request::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list requests failed")?;
        rows.into_iter().map(mapper::request_from_entity).collect()
    }

    async fn insert(&self, r: Request, change: MaterialChange) -> Result<(), RepoError> {
        let id = r.id;
        let txn = self
            .conn
            .begin()
            .await
            .map_err(|e| db_error(e, "begin transaction failed"))?;

        // the row must exist before a material can point at it
        mapper::request_to_active(r)
            .insert(&txn)
            .await
            .map_err(|e| insert_error(e, "insert request failed"))?;
        apply_material_change(&txn, id, change).await?;

        txn.commit()
            .await
            .map_err(|e| db_error(e, "commit failed"))?;
        Ok(())
    }

    async fn transition(
        &self,
        expected: RequestStatus,
        r: Request,
        change: MaterialChange,
    ) -> Result<(), RepoError> {
        let txn = self
            .conn
            .begin()
            .await
            .map_err(|e| db_error(e, "begin transaction failed"))?;

        let res = request::Entity::update_many()
            .set(mapper::request_transition_active(&r))
            .filter(request::Column::Id.eq(r.id))
            .filter(request::Column::Status.eq(expected.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| db_error(e, "update request failed"))?;
        if res.rows_affected == 0 {
            // dropping the transaction rolls it back
            return Err(RepoError::StaleRequest(r.id));
        }

        apply_material_change(&txn, r.id, change).await?;

        txn.commit()
            .await
            .map_err(|e| db_error(e, "commit failed"))?;
        Ok(())
    }
}
