//! Shared fixtures: a fresh migrated in-memory SQLite database per test and a
//! service wired to it with cheap hashing parameters.
#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use loans::contract::model::{Actor, MaterialKind, Material, Registration, Role};
use loans::domain::password::HashingParams;
use loans::domain::seed::SeedRoster;
use loans::domain::service::{ReservationPolicy, Service, ServiceConfig};
use loans::infra::storage::{
    SeaOrmMaterialsRepository, SeaOrmRequestsRepository, SeaOrmUsersRepository,
};

/// Argon2 at its cheapest; debug builds would crawl with the defaults.
pub fn cheap_hashing() -> HashingParams {
    HashingParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

/// Create a fresh test database (in-memory SQLite) and run migrations.
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    // every pooled connection would otherwise get its own empty database
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    loans::module::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn service_on(db: DatabaseConnection, reservation: ReservationPolicy) -> Arc<Service> {
    let config = ServiceConfig {
        reservation,
        hashing: cheap_hashing(),
        ..ServiceConfig::default()
    };
    Arc::new(Service::new(
        Arc::new(SeaOrmUsersRepository::new(db.clone())),
        Arc::new(SeaOrmMaterialsRepository::new(db.clone())),
        Arc::new(SeaOrmRequestsRepository::new(db)),
        config,
    ))
}

/// Migrated, seeded service using the default roster.
pub async fn seeded_service(reservation: ReservationPolicy) -> Arc<Service> {
    let service = service_on(create_test_db().await, reservation);
    service
        .seed(&SeedRoster::default())
        .await
        .expect("Failed to seed");
    service
}

pub async fn technician(service: &Service, name: &str, password: &str) -> Actor {
    let user = service
        .authenticate(name, password)
        .await
        .expect("seeded technician must authenticate");
    assert_eq!(user.role, Role::Technician);
    user.into()
}

pub async fn juanjo(service: &Service) -> Actor {
    technician(service, "Juanjo", "juanjo123").await
}

pub async fn teacher(service: &Service, name: &str) -> Actor {
    service
        .register(Registration {
            name: name.to_string(),
            password: format!("{}-pw", name.to_lowercase()),
        })
        .await
        .expect("registration must succeed")
        .into()
}

pub async fn notebook(service: &Service, actor: &Actor, tag: &str) -> Material {
    let all = service
        .list_available_materials(MaterialKind::Notebook, actor)
        .await
        .expect("listing materials must succeed");
    all.into_iter()
        .find(|m| m.tag == tag)
        .unwrap_or_else(|| panic!("{tag} is not available"))
}

pub async fn material_by_tag(service: &Service, tech: &Actor, tag: &str) -> Material {
    service
        .list_materials(tech)
        .await
        .expect("listing inventory must succeed")
        .into_iter()
        .find(|m| m.tag == tag)
        .unwrap_or_else(|| panic!("{tag} is not in the inventory"))
}
