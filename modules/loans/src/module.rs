use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::LoansConfig;
use crate::contract::client::LoansApi;
use crate::contract::model::SeedReport;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::LoansLocalClient;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::{
    SeaOrmMaterialsRepository, SeaOrmRequestsRepository, SeaOrmUsersRepository,
};

/// The loans module: schema, seeded roster, domain service and REST routes
/// over one database connection.
#[derive(Clone)]
pub struct Loans {
    service: Arc<Service>,
    seed_report: SeedReport,
}

impl Loans {
    /// Migrate, wire repositories into the service and seed the roster.
    pub async fn init(db: DatabaseConnection, cfg: LoansConfig) -> anyhow::Result<Self> {
        info!("Initializing loans module");
        debug!(reservation = ?cfg.reservation, "Loaded loans config");

        migrate(&db).await?;

        let service_config = ServiceConfig {
            reservation: cfg.reservation,
            hashing: cfg.password_hash,
            ..ServiceConfig::default()
        };
        let service = Arc::new(Service::new(
            Arc::new(SeaOrmUsersRepository::new(db.clone())),
            Arc::new(SeaOrmMaterialsRepository::new(db.clone())),
            Arc::new(SeaOrmRequestsRepository::new(db)),
            service_config,
        ));

        let seed_report = service
            .seed(&cfg.roster())
            .await
            .context("seeding the roster failed")?;
        info!(?seed_report, "Loans module ready");

        Ok(Self {
            service,
            seed_report,
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules
    pub fn client(&self) -> Arc<dyn LoansApi> {
        Arc::new(LoansLocalClient::new(self.service.clone()))
    }

    pub fn seed_report(&self) -> SeedReport {
        self.seed_report
    }

    pub fn register_rest(&self, router: axum::Router) -> axum::Router {
        info!("Registering loans REST routes");
        routes::register_routes(router, self.service.clone())
    }
}

/// Bring the schema up to date.
pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("Running loans database migrations");
    Migrator::up(db, None)
        .await
        .context("loans migrations failed")?;
    info!("Loans database migrations completed successfully");
    Ok(())
}
