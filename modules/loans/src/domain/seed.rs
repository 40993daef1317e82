use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{Material, MaterialKind, MaterialStatus, Role, SeedReport, User};
use crate::domain::error::DomainError;
use crate::domain::repo::{RepoError, StoredUser};
use crate::domain::service::Service;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTechnician {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNotebook {
    pub tag: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Accounts and inventory that must exist before the service takes traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedRoster {
    pub technicians: Vec<SeedTechnician>,
    pub notebooks: Vec<SeedNotebook>,
}

impl Default for SeedRoster {
    fn default() -> Self {
        let technicians = [
            ("Juanjo", "juanjo123"),
            ("Lucas", "lucas123"),
            ("Jorge", "jorge123"),
            ("Alexander", "alexander123"),
        ]
        .into_iter()
        .map(|(name, password)| SeedTechnician {
            name: name.to_string(),
            password: password.to_string(),
        })
        .collect();

        let notebooks = (1..=5)
            .map(|n| SeedNotebook {
                tag: format!("NB{n:03}"),
                label: Some(format!("Notebook {n}")),
            })
            .collect();

        Self {
            technicians,
            notebooks,
        }
    }
}

impl Service {
    /// Insert whatever part of the roster is missing. Existing names and tags
    /// are left exactly as they are, so running this on every start is safe.
    #[instrument(
        name = "loans.service.seed",
        skip(self, roster),
        fields(technicians = roster.technicians.len(), notebooks = roster.notebooks.len())
    )]
    pub async fn seed(&self, roster: &SeedRoster) -> Result<SeedReport, DomainError> {
        let mut report = SeedReport::default();

        for tech in &roster.technicians {
            if self.seed_technician(tech).await? {
                report.technicians_created += 1;
            } else {
                report.technicians_existing += 1;
            }
        }

        for nb in &roster.notebooks {
            if self.seed_notebook(nb).await? {
                report.materials_created += 1;
            } else {
                report.materials_existing += 1;
            }
        }

        info!(
            technicians_created = report.technicians_created,
            materials_created = report.materials_created,
            "Seeding finished"
        );
        Ok(report)
    }

    async fn seed_technician(&self, tech: &SeedTechnician) -> Result<bool, DomainError> {
        let name = tech.name.trim();
        if name.is_empty() || tech.password.is_empty() {
            return Err(DomainError::validation(
                "technicians",
                "seed entries need a name and a password",
            ));
        }

        if self.users.name_exists(name).await.map_err(seed_error)? {
            debug!(name, "Technician already present");
            return Ok(false);
        }

        let stored = StoredUser {
            user: User {
                id: Uuid::new_v4(),
                name: name.to_string(),
                role: Role::Technician,
                created_at: Utc::now(),
            },
            password_hash: self.hash(tech.password.clone()).await?,
        };

        match self.users.insert(stored).await {
            Ok(()) => Ok(true),
            // another instance seeded it first
            Err(RepoError::Conflict) => Ok(false),
            Err(e) => Err(seed_error(e)),
        }
    }

    async fn seed_notebook(&self, nb: &SeedNotebook) -> Result<bool, DomainError> {
        let tag = nb.tag.trim();
        if tag.is_empty() {
            return Err(DomainError::validation("notebooks", "seed entries need a tag"));
        }

        if self.materials.tag_exists(tag).await.map_err(seed_error)? {
            debug!(tag, "Notebook already present");
            return Ok(false);
        }

        let material = Material {
            id: Uuid::new_v4(),
            kind: MaterialKind::Notebook,
            tag: tag.to_string(),
            label: nb.label.clone(),
            status: MaterialStatus::Available,
            current_request: None,
        };

        match self.materials.insert(material).await {
            Ok(()) => Ok(true),
            Err(RepoError::Conflict) => Ok(false),
            Err(e) => Err(seed_error(e)),
        }
    }
}

fn seed_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("seeding failed: {e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roster_ships_four_technicians_and_five_notebooks() {
        let roster = SeedRoster::default();
        let names: Vec<_> = roster.technicians.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Juanjo", "Lucas", "Jorge", "Alexander"]);
        assert_eq!(roster.technicians[3].password, "alexander123");

        let tags: Vec<_> = roster.notebooks.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, ["NB001", "NB002", "NB003", "NB004", "NB005"]);
        assert_eq!(roster.notebooks[0].label.as_deref(), Some("Notebook 1"));
    }

    #[test]
    fn partial_roster_config_keeps_other_defaults() {
        let roster: SeedRoster =
            serde_json::from_value(serde_json::json!({ "notebooks": [{ "tag": "NB900" }] }))
                .unwrap();
        assert_eq!(roster.notebooks.len(), 1);
        assert_eq!(roster.notebooks[0].label, None);
        assert_eq!(roster.technicians.len(), 4);
    }
}
