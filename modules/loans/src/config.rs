use serde::{Deserialize, Serialize};

use crate::domain::password::HashingParams;
use crate::domain::seed::{SeedNotebook, SeedRoster, SeedTechnician};
use crate::domain::service::ReservationPolicy;

/// Configuration for the loans module (`modules.loans`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoansConfig {
    #[serde(default)]
    pub reservation: ReservationPolicy,
    #[serde(default)]
    pub password_hash: HashingParams,
    #[serde(default = "default_technicians")]
    pub technicians: Vec<SeedTechnician>,
    #[serde(default = "default_notebooks")]
    pub notebooks: Vec<SeedNotebook>,
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            reservation: ReservationPolicy::default(),
            password_hash: HashingParams::default(),
            technicians: default_technicians(),
            notebooks: default_notebooks(),
        }
    }
}

impl LoansConfig {
    pub fn roster(&self) -> SeedRoster {
        SeedRoster {
            technicians: self.technicians.clone(),
            notebooks: self.notebooks.clone(),
        }
    }
}

fn default_technicians() -> Vec<SeedTechnician> {
    SeedRoster::default().technicians
}

fn default_notebooks() -> Vec<SeedNotebook> {
    SeedRoster::default().notebooks
}
