pub mod client;
pub mod error;
pub mod model;

pub use client::LoansApi;
pub use error::LoansError;
pub use model::*;
