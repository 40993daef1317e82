pub mod material;
pub mod request;
pub mod user;
