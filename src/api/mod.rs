pub mod batch;
pub mod download;
pub mod error;
pub mod generate;
pub mod health;
pub mod models;
pub mod state;
pub mod validation;
