pub mod activity;
pub mod config;
pub mod development;
pub mod error;
pub mod fields;
pub mod filter;
pub mod followup;
pub mod gantt;
pub mod import;
pub mod io;
pub mod paths;
pub mod reservation;
pub mod stage;
pub mod types;
pub mod wizard;

pub use error::{BitacoraError, Result};
