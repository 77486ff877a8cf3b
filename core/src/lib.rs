pub mod db;
pub mod error;
pub mod grocery;
pub mod menu;
pub mod models;
pub mod nutrition;
pub mod service;

pub use error::{Error, Result};
pub use service::MiseService;
