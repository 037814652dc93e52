pub mod auth;
pub mod compose;
pub mod config;
pub mod domain;
pub mod error;
pub mod inbox;
pub mod mail;
pub mod render;

pub use error::{Error, Result};
