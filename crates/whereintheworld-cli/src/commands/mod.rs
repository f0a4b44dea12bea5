pub mod auth;
pub mod config;
pub mod locations;
pub mod resolve;
pub mod run;
pub mod status;
