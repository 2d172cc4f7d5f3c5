pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod models;
pub mod notify;
pub mod otp;
pub mod routes;
pub mod snowflake;
pub mod state;
pub mod validation;
