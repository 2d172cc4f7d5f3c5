pub mod invite;
pub mod member;
pub mod role;
pub mod service;
pub mod user;
