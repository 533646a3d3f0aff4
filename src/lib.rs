pub mod auction;
pub mod authentication;
pub mod database;
pub mod email;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod notification;
pub mod payment;
pub mod query;
pub mod settings;
