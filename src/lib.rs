pub mod auth;
pub mod banner;
pub mod config;
pub mod consts;
pub mod domain;
pub mod error;
pub mod events;
pub mod members;
pub mod quests;
pub mod server;
pub mod store;
pub mod sync_env;
