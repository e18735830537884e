mod database;
mod state_builder;
mod user_provisioning;

pub use database::connect_and_migrate;
pub use state_builder::{build_app_state, in_memory_app_state};
pub use user_provisioning::provision_api_users;
