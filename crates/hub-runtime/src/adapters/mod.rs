//! Collaborator implementations wired into the hub by the runtime.

pub mod demo_provider;
pub mod user_store;

pub use demo_provider::DemoDataProvider;
pub use user_store::InMemoryUserStore;
