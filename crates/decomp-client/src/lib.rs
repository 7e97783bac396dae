pub mod auth;
pub mod client;
pub mod identity;
pub mod settings;

pub mod mock;

pub use auth::PatToken;
pub use client::HttpWorkItemStore;
pub use identity::CachedIdentityProvider;
pub use settings::{FileSettingsSource, WorkspaceFile};
