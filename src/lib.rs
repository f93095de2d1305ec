#![doc = include_str!("../README.md")]

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use api::ApiClient;
pub use config::ApiConfig;
pub use error::Error;
pub use gateway::{ApiRequest, Gateway};
pub use session::{Session, SessionStore, TokenPair};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage, StorageError};
pub use types::{
    ApplianceId, BillId, BillSource, BillStatus, EstimateId, InsightStatus, Page, UserId,
    UserProfile, UserRole,
};
