//! Business logic services
//!
//! Admission control, invite token management, user management and the
//! audit trail. Every service borrows a shared [`ServiceContext`].

pub mod admission;
pub mod audit;
pub mod context;
pub mod error;
pub mod invite_token;
pub mod permission;
pub mod user;

// Re-export all services for convenience
pub use admission::AdmissionService;
pub use audit::AuditService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use invite_token::InviteTokenService;
pub use permission::PermissionService;
pub use user::UserService;
