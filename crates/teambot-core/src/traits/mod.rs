//! Repository traits

mod repositories;

pub use repositories::{
    clamp_page, AdmissionRepository, InviteTokenRepository, OperationLogRepository, RepoResult,
    UserRepository, MAX_QUERY_LIMIT,
};
