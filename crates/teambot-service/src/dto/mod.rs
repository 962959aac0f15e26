//! Data transfer objects for transport requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for transport inputs
//! - Response DTOs for results handed back to the transport
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

// Re-export commonly used request types
pub use requests::{Actor, AdmissionRequest, IssueTokenRequest, UpdatePersonalInfoRequest};

// Re-export commonly used response types
pub use responses::{AdmissionResponse, InviteTokenResponse, LogStatsResponse, UserResponse};
