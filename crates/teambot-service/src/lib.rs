//! # teambot-service
//!
//! Application layer containing business logic, services, and DTOs.
//!
//! The chat transport builds an [`Actor`](dto::Actor) from each incoming
//! update and calls the services below. Every admin or admission operation
//! leaves exactly one entry in the audit trail.

pub mod dto;
pub mod services;

pub use services::{
    AdmissionService, AuditService, InviteTokenService, PermissionService, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, UserService,
};
