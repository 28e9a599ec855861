//! Merit-ordered district seat allocation.
//!
//! The pure pipeline (`pool`, `eligibility`, `ordering`, `engine`, `report`) runs
//! against in-memory collections. `service` wraps it with the storage snapshot,
//! the one-shot run guard, and the audit trail; `router` exposes it over HTTP.

pub mod domain;
pub(crate) mod eligibility;
pub mod engine;
pub(crate) mod ordering;
pub mod pool;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AllocationStatus, Assignment, Category, EntranceRecord, Gender, SeatKey, Stream, Student,
    StudentAllocation, StudentId, VacancyEntry, MAX_CHOICES,
};
pub use eligibility::{eligible_candidates, Candidate};
pub use engine::{allocate, AllocationOutcome, AllocationRun};
pub use ordering::merit_order;
pub use pool::{PoolUtilization, SeatPool};
pub use report::{AllocationReportView, AllocationResult, DistrictAllotmentEntry};
pub use repository::{
    AllocationRepository, AuditError, AuditRecord, AuditSink, RepositoryError, RunRegistry,
};
pub use router::{allocation_router, OPERATOR_HEADER};
pub use service::{
    AllocationServiceError, CompletedRun, RunStatusView, SeatAllocationService,
    StudentAllocationView,
};
