use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EntranceRecord, SeatKey, Student, StudentAllocation, StudentId, VacancyEntry};
use super::report::AllocationResult;

/// Storage abstraction the allocation service reads its snapshot from and writes outcomes to.
///
/// The list methods must return complete, unpaginated collections.
pub trait AllocationRepository: Send + Sync {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;
    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError>;
    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError>;
    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn write_student_allocation(
        &self,
        id: &StudentId,
        allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError>;
    /// Persist a pool's remaining capacity after a seat is taken from it.
    fn write_vacancy_remaining(&self, key: &SeatKey, remaining: u32)
        -> Result<(), RepositoryError>;
}

/// Persisted "allocation completed" flag guarding against a second run.
pub trait RunRegistry: Send + Sync {
    fn is_completed(&self) -> Result<bool, RepositoryError>;
    fn mark_completed(&self, result: &AllocationResult) -> Result<(), RepositoryError>;
    /// Result stored with the completed flag, if any.
    fn completed_result(&self) -> Result<Option<AllocationResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound audit trail hook.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditRecord) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: String,
    pub operator: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: AllocationResult,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}
