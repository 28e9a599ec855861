use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{
    AllocationStatus, Assignment, Stream, Student, StudentAllocation, StudentId,
};
use super::eligibility::eligible_candidates;
use super::engine::AllocationRun;
use super::pool::SeatPool;
use super::report::{AllocationReportView, AllocationResult};
use super::repository::{
    AllocationRepository, AuditError, AuditRecord, AuditSink, RepositoryError, RunRegistry,
};

const AUDIT_ACTION: &str = "seat_allocation_run";

/// Service composing the storage snapshot, run guard, allocation loop, and audit trail.
pub struct SeatAllocationService<R, G, A> {
    repository: Arc<R>,
    registry: Arc<G>,
    audit: Arc<A>,
    run_lock: Mutex<()>,
}

impl<R, G, A> SeatAllocationService<R, G, A>
where
    R: AllocationRepository + 'static,
    G: RunRegistry + 'static,
    A: AuditSink + 'static,
{
    pub fn new(repository: Arc<R>, registry: Arc<G>, audit: Arc<A>) -> Self {
        Self {
            repository,
            registry,
            audit,
            run_lock: Mutex::new(()),
        }
    }

    /// Execute the one-shot allocation run.
    pub fn run(&self, operator: &str) -> Result<CompletedRun, AllocationServiceError> {
        self.run_with_cancel(operator, &AtomicBool::new(false))
    }

    /// Execute the run, checking `cancel` before each student is settled.
    ///
    /// Any failure leaves the completed flag unset so the run can be retried.
    /// Students already written by an interrupted run are counted, not redone.
    pub fn run_with_cancel(
        &self,
        operator: &str,
        cancel: &AtomicBool,
    ) -> Result<CompletedRun, AllocationServiceError> {
        let _running = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AllocationServiceError::RunInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        if self.registry.is_completed()? {
            return Err(AllocationServiceError::AlreadyCompleted);
        }

        let started_at = Utc::now();
        let students = self.repository.list_students()?;
        let entrance_records = self.repository.list_entrance_records()?;
        let vacancies = self.repository.list_vacancies()?;

        // Students settled by an interrupted run keep their outcome; their seats
        // are already gone from the stored vacancies.
        let (settled, unsettled): (Vec<Student>, Vec<Student>) =
            students.into_iter().partition(Student::is_settled);
        let mut result = AllocationResult::default();
        for candidate in eligible_candidates(&settled, &entrance_records) {
            result.record(&carried_over(candidate.student));
        }
        let previous: HashMap<StudentId, StudentAllocation> = unsettled
            .iter()
            .map(|student| (student.id.clone(), student.allocation()))
            .collect();

        let mut pool = SeatPool::from_vacancies(&vacancies);
        info!(
            operator,
            students = settled.len() + unsettled.len(),
            resumed = result.total,
            entrance_records = entrance_records.len(),
            pools = pool.len(),
            seats = pool.remaining_seats(),
            "allocation run started"
        );

        let mut run = AllocationRun::new(&unsettled, &entrance_records, &mut pool);
        loop {
            if cancel.load(Ordering::Acquire) {
                warn!(
                    processed = result.total,
                    remaining = run.remaining(),
                    "allocation run cancelled"
                );
                return Err(AllocationServiceError::Cancelled {
                    processed: result.total,
                });
            }

            let Some(assignment) = run.next() else {
                break;
            };

            let remaining = assignment.seat.as_ref().and_then(|key| run.available(key));
            let before = previous
                .get(&assignment.student_id)
                .cloned()
                .unwrap_or_else(StudentAllocation::pending);
            self.persist(&assignment, remaining, &before)?;
            result.record(&assignment);
        }

        self.audit.record(AuditRecord {
            action: AUDIT_ACTION.to_string(),
            operator: operator.to_string(),
            started_at,
            finished_at: Utc::now(),
            result: result.clone(),
        })?;
        self.registry.mark_completed(&result)?;

        info!(
            total = result.total,
            allotted = result.allotted,
            not_allotted = result.not_allotted,
            "allocation run completed"
        );

        Ok(CompletedRun { result, pool })
    }

    /// Write one student's outcome and, for a commit, the pool it drew from.
    ///
    /// A failed vacancy write restores the student's previous fields, so each
    /// student is either fully persisted or left as it was read.
    fn persist(
        &self,
        assignment: &Assignment,
        remaining: Option<u32>,
        before: &StudentAllocation,
    ) -> Result<(), AllocationServiceError> {
        self.repository
            .write_student_allocation(&assignment.student_id, &assignment.allocation)?;

        let (Some(key), Some(remaining)) = (&assignment.seat, remaining) else {
            return Ok(());
        };
        if let Err(err) = self.repository.write_vacancy_remaining(key, remaining) {
            if let Err(restore) = self
                .repository
                .write_student_allocation(&assignment.student_id, before)
            {
                error!(
                    student = %assignment.student_id,
                    %key,
                    %restore,
                    "failed to restore student after vacancy write error"
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Whether the run has completed, and its stored result.
    pub fn status(&self) -> Result<RunStatusView, AllocationServiceError> {
        let completed = self.registry.is_completed()?;
        let result = if completed {
            self.registry.completed_result()?
        } else {
            None
        };
        Ok(RunStatusView { completed, result })
    }

    /// Current allocation fields of a single student.
    pub fn student(
        &self,
        id: &StudentId,
    ) -> Result<StudentAllocationView, AllocationServiceError> {
        let student = self
            .repository
            .fetch_student(id)?
            .ok_or(RepositoryError::NotFound)?;

        Ok(StudentAllocationView {
            student_id: student.id,
            merit_number: student.merit_number,
            stream: student.stream,
            status: student.allocation_status.label(),
            allotted_district: student.allotted_district,
            allotted_stream: student.allotted_stream,
        })
    }
}

fn carried_over(student: &Student) -> Assignment {
    Assignment {
        student_id: student.id.clone(),
        merit_number: student.merit_number,
        allocation: student.allocation(),
        seat: None,
        choice_rank: None,
    }
}

/// Output of a finished run.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub result: AllocationResult,
    pub pool: SeatPool,
}

impl CompletedRun {
    pub fn view(&self) -> AllocationReportView {
        self.result.view(&self.pool)
    }

    pub fn is_fully_allotted(&self) -> bool {
        self.result.not_allotted == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AllocationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAllocationView {
    pub student_id: StudentId,
    pub merit_number: u32,
    pub stream: Stream,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allotted_district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allotted_stream: Option<Stream>,
}

impl StudentAllocationView {
    pub fn is_allotted(&self) -> bool {
        self.status == AllocationStatus::Allotted.label()
    }
}

/// Error raised by the allocation service.
#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error("seat allocation has already been completed")]
    AlreadyCompleted,
    #[error("a seat allocation run is already in progress")]
    RunInProgress,
    #[error("seat allocation cancelled after {processed} students")]
    Cancelled { processed: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}
