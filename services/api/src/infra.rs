use metrics_exporter_prometheus::PrometheusHandle;
use seat_allot::workflows::allocation::{
    AllocationRepository, AllocationResult, AuditError, AuditRecord, AuditSink, EntranceRecord,
    RepositoryError, RunRegistry, SeatAllocationService, SeatKey, Student, StudentAllocation,
    StudentId, VacancyEntry,
};
use seat_allot::workflows::intake::AllocationDataset;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryAllocationService =
    SeatAllocationService<InMemoryAllocationStore, InMemoryRunRegistry, InMemoryAuditLog>;

/// Build a service over a fresh in-memory store seeded with `dataset`.
pub(crate) fn in_memory_service(
    dataset: AllocationDataset,
) -> (
    InMemoryAllocationService,
    Arc<InMemoryAllocationStore>,
    Arc<InMemoryAuditLog>,
) {
    let store = Arc::new(InMemoryAllocationStore::from_dataset(dataset));
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = SeatAllocationService::new(
        store.clone(),
        Arc::new(InMemoryRunRegistry::default()),
        audit.clone(),
    );
    (service, store, audit)
}

#[derive(Default)]
pub(crate) struct InMemoryAllocationStore {
    students: Mutex<Vec<Student>>,
    entrance_records: Mutex<Vec<EntranceRecord>>,
    vacancies: Mutex<Vec<VacancyEntry>>,
}

impl InMemoryAllocationStore {
    pub(crate) fn from_dataset(dataset: AllocationDataset) -> Self {
        Self {
            students: Mutex::new(dataset.students),
            entrance_records: Mutex::new(dataset.entrance_records),
            vacancies: Mutex::new(dataset.vacancies),
        }
    }

    pub(crate) fn students(&self) -> Vec<Student> {
        self.students.lock().expect("store mutex poisoned").clone()
    }
}

impl AllocationRepository for InMemoryAllocationStore {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.students())
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        let guard = self.entrance_records.lock().expect("store mutex poisoned");
        Ok(guard.clone())
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        let guard = self.vacancies.lock().expect("store mutex poisoned");
        Ok(guard.clone())
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        let guard = self.students.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|student| &student.id == id).cloned())
    }

    fn write_student_allocation(
        &self,
        id: &StudentId,
        allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.students.lock().expect("store mutex poisoned");
        match guard.iter_mut().find(|student| &student.id == id) {
            Some(student) => {
                student.apply(allocation);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn write_vacancy_remaining(
        &self,
        key: &SeatKey,
        remaining: u32,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.vacancies.lock().expect("store mutex poisoned");
        // Every row sharing the key, matching the last-write-wins index.
        let mut matched = false;
        for vacancy in guard.iter_mut().filter(|vacancy| &vacancy.key() == key) {
            vacancy.available_seats = Some(remaining);
            matched = true;
        }
        if matched {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

#[derive(Default)]
pub(crate) struct InMemoryRunRegistry {
    completed: Mutex<Option<AllocationResult>>,
}

impl RunRegistry for InMemoryRunRegistry {
    fn is_completed(&self) -> Result<bool, RepositoryError> {
        let guard = self.completed.lock().expect("registry mutex poisoned");
        Ok(guard.is_some())
    }

    fn mark_completed(&self, result: &AllocationResult) -> Result<(), RepositoryError> {
        let mut guard = self.completed.lock().expect("registry mutex poisoned");
        *guard = Some(result.clone());
        Ok(())
    }

    fn completed_result(&self) -> Result<Option<AllocationResult>, RepositoryError> {
        let guard = self.completed.lock().expect("registry mutex poisoned");
        Ok(guard.clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAuditLog {
    events: Mutex<Vec<AuditRecord>>,
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditRecord) -> Result<(), AuditError> {
        info!(
            action = %entry.action,
            operator = %entry.operator,
            total = entry.result.total,
            allotted = entry.result.allotted,
            "audit record written"
        );
        let mut guard = self.events.lock().expect("audit mutex poisoned");
        guard.push(entry);
        Ok(())
    }
}

impl InMemoryAuditLog {
    pub(crate) fn events(&self) -> Vec<AuditRecord> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}
