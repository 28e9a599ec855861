use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::allocation::domain::{
    AllocationStatus, Category, EntranceRecord, Gender, SeatKey, Stream, Student,
    StudentAllocation, StudentId, VacancyEntry,
};
use crate::workflows::allocation::report::AllocationResult;
use crate::workflows::allocation::repository::{
    AllocationRepository, AuditError, AuditRecord, AuditSink, RepositoryError, RunRegistry,
};
use crate::workflows::allocation::service::SeatAllocationService;

/// Build a student whose application number is `APP-{id}`. Empty strings in
/// `choices` become gaps.
pub(super) fn student(id: &str, merit: u32, stream: Stream, choices: &[&str]) -> Student {
    Student {
        id: StudentId(id.to_string()),
        application_number: Some(format!("APP-{id}")),
        merit_number: merit,
        stream,
        choices: choices
            .iter()
            .map(|choice| (!choice.is_empty()).then(|| choice.to_string()))
            .collect(),
        allotted_district: None,
        allotted_stream: None,
        allocation_status: AllocationStatus::Pending,
    }
}

pub(super) fn entrance_for(student: &Student, gender: Gender, category: Category) -> EntranceRecord {
    EntranceRecord {
        application_number: student
            .application_number
            .clone()
            .expect("fixture students carry application numbers"),
        roll_number: Some(format!("R-{}", student.merit_number)),
        marks: Some(600 - student.merit_number.min(600)),
        stream: None,
        gender,
        category,
    }
}

pub(super) fn male_open(students: &[Student]) -> Vec<EntranceRecord> {
    students
        .iter()
        .map(|student| entrance_for(student, Gender::Male, Category::Open))
        .collect()
}

pub(super) fn vacancy(
    district: &str,
    stream: Stream,
    gender: Gender,
    category: Category,
    seats: u32,
) -> VacancyEntry {
    VacancyEntry {
        district: district.to_string(),
        stream,
        gender,
        category,
        total_seats: seats,
        available_seats: Some(seats),
    }
}

pub(super) fn mohali_medical(seats: u32) -> VacancyEntry {
    vacancy("Mohali", Stream::Medical, Gender::Male, Category::Open, seats)
}

/// Three Medical students competing for two Mohali seats.
pub(super) fn mohali_scenario() -> (Vec<Student>, Vec<EntranceRecord>, Vec<VacancyEntry>) {
    let students = vec![
        student("s3", 3, Stream::Medical, &["Mohali"]),
        student("s1", 1, Stream::Medical, &["Mohali"]),
        student("s2", 2, Stream::Medical, &["Mohali"]),
    ];
    let entrance = male_open(&students);
    (students, entrance, vec![mohali_medical(2)])
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) students: Mutex<Vec<Student>>,
    pub(super) entrance: Mutex<Vec<EntranceRecord>>,
    pub(super) vacancies: Mutex<Vec<VacancyEntry>>,
    pub(super) writes: Mutex<Vec<(StudentId, StudentAllocation)>>,
}

impl MemoryStore {
    pub(super) fn seeded(
        students: Vec<Student>,
        entrance: Vec<EntranceRecord>,
        vacancies: Vec<VacancyEntry>,
    ) -> Self {
        Self {
            students: Mutex::new(students),
            entrance: Mutex::new(entrance),
            vacancies: Mutex::new(vacancies),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn writes(&self) -> Vec<(StudentId, StudentAllocation)> {
        self.writes.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn vacancy_available(&self, key: &SeatKey) -> Option<u32> {
        self.vacancies
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .find(|vacancy| &vacancy.key() == key)
            .and_then(|vacancy| vacancy.available_seats)
    }
}

impl AllocationRepository for MemoryStore {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.students.lock().expect("store mutex poisoned").clone())
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        Ok(self.entrance.lock().expect("store mutex poisoned").clone())
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        Ok(self.vacancies.lock().expect("store mutex poisoned").clone())
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
        let mut students = self.students.lock().expect("store mutex poisoned");
        let student = students
            .iter_mut()
            .find(|student| &student.id == id)
            .ok_or(RepositoryError::NotFound)?;
        student.apply(allocation);
        self.writes
            .lock()
            .expect("store mutex poisoned")
            .push((id.clone(), allocation.clone()));
        Ok(())
    }

    fn write_vacancy_remaining(&self, key: &SeatKey, remaining: u32) -> Result<(), RepositoryError> {
        let mut vacancies = self.vacancies.lock().expect("store mutex poisoned");
        let vacancy = vacancies
            .iter_mut()
            .find(|vacancy| &vacancy.key() == key)
            .ok_or(RepositoryError::NotFound)?;
        vacancy.available_seats = Some(remaining);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryRegistry {
    pub(super) completed: Mutex<Option<AllocationResult>>,
}

impl RunRegistry for MemoryRegistry {
    fn is_completed(&self) -> Result<bool, RepositoryError> {
        Ok(self.completed.lock().expect("registry mutex poisoned").is_some())
    }

    fn mark_completed(&self, result: &AllocationResult) -> Result<(), RepositoryError> {
        *self.completed.lock().expect("registry mutex poisoned") = Some(result.clone());
        Ok(())
    }

    fn completed_result(&self) -> Result<Option<AllocationResult>, RepositoryError> {
        Ok(self.completed.lock().expect("registry mutex poisoned").clone())
    }
}

#[derive(Default)]
pub(super) struct MemoryAudit {
    events: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    pub(super) fn events(&self) -> Vec<AuditRecord> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, entry: AuditRecord) -> Result<(), AuditError> {
        self.events.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }
}

pub(super) struct OfflineAudit;

impl AuditSink for OfflineAudit {
    fn record(&self, _entry: AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Transport("audit log offline".to_string()))
    }
}

/// Serves the snapshot but rejects every write.
pub(super) struct ReadOnlyRepository(pub(super) MemoryStore);

impl AllocationRepository for ReadOnlyRepository {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.0.list_students()
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        self.0.list_entrance_records()
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        self.0.list_vacancies()
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.0.fetch_student(id)
    }

    fn write_student_allocation(
        &self,
        _id: &StudentId,
        _allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn write_vacancy_remaining(&self, _key: &SeatKey, _remaining: u32) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

/// Audit sink whose first delivery fails; later ones are recorded.
#[derive(Default)]
pub(super) struct FlakyAudit {
    failed_once: AtomicBool,
    pub(super) inner: MemoryAudit,
}

impl AuditSink for FlakyAudit {
    fn record(&self, entry: AuditRecord) -> Result<(), AuditError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(AuditError::Transport("audit log offline".to_string()));
        }
        self.inner.record(entry)
    }
}

/// Store whose first vacancy write fails after the student write went through.
pub(super) struct FlakyVacancyStore {
    pub(super) inner: MemoryStore,
    failed_once: AtomicBool,
}

impl FlakyVacancyStore {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failed_once: AtomicBool::new(false),
        }
    }
}

impl AllocationRepository for FlakyVacancyStore {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.inner.list_students()
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        self.inner.list_entrance_records()
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        self.inner.list_vacancies()
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(id)
    }

    fn write_student_allocation(
        &self,
        id: &StudentId,
        allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        self.inner.write_student_allocation(id, allocation)
    }

    fn write_vacancy_remaining(&self, key: &SeatKey, remaining: u32) -> Result<(), RepositoryError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("vacancy table locked".to_string()));
        }
        self.inner.write_vacancy_remaining(key, remaining)
    }
}

/// Store that raises `cancel` once the first student has been written.
pub(super) struct CancellingStore {
    pub(super) inner: MemoryStore,
    pub(super) cancel: AtomicBool,
}

impl CancellingStore {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            cancel: AtomicBool::new(false),
        }
    }
}

impl AllocationRepository for CancellingStore {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.inner.list_students()
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        self.inner.list_entrance_records()
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        self.inner.list_vacancies()
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(id)
    }

    fn write_student_allocation(
        &self,
        id: &StudentId,
        allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        self.inner.write_student_allocation(id, allocation)?;
        self.cancel.store(true, Ordering::Release);
        Ok(())
    }

    fn write_vacancy_remaining(&self, key: &SeatKey, remaining: u32) -> Result<(), RepositoryError> {
        self.inner.write_vacancy_remaining(key, remaining)
    }
}

/// Store that parks the reading thread inside `list_students` until released.
pub(super) struct GatedStore {
    pub(super) inner: MemoryStore,
    pub(super) entered: Barrier,
    pub(super) release: Barrier,
}

impl GatedStore {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

impl AllocationRepository for GatedStore {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.entered.wait();
        self.release.wait();
        self.inner.list_students()
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        self.inner.list_entrance_records()
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        self.inner.list_vacancies()
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(id)
    }

    fn write_student_allocation(
        &self,
        id: &StudentId,
        allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        self.inner.write_student_allocation(id, allocation)
    }

    fn write_vacancy_remaining(&self, key: &SeatKey, remaining: u32) -> Result<(), RepositoryError> {
        self.inner.write_vacancy_remaining(key, remaining)
    }
}

pub(super) struct UnavailableRepository;

impl AllocationRepository for UnavailableRepository {
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_entrance_records(&self) -> Result<Vec<EntranceRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_vacancies(&self) -> Result<Vec<VacancyEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_student(&self, _id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write_student_allocation(
        &self,
        _id: &StudentId,
        _allocation: &StudentAllocation,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn write_vacancy_remaining(&self, _key: &SeatKey, _remaining: u32) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type MemoryService = SeatAllocationService<MemoryStore, MemoryRegistry, MemoryAudit>;

pub(super) fn build_service(
    store: MemoryStore,
) -> (
    MemoryService,
    Arc<MemoryStore>,
    Arc<MemoryRegistry>,
    Arc<MemoryAudit>,
) {
    let store = Arc::new(store);
    let registry = Arc::new(MemoryRegistry::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = SeatAllocationService::new(store.clone(), registry.clone(), audit.clone());
    (service, store, registry, audit)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
