//! CSV intake for the three allocation datasets and CSV export of outcomes.

mod export;
mod parser;

use std::collections::HashSet;
use std::hash::Hash;
use std::io::Read;
use std::path::Path;

use crate::workflows::allocation::domain::{EntranceRecord, SeatKey, Student, VacancyEntry};

pub use export::write_allocations;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to read allocation data: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid allocation CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("vacancy pool {key} appears more than once")]
    DuplicateVacancy { key: SeatKey },
    #[error("entrance record {application_number} appears more than once")]
    DuplicateApplication { application_number: String },
    #[error("student {student_id} appears more than once")]
    DuplicateStudent { student_id: String },
    #[error("column {column} exceeds the ten ranked district choices")]
    TooManyChoices { column: String },
}

/// The three collections one allocation run consumes.
#[derive(Debug, Clone, Default)]
pub struct AllocationDataset {
    pub students: Vec<Student>,
    pub entrance_records: Vec<EntranceRecord>,
    pub vacancies: Vec<VacancyEntry>,
}

pub struct DatasetImporter;

impl DatasetImporter {
    pub fn from_paths<P: AsRef<Path>>(
        students: P,
        entrance_records: P,
        vacancies: P,
    ) -> Result<AllocationDataset, IntakeError> {
        Ok(AllocationDataset {
            students: Self::students_from_reader(std::fs::File::open(students)?)?,
            entrance_records: Self::entrance_from_reader(std::fs::File::open(entrance_records)?)?,
            vacancies: Self::vacancies_from_reader(std::fs::File::open(vacancies)?)?,
        })
    }

    pub fn students_from_reader<R: Read>(reader: R) -> Result<Vec<Student>, IntakeError> {
        let students = parser::parse_students(reader)?;
        if let Some(student) = first_duplicate(&students, |student| student.id.0.as_str()) {
            return Err(IntakeError::DuplicateStudent {
                student_id: student.id.0.clone(),
            });
        }
        Ok(students)
    }

    pub fn entrance_from_reader<R: Read>(reader: R) -> Result<Vec<EntranceRecord>, IntakeError> {
        let records: Vec<EntranceRecord> = parser::parse_rows(reader)?;
        if let Some(record) = first_duplicate(&records, |record| record.application_number.as_str())
        {
            return Err(IntakeError::DuplicateApplication {
                application_number: record.application_number.clone(),
            });
        }
        Ok(records)
    }

    /// Vacancy rows must be unique per (district, stream, gender, category).
    pub fn vacancies_from_reader<R: Read>(reader: R) -> Result<Vec<VacancyEntry>, IntakeError> {
        let vacancies: Vec<VacancyEntry> = parser::parse_rows(reader)?;
        if let Some(vacancy) = first_duplicate(&vacancies, VacancyEntry::key) {
            return Err(IntakeError::DuplicateVacancy {
                key: vacancy.key(),
            });
        }
        Ok(vacancies)
    }
}

fn first_duplicate<'a, T, K, F>(items: &'a [T], key: F) -> Option<&'a T>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().find(|&item| !seen.insert(key(item)))
}
