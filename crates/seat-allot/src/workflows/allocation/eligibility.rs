use std::collections::HashMap;

use super::domain::{EntranceRecord, Student};

/// An eligible student paired with the entrance record that resolves their quota.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub student: &'a Student,
    pub entrance: &'a EntranceRecord,
}

/// Students with an application number, a first choice, and an entrance record.
///
/// Ineligible students are dropped without a trace; the run never writes to them.
/// If two entrance records share an application number the first one is used.
pub fn eligible_candidates<'a>(
    students: &'a [Student],
    entrance_records: &'a [EntranceRecord],
) -> Vec<Candidate<'a>> {
    let mut by_application: HashMap<&str, &EntranceRecord> =
        HashMap::with_capacity(entrance_records.len());
    for record in entrance_records {
        by_application
            .entry(record.application_number.as_str())
            .or_insert(record);
    }

    students
        .iter()
        .filter(|student| student.choice(1).is_some())
        .filter_map(|student| {
            let application_number = student.application_number()?;
            let entrance = by_application.get(application_number)?;
            Some(Candidate { student, entrance })
        })
        .collect()
}
