use std::io::Write;

use serde::Serialize;

use super::IntakeError;
use crate::workflows::allocation::domain::{Stream, Student};

#[derive(Debug, Serialize)]
struct AllocationRow<'a> {
    student_id: &'a str,
    application_number: &'a str,
    merit_number: u32,
    stream: Stream,
    allocation_status: &'static str,
    allotted_district: &'a str,
    allotted_stream: Option<Stream>,
}

/// Write one CSV row per student, in the order given.
pub fn write_allocations<W: Write>(writer: W, students: &[Student]) -> Result<(), IntakeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for student in students {
        csv_writer.serialize(AllocationRow {
            student_id: &student.id.0,
            application_number: student.application_number.as_deref().unwrap_or_default(),
            merit_number: student.merit_number,
            stream: student.stream,
            allocation_status: student.allocation_status.label(),
            allotted_district: student.allotted_district.as_deref().unwrap_or_default(),
            allotted_stream: student.allotted_stream,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}
