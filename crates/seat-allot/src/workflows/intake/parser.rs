use std::io::Read;

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use super::IntakeError;
use crate::workflows::allocation::domain::{
    AllocationStatus, Stream, Student, StudentId, MAX_CHOICES,
};

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source)
}

pub(crate) fn parse_rows<T, R>(source: R) -> Result<Vec<T>, IntakeError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = reader(source);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

pub(crate) fn parse_students<R: Read>(source: R) -> Result<Vec<Student>, IntakeError> {
    let mut csv_reader = reader(source);

    if let Some(column) = csv_reader
        .headers()?
        .iter()
        .find(|header| choice_rank(header).is_some_and(|rank| rank > MAX_CHOICES))
    {
        return Err(IntakeError::TooManyChoices {
            column: column.to_string(),
        });
    }

    let mut students = Vec::new();
    for row in csv_reader.deserialize::<StudentRow>() {
        students.push(row?.into_student());
    }
    Ok(students)
}

fn choice_rank(header: &str) -> Option<usize> {
    header
        .strip_prefix("choice")
        .and_then(|rank| rank.parse::<usize>().ok())
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    student_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    application_number: Option<String>,
    merit_number: u32,
    stream: Stream,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice1: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice2: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice3: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice4: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice5: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice6: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice7: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice8: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice9: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    choice10: Option<String>,
    #[serde(default)]
    allocation_status: Option<AllocationStatus>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    allotted_district: Option<String>,
    #[serde(default)]
    allotted_stream: Option<Stream>,
}

impl StudentRow {
    fn into_student(self) -> Student {
        let choices = vec![
            self.choice1,
            self.choice2,
            self.choice3,
            self.choice4,
            self.choice5,
            self.choice6,
            self.choice7,
            self.choice8,
            self.choice9,
            self.choice10,
        ];

        Student {
            id: StudentId(self.student_id),
            application_number: self.application_number,
            merit_number: self.merit_number,
            stream: self.stream,
            choices,
            allotted_district: self.allotted_district,
            allotted_stream: self.allotted_stream,
            allocation_status: self.allocation_status.unwrap_or_default(),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
pub(crate) fn choice_rank_for_tests(header: &str) -> Option<usize> {
    choice_rank(header)
}
