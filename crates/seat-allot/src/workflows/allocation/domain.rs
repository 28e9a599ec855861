use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of ranked district choices a student may submit.
pub const MAX_CHOICES: usize = 10;

/// Identifier wrapper for student records, used when writing outcomes back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Academic track a student declares and a seat pool is partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stream {
    Medical,
    NonMedical,
    Commerce,
    Humanities,
}

impl Stream {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Medical,
            Self::NonMedical,
            Self::Commerce,
            Self::Humanities,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Medical => "Medical",
            Self::NonMedical => "NonMedical",
            Self::Commerce => "Commerce",
            Self::Humanities => "Humanities",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

/// Reservation category recorded on the entrance exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Open,
    #[serde(rename = "SC")]
    ScheduledCaste,
    #[serde(rename = "BC")]
    BackwardClass,
    #[serde(rename = "EWS")]
    EconomicallyWeaker,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::ScheduledCaste => "SC",
            Self::BackwardClass => "BC",
            Self::EconomicallyWeaker => "EWS",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    #[default]
    Pending,
    Allotted,
    NotAllotted,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Allotted => "allotted",
            Self::NotAllotted => "not_allotted",
        }
    }
}

/// Student preference record; the allocation fields are the only ones a run writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub application_number: Option<String>,
    pub merit_number: u32,
    pub stream: Stream,
    /// Ranked district choices; gaps are allowed and skipped.
    pub choices: Vec<Option<String>>,
    #[serde(default)]
    pub allotted_district: Option<String>,
    #[serde(default)]
    pub allotted_stream: Option<Stream>,
    #[serde(default)]
    pub allocation_status: AllocationStatus,
}

impl Student {
    /// Non-empty application number, if any.
    pub fn application_number(&self) -> Option<&str> {
        self.application_number
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// The choice at 1-based `rank`, treating blank strings as unset.
    pub fn choice(&self, rank: usize) -> Option<&str> {
        if rank == 0 || rank > MAX_CHOICES {
            return None;
        }
        self.choices
            .get(rank - 1)
            .and_then(|choice| choice.as_deref())
            .filter(|value| !value.trim().is_empty())
    }

    /// Set choices in rank order, skipping gaps.
    pub fn ranked_choices(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (1..=MAX_CHOICES).filter_map(move |rank| self.choice(rank).map(|choice| (rank, choice)))
    }

    pub fn apply(&mut self, allocation: &StudentAllocation) {
        self.allotted_district = allocation.allotted_district.clone();
        self.allotted_stream = allocation.allotted_stream;
        self.allocation_status = allocation.allocation_status;
    }

    /// The stored allocation fields.
    pub fn allocation(&self) -> StudentAllocation {
        StudentAllocation {
            allotted_district: self.allotted_district.clone(),
            allotted_stream: self.allotted_stream,
            allocation_status: self.allocation_status,
        }
    }

    /// True once a run has written a terminal status for this student.
    pub fn is_settled(&self) -> bool {
        self.allocation_status != AllocationStatus::Pending
    }
}

/// Entrance exam record keyed by application number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntranceRecord {
    pub application_number: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub marks: Option<u32>,
    /// Stream the candidate tested in. Informational only.
    #[serde(default)]
    pub stream: Option<Stream>,
    pub gender: Gender,
    pub category: Category,
}

/// Exact-match partition key of a vacancy pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatKey {
    pub district: String,
    pub stream: Stream,
    pub gender: Gender,
    pub category: Category,
}

impl SeatKey {
    pub fn new(district: impl Into<String>, stream: Stream, gender: Gender, category: Category) -> Self {
        Self {
            district: district.into(),
            stream,
            gender,
            category,
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.district,
            self.stream.label(),
            self.gender.label(),
            self.category.label()
        )
    }
}

/// Persisted vacancy row for one quota bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyEntry {
    pub district: String,
    pub stream: Stream,
    pub gender: Gender,
    pub category: Category,
    #[serde(default)]
    pub total_seats: u32,
    #[serde(default)]
    pub available_seats: Option<u32>,
}

impl VacancyEntry {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.district.clone(), self.stream, self.gender, self.category)
    }
}

/// The three output fields a run writes for each eligible student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAllocation {
    pub allotted_district: Option<String>,
    pub allotted_stream: Option<Stream>,
    pub allocation_status: AllocationStatus,
}

impl StudentAllocation {
    pub fn allotted(district: impl Into<String>, stream: Stream) -> Self {
        Self {
            allotted_district: Some(district.into()),
            allotted_stream: Some(stream),
            allocation_status: AllocationStatus::Allotted,
        }
    }

    pub fn not_allotted() -> Self {
        Self {
            allotted_district: None,
            allotted_stream: None,
            allocation_status: AllocationStatus::NotAllotted,
        }
    }

    pub fn pending() -> Self {
        Self {
            allotted_district: None,
            allotted_stream: None,
            allocation_status: AllocationStatus::Pending,
        }
    }
}

/// Terminal outcome for one student, in the order the run produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub student_id: StudentId,
    pub merit_number: u32,
    pub allocation: StudentAllocation,
    /// Pool consumed by the commit; `None` when not allotted.
    pub seat: Option<SeatKey>,
    /// 1-based rank of the choice that was granted.
    pub choice_rank: Option<usize>,
}
