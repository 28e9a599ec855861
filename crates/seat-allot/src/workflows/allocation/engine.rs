use tracing::debug;

use super::domain::{Assignment, EntranceRecord, SeatKey, Student, StudentAllocation, VacancyEntry};
use super::eligibility::{eligible_candidates, Candidate};
use super::ordering::merit_order;
use super::pool::SeatPool;
use super::report::AllocationResult;

/// Greedy single pass over merit-ordered candidates against a shared pool.
///
/// Each call to `next` settles exactly one student, so a caller can persist
/// outcomes as they are produced and stop cleanly between students.
pub struct AllocationRun<'a, 'p> {
    candidates: std::vec::IntoIter<Candidate<'a>>,
    pool: &'p mut SeatPool,
}

impl<'a, 'p> AllocationRun<'a, 'p> {
    /// Filter and order the students, ready to draw from `pool`.
    pub fn new(
        students: &'a [Student],
        entrance_records: &'a [EntranceRecord],
        pool: &'p mut SeatPool,
    ) -> Self {
        let mut candidates = eligible_candidates(students, entrance_records);
        merit_order(&mut candidates);
        Self {
            candidates: candidates.into_iter(),
            pool,
        }
    }

    /// Candidates not yet settled.
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    /// Seats left in `key` as of the last settled student.
    pub fn available(&self, key: &SeatKey) -> Option<u32> {
        self.pool.available(key)
    }

    fn settle(&mut self, candidate: Candidate<'a>) -> Assignment {
        let student = candidate.student;

        for (rank, district) in student.ranked_choices() {
            // Seats are partitioned by the stream the student declared.
            let key = SeatKey::new(
                district,
                student.stream,
                candidate.entrance.gender,
                candidate.entrance.category,
            );

            if let Some(remaining) = self.pool.try_claim(&key) {
                debug!(
                    student = %student.id,
                    merit = student.merit_number,
                    rank,
                    %key,
                    remaining,
                    "seat allotted"
                );
                return Assignment {
                    student_id: student.id.clone(),
                    merit_number: student.merit_number,
                    allocation: StudentAllocation::allotted(district, student.stream),
                    seat: Some(key),
                    choice_rank: Some(rank),
                };
            }
        }

        debug!(student = %student.id, merit = student.merit_number, "no feasible choice");
        Assignment {
            student_id: student.id.clone(),
            merit_number: student.merit_number,
            allocation: StudentAllocation::not_allotted(),
            seat: None,
            choice_rank: None,
        }
    }
}

impl Iterator for AllocationRun<'_, '_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = self.candidates.next()?;
        Some(self.settle(candidate))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}

impl ExactSizeIterator for AllocationRun<'_, '_> {}

/// Everything a complete in-memory run produces.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    /// Assignments in merit order.
    pub assignments: Vec<Assignment>,
    pub result: AllocationResult,
    /// Pool state after the run.
    pub pool: SeatPool,
}

/// Run the whole pipeline over the three input collections.
pub fn allocate(
    students: &[Student],
    entrance_records: &[EntranceRecord],
    vacancies: &[VacancyEntry],
) -> AllocationOutcome {
    let mut pool = SeatPool::from_vacancies(vacancies);
    let assignments: Vec<Assignment> =
        AllocationRun::new(students, entrance_records, &mut pool).collect();
    let result = AllocationResult::from_assignments(&assignments);

    AllocationOutcome {
        assignments,
        result,
        pool,
    }
}
