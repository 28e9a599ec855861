use super::eligibility::Candidate;

/// Sort candidates so the best (lowest) merit number claims seats first.
/// Stable, so equal merit numbers keep their input order.
pub fn merit_order(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by_key(|candidate| candidate.student.merit_number);
}
