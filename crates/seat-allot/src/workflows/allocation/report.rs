use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{AllocationStatus, Assignment};
use super::pool::{PoolUtilization, SeatPool};

/// Summary of one allocation run; also the audit payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub total: usize,
    pub allotted: usize,
    pub not_allotted: usize,
    pub district_allotments: BTreeMap<String, usize>,
}

impl AllocationResult {
    pub fn from_assignments<'a, I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = &'a Assignment>,
    {
        let mut result = Self::default();
        for assignment in assignments {
            result.record(assignment);
        }
        result
    }

    /// Count one terminal outcome.
    pub fn record(&mut self, assignment: &Assignment) {
        self.total += 1;
        match assignment.allocation.allocation_status {
            AllocationStatus::Allotted => {
                self.allotted += 1;
                if let Some(district) = &assignment.allocation.allotted_district {
                    *self
                        .district_allotments
                        .entry(district.clone())
                        .or_insert(0) += 1;
                }
            }
            AllocationStatus::NotAllotted => self.not_allotted += 1,
            AllocationStatus::Pending => {}
        }
    }

    pub fn allotment_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.allotted as f32 / self.total as f32
        }
    }

    pub fn district_entries(&self) -> Vec<DistrictAllotmentEntry> {
        self.district_allotments
            .iter()
            .map(|(district, allotted)| DistrictAllotmentEntry {
                district: district.clone(),
                allotted: *allotted,
            })
            .collect()
    }

    pub fn view(&self, pool: &SeatPool) -> AllocationReportView {
        AllocationReportView {
            total: self.total,
            allotted: self.allotted,
            not_allotted: self.not_allotted,
            district_allotments: self.district_entries(),
            pool_utilization: pool.utilization(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictAllotmentEntry {
    pub district: String,
    pub allotted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationReportView {
    pub total: usize,
    pub allotted: usize,
    pub not_allotted: usize,
    pub district_allotments: Vec<DistrictAllotmentEntry>,
    pub pool_utilization: Vec<PoolUtilization>,
}
