use std::collections::HashMap;

use tracing::warn;

use super::domain::{SeatKey, VacancyEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PoolSlot {
    total: u32,
    initial: u32,
    available: u32,
}

/// Exact-match capacity table built from the vacancy rows of one run.
#[derive(Debug, Clone, Default)]
pub struct SeatPool {
    slots: HashMap<SeatKey, PoolSlot>,
}

impl SeatPool {
    /// Index every vacancy row. A repeated key replaces the earlier row.
    pub fn from_vacancies(vacancies: &[VacancyEntry]) -> Self {
        let mut slots = HashMap::with_capacity(vacancies.len());

        for vacancy in vacancies {
            let available = vacancy.available_seats.unwrap_or(0);
            let slot = PoolSlot {
                total: vacancy.total_seats,
                initial: available,
                available,
            };
            if let Some(previous) = slots.insert(vacancy.key(), slot) {
                warn!(
                    key = %vacancy.key(),
                    replaced = previous.available,
                    available,
                    "duplicate vacancy key, keeping the later row"
                );
            }
        }

        Self { slots }
    }

    /// Remaining seats for `key`, or `None` when no pool exists.
    pub fn available(&self, key: &SeatKey) -> Option<u32> {
        self.slots.get(key).map(|slot| slot.available)
    }

    /// Take one seat from `key` if any remain, returning the new count.
    pub fn try_claim(&mut self, key: &SeatKey) -> Option<u32> {
        let slot = self.slots.get_mut(key)?;
        if slot.available == 0 {
            return None;
        }
        slot.available -= 1;
        Some(slot.available)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn remaining_seats(&self) -> u64 {
        self.slots.values().map(|slot| u64::from(slot.available)).sum()
    }

    /// Per-pool usage, sorted by key.
    pub fn utilization(&self) -> Vec<PoolUtilization> {
        let mut rows: Vec<PoolUtilization> = self
            .slots
            .iter()
            .map(|(key, slot)| PoolUtilization {
                key: key.clone(),
                total_seats: slot.total,
                initial_available: slot.initial,
                remaining: slot.available,
                consumed: slot.initial - slot.available,
            })
            .collect();
        rows.sort_by(|left, right| left.key.cmp(&right.key));
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PoolUtilization {
    pub key: SeatKey,
    pub total_seats: u32,
    pub initial_available: u32,
    pub remaining: u32,
    pub consumed: u32,
}
