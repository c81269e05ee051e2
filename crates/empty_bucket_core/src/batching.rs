use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::contract::{ContractError, MAX_DELETE_BATCH_SIZE};

/// One `DeleteObjects` request worth of candidates: `[start_index, end_index_exclusive)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchAssignment {
    pub batch_id: usize,
    pub start_index: usize,
    pub end_index_exclusive: usize,
}

impl BatchAssignment {
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index_exclusive
    }

    pub fn len(&self) -> usize {
        self.end_index_exclusive - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn validate_batch_size(batch_size: usize) -> Result<usize, ContractError> {
    if batch_size == 0 || batch_size > MAX_DELETE_BATCH_SIZE {
        return Err(ContractError::InvalidBatchSize(batch_size));
    }
    Ok(batch_size)
}

/// Splits `total_candidates` into consecutive batches of `batch_size`, the last
/// one holding the remainder. Zero candidates yield an empty plan.
pub fn compute_batch_plan(
    total_candidates: usize,
    batch_size: usize,
) -> Result<Vec<BatchAssignment>, ContractError> {
    let batch_size = validate_batch_size(batch_size)?;
    let batch_count = total_candidates.div_ceil(batch_size);

    let mut assignments = Vec::with_capacity(batch_count);
    let mut cursor = 0usize;

    for batch_id in 0..batch_count {
        let end_index_exclusive = (cursor + batch_size).min(total_candidates);
        assignments.push(BatchAssignment {
            batch_id,
            start_index: cursor,
            end_index_exclusive,
        });
        cursor = end_index_exclusive;
    }

    validate_assignments(total_candidates, batch_size, &assignments)?;
    Ok(assignments)
}

fn validate_assignments(
    total_candidates: usize,
    batch_size: usize,
    assignments: &[BatchAssignment],
) -> Result<(), ContractError> {
    let Some((first, last)) = assignments.first().zip(assignments.last()) else {
        return if total_candidates == 0 {
            Ok(())
        } else {
            Err(ContractError::InvalidPlan(
                "no batches planned for a non-empty candidate set".to_string(),
            ))
        };
    };

    if first.start_index != 0 || last.end_index_exclusive != total_candidates {
        return Err(ContractError::InvalidPlan(
            "batch boundaries do not cover every candidate".to_string(),
        ));
    }

    for pair in assignments.windows(2) {
        if pair[0].end_index_exclusive != pair[1].start_index {
            return Err(ContractError::InvalidPlan(
                "batch boundaries overlap or leave gaps".to_string(),
            ));
        }
    }

    if assignments
        .iter()
        .any(|assignment| assignment.is_empty() || assignment.len() > batch_size)
    {
        return Err(ContractError::InvalidPlan(format!(
            "every batch must hold between 1 and {batch_size} candidates"
        )));
    }

    Ok(())
}
