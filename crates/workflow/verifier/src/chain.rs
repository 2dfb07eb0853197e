//! Chain replay: recompute every record hash from genesis

use serde::{Deserialize, Serialize};
use workflow_types::{Digest, WorkflowInstance, WorkflowStepRecord};

/// Result of replaying an instance's hash chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub total_records: usize,
    pub verified_records: usize,
    /// Sequence position of the first record that does not verify
    pub first_divergence_seq: Option<u64>,
    /// Why that record failed
    pub fault: Option<RecordFault>,
    /// Stored instance head differs from the last record hash
    pub head_mismatch: bool,
    /// Head hash implied by the records themselves
    pub recomputed_head: Digest,
}

/// Why a single record failed to verify
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFault {
    SequenceGap,
    BrokenLink,
    HashMismatch,
}

/// Check one record against its expected position and predecessor hash
pub fn verify_record(
    record: &WorkflowStepRecord,
    expected_seq: u64,
    expected_previous: Digest,
) -> Result<(), RecordFault> {
    if record.sequence_number != expected_seq {
        return Err(RecordFault::SequenceGap);
    }
    if record.previous_hash != expected_previous {
        return Err(RecordFault::BrokenLink);
    }
    if !record.hash_matches() {
        return Err(RecordFault::HashMismatch);
    }
    Ok(())
}

/// Replay the chain from genesis and report the first divergence.
///
/// Replay stops at the first record that does not verify; everything from
/// that position on is untrusted.
pub fn verify_chain(instance: &WorkflowInstance) -> ChainVerification {
    let mut previous = Digest::GENESIS;

    for (index, record) in instance.steps.iter().enumerate() {
        let seq = index as u64;
        if let Err(fault) = verify_record(record, seq, previous) {
            return ChainVerification {
                valid: false,
                total_records: instance.steps.len(),
                verified_records: index,
                first_divergence_seq: Some(seq),
                fault: Some(fault),
                head_mismatch: false,
                recomputed_head: previous,
            };
        }
        previous = record.hash;
    }

    let head_mismatch = instance.chain_hash != previous;
    ChainVerification {
        valid: !head_mismatch,
        total_records: instance.steps.len(),
        verified_records: instance.steps.len(),
        first_divergence_seq: None,
        fault: None,
        head_mismatch,
        recomputed_head: previous,
    }
}
