//! # Log Filter
//!
//! Applies subscriber criteria to candidate logs, following the semantics of
//! Ethereum's `eth_getLogs` filter:
//!
//! - `from_block` applies only when non-negative
//! - `to_block` applies only when positive; zero or negative means unbounded
//! - an empty address list matches any emitter
//! - topic match-sets are positional: an empty set is a wildcard, a non-empty
//!   set matches if the topic at that position equals any member
//! - a log with fewer topics than match-set positions never matches
//!
//! Input order is preserved.

use super::entities::FilterCriteria;
use shared_types::{to_hex, Log};
use tracing::trace;

/// Why a log was dropped by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The log is older than `from_block`.
    BeforeFromBlock,
    /// The log is newer than `to_block`.
    AfterToBlock,
    /// The emitting contract is not in the address list.
    AddressNotOfInterest,
    /// The log has fewer topics than the criteria require.
    InsufficientTopics,
    /// A topic position did not match.
    TopicMismatch,
}

impl FilterCriteria {
    /// Check one log against these criteria.
    ///
    /// Returns `Err` with the first failing condition.
    pub fn check(&self, log: &Log) -> Result<(), SkipReason> {
        if let Some(from) = self.from_block {
            if from >= 0 && (from as u64) > log.block_number {
                return Err(SkipReason::BeforeFromBlock);
            }
        }

        if let Some(to) = self.to_block {
            if to > 0 && (to as u64) < log.block_number {
                return Err(SkipReason::AfterToBlock);
            }
        }

        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return Err(SkipReason::AddressNotOfInterest);
        }

        if self.topics.len() > log.topics.len() {
            return Err(SkipReason::InsufficientTopics);
        }

        let all_positions_match = self
            .topics
            .iter()
            .zip(&log.topics)
            .all(|(match_set, topic)| match_set.is_empty() || match_set.contains(topic));
        if !all_positions_match {
            return Err(SkipReason::TopicMismatch);
        }

        Ok(())
    }

    /// Whether `log` satisfies these criteria.
    pub fn matches(&self, log: &Log) -> bool {
        self.check(log).is_ok()
    }
}

/// The logs satisfying `criteria`, in input order.
pub fn filter_logs<'a, I>(logs: I, criteria: &FilterCriteria) -> Vec<&'a Log>
where
    I: IntoIterator<Item = &'a Log>,
{
    logs.into_iter()
        .filter(|log| match criteria.check(log) {
            Ok(()) => true,
            Err(reason) => {
                trace!(
                    block = log.block_number,
                    log_index = log.log_index,
                    address = %to_hex(&log.address),
                    ?reason,
                    "Skipping log"
                );
                false
            }
        })
        .collect()
}
