//! # Log Relevance
//!
//! Decides who a log is "about" and therefore who may see it.
//!
//! A log's indexed topics are 32-byte words. An address stored in a topic is
//! left-padded with 12 zero bytes, so a topic is treated as a user address
//! ("subject") when:
//!
//! 1. its high 12 bytes are zero (a real hash practically never is),
//! 2. the address has a non-zero nonce at the log's block, and
//! 3. the address has no contract code at that block.
//!
//! Condition 2 stops anyone from making a log permanently private by
//! planting an untouched address in a topic: a nonce only moves when the
//! key holder sends a transaction.
//!
//! A log with no subjects is a lifecycle event and is visible to everyone.

use crate::ports::outbound::AccountStateReader;
use shared_types::{Address, Hash, Log, ADDRESS_LEN, HASH_LEN};
use std::collections::BTreeSet;

/// Number of zero bytes padding an address inside a topic word.
pub const ADDRESS_PADDING_LEN: usize = HASH_LEN - ADDRESS_LEN;

/// Addresses a log is determined to be about.
pub type SubjectAddresses = BTreeSet<Address>;

/// Condition 1: the topic's high-order 12 bytes are zero.
pub fn has_address_padding(topic: &Hash) -> bool {
    topic[..ADDRESS_PADDING_LEN].iter().all(|&b| b == 0)
}

/// The low-order 20 bytes of a topic, read as an address.
pub fn topic_address(topic: &Hash) -> Address {
    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&topic[ADDRESS_PADDING_LEN..]);
    address
}

/// Condition 2: the address has sent at least one transaction.
pub fn has_transacted<S: AccountStateReader + ?Sized>(address: &Address, state: &S) -> bool {
    state.nonce(address) != 0
}

/// Condition 3: the address carries contract code.
pub fn has_code<S: AccountStateReader + ?Sized>(address: &Address, state: &S) -> bool {
    state.code(address).is_some_and(|code| !code.is_empty())
}

/// The topic decoded as a user address, if it passes all three conditions.
pub fn user_address_from_topic<S: AccountStateReader + ?Sized>(
    topic: &Hash,
    state: &S,
) -> Option<Address> {
    if !has_address_padding(topic) {
        return None;
    }

    let address = topic_address(topic);
    (has_transacted(&address, state) && !has_code(&address, state)).then_some(address)
}

/// Subject addresses of `log`, read from every topic except the event
/// signature (topic 0).
pub fn extract_subject_addresses<S: AccountStateReader + ?Sized>(
    log: &Log,
    state: &S,
) -> SubjectAddresses {
    log.indexed_topics()
        .iter()
        .filter_map(|topic| user_address_from_topic(topic, state))
        .collect()
}

/// Whether `account` may see a log with the given subjects.
pub fn is_relevant(subjects: &SubjectAddresses, account: &Address) -> bool {
    subjects.is_empty() || subjects.contains(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_state::InMemoryAccountState;
    use proptest::prelude::*;

    const USER: Address = [0x11; 20];
    const FRESH: Address = [0x22; 20];
    const CONTRACT: Address = [0x33; 20];
    const EVENT_SIG: Hash = [0xEE; 32];

    fn padded(address: &Address) -> Hash {
        let mut topic = [0u8; 32];
        topic[ADDRESS_PADDING_LEN..].copy_from_slice(address);
        topic
    }

    fn state() -> InMemoryAccountState {
        InMemoryAccountState::new()
            .with_account(USER, 3, None)
            .with_account(CONTRACT, 1, Some(vec![0x60, 0x80]))
    }

    fn log_with_topics(topics: Vec<Hash>) -> Log {
        Log {
            address: [0xC1; 20],
            topics,
            data: vec![],
            block_number: 1,
            transaction_hash: [0; 32],
            transaction_index: 0,
            block_hash: [0xB1; 32],
            log_index: 0,
            removed: false,
        }
    }

    #[test]
    fn test_padding_condition() {
        assert!(has_address_padding(&padded(&USER)));

        let mut hash_like = padded(&USER);
        hash_like[11] = 1;
        assert!(!has_address_padding(&hash_like));
    }

    #[test]
    fn test_nonce_condition() {
        let state = state();
        assert!(has_transacted(&USER, &state));
        assert!(!has_transacted(&FRESH, &state));
    }

    #[test]
    fn test_code_condition() {
        let state = state().with_account([0x44; 20], 1, Some(vec![]));
        assert!(has_code(&CONTRACT, &state));
        assert!(!has_code(&USER, &state));
        // Empty code is the same as no code
        assert!(!has_code(&[0x44; 20], &state));
    }

    #[test]
    fn test_user_address_from_topic() {
        let state = state();
        assert_eq!(user_address_from_topic(&padded(&USER), &state), Some(USER));
        assert_eq!(user_address_from_topic(&padded(&FRESH), &state), None);
        assert_eq!(user_address_from_topic(&padded(&CONTRACT), &state), None);
        assert_eq!(user_address_from_topic(&[0xAB; 32], &state), None);
    }

    #[test]
    fn test_event_signature_topic_ignored() {
        let state = state();
        // USER padded into topic 0 is the event signature slot, never a subject
        let log = log_with_topics(vec![padded(&USER)]);
        assert!(extract_subject_addresses(&log, &state).is_empty());
    }

    #[test]
    fn test_extracts_only_user_subjects() {
        let state = state();
        let log = log_with_topics(vec![
            EVENT_SIG,
            padded(&USER),
            padded(&FRESH),
            padded(&CONTRACT),
            [0x99; 32],
        ]);

        let subjects = extract_subject_addresses(&log, &state);
        assert_eq!(subjects.into_iter().collect::<Vec<_>>(), vec![USER]);
    }

    #[test]
    fn test_duplicate_subjects_collapse() {
        let state = state();
        let log = log_with_topics(vec![EVENT_SIG, padded(&USER), padded(&USER)]);
        assert_eq!(extract_subject_addresses(&log, &state).len(), 1);
    }

    #[test]
    fn test_log_without_topics() {
        let log = log_with_topics(vec![]);
        assert!(extract_subject_addresses(&log, &state()).is_empty());
    }

    #[test]
    fn test_lifecycle_event_visible_to_all() {
        let subjects = SubjectAddresses::new();
        assert!(is_relevant(&subjects, &USER));
        assert!(is_relevant(&subjects, &FRESH));
    }

    proptest! {
        #[test]
        fn prop_disclosure_correctness(
            subjects in proptest::collection::btree_set(any::<[u8; 20]>(), 0..6),
            outsider in any::<[u8; 20]>(),
        ) {
            for member in &subjects {
                prop_assert!(is_relevant(&subjects, member));
            }

            if subjects.is_empty() {
                prop_assert!(is_relevant(&subjects, &outsider));
            } else if !subjects.contains(&outsider) {
                prop_assert!(!is_relevant(&subjects, &outsider));
            }
        }
    }
}
