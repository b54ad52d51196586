//! # Enclave Events
//!
//! Confidential log delivery for a privacy-preserving L2 enclave.
//!
//! Subscribers register an encrypted request binding a viewing key to their
//! account. For every produced batch the enclave filters the logs each
//! subscriber asked for, withholds logs that are about someone else, and
//! encrypts what remains so only that subscriber can read it.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): authorization, relevance and filtering, no I/O
//! - **Ports Layer** (`ports/`): the inbound API and the collaborators it needs
//! - **Adapters** (`adapters/`): enclave-key decryption, bincode codec,
//!   in-memory state
//! - **Service Layer** (`service.rs`): the delivery pipeline over the registry
//!
//! ## Security Notes
//!
//! - A subscription exists only after its viewing-key signature verifies
//! - A log whose topics name a user is shown only to that user; a log naming
//!   nobody is shown to everyone
//! - Each delivery is encrypted with fresh randomness for one viewing key

pub mod adapters;
pub mod client;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod service;

// Re-export public API
pub use adapters::{
    BincodeSubscriptionCodec, EnclaveKeyDecryptor, InMemoryAccountState, InMemoryStateProvider,
};
pub use client::ViewingKey;
pub use domain::config::SubscriptionConfig;
pub use domain::entities::{
    EncryptedSubscriptionLogs, FilterCriteria, IdAndEncryptedLogs, LogSubscription,
    SubscriptionId, SubscriptionRequest,
};
pub use domain::errors::EventsError;
pub use domain::filter::{filter_logs, SkipReason};
pub use domain::relevance::{extract_subject_addresses, is_relevant, SubjectAddresses};
pub use domain::viewing_key::{
    authorize, ChallengeFormat, EncryptionHandle, LogEncryptor, ViewingKeyAuthorizer,
    LEGACY_CHALLENGE, REGISTRATION_CHALLENGE, SUPPORTED_CHALLENGES,
};
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use ports::inbound::SubscriptionApi;
pub use ports::outbound::{AccountStateReader, InboundDecryptor, StateProvider, SubscriptionDecoder};
pub use registry::SubscriptionRegistry;
pub use service::SubscriptionManager;
