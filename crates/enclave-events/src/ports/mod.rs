//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API the transport and ingestion layers call
//! - **Outbound (Driven)**: Collaborators this subsystem needs

pub mod inbound;
pub mod outbound;
