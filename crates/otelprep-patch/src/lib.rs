//! Collector document patching for otelprep.
//!
//! [`DocumentPatcher`] applies a resolved configuration to the template
//! documents shipped with the collector image:
//! - the collector document gets its remote write exporter, log level and
//!   one `prometheus_exec` receiver per monitored postgres instance
//! - the CloudWatch exporter document gets its region, time window and the
//!   metric entries of every selected namespace
//!
//! Patching works on an owned [`otelprep_core::Document`] and never touches
//! the file it came from. Receiver keys are derived from the instance
//! identity, so patching the same document twice leaves it unchanged apart
//! from the allocated ports.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod patcher;
mod ports;
mod receiver;

pub use error::PatchError;
pub use patcher::{AuxiliaryOutcome, DocumentPatcher};
pub use ports::{EphemeralPorts, PortAllocator, SequentialPorts};
pub use receiver::{
    connection_string, label_string, receiver_body, receiver_key, EXPORTER_EXEC,
    EXTENDED_QUERY_PATH, SINGLE_RECEIVER_KEY,
};
