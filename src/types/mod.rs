//! Types shared by the clients and the conformance suites.
//!
//! This module defines the interface format, decoded response bodies,
//! request payloads and the typed views of network resources.

mod common;
mod requests;
mod responses;

pub use common::*;
pub use requests::*;
pub use responses::*;
