//! Type definitions
//!
//! This module contains the response bodies served by the host listener.

pub mod response;

pub use response::{ErrorResponse, PingResponse, PublicUrlResponse};
