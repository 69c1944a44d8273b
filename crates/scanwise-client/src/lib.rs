//! ScanWise Analysis Client
//!
//! Talks to the remote analysis service: product analysis, barcode lookup,
//! catalog search, alternatives, history, favorites and the user profile.
//!
//! # Outcome Classification
//!
//! A submission resolves to one of:
//! - [`SubmitOutcome::Analysis`]: a populated result
//! - [`SubmitOutcome::Empty`]: the service answered but analyzed nothing
//! - [`ClientError::Remote`]: a domain message from the service, shown verbatim
//! - [`ClientError::Connection`]: a transport failure, shown as a generic retry prompt
//!
//! Nothing is retried automatically; the caller decides whether to resubmit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod http;
pub mod service;

pub use error::{ClientError, Result, CONNECTION_MESSAGE};
pub use http::{
    build_http_client, classify_scan_response, HttpAnalysisClient, MIN_SEARCH_QUERY_CHARS,
    UNEXPECTED_RESPONSE_MESSAGE,
};
pub use service::{AnalysisService, SubmitOutcome, EMPTY_RESULT_MESSAGE};
