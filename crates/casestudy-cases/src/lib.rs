//! Case-law search against the CourtListener REST API (v4).
//!
//! Result mapping is always compiled; the HTTP client needs feature `http`.

mod error;
mod mapping;
mod query;

#[cfg(feature = "http")]
mod client;

pub use error::CasesError;
pub use mapping::{
    CaseResults, CaseSummary, Cluster, OpinionSnippet, SearchHit, SearchResponse, court_name,
    jurisdiction, parse_case_id,
};
pub use query::{CaseQuery, MAX_PAGE_SIZE};

#[cfg(feature = "http")]
pub use client::CourtListenerClient;
