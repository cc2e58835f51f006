//! Core library for the g2b-export command line application.
//!
//! The library pulls bid notices and order plans from the public procurement
//! OpenAPI and writes them to Excel, and turns an exported bid-notice workbook
//! into a deduplicated contact list. Transport and file formats live under
//! [`io`], record shapes in [`model`], item normalization in [`normalize`],
//! paging in [`fetch`], and the end-to-end pipelines in [`sync`].

pub mod config;
pub mod contacts;
pub mod error;
pub mod export;
pub mod fetch;
pub mod flatten;
pub mod io;
pub mod model;
pub mod normalize;
pub mod sync;

pub use error::{Result, ToolError};
