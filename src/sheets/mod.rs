//! Google Sheets integration: service-account auth and row appends.
//!
//! [`auth`] turns a service-account key into a short-lived OAuth2 access
//! token (RS256-signed JWT assertion, JWT-bearer grant). [`client`] uses
//! that token to append one row per submission through the Sheets v4
//! `values:append` endpoint. The pipeline only sees the [`RowSink`] trait.

pub mod auth;
pub mod client;

pub use auth::{AccessToken, ServiceAccountKey, SPREADSHEETS_SCOPE};
pub use client::{AppendReceipt, RowSink, SheetsClient};
