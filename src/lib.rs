//! # Crypto Report
//!
//! Builds the pipe-delimited monthly report a Brazilian crypto exchange
//! files with the Receita Federal from manually entered operations.
//!
//! ## Design Principles
//!
//! - **Validate on entry**: every operation is normalized and checked when added
//! - **Exact arithmetic**: amounts are `rust_decimal` values, never floats
//! - **Fixed layout**: each record type has a fixed cell count and width budget
//! - **Deterministic output**: exporting twice yields identical text
//!
//! ## Example
//!
//! ```no_run
//! use crypto_report::{read_report, ReportOptions};
//! use std::io::Cursor;
//!
//! let csv = "type,exchange_name,exchange_url,date,brl_value,coin_symbol,coin_quantity\n\
//!            exchange,Binance,https://binance.com,,,,\n\
//!            buy,,,25/05/2019,\"1500,80\",BTC,0.5\n";
//! let report = read_report(Cursor::new(csv), ReportOptions::default()).unwrap();
//! report.write_output(std::io::stdout()).unwrap();
//! ```

pub mod config;
pub mod decimal;
pub mod document;
pub mod encoder;
pub mod error;
pub mod fields;
pub mod input;
pub mod normalize;
pub mod operation;
pub mod registry;
pub mod report;
pub mod validator;

pub use config::{LineSeparator, ReportOptions};
pub use decimal::Amount;
pub use document::IdentityType;
pub use error::{ReportError, Result, ValidationError, ValidationErrors};
pub use fields::{RawFields, RawValue};
pub use input::read_report;
pub use operation::{ExchangeIdentity, Operation, RecordType};
pub use registry::RecordId;
pub use report::Report;
