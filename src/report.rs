//! Report context: exchange identity, registered operations and export.
//!
//! Operations are validated when added and kept in insertion order. The
//! exported text is rebuilt from scratch on every call, so exporting twice
//! without adding anything yields byte-identical output.

use crate::config::ReportOptions;
use crate::decimal::Amount;
use crate::encoder::{FooterTotals, LineEncoder};
use crate::error::{ReportError, Result, ValidationErrors};
use crate::fields::RawFields;
use crate::operation::{ExchangeIdentity, Operation};
use crate::registry::{OperationRegistry, RecordId};
use crate::validator;
use chrono::FixedOffset;
use log::{debug, warn};
use std::io::Write;

/// Width reported when the footer total overflows decimal arithmetic.
const OVERFLOW_WIDTH: usize = 29;

/// A report under construction for one exchange.
///
/// # Example
///
/// ```
/// use crypto_report::{RawFields, Report};
///
/// let mut report = Report::new(
///     &RawFields::new()
///         .with("exchange_name", "Binance")
///         .with("exchange_country", "US")
///         .with("exchange_url", "https://binance.com"),
/// )
/// .unwrap();
///
/// report
///     .add_buy_operation(
///         &RawFields::new()
///             .with("date", "25/05/2019")
///             .with("brl_value", "R$ 1500,80")
///             .with("brl_fees", "R$ 1,49")
///             .with("coin_symbol", "BTC")
///             .with("coin_quantity", "0.0000001"),
///     )
///     .unwrap();
///
/// let text = report.export_file().unwrap();
/// assert_eq!(text.lines().last(), Some("9999|1|150080|0|0|0|0|0|0"));
/// ```
#[derive(Debug, Clone)]
pub struct Report {
    exchange: ExchangeIdentity,
    options: ReportOptions,
    registry: OperationRegistry,
}

impl Report {
    /// Validates the exchange identity and starts an empty report.
    pub fn new(exchange: &RawFields) -> Result<Self> {
        Self::with_options(exchange, ReportOptions::default())
    }

    pub fn with_options(exchange: &RawFields, options: ReportOptions) -> Result<Self> {
        let identity = validator::exchange_identity(exchange).map_err(|errors| {
            warn!("Rejected exchange identity: {}", errors);
            ReportError::Validation(errors)
        })?;
        Ok(Self::from_identity(identity, options))
    }

    /// Starts a report from an already validated identity.
    pub fn from_identity(exchange: ExchangeIdentity, options: ReportOptions) -> Self {
        debug!("Created report for exchange {}", exchange.name);
        Report {
            exchange,
            options,
            registry: OperationRegistry::new(),
        }
    }

    pub fn exchange(&self) -> &ExchangeIdentity {
        &self.exchange
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Registered operations in insertion order.
    pub fn operations(&self) -> &[Operation] {
        self.registry.all()
    }

    /// Appends an already typed operation, skipping field validation.
    /// The encoder still checks every cell at export time.
    pub fn register(&mut self, operation: Operation) -> RecordId {
        self.registry.register(operation)
    }

    pub fn add_buy_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("buy", fields, validator::trade, Operation::Buy)
    }

    pub fn add_sell_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("sell", fields, validator::trade, Operation::Sell)
    }

    pub fn add_permutation_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add(
            "permutation",
            fields,
            validator::permutation,
            Operation::Permutation,
        )
    }

    pub fn add_deposit_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("deposit", fields, validator::transfer, Operation::Deposit)
    }

    pub fn add_withdraw_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("withdraw", fields, validator::transfer, Operation::Withdraw)
    }

    pub fn add_payment_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("payment", fields, validator::payment, Operation::Payment)
    }

    pub fn add_other_operation(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add("other", fields, validator::other, Operation::Other)
    }

    pub fn add_balance_report(&mut self, fields: &RawFields) -> Result<RecordId> {
        self.add(
            "balance",
            fields,
            validator::balance_report,
            Operation::BalanceReport,
        )
    }

    /// Validates `fields` and registers the result; nothing is appended on failure.
    fn add<T>(
        &mut self,
        kind: &str,
        fields: &RawFields,
        validate: fn(&RawFields, FixedOffset) -> std::result::Result<T, ValidationErrors>,
        wrap: fn(T) -> Operation,
    ) -> Result<RecordId> {
        match validate(fields, self.options.utc_offset) {
            Ok(payload) => Ok(self.registry.register(wrap(payload))),
            Err(errors) => {
                warn!("Rejected {} operation: {}", kind, errors);
                Err(ReportError::Validation(errors))
            }
        }
    }

    /// Builds the complete report text.
    ///
    /// Header, one line per operation in registration order (one per holding
    /// for balance reports), then the footer. Any cell that breaks the layout
    /// fails the whole export.
    pub fn export_file(&self) -> Result<String> {
        let encoder = LineEncoder::new(self.options.utc_offset);
        let mut lines = vec![encoder.header(&self.exchange)?];
        let mut totals = FooterTotals::default();

        for operation in self.registry.all() {
            let encoded = encoder.encode(operation)?;
            totals.add_lines(operation.record_type(), encoded.len());

            if let Operation::Buy(trade) | Operation::Sell(trade) = operation {
                totals.trade_brl_total = totals
                    .trade_brl_total
                    .checked_add(trade.brl_value.round_to(Amount::FIAT_SCALE))
                    .ok_or_else(|| ReportError::EncodingWidthExceeded {
                        field: "total_brl_value".to_string(),
                        max_width: Amount::FIAT_MAX_DIGITS,
                        actual_width: OVERFLOW_WIDTH,
                    })?;
            }
            lines.extend(encoded);
        }

        lines.push(encoder.footer(&totals)?);
        debug!(
            "Exported {} operations as {} lines ({} operation lines)",
            self.registry.len(),
            lines.len(),
            totals.operation_lines()
        );

        let separator = self.options.line_separator.as_str();
        let mut text = lines.join(separator);
        if self.options.trailing_separator {
            text.push_str(separator);
        }
        Ok(text)
    }

    /// Writes the exported text to `writer`.
    pub fn write_output<W: Write>(&self, mut writer: W) -> Result<()> {
        let text = self.export_file()?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
