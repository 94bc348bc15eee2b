//! CSV batch input.
//!
//! One row per record. The `type` column selects the entry point
//! (`exchange`, `buy`, `sell`, `permutation`, `deposit`, `withdraw`,
//! `payment`, `other`, `balance`); every other column is a field name.
//! Empty cells count as absent fields, so one wide header can serve every
//! operation type. The `exchange` row must come first.

use crate::config::ReportOptions;
use crate::error::{ReportError, Result, ValidationError, ValidationErrors};
use crate::fields::RawFields;
use crate::registry::RecordId;
use crate::report::Report;
use csv::{ReaderBuilder, Trim};
use log::debug;
use std::collections::HashMap;
use std::io::Read;

const TYPE_COLUMN: &str = "type";

/// Reads every row of `reader` into a new report.
///
/// The first rejected row aborts the whole batch.
pub fn read_report<R: Read>(reader: R, options: ReportOptions) -> Result<Report> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut report: Option<Report> = None;

    for (row_idx, result) in csv_reader
        .deserialize::<HashMap<String, String>>()
        .enumerate()
    {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row
        let mut columns = result?;
        let kind = columns
            .remove(TYPE_COLUMN)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let fields: RawFields = columns.into_iter().collect();

        if kind == "exchange" {
            if report.is_some() {
                let errors = ValidationErrors(vec![ValidationError::new(
                    TYPE_COLUMN,
                    "exchange identity is already set",
                )]);
                return Err(invalid_row(row_num, errors.into()));
            }
            report = Some(
                Report::with_options(&fields, options).map_err(|e| invalid_row(row_num, e))?,
            );
            continue;
        }

        let Some(report) = report.as_mut() else {
            return Err(ReportError::MissingExchange);
        };
        let id = add_row(report, &kind, &fields, row_num)?;
        debug!("Row {}: registered {} as record {}", row_num, kind, id.0);
    }

    report.ok_or(ReportError::MissingExchange)
}

fn add_row(report: &mut Report, kind: &str, fields: &RawFields, row: usize) -> Result<RecordId> {
    let added = match kind {
        "buy" => report.add_buy_operation(fields),
        "sell" => report.add_sell_operation(fields),
        "permutation" => report.add_permutation_operation(fields),
        "deposit" => report.add_deposit_operation(fields),
        "withdraw" => report.add_withdraw_operation(fields),
        "payment" => report.add_payment_operation(fields),
        "other" => report.add_other_operation(fields),
        "balance" => report.add_balance_report(fields),
        _ => {
            return Err(ReportError::UnknownOperation {
                row,
                kind: kind.to_string(),
            })
        }
    };
    added.map_err(|e| invalid_row(row, e))
}

fn invalid_row(row: usize, source: ReportError) -> ReportError {
    ReportError::InvalidRow {
        row,
        source: Box::new(source),
    }
}
