//! Renders records into pipe-delimited report lines.
//!
//! Every line starts with its four-digit record code and carries exactly
//! [`RecordType::field_count`] cells. Optional values render as empty cells
//! so column positions never shift. Each cell is checked against its layout
//! budget here, as a last line of defence after validation: a value that
//! does not fit aborts the export instead of producing a corrupt line.

use crate::decimal::Amount;
use crate::error::{ReportError, Result};
use crate::normalize::sanitize_text;
use crate::operation::{
    BalanceReport, CoinLeg, ExchangeIdentity, Operation, OperationBase, Party, Permutation,
    RecordType, Trade, Transfer, TwoPartyTransfer,
};
use crate::validator::{
    ADDRESS_MAX, COIN_SYMBOL_MAX, COUNTRY_MAX, DOCUMENT_MAX, ID_MAX, NAME_MAX, URL_MAX,
};
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Field delimiter of the layout.
pub const DELIMITER: char = '|';

/// Width of a `DDMMYYYY` cell.
const DATE_WIDTH: usize = 8;

/// Names a cell in error messages, using the input key it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub role: &'static str,
    pub name: &'static str,
}

impl Column {
    const fn new(name: &'static str) -> Self {
        Column { role: "", name }
    }

    const fn of(role: &'static str, name: &'static str) -> Self {
        Column { role, name }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role, self.name)
    }
}

/// One cell of a line.
#[derive(Debug, Clone)]
pub enum Field<'a> {
    /// Layout constant such as a record code or nature code
    Code(&'static str),
    Text {
        column: Column,
        value: Option<&'a str>,
        min_width: usize,
        max_width: usize,
    },
    Date(&'a DateTime<FixedOffset>),
    /// BRL value with 2 implied decimals
    Fiat { column: Column, value: &'a Amount },
    /// Coin quantity with 10 implied decimals
    Coin { column: Column, value: &'a Amount },
    Count(usize),
    Empty,
}

impl<'a> Field<'a> {
    fn text(column: Column, value: &'a str, max_width: usize) -> Self {
        Field::Text {
            column,
            value: Some(value),
            min_width: 1,
            max_width,
        }
    }

    fn optional_text(column: Column, value: Option<&'a str>, max_width: usize) -> Self {
        Field::Text {
            column,
            value,
            min_width: 0,
            max_width,
        }
    }
}

/// Aggregates written in the footer line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FooterTotals {
    /// Lines emitted per body record type, in [`RecordType::BODY`] order
    pub lines: [usize; 7],
    /// Sum of the rounded BRL values of every buy and sell line
    pub trade_brl_total: Amount,
}

impl FooterTotals {
    pub fn count(&self, record: RecordType) -> usize {
        RecordType::BODY
            .iter()
            .position(|r| *r == record)
            .map(|i| self.lines[i])
            .unwrap_or(0)
    }

    /// Records `n` more lines of `record`.
    pub fn add_lines(&mut self, record: RecordType, n: usize) {
        if let Some(i) = RecordType::BODY.iter().position(|r| *r == record) {
            self.lines[i] += n;
        }
    }

    /// Lines of every record type except balance reports.
    pub fn operation_lines(&self) -> usize {
        RecordType::BODY
            .iter()
            .zip(self.lines)
            .filter(|(record, _)| **record != RecordType::Balance)
            .map(|(_, n)| n)
            .sum()
    }
}

/// Encodes records with dates printed in a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct LineEncoder {
    offset: FixedOffset,
}

impl LineEncoder {
    pub fn new(offset: FixedOffset) -> Self {
        LineEncoder { offset }
    }

    /// `0000|document|name|url`
    pub fn header(&self, exchange: &ExchangeIdentity) -> Result<String> {
        self.render(
            RecordType::Header,
            &[
                Field::Code(RecordType::Header.code()),
                Field::optional_text(
                    Column::new("exchange_document"),
                    exchange.document.as_deref(),
                    DOCUMENT_MAX,
                ),
                Field::text(Column::new("exchange_name"), &exchange.name, NAME_MAX),
                Field::text(Column::new("exchange_url"), &exchange.url, URL_MAX),
            ],
        )
    }

    /// Lines for one operation: one line, or one per holding for balance reports.
    pub fn encode(&self, operation: &Operation) -> Result<Vec<String>> {
        match operation {
            Operation::Buy(trade) | Operation::Sell(trade) => {
                Ok(vec![self.trade_line(trade)?])
            }
            Operation::Permutation(permutation) => {
                Ok(vec![self.permutation_line(permutation)?])
            }
            Operation::Deposit(transfer) => {
                Ok(vec![self.transfer_line(RecordType::Deposit, transfer)?])
            }
            Operation::Withdraw(transfer) => {
                Ok(vec![self.transfer_line(RecordType::Withdraw, transfer)?])
            }
            Operation::Payment(transfer) => Ok(vec![self.two_party_line(
                RecordType::Payment,
                transfer,
                ("payer_", "receiver_"),
            )?]),
            Operation::Other(transfer) => Ok(vec![self.two_party_line(
                RecordType::Other,
                transfer,
                ("origin_", "recipient_"),
            )?]),
            Operation::BalanceReport(report) => self.balance_lines(report),
        }
    }

    /// `9999|n0110|total0110|n0210|n0410|n0510|n0710|n0910|n1000`
    pub fn footer(&self, totals: &FooterTotals) -> Result<String> {
        let mut fields = vec![
            Field::Code(RecordType::Footer.code()),
            Field::Count(totals.count(RecordType::Trade)),
            Field::Fiat {
                column: Column::new("total_brl_value"),
                value: &totals.trade_brl_total,
            },
        ];
        fields.extend(
            RecordType::BODY[1..]
                .iter()
                .map(|record| Field::Count(totals.count(*record))),
        );
        self.render(RecordType::Footer, &fields)
    }

    fn trade_line(&self, trade: &Trade) -> Result<String> {
        let record = RecordType::Trade;
        let mut fields = self.opening(record, &trade.base.date, trade.base.id.as_deref());
        fields.push(Field::Fiat {
            column: Column::new("brl_value"),
            value: &trade.brl_value,
        });
        fields.extend(coin_fields(&trade.base));
        fields.extend(party_fields("buyer_", trade.buyer.as_ref()));
        fields.extend(party_fields("seller_", trade.seller.as_ref()));
        self.render(record, &fields)
    }

    fn permutation_line(&self, permutation: &Permutation) -> Result<String> {
        let record = RecordType::Permutation;
        let mut fields = self.opening(record, &permutation.date, permutation.id.as_deref());
        fields.push(Field::Fiat {
            column: Column::new("brl_fees"),
            value: &permutation.brl_fees,
        });
        fields.extend(leg_fields("received_", &permutation.received));
        fields.extend(leg_fields("delivered_", &permutation.delivered));
        self.render(record, &fields)
    }

    fn transfer_line(&self, record: RecordType, transfer: &Transfer) -> Result<String> {
        let mut fields = self.opening(record, &transfer.base.date, transfer.base.id.as_deref());
        fields.extend(coin_fields(&transfer.base));
        fields.extend(party_fields("", Some(&transfer.party)));
        self.render(record, &fields)
    }

    fn two_party_line(
        &self,
        record: RecordType,
        transfer: &TwoPartyTransfer,
        roles: (&'static str, &'static str),
    ) -> Result<String> {
        let mut fields = self.opening(record, &transfer.base.date, transfer.base.id.as_deref());
        fields.extend(coin_fields(&transfer.base));
        fields.extend(party_fields(roles.0, transfer.from.as_ref()));
        fields.extend(party_fields(roles.1, transfer.to.as_ref()));
        self.render(record, &fields)
    }

    fn balance_lines(&self, report: &BalanceReport) -> Result<Vec<String>> {
        let record = RecordType::Balance;
        let mut prefix = vec![Field::Code(record.code()), Field::Date(&report.date)];
        prefix.extend(party_fields("", Some(&report.holder)));
        prefix.push(Field::Fiat {
            column: Column::new("fiat_balance"),
            value: &report.fiat_balance,
        });

        if report.holdings.is_empty() {
            let mut fields = prefix;
            fields.extend([Field::Empty, Field::Empty]);
            return Ok(vec![self.render(record, &fields)?]);
        }

        report
            .holdings
            .iter()
            .map(|holding| {
                let mut fields = prefix.clone();
                fields.push(Field::text(
                    Column::new("coin_symbol"),
                    &holding.coin_symbol,
                    COIN_SYMBOL_MAX,
                ));
                fields.push(Field::Coin {
                    column: Column::new("coin_balance"),
                    value: &holding.coin_balance,
                });
                self.render(record, &fields)
            })
            .collect()
    }

    /// Record code, date, external id and nature code.
    fn opening<'a>(
        &self,
        record: RecordType,
        date: &'a DateTime<FixedOffset>,
        id: Option<&'a str>,
    ) -> Vec<Field<'a>> {
        vec![
            Field::Code(record.code()),
            Field::Date(date),
            Field::optional_text(Column::new("id"), id, ID_MAX),
            record.nature().map_or(Field::Empty, Field::Code),
        ]
    }

    fn render(&self, record: RecordType, fields: &[Field<'_>]) -> Result<String> {
        if fields.len() != record.field_count() {
            return Err(ReportError::FieldCountMismatch {
                record: record.code(),
                expected: record.field_count(),
                actual: fields.len(),
            });
        }
        let cells = fields
            .iter()
            .map(|field| self.cell(field))
            .collect::<Result<Vec<_>>>()?;
        Ok(cells.join(&DELIMITER.to_string()))
    }

    fn cell(&self, field: &Field<'_>) -> Result<String> {
        match field {
            Field::Code(code) => Ok(code.to_string()),
            Field::Text {
                column,
                value,
                min_width,
                max_width,
            } => {
                let value = value.unwrap_or("");
                if value.contains(&[DELIMITER, '\r', '\n'][..]) {
                    return Err(ReportError::DelimiterInField {
                        field: column.to_string(),
                    });
                }
                // Validated text is already in sanitized form; anything else
                // came in through `Report::register`.
                if sanitize_text(value) != value {
                    return Err(ReportError::UnsafeText {
                        field: column.to_string(),
                    });
                }
                let width = value.chars().count();
                if width < *min_width {
                    return Err(ReportError::EmptyField {
                        field: column.to_string(),
                    });
                }
                check_width(column, width, *max_width)?;
                Ok(value.to_string())
            }
            Field::Date(date) => {
                let cell = date.with_timezone(&self.offset).format("%d%m%Y").to_string();
                check_width(&Column::new("date"), cell.len(), DATE_WIDTH)?;
                Ok(cell)
            }
            Field::Fiat { column, value } => {
                let cell = value.encode(Amount::FIAT_SCALE);
                check_width(column, cell.len(), Amount::FIAT_MAX_DIGITS)?;
                Ok(cell)
            }
            Field::Coin { column, value } => {
                let cell = value.encode(Amount::COIN_SCALE);
                check_width(column, cell.len(), Amount::COIN_MAX_DIGITS)?;
                Ok(cell)
            }
            Field::Count(n) => Ok(n.to_string()),
            Field::Empty => Ok(String::new()),
        }
    }
}

fn check_width(column: &Column, actual_width: usize, max_width: usize) -> Result<()> {
    if actual_width > max_width {
        return Err(ReportError::EncodingWidthExceeded {
            field: column.to_string(),
            max_width,
            actual_width,
        });
    }
    Ok(())
}

/// Fees, coin symbol and coin quantity.
fn coin_fields(base: &OperationBase) -> [Field<'_>; 3] {
    [
        Field::Fiat {
            column: Column::new("brl_fees"),
            value: &base.brl_fees,
        },
        Field::text(Column::new("coin_symbol"), &base.coin_symbol, COIN_SYMBOL_MAX),
        Field::Coin {
            column: Column::new("coin_quantity"),
            value: &base.coin_quantity,
        },
    ]
}

fn leg_fields<'a>(role: &'static str, leg: &'a CoinLeg) -> Vec<Field<'a>> {
    let mut fields = vec![
        Field::text(Column::of(role, "coin_symbol"), &leg.coin_symbol, COIN_SYMBOL_MAX),
        Field::Coin {
            column: Column::of(role, "coin_quantity"),
            value: &leg.coin_quantity,
        },
    ];
    fields.extend(party_fields(role, leg.counterparty.as_ref()));
    fields
}

/// Identity type code, country, CPF/CNPJ, foreign document, name, address.
fn party_fields<'a>(role: &'static str, party: Option<&'a Party>) -> [Field<'a>; 6] {
    let Some(party) = party else {
        return std::array::from_fn(|_| Field::Empty);
    };
    let (national, foreign) = if party.identity_type.is_brazilian() {
        (party.document.as_deref(), None)
    } else {
        (None, party.document.as_deref())
    };
    [
        Field::Code(party.identity_type.code()),
        Field::optional_text(Column::of(role, "country"), party.country.as_deref(), COUNTRY_MAX),
        Field::optional_text(Column::of(role, "document"), national, DOCUMENT_MAX),
        Field::optional_text(Column::of(role, "document"), foreign, DOCUMENT_MAX),
        Field::text(Column::of(role, "fullname"), &party.fullname, NAME_MAX),
        Field::optional_text(Column::of(role, "address"), party.address.as_deref(), ADDRESS_MAX),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::IdentityType;
    use crate::operation::CoinBalance;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn amount(value: rust_decimal::Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        utc().with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn person(document: &str) -> Party {
        Party {
            identity_type: IdentityType::Cpf,
            country: Some("BR".to_string()),
            document: Some(document.to_string()),
            fullname: "NOME COMPLETO".to_string(),
            address: Some("Rua Nao Existente QD 0 LT 0".to_string()),
        }
    }

    fn trade() -> Trade {
        Trade {
            base: OperationBase {
                date: date(2019, 5, 25),
                id: Some("a12345".to_string()),
                brl_fees: amount(dec!(1.49)),
                coin_symbol: "BTC".to_string(),
                coin_quantity: amount(dec!(0.0000001)),
            },
            brl_value: amount(dec!(1500.80)),
            buyer: Some(person("44246742074")),
            seller: Some(person("43808960051")),
        }
    }

    #[test]
    fn test_trade_line() {
        let lines = LineEncoder::new(utc())
            .encode(&Operation::Buy(trade()))
            .unwrap();
        assert_eq!(
            lines,
            vec![
                "0110|25052019|a12345|I|150080|149|BTC|00000001000|\
                 1|BR|44246742074||NOME COMPLETO|Rua Nao Existente QD 0 LT 0|\
                 1|BR|43808960051||NOME COMPLETO|Rua Nao Existente QD 0 LT 0"
            ]
        );
    }

    #[test]
    fn test_permutation_line() {
        let permutation = Permutation {
            date: date(2019, 5, 10),
            id: None,
            brl_fees: Amount::ZERO,
            received: CoinLeg {
                coin_symbol: "BTC".to_string(),
                coin_quantity: amount(dec!(0.01)),
                counterparty: Some(Party {
                    identity_type: IdentityType::Cpf,
                    country: Some("BR".to_string()),
                    document: None,
                    fullname: "CR. HOLYVEYRAH".to_string(),
                    address: Some("RUA DAS PIRAMIDES, QD 10, LT 17".to_string()),
                }),
            },
            delivered: CoinLeg {
                coin_symbol: "USDT".to_string(),
                coin_quantity: amount(dec!(1003.00)),
                counterparty: Some(Party {
                    identity_type: IdentityType::NifPj,
                    country: Some("US".to_string()),
                    document: None,
                    fullname: "BITEX EXCHANGE".to_string(),
                    address: None,
                }),
            },
        };
        let lines = LineEncoder::new(utc())
            .encode(&Operation::Permutation(permutation))
            .unwrap();
        assert_eq!(
            lines[0],
            "0210|10052019||II|000|BTC|00100000000|1|BR|||CR. HOLYVEYRAH|\
             RUA DAS PIRAMIDES, QD 10, LT 17|USDT|10030000000000|4|US|||BITEX EXCHANGE|"
        );
        assert_eq!(lines[0].split('|').count(), RecordType::Permutation.field_count());
    }

    #[test]
    fn test_deposit_line() {
        let deposit = Transfer {
            base: OperationBase {
                date: date(2019, 8, 1),
                id: Some("REALLY_UNIQUE_ID".to_string()),
                brl_fees: Amount::ZERO,
                coin_symbol: "BTC".to_string(),
                coin_quantity: amount(dec!(0.000004)),
            },
            party: Party {
                identity_type: IdentityType::Cnpj,
                country: Some("BR".to_string()),
                document: None,
                fullname: "CASA DE CAMBIO".to_string(),
                address: None,
            },
        };
        let encoder = LineEncoder::new(utc());
        assert_eq!(
            encoder.encode(&Operation::Deposit(deposit.clone())).unwrap(),
            vec!["0410|01082019|REALLY_UNIQUE_ID|IV|000|BTC|00000040000|2|BR|||CASA DE CAMBIO|"]
        );
        let withdraw = encoder.encode(&Operation::Withdraw(deposit)).unwrap();
        assert!(withdraw[0].starts_with("0510|01082019|REALLY_UNIQUE_ID|V|"));
    }

    #[test]
    fn test_foreign_document_column() {
        let mut trade = trade();
        trade.seller = Some(Party {
            identity_type: IdentityType::Passport,
            country: Some("AR".to_string()),
            document: Some("AB123".to_string()),
            fullname: "Juan".to_string(),
            address: None,
        });
        trade.buyer = None;
        let line = LineEncoder::new(utc())
            .encode(&Operation::Sell(trade))
            .unwrap()
            .remove(0);
        assert!(line.ends_with("|||||||5|AR||AB123|Juan|"));
    }

    #[test]
    fn test_payment_line_field_count() {
        let transfer = TwoPartyTransfer {
            base: trade().base,
            from: Some(person("44246742074")),
            to: None,
        };
        let line = LineEncoder::new(utc())
            .encode(&Operation::Payment(transfer))
            .unwrap()
            .remove(0);
        assert!(line.starts_with("0710|25052019|a12345|VII|149|BTC|"));
        assert_eq!(line.split('|').count(), RecordType::Payment.field_count());
    }

    #[test]
    fn test_balance_lines_one_per_holding() {
        let report = BalanceReport {
            date: date(2019, 12, 31),
            holder: person("52998224725"),
            fiat_balance: amount(dec!(250)),
            holdings: vec![
                CoinBalance {
                    coin_symbol: "BTC".to_string(),
                    coin_balance: amount(dec!(0.5)),
                },
                CoinBalance {
                    coin_symbol: "ETH".to_string(),
                    coin_balance: amount(dec!(3)),
                },
            ],
        };
        let encoder = LineEncoder::new(utc());
        let lines = encoder
            .encode(&Operation::BalanceReport(report.clone()))
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("|25000|BTC|05000000000"));
        assert!(lines[1].ends_with("|25000|ETH|30000000000"));

        let empty = BalanceReport {
            holdings: Vec::new(),
            ..report
        };
        let lines = encoder.encode(&Operation::BalanceReport(empty)).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("|25000||"));
        assert_eq!(lines[0].split('|').count(), RecordType::Balance.field_count());
    }

    #[test]
    fn test_dates_follow_encoder_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let mut trade = trade();
        trade.base.date = utc().with_ymd_and_hms(2019, 5, 25, 2, 0, 0).unwrap();
        let line = LineEncoder::new(brt)
            .encode(&Operation::Buy(trade))
            .unwrap()
            .remove(0);
        assert!(line.starts_with("0110|24052019|"));
    }

    #[test]
    fn test_width_exceeded_is_an_error() {
        let mut trade = trade();
        trade.brl_value = amount(dec!(100000000000000.00));
        let err = LineEncoder::new(utc())
            .encode(&Operation::Buy(trade))
            .unwrap_err();
        match err {
            ReportError::EncodingWidthExceeded {
                field,
                max_width,
                actual_width,
            } => {
                assert_eq!(field, "brl_value");
                assert_eq!(max_width, 16);
                assert_eq!(actual_width, 17);
            }
            other => panic!("Expected EncodingWidthExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_delimiter_in_text_is_an_error() {
        let mut trade = trade();
        trade.seller = Some(Party {
            fullname: "A|B".to_string(),
            ..person("43808960051")
        });
        let err = LineEncoder::new(utc())
            .encode(&Operation::Buy(trade))
            .unwrap_err();
        assert!(
            matches!(err, ReportError::DelimiterInField { ref field } if field == "seller_fullname")
        );
    }

    #[test]
    fn test_unsanitized_text_is_an_error() {
        for id in ["O'Brien", "São Paulo", "tab\there"] {
            let mut trade = trade();
            trade.base.id = Some(id.to_string());
            let err = LineEncoder::new(utc())
                .encode(&Operation::Buy(trade))
                .unwrap_err();
            assert!(
                matches!(err, ReportError::UnsafeText { ref field } if field == "id"),
                "id {:?} gave {:?}",
                id,
                err
            );
        }
    }

    #[test]
    fn test_empty_required_text_is_an_error() {
        let mut trade = trade();
        trade.base.coin_symbol = String::new();
        let err = LineEncoder::new(utc())
            .encode(&Operation::Buy(trade))
            .unwrap_err();
        assert!(matches!(err, ReportError::EmptyField { ref field } if field == "coin_symbol"));

        let mut trade = self::trade();
        trade.base.id = Some(String::new());
        assert!(LineEncoder::new(utc()).encode(&Operation::Buy(trade)).is_ok());
    }

    #[test]
    fn test_field_count_mismatch_is_an_error() {
        let err = LineEncoder::new(utc())
            .render(RecordType::Header, &[Field::Code(RecordType::Header.code())])
            .unwrap_err();
        match err {
            ReportError::FieldCountMismatch {
                record,
                expected,
                actual,
            } => {
                assert_eq!(record, "0000");
                assert_eq!(expected, 4);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected FieldCountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_header_and_footer() {
        let encoder = LineEncoder::new(utc());
        let exchange = ExchangeIdentity {
            name: "BiscointTestex".to_string(),
            country: Some("BR".to_string()),
            url: "https://testex.biscoint.io".to_string(),
            document: Some("17869530000173".to_string()),
        };
        assert_eq!(
            encoder.header(&exchange).unwrap(),
            "0000|17869530000173|BiscointTestex|https://testex.biscoint.io"
        );

        let totals = FooterTotals {
            lines: [1, 1, 1, 0, 0, 0, 0],
            trade_brl_total: amount(dec!(1500.80)),
        };
        assert_eq!(encoder.footer(&totals).unwrap(), "9999|1|150080|1|1|0|0|0|0");
        assert_eq!(totals.operation_lines(), 3);
    }
}
