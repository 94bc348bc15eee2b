//! Validated operation records and the exchange identity.

use crate::decimal::Amount;
use crate::document::IdentityType;
use chrono::{DateTime, FixedOffset};

/// The reporting exchange, written in the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeIdentity {
    pub name: String,
    pub country: Option<String>,
    pub url: String,
    /// Exchange CNPJ, digits only
    pub document: Option<String>,
}

/// A counterparty identity block.
///
/// The identity type travels with the document so checksum validation and
/// column placement never look at sibling fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub identity_type: IdentityType,
    pub country: Option<String>,
    pub document: Option<String>,
    pub fullname: String,
    pub address: Option<String>,
}

/// Fields every coin movement carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBase {
    pub date: DateTime<FixedOffset>,
    pub id: Option<String>,
    pub brl_fees: Amount,
    pub coin_symbol: String,
    pub coin_quantity: Amount,
}

/// Payload of buy and sell operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub base: OperationBase,
    pub brl_value: Amount,
    pub buyer: Option<Party>,
    pub seller: Option<Party>,
}

/// One side of a permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinLeg {
    pub coin_symbol: String,
    pub coin_quantity: Amount,
    pub counterparty: Option<Party>,
}

/// A coin-for-coin swap with no fiat leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    pub date: DateTime<FixedOffset>,
    pub id: Option<String>,
    pub brl_fees: Amount,
    pub received: CoinLeg,
    pub delivered: CoinLeg,
}

/// Deposit into or withdrawal from the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub base: OperationBase,
    pub party: Party,
}

/// A transfer between two parties (payments and other transfers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoPartyTransfer {
    pub base: OperationBase,
    pub from: Option<Party>,
    pub to: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinBalance {
    pub coin_symbol: String,
    pub coin_balance: Amount,
}

/// Balance snapshot of one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub date: DateTime<FixedOffset>,
    pub holder: Party,
    pub fiat_balance: Amount,
    pub holdings: Vec<CoinBalance>,
}

/// A registered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Buy(Trade),
    Sell(Trade),
    Permutation(Permutation),
    Deposit(Transfer),
    Withdraw(Transfer),
    /// Coins handed over as payment; `from` is the payer, `to` the receiver
    Payment(TwoPartyTransfer),
    /// Any other transfer; `from` is the origin, `to` the recipient
    Other(TwoPartyTransfer),
    BalanceReport(BalanceReport),
}

impl Operation {
    pub fn record_type(&self) -> RecordType {
        match self {
            Operation::Buy(_) | Operation::Sell(_) => RecordType::Trade,
            Operation::Permutation(_) => RecordType::Permutation,
            Operation::Deposit(_) => RecordType::Deposit,
            Operation::Withdraw(_) => RecordType::Withdraw,
            Operation::Payment(_) => RecordType::Payment,
            Operation::Other(_) => RecordType::Other,
            Operation::BalanceReport(_) => RecordType::Balance,
        }
    }

    /// Lowercase variant name, used in log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Buy(_) => "buy",
            Operation::Sell(_) => "sell",
            Operation::Permutation(_) => "permutation",
            Operation::Deposit(_) => "deposit",
            Operation::Withdraw(_) => "withdraw",
            Operation::Payment(_) => "payment",
            Operation::Other(_) => "other",
            Operation::BalanceReport(_) => "balance",
        }
    }
}

/// Line layouts of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    Header,
    /// Buy and sell
    Trade,
    Permutation,
    Deposit,
    Withdraw,
    Payment,
    Other,
    Balance,
    Footer,
}

impl RecordType {
    /// Body record types in footer column order.
    pub const BODY: [RecordType; 7] = [
        RecordType::Trade,
        RecordType::Permutation,
        RecordType::Deposit,
        RecordType::Withdraw,
        RecordType::Payment,
        RecordType::Other,
        RecordType::Balance,
    ];

    /// Four-digit code opening every line.
    pub fn code(&self) -> &'static str {
        match self {
            RecordType::Header => "0000",
            RecordType::Trade => "0110",
            RecordType::Permutation => "0210",
            RecordType::Deposit => "0410",
            RecordType::Withdraw => "0510",
            RecordType::Payment => "0710",
            RecordType::Other => "0910",
            RecordType::Balance => "1000",
            RecordType::Footer => "9999",
        }
    }

    /// Nature-of-operation code, for records that carry one.
    pub fn nature(&self) -> Option<&'static str> {
        match self {
            RecordType::Trade => Some("I"),
            RecordType::Permutation => Some("II"),
            RecordType::Deposit => Some("IV"),
            RecordType::Withdraw => Some("V"),
            RecordType::Payment => Some("VII"),
            RecordType::Other => Some("IX"),
            RecordType::Header | RecordType::Balance | RecordType::Footer => None,
        }
    }

    /// Number of `|`-separated fields in a line, the code included.
    pub fn field_count(&self) -> usize {
        match self {
            RecordType::Header => 4,
            RecordType::Trade => 20,
            RecordType::Permutation => 21,
            RecordType::Deposit | RecordType::Withdraw => 13,
            RecordType::Payment | RecordType::Other => 19,
            RecordType::Balance => 11,
            RecordType::Footer => 9,
        }
    }

    pub fn from_code(code: &str) -> Option<RecordType> {
        [RecordType::Header, RecordType::Footer]
            .into_iter()
            .chain(RecordType::BODY)
            .find(|r| r.code() == code)
    }
}
