//! Field validation and normalization for every operation variant.
//!
//! Each field kind has one `normalize + validate` function. Variants are
//! assembled from those functions and a table of the keys they accept;
//! every failure is collected so the caller sees the whole list at once.

use crate::decimal::Amount;
use crate::document::{digits_only, is_valid_cnpj, is_valid_cpf, IdentityType};
use crate::error::{ValidationError, ValidationErrors};
use crate::fields::RawFields;
use crate::normalize::{normalize_currency, normalize_date_in, sanitize_text};
use crate::operation::{
    BalanceReport, CoinBalance, CoinLeg, ExchangeIdentity, OperationBase, Party, Permutation,
    Trade, Transfer, TwoPartyTransfer,
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const ID_MAX: usize = 1024;
pub const NAME_MAX: usize = 80;
pub const ADDRESS_MAX: usize = 120;
pub const COUNTRY_MAX: usize = 2;
pub const URL_MAX: usize = 80;
pub const COIN_SYMBOL_MAX: usize = 10;
pub const DOCUMENT_MAX: usize = 30;

/// Keys of a party block, appended to the role prefix.
pub const PARTY_KEYS: [&str; 5] = ["identity_type", "country", "document", "fullname", "address"];

const COIN_BALANCES: &str = "coin_balances.";

/// The keys one payload kind accepts.
struct Schema {
    fields: &'static [&'static str],
    parties: &'static [&'static str],
    indexed: Option<&'static str>,
}

const EXCHANGE: Schema = Schema {
    fields: &["exchange_name", "exchange_country", "exchange_url", "exchange_document"],
    parties: &[],
    indexed: None,
};

const TRADE: Schema = Schema {
    fields: &["date", "id", "brl_value", "brl_fees", "coin_symbol", "coin_quantity"],
    parties: &["buyer_", "seller_"],
    indexed: None,
};

const PERMUTATION: Schema = Schema {
    fields: &[
        "date",
        "id",
        "brl_fees",
        "received_coin_symbol",
        "received_coin_quantity",
        "delivered_coin_symbol",
        "delivered_coin_quantity",
    ],
    parties: &["received_", "delivered_"],
    indexed: None,
};

const TRANSFER: Schema = Schema {
    fields: &["date", "id", "brl_fees", "coin_symbol", "coin_quantity"],
    parties: &[""],
    indexed: None,
};

const PAYMENT: Schema = Schema {
    fields: TRANSFER.fields,
    parties: &["payer_", "receiver_"],
    indexed: None,
};

const OTHER: Schema = Schema {
    fields: TRANSFER.fields,
    parties: &["origin_", "recipient_"],
    indexed: None,
};

const BALANCE: Schema = Schema {
    fields: &["date", "fiat_balance", "coin_symbol", "coin_balance"],
    parties: &[""],
    indexed: Some(COIN_BALANCES),
};

impl Schema {
    fn accepts(&self, key: &str) -> bool {
        self.fields.contains(&key)
            || self.parties.iter().any(|prefix| {
                key.strip_prefix(prefix)
                    .is_some_and(|rest| PARTY_KEYS.contains(&rest))
            })
            || self.indexed.is_some_and(|p| key.starts_with(p))
    }
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#][^\s]*$").expect("valid regex")
    })
}

/// Validates the exchange identity used in the header.
pub fn exchange_identity(fields: &RawFields) -> Result<ExchangeIdentity, ValidationErrors> {
    let mut v = FieldValidator::new(fields, &EXCHANGE, Utc.fix());
    let name = v.required_text("exchange_name", NAME_MAX);
    let country = v.optional_text("exchange_country", COUNTRY_MAX);
    let url = v.url("exchange_url");
    let document = v.document("exchange_document", Some(IdentityType::Cnpj));

    let (Some(name), Some(url)) = (name, url) else {
        return Err(v.into_errors());
    };
    v.finish(ExchangeIdentity {
        name,
        country,
        url,
        document,
    })
}

/// Validates a buy or sell payload.
pub fn trade(fields: &RawFields, offset: FixedOffset) -> Result<Trade, ValidationErrors> {
    let mut v = FieldValidator::new(fields, &TRADE, offset);
    let base = v.base();
    let brl_value = v.fiat("brl_value");
    let buyer = v.optional_party("buyer_");
    let seller = v.optional_party("seller_");

    let (Some(base), Some(brl_value)) = (base, brl_value) else {
        return Err(v.into_errors());
    };
    v.finish(Trade {
        base,
        brl_value,
        buyer,
        seller,
    })
}

/// Validates a permutation payload.
pub fn permutation(
    fields: &RawFields,
    offset: FixedOffset,
) -> Result<Permutation, ValidationErrors> {
    let mut v = FieldValidator::new(fields, &PERMUTATION, offset);
    let date = v.date("date");
    let id = v.optional_text("id", ID_MAX);
    let brl_fees = v.fees("brl_fees");
    let received = v.leg("received_");
    let delivered = v.leg("delivered_");

    let (Some(date), Some(received), Some(delivered)) = (date, received, delivered) else {
        return Err(v.into_errors());
    };
    v.finish(Permutation {
        date,
        id,
        brl_fees,
        received,
        delivered,
    })
}

/// Validates a deposit or withdraw payload.
pub fn transfer(fields: &RawFields, offset: FixedOffset) -> Result<Transfer, ValidationErrors> {
    let mut v = FieldValidator::new(fields, &TRANSFER, offset);
    let base = v.base();
    let party = v.party("");

    let (Some(base), Some(party)) = (base, party) else {
        return Err(v.into_errors());
    };
    v.finish(Transfer { base, party })
}

/// Validates a payment payload (`payer_*` and `receiver_*` parties).
pub fn payment(
    fields: &RawFields,
    offset: FixedOffset,
) -> Result<TwoPartyTransfer, ValidationErrors> {
    two_party(fields, offset, &PAYMENT)
}

/// Validates an other-transfer payload (`origin_*` and `recipient_*` parties).
pub fn other(fields: &RawFields, offset: FixedOffset) -> Result<TwoPartyTransfer, ValidationErrors> {
    two_party(fields, offset, &OTHER)
}

fn two_party(
    fields: &RawFields,
    offset: FixedOffset,
    schema: &Schema,
) -> Result<TwoPartyTransfer, ValidationErrors> {
    let mut v = FieldValidator::new(fields, schema, offset);
    let base = v.base();
    let from = v.optional_party(schema.parties[0]);
    let to = v.optional_party(schema.parties[1]);

    let Some(base) = base else {
        return Err(v.into_errors());
    };
    v.finish(TwoPartyTransfer { base, from, to })
}

/// Validates a balance report payload.
///
/// Holdings come from `coin_symbol`/`coin_balance` and from indexed
/// `coin_balances.N.coin_symbol`/`coin_balances.N.coin_balance` pairs,
/// in that order.
pub fn balance_report(
    fields: &RawFields,
    offset: FixedOffset,
) -> Result<BalanceReport, ValidationErrors> {
    let mut v = FieldValidator::new(fields, &BALANCE, offset);
    let date = v.date("date");
    let holder = v.party("");
    let fiat_balance = v.fiat("fiat_balance");

    let mut holdings = Vec::new();
    if fields.contains("coin_symbol") || fields.contains("coin_balance") {
        holdings.extend(v.holding("coin_symbol", "coin_balance"));
    }
    for index in indexed_balances(fields, &mut v) {
        let symbol_key = format!("{}{}.coin_symbol", COIN_BALANCES, index);
        let balance_key = format!("{}{}.coin_balance", COIN_BALANCES, index);
        holdings.extend(v.holding(&symbol_key, &balance_key));
    }

    let (Some(date), Some(holder), Some(fiat_balance)) = (date, holder, fiat_balance) else {
        return Err(v.into_errors());
    };
    v.finish(BalanceReport {
        date,
        holder,
        fiat_balance,
        holdings,
    })
}

/// Distinct indices of `coin_balances.N.*` keys, ascending.
fn indexed_balances(fields: &RawFields, v: &mut FieldValidator<'_>) -> BTreeSet<usize> {
    let mut indices = BTreeSet::new();
    for (key, _) in fields.iter() {
        let Some(rest) = key.strip_prefix(COIN_BALANCES) else {
            continue;
        };
        let parsed = rest.split_once('.').and_then(|(index, field)| {
            let known = field == "coin_symbol" || field == "coin_balance";
            index.parse::<usize>().ok().filter(|_| known)
        });
        match parsed {
            Some(index) => {
                indices.insert(index);
            }
            None => v.fail(key, "is not a valid coin balance key"),
        }
    }
    indices
}

/// Collects failures while reading fields of one payload.
struct FieldValidator<'a> {
    fields: &'a RawFields,
    offset: FixedOffset,
    errors: ValidationErrors,
}

impl<'a> FieldValidator<'a> {
    fn new(fields: &'a RawFields, schema: &Schema, offset: FixedOffset) -> Self {
        let mut validator = FieldValidator {
            fields,
            offset,
            errors: ValidationErrors::default(),
        };
        for (key, _) in fields.iter() {
            if !schema.accepts(key) {
                validator.fail(key, "is not allowed for this operation");
            }
        }
        validator
    }

    fn fail(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::new(field, reason));
    }

    fn into_errors(mut self) -> ValidationErrors {
        if self.errors.is_empty() {
            self.fail("fields", "incomplete payload");
        }
        self.errors
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    fn sanitized(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|raw| sanitize_text(raw.as_text().trim()))
    }

    fn check_len(&mut self, key: &str, value: &str, min: usize, max: usize) -> bool {
        let len = value.chars().count();
        if len < min {
            self.fail(key, format!("must be at least {} characters", min));
            false
        } else if len > max {
            self.fail(key, format!("cannot exceed {} characters", max));
            false
        } else {
            true
        }
    }

    fn required_text(&mut self, key: &str, max: usize) -> Option<String> {
        let Some(value) = self.sanitized(key) else {
            self.fail(key, "is required");
            return None;
        };
        self.check_len(key, &value, 1, max).then_some(value)
    }

    fn optional_text(&mut self, key: &str, max: usize) -> Option<String> {
        let value = self.sanitized(key).filter(|v| !v.is_empty())?;
        self.check_len(key, &value, 0, max).then_some(value)
    }

    fn url(&mut self, key: &str) -> Option<String> {
        let value = self.required_text(key, URL_MAX)?;
        if url_pattern().is_match(&value) {
            Some(value)
        } else {
            self.fail(key, "must be a valid URL");
            None
        }
    }

    fn date(&mut self, key: &str) -> Option<DateTime<FixedOffset>> {
        let Some(raw) = self.fields.get(key) else {
            self.fail(key, "is required");
            return None;
        };
        match normalize_date_in(raw, &self.offset) {
            Ok(date) => Some(date),
            Err(e) => {
                self.fail(key, e.to_string());
                None
            }
        }
    }

    fn amount(&mut self, key: &str, scale: u32, max_digits: usize) -> Option<Option<Amount>> {
        let raw = self.fields.get(key)?;
        let parsed = normalize_currency(raw).and_then(|value| {
            Amount::new(value).ok_or_else(|| "Value cannot be less than zero".to_string())
        });
        match parsed {
            Ok(amount) if amount.encoded_width(scale) > max_digits => {
                self.fail(key, "Value exceeds the maximum allowed digits.");
                Some(None)
            }
            Ok(amount) => Some(Some(amount)),
            Err(reason) => {
                self.fail(key, reason);
                Some(None)
            }
        }
    }

    fn fiat(&mut self, key: &str) -> Option<Amount> {
        match self.amount(key, Amount::FIAT_SCALE, Amount::FIAT_MAX_DIGITS) {
            Some(amount) => amount,
            None => {
                self.fail(key, "is required");
                None
            }
        }
    }

    fn fees(&mut self, key: &str) -> Amount {
        self.amount(key, Amount::FIAT_SCALE, Amount::FIAT_MAX_DIGITS)
            .flatten()
            .unwrap_or(Amount::ZERO)
    }

    fn coin(&mut self, key: &str) -> Option<Amount> {
        match self.amount(key, Amount::COIN_SCALE, Amount::COIN_MAX_DIGITS) {
            Some(amount) => amount,
            None => {
                self.fail(key, "is required");
                None
            }
        }
    }

    fn identity_type(&mut self, key: &str) -> Option<IdentityType> {
        let Some(raw) = self.fields.get(key) else {
            self.fail(key, "is required");
            return None;
        };
        match raw.as_text().parse() {
            Ok(identity_type) => Some(identity_type),
            Err(reason) => {
                self.fail(key, reason);
                None
            }
        }
    }

    /// CPF and CNPJ numbers are reduced to digits and checksum-validated;
    /// other documents are free text.
    fn document(&mut self, key: &str, identity_type: Option<IdentityType>) -> Option<String> {
        let raw = self.fields.get(key)?.as_text();
        match identity_type {
            Some(IdentityType::Cpf) => {
                let digits = digits_only(&raw);
                if is_valid_cpf(&digits) {
                    Some(digits)
                } else {
                    self.fail(key, "Invalid CPF");
                    None
                }
            }
            Some(IdentityType::Cnpj) => {
                let digits = digits_only(&raw);
                if is_valid_cnpj(&digits) {
                    Some(digits)
                } else {
                    self.fail(key, "Invalid CNPJ");
                    None
                }
            }
            _ => self.optional_text(key, DOCUMENT_MAX),
        }
    }

    fn base(&mut self) -> Option<OperationBase> {
        let date = self.date("date");
        let id = self.optional_text("id", ID_MAX);
        let brl_fees = self.fees("brl_fees");
        let coin_symbol = self.required_text("coin_symbol", COIN_SYMBOL_MAX);
        let coin_quantity = self.coin("coin_quantity");
        Some(OperationBase {
            date: date?,
            id,
            brl_fees,
            coin_symbol: coin_symbol?,
            coin_quantity: coin_quantity?,
        })
    }

    fn party(&mut self, prefix: &str) -> Option<Party> {
        let key = |name: &str| format!("{}{}", prefix, name);
        let identity_type = self.identity_type(&key("identity_type"));
        let country = self.optional_text(&key("country"), COUNTRY_MAX);
        let document = match identity_type {
            Some(t) => self.document(&key("document"), Some(t)),
            None => None,
        };
        let fullname = self.required_text(&key("fullname"), NAME_MAX);
        let address = self.optional_text(&key("address"), ADDRESS_MAX);
        Some(Party {
            identity_type: identity_type?,
            country,
            document,
            fullname: fullname?,
            address,
        })
    }

    /// A role party is absent when none of its fields are supplied.
    fn optional_party(&mut self, prefix: &str) -> Option<Party> {
        let supplied = PARTY_KEYS
            .iter()
            .any(|name| self.fields.contains(&format!("{}{}", prefix, name)));
        if supplied {
            self.party(prefix)
        } else {
            None
        }
    }

    fn leg(&mut self, prefix: &str) -> Option<CoinLeg> {
        let coin_symbol = self.required_text(&format!("{}coin_symbol", prefix), COIN_SYMBOL_MAX);
        let coin_quantity = self.coin(&format!("{}coin_quantity", prefix));
        let counterparty = self.optional_party(prefix);
        Some(CoinLeg {
            coin_symbol: coin_symbol?,
            coin_quantity: coin_quantity?,
            counterparty,
        })
    }

    fn holding(&mut self, symbol_key: &str, balance_key: &str) -> Option<CoinBalance> {
        let coin_symbol = self.required_text(symbol_key, COIN_SYMBOL_MAX);
        let coin_balance = self.coin(balance_key);
        Some(CoinBalance {
            coin_symbol: coin_symbol?,
            coin_balance: coin_balance?,
        })
    }
}
