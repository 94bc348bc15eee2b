//! Identity types and Brazilian taxpayer document checks.

use std::fmt;
use std::str::FromStr;

/// How a party is identified in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityType {
    /// Brazilian individual taxpayer number (11 digits)
    Cpf,
    /// Brazilian company taxpayer number (14 digits)
    Cnpj,
    /// Foreign tax id of an individual
    NifPf,
    /// Foreign tax id of a company
    NifPj,
    Passport,
    /// Country of residence does not issue a tax id
    CountryNoId,
    /// Party has no tax id
    UserNoId,
}

impl IdentityType {
    /// Numeric code written in the identity-type column.
    pub fn code(&self) -> &'static str {
        match self {
            IdentityType::Cpf => "1",
            IdentityType::Cnpj => "2",
            IdentityType::NifPf => "3",
            IdentityType::NifPj => "4",
            IdentityType::Passport => "5",
            IdentityType::CountryNoId => "6",
            IdentityType::UserNoId => "7",
        }
    }

    /// `true` for CPF and CNPJ, whose number goes in the Brazilian document column.
    pub fn is_brazilian(&self) -> bool {
        matches!(self, IdentityType::Cpf | IdentityType::Cnpj)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Cpf => "CPF",
            IdentityType::Cnpj => "CNPJ",
            IdentityType::NifPf => "NIF_PF",
            IdentityType::NifPj => "NIF_PJ",
            IdentityType::Passport => "PASSPORT",
            IdentityType::CountryNoId => "COUNTRY_NO_ID",
            IdentityType::UserNoId => "USER_NO_ID",
        }
    }
}

impl FromStr for IdentityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CPF" => Ok(IdentityType::Cpf),
            "CNPJ" => Ok(IdentityType::Cnpj),
            "NIF_PF" => Ok(IdentityType::NifPf),
            "NIF_PJ" => Ok(IdentityType::NifPj),
            "PASSPORT" => Ok(IdentityType::Passport),
            "COUNTRY_NO_ID" => Ok(IdentityType::CountryNoId),
            "USER_NO_ID" => Ok(IdentityType::UserNoId),
            other => Err(format!("'{}' is not an allowed identity type", other)),
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keeps only the ASCII digits of a formatted document number.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates a CPF given as 11 digits.
pub fn is_valid_cpf(digits: &str) -> bool {
    let Some(d) = parse_digits(digits, 11) else {
        return false;
    };
    let first = cpf_check_digit(&d[..9]);
    let second = cpf_check_digit(&d[..10]);
    d[9] == first && d[10] == second
}

fn cpf_check_digit(prefix: &[u32]) -> u32 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, digit)| digit * (top - i as u32))
        .sum();
    (sum * 10) % 11 % 10
}

/// Validates a CNPJ given as 14 digits.
pub fn is_valid_cnpj(digits: &str) -> bool {
    const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let Some(d) = parse_digits(digits, 14) else {
        return false;
    };
    let check = |prefix: &[u32]| {
        let weights = &WEIGHTS[WEIGHTS.len() - prefix.len()..];
        let rem = prefix
            .iter()
            .zip(weights)
            .map(|(digit, weight)| digit * weight)
            .sum::<u32>()
            % 11;
        if rem < 2 {
            0
        } else {
            11 - rem
        }
    };
    d[12] == check(&d[..12]) && d[13] == check(&d[..13])
}

/// Splits an all-digit string of exactly `len` characters, rejecting
/// repeated-digit sequences like `00000000000`.
fn parse_digits(s: &str, len: usize) -> Option<Vec<u32>> {
    if s.len() != len {
        return None;
    }
    let digits: Vec<u32> = s.chars().map(|c| c.to_digit(10)).collect::<Option<_>>()?;
    if digits.iter().all(|d| *d == digits[0]) {
        return None;
    }
    Some(digits)
}
