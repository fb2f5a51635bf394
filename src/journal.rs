use crate::parse;
pub use chrono::NaiveDate as Date;
use getset::{CopyGetters, Getters};
pub use num_rational::BigRational;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::ops::Mul;
use std::sync::Arc;

/// The kind of problem a [`Diagnostic`] reports.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A malformed token; the scanner discarded the rest of the line.
    Scan,
    /// A token sequence violating the grammar; the decoder discarded the
    /// enclosing transaction.
    Parse,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Scan => write!(f, "scan error"),
            DiagnosticKind::Parse => write!(f, "parse error"),
        }
    }
}

/// A non-fatal record of a recovered scan or parse error.
///
/// Decoding never aborts on journal content; every problem is collected as
/// a `Diagnostic` and the offending line or transaction is dropped. Callers
/// decide whether any diagnostics are fatal for their use case.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// 1-based line number in the input.
    pub line: usize,
    pub msg: String,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind, self.msg)
    }
}

/// The status marker of a [`Transaction`] or a [`Posting`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    /// No marker.
    #[default]
    Unmarked,
    /// Marked `*`.
    Cleared,
    /// Marked `!`.
    Pending,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unmarked => Ok(()),
            Status::Cleared => write!(f, "*"),
            Status::Pending => write!(f, "!"),
        }
    }
}

/// Whether a commodity symbol is written before (`$3.50`) or after
/// (`3.50 USD`) the number.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommodityStyle {
    Prefix,
    Suffix,
}

/// An exact rational quantity plus its commodity symbol.
///
/// Quantities are arbitrary-precision rationals, so sums of decoded
/// amounts never accumulate binary floating-point error. An empty
/// commodity means the amount is unitless.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount {
    pub quantity: BigRational,
    pub commodity: String,
    pub style: CommodityStyle,
}

impl Amount {
    pub fn new(quantity: BigRational, commodity: impl Into<String>, style: CommodityStyle) -> Self {
        Amount {
            quantity,
            commodity: commodity.into(),
            style,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = crate::utils::format_quantity(&self.quantity);
        match self.style {
            CommodityStyle::Prefix => write!(f, "{}{}", self.commodity, num),
            CommodityStyle::Suffix if self.commodity.is_empty() => write!(f, "{}", num),
            CommodityStyle::Suffix => write!(f, "{} {}", num, self.commodity),
        }
    }
}

impl<'a> Mul<&'a BigRational> for &'a Amount {
    type Output = Amount;

    fn mul(self, rhs: &'a BigRational) -> Amount {
        Amount {
            quantity: &self.quantity * rhs,
            commodity: self.commodity.clone(),
            style: self.style,
        }
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc) representing a
/// colon-delimited account path such as `Expenses:Food`. The path is an
/// opaque identifier; it is not validated against any chart of accounts.
pub type Account = Arc<String>;

/// One line item within a [`Transaction`], crediting or debiting one
/// account by one amount.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// The posting's own marker, if it carries one. Use
    /// [`Transaction::posting_status`] for the effective status.
    pub status: Option<Status>,
    pub account: Account,
    pub amount: Amount,
    /// The resolved exchange total in another commodity, from an `@`
    /// (per-unit rate) or `@@` (total) annotation.
    pub exchange: Option<Amount>,
    pub note: Option<String>,
}

/// One dated economic event composed of postings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Transaction {
    /// Returns the transaction date.
    #[getset(get_copy = "pub")]
    pub(crate) date: Date,

    /// Returns the transaction status marker.
    #[getset(get_copy = "pub")]
    pub(crate) status: Status,

    /// Returns the payee.
    #[getset(get = "pub")]
    pub(crate) payee: String,

    /// Returns the trailing comment, if any.
    #[getset(get = "pub")]
    pub(crate) note: Option<String>,

    /// Returns the postings of this transaction.
    #[getset(get = "pub")]
    pub(crate) postings: Vec<Posting>,
}

impl Transaction {
    pub fn new(
        date: Date,
        status: Status,
        payee: impl Into<String>,
        note: Option<String>,
        postings: Vec<Posting>,
    ) -> Self {
        Transaction {
            date,
            status,
            payee: payee.into(),
            note,
            postings,
        }
    }

    /// The effective status of `posting`: its own marker if present,
    /// otherwise the transaction's. Resolved here rather than stored on the
    /// posting, so the two can never diverge.
    pub fn posting_status(&self, posting: &Posting) -> Status {
        posting.status.unwrap_or(self.status)
    }
}

/// The ordered collection of transactions decoded from one input.
/// Append-only during decode, immutable once returned.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct Journal {
    /// Returns the transactions in input order.
    #[getset(get = "pub")]
    pub(crate) transactions: Vec<Transaction>,
}

impl Journal {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Journal { transactions }
    }

    /// Decodes a journal from `input`, returning the best-effort
    /// [`Journal`] together with all recovered diagnostics. Only an I/O
    /// failure (including invalid UTF-8) aborts.
    pub fn decode<R: Read>(mut input: R) -> io::Result<(Self, Vec<Diagnostic>)> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(Self::decode_str(&text))
    }

    /// Decodes a journal from an in-memory string.
    pub fn decode_str(src: &str) -> (Self, Vec<Diagnostic>) {
        parse::parse(src)
    }

    /// Reads and decodes the journal file at `path`.
    pub fn from_file(path: &str) -> io::Result<(Self, Vec<Diagnostic>)> {
        let text = fs::read_to_string(path)?;
        Ok(Self::decode_str(&text))
    }
}
