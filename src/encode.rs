//! Canonical rendering of a [`Journal`] back to text.

use crate::{Journal, Posting, Status, Transaction};
use std::fmt;
use std::io::{self, Write};

/// Leading spaces on posting and comment lines.
const INDENT: usize = 4;
/// Minimum gap between the account field and the amount.
const PADDING: usize = 2;

impl Journal {
    /// Renders the journal deterministically in canonical form: one
    /// column-alignment block per transaction, amounts shown with two
    /// decimals, a blank line between transactions.
    pub fn encode<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (i, txn) in self.transactions.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            txn.encode(&mut out)?;
        }
        Ok(())
    }
}

fn pre_amount_field(posting: &Posting) -> String {
    match posting.status {
        Some(status) if status != Status::Unmarked => format!("{} {}", status, posting.account),
        _ => posting.account.to_string(),
    }
}

/// Writes `note`'s first line inline after its owner and any further
/// lines as indented comment lines of their own.
fn write_note<W: Write>(out: &mut W, note: Option<&str>) -> io::Result<()> {
    let mut lines = note.map(str::lines);
    if let Some(first) = lines.as_mut().and_then(Iterator::next) {
        write!(out, " ; {}", first)?;
    }
    writeln!(out)?;
    if let Some(lines) = lines {
        for rest in lines {
            writeln!(out, "{:indent$}; {}", "", rest, indent = INDENT)?;
        }
    }
    Ok(())
}

impl Transaction {
    /// Renders this transaction: the `DATE STATUS PAYEE` header, then the
    /// postings as one alignment block. The pre-amount field of every
    /// posting is padded to the widest in the block; widths are computed
    /// afresh for each transaction, never globally.
    pub fn encode<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.date.format("%Y/%m/%d"))?;
        if self.status != Status::Unmarked {
            write!(out, " {}", self.status)?;
        }
        if !self.payee.is_empty() {
            write!(out, " {}", self.payee)?;
        }
        write_note(out, self.note.as_deref())?;

        let width = self
            .postings
            .iter()
            .map(|p| pre_amount_field(p).chars().count())
            .max()
            .unwrap_or(0);
        for posting in &self.postings {
            let field = pre_amount_field(posting);
            let pad = width - field.chars().count() + PADDING;
            write!(out, "{:indent$}{}{:pad$}", "", field, "", indent = INDENT, pad = pad)?;
            write!(out, "{}", posting.amount)?;
            if let Some(exchange) = &posting.exchange {
                write!(out, " @@ {}", exchange)?;
            }
            write_note(out, posting.note.as_deref())?;
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.encode(&mut buf).map_err(|_| fmt::Error)?;
        let text = String::from_utf8(buf).map_err(|_| fmt::Error)?;
        f.write_str(text.trim_end_matches('\n'))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Amount, CommodityStyle, Date, Journal, Posting, Status, Transaction};
    use num_bigint::BigInt;
    use num_rational::BigRational;
    use std::sync::Arc;

    fn dollars(cents: i64) -> Amount {
        Amount {
            quantity: BigRational::new(BigInt::from(cents), BigInt::from(100)),
            commodity: "$".to_string(),
            style: CommodityStyle::Prefix,
        }
    }

    fn posting(account: &str, amount: Amount) -> Posting {
        Posting {
            status: None,
            account: Arc::new(account.to_string()),
            amount,
            exchange: None,
            note: None,
        }
    }

    fn encode(journal: &Journal) -> String {
        let mut buf = Vec::new();
        journal.encode(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn postings_align_per_transaction() {
        let journal = Journal::new(vec![Transaction::new(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Status::Cleared,
            "Coffee Shop",
            None,
            vec![
                posting("Expenses:Food", dollars(350)),
                posting("Assets:Checking", dollars(-350)),
            ],
        )]);
        assert_eq!(
            encode(&journal),
            "2020/01/01 * Coffee Shop\n\
             \x20   Expenses:Food    $3.50\n\
             \x20   Assets:Checking  $-3.50\n"
        );
    }

    #[test]
    fn status_mark_widens_the_field() {
        let mut cleared = posting("Expenses:Food", dollars(100));
        cleared.status = Some(Status::Pending);
        let journal = Journal::new(vec![Transaction::new(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Status::Unmarked,
            "Shop",
            None,
            vec![cleared, posting("Assets:Cash", dollars(-100))],
        )]);
        assert_eq!(
            encode(&journal),
            "2020/01/01 Shop\n\
             \x20   ! Expenses:Food  $1.00\n\
             \x20   Assets:Cash      $-1.00\n"
        );
    }

    #[test]
    fn suffix_commodity_and_exchange() {
        let mut p = posting(
            "Assets:Broker",
            Amount {
                quantity: BigRational::from_integer(BigInt::from(3)),
                commodity: "VTI".to_string(),
                style: CommodityStyle::Suffix,
            },
        );
        p.exchange = Some(dollars(36000));
        let journal = Journal::new(vec![Transaction::new(
            Date::from_ymd_opt(2021, 6, 30).unwrap(),
            Status::Unmarked,
            "Broker",
            None,
            vec![p],
        )]);
        assert_eq!(
            encode(&journal),
            "2021/06/30 Broker\n\
             \x20   Assets:Broker  3.00 VTI @@ $360.00\n"
        );
    }

    #[test]
    fn notes_render_with_their_owner() {
        let mut p = posting("Expenses:Food", dollars(350));
        p.note = Some("inline\nfollow-up".to_string());
        let journal = Journal::new(vec![Transaction::new(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Status::Unmarked,
            "Shop",
            Some("header note".to_string()),
            vec![p],
        )]);
        assert_eq!(
            encode(&journal),
            "2020/01/01 Shop ; header note\n\
             \x20   Expenses:Food  $3.50 ; inline\n\
             \x20   ; follow-up\n"
        );
    }

    #[test]
    fn blank_line_between_transactions() {
        let txn = Transaction::new(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Status::Unmarked,
            "A",
            None,
            vec![posting("Expenses:X", dollars(100))],
        );
        let journal = Journal::new(vec![txn.clone(), txn]);
        let text = encode(&journal);
        assert_eq!(text.matches("\n\n").count(), 1);
    }

    #[test]
    fn unitless_amount() {
        let journal = Journal::new(vec![Transaction::new(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Status::Unmarked,
            "Shop",
            None,
            vec![posting(
                "Assets:Points",
                Amount {
                    quantity: BigRational::from_integer(BigInt::from(12)),
                    commodity: String::new(),
                    style: CommodityStyle::Suffix,
                },
            )],
        )]);
        assert_eq!(
            encode(&journal),
            "2020/01/01 Shop\n    Assets:Points  12.00\n"
        );
    }
}
