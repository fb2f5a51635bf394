use super::scanner::Scanner;
use super::token::{Token, TokenKind};
use crate::utils::parse_quantity;
use crate::{
    Account, Amount, CommodityStyle, Date, Diagnostic, DiagnosticKind, Journal, Posting, Status,
    Transaction,
};
use std::collections::HashMap;
use std::sync::Arc;

/// One pending continuation of the parse. The decoder is a pushdown
/// automaton: compound productions push the steps that remain and return,
/// so the work stack stays explicit, bounded, and inspectable instead of
/// living on the call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Top level: dispatch on the next token.
    File,
    /// A transaction header line, starting at a `Date` token.
    Header,
    /// Zero or more posting/comment lines of the open transaction.
    Postings,
    /// One posting line: status, account, amount.
    Posting,
    /// The optional `@`/`@@` exchange of the open posting.
    Exchange,
    /// Trailing note and newline of the open posting, then attach it.
    PostingEnd,
    /// Close the open transaction and append it to the journal.
    Commit,
}

pub(crate) struct Parser<'src> {
    scanner: Scanner<'src>,
    peeked: Option<Token<'src>>,
    journal: Journal,
    diagnostics: Vec<Diagnostic>,
    accounts: HashMap<String, Account>,
    steps: Vec<Step>,
    open_txn: Option<Transaction>,
    open_posting: Option<Posting>,
    /// Line the open transaction's header started on.
    txn_line: usize,
}

/// Decodes `src` into a best-effort [`Journal`] plus the diagnostics
/// recovered along the way.
pub(crate) fn parse(src: &str) -> (Journal, Vec<Diagnostic>) {
    let mut parser = Parser {
        scanner: Scanner::new(src),
        peeked: None,
        journal: Journal::default(),
        diagnostics: Vec::new(),
        accounts: HashMap::new(),
        steps: Vec::new(),
        open_txn: None,
        open_posting: None,
        txn_line: 0,
    };
    parser.run();
    (parser.journal, parser.diagnostics)
}

impl<'src> Parser<'src> {
    fn run(&mut self) {
        self.steps.push(Step::File);
        while let Some(step) = self.steps.pop() {
            let result = match step {
                Step::File => self.step_file(),
                Step::Header => self.step_header(),
                Step::Postings => self.step_postings(),
                Step::Posting => self.step_posting(),
                Step::Exchange => self.step_exchange(),
                Step::PostingEnd => self.step_posting_end(),
                Step::Commit => self.step_commit(),
            };
            if let Err(diag) = result {
                self.diagnostics.push(diag);
                self.recover();
                self.steps.clear();
                self.steps.push(Step::File);
            }
        }
    }

    /// Discards the open transaction and skips tokens until the next
    /// transaction boundary (a `Date` at a line start) or the end of input.
    /// Scan errors inside the discarded region are still collected.
    fn recover(&mut self) {
        self.open_txn = None;
        self.open_posting = None;
        loop {
            match self.peek().kind {
                TokenKind::Date | TokenKind::Eof => break,
                TokenKind::Error => {
                    let tok = self.advance();
                    self.diagnostics.push(scan_diag(&tok));
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn peek(&mut self) -> &Token<'src> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scanner.next_token());
        }
        self.peeked.as_ref().unwrap()
    }

    fn advance(&mut self) -> Token<'src> {
        match self.peeked.take() {
            Some(tok) => tok,
            None => self.scanner.next_token(),
        }
    }

    /// Consumes the next token if it has the expected kind, otherwise
    /// reports a parse diagnostic.
    fn take(&mut self, expected: TokenKind) -> Result<Token<'src>, Diagnostic> {
        let tok = self.peek();
        if tok.kind == TokenKind::Error {
            let tok = self.advance();
            return Err(scan_diag(&tok));
        }
        if tok.kind != expected {
            return Err(parse_diag(
                tok.line,
                format!("expected {}, found {}", expected, tok),
            ));
        }
        Ok(self.advance())
    }

    /// Consumes a line end; `Eof` is accepted so a journal need not end
    /// with a newline.
    fn take_line_end(&mut self) -> Result<(), Diagnostic> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => self.take(TokenKind::Newline).map(|_| ()),
        }
    }

    fn intern(&mut self, name: &str) -> Account {
        if let Some(account) = self.accounts.get(name) {
            return account.clone();
        }
        let account: Account = Arc::new(name.to_string());
        self.accounts.insert(name.to_string(), account.clone());
        account
    }

    fn take_status(&mut self) -> Option<Status> {
        if self.peek().kind != TokenKind::StatusMark {
            return None;
        }
        let tok = self.advance();
        match tok.text.as_ref() {
            "!" => Some(Status::Pending),
            _ => Some(Status::Cleared),
        }
    }

    fn step_file(&mut self) -> Result<(), Diagnostic> {
        match self.peek().kind {
            TokenKind::Eof => {}
            TokenKind::Date => {
                self.steps.push(Step::File);
                self.steps.push(Step::Commit);
                self.steps.push(Step::Postings);
                self.steps.push(Step::Header);
            }
            // top-level comments and blank lines carry no content
            TokenKind::Newline | TokenKind::Comment => {
                self.advance();
                self.steps.push(Step::File);
            }
            TokenKind::Error => {
                let tok = self.advance();
                self.diagnostics.push(scan_diag(&tok));
                self.steps.push(Step::File);
            }
            _ => {
                let tok = self.advance();
                return Err(parse_diag(
                    tok.line,
                    format!("unexpected {} at top level", tok),
                ));
            }
        }
        Ok(())
    }

    fn step_header(&mut self) -> Result<(), Diagnostic> {
        let date_tok = self.take(TokenKind::Date)?;
        let line = date_tok.line;
        let date = parse_date(&date_tok)?;
        let status = self.take_status().unwrap_or(Status::Unmarked);
        let payee = match self.peek().kind {
            TokenKind::Text => self.advance().text.trim().to_string(),
            _ => {
                return Err(parse_diag(line, "transaction header has no payee".into()));
            }
        };
        let note = match self.peek().kind {
            TokenKind::Comment => Some(self.advance().text.into_owned()),
            _ => None,
        };
        self.take_line_end()?;
        self.txn_line = line;
        self.open_txn = Some(Transaction {
            date,
            status,
            payee,
            note,
            postings: Vec::new(),
        });
        Ok(())
    }

    fn step_postings(&mut self) -> Result<(), Diagnostic> {
        match self.peek().kind {
            TokenKind::StatusMark | TokenKind::Account => {
                self.steps.push(Step::Postings);
                self.steps.push(Step::Posting);
            }
            TokenKind::Comment => {
                let tok = self.advance();
                self.attach_note(tok.text.as_ref());
                self.take_line_end()?;
                self.steps.push(Step::Postings);
            }
            TokenKind::Newline => {
                self.advance();
                self.steps.push(Step::Postings);
            }
            // anything else closes the posting block; Commit is next on
            // the stack
            _ => {}
        }
        Ok(())
    }

    fn step_posting(&mut self) -> Result<(), Diagnostic> {
        let status = self.take_status();
        let account_tok = self.take(TokenKind::Account)?;
        let line = account_tok.line;
        let account = self.intern(account_tok.text.as_ref());
        if matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof) {
            return Err(parse_diag(line, format!("posting {} has no amount", account)));
        }
        let amount = self.parse_amount()?;
        self.open_posting = Some(Posting {
            status,
            account,
            amount,
            exchange: None,
            note: None,
        });
        self.steps.push(Step::PostingEnd);
        self.steps.push(Step::Exchange);
        Ok(())
    }

    fn step_exchange(&mut self) -> Result<(), Diagnostic> {
        let marker = self.peek().kind;
        if marker != TokenKind::At && marker != TokenKind::AtAt {
            return Ok(());
        }
        self.advance();
        let second = self.parse_amount()?;
        if let Some(posting) = self.open_posting.as_mut() {
            posting.exchange = Some(match marker {
                // `@` is a per-unit rate: the stored total is
                // primary * rate, in the rate's commodity
                TokenKind::At => Amount {
                    quantity: &posting.amount.quantity * &second.quantity,
                    commodity: second.commodity,
                    style: second.style,
                },
                // `@@` already is the total value
                _ => second,
            });
        }
        Ok(())
    }

    fn step_posting_end(&mut self) -> Result<(), Diagnostic> {
        let note = match self.peek().kind {
            TokenKind::Comment => Some(self.advance().text.into_owned()),
            _ => None,
        };
        self.take_line_end()?;
        if let Some(mut posting) = self.open_posting.take() {
            posting.note = note;
            if let Some(txn) = self.open_txn.as_mut() {
                txn.postings.push(posting);
            }
        }
        Ok(())
    }

    fn step_commit(&mut self) -> Result<(), Diagnostic> {
        if let Some(txn) = self.open_txn.take() {
            if txn.postings.is_empty() {
                return Err(parse_diag(
                    self.txn_line,
                    "transaction has no postings".into(),
                ));
            }
            self.journal.transactions.push(txn);
        }
        Ok(())
    }

    fn parse_amount(&mut self) -> Result<Amount, Diagnostic> {
        let mut commodity = String::new();
        let mut style = CommodityStyle::Suffix;
        if self.peek().kind == TokenKind::CommodityPrefix {
            commodity = self.advance().text.into_owned();
            style = CommodityStyle::Prefix;
        }
        let num_tok = self.take(TokenKind::Number)?;
        let quantity = parse_quantity(num_tok.text.as_ref()).ok_or_else(|| {
            parse_diag(num_tok.line, format!("invalid number {:?}", num_tok.text))
        })?;
        if self.peek().kind == TokenKind::CommodityWord {
            if !commodity.is_empty() {
                let tok = self.advance();
                return Err(parse_diag(tok.line, "amount has two commodities".into()));
            }
            commodity = self.advance().text.into_owned();
        }
        Ok(Amount {
            quantity,
            commodity,
            style,
        })
    }

    /// Attaches an indented comment line to the open posting if one has
    /// been parsed already, otherwise to the open transaction. Repeated
    /// comments accumulate as additional note lines.
    fn attach_note(&mut self, text: &str) {
        if let Some(txn) = self.open_txn.as_mut() {
            let note = match txn.postings.last_mut() {
                Some(posting) => &mut posting.note,
                None => &mut txn.note,
            };
            match note {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(text);
                }
                None => *note = Some(text.to_string()),
            }
        }
    }
}

fn scan_diag(tok: &Token<'_>) -> Diagnostic {
    Diagnostic {
        line: tok.line,
        msg: tok.text.to_string(),
        kind: DiagnosticKind::Scan,
    }
}

fn parse_diag(line: usize, msg: String) -> Diagnostic {
    Diagnostic {
        line,
        msg,
        kind: DiagnosticKind::Parse,
    }
}

/// Converts a `Date` token into a calendar date. The scanner guarantees
/// the three-digit-run shape; this rejects impossible calendar dates such
/// as month 13. Two-digit years mean 2000+YY.
fn parse_date(tok: &Token<'_>) -> Result<Date, Diagnostic> {
    let mut parts = tok.text.splitn(3, '/');
    let (year_str, month_str, day_str) = match (parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d)) => (y, m, d),
        _ => return Err(parse_diag(tok.line, format!("invalid date {:?}", tok.text))),
    };
    let invalid = || parse_diag(tok.line, format!("invalid date {:?}", tok.text));
    let mut year: i32 = year_str.parse().map_err(|_| invalid())?;
    if year_str.len() <= 2 {
        year += 2000;
    }
    let month: u32 = month_str.parse().map_err(|_| invalid())?;
    let day: u32 = day_str.parse().map_err(|_| invalid())?;
    Date::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
