use super::token::{Token, TokenKind};
use std::borrow::Cow;
use std::collections::VecDeque;

type StateFn = for<'s> fn(&mut Scanner<'s>) -> Option<State>;

/// A scan state: a function that consumes some input, queues zero or more
/// tokens, and returns the next state. `None` terminates the scan.
#[derive(Clone, Copy)]
pub(crate) struct State(StateFn);

/// The lexer: turns raw journal text into an ordered, finite sequence of
/// [`Token`]s, pulled one at a time with [`Scanner::next_token`].
///
/// Lexical errors are recovered locally: an [`TokenKind::Error`] token is
/// emitted, the rest of the line is discarded, and scanning resumes at the
/// next line start. The scanner never aborts.
pub(crate) struct Scanner<'src> {
    src: &'src str,
    /// Current position, a byte offset.
    pos: usize,
    /// Start of the pending token.
    start: usize,
    /// Width of the last char read, for backup.
    width: usize,
    /// Current 1-based line number.
    line: usize,
    state: Option<State>,
    pending: VecDeque<Token<'src>>,
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_line_end(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_commodity_symbol(c: char) -> bool {
    !c.is_ascii_digit()
        && !is_space(c)
        && !is_line_end(c)
        && !matches!(c, '-' | '+' | '.' | ',' | ';' | '@')
}

impl<'src> Scanner<'src> {
    pub(crate) fn new(src: &'src str) -> Self {
        Scanner {
            src,
            pos: 0,
            start: 0,
            width: 0,
            line: 1,
            state: Some(State(scan_line_start)),
            pending: VecDeque::new(),
        }
    }

    /// Returns the next token, running the state machine as far as needed.
    /// After the input is exhausted this keeps returning [`TokenKind::Eof`].
    pub(crate) fn next_token(&mut self) -> Token<'src> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                return tok;
            }
            match self.state {
                Some(State(func)) => self.state = func(self),
                None => return Token::new(TokenKind::Eof, "", self.line),
            }
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.src[self.pos..].chars().next()?;
        self.width = c.len_utf8();
        self.pos += self.width;
        Some(c)
    }

    /// Steps back one char. Valid once per call of `next`.
    fn backup(&mut self) {
        self.pos -= self.width;
        self.width = 0;
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Consumes the next char if `valid` accepts it.
    fn accept(&mut self, valid: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if valid(c) => {
                self.next();
                true
            }
            _ => false,
        }
    }

    /// Consumes a run of chars accepted by `valid`, returning its length.
    fn accept_run(&mut self, valid: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.accept(&valid) {
            count += 1;
        }
        count
    }

    /// Emits the pending input as one token.
    fn emit(&mut self, kind: TokenKind) {
        let src = self.src;
        let text = &src[self.start..self.pos];
        self.pending.push_back(Token::new(kind, text, self.line));
        self.start = self.pos;
    }

    /// Emits the pending input trimmed of surrounding whitespace, dropping
    /// the token entirely if nothing remains. Comments are the exception:
    /// an empty comment still yields a token so the note survives.
    fn emit_trimmed(&mut self, kind: TokenKind) {
        let src = self.src;
        let text = src[self.start..self.pos].trim();
        if !text.is_empty() || kind == TokenKind::Comment {
            self.pending.push_back(Token::new(kind, text, self.line));
        }
        self.start = self.pos;
    }

    /// Skips over the pending input.
    fn ignore(&mut self) {
        self.start = self.pos;
    }

    fn skip_spaces(&mut self) {
        self.accept_run(is_space);
        self.ignore();
    }

    /// Emits an error token carrying `msg`, discards the rest of the line,
    /// and resumes at the next line start.
    fn error_line(&mut self, msg: impl Into<String>) -> Option<State> {
        self.pending.push_back(Token {
            kind: TokenKind::Error,
            text: Cow::Owned(msg.into()),
            line: self.line,
        });
        self.accept_run(|c| !is_line_end(c));
        self.ignore();
        Some(State(scan_line_end))
    }

    fn emit_eof(&mut self) -> Option<State> {
        self.pending.push_back(Token::new(TokenKind::Eof, "", self.line));
        None
    }

    /// Scans an optional `*` or `!` marker delimited by whitespace.
    fn scan_status_mark(&mut self) {
        if matches!(self.peek(), Some('*') | Some('!')) {
            self.next();
            match self.peek() {
                Some(c) if is_space(c) => {
                    self.emit(TokenKind::StatusMark);
                    self.skip_spaces();
                }
                Some(c) if is_line_end(c) => self.emit(TokenKind::StatusMark),
                None => self.emit(TokenKind::StatusMark),
                // not a marker, e.g. a payee starting with `*`
                _ => self.backup(),
            }
        }
    }
}

/// Start of a line: a digit opens a transaction header, `;` a comment, an
/// indent a posting line. Anything else is an error and the line is
/// discarded.
fn scan_line_start(l: &mut Scanner<'_>) -> Option<State> {
    match l.peek() {
        None => l.emit_eof(),
        Some(c) if is_line_end(c) => Some(State(scan_line_end)),
        Some(';') => Some(State(scan_comment)),
        Some(c) if c.is_ascii_digit() => Some(State(scan_date)),
        Some(c) if is_space(c) => {
            l.skip_spaces();
            Some(State(scan_posting))
        }
        Some(_) => l.error_line("unrecognized input at start of line"),
    }
}

/// Three digit runs separated by `/`. A malformed date aborts only this
/// line.
fn scan_date(l: &mut Scanner<'_>) -> Option<State> {
    for need_sep in [true, true, false] {
        if l.accept_run(|c| c.is_ascii_digit()) == 0 {
            return l.error_line("malformed date: expected digits");
        }
        if need_sep && !l.accept(|c| c == '/') {
            return l.error_line("malformed date: expected '/'");
        }
    }
    l.emit(TokenKind::Date);
    Some(State(scan_header))
}

/// The rest of a transaction header: optional status mark, payee text, and
/// an optional trailing comment.
fn scan_header(l: &mut Scanner<'_>) -> Option<State> {
    l.skip_spaces();
    l.scan_status_mark();
    l.accept_run(|c| c != ';' && !is_line_end(c));
    l.emit_trimmed(TokenKind::Text);
    match l.peek() {
        Some(';') => Some(State(scan_comment)),
        _ => Some(State(scan_line_end)),
    }
}

/// An indented line: either a comment or a posting (optional status mark,
/// then an account).
fn scan_posting(l: &mut Scanner<'_>) -> Option<State> {
    match l.peek() {
        None => l.emit_eof(),
        Some(c) if is_line_end(c) => Some(State(scan_line_end)),
        Some(';') => Some(State(scan_comment)),
        Some(_) => {
            l.scan_status_mark();
            Some(State(scan_account))
        }
    }
}

/// An account name runs until two consecutive horizontal-whitespace chars,
/// a `;`, or the line end. Single interior spaces belong to the name, so
/// `Expenses:Some Account` scans as one token.
fn scan_account(l: &mut Scanner<'_>) -> Option<State> {
    loop {
        match l.peek() {
            None | Some(';') => break,
            Some(c) if is_line_end(c) => break,
            Some(c) if is_space(c) => {
                l.next();
                match l.peek() {
                    Some(c2) if is_space(c2) || is_line_end(c2) || c2 == ';' => {
                        l.backup();
                        break;
                    }
                    None => {
                        l.backup();
                        break;
                    }
                    _ => {}
                }
            }
            Some(_) => {
                l.next();
            }
        }
    }
    l.emit_trimmed(TokenKind::Account);
    l.skip_spaces();
    match l.peek() {
        Some(';') => Some(State(scan_comment)),
        None => Some(State(scan_line_end)),
        Some(c) if is_line_end(c) => Some(State(scan_line_end)),
        _ => Some(State(scan_amount)),
    }
}

/// An amount: optional prefix commodity, a signed digit run with `,`
/// separators and an optional fraction, then an optional suffix commodity
/// word, then an optional exchange marker.
fn scan_amount(l: &mut Scanner<'_>) -> Option<State> {
    l.accept_run(is_commodity_symbol);
    if l.pos > l.start {
        l.emit(TokenKind::CommodityPrefix);
        l.skip_spaces();
    }
    l.accept(|c| c == '-' || c == '+');
    let mut has_digits = l.accept_run(|c| c.is_ascii_digit() || c == ',') > 0;
    if l.accept(|c| c == '.') {
        has_digits |= l.accept_run(|c| c.is_ascii_digit()) > 0;
    }
    if !has_digits {
        return l.error_line("malformed amount");
    }
    l.emit(TokenKind::Number);
    l.skip_spaces();
    if matches!(l.peek(), Some(c) if c.is_alphabetic()) {
        l.accept_run(char::is_alphanumeric);
        l.emit(TokenKind::CommodityWord);
        l.skip_spaces();
    }
    match l.peek() {
        Some('@') => Some(State(scan_exchange)),
        Some(';') => Some(State(scan_comment)),
        None => Some(State(scan_line_end)),
        Some(c) if is_line_end(c) => Some(State(scan_line_end)),
        Some(_) => l.error_line("unexpected characters after amount"),
    }
}

/// `@` is a per-unit rate, `@@` a total value; three or more `@` is an
/// error.
fn scan_exchange(l: &mut Scanner<'_>) -> Option<State> {
    match l.accept_run(|c| c == '@') {
        1 => l.emit(TokenKind::At),
        2 => l.emit(TokenKind::AtAt),
        _ => return l.error_line("invalid exchange marker"),
    }
    l.skip_spaces();
    Some(State(scan_amount))
}

/// `;` to end of line.
fn scan_comment(l: &mut Scanner<'_>) -> Option<State> {
    l.next();
    l.ignore();
    l.accept_run(|c| !is_line_end(c));
    l.emit_trimmed(TokenKind::Comment);
    Some(State(scan_line_end))
}

fn scan_line_end(l: &mut Scanner<'_>) -> Option<State> {
    let crs = l.accept_run(|c| c == '\r');
    let nl = l.accept(|c| c == '\n');
    if crs > 0 || nl {
        l.ignore();
        let line = l.line;
        l.pending.push_back(Token::new(TokenKind::Newline, "\n", line));
        l.line += 1;
        Some(State(scan_line_start))
    } else if l.peek().is_none() {
        l.emit_eof()
    } else {
        l.next();
        l.ignore();
        Some(State(scan_line_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn scan(src: &str) -> Vec<(TokenKind, String)> {
        let mut scanner = Scanner::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = scanner.next_token();
            let done = tok.kind == Eof;
            tokens.push((tok.kind, tok.text.into_owned()));
            if done {
                break;
            }
        }
        tokens
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        scan(src).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn transaction_header() {
        let tokens = scan("2009/05/14 * Gas Station\n");
        assert_eq!(
            tokens,
            vec![
                (Date, "2009/05/14".to_string()),
                (StatusMark, "*".to_string()),
                (Text, "Gas Station".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn posting_with_prefix_commodity() {
        let tokens = scan("    Assets:Checking   $-5.32\n");
        assert_eq!(
            tokens,
            vec![
                (Account, "Assets:Checking".to_string()),
                (CommodityPrefix, "$".to_string()),
                (Number, "-5.32".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn posting_with_suffix_commodity() {
        let tokens = scan("    Assets:Cash  1,200.50 USD\n");
        assert_eq!(
            tokens,
            vec![
                (Account, "Assets:Cash".to_string()),
                (Number, "1,200.50".to_string()),
                (CommodityWord, "USD".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn account_keeps_single_interior_space() {
        let tokens = scan("    Expenses:Some Account   $1.00\n");
        assert_eq!(tokens[0], (Account, "Expenses:Some Account".to_string()));
    }

    #[test]
    fn account_alone_on_line() {
        let tokens = scan("    Expenses:Transportation:Gas\n");
        assert_eq!(
            tokens,
            vec![
                (Account, "Expenses:Transportation:Gas".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn exchange_markers() {
        assert_eq!(
            kinds("    Assets:Broker  3 VTI @ $120.00\n"),
            vec![
                Account,
                Number,
                CommodityWord,
                At,
                CommodityPrefix,
                Number,
                Newline,
                Eof
            ]
        );
        assert_eq!(
            kinds("    Assets:Broker  3 VTI @@ $360.00\n"),
            vec![
                Account,
                Number,
                CommodityWord,
                AtAt,
                CommodityPrefix,
                Number,
                Newline,
                Eof
            ]
        );
    }

    #[test]
    fn triple_at_is_an_error() {
        let tokens = scan("    Assets:Broker  3 VTI @@@ $1.00\n");
        assert!(tokens.iter().any(|(kind, _)| *kind == Error));
        // the rest of the line is discarded
        assert!(!tokens.iter().any(|(kind, _)| *kind == CommodityPrefix));
    }

    #[test]
    fn malformed_date_recovers_on_next_line() {
        let tokens = scan("2021-01 Bad\n2020/01/01 Good\n");
        assert_eq!(tokens[0].0, Error);
        assert_eq!(tokens[1], (Newline, "\n".to_string()));
        assert_eq!(tokens[2], (Date, "2020/01/01".to_string()));
    }

    #[test]
    fn error_token_carries_line_number() {
        let mut scanner = Scanner::new("2020/01/01 Ok\n    Expenses:X  $1.00\ngarbage\n");
        loop {
            let tok = scanner.next_token();
            if tok.kind == Error {
                assert_eq!(tok.line, 3);
                break;
            }
            assert_ne!(tok.kind, Eof, "expected an error token");
        }
    }

    #[test]
    fn comments_everywhere() {
        assert_eq!(
            scan("; top level\n2020/01/01 Shop ; header note\n    ; standalone\n"),
            vec![
                (Comment, "top level".to_string()),
                (Newline, "\n".to_string()),
                (Date, "2020/01/01".to_string()),
                (Text, "Shop".to_string()),
                (Comment, "header note".to_string()),
                (Newline, "\n".to_string()),
                (Comment, "standalone".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn posting_status_mark() {
        assert_eq!(
            kinds("    ! Assets:Checking  $2.00\n"),
            vec![StatusMark, Account, CommodityPrefix, Number, Newline, Eof]
        );
    }

    #[test]
    fn payee_starting_with_star_is_text() {
        let tokens = scan("2020/01/01 *Mart\n");
        assert_eq!(tokens[1], (Text, "*Mart".to_string()));
    }

    #[test]
    fn blank_lines_and_eof() {
        assert_eq!(kinds("\n   \n"), vec![Newline, Newline, Eof]);
        assert_eq!(kinds(""), vec![Eof]);
    }

    #[test]
    fn unrecognized_line_start_is_local() {
        let tokens = scan("bogus line\n2020/01/01 Fine\n");
        assert_eq!(tokens[0].0, Error);
        assert!(tokens.iter().any(|(kind, _)| *kind == Date));
    }
}
