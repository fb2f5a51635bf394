use std::borrow::Cow;
use std::fmt;

/// The kinds of tokens the scanner produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Three digit runs separated by `/`.
    Date,
    /// A `*` or `!` marker.
    StatusMark,
    /// Free text, e.g. a payee.
    Text,
    /// A colon-delimited account path, possibly with single interior
    /// spaces.
    Account,
    /// A commodity symbol written before the number, e.g. `$`.
    CommodityPrefix,
    /// A numeric literal, possibly signed, with `,` separators.
    Number,
    /// A commodity word written after the number, e.g. `USD`.
    CommodityWord,
    /// `@`, a per-unit exchange rate follows.
    At,
    /// `@@`, a total exchange value follows.
    AtAt,
    /// `;` comment text, to end of line.
    Comment,
    Newline,
    /// A recovered lexical error; the token text is the message.
    Error,
    Eof,
}

impl TokenKind {
    /// Display name, from a fixed table initialized at compile time.
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Date => "Date",
            TokenKind::StatusMark => "StatusMark",
            TokenKind::Text => "Text",
            TokenKind::Account => "Account",
            TokenKind::CommodityPrefix => "CommodityPrefix",
            TokenKind::Number => "Number",
            TokenKind::CommodityWord => "CommodityWord",
            TokenKind::At => "At",
            TokenKind::AtAt => "AtAt",
            TokenKind::Comment => "Comment",
            TokenKind::Newline => "Newline",
            TokenKind::Error => "Error",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One token: its kind, the matched text (or, for [`TokenKind::Error`],
/// the error message), and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: Cow<'src, str>,
    pub line: usize,
}

impl<'src> Token<'src> {
    pub(crate) fn new(kind: TokenKind, text: &'src str, line: usize) -> Self {
        Token {
            kind,
            text: Cow::Borrowed(text),
            line,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Newline => write!(f, "Newline"),
            TokenKind::Error => write!(f, "{}", self.text),
            _ => write!(f, "{}({:?})", self.kind, self.text),
        }
    }
}
