//! A small CSS selector engine.
//!
//! Covers what survey groups and accessibility-engine targets use: type,
//! universal, `#id`, `.class`, attribute selectors (`=`, `~=`, `|=`, `^=`,
//! `$=`, `*=`, with an optional ` i` flag), descendant and child
//! combinators, and `:first-child`, `:last-child`, `:nth-child(An+B)`.
//! Anything else is reported as a [`SelectorError`].

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unexpected end of selector")]
    UnexpectedEnd,
    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
    #[error("unsupported combinator '{0}'")]
    UnsupportedCombinator(char),
    #[error("invalid :nth-child argument '{0}'")]
    InvalidNth(String),
    #[error("unterminated string")]
    UnterminatedString,
}

/// A comma-separated list; an element matches when any entry matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compounds joined by combinators, stored left to right. The combinator of
/// entry `i` relates it to entry `i - 1`; the first entry's is unused.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector(pub Vec<(Combinator, Compound)>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    /// Lowercased tag name; `None` for `*` or no type selector.
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttrSelector>,
    pub pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSelector {
    pub name: String,
    pub op: AttrOp,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    FirstChild,
    LastChild,
    /// `:nth-child(a*n + b)`, 1-based.
    NthChild { a: i64, b: i64 },
}

impl Pseudo {
    /// Whether a 1-based sibling position satisfies the pseudo-class.
    pub fn matches_position(self, position: usize, sibling_count: usize) -> bool {
        match self {
            Pseudo::FirstChild => position == 1,
            Pseudo::LastChild => position == sibling_count,
            Pseudo::NthChild { a, b } => {
                let pos = position as i64;
                if a == 0 {
                    pos == b
                } else {
                    // Out-of-range arguments from config never match.
                    let Some(diff) = pos.checked_sub(b) else {
                        return false;
                    };
                    matches!(
                        (diff.checked_rem(a), diff.checked_div(a)),
                        (Some(0), Some(k)) if k >= 0
                    )
                }
            }
        }
    }
}

impl AttrOp {
    pub fn matches(&self, actual: &str, case_insensitive: bool) -> bool {
        let fold = |s: &str| {
            if case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let actual = fold(actual);
        match self {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == fold(v),
            AttrOp::Includes(v) => {
                let v = fold(v);
                !v.is_empty() && actual.split_ascii_whitespace().any(|w| w == v)
            }
            AttrOp::DashMatch(v) => {
                let v = fold(v);
                actual == v || actual.starts_with(&format!("{}-", v))
            }
            AttrOp::Prefix(v) => !v.is_empty() && actual.starts_with(&fold(v)),
            AttrOp::Suffix(v) => !v.is_empty() && actual.ends_with(&fold(v)),
            AttrOp::Substring(v) => !v.is_empty() && actual.contains(&fold(v)),
        }
    }
}

pub fn parse(input: &str) -> Result<SelectorList, SelectorError> {
    let mut parser = Parser::new(input);
    let list = parser.selector_list()?;
    Ok(list)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(ch) => Err(SelectorError::UnexpectedChar {
                ch,
                pos: self.pos - 1,
            }),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    fn selector_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Err(if list.is_empty() {
                    SelectorError::Empty
                } else {
                    SelectorError::UnexpectedEnd
                });
            }
            list.push(self.complex()?);
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                None => break,
                Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            }
        }
        Ok(SelectorList(list))
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut parts = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(c @ ('+' | '~')) => return Err(SelectorError::UnsupportedCombinator(c)),
                Some(_) if had_space => Combinator::Descendant,
                Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            };
            parts.push((combinator, self.compound()?));
        }
        Ok(ComplexSelector(parts))
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return match self.peek() {
                Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        // a leading '-' is allowed, as in `-webkit-foo` or `--x`
        while self.peek() == Some('-') {
            out.push('-');
            self.pos += 1;
        }
        loop {
            match self.peek() {
                Some('\\') => {
                    self.pos += 1;
                    out.push(self.escape()?);
                }
                Some(c) if is_ident_char(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if out.is_empty() || out == "-" {
            return match self.peek() {
                Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(out)
    }

    /// Called after a backslash. Hex escapes take up to six digits and one
    /// optional trailing space.
    fn escape(&mut self) -> Result<char, SelectorError> {
        let first = self.peek().ok_or(SelectorError::UnexpectedEnd)?;
        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return Ok(first);
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if self.peek() == Some(' ') {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        Ok(char::from_u32(code)
            .filter(|c| *c != '\0')
            .unwrap_or('\u{FFFD}'))
    }

    fn attribute(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op_char = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                    case_insensitive: false,
                });
            }
            Some('=') => None,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                Some(c)
            }
            Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.expect('=')?;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                self.string(q)?
            }
            Some(_) => self.ident()?,
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.skip_whitespace();

        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I')) {
            self.pos += 1;
            case_insensitive = true;
            self.skip_whitespace();
        } else if matches!(self.peek(), Some('s' | 'S')) {
            self.pos += 1;
            self.skip_whitespace();
        }
        self.expect(']')?;

        let op = match op_char {
            None => AttrOp::Equals(value),
            Some('~') => AttrOp::Includes(value),
            Some('|') => AttrOp::DashMatch(value),
            Some('^') => AttrOp::Prefix(value),
            Some('$') => AttrOp::Suffix(value),
            Some(_) => AttrOp::Substring(value),
        };
        Ok(AttrSelector {
            name,
            op,
            case_insensitive,
        })
    }

    fn string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorError::UnterminatedString),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        if self.peek() == Some(':') {
            self.pos += 1;
            let name = self.ident().unwrap_or_default();
            return Err(SelectorError::UnsupportedPseudo(format!(":{}", name)));
        }
        let name = self.ident()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(Pseudo::FirstChild),
            "last-child" => Ok(Pseudo::LastChild),
            "nth-child" => {
                self.expect('(')?;
                let mut arg = String::new();
                loop {
                    match self.bump() {
                        Some(')') => break,
                        Some(c) => arg.push(c),
                        None => return Err(SelectorError::UnexpectedEnd),
                    }
                }
                parse_nth(&arg)
            }
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// Parses `odd`, `even`, `B`, `An`, `An+B`, `-n+B` and friends.
fn parse_nth(arg: &str) -> Result<Pseudo, SelectorError> {
    let compact: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    let lower = compact.to_ascii_lowercase();
    let invalid = || SelectorError::InvalidNth(arg.trim().to_string());

    match lower.as_str() {
        "odd" => return Ok(Pseudo::NthChild { a: 2, b: 1 }),
        "even" => return Ok(Pseudo::NthChild { a: 2, b: 0 }),
        "" => return Err(invalid()),
        _ => {}
    }

    match lower.split_once('n') {
        None => {
            let b: i64 = lower.parse().map_err(|_| invalid())?;
            Ok(Pseudo::NthChild { a: 0, b })
        }
        Some((a_part, b_part)) => {
            let a = match a_part {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().map_err(|_| invalid())?,
            };
            let b = if b_part.is_empty() {
                0
            } else {
                if !b_part.starts_with(['+', '-']) {
                    return Err(invalid());
                }
                b_part.parse().map_err(|_| invalid())?
            };
            Ok(Pseudo::NthChild { a, b })
        }
    }
}
