//! Source text to token stream.
//!
//! Trivia, numbers, words and punctuation are recognized with `nom`
//! combinators. String literals are scanned by hand so that unterminated
//! strings and bad escapes can be reported with the literal's position.

use crate::error::ParseError;
use crate::token::{Keyword, Position, Spanned, Token};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{map, map_res, opt, recognize, value},
    error::context,
    sequence::{delimited, pair, preceded},
};

type LexResult<'a, T> = IResult<&'a str, T>;

/// Split `source` into tokens. The last token is always [`Token::Eof`].
#[tracing::instrument(level = "trace", skip(source), fields(len = source.len()))]
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        while let Ok((next, _)) = trivia(rest) {
            rest = next;
        }
        cursor.advance(rest);
        let pos = cursor.position();

        if rest.is_empty() {
            break;
        }
        if rest.starts_with("/*") {
            return Err(ParseError::UnterminatedComment { pos });
        }
        if rest.starts_with('"') {
            let (next, text) = string_literal(rest, pos)?;
            tokens.push(Spanned {
                token: Token::Str(text),
                pos,
            });
            rest = next;
            continue;
        }

        match alt((number, word, operator, delimiter))(rest) {
            Ok((next, token)) => {
                tokens.push(Spanned { token, pos });
                rest = next;
            }
            Err(_) => {
                return Err(ParseError::UnexpectedChar {
                    ch: rest.chars().next().unwrap_or_default(),
                    pos,
                });
            }
        }
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: cursor.position(),
    });
    Ok(tokens)
}

/// Tracks line and column incrementally as input is consumed.
struct Cursor<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self, rest: &str) {
        let target = self.source.len() - rest.len();
        for c in self.source[self.offset..target].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = target;
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

fn inline_space(input: &str) -> LexResult<'_, &str> {
    take_while1(|c: char| c == ' ' || c == '\t' || c == '\r')(input)
}

fn line_comment(input: &str) -> LexResult<'_, &str> {
    preceded(tag("//"), take_while(|c: char| c != '\n'))(input)
}

fn block_comment(input: &str) -> LexResult<'_, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/"))(input)
}

fn trivia(input: &str) -> LexResult<'_, &str> {
    alt((inline_space, line_comment, block_comment))(input)
}

fn number(input: &str) -> LexResult<'_, Token> {
    context(
        "number",
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            |text: &str| text.parse::<f64>().map(Token::Number),
        ),
    )(input)
}

/// Identifiers and keywords. The whole word is consumed first so that
/// `Iffy` is an identifier rather than `If` followed by `fy`.
fn word(input: &str) -> LexResult<'_, Token> {
    context(
        "word",
        map(
            recognize(pair(
                satisfy(|c: char| c.is_alphabetic() || c == '_'),
                take_while(|c: char| c.is_alphanumeric() || c == '_'),
            )),
            |w: &str| match w.parse::<Keyword>() {
                Ok(keyword) => Token::Keyword(keyword),
                Err(_) => Token::Ident(w.to_string()),
            },
        ),
    )(input)
}

fn operator(input: &str) -> LexResult<'_, Token> {
    alt((
        value(Token::EqEq, tag("==")),
        value(Token::NotEq, tag("!=")),
        value(Token::Le, tag("<=")),
        value(Token::Ge, tag(">=")),
        value(Token::AndAnd, tag("&&")),
        value(Token::OrOr, tag("||")),
        value(Token::Plus, char('+')),
        value(Token::Minus, char('-')),
        value(Token::Star, char('*')),
        value(Token::Slash, char('/')),
        value(Token::Percent, char('%')),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
        value(Token::Bang, char('!')),
        value(Token::Assign, char('=')),
    ))(input)
}

fn delimiter(input: &str) -> LexResult<'_, Token> {
    alt((
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::LBrace, char('{')),
        value(Token::RBrace, char('}')),
        value(Token::LBracket, char('[')),
        value(Token::RBracket, char(']')),
        value(Token::Comma, char(',')),
        value(Token::Colon, char(':')),
        value(Token::Semicolon, char(';')),
        value(Token::Newline, char('\n')),
    ))(input)
}

/// Scan a double-quoted literal. `input` starts at the opening quote.
fn string_literal(input: &str, pos: Position) -> Result<(&str, String), ParseError> {
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&input[i + 1..], out)),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '\\' => '\\',
                    '"' => '"',
                    other => return Err(ParseError::InvalidEscape { ch: other, pos }),
                });
            }
            c => out.push(c),
        }
    }

    Err(ParseError::UnterminatedString { pos })
}
