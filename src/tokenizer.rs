//! Lexical analysis: turns the raw source into a lazy stream of tokens.
//!
//! Matching is driven by an ordered table of anchored regular expressions; the
//! first pattern that matches at the cursor wins. Reserved words are picked out
//! of identifiers after the fact so that `iffy` stays a single identifier.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CompileError;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Else,
  Float,
  If,
  Input,
  Int,
  Output,
  While,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Comma,
  Colon,
  Semicolon,
  Assign,
  Num,
  Id,
  RelOp,
  AddOp,
  MulOp,
  Or,
  And,
  Not,
  Cast,
  Eof,
}

impl TokenKind {
  fn keyword(text: &str) -> Option<Self> {
    let kind = match text {
      "else" => TokenKind::Else,
      "float" => TokenKind::Float,
      "if" => TokenKind::If,
      "input" => TokenKind::Input,
      "int" => TokenKind::Int,
      "output" => TokenKind::Output,
      "while" => TokenKind::While,
      _ => return None,
    };
    Some(kind)
  }
}

/// A lexeme with the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
    }
  }

  pub fn eof(line: usize) -> Self {
    Self::new(TokenKind::Eof, "", line)
  }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
  Blank,
  Newlines,
  Comment,
  Word,
  Emit(TokenKind),
}

static RULES: LazyLock<Vec<(Regex, Rule)>> = LazyLock::new(|| {
  [
    (r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/", Rule::Comment),
    (r"[ \t\r]+", Rule::Blank),
    (r"\n+", Rule::Newlines),
    (r"(?:static_)?cast<(?:int|float)>", Rule::Emit(TokenKind::Cast)),
    (r"[0-9]+\.[0-9]*|[0-9]+", Rule::Emit(TokenKind::Num)),
    (r"[a-zA-Z][a-zA-Z0-9]*", Rule::Word),
    (r">=|<=|==|!=|<|>", Rule::Emit(TokenKind::RelOp)),
    (r"\|\|", Rule::Emit(TokenKind::Or)),
    (r"&&", Rule::Emit(TokenKind::And)),
    (r"!", Rule::Emit(TokenKind::Not)),
    (r"=", Rule::Emit(TokenKind::Assign)),
    (r"[+-]", Rule::Emit(TokenKind::AddOp)),
    (r"[*/]", Rule::Emit(TokenKind::MulOp)),
    (r"\(", Rule::Emit(TokenKind::LParen)),
    (r"\)", Rule::Emit(TokenKind::RParen)),
    (r"\{", Rule::Emit(TokenKind::LBrace)),
    (r"\}", Rule::Emit(TokenKind::RBrace)),
    (r",", Rule::Emit(TokenKind::Comma)),
    (r":", Rule::Emit(TokenKind::Colon)),
    (r";", Rule::Emit(TokenKind::Semicolon)),
  ]
  .into_iter()
  .map(|(pattern, rule)| {
    let anchored = Regex::new(&format!(r"\A(?:{pattern})")).expect("token pattern must compile");
    (anchored, rule)
  })
  .collect()
});

/// Single-pass scanner over a source string.
///
/// Yields `Err` for an invalid character and then carries on one character
/// later, so callers see every lexical error in document order.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
  source: &'a str,
  pos: usize,
  line: usize,
}

impl<'a> Tokenizer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      line: 1,
    }
  }

  /// Line the cursor currently sits on.
  pub fn line(&self) -> usize {
    self.line
  }

  fn match_rule(&self, rest: &str) -> Option<(usize, Rule)> {
    RULES
      .iter()
      .find_map(|(re, rule)| re.find(rest).map(|m| (m.end(), *rule)))
      .filter(|(len, _)| *len > 0)
  }
}

impl Iterator for Tokenizer<'_> {
  type Item = Result<Token, CompileError>;

  fn next(&mut self) -> Option<Self::Item> {
    while self.pos < self.source.len() {
      let rest = &self.source[self.pos..];

      let Some((len, rule)) = self.match_rule(rest) else {
        let ch = rest.chars().next().unwrap_or('\0');
        self.pos += ch.len_utf8().max(1);
        return Some(Err(CompileError::InvalidCharacter {
          line: self.line,
          ch,
        }));
      };

      let text = &rest[..len];
      self.pos += len;
      let line = self.line;

      match rule {
        Rule::Blank => {}
        Rule::Newlines | Rule::Comment => {
          self.line += text.matches('\n').count();
        }
        Rule::Word => {
          let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Id);
          return Some(Ok(Token::new(kind, text, line)));
        }
        Rule::Emit(kind) => return Some(Ok(Token::new(kind, text, line))),
      }
    }
    None
  }
}
