//! Recursive-descent translator.
//!
//! Parsing and code generation happen in the same pass: every grammar
//! function returns the synthesized result of its production, built by the
//! semantic actions in [`crate::codegen`]. Children are always translated
//! before their parent's action runs, so temporaries and labels are numbered
//! bottom-up.
//!
//! ```text
//! program      := declarations stmt_block EOF
//! declaration  := type idlist ';' | idlist ':' type ';'
//! stmt         := ID '=' expression ';' | input '(' ID ')' ';'
//!               | output '(' expression ')' ';'
//!               | if '(' boolexpr ')' stmt else stmt
//!               | while '(' boolexpr ')' stmt | stmt_block
//! boolexpr     := boolterm ('||' boolterm)*
//! boolterm     := boolfactor ('&&' boolfactor)*
//! boolfactor   := '!' '(' boolexpr ')' | expression RELOP expression
//! expression   := term (ADDOP term)*
//! term         := factor (MULOP factor)*
//! factor       := '(' expression ')' | CAST '(' expression ')' | ID | NUM
//! ```

use crate::codegen::CodeGen;
use crate::error::{CompileError, CompileResult, ErrorChannel};
use crate::quad::{ArithOp, Instr, Operand, Program, QuadResult, RelOp};
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::ty::Primitive;

/// One translation: owns the token stream and all semantic state, and reports
/// immediate errors to the channel it was given.
pub struct Translator<'s, 'c> {
  tokens: Tokenizer<'s>,
  lookahead: Option<Token>,
  channel: &'c mut dyn ErrorChannel,
  generator: CodeGen,
}

impl<'s, 'c> Translator<'s, 'c> {
  pub fn new(source: &'s str, channel: &'c mut dyn ErrorChannel) -> Self {
    Self {
      tokens: Tokenizer::new(source),
      lookahead: None,
      channel,
      generator: CodeGen::new(),
    }
  }

  /// Translate the whole source. `None` means at least one error was reported.
  pub fn run(mut self) -> Option<Program> {
    let body = match self.parse_program() {
      Ok(body) => body,
      Err(err) => {
        self.report(err);
        self.drain();
        self.flush_diagnostics();
        return None;
      }
    };

    match self.generator.finish(body) {
      Ok(program) => Some(program),
      Err(diagnostics) => {
        for diagnostic in diagnostics {
          self.report(CompileError::Semantic { diagnostic });
        }
        None
      }
    }
  }

  fn report(&mut self, error: CompileError) {
    tracing::debug!(%error, "reported");
    self.channel.report(error);
  }

  fn flush_diagnostics(&mut self) {
    let pending: Vec<_> = self.generator.diagnostics_mut().drain().collect();
    for diagnostic in pending {
      self.report(CompileError::Semantic { diagnostic });
    }
  }

  /// Consume what is left of the stream after a syntax error.
  fn drain(&mut self) {
    self.lookahead = None;
    while self.next_token().kind != TokenKind::Eof {}
  }

  // --- token cursor ---

  fn next_token(&mut self) -> Token {
    if let Some(token) = self.lookahead.take() {
      return token;
    }
    loop {
      match self.tokens.next() {
        Some(Ok(token)) => return token,
        Some(Err(err)) => self.report(err),
        None => return Token::eof(self.tokens.line()),
      }
    }
  }

  fn peek(&mut self) -> &Token {
    let token = self.next_token();
    self.lookahead.insert(token)
  }

  fn peek_kind(&mut self) -> TokenKind {
    self.peek().kind
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> Option<Token> {
    if self.peek_kind() == kind {
      self.lookahead.take()
    } else {
      None
    }
  }

  fn skip(&mut self, kind: TokenKind, expected: &str) -> CompileResult<Token> {
    match self.equal(kind) {
      Some(token) => Ok(token),
      None => Err(self.unexpected(expected)),
    }
  }

  fn unexpected(&mut self, expected: &str) -> CompileError {
    let token = self.peek();
    if token.kind == TokenKind::Eof {
      return CompileError::UnexpectedEof;
    }
    CompileError::syntax(token.line, expected, token.text.clone())
  }

  // --- declarations ---

  fn parse_program(&mut self) -> CompileResult<Vec<Instr>> {
    self.parse_declarations()?;
    let body = self.parse_block()?;
    if self.peek_kind() != TokenKind::Eof {
      return Err(self.unexpected("end of input"));
    }
    Ok(body)
  }

  fn parse_declarations(&mut self) -> CompileResult<()> {
    loop {
      match self.peek_kind() {
        TokenKind::Int | TokenKind::Float => {
          let ty = self.parse_type()?;
          let names = self.parse_idlist()?;
          self.skip(TokenKind::Semicolon, "\";\"")?;
          self.generator.declare(&names, ty);
        }
        TokenKind::Id => {
          let names = self.parse_idlist()?;
          self.skip(TokenKind::Colon, "\":\"")?;
          let ty = self.parse_type()?;
          self.skip(TokenKind::Semicolon, "\";\"")?;
          self.generator.declare(&names, ty);
        }
        TokenKind::LBrace => return Ok(()),
        _ => return Err(self.unexpected("a declaration or \"{\"")),
      }
    }
  }

  fn parse_type(&mut self) -> CompileResult<Primitive> {
    if self.equal(TokenKind::Int).is_some() {
      return Ok(Primitive::Int);
    }
    if self.equal(TokenKind::Float).is_some() {
      return Ok(Primitive::Real);
    }
    Err(self.unexpected("\"int\" or \"float\""))
  }

  fn parse_idlist(&mut self) -> CompileResult<Vec<String>> {
    let mut names = vec![self.skip(TokenKind::Id, "an identifier")?.text];
    while self.equal(TokenKind::Comma).is_some() {
      names.push(self.skip(TokenKind::Id, "an identifier")?.text);
    }
    Ok(names)
  }

  // --- statements ---

  fn parse_block(&mut self) -> CompileResult<Vec<Instr>> {
    self.skip(TokenKind::LBrace, "\"{\"")?;
    let mut code = Vec::new();
    while self.equal(TokenKind::RBrace).is_none() {
      code.extend(self.parse_stmt()?);
    }
    Ok(code)
  }

  fn parse_stmt(&mut self) -> CompileResult<Vec<Instr>> {
    match self.peek_kind() {
      TokenKind::Id => self.parse_assignment(),
      TokenKind::Input => self.parse_input(),
      TokenKind::Output => self.parse_output(),
      TokenKind::If => self.parse_if(),
      TokenKind::While => self.parse_while(),
      TokenKind::LBrace => self.parse_block(),
      _ => Err(self.unexpected("a statement")),
    }
  }

  fn parse_assignment(&mut self) -> CompileResult<Vec<Instr>> {
    let target = self.skip(TokenKind::Id, "an identifier")?;
    self.skip(TokenKind::Assign, "\"=\"")?;
    let value = self.parse_expression()?;
    self.skip(TokenKind::Semicolon, "\";\"")?;
    Ok(self.generator.assign(target.line, &target.text, value))
  }

  fn parse_input(&mut self) -> CompileResult<Vec<Instr>> {
    let keyword = self.skip(TokenKind::Input, "\"input\"")?;
    self.skip(TokenKind::LParen, "\"(\"")?;
    let target = self.skip(TokenKind::Id, "an identifier")?;
    self.skip(TokenKind::RParen, "\")\"")?;
    self.skip(TokenKind::Semicolon, "\";\"")?;
    Ok(self.generator.input(keyword.line, &target.text))
  }

  fn parse_output(&mut self) -> CompileResult<Vec<Instr>> {
    let keyword = self.skip(TokenKind::Output, "\"output\"")?;
    self.skip(TokenKind::LParen, "\"(\"")?;
    let value = self.parse_expression()?;
    self.skip(TokenKind::RParen, "\")\"")?;
    self.skip(TokenKind::Semicolon, "\";\"")?;
    Ok(self.generator.output(keyword.line, value))
  }

  fn parse_if(&mut self) -> CompileResult<Vec<Instr>> {
    self.skip(TokenKind::If, "\"if\"")?;
    let cond = self.parse_condition()?;
    let then = self.parse_stmt()?;
    self.skip(TokenKind::Else, "\"else\"")?;
    let otherwise = self.parse_stmt()?;
    Ok(self.generator.if_else(cond, then, otherwise))
  }

  fn parse_while(&mut self) -> CompileResult<Vec<Instr>> {
    self.skip(TokenKind::While, "\"while\"")?;
    let cond = self.parse_condition()?;
    let body = self.parse_stmt()?;
    Ok(self.generator.while_loop(cond, body))
  }

  fn parse_condition(&mut self) -> CompileResult<QuadResult> {
    self.skip(TokenKind::LParen, "\"(\"")?;
    let cond = self.parse_boolexpr()?;
    self.skip(TokenKind::RParen, "\")\"")?;
    Ok(cond)
  }

  // --- boolean expressions ---

  fn parse_boolexpr(&mut self) -> CompileResult<QuadResult> {
    let mut node = self.parse_boolterm()?;
    while self.equal(TokenKind::Or).is_some() {
      let rhs = self.parse_boolterm()?;
      node = self.generator.or(node, rhs);
    }
    Ok(node)
  }

  fn parse_boolterm(&mut self) -> CompileResult<QuadResult> {
    let mut node = self.parse_boolfactor()?;
    while self.equal(TokenKind::And).is_some() {
      let rhs = self.parse_boolfactor()?;
      node = self.generator.and(node, rhs);
    }
    Ok(node)
  }

  fn parse_boolfactor(&mut self) -> CompileResult<QuadResult> {
    if self.equal(TokenKind::Not).is_some() {
      let operand = self.parse_condition()?;
      return Ok(self.generator.not(operand));
    }

    let lhs = self.parse_expression()?;
    let relop = self.skip(TokenKind::RelOp, "a relational operator")?;
    let op = RelOp::from_symbol(&relop.text)
      .ok_or_else(|| CompileError::syntax(relop.line, "a relational operator", relop.text.clone()))?;
    let rhs = self.parse_expression()?;
    Ok(self.generator.relational(relop.line, op, lhs, rhs))
  }

  // --- arithmetic expressions ---

  fn parse_expression(&mut self) -> CompileResult<QuadResult> {
    let mut node = self.parse_term()?;
    while let Some(token) = self.equal(TokenKind::AddOp) {
      let op = arith_op(&token)?;
      let rhs = self.parse_term()?;
      node = self.generator.arith(token.line, op, node, rhs);
    }
    Ok(node)
  }

  fn parse_term(&mut self) -> CompileResult<QuadResult> {
    let mut node = self.parse_factor()?;
    while let Some(token) = self.equal(TokenKind::MulOp) {
      let op = arith_op(&token)?;
      let rhs = self.parse_factor()?;
      node = self.generator.arith(token.line, op, node, rhs);
    }
    Ok(node)
  }

  fn parse_factor(&mut self) -> CompileResult<QuadResult> {
    if self.equal(TokenKind::LParen).is_some() {
      let node = self.parse_expression()?;
      self.skip(TokenKind::RParen, "\")\"")?;
      return Ok(node);
    }

    if let Some(cast) = self.equal(TokenKind::Cast) {
      let target = if cast.text.contains("int") {
        Primitive::Int
      } else {
        Primitive::Real
      };
      self.skip(TokenKind::LParen, "\"(\"")?;
      let operand = self.parse_expression()?;
      self.skip(TokenKind::RParen, "\")\"")?;
      return Ok(self.generator.cast(cast.line, target, operand));
    }

    if let Some(ident) = self.equal(TokenKind::Id) {
      return Ok(QuadResult::leaf(Operand::Name(ident.text)));
    }

    if let Some(number) = self.equal(TokenKind::Num) {
      return Ok(QuadResult::leaf(Operand::Numeral(number.text)));
    }

    Err(self.unexpected("an expression"))
  }
}

fn arith_op(token: &Token) -> CompileResult<ArithOp> {
  ArithOp::from_symbol(&token.text)
    .ok_or_else(|| CompileError::syntax(token.line, "an arithmetic operator", token.text.clone()))
}
