use crate::{
  ast::{BinaryOperator, Block, Expr, Expression, Program, Span, Statement, Stmt, UnaryOperator},
  diagnostic::Diagnostic,
  tokens::{tokenize, LineNumber, Token, TokenType},
};

#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
enum Precedence {
  Lowest = 1,
  Equality,   // == !=
  Comparison, // < >
  Term,       // + -
  Factor,     // * /
  Unary,      // ! -
  Call,       // () []
}

impl Precedence {
  fn from(token_type: TokenType) -> Self {
    match token_type {
      TokenType::EqualEqual | TokenType::BangEqual => Self::Equality,
      TokenType::Less | TokenType::Greater => Self::Comparison,
      TokenType::Plus | TokenType::Minus => Self::Term,
      TokenType::Star | TokenType::Slash => Self::Factor,
      TokenType::LeftParen | TokenType::LeftSquare => Self::Call,
      _ => Self::Lowest,
    }
  }
}

enum Error {
  ExpectedToken {
    expected: TokenType,
    got: TokenType,
  },
  NoPrefixParseFunction(TokenType),
  InvalidInteger(String),
}
impl Error {
  fn get_message(&self) -> String {
    match self {
      Self::ExpectedToken { expected, got } => {
        format!("expected next token to be {expected}, got {got}")
      }
      Self::NoPrefixParseFunction(token_type) => {
        format!("no prefix parse function for {token_type}")
      }
      Self::InvalidInteger(literal) => format!("could not parse {literal} as integer"),
    }
  }

  fn into_diagnostic(self, line: LineNumber) -> Diagnostic {
    Diagnostic::new("Syntax Error", self.get_message(), line)
  }
}

type ExpressionResult = Result<Expression, Error>;
type StatementResult = Result<Statement, Error>;

struct Parser<'source> {
  source: &'source [u8],
  tokens: Vec<Token>,
  position: usize,
}

impl<'source> Parser<'source> {
  fn new(source: &'source str, tokens: Vec<Token>) -> Self {
    Self {
      source: source.as_bytes(),
      tokens,
      position: 0,
    }
  }

  fn at_end(&self) -> bool {
    self.position >= self.tokens.len()
  }

  fn current(&self) -> Token {
    match self.tokens.get(self.position) {
      Some(token) => *token,
      None => Token {
        ttype: TokenType::EndOfFile,
        start: self.source.len() as u32,
        end: self.source.len() as u32,
        line: self.tokens.last().map_or(1, |token| token.line),
      },
    }
  }

  fn advance(&mut self) -> Token {
    let token = self.current();
    self.position += 1;
    token
  }

  fn matches(&mut self, token_type: TokenType) -> bool {
    let matches = self.current().ttype == token_type;
    if matches {
      self.position += 1;
    }
    matches
  }

  fn expect(&mut self, token_type: TokenType) -> Result<Token, Error> {
    let current = self.current();
    if current.ttype == token_type {
      self.position += 1;
      Ok(current)
    } else {
      Err(Error::ExpectedToken {
        expected: token_type,
        got: current.ttype,
      })
    }
  }

  fn token_value(&self, token: Token) -> String {
    token.get_value(self.source).to_string()
  }

  // Skip forward to the statement after the one that failed, so further
  // errors can still be gathered.
  fn synchronize(&mut self) {
    while !self.at_end() {
      match self.advance().ttype {
        TokenType::Semicolon | TokenType::RightBrace => break,
        _ => {}
      }
    }
  }

  fn parse_program(&mut self) -> Result<Program, Vec<Diagnostic>> {
    let mut statements = Vec::new();
    let mut diagnostics = Vec::new();

    while !self.at_end() {
      match self.parse_statement() {
        Ok(statement) => statements.push(statement),
        Err(error) => {
          diagnostics.push(error.into_diagnostic(self.current().line));
          self.synchronize();
        }
      }
    }

    if diagnostics.is_empty() {
      Ok(Program { statements })
    } else {
      Err(diagnostics)
    }
  }

  fn parse_statement(&mut self) -> StatementResult {
    match self.current().ttype {
      TokenType::Let => self.let_statement(),
      TokenType::Return => self.return_statement(),
      _ => self.expression_statement(),
    }
  }

  fn let_statement(&mut self) -> StatementResult {
    let keyword = self.advance();
    let name_token = self.expect(TokenType::Identifier)?;
    let name = self.token_value(name_token);
    self.expect(TokenType::Equal)?;

    let mut value = self.parse_expression(Precedence::Lowest)?;
    if let Expr::Function {
      name: function_name,
      ..
    } = &mut value.expr
    {
      *function_name = Some(name.clone());
    }

    let span = Span::from(&keyword).to(value.span);
    self.matches(TokenType::Semicolon);

    Ok(Statement {
      stmt: Stmt::Let { name, value },
      span,
    })
  }

  fn return_statement(&mut self) -> StatementResult {
    let keyword = self.advance();

    let value = match self.current().ttype {
      TokenType::Semicolon | TokenType::RightBrace | TokenType::EndOfFile => None,
      _ => Some(self.parse_expression(Precedence::Lowest)?),
    };

    let span = match &value {
      Some(value) => Span::from(&keyword).to(value.span),
      None => Span::from(&keyword),
    };
    self.matches(TokenType::Semicolon);

    Ok(Statement {
      stmt: Stmt::Return { value },
      span,
    })
  }

  fn expression_statement(&mut self) -> StatementResult {
    let expression = self.parse_expression(Precedence::Lowest)?;
    let span = expression.span;
    self.matches(TokenType::Semicolon);

    Ok(Statement {
      stmt: Stmt::Expression { expression },
      span,
    })
  }

  fn parse_expression(&mut self, precedence: Precedence) -> ExpressionResult {
    let mut expression = self.prefix_rule()?;

    while precedence < Precedence::from(self.current().ttype) {
      expression = self.infix_rule(expression)?;
    }

    Ok(expression)
  }

  fn prefix_rule(&mut self) -> ExpressionResult {
    match self.current().ttype {
      TokenType::Identifier => self.variable(),
      TokenType::Number => self.integer(),
      TokenType::String => self.string(),
      TokenType::True | TokenType::False => self.boolean(),
      TokenType::Bang | TokenType::Minus => self.unary(),
      TokenType::LeftParen => self.grouping(),
      TokenType::If => self.if_expression(),
      TokenType::Function => self.function(),
      TokenType::LeftSquare => self.array(),
      TokenType::LeftBrace => self.hash(),
      token_type => Err(Error::NoPrefixParseFunction(token_type)),
    }
  }

  fn infix_rule(&mut self, previous: Expression) -> ExpressionResult {
    match self.current().ttype {
      TokenType::LeftParen => self.call(previous),
      TokenType::LeftSquare => self.index(previous),
      TokenType::Plus
      | TokenType::Minus
      | TokenType::Star
      | TokenType::Slash
      | TokenType::EqualEqual
      | TokenType::BangEqual
      | TokenType::Less
      | TokenType::Greater => self.binary(previous),
      _ => unreachable!("no infix rule for token outside the precedence table"),
    }
  }

  fn variable(&mut self) -> ExpressionResult {
    let token = self.advance();

    Ok(Expression {
      expr: Expr::Identifier {
        name: self.token_value(token),
      },
      span: Span::from(&token),
    })
  }

  fn integer(&mut self) -> ExpressionResult {
    let token = self.advance();
    let literal = token.get_value(self.source);

    let value = literal
      .parse()
      .map_err(|_| Error::InvalidInteger(literal.to_string()))?;

    Ok(Expression {
      expr: Expr::Integer { value },
      span: Span::from(&token),
    })
  }

  fn string(&mut self) -> ExpressionResult {
    let token = self.advance();
    let literal = token.get_value(self.source);

    // Trim the quotes; an unterminated literal has no closing quote to trim.
    let value = literal.strip_prefix('"').unwrap_or(literal);
    let value = value.strip_suffix('"').unwrap_or(value);

    Ok(Expression {
      expr: Expr::String {
        value: value.to_string(),
      },
      span: Span::from(&token),
    })
  }

  fn boolean(&mut self) -> ExpressionResult {
    let token = self.advance();

    Ok(Expression {
      expr: Expr::Boolean {
        value: token.ttype == TokenType::True,
      },
      span: Span::from(&token),
    })
  }

  fn unary(&mut self) -> ExpressionResult {
    let token = self.advance();
    let operator = match token.ttype {
      TokenType::Minus => UnaryOperator::Minus,
      TokenType::Bang => UnaryOperator::Not,
      _ => unreachable!(),
    };

    let right = self.parse_expression(Precedence::Unary)?;
    let span = Span::from(&token).to(right.span);

    Ok(Expression {
      expr: Expr::Unary {
        operator,
        right: Box::new(right),
      },
      span,
    })
  }

  fn grouping(&mut self) -> ExpressionResult {
    self.advance();
    let expression = self.parse_expression(Precedence::Lowest)?;
    self.expect(TokenType::RightParen)?;

    Ok(expression)
  }

  fn block(&mut self) -> Result<Block, Error> {
    let open = self.expect(TokenType::LeftBrace)?;

    let mut statements = Vec::new();
    while !self.at_end() && self.current().ttype != TokenType::RightBrace {
      statements.push(self.parse_statement()?);
    }

    // The end of input also terminates a block.
    let span = if self.current().ttype == TokenType::RightBrace {
      Span::from(&open).to(Span::from(&self.advance()))
    } else {
      Span::from(&open)
    };

    Ok(Block { statements, span })
  }

  fn if_expression(&mut self) -> ExpressionResult {
    let keyword = self.advance();
    self.expect(TokenType::LeftParen)?;
    let condition = self.parse_expression(Precedence::Lowest)?;
    self.expect(TokenType::RightParen)?;

    let then = self.block()?;
    let otherwise = if self.matches(TokenType::Else) {
      Some(self.block()?)
    } else {
      None
    };

    let end = otherwise.as_ref().map_or(then.span, |block| block.span);
    let span = Span::from(&keyword).to(end);

    Ok(Expression {
      expr: Expr::If {
        condition: Box::new(condition),
        then,
        otherwise,
      },
      span,
    })
  }

  fn function(&mut self) -> ExpressionResult {
    let keyword = self.advance();
    self.expect(TokenType::LeftParen)?;

    let mut parameters = Vec::new();
    if !self.matches(TokenType::RightParen) {
      let parameter = self.expect(TokenType::Identifier)?;
      parameters.push(self.token_value(parameter));

      while self.matches(TokenType::Comma) {
        let parameter = self.expect(TokenType::Identifier)?;
        parameters.push(self.token_value(parameter));
      }

      self.expect(TokenType::RightParen)?;
    }

    let body = self.block()?;
    let span = Span::from(&keyword).to(body.span);

    Ok(Expression {
      expr: Expr::Function {
        parameters,
        body,
        name: None,
      },
      span,
    })
  }

  fn expression_list(&mut self, end: TokenType) -> Result<(Vec<Expression>, Token), Error> {
    let mut items = Vec::new();

    if self.current().ttype == end {
      return Ok((items, self.advance()));
    }

    items.push(self.parse_expression(Precedence::Lowest)?);
    while self.matches(TokenType::Comma) {
      items.push(self.parse_expression(Precedence::Lowest)?);
    }

    let end_token = self.expect(end)?;
    Ok((items, end_token))
  }

  fn array(&mut self) -> ExpressionResult {
    let open = self.advance();
    let (elements, close) = self.expression_list(TokenType::RightSquare)?;

    Ok(Expression {
      expr: Expr::Array { elements },
      span: Span::from(&open).to(Span::from(&close)),
    })
  }

  fn hash(&mut self) -> ExpressionResult {
    let open = self.advance();

    let mut pairs = Vec::new();
    if self.current().ttype != TokenType::RightBrace {
      loop {
        let key = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenType::Colon)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        pairs.push((key, value));

        if !self.matches(TokenType::Comma) {
          break;
        }
      }
    }
    let close = self.expect(TokenType::RightBrace)?;

    Ok(Expression {
      expr: Expr::Hash { pairs },
      span: Span::from(&open).to(Span::from(&close)),
    })
  }

  fn call(&mut self, function: Expression) -> ExpressionResult {
    self.advance();
    let (arguments, close) = self.expression_list(TokenType::RightParen)?;
    let span = function.span.to(Span::from(&close));

    Ok(Expression {
      expr: Expr::Call {
        function: Box::new(function),
        arguments,
      },
      span,
    })
  }

  fn index(&mut self, left: Expression) -> ExpressionResult {
    self.advance();
    let index = self.parse_expression(Precedence::Lowest)?;
    let close = self.expect(TokenType::RightSquare)?;
    let span = left.span.to(Span::from(&close));

    Ok(Expression {
      expr: Expr::Index {
        left: Box::new(left),
        index: Box::new(index),
      },
      span,
    })
  }

  fn binary(&mut self, left: Expression) -> ExpressionResult {
    let token = self.advance();
    let operator = match token.ttype {
      TokenType::Plus => BinaryOperator::Plus,
      TokenType::Minus => BinaryOperator::Minus,
      TokenType::Star => BinaryOperator::Multiply,
      TokenType::Slash => BinaryOperator::Divide,
      TokenType::EqualEqual => BinaryOperator::Equal,
      TokenType::BangEqual => BinaryOperator::NotEqual,
      TokenType::Greater => BinaryOperator::Greater,
      TokenType::Less => BinaryOperator::Less,
      _ => unreachable!(),
    };

    let right = self.parse_expression(Precedence::from(token.ttype))?;
    let span = left.span.to(right.span);

    Ok(Expression {
      expr: Expr::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
      },
      span,
    })
  }
}

pub fn parse(source: &str) -> Result<Program, Vec<Diagnostic>> {
  let tokens = tokenize(source);
  Parser::new(source, tokens).parse_program()
}
