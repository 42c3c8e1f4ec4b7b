use crate::tokens::{CharacterPosition, LineNumber, Token};
use std::{fmt, ops};

#[derive(Copy, Clone, Debug)]
pub struct Span {
  pub start: CharacterPosition,
  pub end: CharacterPosition,
}
impl Span {
  pub fn to(self, end: Span) -> Span {
    Span {
      start: self.start,
      end: end.end,
    }
  }

  pub fn get_line_number(&self, source: &str) -> LineNumber {
    let mut line: LineNumber = 1;

    for byte in source.as_bytes().iter().take(self.start as usize) {
      if *byte == b'\n' {
        line += 1;
      }
    }

    line
  }
}
impl From<&Token> for Span {
  fn from(token: &Token) -> Self {
    Span {
      start: token.start,
      end: token.end,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Program {
  pub statements: Vec<Statement>,
}
impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for statement in &self.statements {
      write!(f, "{statement}")?;
    }
    Ok(())
  }
}

#[derive(Clone, Debug)]
pub struct Statement {
  pub stmt: Stmt,
  pub span: Span,
}
impl ops::Deref for Statement {
  type Target = Stmt;
  fn deref(&self) -> &Stmt {
    &self.stmt
  }
}

#[derive(Clone, Debug)]
pub enum Stmt {
  Let {
    name: String,
    value: Expression,
  },
  Return {
    value: Option<Expression>,
  },
  Expression {
    expression: Expression,
  },
}

impl fmt::Display for Statement {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.stmt {
      Stmt::Let { name, value } => write!(f, "let {name} = {value};"),
      Stmt::Return { value: Some(value) } => write!(f, "return {value};"),
      Stmt::Return { value: None } => write!(f, "return;"),
      Stmt::Expression { expression } => write!(f, "{expression}"),
    }
  }
}

#[derive(Clone, Debug)]
pub struct Block {
  pub statements: Vec<Statement>,
  pub span: Span,
}
impl fmt::Display for Block {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{{ ")?;
    for statement in &self.statements {
      write!(f, "{statement} ")?;
    }
    write!(f, "}}")
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
  Minus,
  Not,
}
impl fmt::Display for UnaryOperator {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Minus => write!(f, "-"),
      Self::Not => write!(f, "!"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
  Plus,
  Minus,
  Multiply,
  Divide,
  Equal,
  NotEqual,
  Greater,
  Less,
}
impl fmt::Display for BinaryOperator {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Plus => write!(f, "+"),
      Self::Minus => write!(f, "-"),
      Self::Multiply => write!(f, "*"),
      Self::Divide => write!(f, "/"),
      Self::Equal => write!(f, "=="),
      Self::NotEqual => write!(f, "!="),
      Self::Greater => write!(f, ">"),
      Self::Less => write!(f, "<"),
    }
  }
}

#[derive(Clone, Debug)]
pub struct Expression {
  pub expr: Expr,
  pub span: Span,
}
impl ops::Deref for Expression {
  type Target = Expr;
  fn deref(&self) -> &Expr {
    &self.expr
  }
}

#[derive(Clone, Debug)]
pub enum Expr {
  Identifier {
    name: String,
  },
  Integer {
    value: i64,
  },
  Boolean {
    value: bool,
  },
  String {
    value: String,
  },
  Unary {
    operator: UnaryOperator,
    right: Box<Expression>,
  },
  Binary {
    operator: BinaryOperator,
    left: Box<Expression>,
    right: Box<Expression>,
  },
  If {
    condition: Box<Expression>,
    then: Block,
    otherwise: Option<Block>,
  },
  Function {
    parameters: Vec<String>,
    body: Block,
    name: Option<String>,
  },
  Call {
    function: Box<Expression>,
    arguments: Vec<Expression>,
  },
  Array {
    elements: Vec<Expression>,
  },
  Hash {
    pairs: Vec<(Expression, Expression)>,
  },
  Index {
    left: Box<Expression>,
    index: Box<Expression>,
  },
}

fn write_joined(f: &mut fmt::Formatter, items: &[Expression]) -> fmt::Result {
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      write!(f, ", ")?;
    }
    write!(f, "{item}")?;
  }
  Ok(())
}

impl fmt::Display for Expression {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match &self.expr {
      Expr::Identifier { name } => write!(f, "{name}"),
      Expr::Integer { value } => write!(f, "{value}"),
      Expr::Boolean { value } => write!(f, "{value}"),
      Expr::String { value } => write!(f, "\"{value}\""),
      Expr::Unary { operator, right } => write!(f, "({operator}{right})"),
      Expr::Binary {
        operator,
        left,
        right,
      } => write!(f, "({left} {operator} {right})"),
      Expr::If {
        condition,
        then,
        otherwise: Some(otherwise),
      } => write!(f, "if ({condition}) {then} else {otherwise}"),
      Expr::If {
        condition,
        then,
        otherwise: None,
      } => write!(f, "if ({condition}) {then}"),
      Expr::Function {
        parameters, body, ..
      } => {
        write!(f, "fn(")?;
        for (i, parameter) in parameters.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{parameter}")?;
        }
        write!(f, ") {body}")
      }
      Expr::Call {
        function,
        arguments,
      } => {
        write!(f, "{function}(")?;
        write_joined(f, arguments)?;
        write!(f, ")")
      }
      Expr::Array { elements } => {
        write!(f, "[")?;
        write_joined(f, elements)?;
        write!(f, "]")
      }
      Expr::Hash { pairs } => {
        write!(f, "{{")?;
        for (i, (key, value)) in pairs.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
      }
      Expr::Index { left, index } => write!(f, "({left}[{index}])"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn span() -> Span {
    Span { start: 0, end: 0 }
  }

  #[test]
  fn should_display_let_statement() {
    let statement = Statement {
      stmt: Stmt::Let {
        name: "myVar".to_string(),
        value: Expression {
          expr: Expr::Identifier {
            name: "anotherVar".to_string(),
          },
          span: span(),
        },
      },
      span: span(),
    };

    assert_eq!(statement.to_string(), "let myVar = anotherVar;");
  }

  #[test]
  fn should_display_nested_expressions() {
    let one = Expression {
      expr: Expr::Integer { value: 1 },
      span: span(),
    };
    let two = Expression {
      expr: Expr::Integer { value: 2 },
      span: span(),
    };
    let sum = Expression {
      expr: Expr::Binary {
        operator: BinaryOperator::Plus,
        left: Box::new(one),
        right: Box::new(two),
      },
      span: span(),
    };
    let negated = Expression {
      expr: Expr::Unary {
        operator: UnaryOperator::Minus,
        right: Box::new(sum),
      },
      span: span(),
    };

    assert_eq!(negated.to_string(), "(-(1 + 2))");
  }

  #[test]
  fn should_compute_line_numbers_from_spans() {
    let source = "a\nbb\nccc";
    assert_eq!(Span { start: 0, end: 1 }.get_line_number(source), 1);
    assert_eq!(Span { start: 2, end: 4 }.get_line_number(source), 2);
    assert_eq!(Span { start: 5, end: 8 }.get_line_number(source), 3);
  }
}
