use crate::tokens::LineNumber;
use std::{error, fmt};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
  pub title: String,
  pub message: String,
  pub lines: Vec<LineNumber>,
}

impl Diagnostic {
  pub fn new(title: &str, message: String, line: LineNumber) -> Self {
    Self {
      title: title.to_string(),
      message,
      lines: vec![line],
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.lines.first() {
      Some(line) => write!(f, "{}: {}\nat line {line}", self.title, self.message),
      None => write!(f, "{}: {}", self.title, self.message),
    }
  }
}
impl error::Error for Diagnostic {}
