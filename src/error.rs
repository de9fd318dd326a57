use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
  Io(String),
  InvalidBinary(String),
  InvalidXml(String),
  InvalidConfig(String),
  Y4M(String),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Io(msg) => write!(f, "I/O error: {}", msg),
      Error::InvalidBinary(msg) => write!(f, "invalid signature binary: {}", msg),
      Error::InvalidXml(msg) => write!(f, "invalid signature XML: {}", msg),
      Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
      Error::Y4M(msg) => write!(f, "Y4M error: {}", msg),
    }
  }
}

impl StdError for Error {}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Error::Io(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
