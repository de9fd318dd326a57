pub mod binary;
pub mod bitio;
pub mod xml;
