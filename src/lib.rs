pub mod ast;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
