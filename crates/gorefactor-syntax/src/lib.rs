// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Go syntax for gorefactor.
//!
//! This crate turns Go source text into an arena AST:
//!
//! - [`lexer`]: tokens, with automatic semicolon insertion
//! - [`parser`]: recursive descent producing [`ast::NodeKind`] nodes
//! - [`ast`]: the arena, node kinds, and traversal helpers
//! - [`path`]: the chain of nodes enclosing a selection
//!
//! Positions are byte offsets into the file being parsed. Several files can
//! share one [`Ast`]; each node records the [`FileId`] it came from.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod token;

pub use ast::{Ast, FileId, Node, NodeId, NodeKind};
pub use error::ParseError;
pub use parser::{parse_expr, parse_file};
pub use path::path_enclosing_interval;
pub use token::TokenKind;
