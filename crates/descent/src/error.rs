//! Structural defects of a syntax.
//!
//! Parse failures are ordinary values carried by
//! [`ParseResult`](crate::parser::ParseResult); the errors here are
//! programmer errors in the shape of the syntax itself. They are
//! diagnosed once, when a [`Parser`](crate::parser::Parser) is built,
//! so a parser that constructs successfully can never hit them while
//! consuming tokens.

use thiserror::Error;

use crate::syntax::TokenKind;

/// A defect that makes a syntax unusable for LL(1) parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError<K: TokenKind> {
    /// Both branches of a disjunction can start with the same token
    /// kind, so one token of lookahead cannot pick a side.
    #[error("FIRST/FIRST conflict: {kinds:?} can begin both branches of a disjunction")]
    FirstFirstConflict {
        /// The overlapping kinds, sorted for deterministic reporting.
        kinds: Vec<K>,
    },

    /// Both branches of a disjunction accept the empty input, so the
    /// empty match is ambiguous.
    #[error("both branches of a disjunction accept the empty input")]
    BothNullable,

    /// A syntax can reach itself without consuming a token. Deriving
    /// such a syntax would descend forever, so it is rejected up front.
    #[error("left-recursive syntax: a syntax reaches itself without consuming input")]
    LeftRecursion,
}
