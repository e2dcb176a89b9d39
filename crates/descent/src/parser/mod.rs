//! # Derivative Engine
//!
//! The token-driven LL(1) driver.
//!
//! ## Overview
//!
//! A [`Parser`] is an immutable driver state: a compiled copy of the
//! syntax graph with its precomputed properties, a *focus* (the syntax
//! currently being matched), and a continuation chain (the work
//! remaining once the focus finishes). Consuming a token rewrites the
//! state in three moves:
//!
//! 1. **Locate**: if the token's kind is in the focus's FIRST set, stop
//!    there; otherwise fold the focus's nullable value one redirecting
//!    frame into the chain and retry. A focus that is neither matching
//!    nor nullable rejects the token.
//! 2. **Derive**: descend into the focused syntax along the branch
//!    whose FIRST set contains the kind, pushing deferred obligations
//!    onto the chain, until the matching terminal is reached.
//! 3. **Fold**: feed the consumed token through the chain to obtain the
//!    next state.
//!
//! Every [`ParseResult`] carries the residual state, which is itself a
//! valid parser: feeding it further tokens continues the parse exactly
//! where it stopped.

mod chain;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashSet;

use crate::error::GrammarError;
use crate::parser::chain::{Chain, Folded, Frame, fold};
use crate::syntax::analysis::Properties;
use crate::syntax::value::{Value, pack, unpack};
use crate::syntax::{Node, Syntax, SyntaxArena, SyntaxId, Token};

/// Immutable compiled form of an arena: the nodes plus their analysis.
struct Compiled<T: Token> {
    nodes: Vec<Node<T>>,
    props: Properties<T::Kind>,
}

/// What the driver is currently matching.
#[derive(Clone)]
enum Focus {
    /// The syntax at this index.
    Node(SyntaxId),
    /// The whole parse has produced a value. Equivalent to focusing
    /// `epsilon(value)` with an empty chain; only ever paired with one.
    Done(Value),
}

/// An LL(1) parser for syntaxes producing `A`, and at the same time one
/// parse state of that parser.
///
/// `parse` does not mutate the receiver; it returns the residual state
/// inside the [`ParseResult`]. Old states stay valid, so a caller can
/// re-drive from an earlier prefix with a different tail.
pub struct Parser<T: Token, A> {
    compiled: Arc<Compiled<T>>,
    focus: Focus,
    chain: Chain,
    result: PhantomData<fn() -> A>,
}

/// Outcome of driving a parser over a token stream.
pub enum ParseResult<T: Token, A> {
    /// Input was exhausted and the residual state accepts the empty
    /// input; the value is the completed parse. The residual state can
    /// still consume further tokens (the match may be extensible).
    Parsed(A, Parser<T, A>),
    /// The returned token has no acceptable continuation. The residual
    /// state is the state that rejected it, before consuming it.
    UnexpectedToken(T, Parser<T, A>),
    /// Input ended but the residual state requires more tokens.
    UnexpectedEnd(Parser<T, A>),
}

impl<T: Token, A> ParseResult<T, A> {
    /// The parsed value, if the parse completed.
    #[must_use]
    pub fn value(self) -> Option<A> {
        match self {
            Self::Parsed(value, _) => Some(value),
            Self::UnexpectedToken(..) | Self::UnexpectedEnd(_) => None,
        }
    }

    /// The residual driver state, whatever the outcome.
    #[must_use]
    pub fn residual(self) -> Parser<T, A> {
        match self {
            Self::Parsed(_, parser)
            | Self::UnexpectedToken(_, parser)
            | Self::UnexpectedEnd(parser) => parser,
        }
    }

    /// Whether the parse completed with a value.
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(..))
    }
}

impl<T: Token, A> fmt::Debug for ParseResult<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(..) => f.write_str("Parsed(..)"),
            Self::UnexpectedToken(token, _) => write!(f, "UnexpectedToken({token:?}, ..)"),
            Self::UnexpectedEnd(_) => f.write_str("UnexpectedEnd(..)"),
        }
    }
}

impl<T: Token, A> Parser<T, A> {
    /// Compile `root` into a parser.
    ///
    /// The arena's analysis runs here, and so do the structural checks:
    /// a syntax that violates the LL(1) invariants is rejected before
    /// any token is consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if any disjunction reachable from
    /// `root` has overlapping FIRST sets or two nullable branches, or
    /// if the syntax is left-recursive.
    pub fn new(arena: &SyntaxArena<T>, root: Syntax<A>) -> Result<Self, GrammarError<T::Kind>> {
        let props = Properties::compute(arena);
        props.validate(arena, root.id)?;
        let compiled = Arc::new(Compiled {
            nodes: arena.nodes.clone(),
            props,
        });
        Ok(Self {
            compiled,
            focus: Focus::Node(root.id),
            chain: Chain::new(),
            result: PhantomData,
        })
    }

    /// Consume `tokens` until the stream ends or a token is rejected.
    pub fn parse<I>(&self, tokens: I) -> ParseResult<T, A>
    where
        I: IntoIterator<Item = T>,
        A: Clone + 'static,
    {
        let mut focus = self.focus.clone();
        let mut chain = self.chain.clone();
        for token in tokens {
            if !self.step(&mut focus, &mut chain, &token) {
                return ParseResult::UnexpectedToken(token, self.with_state(focus, chain));
            }
        }
        self.finish(focus, chain)
    }

    /// All token kinds the residual state would accept next.
    #[must_use]
    pub fn first(&self) -> HashSet<T::Kind, ahash::RandomState> {
        let mut kinds = HashSet::with_hasher(ahash::RandomState::new());
        let mut focus = self.focus.clone();
        let mut chain = self.chain.clone();
        loop {
            let id = match focus {
                Focus::Done(_) => return kinds,
                Focus::Node(id) => id,
            };
            kinds.extend(self.compiled.props.first[id.0].iter().copied());
            let Some(empty) = self.compiled.props.nullable[id.0].clone() else {
                return kinds;
            };
            focus = match fold(&mut chain, empty) {
                Folded::Finished(_) => return kinds,
                Folded::Resumed(next) => Focus::Node(next),
            };
        }
    }

    /// Whether ending the input here would complete the parse.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        let mut focus = self.focus.clone();
        let mut chain = self.chain.clone();
        loop {
            let id = match focus {
                Focus::Done(_) => return true,
                Focus::Node(id) => id,
            };
            let Some(empty) = self.compiled.props.nullable[id.0].clone() else {
                return false;
            };
            focus = match fold(&mut chain, empty) {
                Folded::Finished(_) => return true,
                Folded::Resumed(next) => Focus::Node(next),
            };
        }
    }

    /// Consume one token; `false` means it was rejected. On success the
    /// state advances; on rejection the state is an equivalent
    /// rewriting of the one handed in (folding preserves the denoted
    /// residual language).
    fn step(&self, focus: &mut Focus, chain: &mut Chain, token: &T) -> bool {
        let kind = token.kind();
        loop {
            let id = match &*focus {
                Focus::Done(_) => return false,
                Focus::Node(id) => *id,
            };
            // A non-empty match is preferred over folding out the
            // nullable value.
            if self.compiled.props.first[id.0].contains(&kind) {
                self.derive(id, kind, chain);
                *focus = match fold(chain, pack(token.clone())) {
                    Folded::Finished(value) => Focus::Done(value),
                    Folded::Resumed(next) => Focus::Node(next),
                };
                return true;
            }
            let Some(empty) = self.compiled.props.nullable[id.0].clone() else {
                return false;
            };
            *focus = match fold(chain, empty) {
                Folded::Finished(value) => Focus::Done(value),
                Folded::Resumed(next) => Focus::Node(next),
            };
        }
    }

    /// Descend into the syntax at `id` consuming one token of kind
    /// `kind`, pushing the deferred obligations onto the chain.
    ///
    /// The caller guarantees `kind` is in the FIRST set of `id`, so the
    /// descent always ends at a matching terminal.
    fn derive(&self, mut id: SyntaxId, kind: T::Kind, chain: &mut Chain) {
        loop {
            match &self.compiled.nodes[id.0] {
                Node::Elem(_) => return,
                Node::Transform { inner, map } => {
                    chain.push(Frame::Apply { map: map.clone() });
                    id = *inner;
                }
                Node::Disjunction { left, right } => {
                    // Left bias; disjointness makes this unambiguous
                    // for a validated syntax.
                    id = if self.compiled.props.first[left.0].contains(&kind) {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Sequence { left, right, join } => {
                    if self.compiled.props.first[left.0].contains(&kind) {
                        chain.push(Frame::FollowBy {
                            second: *right,
                            join: join.clone(),
                        });
                        id = *left;
                    } else {
                        let empty = self.compiled.props.nullable[left.0].clone().expect(
                            "kind in FIRST of a sequence whose left side neither begins with it nor is nullable",
                        );
                        chain.push(Frame::Prepend {
                            value: empty,
                            join: join.clone(),
                        });
                        id = *right;
                    }
                }
                Node::Concat { left, right, join } => {
                    if self.compiled.props.first[left.0].contains(&kind) {
                        chain.push(Frame::FollowByAll {
                            second: *right,
                            join: join.clone(),
                        });
                        id = *left;
                    } else {
                        let empty = self.compiled.props.nullable[left.0].clone().expect(
                            "kind in FIRST of a concatenation whose left side neither begins with it nor is nullable",
                        );
                        chain.push(Frame::PrependAll {
                            prefix: empty,
                            join: join.clone(),
                        });
                        id = *right;
                    }
                }
                Node::Recursive { inner } => id = *inner,
                Node::Failure | Node::Epsilon(_) => {
                    unreachable!("derive entered a syntax with an empty FIRST set")
                }
            }
        }
    }

    /// Determine whether ending the input completes the parse. The
    /// value is folded out of a copy of the state so the residual stays
    /// restartable.
    fn finish(&self, focus: Focus, chain: Chain) -> ParseResult<T, A>
    where
        A: Clone + 'static,
    {
        let mut finishing_focus = focus.clone();
        let mut finishing_chain = chain.clone();
        loop {
            match finishing_focus {
                Focus::Done(value) => {
                    return ParseResult::Parsed(unpack::<A>(&value), self.with_state(focus, chain));
                }
                Focus::Node(id) => {
                    let Some(empty) = self.compiled.props.nullable[id.0].clone() else {
                        return ParseResult::UnexpectedEnd(self.with_state(focus, chain));
                    };
                    finishing_focus = match fold(&mut finishing_chain, empty) {
                        Folded::Finished(value) => Focus::Done(value),
                        Folded::Resumed(next) => Focus::Node(next),
                    };
                }
            }
        }
    }

    fn with_state(&self, focus: Focus, chain: Chain) -> Self {
        Self {
            compiled: Arc::clone(&self.compiled),
            focus,
            chain,
            result: PhantomData,
        }
    }
}

impl<T: Token, A> Clone for Parser<T, A> {
    fn clone(&self) -> Self {
        Self {
            compiled: Arc::clone(&self.compiled),
            focus: self.focus.clone(),
            chain: self.chain.clone(),
            result: PhantomData,
        }
    }
}

impl<T: Token, A> fmt::Debug for Parser<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let focus = match &self.focus {
            Focus::Node(id) => format!("syntax {}", id.0),
            Focus::Done(_) => "done".to_owned(),
        };
        f.debug_struct("Parser")
            .field("focus", &focus)
            .field("pending_frames", &self.chain.len())
            .finish()
    }
}
