//! # Syntax Algebra
//!
//! Syntax descriptions and the arena that owns them.
//!
//! ## Overview
//!
//! A syntax is built from a small closed algebra of combinators:
//!
//! - **Primitives**: `failure`, `epsilon`, `elem`, `accept`
//! - **Combinators**: `or`, `seq`, `concat`, `map`, `recursive`
//! - **Sugar**: `opt`, `many`, `many1` (expressed on the primitives)
//!
//! All nodes live in a [`SyntaxArena`]; a [`Syntax<A>`] handle is a
//! plain index tagged with the result type `A`. Recursion is expressed
//! by index rather than by back-pointer, which keeps the graph acyclic
//! for structural traversals and gives every recursion point a stable
//! identity (the grammar extractor keys on it).
//!
//! ## Usage
//!
//! ```rust
//! use descent::{SyntaxArena, Token};
//! use std::fmt;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! enum Paren {
//!     Open,
//!     Close,
//! }
//!
//! impl fmt::Display for Paren {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str(match self {
//!             Paren::Open => "(",
//!             Paren::Close => ")",
//!         })
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! struct Tok(Paren);
//!
//! impl Token for Tok {
//!     type Kind = Paren;
//!     fn kind(&self) -> Paren {
//!         self.0
//!     }
//! }
//!
//! // P = '(' P ')' | ε
//! let mut arena = SyntaxArena::<Tok>::new();
//! let nested = arena.recursive(|arena, inner| {
//!     let open = arena.elem(Paren::Open);
//!     let close = arena.elem(Paren::Close);
//!     let body = arena.seq(open, inner);
//!     let body = arena.seq(body, close);
//!     let some = arena.map(body, |_| ());
//!     let none = arena.epsilon(());
//!     arena.or(some, none)
//! });
//! # let _ = nested;
//! ```

pub(crate) mod analysis;
pub(crate) mod value;

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::syntax::value::{Apply, Join, Value, pack, unpack};

/// Trait for token kind identifiers.
///
/// Kinds classify tokens into the finite alphabet over which FIRST sets
/// are computed and terminals are matched. Any copyable, hashable,
/// orderable type with a display form qualifies; the blanket impl means
/// a plain `enum` with the usual derives and a `Display` impl is enough.
pub trait TokenKind:
    Copy + fmt::Debug + fmt::Display + Eq + Ord + Hash + Send + Sync + 'static
{
}

impl<K> TokenKind for K where
    K: Copy + fmt::Debug + fmt::Display + Eq + Ord + Hash + Send + Sync + 'static
{
}

/// Trait for token types.
///
/// The engine never inspects tokens beyond their kind; [`kind`] is the
/// host-supplied classification function.
///
/// [`kind`]: Token::kind
pub trait Token: Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind type used as the matching alphabet.
    type Kind: TokenKind;

    /// Classify this token.
    fn kind(&self) -> Self::Kind;
}

/// Index of a node inside a [`SyntaxArena`].
///
/// Identity of a syntax is its index; two handles with the same id
/// denote the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SyntaxId(pub(crate) usize);

/// A typed handle to a syntax producing values of type `A`.
///
/// Handles are cheap indexes; copying one does not copy the syntax.
/// They are only meaningful together with the arena that created them.
pub struct Syntax<A> {
    pub(crate) id: SyntaxId,
    result: PhantomData<fn() -> A>,
}

impl<A> Syntax<A> {
    pub(crate) const fn new(id: SyntaxId) -> Self {
        Self {
            id,
            result: PhantomData,
        }
    }
}

impl<A> Clone for Syntax<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Syntax<A> {}

impl<A> fmt::Debug for Syntax<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Syntax").field(&self.id.0).finish()
    }
}

/// One node of the syntax graph.
///
/// `Sequence` and `Concat` carry the join closure captured when the
/// node was constructed; it is the only place where the concrete result
/// types of the two sides are known, so it is also where erased values
/// get paired (or appended) back into a typed value.
pub(crate) enum Node<T: Token> {
    Failure,
    Epsilon(Value),
    Elem(T::Kind),
    Disjunction {
        left: SyntaxId,
        right: SyntaxId,
    },
    Sequence {
        left: SyntaxId,
        right: SyntaxId,
        join: Join,
    },
    Concat {
        left: SyntaxId,
        right: SyntaxId,
        join: Join,
    },
    Transform {
        inner: SyntaxId,
        map: Apply,
    },
    Recursive {
        inner: SyntaxId,
    },
}

impl<T: Token> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Failure => Self::Failure,
            Self::Epsilon(value) => Self::Epsilon(value.clone()),
            Self::Elem(kind) => Self::Elem(*kind),
            Self::Disjunction { left, right } => Self::Disjunction {
                left: *left,
                right: *right,
            },
            Self::Sequence { left, right, join } => Self::Sequence {
                left: *left,
                right: *right,
                join: join.clone(),
            },
            Self::Concat { left, right, join } => Self::Concat {
                left: *left,
                right: *right,
                join: join.clone(),
            },
            Self::Transform { inner, map } => Self::Transform {
                inner: *inner,
                map: map.clone(),
            },
            Self::Recursive { inner } => Self::Recursive { inner: *inner },
        }
    }
}

/// Arena owning a graph of syntax nodes.
///
/// Construction mutates the arena; once a [`Parser`](crate::parser::Parser)
/// has been built from it, the compiled copy is immutable and freely
/// shareable across threads.
pub struct SyntaxArena<T: Token> {
    pub(crate) nodes: Vec<Node<T>>,
}

impl<T: Token> Default for SyntaxArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Token> SyntaxArena<T> {
    /// Create an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of nodes currently in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node<T>) -> SyntaxId {
        let id = SyntaxId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// The syntax that matches nothing, not even the empty input.
    #[must_use]
    pub fn failure<A>(&mut self) -> Syntax<A> {
        Syntax::new(self.push(Node::Failure))
    }

    /// The syntax that matches exactly the empty input, producing
    /// `value`.
    #[must_use]
    pub fn epsilon<A>(&mut self, value: A) -> Syntax<A>
    where
        A: Send + Sync + 'static,
    {
        Syntax::new(self.push(Node::Epsilon(pack(value))))
    }

    /// The syntax that matches a single token of the given kind,
    /// producing the token itself.
    #[must_use]
    pub fn elem(&mut self, kind: T::Kind) -> Syntax<T> {
        Syntax::new(self.push(Node::Elem(kind)))
    }

    /// Match a single token of the given kind and transform it.
    ///
    /// Shorthand for `map` over `elem`.
    #[must_use]
    pub fn accept<A, F>(&mut self, kind: T::Kind, f: F) -> Syntax<A>
    where
        A: Send + Sync + 'static,
        F: Fn(T) -> A + Send + Sync + 'static,
    {
        let token = self.elem(kind);
        self.map(token, f)
    }

    /// Either `left` or `right`.
    ///
    /// For the result to be parseable the branches must have disjoint
    /// FIRST sets and at most one may accept the empty input; where the
    /// check is conservative, the left branch wins.
    #[must_use]
    pub fn or<A>(&mut self, left: Syntax<A>, right: Syntax<A>) -> Syntax<A> {
        Syntax::new(self.push(Node::Disjunction {
            left: left.id,
            right: right.id,
        }))
    }

    /// `left` followed by `right`, producing the pair of both results.
    #[must_use]
    pub fn seq<A, B>(&mut self, left: Syntax<A>, right: Syntax<B>) -> Syntax<(A, B)>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
    {
        let join: Join = Arc::new(|l, r| pack((unpack::<A>(l), unpack::<B>(r))));
        Syntax::new(self.push(Node::Sequence {
            left: left.id,
            right: right.id,
            join,
        }))
    }

    /// `left` followed by `right`, appending the two sequences of
    /// results into one.
    #[must_use]
    pub fn concat<E>(&mut self, left: Syntax<Vec<E>>, right: Syntax<Vec<E>>) -> Syntax<Vec<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        let join: Join = Arc::new(|l, r| {
            let mut out = unpack::<Vec<E>>(l);
            out.extend(unpack::<Vec<E>>(r));
            pack(out)
        });
        Syntax::new(self.push(Node::Concat {
            left: left.id,
            right: right.id,
            join,
        }))
    }

    /// Transform the result of `inner` with `f`.
    ///
    /// `f` must be deterministic and side-effect free; it may run more
    /// than once for a single parse (nullability extraction reuses it).
    #[must_use]
    pub fn map<A, B, F>(&mut self, inner: Syntax<A>, f: F) -> Syntax<B>
    where
        A: Clone + Send + Sync + 'static,
        B: Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let map: Apply = Arc::new(move |v| pack(f(unpack::<A>(v))));
        Syntax::new(self.push(Node::Transform {
            inner: inner.id,
            map,
        }))
    }

    /// A syntax that may refer to itself.
    ///
    /// The closure receives the handle of the recursion point and
    /// returns its body; the body is materialized exactly once. The
    /// recursion point has its own identity, so every reference to the
    /// returned handle denotes the same non-terminal in an extracted
    /// grammar.
    #[must_use]
    pub fn recursive<A, F>(&mut self, f: F) -> Syntax<A>
    where
        F: FnOnce(&mut Self, Syntax<A>) -> Syntax<A>,
    {
        // Placeholder until the body exists; nothing reads the node
        // while the closure still holds the only &mut access.
        let id = self.push(Node::Failure);
        let handle = Syntax::new(id);
        let body = f(self, handle);
        self.nodes[id.0] = Node::Recursive { inner: body.id };
        handle
    }

    /// Zero or one occurrence of `inner`.
    #[must_use]
    pub fn opt<A>(&mut self, inner: Syntax<A>) -> Syntax<Option<A>>
    where
        A: Clone + Send + Sync + 'static,
    {
        let some = self.map(inner, Some);
        let none = self.epsilon(None);
        self.or(some, none)
    }

    /// Zero or more occurrences of `item`, collected in order.
    ///
    /// `item` must not accept the empty input, otherwise the repetition
    /// is rejected as ambiguous when a parser is built.
    #[must_use]
    pub fn many<A>(&mut self, item: Syntax<A>) -> Syntax<Vec<A>>
    where
        A: Clone + Send + Sync + 'static,
    {
        self.recursive(|arena, rest| {
            let head = arena.map(item, |a| vec![a]);
            let step = arena.concat(head, rest);
            let empty = arena.epsilon(Vec::new());
            arena.or(step, empty)
        })
    }

    /// One or more occurrences of `item`, collected in order.
    #[must_use]
    pub fn many1<A>(&mut self, item: Syntax<A>) -> Syntax<Vec<A>>
    where
        A: Clone + Send + Sync + 'static,
    {
        let head = self.map(item, |a| vec![a]);
        let rest = self.many(item);
        self.concat(head, rest)
    }

    /// Extract the BNF view of the syntax rooted at `root`.
    ///
    /// See [`crate::grammar`] for the shape of the result.
    #[must_use]
    pub fn grammar_of<A>(&self, root: Syntax<A>) -> crate::grammar::Grammar<T::Kind> {
        crate::grammar::extract::extract(self, root.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum TestKind {
        A,
        B,
    }

    impl fmt::Display for TestKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::A => f.write_str("a"),
                Self::B => f.write_str("b"),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TestToken(TestKind);

    impl Token for TestToken {
        type Kind = TestKind;
        fn kind(&self) -> TestKind {
            self.0
        }
    }

    #[test]
    fn test_handles_are_indices() {
        let mut arena = SyntaxArena::<TestToken>::new();
        let a = arena.elem(TestKind::A);
        let b = arena.elem(TestKind::B);
        assert_ne!(a.id, b.id);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_recursive_materializes_body_once() {
        let mut arena = SyntaxArena::<TestToken>::new();
        let before = arena.len();
        let handle = arena.recursive(|arena, inner| {
            let a = arena.elem(TestKind::A);
            let step = arena.seq(a, inner);
            let step = arena.map(step, |_| ());
            let stop = arena.epsilon(());
            arena.or(step, stop)
        });
        assert!(arena.len() > before);
        match &arena.nodes[handle.id.0] {
            Node::Recursive { inner } => assert_ne!(*inner, handle.id),
            _ => panic!("recursion point should be a Recursive node"),
        }
    }

    #[test]
    fn test_recursive_self_reference_is_allowed() {
        let mut arena = SyntaxArena::<TestToken>::new();
        let handle: Syntax<()> = arena.recursive(|_, inner| inner);
        match &arena.nodes[handle.id.0] {
            Node::Recursive { inner } => assert_eq!(*inner, handle.id),
            _ => panic!("recursion point should be a Recursive node"),
        }
    }
}
