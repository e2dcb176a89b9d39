//! Nullability and FIRST-set analysis.
//!
//! Both properties are least fixed points over the syntax graph:
//! nullability moves `None -> Some` at most once per node and FIRST
//! sets only ever grow, so iterating until nothing changes terminates
//! (finite node count, finite kind alphabet).
//!
//! Validation runs over the same results: every disjunction reachable
//! from the parse root must have disjoint FIRST sets and at most one
//! nullable branch, and no syntax may reach itself without consuming a
//! token.

use hashbrown::HashSet;

use crate::error::GrammarError;
use crate::syntax::value::Value;
use crate::syntax::{Node, SyntaxArena, SyntaxId, Token, TokenKind};

/// Precomputed per-node properties, indexed by [`SyntaxId`].
pub(crate) struct Properties<K: TokenKind> {
    /// `Some(v)` iff the node accepts the empty input, yielding `v`.
    pub(crate) nullable: Vec<Option<Value>>,
    /// Kinds that can begin a non-empty match of the node.
    pub(crate) first: Vec<HashSet<K, ahash::RandomState>>,
}

impl<K: TokenKind> Properties<K> {
    /// Compute both properties for every node of the arena.
    pub(crate) fn compute<T>(arena: &SyntaxArena<T>) -> Self
    where
        T: Token<Kind = K>,
    {
        let count = arena.nodes.len();
        let mut nullable: Vec<Option<Value>> = vec![None; count];
        let mut first: Vec<HashSet<K, ahash::RandomState>> = (0..count)
            .map(|_| HashSet::with_hasher(ahash::RandomState::new()))
            .collect();

        // Reused buffer; additions cannot be inserted while the sets of
        // the children are still borrowed.
        let mut additions: Vec<K> = Vec::new();

        let mut changed = true;
        while changed {
            changed = false;

            for (index, node) in arena.nodes.iter().enumerate() {
                if nullable[index].is_none() {
                    let candidate = match node {
                        Node::Failure | Node::Elem(_) => None,
                        Node::Epsilon(value) => Some(value.clone()),
                        // Left bias: when both branches turn out to be
                        // nullable the syntax is rejected by validation,
                        // so the preference only resolves transients.
                        Node::Disjunction { left, right } => nullable[left.0]
                            .clone()
                            .or_else(|| nullable[right.0].clone()),
                        Node::Sequence { left, right, join }
                        | Node::Concat { left, right, join } => {
                            match (&nullable[left.0], &nullable[right.0]) {
                                (Some(l), Some(r)) => Some(join(l, r)),
                                _ => None,
                            }
                        }
                        Node::Transform { inner, map } => {
                            nullable[inner.0].as_ref().map(|v| map(v))
                        }
                        Node::Recursive { inner } => nullable[inner.0].clone(),
                    };
                    if candidate.is_some() {
                        nullable[index] = candidate;
                        changed = true;
                    }
                }

                additions.clear();
                match node {
                    Node::Failure | Node::Epsilon(_) => {}
                    Node::Elem(kind) => additions.push(*kind),
                    Node::Disjunction { left, right } => {
                        additions.extend(first[left.0].iter().copied());
                        additions.extend(first[right.0].iter().copied());
                    }
                    Node::Sequence { left, right, .. } | Node::Concat { left, right, .. } => {
                        additions.extend(first[left.0].iter().copied());
                        if nullable[left.0].is_some() {
                            additions.extend(first[right.0].iter().copied());
                        }
                    }
                    Node::Transform { inner, .. } | Node::Recursive { inner } => {
                        additions.extend(first[inner.0].iter().copied());
                    }
                }
                let before = first[index].len();
                first[index].extend(additions.iter().copied());
                if first[index].len() > before {
                    changed = true;
                }
            }
        }

        Self { nullable, first }
    }

    /// Check the LL(1) invariants for everything reachable from `root`.
    ///
    /// # Errors
    ///
    /// Returns the first structural defect found: a FIRST/FIRST
    /// conflict, a disjunction with two nullable branches, or a
    /// left-recursive cycle.
    pub(crate) fn validate<T>(
        &self,
        arena: &SyntaxArena<T>,
        root: SyntaxId,
    ) -> Result<(), GrammarError<K>>
    where
        T: Token<Kind = K>,
    {
        let reachable = reachable_from(arena, root);

        for (index, node) in arena.nodes.iter().enumerate() {
            if !reachable[index] {
                continue;
            }
            if let Node::Disjunction { left, right } = node {
                let mut overlap: Vec<K> = self.first[left.0]
                    .intersection(&self.first[right.0])
                    .copied()
                    .collect();
                if !overlap.is_empty() {
                    overlap.sort_unstable();
                    return Err(GrammarError::FirstFirstConflict { kinds: overlap });
                }
                if self.nullable[left.0].is_some() && self.nullable[right.0].is_some() {
                    return Err(GrammarError::BothNullable);
                }
            }
        }

        // Seed the search from every reachable node, not just the
        // root: a cycle may sit entirely behind a consumed token (the
        // right side of a sequence with a non-nullable left). The
        // shared color array keeps the whole sweep linear.
        let mut colors = vec![Color::White; arena.nodes.len()];
        for index in 0..arena.nodes.len() {
            if reachable[index] && self.has_left_cycle(arena, SyntaxId(index), &mut colors) {
                return Err(GrammarError::LeftRecursion);
            }
        }

        Ok(())
    }

    /// Children a derivation can descend into without consuming a
    /// token first. A cycle over these edges means `derive` would
    /// never terminate.
    fn first_position_edges<T>(&self, node: &Node<T>) -> (Option<SyntaxId>, Option<SyntaxId>)
    where
        T: Token<Kind = K>,
    {
        match node {
            Node::Failure | Node::Epsilon(_) | Node::Elem(_) => (None, None),
            Node::Disjunction { left, right } => (Some(*left), Some(*right)),
            Node::Sequence { left, right, .. } | Node::Concat { left, right, .. } => {
                if self.nullable[left.0].is_some() {
                    (Some(*left), Some(*right))
                } else {
                    (Some(*left), None)
                }
            }
            Node::Transform { inner, .. } | Node::Recursive { inner } => (Some(*inner), None),
        }
    }

    fn has_left_cycle<T>(
        &self,
        arena: &SyntaxArena<T>,
        id: SyntaxId,
        colors: &mut [Color],
    ) -> bool
    where
        T: Token<Kind = K>,
    {
        match colors[id.0] {
            Color::Gray => return true,
            Color::Black => return false,
            Color::White => {}
        }
        colors[id.0] = Color::Gray;
        let (first, second) = self.first_position_edges(&arena.nodes[id.0]);
        for child in [first, second].into_iter().flatten() {
            if self.has_left_cycle(arena, child, colors) {
                return true;
            }
        }
        colors[id.0] = Color::Black;
        false
    }
}

#[derive(Clone, Copy)]
enum Color {
    White,
    Gray,
    Black,
}

/// Mark every node reachable from `root` through any child edge.
///
/// An arena may hold discarded subgraphs that never became part of the
/// parsed syntax; those are not validated.
fn reachable_from<T: Token>(arena: &SyntaxArena<T>, root: SyntaxId) -> Vec<bool> {
    let mut reachable = vec![false; arena.nodes.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if reachable[id.0] {
            continue;
        }
        reachable[id.0] = true;
        match &arena.nodes[id.0] {
            Node::Failure | Node::Epsilon(_) | Node::Elem(_) => {}
            Node::Disjunction { left, right }
            | Node::Sequence { left, right, .. }
            | Node::Concat { left, right, .. } => {
                stack.push(*left);
                stack.push(*right);
            }
            Node::Transform { inner, .. } | Node::Recursive { inner } => stack.push(*inner),
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Syntax;
    use std::fmt;

    fn nullable_value<T: Token, A: Clone + 'static>(
        arena: &SyntaxArena<T>,
        syntax: Syntax<A>,
    ) -> Option<A> {
        let props = Properties::compute(arena);
        props.nullable[syntax.id.0]
            .as_ref()
            .map(crate::syntax::value::unpack)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Letter {
        A,
        B,
        C,
    }

    impl fmt::Display for Letter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::A => f.write_str("a"),
                Self::B => f.write_str("b"),
                Self::C => f.write_str("c"),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Tok(Letter);

    impl Token for Tok {
        type Kind = Letter;
        fn kind(&self) -> Letter {
            self.0
        }
    }

    fn first_of<T: Token>(arena: &SyntaxArena<T>, id: SyntaxId) -> Vec<T::Kind> {
        let props = Properties::compute(arena);
        let mut kinds: Vec<_> = props.first[id.0].iter().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    #[test]
    fn test_elem_first_and_nullability() {
        let mut arena = SyntaxArena::<Tok>::new();
        let a = arena.elem(Letter::A);
        assert_eq!(first_of(&arena, a.id), vec![Letter::A]);
        assert_eq!(nullable_value::<_, Tok>(&arena, a), None);
    }

    #[test]
    fn test_epsilon_is_nullable() {
        let mut arena = SyntaxArena::<Tok>::new();
        let unit = arena.epsilon(7_i32);
        assert_eq!(first_of(&arena, unit.id), Vec::<Letter>::new());
        assert_eq!(nullable_value(&arena, unit), Some(7));
    }

    #[test]
    fn test_sequence_first_skips_nullable_prefix() {
        let mut arena = SyntaxArena::<Tok>::new();
        let a = arena.elem(Letter::A);
        let maybe_a = arena.opt(a);
        let b = arena.elem(Letter::B);
        let s = arena.seq(maybe_a, b);
        assert_eq!(first_of(&arena, s.id), vec![Letter::A, Letter::B]);
        assert_eq!(nullable_value::<_, (Option<Tok>, Tok)>(&arena, s), None);
    }

    #[test]
    fn test_recursive_fixed_point() {
        // P = 'a' P | ε : nullable, FIRST = {a}
        let mut arena = SyntaxArena::<Tok>::new();
        let p = arena.recursive(|arena, inner| {
            let a = arena.elem(Letter::A);
            let step = arena.seq(a, inner);
            let step = arena.map(step, |(_, n): (Tok, i32)| n + 1);
            let stop = arena.epsilon(0_i32);
            arena.or(step, stop)
        });
        assert_eq!(first_of(&arena, p.id), vec![Letter::A]);
        assert_eq!(nullable_value(&arena, p), Some(0));
    }

    #[test]
    fn test_transform_maps_nullable_value() {
        let mut arena = SyntaxArena::<Tok>::new();
        let unit = arena.epsilon(3_i32);
        let doubled = arena.map(unit, |n| n * 2);
        assert_eq!(nullable_value(&arena, doubled), Some(6));
    }

    #[test]
    fn test_validate_accepts_disjoint_disjunction() {
        let mut arena = SyntaxArena::<Tok>::new();
        let a = arena.elem(Letter::A);
        let b = arena.elem(Letter::B);
        let either = arena.or(a, b);
        let props = Properties::compute(&arena);
        assert!(props.validate(&arena, either.id).is_ok());
    }

    #[test]
    fn test_validate_rejects_first_first_conflict() {
        let mut arena = SyntaxArena::<Tok>::new();
        let a1 = arena.elem(Letter::A);
        let a2 = arena.elem(Letter::A);
        let both = arena.or(a1, a2);
        let props = Properties::compute(&arena);
        assert_eq!(
            props.validate(&arena, both.id),
            Err(GrammarError::FirstFirstConflict {
                kinds: vec![Letter::A]
            })
        );
    }

    #[test]
    fn test_validate_rejects_two_nullable_branches() {
        let mut arena = SyntaxArena::<Tok>::new();
        let one = arena.epsilon(1_i32);
        let two = arena.epsilon(2_i32);
        let both = arena.or(one, two);
        let props = Properties::compute(&arena);
        assert_eq!(
            props.validate(&arena, both.id),
            Err(GrammarError::BothNullable)
        );
    }

    #[test]
    fn test_validate_ignores_unreachable_conflicts() {
        let mut arena = SyntaxArena::<Tok>::new();
        let a1 = arena.elem(Letter::A);
        let a2 = arena.elem(Letter::A);
        let _discarded = arena.or(a1, a2);
        let c = arena.elem(Letter::C);
        let props = Properties::compute(&arena);
        assert!(props.validate(&arena, c.id).is_ok());
    }

    #[test]
    fn test_validate_rejects_left_recursion() {
        // P = P 'a' | ε passes the disjointness checks but deriving it
        // would descend forever.
        let mut arena = SyntaxArena::<Tok>::new();
        let p = arena.recursive(|arena, inner| {
            let a = arena.elem(Letter::A);
            let step = arena.seq(inner, a);
            let step = arena.map(step, |(n, _): (i32, Tok)| n + 1);
            let stop = arena.epsilon(0_i32);
            arena.or(step, stop)
        });
        let props = Properties::compute(&arena);
        assert_eq!(
            props.validate(&arena, p.id),
            Err(GrammarError::LeftRecursion)
        );
    }

    #[test]
    fn test_validate_rejects_left_recursion_behind_a_terminal() {
        // S = 'a' R with R = R 'b' | ε. The cycle is only reachable
        // after 'a' is consumed; the root alone never walks into it.
        let mut arena = SyntaxArena::<Tok>::new();
        let r = arena.recursive(|arena, inner| {
            let b = arena.elem(Letter::B);
            let step = arena.seq(inner, b);
            let step = arena.map(step, |(n, _): (i32, Tok)| n + 1);
            let stop = arena.epsilon(0_i32);
            arena.or(step, stop)
        });
        let a = arena.elem(Letter::A);
        let s = arena.seq(a, r);
        let props = Properties::compute(&arena);
        assert_eq!(
            props.validate(&arena, s.id),
            Err(GrammarError::LeftRecursion)
        );
    }
}
