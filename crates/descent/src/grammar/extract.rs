//! Grammar extraction.
//!
//! Walks a syntax graph from a root and produces a finite set of BNF
//! rules. Non-terminals are keyed by node *identity* (arena index), not
//! by structure: a recursion point referenced twice yields one rule,
//! and cyclic graphs terminate because every node is enqueued at most
//! once.
//!
//! Rule discovery:
//!
//! - The rule body of a node flattens its top-level disjunction tree
//!   into a list of alternatives (transforms are transparent).
//! - A disjunction met *below* the top of a rule becomes a reference to
//!   a fresh non-terminal, enqueued for later emission.
//! - A recursion point always denotes the non-terminal of its inner
//!   syntax, so the same body reached directly or through the recursion
//!   handle names the same rule.
//! - `failure` contributes no alternative; a rule consisting only of
//!   `failure` is emitted with an empty body (it is unreachable).

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::grammar::{Grammar, Rule, RuleId, Symbol};
use crate::syntax::{Node, SyntaxArena, SyntaxId, Token};

pub(crate) fn extract<T: Token>(arena: &SyntaxArena<T>, root: SyntaxId) -> Grammar<T::Kind> {
    Extraction::new(arena).run(root)
}

struct Extraction<'a, T: Token> {
    arena: &'a SyntaxArena<T>,
    /// Non-terminal ids, keyed by the identity of the defining node.
    ids: HashMap<SyntaxId, RuleId, ahash::RandomState>,
    worklist: VecDeque<SyntaxId>,
}

impl<'a, T: Token> Extraction<'a, T> {
    fn new(arena: &'a SyntaxArena<T>) -> Self {
        Self {
            arena,
            ids: HashMap::with_hasher(ahash::RandomState::new()),
            worklist: VecDeque::new(),
        }
    }

    fn run(mut self, root: SyntaxId) -> Grammar<T::Kind> {
        self.rule_for(root);
        let mut rules = Vec::new();
        while let Some(node) = self.worklist.pop_front() {
            let id = self.ids[&node];
            let alternatives = self.alternatives(node);
            rules.push(Rule { id, alternatives });
        }
        Grammar { rules }
    }

    /// The non-terminal defined by `id`, assigning a fresh one (and
    /// scheduling its emission) on first sight.
    fn rule_for(&mut self, id: SyntaxId) -> RuleId {
        let target = self.resolve(id);
        if let Some(&existing) = self.ids.get(&target) {
            return existing;
        }
        let fresh = RuleId(self.ids.len());
        self.ids.insert(target, fresh);
        self.worklist.push_back(target);
        fresh
    }

    /// A recursion point denotes the non-terminal of its inner syntax.
    fn resolve(&self, mut id: SyntaxId) -> SyntaxId {
        // Bounded walk: recursion handles can only form chains as long
        // as the arena, and a degenerate cycle falls out unchanged.
        for _ in 0..self.arena.nodes.len() {
            match &self.arena.nodes[id.0] {
                Node::Recursive { inner } if *inner != id => id = *inner,
                _ => break,
            }
        }
        id
    }

    /// Flatten the disjunction tree at the top of a rule body.
    fn alternatives(&mut self, id: SyntaxId) -> Vec<Vec<Symbol<T::Kind>>> {
        match &self.arena.nodes[id.0] {
            Node::Disjunction { left, right } => {
                let (left, right) = (*left, *right);
                let mut alternatives = self.alternatives(left);
                alternatives.extend(self.alternatives(right));
                alternatives
            }
            Node::Transform { inner, .. } => {
                let inner = *inner;
                self.alternatives(inner)
            }
            Node::Failure => Vec::new(),
            _ => vec![self.symbols(id)],
        }
    }

    fn symbols(&mut self, id: SyntaxId) -> Vec<Symbol<T::Kind>> {
        let mut out = Vec::new();
        self.emit(id, &mut out);
        out
    }

    /// Emit the symbols of one alternative, left to right.
    fn emit(&mut self, id: SyntaxId, out: &mut Vec<Symbol<T::Kind>>) {
        match &self.arena.nodes[id.0] {
            Node::Failure => {}
            Node::Epsilon(_) => out.push(Symbol::Epsilon),
            Node::Elem(kind) => out.push(Symbol::Terminal(*kind)),
            Node::Transform { inner, .. } => {
                let inner = *inner;
                self.emit(inner, out);
            }
            Node::Sequence { left, right, .. } | Node::Concat { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.emit(left, out);
                self.emit(right, out);
            }
            Node::Disjunction { .. } | Node::Recursive { .. } => {
                let rule = self.rule_for(id);
                out.push(Symbol::NonTerminal(rule));
            }
        }
    }
}
