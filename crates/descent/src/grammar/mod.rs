//! # Grammar Model
//!
//! A finite BNF view of a syntax.
//!
//! ## Overview
//!
//! The extractor (see [`SyntaxArena::grammar_of`]) walks a syntax graph
//! and emits one [`Rule`] per discovered non-terminal. Non-terminals
//! come from the identity of recursion points and of disjunctions that
//! occur below the top of a rule; everything else is inlined, so the
//! grammar mirrors the sharing the user actually expressed.
//!
//! Terminals print through the host kind's `Display` impl, quoted:
//!
//! ```text
//! n0 ::= '(' n0 ')' | ε
//! ```
//!
//! [`SyntaxArena::grammar_of`]: crate::syntax::SyntaxArena::grammar_of

pub(crate) mod extract;

use std::fmt;
use std::fmt::Write;

use crate::syntax::TokenKind;

/// Identifier of a non-terminal in an extracted grammar.
///
/// The root of the extraction always has id 0; the rest are numbered
/// in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(usize);

impl RuleId {
    /// Wrap a rule index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of this rule's definition in [`Grammar::rules`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One symbol of an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol<K> {
    /// A terminal, matched by kind.
    Terminal(K),
    /// A reference to another rule.
    NonTerminal(RuleId),
    /// The empty match.
    Epsilon,
}

/// A rule: one non-terminal and its alternatives.
///
/// A rule with no alternatives is unreachable (it came from a `failure`
/// syntax).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<K> {
    /// The non-terminal this rule defines.
    pub id: RuleId,
    /// The alternatives, in source order; each is a sequence of
    /// symbols.
    pub alternatives: Vec<Vec<Symbol<K>>>,
}

/// A finite BNF grammar, one rule per discovered non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar<K> {
    /// Rules ordered by id; `rules[i].id.index() == i`.
    pub rules: Vec<Rule<K>>,
}

impl<K: TokenKind> Grammar<K> {
    /// Render the grammar one rule per line, `N ::= α | β | …`, naming
    /// non-terminals with `naming`.
    #[must_use]
    pub fn pretty(&self, naming: impl Fn(RuleId) -> String) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let _ = write!(out, "{} ::=", naming(rule.id));
            for (position, alternative) in rule.alternatives.iter().enumerate() {
                if position > 0 {
                    out.push_str(" |");
                }
                for symbol in alternative {
                    out.push(' ');
                    match symbol {
                        Symbol::Terminal(kind) => {
                            let _ = write!(out, "'{kind}'");
                        }
                        Symbol::NonTerminal(id) => out.push_str(&naming(*id)),
                        Symbol::Epsilon => out.push('ε'),
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

impl<K: TokenKind> fmt::Display for Grammar<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty(|id| format!("n{}", id.index())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_shapes_rules() {
        let grammar = Grammar {
            rules: vec![
                Rule {
                    id: RuleId(0),
                    alternatives: vec![
                        vec![Symbol::Terminal('a'), Symbol::NonTerminal(RuleId(1))],
                        vec![Symbol::Epsilon],
                    ],
                },
                Rule {
                    id: RuleId(1),
                    alternatives: vec![vec![Symbol::Terminal('b')]],
                },
            ],
        };
        assert_eq!(grammar.to_string(), "n0 ::= 'a' n1 | ε\nn1 ::= 'b'\n");
    }

    #[test]
    fn test_pretty_unreachable_rule() {
        let grammar = Grammar::<char> {
            rules: vec![Rule {
                id: RuleId(0),
                alternatives: vec![],
            }],
        };
        assert_eq!(grammar.to_string(), "n0 ::=\n");
    }

    #[test]
    fn test_pretty_custom_naming() {
        let grammar = Grammar {
            rules: vec![Rule {
                id: RuleId(0),
                alternatives: vec![vec![Symbol::Terminal('x')]],
            }],
        };
        let text = grammar.pretty(|_| "expr".to_owned());
        assert_eq!(text, "expr ::= 'x'\n");
    }
}
