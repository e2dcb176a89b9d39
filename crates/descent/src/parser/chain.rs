//! The continuation chain.
//!
//! A chain is the work remaining after the currently focused syntax: a
//! stack of frames, each either *reductive* (turns a finished value
//! into the next value) or *redirecting* (switches the focus to another
//! syntax, leaving a reductive frame behind). Folding a value through
//! the chain pops reductive frames until it either runs off the end,
//! finishing the parse, or hits a redirecting frame and resumes at a
//! new focus.

use smallvec::SmallVec;

use crate::syntax::SyntaxId;
use crate::syntax::value::{Apply, Join, Value};

/// One deferred operation.
#[derive(Clone)]
pub(crate) enum Frame {
    /// Transform the incoming value. Reductive.
    Apply { map: Apply },
    /// Pair a previously parsed value with the incoming one. Reductive.
    Prepend { value: Value, join: Join },
    /// Parse `second` next, then pair its result with the incoming
    /// value. Redirecting.
    FollowBy { second: SyntaxId, join: Join },
    /// Append the incoming sequence of values onto a previously parsed
    /// prefix. Reductive.
    PrependAll { prefix: Value, join: Join },
    /// Parse `second` next, then append its results onto the incoming
    /// ones. Redirecting.
    FollowByAll { second: SyntaxId, join: Join },
}

/// The frame stack; the last element is the innermost obligation.
pub(crate) type Chain = SmallVec<[Frame; 4]>;

/// Result of folding a value through a chain.
pub(crate) enum Folded {
    /// Every frame was reductive; the parse is complete.
    Finished(Value),
    /// A redirecting frame switched the focus to this syntax.
    Resumed(SyntaxId),
}

/// Feed `value` through the chain, popping frames until a redirecting
/// frame halts the fold or the chain runs out.
pub(crate) fn fold(chain: &mut Chain, mut value: Value) -> Folded {
    while let Some(frame) = chain.pop() {
        match frame {
            Frame::Apply { map } => value = map(&value),
            Frame::Prepend {
                value: prefix,
                join,
            }
            | Frame::PrependAll { prefix, join } => value = join(&prefix, &value),
            Frame::FollowBy { second, join } => {
                chain.push(Frame::Prepend { value, join });
                return Folded::Resumed(second);
            }
            Frame::FollowByAll { second, join } => {
                chain.push(Frame::PrependAll {
                    prefix: value,
                    join,
                });
                return Folded::Resumed(second);
            }
        }
    }
    Folded::Finished(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::value::{pack, unpack};
    use std::sync::Arc;

    fn pair_join() -> Join {
        Arc::new(|l, r| pack((unpack::<i32>(l), unpack::<i32>(r))))
    }

    #[test]
    fn test_empty_chain_finishes() {
        let mut chain = Chain::new();
        match fold(&mut chain, pack(5_i32)) {
            Folded::Finished(value) => assert_eq!(unpack::<i32>(&value), 5),
            Folded::Resumed(_) => panic!("empty chain cannot redirect"),
        }
    }

    #[test]
    fn test_reductive_frames_run_innermost_first() {
        let mut chain = Chain::new();
        chain.push(Frame::Apply {
            map: Arc::new(|v| pack(unpack::<i32>(v) * 10)),
        });
        chain.push(Frame::Apply {
            map: Arc::new(|v| pack(unpack::<i32>(v) + 1)),
        });
        match fold(&mut chain, pack(2_i32)) {
            // innermost (+1) first, then (*10)
            Folded::Finished(value) => assert_eq!(unpack::<i32>(&value), 30),
            Folded::Resumed(_) => panic!("no redirecting frame present"),
        }
    }

    #[test]
    fn test_follow_by_redirects_and_leaves_prepend() {
        let target = SyntaxId(9);
        let mut chain = Chain::new();
        chain.push(Frame::FollowBy {
            second: target,
            join: pair_join(),
        });
        match fold(&mut chain, pack(1_i32)) {
            Folded::Resumed(id) => assert_eq!(id, target),
            Folded::Finished(_) => panic!("redirecting frame must halt the fold"),
        }
        // The parked value is paired once the second syntax finishes.
        match fold(&mut chain, pack(2_i32)) {
            Folded::Finished(value) => assert_eq!(unpack::<(i32, i32)>(&value), (1, 2)),
            Folded::Resumed(_) => panic!("only the reductive frame remains"),
        }
    }
}
