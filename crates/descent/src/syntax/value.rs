//! Type-erased semantic values.
//!
//! The engine moves semantic values between heterogeneously typed
//! frames, so their concrete types are erased to `Arc<dyn Any>`. Every
//! typed constructor in [`crate::syntax`] captures a closure at the one
//! point where the concrete types are statically known, packing and
//! unpacking at that boundary. The invariant maintained by those
//! constructors: the erased value produced by a `Syntax<A>` always
//! downcasts back to `A`.

use std::any::Any;
use std::sync::Arc;

/// A semantic value with its concrete type erased.
pub(crate) type Value = Arc<dyn Any + Send + Sync>;

/// Erased transformation, applied by `Transform` nodes and by `Apply`
/// frames on the continuation chain.
pub(crate) type Apply = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Erased combination of two values. Sequences pair their sides,
/// concatenations append them; both capture the concrete types when the
/// node is constructed.
pub(crate) type Join = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

pub(crate) fn pack<A: Send + Sync + 'static>(value: A) -> Value {
    Arc::new(value)
}

/// Recover the concrete type behind an erased value.
///
/// Handles are only handed out together with the node they index, so a
/// failing downcast means a handle was used with a foreign arena.
pub(crate) fn unpack<A: Clone + 'static>(value: &Value) -> A {
    value
        .downcast_ref::<A>()
        .expect("semantic value has an unexpected type; was this syntax built in a different arena?")
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_round_trip() {
        let value = pack(42_i64);
        assert_eq!(unpack::<i64>(&value), 42);
    }

    #[test]
    fn test_join_pairs_values() {
        let join: Join = Arc::new(|l, r| pack((unpack::<u32>(l), unpack::<char>(r))));
        let paired = join(&pack(7_u32), &pack('x'));
        assert_eq!(unpack::<(u32, char)>(&paired), (7, 'x'));
    }

    #[test]
    #[should_panic(expected = "unexpected type")]
    fn test_unpack_wrong_type_panics() {
        let value = pack("text");
        let _: i64 = unpack::<i64>(&value);
    }
}
