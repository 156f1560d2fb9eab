//! `compose`: the pure binary algebraic operator that merges two sequential
//! operations sharing a parent chain into one operation with the same
//! net effect.

use crate::error::{OtError, OtResult};
use crate::hash::hash_snapshot;
use crate::op::{chars_from, chars_slice, Component, Op, OpIter};

fn min_u32(a: u32, b: u32) -> u32 {
    if a < b {
        a
    } else {
        b
    }
}

/// Composes `a` then `b`, producing a single operation equivalent to
/// applying both in sequence to the same base state. Inherits `client_id`
/// and `parent` from `a`; `hash` is recomputed from the result's snapshot.
///
/// Fails with `ComposeFailed` if either operand carries a structural or
/// formatting component, or if the two operands' components don't span
/// each other (e.g. `b` tries to skip past content `a` never produced).
pub fn compose(a: &Op, b: &Op) -> OtResult<Op> {
    if a.has_structural_components() || b.has_structural_components() {
        return Err(OtError::ComposeFailed);
    }

    let mut composed = Op::new(a.client_id);
    composed.parent = a.parent;

    let mut ia = OpIter::new(a);
    let mut ib = OpIter::new(b);
    let mut a_more = ia.next();
    let mut b_more = ib.next();

    loop {
        if !a_more {
            if !b_more {
                break;
            }
            let (bc, boff) = ib.current().expect("b_more implies a current component");
            match bc {
                Component::Insert(text) => {
                    let remaining = chars_from(text, boff);
                    let len = remaining.chars().count() as u32;
                    composed.insert(remaining);
                    b_more = ib.skip(len);
                }
                Component::Skip(_) | Component::Delete(_) => return Err(OtError::ComposeFailed),
                Component::OpenElement(_) | Component::CloseElement | Component::FormattingBoundary(_) => {
                    return Err(OtError::ComposeFailed);
                }
            }
            continue;
        }

        let (ac, aoff) = ia.current().expect("a_more implies a current component");

        if let Component::Delete(n) = ac {
            let remaining = n - aoff;
            composed.delete(remaining);
            a_more = ia.skip(remaining);
            continue;
        }

        if !b_more {
            // a has residue that isn't Delete; b can't span it.
            return Err(OtError::ComposeFailed);
        }
        let (bc, boff) = ib.current().expect("b_more implies a current component");

        match (ac, bc) {
            (Component::Skip(an), Component::Skip(bn)) => {
                let m = min_u32(an - aoff, bn - boff);
                composed.skip(m);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Component::Skip(an), Component::Insert(btext)) => {
                let remaining_a = an - aoff;
                let remaining_b = btext.chars().count() as u32 - boff;
                let m = min_u32(remaining_a, remaining_b);
                composed.insert(chars_slice(btext, boff, m));
                b_more = ib.skip(m);
            }
            (Component::Skip(an), Component::Delete(bn)) => {
                let m = min_u32(an - aoff, bn - boff);
                composed.delete(m);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Component::Insert(atext), Component::Skip(bn)) => {
                let remaining_a = atext.chars().count() as u32 - aoff;
                let remaining_b = bn - boff;
                let m = min_u32(remaining_a, remaining_b);
                composed.insert(chars_slice(atext, aoff, m));
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Component::Insert(_atext), Component::Insert(btext)) => {
                let remaining_a = _atext.chars().count() as u32 - aoff;
                let remaining_b = btext.chars().count() as u32 - boff;
                let m = min_u32(remaining_a, remaining_b);
                composed.insert(chars_slice(btext, boff, m));
                b_more = ib.skip(m);
            }
            (Component::Insert(atext), Component::Delete(bn)) => {
                let remaining_a = atext.chars().count() as u32 - aoff;
                let remaining_b = bn - boff;
                let m = min_u32(remaining_a, remaining_b);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Component::Delete(_), _) => unreachable!("Delete(a) handled above"),
            (Component::OpenElement(_), _)
            | (Component::CloseElement, _)
            | (Component::FormattingBoundary(_), _) => {
                return Err(OtError::ComposeFailed);
            }
        }
    }

    composed.hash = hash_snapshot(&composed.snapshot());
    Ok(composed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(client_id: u32) -> Op {
        Op::new(client_id)
    }

    #[test]
    fn compose_two_inserts_on_empty_base() {
        let mut a = op(1);
        a.insert("hello");
        let mut b = op(1);
        b.skip(5).insert(" world");

        let composed = compose(&a, &b).unwrap();
        assert_eq!(composed.snapshot(), "hello world");
        assert_eq!(composed.client_id, 1);
        assert_eq!(composed.parent, a.parent);
    }

    #[test]
    fn compose_insert_then_delete_cancels() {
        let mut a = op(1);
        a.insert("hello");
        let mut b = op(1);
        b.delete(5);

        let composed = compose(&a, &b).unwrap();
        assert_eq!(composed.snapshot(), "");
        assert_eq!(composed.size(), 0);
    }

    #[test]
    fn compose_insert_then_partial_delete() {
        let mut a = op(1);
        a.insert("hello world");
        let mut b = op(1);
        b.skip(6).delete(5);

        let composed = compose(&a, &b).unwrap();
        assert_eq!(composed.snapshot(), "hello ");
    }

    #[test]
    fn compose_skip_delete_on_base() {
        let mut a = op(1);
        a.skip(3).delete(2);
        let mut b = op(1);
        // a's result is 3 positions long (the untouched skip prefix); b must
        // span all of it.
        b.skip(1).insert("X").skip(2);

        let composed = compose(&a, &b).unwrap();
        assert!(matches!(composed.components[0], Component::Skip(1)));
        match &composed.components[1] {
            Component::Insert(s) => assert_eq!(s, "X"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn b_cannot_skip_past_as_content() {
        let mut a = op(1);
        a.insert("hi");
        let mut b = op(1);
        b.skip(5);

        assert_eq!(compose(&a, &b).unwrap_err(), OtError::ComposeFailed);
    }

    #[test]
    fn structural_components_are_rejected() {
        let mut a = op(1);
        a.open_element("p");
        let b = op(1);

        assert_eq!(compose(&a, &b).unwrap_err(), OtError::ComposeFailed);
    }

    #[test]
    fn empty_ops_compose_to_empty() {
        let a = op(1);
        let b = op(1);
        let composed = compose(&a, &b).unwrap();
        assert!(composed.components.is_empty());
    }
}
