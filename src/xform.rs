//! `xform`: the pure binary operator that reconciles two concurrent
//! operations sharing a base state into a commuting pair.

use crate::error::{OtError, OtResult};
use crate::op::{chars_from, Component, Op, OpIter};

fn min_u32(a: u32, b: u32) -> u32 {
    if a < b {
        a
    } else {
        b
    }
}

/// Transforms `a` against `b`, both authored against the same parent,
/// into `(a', b')` such that `compose(a, b') == compose(b, a')`.
///
/// Ties between simultaneous inserts resolve in `a`'s favor ("op1 first");
/// callers that need a different tie-break must swap their arguments and
/// the returned pair accordingly.
///
/// Fails with `XformFailed` if `a` and `b` weren't authored against the
/// same base state, if either operand carries a structural or formatting
/// component, or if one side has Skip/Delete residue the other side never
/// accounted for.
pub fn xform(a: &Op, b: &Op) -> OtResult<(Op, Op)> {
    if a.parent != b.parent {
        return Err(OtError::XformFailed);
    }
    if a.has_structural_components() || b.has_structural_components() {
        return Err(OtError::XformFailed);
    }

    let mut a_prime = Op::new(a.client_id);
    a_prime.parent = b.hash;
    let mut b_prime = Op::new(b.client_id);
    b_prime.parent = a.hash;

    let mut ia = OpIter::new(a);
    let mut ib = OpIter::new(b);
    let mut a_more = ia.next();
    let mut b_more = ib.next();

    loop {
        if a_more {
            if let Some((Component::Insert(text), aoff)) = ia.current() {
                let remaining = chars_from(text, aoff);
                let len = remaining.chars().count() as u32;
                a_prime.insert(remaining);
                b_prime.skip(len);
                a_more = ia.skip(len);
                continue;
            }
        }

        if b_more {
            if let Some((Component::Insert(text), boff)) = ib.current() {
                let remaining = chars_from(text, boff);
                let len = remaining.chars().count() as u32;
                a_prime.skip(len);
                b_prime.insert(remaining);
                b_more = ib.skip(len);
                continue;
            }
        }

        match (ia.current(), ib.current()) {
            (None, None) => break,
            (None, Some(_)) | (Some(_), None) => {
                // Residue on one side that isn't an Insert (Insert residue
                // was already consumed above): the two operands don't span
                // the same base length.
                return Err(OtError::XformFailed);
            }
            (Some((Component::Skip(an), aoff)), Some((Component::Skip(bn), boff))) => {
                let m = min_u32(an - aoff, bn - boff);
                a_prime.skip(m);
                b_prime.skip(m);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Some((Component::Skip(an), aoff)), Some((Component::Delete(bn), boff))) => {
                let m = min_u32(an - aoff, bn - boff);
                b_prime.delete(m);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Some((Component::Delete(an), aoff)), Some((Component::Skip(bn), boff))) => {
                let m = min_u32(an - aoff, bn - boff);
                a_prime.delete(m);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Some((Component::Delete(an), aoff)), Some((Component::Delete(bn), boff))) => {
                let m = min_u32(an - aoff, bn - boff);
                a_more = ia.skip(m);
                b_more = ib.skip(m);
            }
            (Some((Component::Insert(_), _)), _) | (_, Some((Component::Insert(_), _))) => {
                unreachable!("Insert residue is consumed before this match")
            }
            (Some((Component::OpenElement(_), _)), _)
            | (Some((Component::CloseElement, _)), _)
            | (Some((Component::FormattingBoundary(_), _)), _)
            | (_, Some((Component::OpenElement(_), _)))
            | (_, Some((Component::CloseElement, _)))
            | (_, Some((Component::FormattingBoundary(_), _))) => return Err(OtError::XformFailed),
        }
    }

    Ok((a_prime, b_prime))
}
