//! JSON wire format.
//!
//! Operations are encoded as `{"clientId", "parent", "hash", "components"}`
//! with each component tagged by a `"type"` string. Hashes are hex strings
//! with leading-zero *bytes* elided (not nibbles) — the all-zero hash
//! always encodes as the two characters `"00"`, since the last byte is
//! never elided.

use serde::{Deserialize, Serialize};
use serde_json::{self, Value};

use crate::error::{OtError, OtResult};
use crate::hash::{Hash, ZERO_HASH};
use crate::op::{Component, FmtPair, FormattingBoundary, Op};

/// Encodes a 20-byte hash as hex, eliding leading zero bytes but always
/// keeping at least the final byte (so the zero hash encodes as `"00"`).
pub fn encode_hash(hash: &Hash) -> String {
    let first_nonzero = hash.iter().position(|&b| b != 0).unwrap_or(hash.len() - 1);
    let mut out = String::with_capacity((hash.len() - first_nonzero) * 2);
    for &b in &hash[first_nonzero..] {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Decodes a hex string into a 20-byte hash, right-aligning short input so
/// eliding leading zero bytes on encode round-trips cleanly.
pub fn decode_hash(hex: &str) -> OtResult<Hash> {
    if hex.len() % 2 != 0 {
        return Err(OtError::InvalidJson);
    }
    let mut out = ZERO_HASH;
    let nbytes = hex.len() / 2;
    if nbytes > out.len() {
        return Err(OtError::InvalidJson);
    }
    let start = out.len() - nbytes;
    for i in 0..nbytes {
        let byte_str = &hex[i * 2..i * 2 + 2];
        out[start + i] = u8::from_str_radix(byte_str, 16).map_err(|_| OtError::InvalidJson)?;
    }
    Ok(out)
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireComponent {
    #[serde(rename = "skip")]
    Skip { count: u32 },
    #[serde(rename = "insert")]
    Insert { text: String },
    #[serde(rename = "delete")]
    Delete { count: u32 },
    #[serde(rename = "openElement")]
    OpenElement { element: String },
    #[serde(rename = "closeElement")]
    CloseElement,
    #[serde(rename = "formattingBoundary")]
    FormattingBoundary {
        #[serde(default)]
        starts: Vec<WireFmtPair>,
        #[serde(default)]
        ends: Vec<WireFmtPair>,
    },
}

#[derive(Serialize, Deserialize)]
struct WireFmtPair {
    name: String,
    value: String,
}

impl From<&Component> for WireComponent {
    fn from(c: &Component) -> Self {
        match c {
            Component::Skip(count) => WireComponent::Skip { count: *count },
            Component::Insert(text) => WireComponent::Insert { text: text.clone() },
            Component::Delete(count) => WireComponent::Delete { count: *count },
            Component::OpenElement(name) => WireComponent::OpenElement { element: name.clone() },
            Component::CloseElement => WireComponent::CloseElement,
            Component::FormattingBoundary(b) => WireComponent::FormattingBoundary {
                starts: b.starts.iter().map(|p| WireFmtPair { name: p.name.clone(), value: p.value.clone() }).collect(),
                ends: b.ends.iter().map(|p| WireFmtPair { name: p.name.clone(), value: p.value.clone() }).collect(),
            },
        }
    }
}

impl From<WireComponent> for Component {
    fn from(c: WireComponent) -> Self {
        match c {
            WireComponent::Skip { count } => Component::Skip(count),
            WireComponent::Insert { text } => Component::Insert(text),
            WireComponent::Delete { count } => Component::Delete(count),
            WireComponent::OpenElement { element } => Component::OpenElement(element),
            WireComponent::CloseElement => Component::CloseElement,
            WireComponent::FormattingBoundary { starts, ends } => {
                Component::FormattingBoundary(FormattingBoundary {
                    starts: starts.into_iter().map(|p| FmtPair { name: p.name, value: p.value }).collect(),
                    ends: ends.into_iter().map(|p| FmtPair { name: p.name, value: p.value }).collect(),
                })
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireOp {
    #[serde(rename = "clientId")]
    client_id: u32,
    parent: String,
    hash: String,
    components: Vec<WireComponent>,
}

#[derive(Serialize, Deserialize)]
struct WireError {
    #[serde(rename = "errorCode")]
    error_code: i32,
}

impl From<&Op> for WireOp {
    fn from(op: &Op) -> Self {
        WireOp {
            client_id: op.client_id,
            parent: encode_hash(&op.parent),
            hash: encode_hash(&op.hash),
            components: op.components.iter().map(WireComponent::from).collect(),
        }
    }
}

fn decode_component(item: &Value) -> OtResult<Component> {
    let ty = item.get("type").and_then(Value::as_str).ok_or(OtError::InvalidComponent)?;
    let field_u32 = |name: &str| -> OtResult<u32> {
        item.get(name).and_then(Value::as_u64).map(|n| n as u32).ok_or(OtError::InvalidComponent)
    };
    let field_str = |name: &str| -> OtResult<String> {
        item.get(name).and_then(Value::as_str).map(str::to_string).ok_or(OtError::InvalidComponent)
    };
    Ok(match ty {
        "skip" => Component::Skip(field_u32("count")?),
        "insert" => Component::Insert(field_str("text")?),
        "delete" => Component::Delete(field_u32("count")?),
        "openElement" => Component::OpenElement(field_str("element")?),
        "closeElement" => Component::CloseElement,
        "formattingBoundary" => {
            let pairs = |name: &str| -> OtResult<Vec<FmtPair>> {
                match item.get(name) {
                    None => Ok(Vec::new()),
                    Some(Value::Array(arr)) => arr
                        .iter()
                        .map(|p| {
                            Ok(FmtPair {
                                name: p.get("name").and_then(Value::as_str).ok_or(OtError::InvalidComponent)?.to_string(),
                                value: p.get("value").and_then(Value::as_str).ok_or(OtError::InvalidComponent)?.to_string(),
                            })
                        })
                        .collect(),
                    Some(_) => Err(OtError::InvalidComponent),
                }
            };
            Component::FormattingBoundary(FormattingBoundary {
                starts: pairs("starts")?,
                ends: pairs("ends")?,
            })
        }
        _ => return Err(OtError::InvalidComponent),
    })
}

/// Feeds a freshly decoded `Component` through `Op`'s coalescing builders
/// instead of pushing it directly, so a peer that sent a zero-count skip/
/// delete, an empty insert, or adjacent same-kind runs can't produce a
/// non-canonical op that violates the §3 coalescing invariant (and, for
/// `Skip`/`Delete`, can't hand `compose`/`xform` a zero-overlap step that
/// never advances their cursors).
fn push_decoded_component(op: &mut Op, c: Component) {
    match c {
        Component::Skip(n) => {
            op.skip(n);
        }
        Component::Insert(text) => {
            op.insert(&text);
        }
        Component::Delete(n) => {
            op.delete(n);
        }
        Component::OpenElement(name) => {
            op.open_element(&name);
        }
        Component::CloseElement => {
            op.close_element();
        }
        Component::FormattingBoundary(b) => {
            for pair in b.starts {
                op.start_fmt(&pair.name, &pair.value);
            }
            for pair in b.ends {
                op.end_fmt(&pair.name, &pair.value);
            }
        }
    }
}

/// Decodes a single JSON value into an `Op`, using a field-by-field error
/// taxonomy: an `errorCode` field takes priority over everything else, then
/// each of `clientId`/`parent`/`hash`/`components` is checked for presence
/// in that order.
fn decode_value_op(v: &Value) -> OtResult<Op> {
    if let Some(code) = v.get("errorCode").and_then(Value::as_i64) {
        return Err(OtError::from_code(code as i32).unwrap_or(OtError::InvalidJson));
    }

    let client_id = v.get("clientId").and_then(Value::as_u64).ok_or(OtError::ClientIdMissing)? as u32;

    let parent_hex = v.get("parent").and_then(Value::as_str).ok_or(OtError::ParentMissing)?;
    let parent = decode_hash(parent_hex)?;

    let hash_hex = v.get("hash").and_then(Value::as_str).ok_or(OtError::HashMissing)?;
    let hash = decode_hash(hash_hex)?;

    let components_json = v.get("components").and_then(Value::as_array).ok_or(OtError::ComponentsMissing)?;
    let mut op = Op::new(client_id);
    op.parent = parent;
    op.hash = hash;
    for item in components_json {
        push_decoded_component(&mut op, decode_component(item)?);
    }

    Ok(op)
}

/// Encodes and decodes operations and documents to/from the wire JSON
/// representation.
pub trait Codec {
    fn encode_op(&self, op: &Op) -> String;
    fn encode_ops(&self, ops: &[Op]) -> String;
    fn encode_err(&self, err: OtError) -> String;
    fn decode_op(&self, json: &str) -> OtResult<Op>;
    fn decode_ops(&self, json: &str) -> OtResult<Vec<Op>>;
}

/// The production codec, backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_op(&self, op: &Op) -> String {
        serde_json::to_string(&WireOp::from(op)).expect("WireOp serialization cannot fail")
    }

    fn encode_ops(&self, ops: &[Op]) -> String {
        let wire: Vec<WireOp> = ops.iter().map(WireOp::from).collect();
        serde_json::to_string(&wire).expect("WireOp serialization cannot fail")
    }

    fn encode_err(&self, err: OtError) -> String {
        serde_json::to_string(&WireError { error_code: err.code() }).expect("WireError serialization cannot fail")
    }

    fn decode_op(&self, json: &str) -> OtResult<Op> {
        let value: Value = serde_json::from_str(json).map_err(|_| OtError::InvalidJson)?;
        decode_value_op(&value)
    }

    fn decode_ops(&self, json: &str) -> OtResult<Vec<Op>> {
        let value: Value = serde_json::from_str(json).map_err(|_| OtError::InvalidJson)?;
        let items = value.as_array().ok_or(OtError::InvalidJson)?;
        items.iter().map(decode_value_op).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_encodes_as_00() {
        assert_eq!(encode_hash(&ZERO_HASH), "00");
    }

    #[test]
    fn hash_roundtrips() {
        let mut h = ZERO_HASH;
        h[18] = 0xab;
        h[19] = 0xcd;
        let encoded = encode_hash(&h);
        assert_eq!(encoded, "abcd");
        assert_eq!(decode_hash(&encoded).unwrap(), h);
    }

    #[test]
    fn full_hash_roundtrips() {
        let h: Hash = core::array::from_fn(|i| i as u8);
        let encoded = encode_hash(&h);
        assert_eq!(decode_hash(&encoded).unwrap(), h);
    }

    #[test]
    fn op_roundtrips_through_json() {
        let codec = JsonCodec;
        let mut op = Op::new(7);
        op.skip(2).insert("hi").delete(1);
        op.hash = [1u8; 20];
        let encoded = codec.encode_op(&op);
        let decoded = codec.decode_op(&encoded).unwrap();
        assert_eq!(op, decoded);
        assert_eq!(decoded.hash, op.hash);
    }

    #[test]
    fn missing_client_id_is_reported() {
        let codec = JsonCodec;
        let err = codec.decode_op(r#"{"parent":"00","hash":"00","components":[]}"#).unwrap_err();
        assert_eq!(err, OtError::ClientIdMissing);
    }

    #[test]
    fn missing_components_is_reported() {
        let codec = JsonCodec;
        let err = codec.decode_op(r#"{"clientId":1,"parent":"00","hash":"00"}"#).unwrap_err();
        assert_eq!(err, OtError::ComponentsMissing);
    }

    #[test]
    fn unknown_component_type_is_reported() {
        let codec = JsonCodec;
        let err = codec
            .decode_op(r#"{"clientId":1,"parent":"00","hash":"00","components":[{"type":"bogus"}]}"#)
            .unwrap_err();
        assert_eq!(err, OtError::InvalidComponent);
    }

    #[test]
    fn error_shape_decodes_to_error() {
        let codec = JsonCodec;
        let err = codec.decode_op(r#"{"errorCode":9}"#).unwrap_err();
        assert_eq!(err, OtError::XformFailed);
    }

    #[test]
    fn open_and_close_element_roundtrip_through_json() {
        let codec = JsonCodec;
        let mut op = Op::new(4);
        op.open_element("p").insert("hi").close_element();
        let encoded = codec.encode_op(&op);
        let decoded = codec.decode_op(&encoded).unwrap();
        assert_eq!(op, decoded);
        assert!(matches!(decoded.components[0], Component::OpenElement(ref name) if name == "p"));
        assert!(matches!(decoded.components[2], Component::CloseElement));
    }

    #[test]
    fn formatting_boundary_roundtrips_through_json() {
        let codec = JsonCodec;
        let mut op = Op::new(4);
        op.start_fmt("bold", "true").start_fmt("italic", "true").end_fmt("underline", "true");
        let encoded = codec.encode_op(&op);
        let decoded = codec.decode_op(&encoded).unwrap();
        assert_eq!(op, decoded);
        match &decoded.components[0] {
            Component::FormattingBoundary(b) => {
                assert_eq!(b.starts.len(), 2);
                assert_eq!(b.ends.len(), 1);
            }
            other => panic!("expected a formatting boundary, got {other:?}"),
        }
    }

    #[test]
    fn decode_drops_zero_count_components_from_untrusted_peers() {
        let codec = JsonCodec;
        let json = r#"{"clientId":1,"parent":"00","hash":"00","components":[
            {"type":"skip","count":0},
            {"type":"insert","text":"x"},
            {"type":"delete","count":0},
            {"type":"insert","text":""}
        ]}"#;
        let decoded = codec.decode_op(json).unwrap();
        assert_eq!(decoded.components.len(), 1);
        assert!(matches!(&decoded.components[0], Component::Insert(s) if s == "x"));
    }

    #[test]
    fn decode_coalesces_adjacent_same_kind_runs_from_untrusted_peers() {
        let codec = JsonCodec;
        let json = r#"{"clientId":1,"parent":"00","hash":"00","components":[
            {"type":"skip","count":2},
            {"type":"skip","count":3},
            {"type":"insert","text":"ab"},
            {"type":"insert","text":"cd"}
        ]}"#;
        let decoded = codec.decode_op(json).unwrap();
        assert_eq!(decoded.components.len(), 2);
        assert!(matches!(decoded.components[0], Component::Skip(5)));
        assert!(matches!(&decoded.components[1], Component::Insert(s) if s == "abcd"));
    }

    #[test]
    fn formatting_boundary_roundtrip_preserves_multiset_equality_regardless_of_order() {
        let codec = JsonCodec;
        let mut a = Op::new(4);
        a.start_fmt("bold", "true").start_fmt("italic", "true");

        // A peer that serialized the same boundary with its starts in the
        // opposite order must still decode as an equal op.
        let swapped_order = r#"{"clientId":4,"parent":"00","hash":"00","components":[
            {"type":"formattingBoundary",
             "starts":[{"name":"italic","value":"true"},{"name":"bold","value":"true"}],
             "ends":[]}
        ]}"#;

        let decoded = codec.decode_op(swapped_order).unwrap();
        assert_eq!(a, decoded);
    }
}
