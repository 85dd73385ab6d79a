//! Foreign function signatures.
//!
//! A bound function is described by a single string such as
//! `pos(Node, float, float): Node`. That string is the script-visible
//! declaration and, once parsed into a [`Signature`], the schema the bridge
//! dispatches on.
//!
//! # Shape hashing
//!
//! Functions with the same argument list and return type share a *shape*.
//! [`SignatureHash`] identifies a shape deterministically (the name is not
//! part of it), using XXHash64 with position markers so parameter order
//! matters.

use std::fmt;

use xxhash_rust::xxh64::xxh64;

use crate::error::SignatureError;

/// A type as written in a signature or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptType {
    Void,
    Bool,
    Int,
    Float,
    Str,
    /// Accepts any value.
    Any,
    /// A registered opaque type such as `Node`.
    Named(String),
}

impl ScriptType {
    /// Map a type name to a type. Unknown names become [`ScriptType::Named`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "void" => ScriptType::Void,
            "bool" => ScriptType::Bool,
            "int" => ScriptType::Int,
            "float" => ScriptType::Float,
            "str" => ScriptType::Str,
            "any" => ScriptType::Any,
            other => ScriptType::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScriptType::Void => "void",
            ScriptType::Bool => "bool",
            ScriptType::Int => "int",
            ScriptType::Float => "float",
            ScriptType::Str => "str",
            ScriptType::Any => "any",
            ScriptType::Named(name) => name,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, ScriptType::Named(_))
    }

    /// Whether a host value of type `other` may stand where `self` is declared.
    ///
    /// `any` on either side matches everything.
    pub fn accepts(&self, other: &ScriptType) -> bool {
        matches!(self, ScriptType::Any) || matches!(other, ScriptType::Any) || self == other
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod hash_constants {
    pub const SHAPE: u64 = 0x5ea77ffbcdf5f302;
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// Deterministic identity of a signature shape (parameters + return type).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SignatureHash(pub u64);

impl SignatureHash {
    /// Hash a parameter list and return type.
    pub fn from_shape(params: &[ScriptType], ret: &ScriptType) -> Self {
        use hash_constants::*;

        let mut hash = SHAPE ^ xxh64(ret.name().as_bytes(), 0);
        for (i, param) in params.iter().enumerate() {
            let marker = PARAM_MARKERS[i % PARAM_MARKERS.len()].wrapping_add(i as u64);
            hash = hash
                .wrapping_mul(SEP)
                .wrapping_add(marker ^ xxh64(param.name().as_bytes(), 0));
        }
        SignatureHash(hash.wrapping_mul(SEP).wrapping_add(params.len() as u64))
    }
}

impl fmt::Debug for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureHash({:#018x})", self.0)
    }
}

/// A parsed foreign function signature.
///
/// # Example
///
/// ```
/// use tinybridge_core::{ScriptType, Signature};
///
/// let sig = Signature::parse("pos(Node, float, float): Node").unwrap();
/// assert_eq!(sig.name(), "pos");
/// assert_eq!(sig.arity(), 3);
/// assert_eq!(sig.ret(), &ScriptType::Named("Node".into()));
/// assert_eq!(sig.to_string(), "pos(Node, float, float): Node");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    name: String,
    params: Vec<ScriptType>,
    ret: ScriptType,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<ScriptType>, ret: ScriptType) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }

    /// Parse `name(type, ...)[: type]`.
    ///
    /// Parameters may carry a name (`x: float`), which is ignored. A missing
    /// return clause means `void`.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SignatureError::Empty);
        }

        let open = text.find('(').ok_or_else(|| SignatureError::MissingOpenParen {
            signature: text.to_string(),
        })?;
        let name = text[..open].trim();
        if !is_identifier(name) {
            return Err(SignatureError::InvalidName {
                signature: text.to_string(),
            });
        }

        let close = text[open..]
            .find(')')
            .map(|offset| open + offset)
            .ok_or_else(|| SignatureError::MissingCloseParen {
                signature: text.to_string(),
            })?;

        let inner = text[open + 1..close].trim();
        let mut params = Vec::new();
        if !inner.is_empty() {
            for (position, part) in inner.split(',').enumerate() {
                let part = part.trim();
                let type_text = match part.split_once(':') {
                    Some((param_name, ty)) if is_identifier(param_name.trim()) => ty.trim(),
                    Some(_) => {
                        return Err(SignatureError::InvalidType {
                            signature: text.to_string(),
                            name: part.to_string(),
                        });
                    }
                    None => part,
                };
                let ty = parse_type(text, type_text)?;
                if ty == ScriptType::Void {
                    return Err(SignatureError::VoidParameter {
                        signature: text.to_string(),
                        position,
                    });
                }
                params.push(ty);
            }
        }

        let rest = text[close + 1..].trim();
        let ret = if rest.is_empty() {
            ScriptType::Void
        } else {
            let ret_text = rest
                .strip_prefix(':')
                .ok_or_else(|| SignatureError::TrailingInput {
                    signature: text.to_string(),
                    rest: rest.to_string(),
                })?;
            parse_type(text, ret_text.trim())?
        };

        Ok(Self::new(name, params, ret))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ScriptType] {
        &self.params
    }

    pub fn ret(&self) -> &ScriptType {
        &self.ret
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The signature without its name, e.g. `(Node,float,float):Node`.
    pub fn shape(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(ScriptType::name).collect();
        format!("({}):{}", params.join(","), self.ret.name())
    }

    pub fn shape_hash(&self) -> SignatureHash {
        SignatureHash::from_shape(&self.params, &self.ret)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(ScriptType::name).collect();
        write!(f, "{}({}): {}", self.name, params.join(", "), self.ret)
    }
}

fn parse_type(signature: &str, text: &str) -> Result<ScriptType, SignatureError> {
    if is_identifier(text) {
        Ok(ScriptType::from_name(text))
    } else {
        Err(SignatureError::InvalidType {
            signature: signature.to_string(),
            name: text.to_string(),
        })
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
