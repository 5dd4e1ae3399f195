//! Descriptor type tags — the closed set of node kinds in a document tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a descriptor node. Every structural decision in the crate
/// (identity key, child fields, schema path) dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    Nsd,
    Vnfd,
    Pnfd,
    ConstituentVnfd,
    ConnectionPoint,
    InternalConnectionPoint,
    Vld,
    InternalVld,
    Vnffgd,
    Rsp,
    Classifier,
    MatchAttributes,
    VldConnectionPointRef,
    RspConnectionPointRef,
    Vdu,
}

impl TypeTag {
    /// Qualified schema path for metadata lookup.
    pub fn schema_path(self) -> &'static str {
        match self {
            TypeTag::Nsd => "nsd:nsd",
            TypeTag::Vnfd => "vnfd:vnfd",
            TypeTag::Pnfd => "pnfd:pnfd",
            TypeTag::ConstituentVnfd => "nsd:constituent-vnfd",
            TypeTag::ConnectionPoint => "vnfd:connection-point",
            TypeTag::InternalConnectionPoint => "vnfd:internal-connection-point",
            TypeTag::Vld => "nsd:vld",
            TypeTag::InternalVld => "vnfd:internal-vld",
            TypeTag::Vnffgd => "nsd:vnffgd",
            TypeTag::Rsp => "nsd:rsp",
            TypeTag::Classifier => "nsd:classifier",
            TypeTag::MatchAttributes => "nsd:match-attributes",
            TypeTag::VldConnectionPointRef => "nsd:vld:vnfd-connection-point-ref",
            TypeTag::RspConnectionPointRef => "nsd:rsp:vnfd-connection-point-ref",
            TypeTag::Vdu => "vnfd:vdu",
        }
    }

    /// Ordered (field name, child tag) pairs for owned list children.
    pub fn child_fields(self) -> &'static [(&'static str, TypeTag)] {
        match self {
            TypeTag::Nsd => &[
                ("constituent-vnfd", TypeTag::ConstituentVnfd),
                ("vld", TypeTag::Vld),
                ("vnffgd", TypeTag::Vnffgd),
            ],
            TypeTag::Vnfd => &[
                ("connection-point", TypeTag::ConnectionPoint),
                ("vdu", TypeTag::Vdu),
                ("internal-vld", TypeTag::InternalVld),
            ],
            TypeTag::Pnfd => &[("connection-point", TypeTag::ConnectionPoint)],
            TypeTag::Vld => &[("vnfd-connection-point-ref", TypeTag::VldConnectionPointRef)],
            TypeTag::Vnffgd => &[("rsp", TypeTag::Rsp), ("classifier", TypeTag::Classifier)],
            TypeTag::Rsp => &[("vnfd-connection-point-ref", TypeTag::RspConnectionPointRef)],
            TypeTag::Classifier => &[("match-attributes", TypeTag::MatchAttributes)],
            TypeTag::Vdu => &[(
                "internal-connection-point",
                TypeTag::InternalConnectionPoint,
            )],
            _ => &[],
        }
    }

    /// Backing array field that holds children of `child` under `self`.
    pub fn list_field_for(self, child: TypeTag) -> Option<&'static str> {
        self.child_fields()
            .iter()
            .find(|(_, tag)| *tag == child)
            .map(|(field, _)| *field)
    }

    /// Extract the logical identity of a fragment of this type.
    ///
    /// Connection-point references have no single id field; their identity
    /// is the (member index, cp name) pair.
    pub fn logical_id(self, fragment: &Value) -> Option<String> {
        match self {
            TypeTag::ConnectionPoint => scalar_string(fragment.get("name")?),
            TypeTag::ConstituentVnfd => scalar_string(fragment.get("member-vnf-index")?),
            TypeTag::VldConnectionPointRef | TypeTag::RspConnectionPointRef => {
                let idx = scalar_string(fragment.get("member-vnf-index-ref")?)?;
                let cp = scalar_string(fragment.get("vnfd-connection-point-ref")?)?;
                Some(format!("{idx}/{cp}"))
            }
            _ => scalar_string(fragment.get("id")?),
        }
    }

    /// Field that carries the identity, when a single one exists.
    pub fn key_field(self) -> Option<&'static str> {
        match self {
            TypeTag::ConnectionPoint => Some("name"),
            TypeTag::ConstituentVnfd => Some("member-vnf-index"),
            TypeTag::VldConnectionPointRef | TypeTag::RspConnectionPointRef => None,
            _ => Some("id"),
        }
    }

    /// Prefix used when generating sequential names for fresh children.
    pub fn name_prefix(self) -> &'static str {
        match self {
            TypeTag::Nsd => "nsd",
            TypeTag::Vnfd => "vnfd",
            TypeTag::Pnfd => "pnfd",
            TypeTag::ConstituentVnfd => "vnf",
            TypeTag::ConnectionPoint => "cp",
            TypeTag::InternalConnectionPoint => "icp",
            TypeTag::Vld => "vld",
            TypeTag::InternalVld => "ivld",
            TypeTag::Vnffgd => "vnffgd",
            TypeTag::Rsp => "rsp",
            TypeTag::Classifier => "classifier",
            TypeTag::MatchAttributes => "match",
            TypeTag::VldConnectionPointRef | TypeTag::RspConnectionPointRef => "cp-ref",
            TypeTag::Vdu => "vdu",
        }
    }

    /// True for aggregate roots that carry persisted view-state.
    pub fn is_root(self) -> bool {
        matches!(self, TypeTag::Nsd | TypeTag::Vnfd | TypeTag::Pnfd)
    }

    /// True for wire endpoints.
    pub fn is_endpoint(self) -> bool {
        matches!(
            self,
            TypeTag::ConnectionPoint | TypeTag::InternalConnectionPoint
        )
    }
}

/// Render a scalar JSON value as its identity string.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
