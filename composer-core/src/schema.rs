//! Schema metadata — static field tables keyed by qualified type path.
//!
//! The serializer and the structural accessors both read their field
//! whitelists from here; nothing else in the crate hand-duplicates a field
//! list. A lookup miss is non-fatal: callers receive an empty slice and the
//! miss is logged once per call site via `tracing::warn!`.

use tracing::warn;

/// Closed set of schema node kinds. Schema walking matches on this enum so
/// the compiler enforces exhaustiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Scalar field (string, number, boolean).
    Leaf,
    /// Ordered list of scalars (e.g. id-refs).
    LeafList,
    /// Ordered list of child objects, each wrapped as a typed node.
    List,
    /// Single nested object serialized opaquely.
    Container,
    /// Discriminated container; only the selected case survives.
    Choice,
    /// One arm of a choice.
    Case,
    /// Grouping expansion; treated as inline leaves.
    Uses,
}

/// One field of a descriptor type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: SchemaKind,
    pub required: bool,
}

/// A descriptor type: qualified path plus its ordered field whitelist.
#[derive(Debug, Clone, Copy)]
pub struct TypeDef {
    pub path: &'static str,
    pub fields: &'static [FieldDef],
}

const fn leaf(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::Leaf,
        required: false,
    }
}

const fn required_leaf(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::Leaf,
        required: true,
    }
}

const fn list(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::List,
        required: false,
    }
}

const fn leaf_list(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::LeafList,
        required: false,
    }
}

const fn container(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::Container,
        required: false,
    }
}

const fn choice(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: SchemaKind::Choice,
        required: false,
    }
}

// ── Type tables ──
//
// Field order here is canonical serialization order.

static NSD: TypeDef = TypeDef {
    path: "nsd:nsd",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("vendor"),
        leaf("version"),
        list("constituent-vnfd"),
        list("vld"),
        list("vnffgd"),
        leaf("meta"),
    ],
};

static CONSTITUENT_VNFD: TypeDef = TypeDef {
    path: "nsd:constituent-vnfd",
    fields: &[
        required_leaf("member-vnf-index"),
        required_leaf("vnfd-id-ref"),
        leaf("start-by-default"),
        choice("vnf-configuration"),
    ],
};

static VLD: TypeDef = TypeDef {
    path: "nsd:vld",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("type"),
        leaf("version"),
        list("vnfd-connection-point-ref"),
    ],
};

static VLD_CP_REF: TypeDef = TypeDef {
    path: "nsd:vld:vnfd-connection-point-ref",
    fields: &[
        required_leaf("member-vnf-index-ref"),
        leaf("vnfd-id-ref"),
        required_leaf("vnfd-connection-point-ref"),
    ],
};

static VNFFGD: TypeDef = TypeDef {
    path: "nsd:vnffgd",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("version"),
        list("rsp"),
        list("classifier"),
    ],
};

static RSP: TypeDef = TypeDef {
    path: "nsd:rsp",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        list("vnfd-connection-point-ref"),
    ],
};

static RSP_CP_REF: TypeDef = TypeDef {
    path: "nsd:rsp:vnfd-connection-point-ref",
    fields: &[
        required_leaf("member-vnf-index-ref"),
        leaf("order"),
        leaf("vnfd-id-ref"),
        required_leaf("vnfd-connection-point-ref"),
    ],
};

static CLASSIFIER: TypeDef = TypeDef {
    path: "nsd:classifier",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("rsp-id-ref"),
        leaf("member-vnf-index-ref"),
        leaf("vnfd-id-ref"),
        leaf("vnfd-connection-point-ref"),
        list("match-attributes"),
    ],
};

static MATCH_ATTRIBUTES: TypeDef = TypeDef {
    path: "nsd:match-attributes",
    fields: &[
        required_leaf("id"),
        leaf("ip-proto"),
        leaf("source-ip-address"),
        leaf("destination-ip-address"),
        leaf("source-port"),
        leaf("destination-port"),
    ],
};

static VNFD: TypeDef = TypeDef {
    path: "vnfd:vnfd",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("vendor"),
        leaf("version"),
        list("connection-point"),
        list("vdu"),
        list("internal-vld"),
        leaf("meta"),
    ],
};

static CONNECTION_POINT: TypeDef = TypeDef {
    path: "vnfd:connection-point",
    fields: &[required_leaf("name"), leaf("type")],
};

static VDU: TypeDef = TypeDef {
    path: "vnfd:vdu",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("description"),
        leaf("image"),
        container("vm-flavor"),
        list("internal-connection-point"),
    ],
};

static INTERNAL_CONNECTION_POINT: TypeDef = TypeDef {
    path: "vnfd:internal-connection-point",
    fields: &[required_leaf("id"), required_leaf("name"), leaf("type")],
};

static INTERNAL_VLD: TypeDef = TypeDef {
    path: "vnfd:internal-vld",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("type"),
        leaf_list("internal-connection-point-ref"),
    ],
};

static PNFD: TypeDef = TypeDef {
    path: "pnfd:pnfd",
    fields: &[
        required_leaf("id"),
        required_leaf("name"),
        leaf("short-name"),
        leaf("description"),
        leaf("version"),
        list("connection-point"),
    ],
};

static TYPES: &[&TypeDef] = &[
    &NSD,
    &CONSTITUENT_VNFD,
    &VLD,
    &VLD_CP_REF,
    &VNFFGD,
    &RSP,
    &RSP_CP_REF,
    &CLASSIFIER,
    &MATCH_ATTRIBUTES,
    &VNFD,
    &CONNECTION_POINT,
    &VDU,
    &INTERNAL_CONNECTION_POINT,
    &INTERNAL_VLD,
    &PNFD,
];

/// Look up a type definition by qualified path.
pub fn lookup(path: &str) -> Option<&'static TypeDef> {
    TYPES.iter().copied().find(|t| t.path == path)
}

/// Field whitelist for a type path. A miss logs a warning and returns an
/// empty slice so callers see a node with no structural children rather
/// than an error.
pub fn fields_for(path: &str) -> &'static [FieldDef] {
    match lookup(path) {
        Some(def) => def.fields,
        None => {
            warn!(path, "schema lookup miss; treating as empty field list");
            &[]
        }
    }
}

/// The case arms of the `vnf-configuration` choice, keyed by the
/// `config-type` discriminant value.
pub const VNF_CONFIG_CASES: &[(&str, &str)] = &[
    ("juju", "juju"),
    ("script", "script"),
    ("rest", "rest"),
    ("netconf", "netconf"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_path() {
        let def = lookup("nsd:nsd").expect("nsd registered");
        assert!(def.fields.iter().any(|f| f.name == "constituent-vnfd"));
    }

    #[test]
    fn lookup_miss_returns_empty_fields() {
        assert!(lookup("nsd:no-such-type").is_none());
        assert!(fields_for("nsd:no-such-type").is_empty());
    }

    #[test]
    fn list_fields_are_marked_list() {
        let def = lookup("vnfd:vnfd").unwrap();
        let vdu = def.fields.iter().find(|f| f.name == "vdu").unwrap();
        assert_eq!(vdu.kind, SchemaKind::List);
    }

    #[test]
    fn identity_fields_are_required() {
        let def = lookup("nsd:constituent-vnfd").unwrap();
        let idx = def
            .fields
            .iter()
            .find(|f| f.name == "member-vnf-index")
            .unwrap();
        assert!(idx.required);
    }
}
