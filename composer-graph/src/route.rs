//! Connection router — endpoint mounting and path splines.
//!
//! Runs after a layout pass. Stage one decides which edge of its parent
//! shape each wired endpoint mounts on (four angle zones, boundaries at
//! 90°/180°/270°, a boundary angle belongs to the lower zone) and packs
//! endpoints along that edge without overlap. Stage two synthesizes
//! splines of two to four control points between endpoints and their
//! connected aggregates. Everything is re-derived per pass; references
//! that no longer resolve are skipped, never rendered.

use std::collections::BTreeMap;

use composer_core::{DescriptorTree, NodeKey, Rect, TypeTag};
use serde_json::Value;
use tracing::debug;

use crate::geometry::{angle_deg, Point};

/// Spacing between mounted endpoints along one parent edge.
pub const MOUNT_SPACING: f64 = 24.0;
/// Distance the first control point extends outward from a mount.
pub const CURVE_OFFSET: f64 = 40.0;
/// How far a shared-container curve bows toward the container center.
pub const BOW_FACTOR: f64 = 0.5;

/// Quadrant of the angle between an endpoint's parent and its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeZone {
    TopRight,
    TopLeft,
    BottomLeft,
    BottomRight,
}

impl EdgeZone {
    /// Bucket an angle in `[0, 360)`. Boundary angles (90, 180, 270)
    /// belong to the lower bucket.
    pub fn from_angle(deg: f64) -> Self {
        if deg <= 90.0 {
            EdgeZone::TopRight
        } else if deg <= 180.0 {
            EdgeZone::TopLeft
        } else if deg <= 270.0 {
            EdgeZone::BottomLeft
        } else {
            EdgeZone::BottomRight
        }
    }

    pub fn side(self) -> MountSide {
        match self {
            EdgeZone::TopRight | EdgeZone::TopLeft => MountSide::Top,
            EdgeZone::BottomLeft | EdgeZone::BottomRight => MountSide::Bottom,
        }
    }
}

/// Which edge of the parent shape an endpoint sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MountSide {
    Top,
    Bottom,
}

/// A mounted endpoint: position on its parent's edge plus the
/// human-readable number assigned in first-encounter order this pass.
#[derive(Debug, Clone)]
pub struct Mount {
    /// Composite endpoint identity (`member-index/cp-name`).
    pub endpoint: String,
    /// Id of the parent shape (the constituent member index).
    pub parent: String,
    pub zone: EdgeZone,
    pub side: MountSide,
    pub point: Point,
    pub label: u32,
}

/// A routed connection: spline control points between two identities.
#[derive(Debug, Clone)]
pub struct RoutedEdge {
    pub from: String,
    pub to: String,
    /// 2–4 spline control points, start and end included.
    pub points: Vec<Point>,
}

#[derive(Debug, Default)]
pub struct RouterOutput {
    pub mounts: Vec<Mount>,
    pub edges: Vec<RoutedEdge>,
}

impl RouterOutput {
    /// True when any mount or edge references the given identity. Callers
    /// negate this to assert cleanup after removals.
    pub fn names(&self, id: &str) -> bool {
        self.mounts.iter().any(|m| m.endpoint == id || m.parent == id)
            || self.edges.iter().any(|e| e.from == id || e.to == id)
    }
}

struct Candidate {
    endpoint: String,
    parent: String,
    parent_rect: Rect,
    target: Point,
    label: u32,
}

/// One wired pair to route in stage two.
enum Wire {
    /// Endpoint to its virtual link.
    Link { endpoint: String, vld_id: String, vld_center: Point },
    /// Ordered multi-hop rendered service path.
    Path { hops: Vec<Hop> },
}

struct Hop {
    endpoint: String,
    member: String,
}

#[derive(Debug, Default)]
pub struct ConnectionRouter;

impl ConnectionRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route every connection in the forest against current geometry.
    pub fn route(&self, tree: &DescriptorTree) -> RouterOutput {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut wires: Vec<Wire> = Vec::new();
        let mut next_label = 1u32;

        for root in tree.roots().iter().copied() {
            let Ok(node) = tree.node(root) else { continue };
            if node.tag != TypeTag::Nsd {
                continue;
            }
            let members = member_rects(tree, root);

            // Virtual link wires.
            for vld in tree.children_of(root, TypeTag::Vld) {
                let Ok(vld_node) = tree.node(vld) else { continue };
                let vld_id = vld_node.id.clone();
                let vld_center = center(vld_node.rect);
                for cp_ref in tree.children_of(vld, TypeTag::VldConnectionPointRef) {
                    let Ok(ref_node) = tree.node(cp_ref) else { continue };
                    let Some(member) = member_of(&ref_node.fragment) else {
                        continue;
                    };
                    let Some(parent_rect) = members.get(&member) else {
                        debug!(endpoint = %ref_node.id, member, "dangling endpoint; skipped");
                        continue;
                    };
                    push_candidate(
                        &mut candidates,
                        &mut next_label,
                        Candidate {
                            endpoint: ref_node.id.clone(),
                            parent: member.clone(),
                            parent_rect: *parent_rect,
                            target: vld_center,
                            label: 0,
                        },
                    );
                    wires.push(Wire::Link {
                        endpoint: ref_node.id.clone(),
                        vld_id: vld_id.clone(),
                        vld_center,
                    });
                }
            }

            // Rendered service paths.
            for fg in tree.children_of(root, TypeTag::Vnffgd) {
                for rsp in tree.children_of(fg, TypeTag::Rsp) {
                    let hops = ordered_hops(tree, rsp, &members);
                    if hops.len() < 2 {
                        continue;
                    }
                    for (i, hop) in hops.iter().enumerate() {
                        // Mount each hop toward its successor; the last hop
                        // looks back at its predecessor.
                        let toward = if i + 1 < hops.len() {
                            &hops[i + 1]
                        } else {
                            &hops[i - 1]
                        };
                        let (Some(parent_rect), Some(target_rect)) =
                            (members.get(&hop.member), members.get(&toward.member))
                        else {
                            continue;
                        };
                        push_candidate(
                            &mut candidates,
                            &mut next_label,
                            Candidate {
                                endpoint: hop.endpoint.clone(),
                                parent: hop.member.clone(),
                                parent_rect: *parent_rect,
                                target: center(*target_rect),
                                label: 0,
                            },
                        );
                    }
                    wires.push(Wire::Path { hops });
                }
            }
        }

        let mounts = mount_all(candidates);
        let points: BTreeMap<String, (Point, MountSide)> = mounts
            .iter()
            .map(|m| (m.endpoint.clone(), (m.point, m.side)))
            .collect();

        let mut edges = Vec::new();
        for wire in wires {
            match wire {
                Wire::Link {
                    endpoint,
                    vld_id,
                    vld_center,
                } => {
                    if let Some((start, side)) = points.get(&endpoint) {
                        edges.push(RoutedEdge {
                            from: endpoint,
                            to: vld_id,
                            points: link_spline(*start, *side, vld_center),
                        });
                    }
                }
                Wire::Path { hops } => {
                    route_path(tree, &hops, &points, &mut edges);
                }
            }
        }

        RouterOutput { mounts, edges }
    }
}

/// Register a candidate unless this endpoint already mounted this pass.
/// First encounter also fixes the endpoint's display number.
fn push_candidate(candidates: &mut Vec<Candidate>, next_label: &mut u32, mut candidate: Candidate) {
    if candidates.iter().any(|c| c.endpoint == candidate.endpoint) {
        return;
    }
    candidate.label = *next_label;
    *next_label += 1;
    candidates.push(candidate);
}

/// Stage one: decide zones, then pack endpoints along each parent edge in
/// descending distance order so they never overlap.
fn mount_all(candidates: Vec<Candidate>) -> Vec<Mount> {
    let mut groups: BTreeMap<(String, MountSide), Vec<usize>> = BTreeMap::new();
    let mut staged: Vec<(Candidate, EdgeZone, f64)> = Vec::new();

    for candidate in candidates {
        let origin = center(candidate.parent_rect);
        let zone = EdgeZone::from_angle(angle_deg(origin, candidate.target));
        let dist = origin.distance(candidate.target);
        staged.push((candidate, zone, dist));
    }
    for (i, (candidate, zone, _)) in staged.iter().enumerate() {
        groups
            .entry((candidate.parent.clone(), zone.side()))
            .or_default()
            .push(i);
    }

    let mut mounts = Vec::with_capacity(staged.len());
    for ((_, side), mut indices) in groups {
        indices.sort_by(|a, b| {
            staged[*b]
                .2
                .partial_cmp(&staged[*a].2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        for (slot, idx) in indices.into_iter().enumerate() {
            let (candidate, zone, _) = &staged[idx];
            let rect = candidate.parent_rect;
            let point = match side {
                // Top edge packs left-to-right, bottom right-to-left.
                MountSide::Top => Point::new(
                    rect.left + MOUNT_SPACING * (slot as f64 + 1.0),
                    rect.top,
                ),
                MountSide::Bottom => Point::new(
                    rect.right() - MOUNT_SPACING * (slot as f64 + 1.0),
                    rect.bottom(),
                ),
            };
            mounts.push(Mount {
                endpoint: candidate.endpoint.clone(),
                parent: candidate.parent.clone(),
                zone: *zone,
                side,
                point,
                label: candidate.label,
            });
        }
    }
    mounts.sort_by_key(|m| m.label);
    mounts
}

/// Cubic spline from a mount outward to a virtual link center.
fn link_spline(start: Point, side: MountSide, target: Point) -> Vec<Point> {
    let c1 = outward(start, side);
    let approach = if start.y <= target.y {
        -CURVE_OFFSET
    } else {
        CURVE_OFFSET
    };
    let c2 = Point::new(target.x, target.y + approach);
    vec![start, c1, c2, target]
}

/// Stage two for a rendered service path: first hop is a full cubic,
/// continuations mirror the previous control point, and hops whose
/// endpoints share a container bow toward that container's center.
fn route_path(
    tree: &DescriptorTree,
    hops: &[Hop],
    points: &BTreeMap<String, (Point, MountSide)>,
    edges: &mut Vec<RoutedEdge>,
) {
    let mut prev_control: Option<Point> = None;
    for pair in hops.windows(2) {
        let (Some((start, start_side)), Some((end, _))) =
            (points.get(&pair[0].endpoint), points.get(&pair[1].endpoint))
        else {
            prev_control = None;
            continue;
        };
        let spline = if let Some(container) = shared_container(tree, &pair[0], &pair[1]) {
            // Shorter curve bowing toward the shared container.
            let mid = start.midpoint(*end);
            let bow = Point::new(
                mid.x + (container.x - mid.x) * BOW_FACTOR,
                mid.y + (container.y - mid.y) * BOW_FACTOR,
            );
            vec![*start, bow, *end]
        } else if let Some(prev) = prev_control {
            // Smoothed continuation of the previous segment.
            vec![*start, start.mirror(prev), *end]
        } else {
            let c1 = outward(*start, *start_side);
            let c2 = start.midpoint(*end);
            vec![*start, c1, c2, *end]
        };
        prev_control = Some(spline[spline.len() - 2]);
        edges.push(RoutedEdge {
            from: pair[0].endpoint.clone(),
            to: pair[1].endpoint.clone(),
            points: spline,
        });
    }
}

/// Center the current and next endpoint share, when they belong to the
/// same constituent vnfd or the same virtual link.
fn shared_container(tree: &DescriptorTree, a: &Hop, b: &Hop) -> Option<Point> {
    for root in tree.roots().iter().copied() {
        let Ok(node) = tree.node(root) else { continue };
        if node.tag != TypeTag::Nsd {
            continue;
        }
        if a.member == b.member {
            let members = member_rects(tree, root);
            if let Some(rect) = members.get(&a.member) {
                return Some(center(*rect));
            }
        }
        for vld in tree.children_of(root, TypeTag::Vld) {
            let refs = tree.children_of(vld, TypeTag::VldConnectionPointRef);
            let holds = |endpoint: &str| {
                refs.iter().any(|k| {
                    tree.node(*k)
                        .map(|n| n.id == endpoint)
                        .unwrap_or(false)
                })
            };
            if holds(&a.endpoint) && holds(&b.endpoint) {
                if let Ok(vld_node) = tree.node(vld) {
                    return Some(center(vld_node.rect));
                }
            }
        }
    }
    None
}

fn outward(point: Point, side: MountSide) -> Point {
    match side {
        MountSide::Top => Point::new(point.x, point.y - CURVE_OFFSET),
        MountSide::Bottom => Point::new(point.x, point.y + CURVE_OFFSET),
    }
}

fn center(rect: Rect) -> Point {
    let (x, y) = rect.center();
    Point::new(x, y)
}

/// Constituent member index -> placed rectangle, for one nsd root.
fn member_rects(tree: &DescriptorTree, nsd: NodeKey) -> BTreeMap<String, Rect> {
    tree.children_of(nsd, TypeTag::ConstituentVnfd)
        .into_iter()
        .filter_map(|k| tree.node(k).ok())
        .map(|n| (n.id.clone(), n.rect))
        .collect()
}

fn member_of(fragment: &Value) -> Option<String> {
    match fragment.get("member-vnf-index-ref")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The rsp's endpoints in path order (explicit `order` leaf, falling back
/// to document order), restricted to resolvable members.
fn ordered_hops(
    tree: &DescriptorTree,
    rsp: NodeKey,
    members: &BTreeMap<String, Rect>,
) -> Vec<Hop> {
    let mut refs: Vec<(i64, usize, Hop)> = Vec::new();
    for (i, key) in tree
        .children_of(rsp, TypeTag::RspConnectionPointRef)
        .into_iter()
        .enumerate()
    {
        let Ok(node) = tree.node(key) else { continue };
        let Some(member) = member_of(&node.fragment) else {
            continue;
        };
        if !members.contains_key(&member) {
            debug!(endpoint = %node.id, member, "dangling path hop; skipped");
            continue;
        }
        let order = node
            .fragment
            .get("order")
            .and_then(Value::as_i64)
            .unwrap_or(i as i64);
        refs.push((
            order,
            i,
            Hop {
                endpoint: node.id.clone(),
                member,
            },
        ));
    }
    refs.sort_by_key(|(order, i, _)| (*order, *i));
    refs.into_iter().map(|(_, _, hop)| hop).collect()
}
