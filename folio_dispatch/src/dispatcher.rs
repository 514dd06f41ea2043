// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatcher: walk a bounded region of the tree with capture and bubble steps.
//!
//! ## Semantics
//!
//! For every visited node the dispatcher:
//!
//! - Runs the capture callback. It may return a [`Bubble`] step to run later.
//! - Descends into the node's children unless the callback called
//!   [`Event::stop_propagation`] or [`Event::bail`], or the node is a leaf.
//! - Restores the event's `depth` and `position`, runs the bubble step (if any), and clears
//!   the stop-propagation flag so it does not leak to siblings.
//!
//! Capture steps therefore fire in pre-order and bubble steps in post-order. With
//! `forward == false` sibling order is mirrored.
//!
//! ## Boundaries
//!
//! Each boundary is a path from the origin down to some node. At every level the scan over
//! children starts at the node on boundary 1 (or the first child, the last one when moving
//! backward) and ends at the node on boundary 2 (or the last child, the first one when
//! moving backward). A boundary only clips the edge of the scan it belongs to. When both
//! boundaries pass through the same child, the dispatcher goes straight into it and reports
//! [`Position::SharedBoundary`].
//!
//! ## Minimal example
//!
//! ```
//! use folio_dispatch::{Bubble, Event, dispatch};
//! use folio_tree::{DocType, NodeSource, Tree, TreeOptions};
//!
//! let mut tree = Tree::with_options(TreeOptions::sequential("n"));
//! let p = tree
//!     .build(
//!         &NodeSource::new(DocType::Paragraph)
//!             .with_id("p")
//!             .with_child(NodeSource::text("a").with_id("a"))
//!             .with_child(NodeSource::text("b").with_id("b")),
//!     )
//!     .unwrap();
//!
//! // The payload records the order of capture (`+`) and bubble (`-`) steps.
//! let mut ev: Event<(), Vec<String>> = Event::new((), Vec::new());
//! dispatch(&mut tree, p, &mut ev, None, None, |tree, node, ev| {
//!     let key = tree.key(node)?.to_owned();
//!     ev.payload.push(format!("+{key}"));
//!     Ok(Some(Bubble::new(move |_, _, ev: &mut Event<(), Vec<String>>| {
//!         ev.payload.push(format!("-{key}"));
//!         Ok(())
//!     })))
//! })
//! .unwrap();
//!
//! assert_eq!(ev.payload, ["+p", "+a", "-a", "+b", "-b", "-p"]);
//! ```

use std::rc::Rc;

use folio_tree::{NodeId, Tree, TreeError};
use tracing::{debug, trace, warn};

use crate::error::DispatchError;
use crate::event::{Boundary, Control, Event, Position};

/// A deferred bubble step returned by a capture callback.
///
/// It receives the node it was captured for, so one handler function can serve any node.
pub struct Bubble<'a, T, P, R = ()> {
    step: Box<BubbleFn<'a, T, P, R>>,
}

type BubbleFn<'a, T, P, R> =
    dyn FnOnce(&mut Tree, NodeId, &mut Event<T, P, R>) -> Result<(), DispatchError> + 'a;

impl<'a, T, P, R> Bubble<'a, T, P, R> {
    /// Wrap a closure as a bubble step.
    pub fn new(
        step: impl FnOnce(&mut Tree, NodeId, &mut Event<T, P, R>) -> Result<(), DispatchError> + 'a,
    ) -> Self {
        Self {
            step: Box::new(step),
        }
    }

    fn run(self, tree: &mut Tree, node: NodeId, event: &mut Event<T, P, R>) -> Result<(), DispatchError> {
        (self.step)(tree, node, event)
    }
}

impl<T, P, R> core::fmt::Debug for Bubble<'_, T, P, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bubble").finish_non_exhaustive()
    }
}

/// Result type of a capture callback.
pub type CaptureResult<'a, T, P, R = ()> = Result<Option<Bubble<'a, T, P, R>>, DispatchError>;

/// Dispatch `event` over the subtree rooted at `origin`, clipped by up to two boundaries.
///
/// ## Usage
///
/// - `boundary1` / `boundary2`: a [`Boundary::Node`] below `origin` (resolved with
///   [`Tree::path_to`]) or a ready-made [`Boundary::Path`]. Passing the same node twice
///   resolves its path once and shares it.
/// - `capture`: called once per visited node. It may mutate the tree; child lists
///   captured earlier in the walk keep their old contents, and children detached or moved
///   by a handler are skipped when their turn comes.
///
/// ## Errors
///
/// - [`DispatchError::Tree`] with [`TreeError::StaleNode`] if `origin` is stale.
/// - [`DispatchError::BoundaryOrigin`] if a boundary path does not start at `origin`.
/// - [`DispatchError::Tree`] if a boundary node is not below `origin`, or a handler's tree
///   operation fails.
/// - [`DispatchError::InconsistentBoundary`] if a boundary node is missing from the
///   children it should be among, including a child list emptied by [`Tree::splice`].
/// - Any error returned by a capture or bubble step.
///
/// ## Examples
///
/// ### skip a subtree but keep visiting siblings
///
/// ```
/// use folio_dispatch::{Event, dispatch};
/// use folio_tree::{DocType, NodeSource, Tree};
///
/// let mut tree = Tree::new();
/// let doc = tree
///     .build(
///         &NodeSource::new(DocType::Doc)
///             .with_child(NodeSource::new(DocType::Paragraph).with_child(NodeSource::text("hidden")))
///             .with_child(NodeSource::new(DocType::Paragraph).with_child(NodeSource::text("shown"))),
///     )
///     .unwrap();
///
/// let mut ev: Event<(), Vec<String>> = Event::new((), Vec::new());
/// let mut first_paragraph = true;
/// dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
///     if tree.kind(node)? == DocType::Paragraph && std::mem::take(&mut first_paragraph) {
///         ev.stop_propagation();
///     }
///     if let Some(text) = tree.data(node)?.get("content") {
///         ev.payload.push(text.as_str().unwrap_or_default().to_owned());
///     }
///     Ok(None)
/// })
/// .unwrap();
///
/// assert_eq!(ev.payload, ["shown"]);
/// ```
pub fn dispatch<'a, T, P, R, F>(
    tree: &mut Tree,
    origin: NodeId,
    event: &mut Event<T, P, R>,
    boundary1: Option<Boundary>,
    boundary2: Option<Boundary>,
    mut capture: F,
) -> Result<(), DispatchError>
where
    F: FnMut(&mut Tree, NodeId, &mut Event<T, P, R>) -> CaptureResult<'a, T, P, R>,
{
    if !tree.is_alive(origin) {
        warn!(origin = %origin, "dispatch from a stale origin");
        return Err(TreeError::StaleNode(origin).into());
    }
    let shared = matches!(
        (&boundary1, &boundary2),
        (Some(Boundary::Node(a)), Some(Boundary::Node(b))) if a == b
    );
    let path1 = resolve(tree, origin, boundary1)?;
    let path2 = if shared {
        path1.clone()
    } else {
        resolve(tree, origin, boundary2)?
    };
    for path in [&path1, &path2].into_iter().flatten() {
        let first = path.first().copied();
        if first != Some(origin) {
            warn!(origin = %origin, ?first, "boundary path does not start at origin");
            return Err(DispatchError::BoundaryOrigin { origin, first });
        }
    }
    event.boundary1 = path1.clone();
    event.boundary2 = path2.clone();

    let forward = event.forward;
    trace!(origin = %origin, forward, "dispatch");
    visit(
        tree,
        &mut capture,
        event,
        origin,
        forward,
        0,
        path1.as_deref(),
        path2.as_deref(),
    )
}

fn resolve(
    tree: &Tree,
    origin: NodeId,
    boundary: Option<Boundary>,
) -> Result<Option<Rc<[NodeId]>>, DispatchError> {
    Ok(match boundary {
        None => None,
        Some(Boundary::Path(path)) => Some(Rc::from(path)),
        Some(Boundary::Node(node)) => Some(Rc::from(tree.path_to(node, origin)?)),
    })
}

fn visit<'a, T, P, R, F>(
    tree: &mut Tree,
    capture: &mut F,
    event: &mut Event<T, P, R>,
    node: NodeId,
    forward: bool,
    depth: usize,
    boundary1: Option<&[NodeId]>,
    boundary2: Option<&[NodeId]>,
) -> Result<(), DispatchError>
where
    F: FnMut(&mut Tree, NodeId, &mut Event<T, P, R>) -> CaptureResult<'a, T, P, R>,
{
    event.depth = depth;
    let position = event.position;

    trace!(node = %node, depth, "capture");
    let bubble = capture(tree, node, event)?;

    if event.is_propagating()
        && !event.is_bailed()
        && let Some(children) = tree.children(node)?
    {
        let next_depth = depth + 1;
        let node1 = boundary1.and_then(|path| path.get(next_depth).copied());
        let node2 = boundary2.and_then(|path| path.get(next_depth).copied());

        if let Some(shared) = node1
            && node1 == node2
        {
            event.position = Position::SharedBoundary;
            visit(
                tree, capture, event, shared, forward, next_depth, boundary1, boundary2,
            )?;
        } else if let Some((start, end)) = scan_range(&children, node, next_depth, forward, node1, node2)? {
            let mut i = start;
            while !event.is_bailed() && (if forward { i <= end } else { i >= end }) {
                let child = children[i];
                if is_child_of(tree, child, node) {
                    event.position = Position::Child(i);
                    visit(
                        tree,
                        capture,
                        event,
                        child,
                        forward,
                        next_depth,
                        if i == start { boundary1 } else { None },
                        if i == end { boundary2 } else { None },
                    )?;
                } else {
                    debug!(parent = %node, child = %child, "skipping child detached during dispatch");
                }
                if forward {
                    i += 1;
                } else if let Some(prev) = i.checked_sub(1) {
                    i = prev;
                } else {
                    break;
                }
            }
        }
    }

    event.depth = depth;
    event.position = position;
    if let Some(bubble) = bubble {
        trace!(node = %node, depth, "bubble");
        bubble.run(tree, node, event)?;
    }
    event.control.remove(Control::STOPPED);
    Ok(())
}

/// Inclusive scan bounds over `children`, or `None` when there is nothing to scan.
fn scan_range(
    children: &[NodeId],
    parent: NodeId,
    depth: usize,
    forward: bool,
    node1: Option<NodeId>,
    node2: Option<NodeId>,
) -> Result<Option<(usize, usize)>, DispatchError> {
    let missing = |boundary: NodeId| {
        warn!(parent = %parent, boundary = %boundary, depth, "inconsistent boundary");
        DispatchError::InconsistentBoundary {
            parent,
            boundary,
            depth,
        }
    };

    // A boundary expected under an emptied list is still an error.
    if children.is_empty() {
        return match node1.or(node2) {
            Some(n) => Err(missing(n)),
            None => Ok(None),
        };
    }
    let start = match node1 {
        Some(n) => children.iter().position(|&c| c == n).ok_or_else(|| missing(n))?,
        None if forward => 0,
        None => children.len() - 1,
    };
    let end = match node2 {
        Some(n) if forward => children[start..]
            .iter()
            .position(|&c| c == n)
            .map(|i| start + i)
            .ok_or_else(|| missing(n))?,
        Some(n) => children[..=start]
            .iter()
            .rposition(|&c| c == n)
            .ok_or_else(|| missing(n))?,
        None if forward => children.len() - 1,
        None => 0,
    };
    Ok(Some((start, end)))
}

fn is_child_of(tree: &Tree, child: NodeId, parent: NodeId) -> bool {
    matches!(tree.parent_of(child), Ok(Some(p)) if p == parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use folio_tree::{DocType, NodeSource, TreeError, TreeOptions};
    use pretty_assertions::assert_eq;

    type Ev = Event<(), Vec<String>>;

    /// doc
    /// ├── p1: a b c
    /// └── p2: d e
    fn fixture() -> (Tree, NodeId) {
        let mut tree = Tree::with_options(TreeOptions::sequential("n"));
        let doc = tree
            .build(
                &NodeSource::new(DocType::Doc)
                    .with_id("doc")
                    .with_child(NodeSource::new(DocType::Paragraph).with_id("p1").with_children([
                        NodeSource::text("a").with_id("a"),
                        NodeSource::text("b").with_id("b"),
                        NodeSource::text("c").with_id("c"),
                    ]))
                    .with_child(NodeSource::new(DocType::Paragraph).with_id("p2").with_children([
                        NodeSource::text("d").with_id("d"),
                        NodeSource::text("e").with_id("e"),
                    ])),
            )
            .unwrap();
        (tree, doc)
    }

    fn id(tree: &Tree, key: &str) -> NodeId {
        tree.find(key).unwrap()
    }

    /// Record `+key` on capture and `-key` on bubble.
    fn record<'a>(tree: &mut Tree, node: NodeId, ev: &mut Ev) -> CaptureResult<'a, (), Vec<String>> {
        let key = tree.key(node)?.to_owned();
        ev.payload.push(format!("+{key}"));
        Ok(Some(Bubble::new(move |_, _, ev: &mut Ev| {
            ev.payload.push(format!("-{key}"));
            Ok(())
        })))
    }

    fn captures(log: &[String]) -> Vec<&str> {
        log.iter().filter_map(|s| s.strip_prefix('+')).collect()
    }

    fn bubbles(log: &[String]) -> Vec<&str> {
        log.iter().filter_map(|s| s.strip_prefix('-')).collect()
    }

    fn run(
        tree: &mut Tree,
        origin: NodeId,
        forward: bool,
        b1: Option<Boundary>,
        b2: Option<Boundary>,
    ) -> Vec<String> {
        let mut ev: Ev = Event::new((), Vec::new()).with_forward(forward);
        dispatch(tree, origin, &mut ev, b1, b2, record).unwrap();
        ev.payload
    }

    #[test]
    fn unbounded_visits_everything_pre_and_post_order() {
        let (mut tree, doc) = fixture();
        let log = run(&mut tree, doc, true, None, None);
        assert_eq!(
            log,
            [
                "+doc", "+p1", "+a", "-a", "+b", "-b", "+c", "-c", "-p1", "+p2", "+d", "-d",
                "+e", "-e", "-p2", "-doc",
            ]
        );
    }

    #[test]
    fn backward_mirrors_forward() {
        let (mut tree, doc) = fixture();
        let fwd = run(&mut tree, doc, true, None, None);
        let bwd = run(&mut tree, doc, false, None, None);

        let mut fwd_captures = captures(&fwd);
        let bwd_captures = captures(&bwd);
        assert_eq!(bwd_captures, ["doc", "p2", "e", "d", "p1", "c", "b", "a"]);
        // Mirrored pre-order is the reversed forward post-order, and vice versa.
        fwd_captures.reverse();
        assert_eq!(bubbles(&bwd), fwd_captures);
        let mut fwd_bubbles = bubbles(&fwd);
        fwd_bubbles.reverse();
        assert_eq!(bwd_captures, fwd_bubbles);
    }

    #[test]
    fn boundaries_clip_edges_of_range() {
        let (mut tree, doc) = fixture();
        let b = id(&tree, "b");
        let d = id(&tree, "d");
        let log = run(&mut tree, doc, true, Some(b.into()), Some(d.into()));
        assert_eq!(captures(&log), ["doc", "p1", "b", "c", "p2", "d"]);
        assert_eq!(bubbles(&log), ["b", "c", "p1", "d", "p2", "doc"]);
    }

    #[test]
    fn backward_boundaries_scan_from_high_to_low() {
        let (mut tree, doc) = fixture();
        let b = id(&tree, "b");
        let d = id(&tree, "d");
        let log = run(&mut tree, doc, false, Some(d.into()), Some(b.into()));
        assert_eq!(captures(&log), ["doc", "p2", "d", "p1", "c", "b"]);
    }

    #[test]
    fn one_sided_boundary() {
        let (mut tree, doc) = fixture();
        let c = id(&tree, "c");
        let log = run(&mut tree, doc, true, Some(c.into()), None);
        assert_eq!(captures(&log), ["doc", "p1", "c", "p2", "d", "e"]);

        let log = run(&mut tree, doc, true, None, Some(c.into()));
        assert_eq!(captures(&log), ["doc", "p1", "a", "b", "c"]);
    }

    #[test]
    fn shared_boundary_descends_single_chain() {
        let (mut tree, doc) = fixture();
        let b = id(&tree, "b");
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, Some(b.into()), Some(b.into()), |tree, node, ev| {
            let key = tree.key(node)?;
            ev.payload.push(format!("{key}@{:?}", ev.position()));
            Ok(None)
        })
        .unwrap();
        assert_eq!(
            ev.payload,
            ["doc@Origin", "p1@SharedBoundary", "b@SharedBoundary"]
        );
        let path = ev.boundary1().unwrap().to_vec();
        assert_eq!(path, [doc, id(&tree, "p1"), b]);
        assert_eq!(ev.boundary2().unwrap(), &path[..]);
    }

    #[test]
    fn origin_as_both_boundaries_keeps_its_subtree() {
        let (mut tree, _) = fixture();
        let p1 = id(&tree, "p1");
        let log = run(&mut tree, p1, true, Some(p1.into()), Some(p1.into()));
        // Paths of length one do not clip any level below the origin.
        assert_eq!(captures(&log), ["p1", "a", "b", "c"]);
    }

    #[test]
    fn shared_prefix_then_split() {
        let (mut tree, doc) = fixture();
        let a = id(&tree, "a");
        let c = id(&tree, "c");
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, Some(a.into()), Some(c.into()), |tree, node, ev| {
            let key = tree.key(node)?;
            ev.payload.push(format!("{key}@{:?}", ev.position()));
            Ok(None)
        })
        .unwrap();
        assert_eq!(
            ev.payload,
            ["doc@Origin", "p1@SharedBoundary", "a@Child(0)", "b@Child(1)", "c@Child(2)"]
        );
    }

    #[test]
    fn coordinates_are_restored_for_bubble() {
        let (mut tree, doc) = fixture();
        let mut ev: Event<(), Vec<(String, usize, Position)>> = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let key = tree.key(node)?.to_owned();
            let at = (ev.depth(), ev.position());
            Ok(Some(Bubble::new(move |_, _, ev: &mut Event<(), Vec<(String, usize, Position)>>| {
                assert_eq!((ev.depth(), ev.position()), at);
                ev.payload.push((key, ev.depth(), ev.position()));
                Ok(())
            })))
        })
        .unwrap();
        assert_eq!(ev.payload[0], ("a".to_owned(), 2, Position::Child(0)));
        assert_eq!(ev.payload[3], ("p1".to_owned(), 1, Position::Child(0)));
        assert_eq!(ev.payload[6], ("p2".to_owned(), 1, Position::Child(1)));
        assert_eq!(ev.payload[7], ("doc".to_owned(), 0, Position::Origin));
    }

    #[test]
    fn bail_stops_captures_but_unwinds_bubbles() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let step = record(tree, node, ev)?;
            if tree.key(node)? == "b" {
                ev.bail();
            }
            Ok(step)
        })
        .unwrap();
        assert!(ev.is_bailed());
        assert_eq!(
            ev.payload,
            ["+doc", "+p1", "+a", "-a", "+b", "-b", "-p1", "-doc"]
        );
    }

    #[test]
    fn bail_in_bubble_stops_remaining_siblings() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let key = tree.key(node)?.to_owned();
            ev.payload.push(format!("+{key}"));
            Ok(Some(Bubble::new(move |_, _, ev: &mut Ev| {
                if key == "p1" {
                    ev.bail();
                }
                Ok(())
            })))
        })
        .unwrap();
        assert_eq!(captures(&ev.payload), ["doc", "p1", "a", "b", "c"]);
    }

    #[test]
    fn stop_propagation_skips_only_that_subtree() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let step = record(tree, node, ev)?;
            if tree.key(node)? == "p1" {
                ev.stop_propagation();
            }
            Ok(step)
        })
        .unwrap();
        assert_eq!(
            ev.payload,
            ["+doc", "+p1", "-p1", "+p2", "+d", "-d", "+e", "-e", "-p2", "-doc"]
        );
        assert!(ev.is_propagating());
    }

    #[test]
    fn stop_propagation_at_origin_skips_everything_below() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            ev.stop_propagation();
            ev.payload.push(tree.key(node)?.to_owned());
            Ok(None)
        })
        .unwrap();
        assert_eq!(ev.payload, ["doc"]);
    }

    #[test]
    fn detached_sibling_is_skipped() {
        let (mut tree, doc) = fixture();
        let c = id(&tree, "c");
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let step = record(tree, node, ev)?;
            if tree.key(node)? == "a" {
                tree.detach(c)?;
            }
            Ok(step)
        })
        .unwrap();
        assert_eq!(captures(&ev.payload), ["doc", "p1", "a", "b", "p2", "d", "e"]);
    }

    #[test]
    fn inserted_sibling_is_not_visited_in_current_scan() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            let step = record(tree, node, ev)?;
            if tree.key(node)? == "a" {
                let p1 = tree.parent_of(node)?.unwrap();
                let z = tree.build(&NodeSource::text("z").with_id("z"))?;
                tree.concat(p1, &[z])?;
            }
            Ok(step)
        })
        .unwrap();
        assert!(!captures(&ev.payload).contains(&"z"));
        let p1 = id(&tree, "p1");
        assert_eq!(tree.children(p1).unwrap().unwrap().len(), 4);
    }

    #[test]
    fn boundary_outside_origin_fails() {
        let (mut tree, doc) = fixture();
        let p1 = id(&tree, "p1");
        let d = id(&tree, "d");
        let mut ev: Ev = Event::new((), Vec::new());
        let err = dispatch(&mut tree, p1, &mut ev, Some(d.into()), None, record);
        assert_matches!(err, Err(DispatchError::Tree(TreeError::NotADescendant { .. })));
        assert!(ev.payload.is_empty());

        let err = dispatch(&mut tree, p1, &mut ev, Some(vec![doc, p1].into()), None, record);
        assert_matches!(
            err,
            Err(DispatchError::BoundaryOrigin { origin, first }) if origin == p1 && first == Some(doc)
        );
        let err = dispatch(&mut tree, p1, &mut ev, None, Some(Vec::new().into()), record);
        assert_matches!(err, Err(DispatchError::BoundaryOrigin { first: None, .. }));
        assert!(ev.payload.is_empty());
    }

    #[test]
    fn inconsistent_path_fails() {
        let (mut tree, doc) = fixture();
        let p1 = id(&tree, "p1");
        let d = id(&tree, "d");
        let mut ev: Ev = Event::new((), Vec::new());
        // `d` is not a child of `p1`.
        let err = dispatch(&mut tree, doc, &mut ev, Some(vec![doc, p1, d].into()), None, record);
        assert_matches!(
            err,
            Err(DispatchError::InconsistentBoundary { parent, boundary, depth: 2 })
                if parent == p1 && boundary == d
        );
    }

    #[test]
    fn end_before_start_is_inconsistent() {
        let (mut tree, doc) = fixture();
        let a = id(&tree, "a");
        let c = id(&tree, "c");
        let mut ev: Ev = Event::new((), Vec::new());
        let err = dispatch(&mut tree, doc, &mut ev, Some(c.into()), Some(a.into()), record);
        assert_matches!(err, Err(DispatchError::InconsistentBoundary { boundary, .. }) if boundary == a);
    }

    #[test]
    fn handler_errors_abort_dispatch() {
        let (mut tree, doc) = fixture();
        let mut ev: Ev = Event::new((), Vec::new());
        let err = dispatch(&mut tree, doc, &mut ev, None, None, |tree, node, ev| {
            if tree.key(node)? == "b" {
                return Err(DispatchError::Handler("refused".into()));
            }
            record(tree, node, ev)
        });
        assert_matches!(err, Err(DispatchError::Handler(msg)) if msg == "refused");
        assert_eq!(captures(&ev.payload), ["doc", "p1", "a"]);
    }

    #[test]
    fn boundary_under_emptied_child_list_is_inconsistent() {
        let (mut tree, _) = fixture();
        let p1 = id(&tree, "p1");
        let a = id(&tree, "a");
        tree.splice(p1, 0, None, &[]).unwrap();
        assert_eq!(tree.children(p1).unwrap().as_deref(), Some(&[][..]));

        for forward in [true, false] {
            let mut ev: Ev = Event::new((), Vec::new()).with_forward(forward);
            let err = dispatch(&mut tree, p1, &mut ev, None, Some(vec![p1, a].into()), record);
            assert_matches!(
                err,
                Err(DispatchError::InconsistentBoundary { parent, boundary, depth: 1 })
                    if parent == p1 && boundary == a
            );

            let mut ev: Ev = Event::new((), Vec::new()).with_forward(forward);
            let err = dispatch(&mut tree, p1, &mut ev, Some(vec![p1, a].into()), None, record);
            assert_matches!(err, Err(DispatchError::InconsistentBoundary { boundary, .. }) if boundary == a);
        }
    }

    #[test]
    fn stale_origin_is_rejected_before_any_capture() {
        let (mut tree, _) = fixture();
        let p2 = id(&tree, "p2");
        tree.detach(p2).unwrap();
        tree.remove(p2).unwrap();

        let mut ev: Ev = Event::new((), Vec::new());
        let err = dispatch(&mut tree, p2, &mut ev, None, None, record);
        assert_matches!(err, Err(DispatchError::Tree(TreeError::StaleNode(n))) if n == p2);
        assert!(ev.payload.is_empty());
    }

    #[test]
    fn emptied_child_list_is_not_scanned() {
        let (mut tree, doc) = fixture();
        let p2 = id(&tree, "p2");
        tree.splice(p2, 0, None, &[]).unwrap();
        let fwd = run(&mut tree, doc, true, None, None);
        let bwd = run(&mut tree, doc, false, None, None);
        assert_eq!(captures(&fwd), ["doc", "p1", "a", "b", "c", "p2"]);
        assert_eq!(captures(&bwd), ["doc", "p2", "p1", "c", "b", "a"]);
    }
}
