// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event object carried through one dispatch.

use std::rc::Rc;

use folio_tree::NodeId;

bitflags::bitflags! {
    /// Cooperative cancelation state set by handlers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub(crate) struct Control: u8 {
        /// Skip descent into the current node's children.
        const STOPPED = 0b0000_0001;
        /// Abort the remainder of the traversal.
        const BAILED  = 0b0000_0010;
    }
}

/// Where the node currently being visited sits relative to its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Position {
    /// The dispatch origin; nothing has been descended into yet.
    #[default]
    Origin,
    /// Index of the node among its parent's children.
    Child(usize),
    /// The node was reached through a child shared by both boundary paths, without scanning
    /// its siblings. No sibling index is meaningful here.
    SharedBoundary,
}

/// A boundary argument to [`dispatch`](crate::dispatch).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// A node below the origin; resolved to its path with
    /// [`Tree::path_to`](folio_tree::Tree::path_to).
    Node(NodeId),
    /// An already-resolved path whose first element must be the origin.
    Path(Vec<NodeId>),
}

impl From<NodeId> for Boundary {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Vec<NodeId>> for Boundary {
    fn from(path: Vec<NodeId>) -> Self {
        Self::Path(path)
    }
}

/// One event travelling through the tree.
///
/// `kind` and `payload` are entirely host-defined. Handlers read the traversal coordinates
/// through the accessors and influence the traversal with [`Event::stop_propagation`] and
/// [`Event::bail`]. A handler can leave a result for the caller in `return_value`.
///
/// An event is meant for a single dispatch call.
#[derive(Clone, Debug)]
pub struct Event<T, P, R = ()> {
    /// Event type tag.
    pub kind: T,
    /// Event data.
    pub payload: P,
    /// Out-parameter for handlers.
    pub return_value: Option<R>,
    pub(crate) forward: bool,
    pub(crate) depth: usize,
    pub(crate) position: Position,
    pub(crate) boundary1: Option<Rc<[NodeId]>>,
    pub(crate) boundary2: Option<Rc<[NodeId]>>,
    pub(crate) control: Control,
}

impl<T, P, R> Event<T, P, R> {
    /// A forward-moving event.
    pub fn new(kind: T, payload: P) -> Self {
        Self {
            kind,
            payload,
            return_value: None,
            forward: true,
            depth: 0,
            position: Position::Origin,
            boundary1: None,
            boundary2: None,
            control: Control::empty(),
        }
    }

    /// Set the traversal direction.
    pub fn with_forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Whether siblings are visited in document order.
    pub fn forward(&self) -> bool {
        self.forward
    }

    /// Depth of the node being visited (the origin is at depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position of the node being visited among its siblings.
    pub fn position(&self) -> Position {
        self.position
    }

    /// First boundary path, from the origin down to the boundary node.
    pub fn boundary1(&self) -> Option<&[NodeId]> {
        self.boundary1.as_deref()
    }

    /// Second boundary path, from the origin down to the boundary node.
    pub fn boundary2(&self) -> Option<&[NodeId]> {
        self.boundary2.as_deref()
    }

    /// Skip the children of the node currently being captured.
    ///
    /// Siblings and the rest of the tree are unaffected; the flag is cleared once the node's
    /// bubble step has run.
    pub fn stop_propagation(&mut self) {
        self.control.insert(Control::STOPPED);
    }

    /// Abort the rest of the traversal.
    ///
    /// No further capture step runs. Bubble steps already captured by ancestors still run
    /// as the traversal unwinds.
    pub fn bail(&mut self) {
        self.control.insert(Control::BAILED);
    }

    /// False after [`Event::stop_propagation`] until the current node finishes.
    pub fn is_propagating(&self) -> bool {
        !self.control.contains(Control::STOPPED)
    }

    /// True once [`Event::bail`] was called.
    pub fn is_bailed(&self) -> bool {
        self.control.contains(Control::BAILED)
    }
}
