// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook table: per node type, per event kind capture handlers.
//!
//! The dispatcher only needs "given a node, one capture callback". A [`HookTable`] is the
//! usual way to provide that: handlers are registered for a `(DocType, kind)` pair and
//! looked up for every visited node, with an optional fallback for everything else.
//!
//! ```
//! use folio_dispatch::{Bubble, Event, HookTable};
//! use folio_tree::{DocType, Tree};
//!
//! #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
//! enum Kind {
//!     CountText,
//! }
//!
//! let mut tree = Tree::new();
//! let p = tree
//!     .build_json(r#"{ "type": "paragraph", "children": [
//!         { "type": "text", "content": "a" },
//!         { "type": "text", "content": "b" }
//!     ]}"#)
//!     .unwrap();
//!
//! let mut hooks: HookTable<Kind, usize> = HookTable::new();
//! hooks.register(DocType::Text, Kind::CountText, |_, _, ev| {
//!     ev.payload += 1;
//!     Ok(None)
//! });
//! hooks.register(DocType::Paragraph, Kind::CountText, |_, _, _| {
//!     Ok(Some(Bubble::new(|_, _, ev: &mut Event<Kind, usize>| {
//!         ev.return_value = Some(());
//!         Ok(())
//!     })))
//! });
//!
//! let mut ev = Event::new(Kind::CountText, 0);
//! hooks.dispatch(&mut tree, p, &mut ev, None, None).unwrap();
//! assert_eq!(ev.payload, 2);
//! assert_eq!(ev.return_value, Some(()));
//! ```

use core::hash::Hash;

use folio_tree::{DocType, NodeId, Tree};
use hashbrown::HashMap;

use crate::dispatcher::{CaptureResult, dispatch};
use crate::error::DispatchError;
use crate::event::{Boundary, Event};

/// A registered capture handler.
pub type Hook<T, P, R = ()> =
    Box<dyn Fn(&mut Tree, NodeId, &mut Event<T, P, R>) -> CaptureResult<'static, T, P, R>>;

/// Capture handlers keyed by node type and event kind.
pub struct HookTable<T, P, R = ()> {
    hooks: HashMap<(DocType, T), Hook<T, P, R>>,
    fallback: Option<Hook<T, P, R>>,
}

impl<T: core::fmt::Debug, P, R> core::fmt::Debug for HookTable<T, P, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookTable")
            .field("registered", &self.hooks.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<T: Copy + Eq + Hash, P, R> Default for HookTable<T, P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash, P, R> HookTable<T, P, R> {
    /// An empty table: every node is a no-op.
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
            fallback: None,
        }
    }

    /// Register (or replace) the handler for `kind` events on `doc_type` nodes.
    pub fn register(
        &mut self,
        doc_type: DocType,
        kind: T,
        hook: impl Fn(&mut Tree, NodeId, &mut Event<T, P, R>) -> CaptureResult<'static, T, P, R>
        + 'static,
    ) -> &mut Self {
        self.hooks.insert((doc_type, kind), Box::new(hook));
        self
    }

    /// Remove the handler for `kind` events on `doc_type` nodes, returning it.
    pub fn unregister(&mut self, doc_type: DocType, kind: T) -> Option<Hook<T, P, R>> {
        self.hooks.remove(&(doc_type, kind))
    }

    /// Set the handler used when no specific one is registered.
    pub fn set_fallback(&mut self, hook: Option<Hook<T, P, R>>) {
        self.fallback = hook;
    }

    /// Whether a specific handler exists for the pair.
    pub fn contains(&self, doc_type: DocType, kind: T) -> bool {
        self.hooks.contains_key(&(doc_type, kind))
    }

    /// Run the handler for `node`, if any.
    pub fn capture(
        &self,
        tree: &mut Tree,
        node: NodeId,
        event: &mut Event<T, P, R>,
    ) -> CaptureResult<'static, T, P, R> {
        let doc_type = tree.kind(node)?;
        match self.hooks.get(&(doc_type, event.kind)).or(self.fallback.as_ref()) {
            Some(hook) => hook(tree, node, event),
            None => Ok(None),
        }
    }

    /// [`dispatch`] with this table as the capture callback.
    pub fn dispatch(
        &self,
        tree: &mut Tree,
        origin: NodeId,
        event: &mut Event<T, P, R>,
        boundary1: Option<Boundary>,
        boundary2: Option<Boundary>,
    ) -> Result<(), DispatchError> {
        dispatch(tree, origin, event, boundary1, boundary2, |tree, node, event| {
            self.capture(tree, node, event)
        })
    }
}
