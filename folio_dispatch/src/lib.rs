// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=folio_dispatch --heading-base-level=0

//! Folio Dispatch: bounded capture/bubble traversal over a Folio document tree.
//!
//! ## Overview
//!
//! Editor commands such as "delete the selection" or "move the cursor" are expressed as an
//! [`Event`] dispatched over a region of a [`folio_tree::Tree`]. Every node in the region
//! gets a capture step on the way down and, if the capture step asked for one, a
//! [`Bubble`] step on the way up.
//!
//! ## Region
//!
//! The region is the subtree under an origin node, optionally clipped by two boundary
//! paths (typically the two ends of a selection). The traversal direction is chosen per
//! event: with [`Event::with_forward`]`(false)` siblings are visited from last to first and
//! the boundaries swap roles.
//!
//! ## Control
//!
//! - [`Event::stop_propagation`] skips the current node's children.
//! - [`Event::bail`] ends the traversal; pending bubble steps still run.
//! - Errors from handlers abort the dispatch and are returned to the caller.
//!
//! ## Handlers
//!
//! [`dispatch`] takes any capture closure. [`HookTable`] routes captures by node type and
//! event kind, which is how commands are normally wired up.
//!
//! ```
//! use folio_dispatch::{Event, HookTable};
//! use folio_tree::{DocType, Tree};
//!
//! #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
//! enum Command {
//!     Collect,
//! }
//!
//! let mut tree = Tree::new();
//! let doc = tree
//!     .build_json(r#"{ "type": "doc", "children": [
//!         { "type": "paragraph", "children": [{ "type": "text", "content": "one" }] },
//!         { "type": "paragraph", "children": [{ "type": "text", "content": "two" }] }
//!     ]}"#)
//!     .unwrap();
//!
//! let mut hooks: HookTable<Command, Vec<String>> = HookTable::new();
//! hooks.register(DocType::Text, Command::Collect, |tree, node, ev| {
//!     if let Some(content) = tree.data(node)?.get("content").and_then(|v| v.as_str()) {
//!         ev.payload.push(content.to_owned());
//!     }
//!     Ok(None)
//! });
//!
//! let mut ev = Event::new(Command::Collect, Vec::new()).with_forward(false);
//! hooks.dispatch(&mut tree, doc, &mut ev, None, None).unwrap();
//! assert_eq!(ev.payload, ["two", "one"]);
//! ```

mod dispatcher;
mod error;
mod event;
mod hooks;

pub use dispatcher::{Bubble, CaptureResult, dispatch};
pub use error::DispatchError;
pub use event::{Boundary, Event, Position};
pub use hooks::{Hook, HookTable};
