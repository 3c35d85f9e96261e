#![forbid(unsafe_code)]

//! Collection observers.
//!
//! Each observer owns one output [`List`] per start, emits it once, and from
//! then on keeps it up to date by splicing it in response to upstream content
//! changes. Downstream observers therefore see ordinary list content events
//! describing exactly what changed.
//!
//! # Invariants
//!
//! 1. Every upstream change produces at most one splice of the output list.
//! 2. Handlers rely only on how many elements were removed, never on the
//!    removed values themselves.
//! 3. A non-list upstream value behaves as an empty list.
//! 4. Cancelling an observer removes every listener it registered on
//!    upstream lists and on per-element relation observers.

mod aggregate;
mod extent;
mod filter;
mod flatten;
mod group;
mod index;
mod map;
mod membership;
mod object;
mod relation;
mod sorted;
mod tuple;

use std::rc::Rc;

use fbind_core::{List, Value};

use crate::observer::{Cancel, Emit, Observer, Scope, observe_each};

pub use aggregate::{average, sum};
pub use extent::{max, min};
pub use filter::{every, filter, some};
pub use flatten::flatten;
pub use group::{group, group_map};
pub use index::{enumerate, range, reversed, view};
pub use map::map;
pub use membership::has;
pub use object::{items, keys, values};
pub use sorted::sorted;
pub use tuple::tuple;

/// Receives the upstream collection's content.
pub(crate) trait ContentHandler {
    /// The upstream list was replaced; `items` is its full content.
    fn reset(&self, items: &[Value]);

    /// `removed` elements at `index` were replaced with `plus`.
    fn splice(&self, index: usize, removed: usize, plus: &[Value]);
}

/// Feed `handler` from whatever list `source` currently emits.
pub(crate) fn watch_content(
    source: &Observer,
    scope: &Scope,
    handler: Rc<dyn ContentHandler>,
) -> Cancel {
    observe_each(source, scope, move |value, _| match value {
        Value::List(list) => {
            handler.reset(&list.to_vec());
            let forward = Rc::clone(&handler);
            let id = list.add_content_change_listener(move |plus, minus, index| {
                forward.splice(index, minus.len(), plus);
            });
            let list = list.downgrade();
            Cancel::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove_content_change_listener(id);
                }
            })
        }
        _ => {
            handler.reset(&[]);
            Cancel::noop()
        }
    })
}

/// Replace `len` elements of `output` at `start` with `next` using one
/// splice that skips the unchanged prefix and suffix.
pub(crate) fn replace_span(output: &List, start: usize, len: usize, next: &[Value]) {
    let current = output.slice(start..start + len);
    let prefix = current
        .iter()
        .zip(next)
        .take_while(|(a, b)| a.same(b))
        .count();
    let suffix = current[prefix..]
        .iter()
        .rev()
        .zip(next[prefix..].iter().rev())
        .take_while(|(a, b)| a.same(b))
        .count();
    let removed = current.len() - prefix - suffix;
    let inserted = &next[prefix..next.len() - suffix];
    output.splice(start + prefix, removed, inserted.iter().cloned());
}

/// Replace the whole content of `output` with `next`.
pub(crate) fn reconcile(output: &List, next: &[Value]) {
    replace_span(output, 0, output.len(), next);
}

/// A list observer: build the handler for a fresh output list, start it,
/// then emit the populated output.
pub(crate) fn list_observer<H>(
    source: Observer,
    build: impl Fn(&List, &Scope) -> Rc<H> + 'static,
) -> Observer
where
    H: ContentHandler + 'static,
{
    Rc::new(move |emit: Emit, scope: &Scope| {
        let output = List::new();
        let handler = build(&output, scope);
        let cancel = watch_content(&source, scope, Rc::clone(&handler) as Rc<dyn ContentHandler>);
        emit(Value::List(output));
        Cancel::join([cancel, Cancel::new(move || drop(handler))])
    })
}
