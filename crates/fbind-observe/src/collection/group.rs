#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use fbind_core::{List, Object, Value};
use indexmap::IndexMap;

use super::relation::Relations;
use super::{ContentHandler, list_observer, reconcile};
use crate::observer::{Cancel, Emit, Observer, Scope};
use crate::primitive::key_string;

/// One bucket: its key and the list of members, reused across regroupings.
struct Bucket {
    key: Value,
    members: List,
    tuple: List,
}

/// Inputs partitioned by key, buckets in first-occurrence order.
fn partition(inputs: &[Value], keys: &[Value]) -> Vec<(Value, Vec<Value>)> {
    let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
    for (input, key) in inputs.iter().zip(keys) {
        match groups.iter_mut().find(|(k, _)| k.same(key)) {
            Some((_, members)) => members.push(input.clone()),
            None => groups.push((key.clone(), vec![input.clone()])),
        }
    }
    groups
}

/// Shared regrouping state for `groupBlock` and `groupMapBlock`.
struct Grouping {
    relations: Relations,
    buckets: RefCell<Vec<Bucket>>,
    publish: Box<dyn Fn(&[Bucket])>,
}

impl Grouping {
    fn new(
        by: &Observer,
        scope: &Scope,
        publish: impl Fn(&[Bucket]) + 'static,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            Self {
                relations: Relations::new(
                    Rc::clone(by),
                    scope,
                    Rc::new(move |_: usize, _: &Value, _: &Value| {
                        if let Some(this) = this.upgrade() {
                            this.regroup();
                        }
                    }),
                ),
                buckets: RefCell::new(Vec::new()),
                publish: Box::new(publish),
            }
        })
    }

    fn regroup(&self) {
        let groups = partition(&self.relations.inputs(), &self.relations.outputs());
        let mut previous = std::mem::take(&mut *self.buckets.borrow_mut());
        let mut next = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let bucket = match previous.iter().position(|b| b.key.same(&key)) {
                Some(found) => previous.swap_remove(found),
                None => {
                    let members_list = List::new();
                    let tuple = List::from(vec![key.clone(), Value::List(members_list.clone())]);
                    Bucket {
                        key,
                        members: members_list,
                        tuple,
                    }
                }
            };
            reconcile(&bucket.members, &members);
            next.push(bucket);
        }
        (self.publish)(&next);
        *self.buckets.borrow_mut() = next;
    }
}

impl ContentHandler for Grouping {
    fn reset(&self, items: &[Value]) {
        self.relations.reset(items);
        self.regroup();
    }

    fn splice(&self, index: usize, removed: usize, plus: &[Value]) {
        self.relations.splice(index, removed, plus);
        self.regroup();
    }
}

/// `collection.group{by}`: a list of `[key, members]` tuples.
pub fn group(collection: Observer, by: Observer) -> Observer {
    list_observer(collection, move |output, scope| {
        let output = output.clone();
        Grouping::new(&by, scope, move |buckets| {
            let tuples: Vec<Value> = buckets.iter().map(|b| Value::List(b.tuple.clone())).collect();
            reconcile(&output, &tuples);
        })
    })
}

/// `collection.groupMap{by}`: an object from key string to members list.
///
/// Distinct keys with the same string form (`1` and `"1"`) share one entry
/// holding their members bucket by bucket, in first-occurrence order.
pub fn group_map(collection: Observer, by: Observer) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let output = Object::new();
        let target = output.clone();
        let merged: RefCell<AHashMap<String, List>> = RefCell::default();
        let grouping = Grouping::new(&by, scope, move |buckets| {
            let mut by_name: IndexMap<String, Vec<&Bucket>> = IndexMap::new();
            for bucket in buckets {
                by_name.entry(key_string(&bucket.key)).or_default().push(bucket);
            }
            merged
                .borrow_mut()
                .retain(|name, _| by_name.get(name).is_some_and(|group| group.len() > 1));
            let entries: Vec<(String, List)> = by_name
                .iter()
                .map(|(name, group)| match group.as_slice() {
                    [only] => (name.clone(), only.members.clone()),
                    _ => {
                        let list = merged.borrow_mut().entry(name.clone()).or_default().clone();
                        let all: Vec<Value> =
                            group.iter().flat_map(|b| b.members.to_vec()).collect();
                        reconcile(&list, &all);
                        (name.clone(), list)
                    }
                })
                .collect();
            for key in target.keys() {
                if !by_name.contains_key(&key) {
                    target.delete(&key);
                }
            }
            for (name, members) in entries {
                target.set(&name, Value::List(members));
            }
        });
        let watcher: Rc<dyn ContentHandler> = grouping.clone();
        let cancel = super::watch_content(&collection, scope, watcher);
        emit(Value::Object(output));
        Cancel::join([cancel, Cancel::new(move || drop(grouping))])
    })
}
