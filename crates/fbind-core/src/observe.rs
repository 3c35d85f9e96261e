#![forbid(unsafe_code)]

//! Listener registration over arbitrary [`Value`]s.
//!
//! Observers receive plain values and cannot know up front whether they are
//! observable. These functions dispatch to [`Object`](crate::Object) or
//! [`List`](crate::List) and fail with [`UnobservableTarget`] otherwise.
//! Removal never fails.

use crate::change::ListenerId;
use crate::error::UnobservableTarget;
use crate::value::Value;

fn unobservable(target: &Value, key: Option<&str>) -> UnobservableTarget {
    UnobservableTarget {
        kind: target.kind_name(),
        key: key.map(str::to_owned),
    }
}

/// Register a listener for `key` on an object, or for `length` on a list.
pub fn add_property_change_listener(
    target: &Value,
    key: &str,
    listener: impl Fn(&Value) + 'static,
) -> Result<ListenerId, UnobservableTarget> {
    match target {
        Value::Object(object) => Ok(object.add_property_change_listener(key, listener)),
        Value::List(list) if key == "length" => Ok(list.add_length_change_listener(listener)),
        _ => Err(unobservable(target, Some(key))),
    }
}

/// Before-change counterpart of [`add_property_change_listener`].
pub fn add_before_property_change_listener(
    target: &Value,
    key: &str,
    listener: impl Fn(&Value) + 'static,
) -> Result<ListenerId, UnobservableTarget> {
    match target {
        Value::Object(object) => Ok(object.add_before_property_change_listener(key, listener)),
        Value::List(list) if key == "length" => {
            Ok(list.add_before_length_change_listener(listener))
        }
        _ => Err(unobservable(target, Some(key))),
    }
}

pub fn remove_property_change_listener(target: &Value, key: &str, id: ListenerId) {
    match target {
        Value::Object(object) => object.remove_property_change_listener(key, id),
        Value::List(list) if key == "length" => list.remove_length_change_listener(id),
        _ => {}
    }
}

pub fn remove_before_property_change_listener(target: &Value, key: &str, id: ListenerId) {
    match target {
        Value::Object(object) => object.remove_before_property_change_listener(key, id),
        Value::List(list) if key == "length" => list.remove_before_length_change_listener(id),
        _ => {}
    }
}

/// Register a content change listener on a list.
pub fn add_content_change_listener(
    target: &Value,
    listener: impl Fn(&[Value], &[Value], usize) + 'static,
) -> Result<ListenerId, UnobservableTarget> {
    match target {
        Value::List(list) => Ok(list.add_content_change_listener(listener)),
        _ => Err(unobservable(target, None)),
    }
}

pub fn remove_content_change_listener(target: &Value, id: ListenerId) {
    if let Value::List(list) = target {
        list.remove_content_change_listener(id);
    }
}
