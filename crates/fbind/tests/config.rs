#![forbid(unsafe_code)]

//! Integration tests: engine configuration and dispatch depth limits.

use std::io::Write;

use fbind::{DepthPolicy, EngineConfig, List, Value};

/// Mirror every content change of `from` into `to` without any reentrancy
/// check, so a pair of mirrors recurses until the depth limit stops it.
fn unguarded_mirror(from: &List, to: &List) {
    let to = to.downgrade();
    from.add_content_change_listener(move |plus, minus, index| {
        if let Some(to) = to.upgrade() {
            to.splice(index, minus.len(), plus.iter().cloned());
        }
    });
}

/// Mirror that skips changes made while the other side is dispatching.
fn guarded_mirror(from: &List, to: &List) {
    let to = to.downgrade();
    from.add_content_change_listener(move |plus, minus, index| {
        if let Some(to) = to.upgrade() {
            if !to.is_active() {
                to.splice(index, minus.len(), plus.iter().cloned());
            }
        }
    });
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "max_dispatch_depth = 16").expect("write");
    writeln!(file, "on_depth_exceeded = \"panic\"").expect("write");
    let config = EngineConfig::load(file.path()).expect("valid config");
    assert_eq!(config.max_dispatch_depth, 16);
    assert_eq!(config.on_depth_exceeded, DepthPolicy::Panic);
}

#[test]
fn guarded_mirrors_converge_once() {
    let a = List::new();
    let b = List::new();
    guarded_mirror(&a, &b);
    guarded_mirror(&b, &a);
    a.push([Value::from(10), Value::from(20), Value::from(30)]);
    assert_eq!(b.to_vec(), a.to_vec());
    assert_eq!(a.len(), 3);
}

#[test]
fn skip_policy_stops_runaway_cycles() {
    let previous = EngineConfig {
        max_dispatch_depth: 8,
        on_depth_exceeded: DepthPolicy::Skip,
    }
    .install();
    let a = List::new();
    let b = List::new();
    unguarded_mirror(&a, &b);
    unguarded_mirror(&b, &a);
    a.push([Value::from(1)]);
    assert!(a.len() > 1, "the cycle ran for a while");
    assert!(a.len() <= 8 && b.len() <= 8, "and stopped at the limit");
    previous.install();
}

#[test]
#[should_panic(expected = "dispatch depth limit")]
fn panic_policy_surfaces_runaway_cycles() {
    EngineConfig::from_toml_str("max_dispatch_depth = 4\non_depth_exceeded = \"panic\"")
        .expect("valid config")
        .install();
    let a = List::new();
    let b = List::new();
    unguarded_mirror(&a, &b);
    unguarded_mirror(&b, &a);
    a.push([Value::from(1)]);
}
