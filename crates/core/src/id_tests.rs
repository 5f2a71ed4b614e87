// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_new_and_as_str() {
    let id = TestId::new("abc");
    assert_eq!(id.as_str(), "abc");
    assert_eq!(id.to_string(), "abc");
}

#[test]
fn define_id_conversions_and_equality() {
    let owned: TestId = String::from("owned").into();
    let borrowed: TestId = "owned".into();
    assert_eq!(owned, borrowed);
    assert_eq!(owned, "owned");
    assert_eq!(owned, *"owned");
}

#[test]
fn define_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(TestId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
    let key = TestId::new("k");
    let borrowed: &str = key.borrow();
    assert_eq!(borrowed, "k");
}

#[test]
fn define_id_serializes_as_plain_string() {
    let json = serde_json::to_string(&TestId::new("hook-1")).unwrap();
    assert_eq!(json, "\"hook-1\"");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, "hook-1");
}

#[test]
fn derived_uuid_is_stable_per_input() {
    let a = derived_uuid(&["outgoing-1", "hook-a"]);
    let again = derived_uuid(&["outgoing-1", "hook-a"]);
    let other = derived_uuid(&["outgoing-1", "hook-b"]);
    assert_eq!(a, again);
    assert_ne!(a, other);
}

#[test]
fn derived_uuid_keeps_part_boundaries() {
    assert_ne!(derived_uuid(&["a/b", "c"]), derived_uuid(&["a", "b/c"]));
    assert_ne!(derived_uuid(&["ab", ""]), derived_uuid(&["a", "b"]));
    assert_ne!(derived_uuid(&["org/app", "build"]), derived_uuid(&["org", "app/build"]));
}
