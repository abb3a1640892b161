#![cfg(feature = "serde")]

//! JSON serialization shape tests (run with `--features serde`).

use obsv::{ObservableArray, ObservableMap, ObservableSet, ObservableVariable};

#[test]
fn variable_serializes_raw_value() {
    let obs = ObservableVariable::new("ov".to_string());
    assert_eq!(serde_json::to_string(&obs).unwrap(), "\"ov\"");
}

#[test]
fn array_serializes_as_element_sequence() {
    let obs = ObservableArray::new(vec!["oa".to_string()]);
    assert_eq!(serde_json::to_string(&obs).unwrap(), "[\"oa\"]");
}

#[test]
fn map_serializes_as_entry_sequence_with_last_write_winning() {
    let obs = ObservableMap::from(vec![("om", 123), ("om", 456)]);
    assert_eq!(serde_json::to_string(&obs).unwrap(), "[[\"om\",456]]");
}

#[test]
fn set_serializes_with_duplicates_collapsed() {
    let obs = ObservableSet::from(vec!["os", "os"]);
    assert_eq!(serde_json::to_string(&obs).unwrap(), "[\"os\"]");
}

#[test]
fn non_serializable_contributes_null() {
    let obs = ObservableVariable::new(42);
    obs.set_serializable(false);
    assert_eq!(serde_json::to_string(&obs).unwrap(), "null");

    let arr = ObservableArray::new(vec![1, 2]);
    arr.set_serializable(false);
    assert_eq!(serde_json::to_string(&arr).unwrap(), "null");
}

#[test]
fn observables_nest_inside_ordinary_structures() {
    let inner = ObservableArray::new(vec![1, 2]);
    let outer = vec![inner];
    assert_eq!(serde_json::to_string(&outer).unwrap(), "[[1,2]]");
}
