// tests/equality_and_values.rs

use scopewatch::{EqualityMode, Value, are_equal};

#[test]
fn reference_mode_compares_primitives_by_value() {
    assert!(are_equal(&Value::from(1), &Value::from(1.0), EqualityMode::Reference));
    assert!(are_equal(&Value::from("a"), &Value::from("a"), EqualityMode::Reference));
    assert!(are_equal(&Value::Undefined, &Value::Undefined, EqualityMode::Reference));
    assert!(!are_equal(&Value::Null, &Value::Undefined, EqualityMode::Reference));
    assert!(!are_equal(&Value::from(0), &Value::from(false), EqualityMode::Reference));
}

#[test]
fn nan_equals_nan_in_both_modes() {
    let nan = Value::from(f64::NAN);
    assert!(are_equal(&nan, &Value::from(f64::NAN), EqualityMode::Reference));
    assert!(are_equal(&nan, &Value::from(f64::NAN), EqualityMode::Deep));
}

#[test]
fn reference_mode_compares_containers_by_identity() {
    let list = Value::array([1, 2]);
    let alias = list.clone();
    let copy = Value::array([1, 2]);

    assert!(are_equal(&list, &alias, EqualityMode::Reference));
    assert!(!are_equal(&list, &copy, EqualityMode::Reference));
    assert!(are_equal(&list, &copy, EqualityMode::Deep));
}

#[test]
fn deep_mode_recurses_into_nested_containers() {
    let a = Value::object([("items", Value::array([Value::object([("x", 1)])]))]);
    let b = Value::object([("items", Value::array([Value::object([("x", 1)])]))]);
    let c = Value::object([("items", Value::array([Value::object([("x", 2)])]))]);

    assert!(are_equal(&a, &b, EqualityMode::Deep));
    assert!(!are_equal(&a, &c, EqualityMode::Deep));
    assert!(!are_equal(&a, &Value::array(Vec::<Value>::new()), EqualityMode::Deep));
}

#[test]
fn equality_mode_from_bool() {
    assert_eq!(EqualityMode::from(true), EqualityMode::Deep);
    assert_eq!(EqualityMode::from(false), EqualityMode::Reference);
    assert_eq!(EqualityMode::default(), EqualityMode::Reference);
}

#[test]
fn cyclic_values_compare_clone_and_print() {
    let a = Value::object([("name", "a")]);
    a.as_object().expect("object").insert("me", a.clone());
    let b = Value::object([("name", "a")]);
    b.as_object().expect("object").insert("me", b.clone());

    assert!(are_equal(&a, &b, EqualityMode::Deep));

    let copy = a.deep_clone();
    assert!(!are_equal(&a, &copy, EqualityMode::Reference));
    assert!(are_equal(&a, &copy, EqualityMode::Deep));
    // The clone points at itself, not at the original.
    let inner = copy.as_object().and_then(|o| o.get("me")).expect("cycle");
    assert!(are_equal(&inner, &copy, EqualityMode::Reference));

    assert_eq!(format!("{a:?}"), r#"{"me": {Circular}, "name": "a"}"#);
}

#[test]
fn deep_clone_preserves_shared_structure() {
    let shared = Value::array([1]);
    let parent = Value::array([shared.clone(), shared.clone()]);

    let copy = parent.deep_clone();
    let items = copy.as_array().expect("array").to_vec();

    assert!(are_equal(&items[0], &items[1], EqualityMode::Reference));
    assert!(!are_equal(&items[0], &shared, EqualityMode::Reference));
}

#[test]
fn shallow_clone_copies_one_level() {
    let inner = Value::object([("x", 1)]);
    let list = Value::array([inner.clone()]);

    let copy = list.shallow_clone();
    list.as_array().expect("array").push(2);

    assert_eq!(copy.as_array().expect("array").len(), 1);
    let first = copy.as_array().and_then(|a| a.get(0)).expect("item");
    assert!(are_equal(&first, &inner, EqualityMode::Reference));
}

#[test]
fn array_set_pads_with_undefined() {
    let list = Value::array([1]);
    list.as_array().expect("array").set(3, 4);

    assert_eq!(
        list,
        Value::array([Value::from(1), Value::Undefined, Value::Undefined, Value::from(4)])
    );
}

#[test]
fn converts_from_json() {
    let json = serde_json::json!({
        "name": "Jane",
        "tags": ["a", "b"],
        "age": 30,
        "admin": false,
        "manager": null
    });

    let value = Value::from(json);
    let object = value.as_object().expect("object");

    assert_eq!(object.get("name"), Some(Value::from("Jane")));
    assert_eq!(object.get("tags"), Some(Value::array(["a", "b"])));
    assert_eq!(object.get("age"), Some(Value::from(30)));
    assert_eq!(object.get("admin"), Some(Value::Bool(false)));
    assert_eq!(object.get("manager"), Some(Value::Null));
    assert_eq!(object.keys(), vec!["admin", "age", "manager", "name", "tags"]);
}

#[test]
fn option_converts_none_to_null() {
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::from("x"));
}

#[test]
fn type_names() {
    assert_eq!(Value::Undefined.type_name(), "undefined");
    assert_eq!(Value::from(1).type_name(), "number");
    assert_eq!(Value::array([1]).type_name(), "array");
    assert_eq!(Value::object([("a", 1)]).type_name(), "object");
}
