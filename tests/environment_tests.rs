use std::collections::HashMap;

use minipy::environment::Environment;
use minipy::evaluator::Value;
use pretty_assertions::assert_eq;

#[test]
fn global_writes_land_in_the_global_frame() {
    let mut env = Environment::new();
    env.set("x", Value::Int(1));

    assert_eq!(env.get("x"), Some(Value::Int(1)));
    assert_eq!(env.global("x"), Some(Value::Int(1)));
}

#[test]
fn reads_fall_back_from_local_to_global() {
    let mut env = Environment::new();
    env.set("x", Value::Int(1));

    env.push_frame(HashMap::new());
    assert_eq!(env.get("x"), Some(Value::Int(1)));
}

#[test]
fn local_bindings_shadow_globals_without_touching_them() {
    let mut env = Environment::new();
    env.set("x", Value::Int(1));

    env.push_frame(HashMap::new());
    env.set("x", Value::Int(2));
    assert_eq!(env.get("x"), Some(Value::Int(2)));
    assert_eq!(env.global("x"), Some(Value::Int(1)));

    env.pop_frame();
    assert_eq!(env.get("x"), Some(Value::Int(1)));
}

#[test]
fn frames_do_not_chain_into_enclosing_locals() {
    let mut env = Environment::new();
    env.push_frame(HashMap::new());
    env.set("outer_only", Value::Int(7));

    env.push_frame(HashMap::new());
    assert_eq!(env.get("outer_only"), None);

    env.pop_frame();
    assert_eq!(env.get("outer_only"), Some(Value::Int(7)));
}

#[test]
fn popping_a_frame_releases_its_bindings() {
    let mut env = Environment::new();
    env.push_frame(HashMap::new());
    env.set("temp", Value::Bool(true));
    env.pop_frame();

    assert_eq!(env.get("temp"), None);
    assert_eq!(env.frame_depth(), 0);
}

#[test]
fn parameter_frames_seed_their_bindings() {
    let mut env = Environment::new();
    let mut frame = HashMap::new();
    frame.insert("a".to_string(), Value::Int(10));
    frame.insert("b".to_string(), Value::Str("hi".to_string()));

    env.push_frame(frame);
    assert_eq!(env.frame_depth(), 1);
    assert_eq!(env.get("a"), Some(Value::Int(10)));
    assert_eq!(env.get("b"), Some(Value::Str("hi".to_string())));
}
