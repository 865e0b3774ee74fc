/// Circular dependency detection tests
///
/// The resolving stack reports the full chain, is unwound after failures and
/// panics, and is never shared between threads or containers.

use ferrous_kernel::{Arguments, Container, DiError, DiResult, Injectable, Key, Parameter, Resolver};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Barrier};

struct Left;
struct Right;

impl Injectable for Left {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::of::<Right>("right")]
    }

    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(Left)
    }
}

impl Injectable for Right {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::of::<Left>("left")]
    }

    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(Right)
    }
}

fn chain(error: DiError) -> Vec<String> {
    match error {
        DiError::Circular(chain) => chain,
        other => panic!("expected a circular dependency, got {other:?}"),
    }
}

#[test]
fn test_two_service_cycle_reports_chain() {
    let container = Container::new();
    container.singleton("a", |ctx| ctx.get::<u8>("b").map(|_| 0u8));
    container.singleton("b", |ctx| ctx.get::<u8>("a").map(|_| 0u8));

    let error = container.get::<u8>("a").unwrap_err();
    assert_eq!(chain(error), ["a", "b", "a"]);
}

#[test]
fn test_self_dependency() {
    let container = Container::new();
    container.bind("self", |ctx| ctx.get::<u8>("self").map(|v| *v));

    assert_eq!(chain(container.get::<u8>("self").unwrap_err()), ["self", "self"]);
}

#[test]
fn test_autowired_cycle_names_types() {
    let container = Container::new();
    let error = container.resolve::<Left>().err().unwrap();

    let left = Key::of::<Left>().to_string();
    let right = Key::of::<Right>().to_string();
    assert_eq!(chain(error), vec![left.clone(), right, left]);
}

#[test]
fn test_cycle_through_alias_uses_canonical_keys() {
    let container = Container::new();
    container.alias("first", "a");
    container.singleton("a", |ctx| ctx.get::<u8>("first").map(|v| *v));

    assert_eq!(chain(container.get::<u8>("a").unwrap_err()), ["a", "a"]);
}

#[test]
fn test_stack_is_empty_after_failure() {
    let container = Container::new();
    container.singleton("a", |ctx| ctx.get::<u8>("b").map(|v| *v));
    container.singleton("b", |ctx| ctx.get::<u8>("missing").map(|v| *v));

    assert!(container.get::<u8>("a").is_err());
    assert!(container.resolving().is_empty());

    // A later, valid resolution of the same keys is not reported as a cycle.
    container.instance("missing", 9u8);
    assert_eq!(*container.get::<u8>("a").unwrap(), 9);
}

#[test]
fn test_stack_is_empty_after_panic() {
    let container = Container::new();
    container.bind("explodes", |_| -> DiResult<u8> { panic!("factory failed") });

    let result = catch_unwind(AssertUnwindSafe(|| container.get::<u8>("explodes")));
    assert!(result.is_err());
    assert!(container.resolving().is_empty());

    container.bind("explodes", |_| Ok(1u8));
    assert_eq!(*container.get::<u8>("explodes").unwrap(), 1);
}

#[test]
fn test_resolving_lists_keys_outermost_first() {
    let container = Container::new();
    let observer = container.clone();
    container.bind("outer", |ctx| ctx.get::<Vec<String>>("inner").map(|v| (*v).clone()));
    container.bind("inner", move |_| {
        Ok(observer.resolving().iter().map(|k| k.to_string()).collect::<Vec<_>>())
    });

    let seen = container.get::<Vec<String>>("outer").unwrap();
    assert_eq!(*seen, ["outer", "inner"]);
}

#[test]
fn test_threads_do_not_share_resolving_stack() {
    let container = Container::new();
    let barrier = Arc::new(Barrier::new(2));
    let gate = barrier.clone();
    container.bind("shared", move |_| {
        // Both threads are inside the same key's factory at this point.
        gate.wait();
        Ok(1u8)
    });

    crossbeam_utils::thread::scope(|s| {
        let first = s.spawn(|_| container.get::<u8>("shared"));
        let second = s.spawn(|_| container.get::<u8>("shared"));
        assert_eq!(*first.join().unwrap().unwrap(), 1);
        assert_eq!(*second.join().unwrap().unwrap(), 1);
    })
    .unwrap();
}

#[test]
fn test_containers_do_not_share_resolving_stack() {
    let outer = Container::new();
    let inner = Container::new();
    inner.bind("x", |_| Ok(2u8));

    let nested = inner.clone();
    outer.bind("x", move |_| nested.get::<u8>("x").map(|v| *v + 1));

    assert_eq!(*outer.get::<u8>("x").unwrap(), 3);
}

#[test]
fn test_depth_limit() {
    // Deep recursion needs a larger stack than the test harness default.
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| {
            let container = Container::new();
            for n in 0..1100u32 {
                container.bind(format!("n{n}"), move |ctx| ctx.get::<u32>(format!("n{}", n + 1)).map(|v| *v));
            }
            container.get::<u32>("n0")
        })
        .unwrap();

    assert_eq!(handle.join().unwrap().unwrap_err(), DiError::DepthExceeded(1024));
}
