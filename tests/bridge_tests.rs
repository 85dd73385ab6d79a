//! End-to-end tests for contexts, bindings and registry pruning.

use std::cell::Cell;
use std::rc::Rc;

use tinybridge::{Bridge, BridgeError, NativeError, ScriptContext, ScriptValue, Signature};

fn shape_of(signature: &str) -> tinybridge::SignatureHash {
    Signature::parse(signature).unwrap().shape_hash()
}

// ============================================================================
// Binding and calling
// ============================================================================

#[test]
fn bound_closure_doubles() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("double(int): int", |x: i64| x * 2).unwrap();
    ctx.compile("func run(n: int): int { return double(n) }").unwrap();

    assert_eq!(ctx.call_function::<i64, _>("run", (21,)), 42);
    assert_eq!(ctx.call_function::<i64, _>("run", (-4,)), -8);
}

#[test]
fn same_name_different_contexts() {
    let bridge = Bridge::new();
    let source = "func hello(): str { return greet() }";

    let mut c1 = ScriptContext::new(&bridge);
    let mut c2 = ScriptContext::new(&bridge);
    c1.bind_function("greet(): str", || "A").unwrap();
    c2.bind_function("greet(): str", || "B").unwrap();
    c1.compile(source).unwrap();
    c2.compile(source).unwrap();

    assert_eq!(c1.call_function::<String, _>("hello", ()), "A");
    assert_eq!(c2.call_function::<String, _>("hello", ()), "B");
    assert_eq!(bridge.registry_len(shape_of("greet(): str")), 2);
}

#[test]
fn destroyed_context_never_leaks_into_its_successor() {
    let bridge = Bridge::new();
    let source = "func hello(): str { return greet() }";

    let mut c1 = ScriptContext::new(&bridge);
    c1.bind_function("greet(): str", || "A").unwrap();
    let mut c2 = ScriptContext::new(&bridge);
    c2.bind_function("greet(): str", || "B").unwrap();
    let old_id = c1.id();
    drop(c1);

    // Reuses c1's slot with a new generation.
    let mut c3 = ScriptContext::new(&bridge);
    assert_ne!(c3.id(), old_id);
    assert!(!bridge.is_live(old_id));
    c3.bind_function("greet(): str", || "C").unwrap();

    c2.compile(source).unwrap();
    c3.compile(source).unwrap();
    assert_eq!(c3.call_function::<String, _>("hello", ()), "C");
    assert_eq!(c2.call_function::<String, _>("hello", ()), "B");
    // c1's entry was pruned when c3 bound.
    assert_eq!(bridge.registry_len(shape_of("greet(): str")), 2);
}

#[test]
fn rebinding_replaces_closure() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("answer(): int", || 1).unwrap();
    ctx.compile("func get(): int { return answer() }").unwrap();
    assert_eq!(ctx.call_function::<i64, _>("get", ()), 1);

    ctx.bind_function("answer(): int", || 2).unwrap();
    assert_eq!(ctx.call_function::<i64, _>("get", ()), 2);
    assert_eq!(bridge.registry_len(shape_of("answer(): int")), 1);
}

#[test]
fn closures_keep_captured_state() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    ctx.bind_function("hit(): void", move || counter.set(counter.get() + 1))
        .unwrap();
    ctx.compile("func run() { hit(); hit(); hit() }").unwrap();

    ctx.call_function::<(), _>("run", ());
    assert_eq!(hits.get(), 3);
}

#[test]
fn mixed_argument_types() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("describe(str, int, float, bool): str", |name: String, n: i32, f: f32, flag: bool| {
        format!("{name}:{n}:{f}:{flag}")
    })
    .unwrap();
    ctx.compile("func run(): str { return describe(\"x\", 3, 1.5, true) }")
        .unwrap();

    assert_eq!(ctx.call_function::<String, _>("run", ()), "x:3:1.5:true");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn missing_function_returns_default() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.compile("func present(): int { return 5 }").unwrap();

    assert_eq!(ctx.call_function::<i64, _>("absent", ()), 0);
    assert_eq!(ctx.call_function::<String, _>("absent", ()), "");
    assert!(matches!(
        ctx.try_call_function("absent", ()),
        Err(BridgeError::UnresolvedFunction { name }) if name == "absent"
    ));
}

#[test]
fn failed_compile_keeps_previous_program_and_bindings() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("seven(): int", || 7).unwrap();
    ctx.compile("func get(): int { return seven() }").unwrap();

    let err = ctx.compile("func get(): int { return seven( }").unwrap_err();
    assert!(!err.to_string().is_empty());

    assert!(ctx.is_compiled());
    assert_eq!(ctx.call_function::<i64, _>("get", ()), 7);
    assert_eq!(bridge.registry_len(shape_of("seven(): int")), 1);
}

#[test]
fn unknown_function_in_source_is_a_compile_error() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    assert!(ctx.compile("func f() { nowhere() }").is_err());
    assert!(!ctx.has_function("f"));
}

#[test]
fn deeply_nested_source_is_a_compile_error() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.compile("func f(): int { return 1 }").unwrap();

    let n = 2000;
    let source = format!("func f(): int {{ return {}1{} }}", "(".repeat(n), ")".repeat(n));
    let err = ctx.compile(&source).unwrap_err();
    assert!(err.to_string().contains("nesting too deep"));
    assert_eq!(ctx.call_function::<i64, _>("f", ()), 1);
}

#[test]
fn native_failure_aborts_the_call() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("check(int): int", |n: i64| {
        if n < 0 {
            Err(NativeError::other("negative"))
        } else {
            Ok(n)
        }
    })
    .unwrap();
    ctx.compile("func run(n: int): int { return check(n) + 1 }").unwrap();

    assert_eq!(ctx.call_function::<i64, _>("run", (4,)), 5);
    assert_eq!(ctx.call_function::<i64, _>("run", (-1,)), 0);
    assert!(matches!(
        ctx.try_call_function("run", (-1,)),
        Err(BridgeError::Runtime(_))
    ));
}

// ============================================================================
// Pruning
// ============================================================================

#[test]
fn prune_only_removes_dead_contexts() {
    let bridge = Bridge::new();
    let mut keep = ScriptContext::new(&bridge);
    keep.bind_function("a(): int", || 1).unwrap();
    keep.bind_function("b(): int", || 2).unwrap();
    keep.bind_function("name(): str", || "keep").unwrap();

    {
        let mut gone = ScriptContext::new(&bridge);
        gone.bind_function("a(): int", || 3).unwrap();
        gone.bind_function("name(): str", || "gone").unwrap();
    }
    assert_eq!(bridge.live_contexts(), 1);
    assert_eq!(bridge.registry_count(), 2);
    assert_eq!(bridge.registry_len(shape_of("a(): int")), 3);

    assert_eq!(bridge.prune(), 2);
    assert_eq!(bridge.registry_len(shape_of("a(): int")), 2);
    assert_eq!(bridge.registry_len(shape_of("name(): str")), 1);
    assert_eq!(bridge.prune(), 0);

    keep.compile("func sum(): int { return a() + b() }").unwrap();
    assert_eq!(keep.call_function::<i64, _>("sum", ()), 3);
}

#[test]
fn bridges_are_isolated() {
    let first = Bridge::new();
    let second = Bridge::new();
    let mut a = ScriptContext::new(&first);
    let _b = ScriptContext::new(&second);
    a.bind_function("one(): int", || 1).unwrap();

    assert_eq!(first.registry_count(), 1);
    assert_eq!(second.registry_count(), 0);
    assert_eq!(second.live_contexts(), 1);
}

#[test]
fn globals_flow_both_ways() {
    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_global_variable("base", "int", 10).unwrap();
    ctx.compile("var total = 0\nfunc add(n: int) { total = total + base + n }")
        .unwrap();

    ctx.call_function::<(), _>("add", (5,));
    assert_eq!(ctx.global("total"), Some(ScriptValue::Int(15)));
}
