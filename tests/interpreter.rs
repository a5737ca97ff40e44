use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use hyperlambda::{
    Engine, EngineConfig, ErrorKind, HyperlambdaError, Node, SlotRegistry, Value, parser,
};

fn run(source: &str) -> Node {
    Engine::new()
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn run_error(source: &str) -> HyperlambdaError {
    run_error_with(&Engine::new(), source)
}

fn run_error_with(engine: &Engine, source: &str) -> HyperlambdaError {
    match engine.eval_source(source) {
        Ok(root) => panic!("expected error, received tree\n{}", root),
        Err(err) => err,
    }
}

/// Engine with a native `count` slot that increments the returned counter.
fn counting_engine() -> (Engine, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = SlotRegistry::with_builtins();
    let hits = Arc::clone(&counter);
    registry
        .register_fn("count", move |_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("register count");
    (Engine::with_registry(registry), counter)
}

fn child(root: &Node, name: &str) -> Node {
    root.child_named(name)
        .unwrap_or_else(|| panic!("expected a child named [{name}]"))
}

#[test]
fn set_copies_single_source_into_destination() {
    let root = run(
        r#"
.dest:old
set:x:../*/.dest
   .
      .dest:new
         item:1
"#,
    );
    let dest = child(&root, ".dest");
    assert_eq!(dest.value(), Some(Value::from("new")));
    assert_eq!(dest.child_count(), 1);
    assert_eq!(dest.children()[0].name(), "item");
}

#[test]
fn set_is_idempotent() {
    let root = parser::parse(
        r#"
.dest:old
set:x:../*/.dest
   .
      .dest:new
         item:1
"#,
    )
    .expect("parse");
    let mut session = Engine::new().session();
    let set = child(&root, "set");
    session.signal("set", &set).expect("first set");
    let once = root.deep_clone();
    session.signal("set", &set).expect("second set");
    assert!(root.structurally_eq(&once));
}

#[test]
fn set_with_childless_source_drops_destination_children() {
    let root = parser::parse(
        r#"
.dest:old
   a
   b
set:x:../*/.dest
   .
      .dest:new
"#,
    )
    .expect("parse");
    let mut session = Engine::new().session();
    let set = child(&root, "set");
    session.signal("set", &set).expect("first set");

    let dest = root.children()[0].clone();
    assert_eq!(dest.name(), ".dest");
    assert_eq!(dest.value(), Some(Value::from("new")));
    assert_eq!(dest.child_count(), 0);

    let once = root.deep_clone();
    session.signal("set", &set).expect("second set");
    assert!(root.structurally_eq(&once));
}

#[test]
fn set_without_source_clears_destination() {
    let root = run(
        r#"
.dest:old
   item
set:x:../*/.dest
"#,
    );
    let cleared = root.children()[0].clone();
    assert_eq!(cleared.name(), "");
    assert_eq!(cleared.value(), None);
    assert_eq!(cleared.child_count(), 0);
}

#[test]
fn set_rejects_more_than_one_source() {
    let err = run_error(
        r#"
.dest
set:x:../*/.dest
   .
      first
      second
"#,
    );
    assert_eq!(err.kind(), ErrorKind::TooManySources);
}

#[test]
fn set_requires_an_expression() {
    let err = run_error("set:not an expression\n");
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn add_appends_copies_to_every_destination() {
    let root = run(
        r#"
.dest
   existing
add:x:../*/.dest
   .
      one
      two
   .
      three
"#,
    );
    let names: Vec<String> = child(&root, ".dest")
        .children()
        .iter()
        .map(Node::name)
        .collect();
    assert_eq!(names, ["existing", "one", "two", "three"]);
}

#[test]
fn add_twice_appends_twice() {
    let root = parser::parse(
        r#"
.dest
   existing
add:x:../*/.dest
   .
      one
      two
"#,
    )
    .expect("parse");
    let mut session = Engine::new().session();
    let dest = child(&root, ".dest");
    let add = child(&root, "add");
    session.signal("add", &add).expect("first add");
    let after_one = dest.child_count();
    session.signal("add", &add).expect("second add");
    assert_eq!(after_one, 3);
    assert_eq!(dest.child_count() - after_one, 2);
}

#[test]
fn add_sources_are_copies() {
    let root = run(
        r#"
add:x:../*/.dest
   .
      item:1
.dest
"#,
    );
    let added = child(&root, ".dest").children()[0].clone();
    added.set_value(Some(Value::from(2)));
    let source = child(&root, "add").children()[0].children()[0].clone();
    assert_eq!(source.value(), Some(Value::from("1")));
}

#[test]
fn if_runs_lambda_when_condition_is_true() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source(
            r#"
if
   .:bool:true
   .lambda
      count
"#,
        )
        .expect("if");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn if_never_runs_lambda_when_condition_is_false() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source(
            r#"
.flag:bool:false
if
   .:x:../../*/.flag
   .lambda
      count
"#,
        )
        .expect("if");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn if_treats_missing_condition_value_as_false() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source(
            r#"
if
   .:x:../../*/.missing
   .lambda
      count
"#,
        )
        .expect("if");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn if_rejects_non_bool_condition() {
    let err = run_error(
        r#"
if
   .:int:1
   .lambda
"#,
    );
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn if_requires_two_children_ending_in_lambda() {
    let err = run_error("if\n   .:bool:true\n");
    assert_eq!(err.kind(), ErrorKind::Arity);

    let err = run_error("if\n   .:bool:true\n   body\n");
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn for_each_runs_body_once_per_match_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = SlotRegistry::with_builtins();
    let log = Arc::clone(&seen);
    registry
        .register_fn("record", move |_, input| {
            let current = input
                .parent()
                .and_then(|parent| parent.child_named(".dp"))
                .and_then(|dp| dp.value())
                .and_then(|value| value.as_node().map(Node::name));
            log.lock().expect("log").push(current.unwrap_or_default());
            Ok(())
        })
        .expect("register record");
    let root = Engine::with_registry(registry)
        .eval_source(
            r#"
.items
   bar1
   bar2
   bar3
for-each:x:../*/.items/*
   record
"#,
        )
        .expect("for-each");

    assert_eq!(*seen.lock().expect("log"), ["bar1", "bar2", "bar3"]);
    let body = child(&root, "for-each").children();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].name(), "record");
}

#[test]
fn for_each_over_nothing_never_runs() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source("for-each:x:../*/.nothing/*\n   count\n")
        .expect("for-each");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn for_each_body_can_update_matches_through_dp() {
    let root = run(
        r#"
.items
   a:1
   b:2
for-each:x:../*/.items/*
   set:x:@.dp/#
      .
         done:yes
"#,
    );
    let items = child(&root, ".items").children();
    assert!(items.iter().all(|item| item.has_name("done")));
}

#[test]
fn eval_skips_data_nodes_and_unknown_names() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source(
            r#"
.count
unknown
   count
count
"#,
        )
        .expect("eval");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn eval_with_expression_evaluates_matched_lambdas() {
    let (engine, counter) = counting_engine();
    engine
        .eval_source(
            r#"
.body
   count
   count
eval:x:../*/.body
"#,
        )
        .expect("eval");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn eval_skips_children_detached_by_an_earlier_sibling() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = SlotRegistry::with_builtins();
    registry
        .register_fn("drop-next", |_, input| {
            if let Some(next) = input.next_sibling() {
                next.detach();
            }
            Ok(())
        })
        .expect("register drop-next");
    let hits = Arc::clone(&counter);
    registry
        .register_fn("count", move |_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("register count");
    Engine::with_registry(registry)
        .eval_source("drop-next\ncount\ncount\n")
        .expect("eval");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn signal_round_trips_an_argument_through_return() {
    let root = run(
        r#"
slot:custom.echo
   .arguments
      value:int
   .lambda
      return:x:../*/.arguments/*/value
signal:custom.echo
   value:int:42
"#,
    );
    let invocation = child(&root, "signal");
    assert_eq!(invocation.value(), Some(Value::Int(42)));
    assert_eq!(invocation.child_count(), 0);
}

#[test]
fn return_children_replace_invocation_children() {
    let root = run(
        r#"
slot:custom.pair
   .lambda
      return
         first:1
         second:2
signal:custom.pair
"#,
    );
    let invocation = child(&root, "signal");
    let names: Vec<String> = invocation.children().iter().map(Node::name).collect();
    assert_eq!(names, ["first", "second"]);
    assert_eq!(invocation.value(), None);
}

#[test]
fn signal_never_mutates_the_stored_template() {
    let root = run(
        r#"
slot:custom.grow
   .lambda
      add:x:../*/return
         .
            item
      return
signal:custom.grow
signal:custom.grow
"#,
    );
    let invocations: Vec<Node> = root
        .children()
        .into_iter()
        .filter(|node| node.has_name("signal"))
        .collect();
    assert_eq!(invocations.len(), 2);
    for invocation in &invocations {
        let names: Vec<String> = invocation.children().iter().map(Node::name).collect();
        assert_eq!(names, ["item"]);
    }
}

#[test]
fn slot_without_lambda_fails_before_registering() {
    let root = parser::parse("slot:custom.x\n   .arguments\n").expect("parse");
    let mut session = Engine::new().session();
    let err = session.signal("eval", &root).expect_err("missing lambda");
    assert_eq!(err.kind(), ErrorKind::MissingLambda);
    assert!(session.definition("custom.x").is_none());
}

#[test]
fn slot_rejects_unexpected_children_and_native_names() {
    let err = run_error("slot:custom.x\n   .lambda\n   other\n");
    assert_eq!(err.kind(), ErrorKind::Shape);

    let err = run_error("slot:set\n   .lambda\n");
    assert_eq!(err.kind(), ErrorKind::DuplicateSlotName);

    let err = run_error("slot:custom.x\n   .lambda\n   .lambda\n");
    assert_eq!(err.kind(), ErrorKind::MissingLambda);
}

#[test]
fn redefining_a_user_slot_replaces_it() {
    let root = run(
        r#"
slot:custom.v
   .lambda
      return:one
slot:custom.v
   .lambda
      return:two
signal:custom.v
"#,
    );
    assert_eq!(child(&root, "signal").value(), Some(Value::from("two")));
}

#[test]
fn signal_of_unknown_slot_fails() {
    let err = run_error("signal:custom.y\n");
    assert_eq!(err.kind(), ErrorKind::UnknownSlot);
}

#[test]
fn signal_with_undeclared_argument_never_runs_body() {
    let (engine, counter) = counting_engine();
    let err = run_error_with(
        &engine,
        r#"
slot:custom.z
   .arguments
      known
   .lambda
      count
signal:custom.z
   unknown:1
"#,
    );
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn signal_checks_argument_names_before_resolving_expressions() {
    let err = run_error(
        r#"
.a:1
.a:2
slot:custom.z
   .arguments
      known
   .lambda
signal:custom.z
   unknown:x:../../*/.a
"#,
    );
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn rejected_signal_leaves_caller_arguments_untouched() {
    let mut session = Engine::new().session();
    let definition = parser::parse(
        r#"
slot:custom.typed
   .arguments
      value:int
      other
   .lambda
"#,
    )
    .expect("parse definition");
    session.signal("eval", &definition).expect("define");

    let call = parser::parse(
        r#"
.source:not a number
signal:custom.typed
   other:x:../../*/.source
   value:x:../../*/.source
"#,
    )
    .expect("parse call");
    let before = call.deep_clone();
    let err = session.signal("eval", &call).expect_err("type mismatch");
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert!(call.structurally_eq(&before));
    let arguments = child(&call, "signal").children();
    assert_eq!(arguments.len(), 2);
    assert!(
        arguments
            .iter()
            .all(|argument| matches!(argument.value(), Some(Value::Expression(_))))
    );
}

#[test]
fn nodes_refuse_to_adopt_their_ancestors() {
    let outer = Node::new("outer");
    let inner = Node::new("inner");
    outer.add(inner.clone());
    let result = panic::catch_unwind(AssertUnwindSafe(|| inner.add(outer.clone())));
    assert!(result.is_err());
    let result = panic::catch_unwind(AssertUnwindSafe(|| inner.insert(0, inner.clone())));
    assert!(result.is_err());
    assert!(inner.parent().is_some_and(|parent| parent.ptr_eq(&outer)));
    assert_eq!(inner.child_count(), 0);
}

#[test]
fn signal_rejects_arguments_when_none_are_declared() {
    let err = run_error(
        r#"
slot:custom.none
   .lambda
signal:custom.none
   anything
"#,
    );
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn signal_enforces_declared_arity_and_type() {
    let err = run_error(
        r#"
slot:custom.once
   .arguments
      value:int:1
   .lambda
signal:custom.once
   value:1
   value:2
"#,
    );
    assert_eq!(err.kind(), ErrorKind::Arity);

    let err = run_error(
        r#"
slot:custom.typed
   .arguments
      value:int
   .lambda
signal:custom.typed
   value:not a number
"#,
    );
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn signal_resolves_expression_arguments_at_call_site() {
    let root = run(
        r#"
.source:int:7
slot:custom.echo
   .arguments
      value
   .lambda
      return:x:../*/.arguments/*/value
signal:custom.echo
   value:x:../../*/.source
"#,
    );
    assert_eq!(child(&root, "signal").value(), Some(Value::Int(7)));
}

#[test]
fn return_outside_an_invocation_fails() {
    let err = run_error("return:1\n");
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn user_slots_are_scoped_to_their_session() {
    let engine = Engine::new();
    engine
        .eval_source("slot:custom.local\n   .lambda\n")
        .expect("define");
    let err = run_error_with(&engine, "signal:custom.local\n");
    assert_eq!(err.kind(), ErrorKind::UnknownSlot);
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let engine = Engine::new().with_config(EngineConfig::default().with_max_depth(32));
    let err = run_error_with(
        &engine,
        r#"
slot:custom.loop
   .lambda
      signal:custom.loop
signal:custom.loop
"#,
    );
    assert_eq!(err.kind(), ErrorKind::RecursionLimit);
}

#[test]
fn registry_rejects_duplicate_and_reserved_names() {
    let mut registry = SlotRegistry::with_builtins();
    let err = registry
        .register_fn("eval", |_, _| Ok(()))
        .expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::DuplicateSlotName);

    let err = registry
        .register_fn(".hidden", |_, _| Ok(()))
        .expect_err("reserved");
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[test]
fn builtins_document_their_arguments() {
    let registry = SlotRegistry::with_builtins();
    let arguments = registry.arguments("set").expect("set documents arguments");
    assert_eq!(arguments.child_count(), 2);
    assert!(registry.arguments("eval").is_none());
}

#[test]
fn engine_runs_programs_on_many_threads() {
    let engine = Engine::new();
    std::thread::scope(|scope| {
        for index in 0..4 {
            let engine = &engine;
            scope.spawn(move || {
                let source = format!(
                    "slot:custom.id\n   .lambda\n      return:int:{index}\nsignal:custom.id\n"
                );
                let root = engine.eval_source(&source).expect("threaded run");
                let invocation = root.child_named("signal").expect("signal node");
                assert_eq!(invocation.value(), Some(Value::Int(index)));
            });
        }
    });
}
