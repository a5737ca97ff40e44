use std::{cell::RefCell, rc::Rc};

use hyperlambda::{
    Engine, ErrorKind, HyperlambdaError, Node, SlotRegistry, resources::ResourceStack,
};

type Log = Rc<RefCell<Vec<&'static str>>>;

/// Records its release in a shared log.
struct Tracked {
    name: &'static str,
    log: Log,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.borrow_mut().push(self.name);
    }
}

fn tracked(name: &'static str, log: &Log) -> Tracked {
    Tracked {
        name,
        log: Rc::clone(log),
    }
}

#[test]
fn stack_is_last_in_first_out() {
    let mut stack = ResourceStack::new();
    stack.push(1);
    stack.push(2);
    assert_eq!(stack.peek(), Some(&2));
    assert_eq!(stack.pop(), Some(2));
    assert_eq!(stack.pop(), Some(1));
    assert!(stack.is_empty());
}

#[test]
fn stack_scope_releases_on_success_and_error() {
    let log: Log = Rc::default();
    let mut stack = ResourceStack::new();

    let result: Result<(), &str> = stack.scope(tracked("ok", &log), |stack| {
        assert_eq!(stack.peek().map(|t| t.name), Some("ok"));
        Ok(())
    });
    assert!(result.is_ok());

    let result: Result<(), &str> = stack.scope(tracked("failing", &log), |_| Err("boom"));
    assert_eq!(result, Err("boom"));
    assert!(stack.is_empty());
    assert_eq!(*log.borrow(), ["ok", "failing"]);
}

#[test]
fn nested_scopes_release_innermost_first_on_error() {
    let log: Log = Rc::default();
    let mut session = Engine::new().session();

    let result = session.scope(tracked("A", &log), |session| {
        session.scope(tracked("B", &log), |session| {
            assert_eq!(session.peek::<Tracked>().map(|t| t.name), Some("B"));
            Err::<(), _>(HyperlambdaError::UnknownSlot {
                name: "failing".to_string(),
            })
        })
    });

    assert_eq!(result.map_err(|err| err.kind()), Err(ErrorKind::UnknownSlot));
    assert_eq!(*log.borrow(), ["B", "A"]);
    assert!(session.peek::<Tracked>().is_none());
}

#[test]
fn peek_sees_innermost_resource_of_each_type() {
    let mut session = Engine::new().session();
    session
        .scope(String::from("outer"), |session| {
            session.scope(7_u32, |session| {
                session.scope(String::from("inner"), |session| {
                    assert_eq!(session.peek::<String>().map(String::as_str), Some("inner"));
                    assert_eq!(session.peek::<u32>(), Some(&7));
                    Ok(())
                })?;
                assert_eq!(session.peek::<String>().map(String::as_str), Some("outer"));
                Ok(())
            })
        })
        .expect("scopes");
    assert!(session.peek::<String>().is_none());
}

#[test]
fn slots_reach_resources_opened_by_their_callers() {
    struct Connection(Rc<RefCell<Vec<String>>>);

    let mut registry = SlotRegistry::with_builtins();
    registry
        .register_fn("query", |signaler, input| {
            let Some(connection) = signaler.peek::<Connection>() else {
                return Err(HyperlambdaError::UnknownSlot {
                    name: "connection".to_string(),
                });
            };
            connection.0.borrow_mut().push(input.name());
            Ok(())
        })
        .expect("register query");
    let engine = Engine::with_registry(registry);

    let statements = Rc::new(RefCell::new(Vec::new()));
    let lambda = Node::with_children("", [Node::new("query"), Node::new("query")]);
    let mut session = engine.session();
    session
        .scope(Connection(Rc::clone(&statements)), |session| {
            session.signal("eval", &lambda)
        })
        .expect("queries");
    assert_eq!(statements.borrow().len(), 2);

    let err = session.signal("eval", &lambda).expect_err("no connection");
    assert_eq!(err.kind(), ErrorKind::UnknownSlot);
}
