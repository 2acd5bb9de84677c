//! Exception dispatch tests
//!
//! These drive a [`CallStack`] the way an interpreter loop would and check
//! the transfers it hands back:
//! - Handler selection order and region nesting
//! - `finally` on every exit path, exactly once
//! - Masking by throws from handlers and `finally` blocks
//! - Propagation across frames, uncaught reporting, depth limits

use javelin_core::arith;
use javelin_core::{
    BinaryOp, CallStack, FrameStatus, Handler, KernelError, KernelOptions, ObjRef, Transfer, Value,
};
use javelin_types::{java_lang, TypeGraph, TypeGraphBuilder, TypeId};
use std::sync::Arc;

fn graph() -> Arc<TypeGraph> {
    Arc::new(
        TypeGraphBuilder::new()
            .with_java_lang()
            .class("app.RetryException", Some(java_lang::RUNTIME_EXCEPTION), &[])
            .build()
            .expect("graph builds"),
    )
}

fn class(stack: &CallStack, name: &str) -> TypeId {
    stack.graph().lookup(name).unwrap_or_else(|| panic!("missing {}", name))
}

fn instance(stack: &CallStack, name: &str, handle: u64) -> Value {
    Value::object(ObjRef::new(handle, class(stack, name)))
}

fn handler_pc(transfer: Transfer) -> (usize, TypeId) {
    match transfer {
        Transfer::EnterHandler { pc, exception, .. } => (pc, exception.class()),
        other => panic!("expected a handler, got {:?}", other),
    }
}

#[test]
fn test_first_matching_handler_wins_over_more_specific() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    let arithmetic = class(&stack, java_lang::ARITHMETIC_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack
        .enter_try(vec![Handler::catching(exception, 10), Handler::catching(arithmetic, 20)], None)
        .unwrap();

    let thrown = instance(&stack, java_lang::ARITHMETIC_EXCEPTION, 1);
    assert_eq!(handler_pc(stack.throw(thrown).unwrap()), (10, arithmetic));
    assert!(stack.current().unwrap().regions().is_empty());
}

#[test]
fn test_later_handler_used_when_earlier_does_not_match() {
    let mut stack = CallStack::new(graph());
    let arithmetic = class(&stack, java_lang::ARITHMETIC_EXCEPTION);
    let runtime = class(&stack, java_lang::RUNTIME_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack
        .enter_try(vec![Handler::catching(arithmetic, 10), Handler::catching(runtime, 20)], None)
        .unwrap();
    let thrown = instance(&stack, java_lang::NULL_POINTER_EXCEPTION, 1);
    assert_eq!(handler_pc(stack.throw(thrown).unwrap()).0, 20);
}

#[test]
fn test_inner_region_searched_before_outer() {
    let mut stack = CallStack::new(graph());
    let runtime = class(&stack, java_lang::RUNTIME_EXCEPTION);
    let npe = class(&stack, java_lang::NULL_POINTER_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(runtime, 30)], None).unwrap();
    stack.enter_try(vec![Handler::catching(npe, 5)], None).unwrap();

    let thrown = instance(&stack, java_lang::ARITHMETIC_EXCEPTION, 1);
    assert_eq!(handler_pc(stack.throw(thrown).unwrap()).0, 30);
    assert!(stack.current().unwrap().regions().is_empty());
}

#[test]
fn test_throw_from_catch_with_finally() {
    // try { throw IAE } catch (IAE) { throw ISE } finally { ... }
    let mut stack = CallStack::new(graph());
    let iae = class(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(iae, 10)], Some(50)).unwrap();

    let first = instance(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION, 1);
    assert_eq!(handler_pc(stack.throw(first).unwrap()).0, 10);

    let second = instance(&stack, java_lang::ILLEGAL_STATE_EXCEPTION, 2);
    assert_eq!(stack.throw(second).unwrap(), Transfer::EnterFinally { depth: 1, pc: 50 });
    assert_eq!(stack.current().unwrap().status(), FrameStatus::InFinally);

    match stack.end_finally().unwrap_err() {
        KernelError::Uncaught { exception_type, exception, .. } => {
            assert_eq!(exception_type, java_lang::ILLEGAL_STATE_EXCEPTION);
            assert_eq!(exception.reference().handle(), 2);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(stack.is_empty());
}

#[test]
fn test_throw_from_catch_reaches_outer_region_of_same_frame() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    let iae = class(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION);
    let ise = class(&stack, java_lang::ILLEGAL_STATE_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(exception, 80)], None).unwrap();
    stack.enter_try(vec![Handler::catching(iae, 10)], Some(50)).unwrap();

    stack.throw(instance(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION, 1)).unwrap();
    let finally = stack.throw(instance(&stack, java_lang::ILLEGAL_STATE_EXCEPTION, 2)).unwrap();
    assert_eq!(finally, Transfer::EnterFinally { depth: 1, pc: 50 });
    assert_eq!(handler_pc(stack.end_finally().unwrap()), (80, ise));
}

#[test]
fn test_handler_throw_skips_sibling_handlers() {
    // the region's own handlers no longer apply once one of them runs
    let mut stack = CallStack::new(graph());
    let iae = class(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION);
    let ise = class(&stack, java_lang::ILLEGAL_STATE_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack
        .enter_try(vec![Handler::catching(iae, 10), Handler::catching(ise, 20)], None)
        .unwrap();
    stack.throw(instance(&stack, java_lang::ILLEGAL_ARGUMENT_EXCEPTION, 1)).unwrap();
    let err = stack.throw(instance(&stack, java_lang::ILLEGAL_STATE_EXCEPTION, 2)).unwrap_err();
    assert!(matches!(err, KernelError::Uncaught { .. }));
}

#[test]
fn test_throw_from_finally_masks_pending_exception() {
    let mut stack = CallStack::new(graph());
    let runtime = class(&stack, java_lang::RUNTIME_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(runtime, 90)], None).unwrap();
    stack.enter_try(vec![], Some(50)).unwrap();

    let original = instance(&stack, java_lang::ARITHMETIC_EXCEPTION, 1);
    assert_eq!(stack.throw(original).unwrap(), Transfer::EnterFinally { depth: 1, pc: 50 });

    let replacement = instance(&stack, "app.RetryException", 2);
    match stack.throw(replacement).unwrap() {
        Transfer::EnterHandler { pc, exception, .. } => {
            assert_eq!(pc, 90);
            assert_eq!(exception.reference().handle(), 2);
        }
        other => panic!("unexpected transfer {:?}", other),
    }
}

#[test]
fn test_finally_once_on_normal_completion() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![], Some(50)).unwrap();

    assert_eq!(stack.leave(60).unwrap(), Transfer::EnterFinally { depth: 1, pc: 50 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::Jump { depth: 1, pc: 60 });
    assert!(stack.current().unwrap().regions().is_empty());
    assert!(stack.end_finally().is_err());
}

#[test]
fn test_finally_once_after_handled_exception() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(exception, 10)], Some(50)).unwrap();

    stack.throw(instance(&stack, java_lang::EXCEPTION, 1)).unwrap();
    assert_eq!(stack.leave(60).unwrap(), Transfer::EnterFinally { depth: 1, pc: 50 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::Jump { depth: 1, pc: 60 });
    assert_eq!(stack.current().unwrap().status(), FrameStatus::Running);
}

#[test]
fn test_handler_reports_whether_its_region_is_open() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    stack.enter_call("main").unwrap();
    // try { try { .. } catch (Exception) { .. } } finally { .. }
    stack.enter_try(vec![], Some(100)).unwrap();
    stack.enter_try(vec![Handler::catching(exception, 10)], None).unwrap();

    let open = match stack.throw(instance(&stack, java_lang::EXCEPTION, 1)).unwrap() {
        Transfer::EnterHandler { region_open, .. } => region_open,
        other => panic!("expected a handler, got {:?}", other),
    };
    assert!(!open);
    // the handler's region is gone, only the outer one remains
    assert_eq!(stack.current().unwrap().regions().len(), 1);
    stack.set_pc(50).unwrap();
    assert_eq!(stack.leave(200).unwrap(), Transfer::EnterFinally { depth: 1, pc: 100 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::Jump { depth: 1, pc: 200 });

    // a region with a finally stays open while its handler runs
    stack.enter_try(vec![Handler::catching(exception, 10)], Some(70)).unwrap();
    let open = match stack.throw(instance(&stack, java_lang::EXCEPTION, 2)).unwrap() {
        Transfer::EnterHandler { region_open, .. } => region_open,
        other => panic!("expected a handler, got {:?}", other),
    };
    assert!(open);
    assert_eq!(stack.leave(80).unwrap(), Transfer::EnterFinally { depth: 1, pc: 70 });
}

#[test]
fn test_finally_once_while_propagating() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(exception, 70)], None).unwrap();
    stack.enter_call("work").unwrap();
    stack.enter_try(vec![], Some(50)).unwrap();

    let thrown = instance(&stack, java_lang::EXCEPTION, 1);
    assert_eq!(stack.throw(thrown).unwrap(), Transfer::EnterFinally { depth: 2, pc: 50 });
    let transfer = stack.end_finally().unwrap();
    assert_eq!(transfer.depth(), 1);
    assert_eq!(transfer.pc(), Some(70));
    let retired = stack.last_retired().unwrap();
    assert_eq!(retired.method(), "work");
    assert_eq!(retired.status(), FrameStatus::Propagating);
}

#[test]
fn test_fault_propagates_to_caller_frame() {
    let mut stack = CallStack::new(graph());
    let arithmetic = class(&stack, java_lang::ARITHMETIC_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.set_pc(2).unwrap();
    stack.enter_try(vec![Handler::catching(arithmetic, 40)], None).unwrap();
    stack.enter_call("divide").unwrap();
    stack.set_pc(3).unwrap();

    let error = arith::binary(BinaryOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
    match stack.handle(error).unwrap() {
        Transfer::EnterHandler { depth, pc, exception, .. } => {
            assert_eq!((depth, pc), (1, 40));
            assert_eq!(exception.class(), arithmetic);
            assert_eq!(exception.message(), Some("/ by zero"));
            assert_eq!(exception.origin().unwrap().to_string(), "divide@3");
            let trace: Vec<String> = exception.stack_trace().iter().map(ToString::to_string).collect();
            assert_eq!(trace, vec!["divide@3", "main@2"]);
        }
        other => panic!("unexpected transfer {:?}", other),
    }
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_uncaught_reports_type_and_origin() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_call("helper").unwrap();
    stack.set_pc(11).unwrap();

    let thrown = instance(&stack, "app.RetryException", 1);
    let err = stack.throw(thrown).unwrap_err();
    match &err {
        KernelError::Uncaught { exception_type, origin, .. } => {
            assert_eq!(exception_type, "app.RetryException");
            assert_eq!(origin.as_ref().map(|o| (o.method.as_str(), o.pc)), Some(("helper", 11)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.to_string(), "Uncaught exception app.RetryException");
    assert!(stack.is_empty());
}

#[test]
fn test_rethrow_keeps_origin() {
    let mut stack = CallStack::new(graph());
    let exception = class(&stack, java_lang::EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(exception, 10)], None).unwrap();
    stack.enter_call("source").unwrap();
    stack.set_pc(4).unwrap();

    let caught = match stack.throw(instance(&stack, java_lang::EXCEPTION, 1)).unwrap() {
        Transfer::EnterHandler { exception, .. } => exception,
        other => panic!("unexpected transfer {:?}", other),
    };
    stack.set_pc(12).unwrap();
    match stack.throw_object(caught).unwrap_err() {
        KernelError::Uncaught { origin, .. } => {
            assert_eq!(origin.unwrap().to_string(), "source@4");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_catch_all_handler() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catch_all(33)], None).unwrap();
    let thrown = instance(&stack, java_lang::STACK_OVERFLOW_ERROR, 1);
    assert_eq!(handler_pc(stack.throw(thrown).unwrap()).0, 33);
}

#[test]
fn test_call_depth_limit_raises_in_caller() {
    let options = KernelOptions::default().with_max_call_depth(3);
    let mut stack = CallStack::with_options(graph(), options);
    let overflow = class(&stack, java_lang::STACK_OVERFLOW_ERROR);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![Handler::catching(overflow, 99)], None).unwrap();
    stack.enter_call("recurse").unwrap();
    stack.enter_call("recurse").unwrap();

    match stack.enter_call("recurse").unwrap() {
        Transfer::EnterHandler { depth, pc, exception, .. } => {
            assert_eq!((depth, pc), (1, 99));
            assert_eq!(exception.class(), overflow);
            assert_eq!(exception.origin().unwrap().method, "recurse");
        }
        other => panic!("unexpected transfer {:?}", other),
    }
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_return_runs_finally_first() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_call("compute").unwrap();
    stack.enter_try(vec![], Some(20)).unwrap();

    assert_eq!(
        stack.return_value(Some(Value::Int(1))).unwrap(),
        Transfer::EnterFinally { depth: 2, pc: 20 }
    );
    assert_eq!(
        stack.end_finally().unwrap(),
        Transfer::Return {
            depth: 1,
            value: Some(Value::Int(1))
        }
    );
    assert_eq!(stack.last_retired().unwrap().status(), FrameStatus::Returned);
}

#[test]
fn test_return_in_finally_discards_pending_exception() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_call("swallow").unwrap();
    stack.enter_try(vec![], Some(20)).unwrap();

    let thrown = instance(&stack, java_lang::RUNTIME_EXCEPTION, 1);
    assert_eq!(stack.throw(thrown).unwrap(), Transfer::EnterFinally { depth: 2, pc: 20 });
    assert_eq!(
        stack.return_value(Some(Value::Int(2))).unwrap(),
        Transfer::Return {
            depth: 1,
            value: Some(Value::Int(2))
        }
    );
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_break_out_of_nested_regions_runs_each_finally() {
    let mut stack = CallStack::new(graph());
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![], Some(100)).unwrap();
    stack.enter_try(vec![], None).unwrap();
    stack.enter_try(vec![], Some(200)).unwrap();

    assert_eq!(stack.leave_regions(3, 300).unwrap(), Transfer::EnterFinally { depth: 1, pc: 200 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::EnterFinally { depth: 1, pc: 100 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::Jump { depth: 1, pc: 300 });
    assert!(stack.current().unwrap().regions().is_empty());
}

#[test]
fn test_try_inside_finally() {
    let mut stack = CallStack::new(graph());
    let ise = class(&stack, java_lang::ILLEGAL_STATE_EXCEPTION);
    stack.enter_call("main").unwrap();
    stack.enter_try(vec![], Some(100)).unwrap();

    let original = instance(&stack, java_lang::ARITHMETIC_EXCEPTION, 1);
    assert_eq!(stack.throw(original).unwrap(), Transfer::EnterFinally { depth: 1, pc: 100 });

    // the finally block runs its own try/catch/finally
    stack.enter_try(vec![Handler::catching(ise, 120)], Some(150)).unwrap();
    let inner = instance(&stack, java_lang::ILLEGAL_STATE_EXCEPTION, 2);
    assert_eq!(handler_pc(stack.throw(inner).unwrap()).0, 120);
    assert_eq!(stack.leave(130).unwrap(), Transfer::EnterFinally { depth: 1, pc: 150 });
    assert_eq!(stack.end_finally().unwrap(), Transfer::Jump { depth: 1, pc: 130 });

    // the outer finally still resumes the original exception
    match stack.end_finally().unwrap_err() {
        KernelError::Uncaught { exception, .. } => assert_eq!(exception.reference().handle(), 1),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_stacks_share_one_graph_across_threads() {
    let graph = graph();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let graph = Arc::clone(&graph);
            std::thread::spawn(move || {
                let mut stack = CallStack::new(graph);
                let exception = stack.graph().lookup(java_lang::EXCEPTION).unwrap();
                stack.enter_call(format!("worker-{}", i)).unwrap();
                stack.enter_try(vec![Handler::catching(exception, 7)], None).unwrap();
                let thrown = Value::object(ObjRef::new(i, stack.graph().lookup(java_lang::RUNTIME_EXCEPTION).unwrap()));
                stack.throw(thrown).unwrap().pc()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(7));
    }
}
