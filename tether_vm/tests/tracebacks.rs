//! Traceback tests.
//!
//! Generators take part in the call stack for tracebacks just like normal
//! calls: an exception leaving a generator records the generator frame, then
//! the frames of whoever resumed it.

use std::sync::Arc;
use tether_vm::bytecode::{CodeBuilder, CodeObject, Register};
use tether_vm::exception::{EntryFlags, ExceptionRef, ExceptionTypeId};
use tether_vm::VirtualMachine;

// =============================================================================
// Test Infrastructure
// =============================================================================

const R0: Register = Register(0);
const R1: Register = Register(1);
const FILE: &str = "tracebacks.py";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn builder(name: &str, generator: bool) -> CodeBuilder {
    let mut b = if generator {
        CodeBuilder::generator(name)
    } else {
        CodeBuilder::new(name)
    };
    b.set_filename(FILE);
    b
}

/// `def g(): yield 1; raise ValueError("boom")` with the raise on line 20.
fn failing_generator() -> Arc<CodeObject> {
    let mut b = builder("g", true);
    b.set_line(19);
    b.emit_yield_int(R0, 1);
    b.set_line(20);
    b.emit_raise(ExceptionTypeId::ValueError, Some("boom"));
    Arc::new(b.finish().unwrap())
}

fn lines(tb: &tether_vm::exception::Traceback) -> Vec<u32> {
    tb.iter().map(|f| f.line_number).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_traceback_includes_generator_and_resumer_frames() {
    init_logging();
    let mut f = builder("f", false);
    let g = f.add_child(failing_generator());
    f.set_line(34);
    f.emit_make_generator(R0, g);
    f.set_line(35);
    f.emit_next(R1, R0);
    f.emit_next(R1, R0);
    f.emit_return_none(R1);
    let f = Arc::new(f.finish().unwrap());

    let mut module = builder("<module>", false);
    let child = module.add_child(f);
    module.set_line(43);
    module.emit_call(R0, child);
    module.emit_return(R0);

    let mut vm = VirtualMachine::new();
    let err = vm.execute(Arc::new(module.finish().unwrap())).unwrap_err();

    assert_eq!(err.exception_type(), Some(ExceptionTypeId::ValueError));
    assert_eq!(err.traceback.func_names(), vec!["<module>", "f", "g"]);
    assert_eq!(lines(&err.traceback), vec![43, 35, 20]);

    let text = err.to_string();
    assert!(text.starts_with("Traceback (most recent call last):\n"));
    assert!(text.contains("  File \"tracebacks.py\", line 20, in g\n"));
    assert!(text.ends_with("ValueError: boom"));
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn test_host_resume_traceback_has_generator_frame_only() {
    init_logging();
    let mut vm = VirtualMachine::new();
    let g = vm.create_generator(failing_generator()).unwrap();

    vm.resume(g).unwrap();
    let err = vm.resume(g).unwrap_err();

    assert_eq!(err.traceback.func_names(), vec!["g"]);
    assert_eq!(err.traceback.innermost().unwrap().line_number, 20);
    assert!(err.flags.has(EntryFlags::EXPLICIT));
}

#[test]
fn test_handled_entry_keeps_traceback_through_generators() {
    init_logging();
    let mut inner = builder("inner", true);
    inner.set_line(5);
    inner.emit_raise(ExceptionTypeId::KeyError, None);
    let inner = Arc::new(inner.finish().unwrap());

    let mut outer = builder("outer", true);
    let child = outer.add_child(inner);
    outer.set_line(10);
    outer.emit_make_generator(R0, child);
    outer.try_except(
        None,
        |b| {
            b.set_line(12);
            b.emit_next(R1, R0);
        },
        |b| {
            b.set_line(14);
            b.emit_yield_int(R1, 1);
        },
    );
    let outer = Arc::new(outer.finish().unwrap());

    let mut vm = VirtualMachine::new();
    let g = vm.create_generator(outer).unwrap();
    vm.resume(g).unwrap();

    let saved = vm.generator(g).unwrap().saved_context();
    let entry = saved.peek().unwrap();
    assert_eq!(entry.exception().type_id(), ExceptionTypeId::KeyError);
    assert_eq!(entry.traceback().func_names(), vec!["outer", "inner"]);
    assert_eq!(lines(entry.traceback()), vec![12, 5]);
    assert!(vm.current_exception().is_none());
}

#[test]
fn test_reraise_in_generator_preserves_original_frames() {
    init_logging();
    let mut helper = builder("helper", false);
    helper.set_line(3);
    helper.emit_raise(ExceptionTypeId::KeyError, Some("missing"));
    let helper = Arc::new(helper.finish().unwrap());

    let mut g = builder("g", true);
    let child = g.add_child(helper);
    g.try_except(
        None,
        |b| {
            b.set_line(8);
            b.emit_call(R0, child);
        },
        |b| {
            b.set_line(10);
            b.emit_reraise();
        },
    );
    let g = Arc::new(g.finish().unwrap());

    let mut vm = VirtualMachine::new();
    let handle = vm.create_generator(g).unwrap();
    let err = vm.resume(handle).unwrap_err();

    assert_eq!(err.exception_ref().unwrap().message(), "missing");
    assert!(err.flags.has(EntryFlags::RERAISED));
    assert_eq!(err.traceback.func_names(), vec!["g", "helper"]);
    assert_eq!(lines(&err.traceback), vec![10, 3]);
}

#[test]
fn test_thrown_exception_records_yield_site() {
    init_logging();
    let mut vm = VirtualMachine::new();
    let g = vm.create_generator(failing_generator()).unwrap();
    vm.resume(g).unwrap();

    let thrown = ExceptionRef::raise(ExceptionTypeId::IndexError, "thrown");
    let err = vm.throw(g, thrown.clone()).unwrap_err();

    assert_eq!(err.exception_ref(), Some(&thrown));
    assert!(err.flags.has(EntryFlags::THROWN));
    assert_eq!(err.traceback.func_names(), vec!["g"]);
    assert_eq!(err.traceback.innermost().unwrap().line_number, 19);
}
