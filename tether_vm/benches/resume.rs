//! Generator Resume Benchmarks
//!
//! Measures the cost of resuming a generator, including the two
//! exception-context swaps around every resume.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tether_vm::bytecode::{CodeBuilder, CodeObject, Register};
use tether_vm::exception::{ExceptionRef, ExceptionTypeId};
use tether_vm::{VirtualMachine, VmConfig};

// =============================================================================
// Benchmark Helpers
// =============================================================================

/// `while True: yield 1`
fn endless_generator() -> Arc<CodeObject> {
    let mut b = CodeBuilder::generator("endless");
    let top = b.create_label();
    b.bind_label(top);
    b.emit_yield_int(Register(0), 1);
    b.emit_jump(top);
    Arc::new(b.finish().unwrap())
}

/// `while True: try: raise KeyError except: yield 1`
fn handler_generator() -> Arc<CodeObject> {
    let mut b = CodeBuilder::generator("in_handler");
    let top = b.create_label();
    b.bind_label(top);
    b.try_except(
        None,
        |b| b.emit_raise(ExceptionTypeId::KeyError, None),
        |b| b.emit_yield_int(Register(0), 1),
    );
    b.emit_jump(top);
    Arc::new(b.finish().unwrap())
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_resume_caller_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("resume_caller_depth");
    for depth in [0usize, 1, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |bench, &depth| {
            let mut vm = VirtualMachine::with_config(VmConfig::quiet());
            for _ in 0..depth {
                vm.enter_handler(ExceptionRef::raise(ExceptionTypeId::AttributeError, ""))
                    .unwrap();
            }
            let g = vm.create_generator(endless_generator()).unwrap();
            bench.iter(|| black_box(vm.resume(black_box(g)).unwrap()));
        });
    }
    group.finish();
}

fn bench_resume_with_handler(c: &mut Criterion) {
    c.bench_function("resume_raise_and_handle", |bench| {
        let mut vm = VirtualMachine::with_config(VmConfig::quiet());
        let g = vm.create_generator(handler_generator()).unwrap();
        bench.iter(|| black_box(vm.resume(black_box(g)).unwrap()));
    });
}

fn bench_create_and_close(c: &mut Criterion) {
    c.bench_function("create_resume_close", |bench| {
        let mut vm = VirtualMachine::with_config(VmConfig::quiet());
        let code = endless_generator();
        bench.iter(|| {
            let g = vm.create_generator(Arc::clone(&code)).unwrap();
            vm.resume(g).unwrap();
            vm.close(g).unwrap();
            vm.drop_generator(g).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_resume_caller_depth,
    bench_resume_with_handler,
    bench_create_and_close,
);
criterion_main!(benches);
