//! Virtual machine implementation.
//!
//! The VirtualMachine runs bytecode frames and owns the two pieces of state
//! that exception-context isolation is about:
//!
//! - the *active* exception-info stack, the context `sys.exc_info()` reads
//! - the generator table, each generator holding its *saved* stack
//!
//! A generator body always runs on its own context: `resume` swaps the saved
//! stack in before entering the body and swaps it back out before the result
//! (yield, return or exception) reaches the resumer.

use crate::bytecode::{CodeObject, ConstIndex, Instruction};
use crate::config::VmConfig;
use crate::error::{RuntimeError, RuntimeErrorKind, VmResult};
use crate::exception::{EntryFlags, ExcInfoEntry, ExcInfoStack, ExceptionRef};
use crate::frame::{Frame, FrameKind};
use crate::generator::{
    FrameExit, GeneratorObject, GeneratorState, GeneratorStep, ResumeAction, ResumeMode,
    complete_close, complete_resume, generator_exit, prepare_resume,
};
use crate::probe::{ProbeLog, ProbeRecord};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tether_core::{Handle, Value};

/// Entry in the generator table.
///
/// A running generator is moved out of the table; its slot stays behind as
/// `Running` so that re-entrant resumption can be rejected.
#[derive(Debug)]
enum GeneratorSlot {
    Idle(Box<GeneratorObject>),
    Running,
}

/// Result of executing one instruction.
enum ControlFlow {
    Continue,
    Exit(FrameExit),
}

/// The Tether virtual machine.
///
/// Executes register-based bytecode with:
/// - Frame stack for calls and generator bodies
/// - Active exception-info stack for the running call chain
/// - Generator table keyed by `Handle`
/// - Probe log for `ExcInfo` observations
pub struct VirtualMachine {
    /// Tunables.
    config: VmConfig,
    /// Frame stack (limited by `config.max_frame_depth`).
    frames: Vec<Frame>,
    /// Active exception context.
    exc_info: ExcInfoStack,
    /// Live generators.
    generators: FxHashMap<Handle, GeneratorSlot>,
    /// Next handle to hand out.
    next_handle: Handle,
    /// `ExcInfo` observations.
    probes: ProbeLog,
}

impl VirtualMachine {
    /// Create a new virtual machine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Create a virtual machine with a custom configuration.
    pub fn with_config(config: VmConfig) -> Self {
        Self {
            exc_info: ExcInfoStack::with_limit(config.max_exc_depth),
            config,
            frames: Vec::new(),
            generators: FxHashMap::default(),
            next_handle: Handle::from_raw(1),
            probes: ProbeLog::new(),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    // =========================================================================
    // Exception Context
    // =========================================================================

    /// Returns the exception currently being handled (`sys.exc_info()[1]`).
    #[inline]
    pub fn current_exception(&self) -> Option<&ExceptionRef> {
        self.exc_info.current_exception()
    }

    /// Returns the active exception-info stack.
    #[inline]
    pub fn exc_info(&self) -> &ExcInfoStack {
        &self.exc_info
    }

    /// Enters a handler for `exception`, making it the current exception.
    pub fn enter_handler(&mut self, exception: ExceptionRef) -> VmResult<()> {
        if self.exc_info.enter_handler(exception) {
            Ok(())
        } else {
            Err(exc_depth_exceeded())
        }
    }

    /// Leaves the innermost handler, restoring the previous exception.
    ///
    /// Returns the exception that was being handled.
    pub fn exit_handler(&mut self) -> VmResult<ExceptionRef> {
        match self.exc_info.exit_handler() {
            Some(entry) => Ok(entry.exception().clone()),
            None => Err(RuntimeErrorKind::UnbalancedHandler {
                func: Arc::from("<host>"),
            }
            .into()),
        }
    }

    // =========================================================================
    // Generators
    // =========================================================================

    /// Instantiates a generator for `code` in `Created` state.
    pub fn create_generator(&mut self, code: Arc<CodeObject>) -> VmResult<Handle> {
        if !code.is_generator() {
            return Err(RuntimeError::type_error(format!(
                "'{}' is not a generator function",
                code.name
            )));
        }
        let handle = self.next_handle;
        self.next_handle = handle.next()?;
        log::trace!("create generator {:?} for '{}'", handle, code.name);
        let generator = GeneratorObject::new(code, self.config.max_exc_depth);
        self.generators
            .insert(handle, GeneratorSlot::Idle(Box::new(generator)));
        Ok(handle)
    }

    /// Returns the state of a generator.
    pub fn generator_state(&self, handle: Handle) -> VmResult<GeneratorState> {
        match self.generators.get(&handle) {
            Some(GeneratorSlot::Idle(generator)) => Ok(generator.state()),
            Some(GeneratorSlot::Running) => Ok(GeneratorState::Running),
            None => Err(RuntimeErrorKind::InvalidGenerator(handle).into()),
        }
    }

    /// Returns a generator that is not currently running.
    pub fn generator(&self, handle: Handle) -> Option<&GeneratorObject> {
        match self.generators.get(&handle)? {
            GeneratorSlot::Idle(generator) => Some(&**generator),
            GeneratorSlot::Running => None,
        }
    }

    /// Returns the number of live generators.
    #[inline]
    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    /// Discards a generator, its frame and its saved context, without running
    /// the body.
    pub fn drop_generator(&mut self, handle: Handle) -> VmResult<()> {
        match self.generators.remove(&handle) {
            Some(GeneratorSlot::Idle(generator)) => {
                log::trace!("drop generator {:?} in {}", handle, generator.state());
                Ok(())
            }
            Some(GeneratorSlot::Running) => {
                self.generators.insert(handle, GeneratorSlot::Running);
                Err(RuntimeError::value_error("generator already executing"))
            }
            None => Err(RuntimeErrorKind::InvalidGenerator(handle).into()),
        }
    }

    /// `next(generator)`.
    pub fn resume(&mut self, handle: Handle) -> VmResult<GeneratorStep> {
        self.resume_generator(handle, ResumeMode::Next)
    }

    /// `generator.send(value)`.
    pub fn send(&mut self, handle: Handle, value: Value) -> VmResult<GeneratorStep> {
        self.resume_generator(handle, ResumeMode::Send(value))
    }

    /// `generator.throw(exc)`.
    pub fn throw(&mut self, handle: Handle, exception: ExceptionRef) -> VmResult<GeneratorStep> {
        self.resume_generator(handle, ResumeMode::Throw(exception))
    }

    /// `generator.close()`.
    pub fn close(&mut self, handle: Handle) -> VmResult<()> {
        match self.generators.get_mut(&handle) {
            Some(GeneratorSlot::Idle(generator)) => match generator.state() {
                GeneratorState::Created => {
                    generator.finish_returned();
                    return Ok(());
                }
                GeneratorState::Returned | GeneratorState::Raised => return Ok(()),
                GeneratorState::Running | GeneratorState::Suspended => {}
            },
            Some(GeneratorSlot::Running) => {}
            None => return Err(RuntimeErrorKind::InvalidGenerator(handle).into()),
        }
        let result = self.resume_generator(handle, ResumeMode::Throw(generator_exit()));
        complete_close(result)
    }

    /// `list(generator)`: resumes until the generator returns and collects what
    /// it yielded.
    pub fn exhaust(&mut self, handle: Handle) -> VmResult<Vec<Value>> {
        let mut values = Vec::new();
        loop {
            match self.resume(handle)? {
                GeneratorStep::Yielded(value) => values.push(value),
                GeneratorStep::Returned(_) => return Ok(values),
            }
        }
    }

    fn resume_generator(&mut self, handle: Handle, mode: ResumeMode) -> VmResult<GeneratorStep> {
        let slot = self
            .generators
            .get_mut(&handle)
            .ok_or(RuntimeErrorKind::InvalidGenerator(handle))?;
        let mut generator = match std::mem::replace(slot, GeneratorSlot::Running) {
            GeneratorSlot::Idle(generator) => generator,
            GeneratorSlot::Running => {
                return Err(RuntimeError::value_error("generator already executing"));
            }
        };

        let result = self.drive_generator(&mut generator, mode);

        // drop_generator refuses running slots, so the entry is still ours.
        self.generators.insert(handle, GeneratorSlot::Idle(generator));
        result
    }

    /// Runs one resume of `generator` under its own exception context.
    fn drive_generator(
        &mut self,
        generator: &mut GeneratorObject,
        mode: ResumeMode,
    ) -> VmResult<GeneratorStep> {
        if generator.state().is_resumable() {
            self.check_frame_depth()?;
        }

        let method = mode.name();
        let (frame, pending) = match prepare_resume(generator, mode)? {
            ResumeAction::Enter { frame, pending } => (frame, pending),
            ResumeAction::Done(step) => return Ok(step),
        };

        log::trace!(
            "{} '{}' at {} (caller context depth {})",
            method,
            generator.code().name,
            frame.ip,
            self.exc_info.len()
        );

        generator.swap_context(&mut self.exc_info);
        let base = self.frames.len();
        self.frames.push(frame);
        let outcome = self.run(base, pending);
        generator.swap_context(&mut self.exc_info);

        let result = complete_resume(generator, outcome);
        log::trace!(
            "'{}' left as {} (caller context depth {})",
            generator.code().name,
            generator.state(),
            self.exc_info.len()
        );
        result
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute a code object and return the result.
    ///
    /// The entry frame shares the host's exception context. Executing a
    /// generator body creates a generator and returns its handle.
    pub fn execute(&mut self, code: Arc<CodeObject>) -> VmResult<Value> {
        if code.is_generator() {
            return self.create_generator(code).map(Value::Handle);
        }
        self.check_frame_depth()?;
        let base = self.frames.len();
        self.frames
            .push(Frame::new(code, FrameKind::Entry, self.exc_info.len()));

        match self.run(base, None)? {
            FrameExit::Returned(value) => Ok(value),
            FrameExit::Yielded(_, frame) => Err(RuntimeError::internal(format!(
                "yield escaped entry frame '{}'",
                frame.name()
            ))),
        }
    }

    /// Returns the recorded probe observations.
    #[inline]
    pub fn probes(&self) -> &[ProbeRecord] {
        self.probes.records()
    }

    /// Removes and returns the recorded probe observations.
    #[inline]
    pub fn take_probes(&mut self) -> Vec<ProbeRecord> {
        self.probes.take()
    }

    /// Returns the number of live frames.
    #[inline]
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    fn check_frame_depth(&self) -> VmResult<()> {
        if self.frames.len() >= self.config.max_frame_depth {
            return Err(RuntimeError::recursion_error(
                "maximum recursion depth exceeded",
            ));
        }
        Ok(())
    }

    /// Dispatch loop: runs until the frame at `base` returns or yields.
    ///
    /// `pending` is raised in the top frame before the first instruction.
    /// On error every frame above `base` has been unwound.
    fn run(&mut self, base: usize, mut pending: Option<RuntimeError>) -> VmResult<FrameExit> {
        loop {
            if let Some(err) = pending.take() {
                self.unwind(err, base)?;
            }
            match self.step(base) {
                Ok(ControlFlow::Continue) => {}
                Ok(ControlFlow::Exit(exit)) => return Ok(exit),
                Err(err) => pending = Some(err),
            }
        }
    }

    /// Executes one instruction of the top frame.
    fn step(&mut self, base: usize) -> VmResult<ControlFlow> {
        let depth = self.frames.len();
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("no active frame"))?;
        let Some(inst) = frame.fetch() else {
            return self.return_from_frame(Value::None, base);
        };

        match inst {
            Instruction::Nop => {}
            Instruction::LoadConst { dst, index } => {
                let value = frame.constant(index)?.clone();
                frame.set_reg(dst, value)?;
            }
            Instruction::LoadNone { dst } => frame.set_reg(dst, Value::None)?,
            Instruction::Move { dst, src } => {
                let value = frame.reg(src)?.clone();
                frame.set_reg(dst, value)?;
            }
            Instruction::Jump { target } => frame.ip = target,
            Instruction::Raise { type_id, message } => {
                let message = match message {
                    Some(index) => string_constant(frame, index)?,
                    None => Arc::from(""),
                };
                return Err(
                    RuntimeError::exception(type_id, message).with_flag(EntryFlags::EXPLICIT)
                );
            }
            Instruction::Reraise => {
                let exc_base = frame.exc_base;
                return Err(self.reraise(exc_base));
            }
            Instruction::PopExcept => {
                if self.exc_info.len() <= frame.exc_base {
                    return Err(RuntimeErrorKind::UnbalancedHandler {
                        func: Arc::clone(frame.name()),
                    }
                    .into());
                }
                self.exc_info.exit_handler();
            }
            Instruction::ExcInfo { label } => {
                if self.config.record_probes {
                    let label = string_constant(frame, label)?;
                    let function = Arc::clone(frame.name());
                    let exception = self.exc_info.current_exception().map(ExceptionRef::type_id);
                    log::debug!(
                        "probe '{}' in '{}': {:?}",
                        label,
                        function,
                        exception
                    );
                    self.probes.record(ProbeRecord {
                        label,
                        function,
                        exception,
                    });
                }
            }
            Instruction::Yield { src, .. } => {
                if frame.kind != FrameKind::Generator || depth != base + 1 {
                    return Err(RuntimeError::internal(format!(
                        "yield outside generator frame in '{}'",
                        frame.name()
                    )));
                }
                let value = frame.reg(src)?.clone();
                // The generator's handlers stay active; the context is saved
                // with the frame.
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::internal("no frame to pop"))?;
                return Ok(ControlFlow::Exit(FrameExit::Yielded(value, frame)));
            }
            Instruction::Return { src } => {
                let value = frame.reg(src)?.clone();
                return self.return_from_frame(value, base);
            }
            Instruction::Call { code, .. } => {
                let child = child_code(frame, code)?;
                if child.is_generator() {
                    return Err(RuntimeError::internal(format!(
                        "'{}' is a generator body and cannot be called",
                        child.name
                    )));
                }
                self.check_frame_depth()?;
                let exc_base = self.exc_info.len();
                self.frames
                    .push(Frame::new(child, FrameKind::Function, exc_base));
            }
            Instruction::MakeGenerator { dst, code } => {
                let child = child_code(frame, code)?;
                let handle = self.create_generator(child)?;
                self.current_frame_mut()?
                    .set_reg(dst, Value::Handle(handle))?;
            }
            Instruction::Next { dst, generator } => {
                let handle = frame.reg(generator)?.expect_handle("generator")?;
                match self.resume(handle)? {
                    GeneratorStep::Yielded(value) => self.current_frame_mut()?.set_reg(dst, value)?,
                    GeneratorStep::Returned(_) => return Err(RuntimeError::stop_iteration()),
                }
            }
            Instruction::Exhaust { dst, generator } => {
                let handle = frame.reg(generator)?.expect_handle("generator")?;
                let count = self.exhaust(handle)?.len() as i64;
                self.current_frame_mut()?.set_reg(dst, Value::int(count))?;
            }
            Instruction::DropGenerator { generator } => {
                let handle = frame.reg(generator)?.expect_handle("generator")?;
                self.drop_generator(handle)?;
                self.current_frame_mut()?.set_reg(generator, Value::None)?;
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Pops the top frame and delivers `value` to its caller.
    fn return_from_frame(&mut self, value: Value, base: usize) -> VmResult<ControlFlow> {
        self.pop_frame()?;
        if self.frames.len() <= base {
            return Ok(ControlFlow::Exit(FrameExit::Returned(value)));
        }

        let caller = self.current_frame_mut()?;
        let pc = caller.current_pc();
        match caller.code.instructions.get(pc as usize).copied() {
            Some(Instruction::Call { dst, .. }) => caller.set_reg(dst, value)?,
            _ => {
                return Err(RuntimeError::internal(format!(
                    "return into '{}' at {pc}, which is not a call",
                    caller.name()
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Builds the error raised by a bare `raise`.
    fn reraise(&self, exc_base: usize) -> RuntimeError {
        let Some(entry) = self.exc_info.peek() else {
            return RuntimeError::runtime_error("No active exception to reraise");
        };
        let mut traceback = entry.traceback().clone();
        // The handling frame is recorded again as the exception leaves it.
        if self.exc_info.len() > exc_base {
            traceback.pop_outer();
        }
        let mut err = RuntimeError::raised_with_traceback(entry.exception().clone(), traceback);
        err.flags = entry.flags();
        err.with_flag(EntryFlags::EXPLICIT | EntryFlags::RERAISED)
    }

    /// Routes `err` to the innermost matching handler above `base`.
    ///
    /// Frames without a matching handler are popped, dropping the exception
    /// context entries they pushed. Returns the error once it has unwound
    /// every frame above `base`.
    fn unwind(&mut self, mut err: RuntimeError, base: usize) -> VmResult<()> {
        while self.frames.len() > base {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };

            if let Some(exception) = err.exception_ref() {
                let pc = frame.current_pc();
                if let Some(entry) = frame.code.find_handler(pc, exception) {
                    let handler_pc = entry.handler_pc;
                    let keep = frame.exc_base + entry.depth as usize;
                    let mut traceback = err.traceback.clone();
                    traceback.push_outer(frame.frame_info());

                    self.exc_info.truncate(keep);
                    let handled =
                        ExcInfoEntry::with_traceback(exception.clone(), traceback, err.flags);
                    if self.exc_info.push(handled) {
                        log::debug!(
                            "'{}' handles {} at {} -> {}",
                            frame.name(),
                            exception.type_id(),
                            pc,
                            handler_pc
                        );
                        frame.ip = handler_pc;
                        return Ok(());
                    }
                    err = exc_depth_exceeded();
                }
            }

            let frame = self.pop_frame()?;
            log::debug!("unwinding '{}' at {}: {}", frame.name(), frame.current_pc(), err.kind);
            err.add_frame(frame.frame_info());
        }
        Err(err)
    }

    /// Pops the top frame, discarding the exception context it pushed.
    fn pop_frame(&mut self) -> VmResult<Frame> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::internal("no frame to pop"))?;
        self.exc_info.truncate(frame.exc_base);
        Ok(frame)
    }

    #[inline]
    fn current_frame_mut(&mut self) -> VmResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("no active frame"))
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn exc_depth_exceeded() -> RuntimeError {
    RuntimeError::recursion_error("maximum exception nesting depth exceeded")
}

fn string_constant(frame: &Frame, index: ConstIndex) -> VmResult<Arc<str>> {
    match frame.constant(index)? {
        Value::Str(s) => Ok(Arc::clone(s)),
        other => Err(tether_core::CoreError::type_mismatch("str", other.type_name()).into()),
    }
}

fn child_code(frame: &Frame, index: u16) -> VmResult<Arc<CodeObject>> {
    frame.code.child(index).cloned().ok_or_else(|| {
        RuntimeError::internal(format!(
            "code #{index} out of range in '{}'",
            frame.name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{CodeBuilder, Register};
    use crate::exception::ExceptionTypeId;

    fn exc(type_id: ExceptionTypeId) -> ExceptionRef {
        ExceptionRef::raise(type_id, "")
    }

    #[test]
    fn test_vm_creation() {
        let vm = VirtualMachine::new();
        assert!(vm.current_exception().is_none());
        assert_eq!(vm.call_depth(), 0);
        assert_eq!(vm.generator_count(), 0);
    }

    #[test]
    fn test_enter_exit_handler() {
        let mut vm = VirtualMachine::new();
        vm.enter_handler(exc(ExceptionTypeId::AttributeError)).unwrap();
        vm.enter_handler(exc(ExceptionTypeId::KeyError)).unwrap();
        assert_eq!(
            vm.current_exception().map(ExceptionRef::type_id),
            Some(ExceptionTypeId::KeyError)
        );

        assert_eq!(vm.exit_handler().unwrap().type_id(), ExceptionTypeId::KeyError);
        assert_eq!(
            vm.current_exception().map(ExceptionRef::type_id),
            Some(ExceptionTypeId::AttributeError)
        );
        vm.exit_handler().unwrap();
        assert!(vm.exit_handler().is_err());
    }

    #[test]
    fn test_enter_handler_limit() {
        let mut vm = VirtualMachine::with_config(VmConfig::default().with_max_exc_depth(1));
        vm.enter_handler(exc(ExceptionTypeId::KeyError)).unwrap();
        let err = vm.enter_handler(exc(ExceptionTypeId::KeyError)).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::RecursionError));
        assert_eq!(vm.exc_info().len(), 1);
    }

    #[test]
    fn test_execute_returns_value() {
        let mut b = CodeBuilder::new("<module>");
        b.emit_load_const(Register(0), Value::int(7));
        b.emit_return(Register(0));
        let mut vm = VirtualMachine::new();
        let value = vm.execute(Arc::new(b.finish().unwrap())).unwrap();
        assert_eq!(value.as_int(), Some(7));
        assert_eq!(vm.call_depth(), 0);
    }

    #[test]
    fn test_fall_off_end_returns_none() {
        let mut b = CodeBuilder::new("<module>");
        b.emit(Instruction::Nop);
        let mut vm = VirtualMachine::new();
        assert!(vm.execute(Arc::new(b.finish().unwrap())).unwrap().is_none());
    }

    #[test]
    fn test_handler_restores_context() {
        let mut b = CodeBuilder::new("<module>");
        b.try_except(
            Some(ExceptionTypeId::KeyError),
            |b| b.emit_raise(ExceptionTypeId::KeyError, Some("k")),
            |b| b.emit_exc_info("in except"),
        );
        b.emit_exc_info("after");
        b.emit_return_none(Register(0));

        let mut vm = VirtualMachine::new();
        vm.execute(Arc::new(b.finish().unwrap())).unwrap();
        let seen: Vec<_> = vm.probes().iter().map(|p| p.exception).collect();
        assert_eq!(seen, vec![Some(ExceptionTypeId::KeyError), None]);
        assert!(vm.exc_info().is_empty());
    }

    #[test]
    fn test_unmatched_handler_propagates() {
        let mut b = CodeBuilder::new("<module>");
        b.try_except(
            Some(ExceptionTypeId::KeyError),
            |b| b.emit_raise(ExceptionTypeId::ValueError, None),
            |_| {},
        );
        let mut vm = VirtualMachine::new();
        let err = vm.execute(Arc::new(b.finish().unwrap())).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::ValueError));
        assert!(err.flags.has(EntryFlags::EXPLICIT));
        assert_eq!(err.traceback.func_names(), vec!["<module>"]);
    }

    #[test]
    fn test_reraise_without_active_exception() {
        let mut b = CodeBuilder::new("<module>");
        b.emit_reraise();
        let mut vm = VirtualMachine::new();
        let err = vm.execute(Arc::new(b.finish().unwrap())).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::RuntimeError));
        assert_eq!(
            err.exception_ref().unwrap().message(),
            "No active exception to reraise"
        );
    }

    #[test]
    fn test_reraise_keeps_identity_and_single_frame() {
        let mut b = CodeBuilder::new("<module>");
        b.try_except(
            None,
            |b| b.emit_raise(ExceptionTypeId::KeyError, Some("k")),
            |b| b.emit_reraise(),
        );
        let mut vm = VirtualMachine::new();
        let err = vm.execute(Arc::new(b.finish().unwrap())).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::KeyError));
        assert!(err.flags.has(EntryFlags::RERAISED));
        assert_eq!(err.traceback.func_names(), vec!["<module>"]);
        assert!(vm.exc_info().is_empty());
    }

    #[test]
    fn test_call_shares_context() {
        let mut callee = CodeBuilder::new("helper");
        callee.emit_exc_info("in helper");
        callee.emit_return_none(Register(0));
        let callee = Arc::new(callee.finish().unwrap());

        let mut b = CodeBuilder::new("<module>");
        let child = b.add_child(callee);
        b.try_except(
            None,
            |b| b.emit_raise(ExceptionTypeId::ZeroDivisionError, None),
            |b| b.emit_call(Register(0), child),
        );
        b.emit_return_none(Register(0));

        let mut vm = VirtualMachine::new();
        vm.execute(Arc::new(b.finish().unwrap())).unwrap();
        assert_eq!(vm.probes()[0].exception, Some(ExceptionTypeId::ZeroDivisionError));
        assert_eq!(&*vm.probes()[0].function, "helper");
    }

    #[test]
    fn test_frame_depth_limit() {
        let mut leaf = CodeBuilder::new("leaf");
        leaf.emit_return_none(Register(0));
        let leaf = Arc::new(leaf.finish().unwrap());

        let mut b = CodeBuilder::new("<module>");
        let child = b.add_child(leaf);
        b.emit_call(Register(0), child);
        b.emit_return_none(Register(0));

        let mut vm = VirtualMachine::with_config(VmConfig::default().with_max_frame_depth(1));
        let err = vm.execute(Arc::new(b.finish().unwrap())).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::RecursionError));
        assert_eq!(vm.call_depth(), 0);
    }

    #[test]
    fn test_quiet_config_records_nothing() {
        let mut b = CodeBuilder::new("<module>");
        b.emit_exc_info("probe");
        let mut vm = VirtualMachine::with_config(VmConfig::quiet());
        vm.execute(Arc::new(b.finish().unwrap())).unwrap();
        assert!(vm.probes().is_empty());
    }

    #[test]
    fn test_create_generator_rejects_plain_code() {
        let mut b = CodeBuilder::new("f");
        b.emit_return_none(Register(0));
        let mut vm = VirtualMachine::new();
        let err = vm.create_generator(Arc::new(b.finish().unwrap())).unwrap_err();
        assert_eq!(err.exception_type(), Some(ExceptionTypeId::TypeError));
    }

    #[test]
    fn test_unknown_generator() {
        let mut vm = VirtualMachine::new();
        let err = vm.resume(Handle::from_raw(99)).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::InvalidGenerator(_)));
        assert!(vm.drop_generator(Handle::from_raw(99)).is_err());
    }
}
