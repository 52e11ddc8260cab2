//! Builder for code objects.
//!
//! Test programs and embedders assemble bytecode by hand; the builder takes
//! care of labels, constant pools, line tables and the exception table.
//!
//! # Example
//! ```
//! use tether_vm::bytecode::{CodeBuilder, Register};
//! use tether_vm::exception::ExceptionTypeId;
//!
//! let mut b = CodeBuilder::generator("g");
//! let r0 = Register(0);
//! b.emit_exc_info("start of generator");
//! b.emit_yield_int(r0, 1);
//! b.try_except(
//!     None,
//!     |b| b.emit_raise(ExceptionTypeId::KeyError, None),
//!     |_| {},
//! );
//! b.emit_exc_info("after KeyError");
//! b.emit_return_none(r0);
//! let code = b.finish().unwrap();
//! assert!(code.is_generator());
//! ```

use super::code_object::{CodeFlags, CodeObject, ExceptionEntry};
use super::instruction::{ConstIndex, Instruction, Register};
use crate::error::{RuntimeError, VmResult};
use crate::exception::ExceptionTypeId;
use std::sync::Arc;
use tether_core::Value;

/// A label for jump and handler targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// An open `try` region, returned by [`CodeBuilder::begin_try`].
#[derive(Debug)]
#[must_use = "a try region must be closed with end_try"]
pub struct TryRegion {
    start_pc: u32,
    depth: u16,
}

#[derive(Debug)]
struct PendingEntry {
    start_pc: u32,
    end_pc: u32,
    handler: Label,
    depth: u16,
    match_type: Option<ExceptionTypeId>,
}

/// Builder for constructing code objects.
pub struct CodeBuilder {
    name: Arc<str>,
    filename: Arc<str>,
    first_lineno: u32,
    current_line: u32,
    flags: CodeFlags,

    instructions: Vec<Instruction>,
    line_table: Vec<u32>,
    constants: Vec<Value>,
    children: Vec<Arc<CodeObject>>,

    /// Bound label positions, indexed by label id.
    labels: Vec<Option<u32>>,
    /// Jumps whose target label still needs patching.
    forward_refs: Vec<(usize, Label)>,
    pending_entries: Vec<PendingEntry>,

    open_tries: usize,
    handler_depth: u16,
}

impl CodeBuilder {
    /// Creates a builder for a plain function.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            filename: Arc::from("<bytecode>"),
            first_lineno: 1,
            current_line: 0,
            flags: CodeFlags::NONE,
            instructions: Vec::new(),
            line_table: Vec::new(),
            constants: Vec::new(),
            children: Vec::new(),
            labels: Vec::new(),
            forward_refs: Vec::new(),
            pending_entries: Vec::new(),
            open_tries: 0,
            handler_depth: 0,
        }
    }

    /// Creates a builder for a generator body.
    pub fn generator(name: impl Into<Arc<str>>) -> Self {
        let mut builder = Self::new(name);
        builder.flags = builder.flags.union(CodeFlags::GENERATOR);
        builder
    }

    /// Sets the filename.
    pub fn set_filename(&mut self, filename: impl Into<Arc<str>>) {
        self.filename = filename.into();
    }

    /// Sets the first line number.
    pub fn set_first_lineno(&mut self, line: u32) {
        self.first_lineno = line;
    }

    /// Sets the line recorded for subsequently emitted instructions.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    // =========================================================================
    // Pools
    // =========================================================================

    /// Adds a constant, reusing an equal existing entry.
    pub fn add_constant(&mut self, value: Value) -> ConstIndex {
        if let Some(idx) = self.constants.iter().position(|c| *c == value) {
            return ConstIndex(idx as u16);
        }
        self.constants.push(value);
        ConstIndex((self.constants.len() - 1) as u16)
    }

    /// Adds a string constant.
    pub fn add_string(&mut self, s: &str) -> ConstIndex {
        self.add_constant(Value::string(s))
    }

    /// Adds a nested code object and returns its index.
    pub fn add_child(&mut self, code: Arc<CodeObject>) -> u16 {
        self.children.push(code);
        (self.children.len() - 1) as u16
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Creates an unbound label.
    pub fn create_label(&mut self) -> Label {
        self.labels.push(None);
        Label((self.labels.len() - 1) as u32)
    }

    /// Binds a label to the next emitted instruction.
    pub fn bind_label(&mut self, label: Label) {
        let pc = self.current_pc();
        self.labels[label.0 as usize] = Some(pc);
    }

    /// Returns the index of the next emitted instruction.
    #[inline]
    pub fn current_pc(&self) -> u32 {
        self.instructions.len() as u32
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Emits an instruction.
    pub fn emit(&mut self, inst: Instruction) {
        self.instructions.push(inst);
        self.line_table.push(self.current_line);
    }

    /// Emits a jump to `label`.
    pub fn emit_jump(&mut self, label: Label) {
        self.forward_refs.push((self.instructions.len(), label));
        self.emit(Instruction::Jump { target: u32::MAX });
    }

    /// Emits `dst = value`.
    pub fn emit_load_const(&mut self, dst: Register, value: Value) {
        let index = self.add_constant(value);
        self.emit(Instruction::LoadConst { dst, index });
    }

    /// Emits a raise of a fresh `type_id` exception.
    pub fn emit_raise(&mut self, type_id: ExceptionTypeId, message: Option<&str>) {
        let message = message.map(|m| self.add_string(m));
        self.emit(Instruction::Raise { type_id, message });
    }

    /// Emits a bare `raise`.
    pub fn emit_reraise(&mut self) {
        self.emit(Instruction::Reraise);
    }

    /// Emits an exception-context probe labelled `label`.
    pub fn emit_exc_info(&mut self, label: &str) {
        let label = self.add_string(label);
        self.emit(Instruction::ExcInfo { label });
    }

    /// Emits `yield src`, storing the sent value in `src`.
    pub fn emit_yield(&mut self, src: Register) {
        self.emit(Instruction::Yield { dst: src, src });
    }

    /// Emits `yield value` through the scratch register `scratch`.
    pub fn emit_yield_int(&mut self, scratch: Register, value: i64) {
        self.emit_load_const(scratch, Value::int(value));
        self.emit_yield(scratch);
    }

    /// Emits `return src`.
    pub fn emit_return(&mut self, src: Register) {
        self.emit(Instruction::Return { src });
    }

    /// Emits `return None` through the scratch register `scratch`.
    pub fn emit_return_none(&mut self, scratch: Register) {
        self.emit(Instruction::LoadNone { dst: scratch });
        self.emit_return(scratch);
    }

    /// Emits `dst = child()` for a plain function child.
    pub fn emit_call(&mut self, dst: Register, code: u16) {
        self.emit(Instruction::Call { dst, code });
    }

    /// Emits `dst = child()` for a generator child.
    pub fn emit_make_generator(&mut self, dst: Register, code: u16) {
        self.emit(Instruction::MakeGenerator { dst, code });
    }

    /// Emits `dst = next(generator)`.
    pub fn emit_next(&mut self, dst: Register, generator: Register) {
        self.emit(Instruction::Next { dst, generator });
    }

    /// Emits `dst = len(list(generator))`.
    pub fn emit_exhaust(&mut self, dst: Register, generator: Register) {
        self.emit(Instruction::Exhaust { dst, generator });
    }

    /// Emits `del generator`.
    pub fn emit_drop_generator(&mut self, generator: Register) {
        self.emit(Instruction::DropGenerator { generator });
    }

    // =========================================================================
    // Exception Regions
    // =========================================================================

    /// Opens a `try` region at the current position.
    pub fn begin_try(&mut self) -> TryRegion {
        self.open_tries += 1;
        TryRegion {
            start_pc: self.current_pc(),
            depth: self.handler_depth,
        }
    }

    /// Closes a `try` region, routing matching exceptions to `handler`.
    ///
    /// Regions must be closed innermost first.
    pub fn end_try(
        &mut self,
        region: TryRegion,
        handler: Label,
        match_type: Option<ExceptionTypeId>,
    ) {
        self.open_tries = self.open_tries.saturating_sub(1);
        self.pending_entries.push(PendingEntry {
            start_pc: region.start_pc,
            end_pc: self.current_pc(),
            handler,
            depth: region.depth,
            match_type,
        });
    }

    /// Marks the start of a handler block body.
    pub fn begin_handler(&mut self) {
        self.handler_depth += 1;
    }

    /// Ends a handler block body, emitting `PopExcept`.
    pub fn end_handler(&mut self) {
        self.emit(Instruction::PopExcept);
        self.handler_depth = self.handler_depth.saturating_sub(1);
    }

    /// Emits `try: body except match_type: handler`.
    pub fn try_except(
        &mut self,
        match_type: Option<ExceptionTypeId>,
        body: impl FnOnce(&mut Self),
        handler: impl FnOnce(&mut Self),
    ) {
        let handler_label = self.create_label();
        let end = self.create_label();

        let region = self.begin_try();
        body(self);
        self.end_try(region, handler_label, match_type);
        self.emit_jump(end);

        self.bind_label(handler_label);
        self.begin_handler();
        handler(self);
        self.end_handler();

        self.bind_label(end);
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    fn resolve(&self, label: Label) -> VmResult<u32> {
        self.labels
            .get(label.0 as usize)
            .copied()
            .flatten()
            .ok_or_else(|| {
                RuntimeError::internal(format!("unbound label {} in '{}'", label.0, self.name))
            })
    }

    fn validate(&self) -> VmResult<()> {
        let len = self.instructions.len() as u32;
        let check_const = |index: ConstIndex| {
            if (index.0 as usize) < self.constants.len() {
                Ok(())
            } else {
                Err(RuntimeError::internal(format!(
                    "constant {index} out of range in '{}'",
                    self.name
                )))
            }
        };

        for (pc, inst) in self.instructions.iter().enumerate() {
            match *inst {
                Instruction::LoadConst { index, .. } | Instruction::ExcInfo { label: index } => {
                    check_const(index)?;
                }
                Instruction::Raise {
                    message: Some(index),
                    ..
                } => check_const(index)?,
                Instruction::Jump { target } if target > len => {
                    return Err(RuntimeError::internal(format!(
                        "jump target {target} out of range at {pc} in '{}'",
                        self.name
                    )));
                }
                Instruction::Call { code, .. } | Instruction::MakeGenerator { code, .. } => {
                    let child = self.children.get(code as usize).ok_or_else(|| {
                        RuntimeError::internal(format!(
                            "code #{code} out of range in '{}'",
                            self.name
                        ))
                    })?;
                    let wants_generator = matches!(inst, Instruction::MakeGenerator { .. });
                    if child.is_generator() != wants_generator {
                        return Err(RuntimeError::internal(format!(
                            "'{}' is {}a generator body ({inst} in '{}')",
                            child.name,
                            if child.is_generator() { "" } else { "not " },
                            self.name
                        )));
                    }
                }
                Instruction::Yield { .. } if !self.flags.contains(CodeFlags::GENERATOR) => {
                    return Err(RuntimeError::internal(format!(
                        "yield outside generator body '{}'",
                        self.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Finishes building and returns the code object.
    ///
    /// Fails on unbound labels, unclosed regions and dangling indices.
    pub fn finish(mut self) -> VmResult<CodeObject> {
        if self.open_tries != 0 || self.handler_depth != 0 {
            return Err(RuntimeError::internal(format!(
                "unclosed try region or handler in '{}'",
                self.name
            )));
        }

        for &(index, label) in &self.forward_refs {
            let target = self.resolve(label)?;
            self.instructions[index] = Instruction::Jump { target };
        }

        let mut exception_table = Vec::with_capacity(self.pending_entries.len());
        for pending in &self.pending_entries {
            exception_table.push(ExceptionEntry {
                start_pc: pending.start_pc,
                end_pc: pending.end_pc,
                handler_pc: self.resolve(pending.handler)?,
                depth: pending.depth,
                match_type: pending.match_type,
            });
        }

        self.validate()?;

        let register_count = self
            .instructions
            .iter()
            .filter_map(Instruction::max_register)
            .max()
            .map_or(0, |r| r as u16 + 1);

        Ok(CodeObject {
            name: self.name,
            filename: self.filename,
            first_lineno: self.first_lineno,
            instructions: self.instructions.into_boxed_slice(),
            constants: self.constants.into_boxed_slice(),
            children: self.children.into_boxed_slice(),
            exception_table: exception_table.into_boxed_slice(),
            line_table: self.line_table.into_boxed_slice(),
            register_count,
            flags: self.flags,
        })
    }
}
