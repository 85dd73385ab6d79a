//! Execution thread: operand stack, frames and global values.

use std::cmp::Ordering;
use std::rc::Rc;

use tinybridge_core::{CallContext, RuntimeError, ScriptValue};

use crate::bytecode::Instr;
use crate::compiler::Program;
use crate::state::State;

/// Deepest script call nesting before [`RuntimeError::StackOverflow`].
pub const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Frame {
    function: usize,
    ip: usize,
    /// Stack index of slot 0.
    base: usize,
}

/// Runs functions of a [`State`]'s program.
///
/// A thread belongs to one state; it holds the values of that state's
/// globals between calls.
#[derive(Debug, Default)]
pub struct Thread {
    stack: Vec<ScriptValue>,
    frames: Vec<Frame>,
    globals: Vec<ScriptValue>,
}

impl Thread {
    pub fn new(state: &State) -> Self {
        let mut thread = Self::default();
        thread.sync_globals(state);
        thread
    }

    /// Size the global table to `state` and apply the current program's
    /// initializers. Host-set values are left alone.
    pub fn sync_globals(&mut self, state: &State) {
        if self.globals.len() < state.global_count() {
            self.globals.resize(state.global_count(), ScriptValue::Null);
        }
        for (index, value) in state.script_global_inits() {
            if let Some(slot) = self.globals.get_mut(*index) {
                *slot = value.clone();
            }
        }
    }

    pub fn set_global(&mut self, index: usize, value: ScriptValue) {
        if index >= self.globals.len() {
            self.globals.resize(index + 1, ScriptValue::Null);
        }
        self.globals[index] = value;
    }

    pub fn global(&self, index: usize) -> Option<&ScriptValue> {
        self.globals.get(index)
    }

    /// Call script function `index` with `args` and run it to completion.
    ///
    /// On error the thread is reset to where it was before the call.
    pub fn call_function(
        &mut self,
        state: &State,
        index: usize,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, RuntimeError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("Thread::call_function");

        let program = state.program.as_ref().ok_or(RuntimeError::NotCompiled)?;
        let function = program
            .functions
            .get(index)
            .ok_or(RuntimeError::InvalidFunctionIndex { index })?;
        if args.len() != function.arity {
            return Err(RuntimeError::ArityMismatch {
                function: function.name.clone(),
                expected: function.arity,
                found: args.len(),
            });
        }
        if self.globals.len() < state.global_count() {
            self.globals.resize(state.global_count(), ScriptValue::Null);
        }

        let stack_mark = self.stack.len();
        let frame_mark = self.frames.len();

        self.stack.extend_from_slice(args);
        let result = self
            .enter(program, index, stack_mark)
            .and_then(|()| self.run(state, program, frame_mark));

        if result.is_err() {
            self.stack.truncate(stack_mark);
            self.frames.truncate(frame_mark);
        }
        result
    }

    /// Push a frame for `function` whose arguments start at `base`.
    fn enter(&mut self, program: &Program, function: usize, base: usize) -> Result<(), RuntimeError> {
        let compiled = program
            .functions
            .get(function)
            .ok_or(RuntimeError::InvalidFunctionIndex { index: function })?;
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow {
                depth: self.frames.len(),
            });
        }
        self.stack.resize(base + compiled.slots, ScriptValue::Null);
        self.frames.push(Frame {
            function,
            ip: 0,
            base,
        });
        Ok(())
    }

    fn pop(&mut self) -> ScriptValue {
        self.stack.pop().unwrap_or_default()
    }

    fn pop_pair(&mut self) -> (ScriptValue, ScriptValue) {
        let right = self.pop();
        let left = self.pop();
        (left, right)
    }

    fn pop_bool(&mut self) -> Result<bool, RuntimeError> {
        match self.pop() {
            ScriptValue::Bool(v) => Ok(v),
            other => Err(RuntimeError::NonBoolCondition {
                actual: other.type_name(),
            }),
        }
    }

    /// Execute until the frame at depth `frame_mark` returns.
    fn run(&mut self, state: &State, program: &Program, frame_mark: usize) -> Result<ScriptValue, RuntimeError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(ScriptValue::Null);
            };
            let code = program.functions[frame.function].chunk.code();
            let Some(&instr) = code.get(frame.ip) else {
                // Chunks always end in Return; running past the end is a bad jump.
                return Err(RuntimeError::InvalidFunctionIndex {
                    index: frame.function,
                });
            };
            frame.ip += 1;
            let base = frame.base;

            match instr {
                Instr::Const(index) => {
                    let value = program
                        .constants
                        .get(index)
                        .map(|c| c.to_value())
                        .unwrap_or_default();
                    self.stack.push(value);
                }
                Instr::PushNull => self.stack.push(ScriptValue::Null),
                Instr::PushTrue => self.stack.push(ScriptValue::Bool(true)),
                Instr::PushFalse => self.stack.push(ScriptValue::Bool(false)),
                Instr::Pop => {
                    self.pop();
                }
                Instr::LoadLocal(slot) => {
                    let value = self.stack[base + slot as usize].clone();
                    self.stack.push(value);
                }
                Instr::StoreLocal(slot) => {
                    let value = self.pop();
                    self.stack[base + slot as usize] = value;
                }
                Instr::LoadGlobal(index) => {
                    let value = self
                        .globals
                        .get(index as usize)
                        .cloned()
                        .ok_or(RuntimeError::InvalidGlobalIndex {
                            index: index as usize,
                        })?;
                    self.stack.push(value);
                }
                Instr::StoreGlobal(index) => {
                    let value = self.pop();
                    let slot = self
                        .globals
                        .get_mut(index as usize)
                        .ok_or(RuntimeError::InvalidGlobalIndex {
                            index: index as usize,
                        })?;
                    *slot = value;
                }
                Instr::Neg => {
                    let value = match self.pop() {
                        ScriptValue::Int(v) => ScriptValue::Int(v.wrapping_neg()),
                        ScriptValue::Float(v) => ScriptValue::Float(-v),
                        other => {
                            return Err(RuntimeError::InvalidOperand {
                                op: "-",
                                operand: other.type_name(),
                            });
                        }
                    };
                    self.stack.push(value);
                }
                Instr::Not => {
                    let value = match self.pop() {
                        ScriptValue::Bool(v) => ScriptValue::Bool(!v),
                        other => {
                            return Err(RuntimeError::InvalidOperand {
                                op: "!",
                                operand: other.type_name(),
                            });
                        }
                    };
                    self.stack.push(value);
                }
                Instr::Add | Instr::Sub | Instr::Mul | Instr::Div | Instr::Rem => {
                    let (left, right) = self.pop_pair();
                    self.stack.push(arithmetic(instr, left, right)?);
                }
                Instr::Eq | Instr::Ne => {
                    let (left, right) = self.pop_pair();
                    let equal = values_equal(&left, &right);
                    self.stack
                        .push(ScriptValue::Bool(equal == (instr == Instr::Eq)));
                }
                Instr::Lt | Instr::Le | Instr::Gt | Instr::Ge => {
                    let (left, right) = self.pop_pair();
                    self.stack.push(ScriptValue::Bool(compare(instr, &left, &right)?));
                }
                Instr::CheckBool => match self.stack.last() {
                    Some(ScriptValue::Bool(_)) => {}
                    other => {
                        return Err(RuntimeError::NonBoolCondition {
                            actual: other.map_or("null", ScriptValue::type_name),
                        });
                    }
                },
                Instr::Jump(target) => self.jump(target),
                Instr::JumpIfFalse(target) => {
                    if !self.pop_bool()? {
                        self.jump(target);
                    }
                }
                Instr::Call { function, argc } => {
                    let args_base = self.stack.len() - argc as usize;
                    self.enter(program, function as usize, args_base)?;
                }
                Instr::CallForeign { function, argc } => {
                    let value = self.call_foreign(state, function as usize, argc as usize)?;
                    self.stack.push(value);
                }
                Instr::Return => {
                    let value = self.pop();
                    if let Some(frame) = self.frames.pop() {
                        self.stack.truncate(frame.base);
                    }
                    if self.frames.len() == frame_mark {
                        return Ok(value);
                    }
                    self.stack.push(value);
                }
            }
        }
    }

    fn jump(&mut self, target: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = target as usize;
        }
    }

    fn call_foreign(&mut self, state: &State, index: usize, argc: usize) -> Result<ScriptValue, RuntimeError> {
        let foreign = state
            .foreign_function(index)
            .ok_or(RuntimeError::InvalidFunctionIndex { index })?;
        let name = foreign.signature.name();
        tracing::trace!(function = name, context = %state.id(), argc, "foreign call");

        let args_base = self.stack.len() - argc;
        let mut ret = ScriptValue::Null;
        let mut ctx = CallContext::new(state.id(), name, &self.stack[args_base..], &mut ret);
        foreign
            .callable
            .call(&mut ctx)
            .map_err(|source| RuntimeError::Native {
                function: name.to_string(),
                source,
            })?;

        self.stack.truncate(args_base);
        Ok(ret)
    }
}

// ============================================================================
// Operators
// ============================================================================

fn invalid(instr: Instr, left: &ScriptValue, right: &ScriptValue) -> RuntimeError {
    RuntimeError::InvalidOperands {
        op: instr.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn arithmetic(instr: Instr, left: ScriptValue, right: ScriptValue) -> Result<ScriptValue, RuntimeError> {
    use ScriptValue::{Float, Int, Str};

    let value = match (&left, &right) {
        (Int(a), Int(b)) => {
            let (a, b) = (*a, *b);
            match instr {
                Instr::Add => Int(a.wrapping_add(b)),
                Instr::Sub => Int(a.wrapping_sub(b)),
                Instr::Mul => Int(a.wrapping_mul(b)),
                Instr::Div | Instr::Rem if b == 0 => return Err(RuntimeError::DivisionByZero),
                Instr::Div => Int(a.wrapping_div(b)),
                _ => Int(a.wrapping_rem(b)),
            }
        }
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            let (a, b) = (as_f32(&left), as_f32(&right));
            match instr {
                Instr::Add => Float(a + b),
                Instr::Sub => Float(a - b),
                Instr::Mul => Float(a * b),
                Instr::Div => Float(a / b),
                _ => Float(a % b),
            }
        }
        // `+` with a string on either side concatenates.
        (Str(_), _) | (_, Str(_)) if instr == Instr::Add => {
            Str(Rc::from(format!("{left}{right}")))
        }
        _ => return Err(invalid(instr, &left, &right)),
    };
    Ok(value)
}

fn as_f32(value: &ScriptValue) -> f32 {
    match value {
        ScriptValue::Int(v) => *v as f32,
        ScriptValue::Float(v) => *v,
        _ => 0.0,
    }
}

/// Equality with numeric promotion: `1 == 1.0`.
fn values_equal(left: &ScriptValue, right: &ScriptValue) -> bool {
    match (left, right) {
        (ScriptValue::Int(a), ScriptValue::Float(b)) | (ScriptValue::Float(b), ScriptValue::Int(a)) => {
            *a as f32 == *b
        }
        _ => left == right,
    }
}

fn compare(instr: Instr, left: &ScriptValue, right: &ScriptValue) -> Result<bool, RuntimeError> {
    let ordering = match (left, right) {
        (ScriptValue::Int(a), ScriptValue::Int(b)) => Some(a.cmp(b)),
        (ScriptValue::Int(_) | ScriptValue::Float(_), ScriptValue::Int(_) | ScriptValue::Float(_)) => {
            as_f32(left).partial_cmp(&as_f32(right))
        }
        (ScriptValue::Str(a), ScriptValue::Str(b)) => Some(a.cmp(b)),
        _ => return Err(invalid(instr, left, right)),
    };

    // NaN compares false with everything.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match instr {
        Instr::Lt => ordering == Ordering::Less,
        Instr::Le => ordering != Ordering::Greater,
        Instr::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}
