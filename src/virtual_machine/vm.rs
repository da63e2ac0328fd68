//! Core virtual machine implementation.
//!
//! The VM executes bytecode against a [`Memory`] image lent to it by the
//! host, with a global operand stack and a call stack of register snapshots.
//! All arithmetic uses wrapping semantics; the few operations with stricter
//! contracts (`DIV`, `MOD`, `SUB`) fault through the termination [`Status`].
//!
//! Faults are non-resumable: the first non-[`Status::Ok`] value stops the
//! dispatch loop and control returns to the host, which inspects `term` and
//! the memory image.

use crate::utils::log;
use crate::virtual_machine::disassembler;
use crate::virtual_machine::isa::{Opcode, OPCODE_MASK, STACK};
use crate::virtual_machine::memory::{Memory, Registers};
use crate::virtual_machine::operand;
use std::fmt;

/// Instruction budget for a single `run` call unless overridden.
pub const DEFAULT_OP_LIMIT: u64 = 50_000;

/// Largest program reachable by 2-byte jump operands.
///
/// The VM itself accepts longer buffers; the bound is an assembler-side
/// constraint.
pub const CODE_LIMIT: usize = 65_536;

/// Termination status of a run, kept in the VM's `term` field.
///
/// The numeric codes are part of the machine contract and are surfaced as
/// the `gvm` process exit status.
#[repr(u64)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Program terminated successfully.
    Ok = 0,
    /// Unknown opcode byte (or a STACK flag on a non-capable opcode).
    BadOpcode = 1,
    /// Unexpectedly ran out of code bytes while decoding.
    OutOfCode = 2,
    /// Division or modulo by zero.
    DivZero = 3,
    /// Reached the opcode run limit.
    OpLimit = 4,
    /// Operand stack was empty on pop.
    Underflow = 5,
    /// RET without a CALL to return from.
    BareRet = 6,
    /// Invalid io address accessed.
    Segfault = 7,
    /// SUB produced an unsigned underflow.
    NegNum = 8,
}

impl Status {
    /// Returns the numeric machine return code.
    pub const fn code(self) -> u64 {
        self as u64
    }

    /// Returns true for normal termination.
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Status::Ok => "program terminated successfully",
            Status::BadOpcode => "invalid opcode",
            Status::OutOfCode => "unexpectedly ran out of code bytes",
            Status::DivZero => "division by zero",
            Status::OpLimit => "reached opcode run limit",
            Status::Underflow => "stack is empty on pop",
            Status::BareRet => "RET without CALL to return from",
            Status::Segfault => "invalid io address accessed",
            Status::NegNum => "unsigned subtraction went negative",
        };
        write!(f, "{msg}")
    }
}

/// Host hook invoked by the `HOST` instruction with a mutable view of the
/// memory image. Runs synchronously on the VM thread.
pub type HostHook<'a> = Box<dyn FnMut(&mut Memory) + 'a>;

/// The GVM bytecode virtual machine.
///
/// Borrows the memory image and the code buffer from the host; owns only
/// its two stacks and bookkeeping. The program counter lives in the memory
/// image itself (`io[0]`), so it is saved and restored by `CALL`/`RET`
/// like any other register.
pub struct Vm<'a> {
    io: &'a mut Memory,
    code: &'a [u8],
    host: Option<HostHook<'a>>,
    /// Global operand stack; persists across calls and returns.
    stack: Vec<u64>,
    /// Call stack of register snapshots.
    frames: Vec<Registers>,
    term: Status,
    count: u64,
    /// Last dispatch byte fetched, kept for host diagnostics.
    opcode: u8,
    trace: bool,
}

impl<'a> Vm<'a> {
    /// Creates a VM over the given memory image and code buffer.
    pub fn new(io: &'a mut Memory, code: &'a [u8]) -> Self {
        Self {
            io,
            code,
            host: None,
            stack: Vec::new(),
            frames: Vec::new(),
            term: Status::Ok,
            count: 0,
            opcode: 0,
            trace: false,
        }
    }

    /// Creates a VM with a host hook for the `HOST` instruction.
    pub fn with_host(io: &'a mut Memory, code: &'a [u8], host: HostHook<'a>) -> Self {
        let mut vm = Self::new(io, code);
        vm.host = Some(host);
        vm
    }

    /// Replaces the code buffer.
    pub fn set_code(&mut self, code: &'a [u8]) {
        self.code = code;
    }

    /// Replaces the host hook.
    pub fn set_host(&mut self, host: HostHook<'a>) {
        self.host = Some(host);
    }

    /// Zeroes the register file, typically between `set_code` and a fresh
    /// run so execution starts again at offset 0.
    pub fn clear_registers(&mut self) {
        self.io.clear_registers();
    }

    /// Enables or disables per-instruction debug tracing.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Returns the termination status of the last run.
    pub fn term(&self) -> Status {
        self.term
    }

    /// Returns the number of instructions executed by the last run.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the last dispatch byte fetched.
    pub fn last_opcode(&self) -> u8 {
        self.opcode
    }

    /// Returns the operand stack, top last.
    pub fn stack(&self) -> &[u64] {
        &self.stack
    }

    /// Returns the current call depth.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Executes bytecode until termination, fault, or the instruction limit.
    ///
    /// Execution starts at the current `PC` and ends normally when `PC`
    /// reaches the end of the code buffer, or when `TERM` sets the
    /// `u64::MAX` sentinel. Returns the termination status, which stays
    /// inspectable through [`term`](Self::term).
    pub fn run(&mut self, limit: u64) -> Status {
        self.term = Status::Ok;
        self.count = 0;

        while self.term.is_ok() && self.io.pc() < self.code.len() as u64 {
            self.count += 1;
            if self.count > limit {
                self.term = Status::OpLimit;
                break;
            }

            let pc = self.io.pc() as usize;
            if self.trace {
                if let Ok((line, _)) = disassembler::instruction_at(self.code, pc) {
                    log::debug(&line);
                }
            }

            let byte = self.code[pc];
            self.opcode = byte;
            self.io.set_pc(pc as u64 + 1);

            if let Err(fault) = self.step(byte) {
                self.term = fault;
            }
        }

        self.term
    }

    /// Decodes and executes one instruction body (the dispatch byte has
    /// already been fetched).
    fn step(&mut self, byte: u8) -> Result<(), Status> {
        let stacked = byte & STACK != 0;
        let op = Opcode::try_from(byte & OPCODE_MASK).map_err(|_| Status::BadOpcode)?;
        if stacked && !op.has_stack_form() {
            return Err(Status::BadOpcode);
        }

        match op {
            Opcode::Nop => Ok(()),
            Opcode::Term => {
                self.io.set_pc(u64::MAX);
                Ok(())
            }
            Opcode::Set => self.op_set(),
            Opcode::Jmp => self.op_jmp(),
            Opcode::Add => self.binary(stacked, |a, b| a.wrapping_add(b)),
            Opcode::Sub => self.op_sub(stacked),
            Opcode::Mul => self.binary(stacked, |a, b| a.wrapping_mul(b)),
            Opcode::Div => self.op_div(stacked),
            Opcode::Mod => self.op_mod(stacked),
            Opcode::Or => self.binary(stacked, |a, b| a | b),
            Opcode::Andl => self.binary(stacked, |a, b| (a != 0 && b != 0) as u64),
            Opcode::Xor => self.binary(stacked, |a, b| a ^ b),
            Opcode::Not => self.unary(stacked, |a| (a == 0) as u64),
            Opcode::Shl => self.binary(stacked, |a, b| a.wrapping_shl(b as u32)),
            Opcode::Shr => self.binary(stacked, |a, b| a.wrapping_shr(b as u32)),
            Opcode::Inc => self.op_inc(),
            Opcode::Dec => self.op_dec(),
            Opcode::Push => self.op_push(),
            Opcode::Pop => self.op_pop(),
            Opcode::And => self.binary(stacked, |a, b| a & b),
            Opcode::Host => self.op_host(),
            Opcode::Vpush => self.op_vpush(),
            Opcode::Vpop => self.op_vpop(),
            Opcode::Call => self.op_call(),
            Opcode::Ret => self.op_ret(),
            Opcode::Jf => self.op_branch(stacked, false),
            Opcode::Jt => self.op_branch(stacked, true),
            Opcode::Eq => self.binary(stacked, |a, b| (a == b) as u64),
            Opcode::Ne => self.binary(stacked, |a, b| (a != b) as u64),
            Opcode::Gt => self.binary(stacked, |a, b| (a > b) as u64),
            Opcode::Lt => self.binary(stacked, |a, b| (a < b) as u64),
            Opcode::Ge => self.binary(stacked, |a, b| (a >= b) as u64),
            Opcode::Le => self.binary(stacked, |a, b| (a <= b) as u64),
            Opcode::Neg => self.unary(stacked, |a| !a),
            Opcode::Orl => self.binary(stacked, |a, b| (a != 0 || b != 0) as u64),
        }
    }

    // =========================
    // Operand access
    // =========================

    /// Decodes one inline operand at `PC` and advances past it.
    fn fetch_operand(&mut self) -> Result<operand::Operand, Status> {
        let pc = self.io.pc() as usize;
        let (op, consumed) = operand::decode(self.code, pc).map_err(|_| Status::OutOfCode)?;
        self.io.set_pc((pc + consumed) as u64);
        Ok(op)
    }

    /// Fetches a source operand, applying `REG_PTR` indirection.
    fn source(&mut self) -> Result<u64, Status> {
        let op = self.fetch_operand()?;
        if op.indirect {
            self.load(op.value)
        } else {
            Ok(op.value)
        }
    }

    /// Fetches a destination operand: the raw decoded value is the memory
    /// index, whether or not `REG_PTR` was set.
    fn target(&mut self) -> Result<u64, Status> {
        Ok(self.fetch_operand()?.value)
    }

    /// Fetches a bare 2-byte jump operand and advances past it.
    fn jump_target(&mut self) -> Result<u64, Status> {
        let pc = self.io.pc() as usize;
        let (addr, consumed) =
            operand::decode_jump(self.code, pc).map_err(|_| Status::OutOfCode)?;
        self.io.set_pc((pc + consumed) as u64);
        Ok(addr)
    }

    fn load(&self, index: u64) -> Result<u64, Status> {
        self.io.get(index).ok_or(Status::Segfault)
    }

    fn store(&mut self, index: u64, value: u64) -> Result<(), Status> {
        self.io.set(index, value).ok_or(Status::Segfault)
    }

    fn pop(&mut self) -> Result<u64, Status> {
        self.stack.pop().ok_or(Status::Underflow)
    }

    /// Fetches the `(a, b)` pair of a two-operand instruction. Stack form
    /// pops in reverse: the top of the stack is the right-hand operand.
    fn pair(&mut self, stacked: bool) -> Result<(u64, u64), Status> {
        if stacked {
            let b = self.pop()?;
            let a = self.pop()?;
            Ok((a, b))
        } else {
            let a = self.source()?;
            let b = self.source()?;
            Ok((a, b))
        }
    }

    fn single(&mut self, stacked: bool) -> Result<u64, Status> {
        if stacked {
            self.pop()
        } else {
            self.source()
        }
    }

    /// Routes a result: stack form pushes it, register form writes `R`.
    fn put(&mut self, stacked: bool, value: u64) {
        if stacked {
            self.stack.push(value);
        } else {
            self.io.set_r(value);
        }
    }

    // =========================
    // Instruction bodies
    // =========================

    fn binary(&mut self, stacked: bool, f: fn(u64, u64) -> u64) -> Result<(), Status> {
        let (a, b) = self.pair(stacked)?;
        self.put(stacked, f(a, b));
        Ok(())
    }

    fn unary(&mut self, stacked: bool, f: fn(u64) -> u64) -> Result<(), Status> {
        let a = self.single(stacked)?;
        self.put(stacked, f(a));
        Ok(())
    }

    fn op_set(&mut self) -> Result<(), Status> {
        let dst = self.target()?;
        let src = self.source()?;
        self.store(dst, src)
    }

    fn op_jmp(&mut self) -> Result<(), Status> {
        let addr = self.jump_target()?;
        self.io.set_pc(addr);
        Ok(())
    }

    fn op_sub(&mut self, stacked: bool) -> Result<(), Status> {
        let (a, b) = self.pair(stacked)?;
        // The wrapped result is written before the underflow fault fires.
        self.put(stacked, a.wrapping_sub(b));
        if a < b {
            return Err(Status::NegNum);
        }
        Ok(())
    }

    fn op_div(&mut self, stacked: bool) -> Result<(), Status> {
        let (a, b) = self.pair(stacked)?;
        if b == 0 {
            return Err(Status::DivZero);
        }
        self.put(stacked, a / b);
        Ok(())
    }

    fn op_mod(&mut self, stacked: bool) -> Result<(), Status> {
        let (a, b) = self.pair(stacked)?;
        if b == 0 {
            return Err(Status::DivZero);
        }
        self.put(stacked, a % b);
        Ok(())
    }

    fn op_inc(&mut self) -> Result<(), Status> {
        let dst = self.target()?;
        let value = self.load(dst)?;
        self.store(dst, value.wrapping_add(1))
    }

    fn op_dec(&mut self) -> Result<(), Status> {
        let dst = self.target()?;
        let value = self.load(dst)?;
        self.store(dst, value.wrapping_sub(1))
    }

    fn op_push(&mut self) -> Result<(), Status> {
        let value = self.source()?;
        self.stack.push(value);
        Ok(())
    }

    fn op_pop(&mut self) -> Result<(), Status> {
        // Underflow is detected before the operand is consumed.
        if self.stack.is_empty() {
            return Err(Status::Underflow);
        }
        let dst = self.target()?;
        let value = self.pop()?;
        self.store(dst, value)
    }

    fn op_host(&mut self) -> Result<(), Status> {
        if let Some(hook) = self.host.as_mut() {
            hook(&mut *self.io);
        }
        Ok(())
    }

    fn op_vpush(&mut self) -> Result<(), Status> {
        let ptr = self.target()?;
        let value = self.source()?;
        // Pre-increment the length cell, then write the new top slot.
        let top = self.load(ptr)?.wrapping_add(1);
        self.store(ptr, top)?;
        self.store(top, value)
    }

    fn op_vpop(&mut self) -> Result<(), Status> {
        let ptr = self.target()?;
        let dst = self.target()?;
        let top = self.load(ptr)?;
        let value = self.load(top)?;
        self.store(dst, value)?;
        self.store(ptr, top.wrapping_sub(1))
    }

    fn op_call(&mut self) -> Result<(), Status> {
        let addr = self.jump_target()?;
        // Snapshot all registers, including the PC already advanced past
        // this instruction, which is what RET will come back to.
        self.frames.push(self.io.registers());
        self.io.set_pc(addr);
        Ok(())
    }

    fn op_ret(&mut self) -> Result<(), Status> {
        let value = self.source()?;
        let frame = self.frames.pop().ok_or(Status::BareRet)?;
        self.io.restore_registers(&frame);
        // R carries the return value instead of being restored.
        self.io.set_r(value);
        Ok(())
    }

    fn op_branch(&mut self, stacked: bool, jump_if_nonzero: bool) -> Result<(), Status> {
        let cond = if stacked { self.pop()? } else { self.source()? };
        // Decoding the jump operand advances PC past it, which is exactly
        // the non-taken fall-through position.
        let addr = self.jump_target()?;
        if (cond != 0) == jump_if_nonzero {
            self.io.set_pc(addr);
        }
        Ok(())
    }
}
