//! Call frame for function call stack management

use std::sync::Arc;

use core_types::{ObjHandle, VmError, VmResult};

/// Call frame representing one function invocation
///
/// Holds its own reference to the function's code so operand reads never go
/// back through the heap.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Function being executed
    pub function: ObjHandle,
    /// Instruction bytes of the function
    pub code: Arc<[u8]>,
    /// Offset of the next byte to read
    pub ip: usize,
    /// Offset of the instruction currently executing
    pub ip_last: usize,
    /// Stack index of slot zero (the callee or receiver)
    pub slots: usize,
    /// Module whose locals this frame sees
    pub module: Option<ObjHandle>,
    /// Offset recorded by `OP_FAILSAFE`
    pub failsafe: Option<usize>,
}

impl CallFrame {
    /// Create a frame positioned at the start of `code`
    pub fn new(
        function: ObjHandle,
        code: Arc<[u8]>,
        slots: usize,
        module: Option<ObjHandle>,
    ) -> Self {
        Self {
            function,
            code,
            ip: 0,
            ip_last: 0,
            slots,
            module,
            failsafe: None,
        }
    }

    fn take<const N: usize>(&mut self) -> VmResult<[u8; N]> {
        let end = self.ip + N;
        let bytes = self
            .code
            .get(self.ip..end)
            .ok_or_else(|| VmError::fatal("Unexpected end of bytecode."))?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.ip = end;
        Ok(out)
    }

    /// Read one byte operand
    pub fn read_u8(&mut self) -> VmResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a little-endian `u16` operand
    pub fn read_u16(&mut self) -> VmResult<u16> {
        self.take().map(u16::from_le_bytes)
    }

    /// Read a little-endian `i16` operand
    pub fn read_i16(&mut self) -> VmResult<i16> {
        self.take().map(i16::from_le_bytes)
    }

    /// Read a little-endian `u32` operand
    pub fn read_u32(&mut self) -> VmResult<u32> {
        self.take().map(u32::from_le_bytes)
    }

    /// Read a little-endian `i32` operand
    pub fn read_i32(&mut self) -> VmResult<i32> {
        self.take().map(i32::from_le_bytes)
    }

    /// Read a little-endian `f32` operand
    pub fn read_f32(&mut self) -> VmResult<f32> {
        self.take().map(f32::from_le_bytes)
    }

    /// Move the instruction pointer by a signed distance
    pub fn jump(&mut self, distance: isize) -> VmResult<()> {
        let target = self.ip as isize + distance;
        if target < 0 || target as usize > self.code.len() {
            return Err(VmError::fatal(format!(
                "Jump target {} is outside the function.",
                target
            )));
        }
        self.ip = target as usize;
        Ok(())
    }
}
