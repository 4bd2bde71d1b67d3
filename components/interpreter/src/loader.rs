//! Binds decoded bytecode containers into the runtime.

use std::sync::Arc;

use bytecode_system::{BytecodeContainer, Constant, ContainerError};
use core_types::{ObjHandle, Value};
use memory_manager::{Obj, ObjFunction, ObjModule};

use crate::runtime::Runtime;

/// Decode `bytes` and bind the result as a new module.
///
/// See [`load_module`].
pub fn read_module(
    runtime: &mut Runtime,
    bytes: &[u8],
    file_hash: u32,
) -> Result<ObjHandle, ContainerError> {
    let container = BytecodeContainer::read(bytes)?;
    Ok(load_module(runtime, &container, file_hash))
}

/// Materialise a container's functions as a module.
///
/// Tokens are registered first so functions can be named from them. The
/// module's filename comes from the container, or is the file hash in
/// uppercase hex. Every function is appended to the runtime's function list
/// and the module to its module list. Nothing is executed.
pub fn load_module(runtime: &mut Runtime, container: &BytecodeContainer, file_hash: u32) -> ObjHandle {
    for token in &container.tokens {
        runtime.add_token(token);
    }

    let filename = match &container.source_filename {
        Some(name) => name.clone(),
        None => format!("{:08X}", file_hash),
    };
    let filename = runtime.heap.new_string(&filename);
    let module = runtime.heap.alloc(Obj::Module(ObjModule {
        source_filename: Some(filename),
        ..ObjModule::default()
    }));

    let mut functions = Vec::with_capacity(container.functions.len());
    for (index, proto) in container.functions.iter().enumerate() {
        let constants = proto
            .chunk
            .constants
            .iter()
            .map(|constant| match constant {
                Constant::Integer(n) => Value::Integer(*n),
                Constant::Decimal(n) => Value::Decimal(*n),
                Constant::String(s) => runtime.heap.string_value(s),
            })
            .collect();

        let name = match runtime.token(proto.name_hash) {
            Some(token) => token.to_string(),
            None if index == 0 => "main".to_string(),
            None => "<anonymous-fn>".to_string(),
        };
        let name = runtime.heap.new_string(&name);

        let mut function = ObjFunction::new(proto.arity, proto.name_hash, proto.chunk.code.clone());
        function.name = Some(name);
        function.source_filename = Some(filename);
        function.module = Some(module);
        function.lines = proto.chunk.lines.as_ref().map(|l| Arc::from(l.as_slice()));
        function.constants = constants;

        let handle = runtime.heap.alloc(Obj::Function(function));
        functions.push(handle);
    }

    runtime.functions.extend(functions.iter().copied());
    if let Some(m) = runtime.heap.module_mut(module) {
        m.functions = functions;
    }
    runtime.modules.push(module);

    log::trace!(
        "Loaded module {:08X} with {} functions",
        file_hash,
        container.functions.len()
    );
    module
}

/// Entry function of a module
pub fn entry_function(runtime: &Runtime, module: ObjHandle) -> Option<ObjHandle> {
    runtime.heap.module(module)?.functions.first().copied()
}
