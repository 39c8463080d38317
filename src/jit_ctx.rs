use cranelift::codegen::settings::{self, Configurable};
use cranelift::codegen::Context;
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Module, ModuleError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum JitError {
    #[error("JIT error: host machine is not supported: {0}")]
    UnsupportedHost(String),
    #[error("JIT error: invalid code generator settings: {0}")]
    Settings(String),
    #[error("JIT error: {0}")]
    Module(#[from] ModuleError),
}

/// A finalized nullary function that computes one expression.
#[derive(Debug, Clone, Copy)]
pub struct CompiledExpression {
    func: extern "C" fn() -> i64,
}

impl CompiledExpression {
    /// Runs the compiled code. Overflow wraps around.
    pub fn call(&self) -> i64 {
        (self.func)()
    }
}

pub struct JITContext {
    pub(crate) module: JITModule,
    pub(crate) ctx: Context,
    pub(crate) func_ctx: FunctionBuilderContext,
    pub(crate) expr_index: usize,
}

impl JITContext {
    pub fn new() -> Result<Self, JitError> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .map_err(|err| JitError::Settings(err.to_string()))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|err| JitError::Settings(err.to_string()))?;
        let isa_builder = cranelift_native::builder()
            .map_err(|msg| JitError::UnsupportedHost(msg.to_owned()))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|err| JitError::Settings(err.to_string()))?;
        debug!("created JIT module for the host ISA");

        let module = JITModule::new(JITBuilder::with_isa(isa, default_libcall_names()));
        let ctx = module.make_context();
        let func_ctx = FunctionBuilderContext::new();

        Ok(Self {
            module,
            ctx,
            func_ctx,
            expr_index: 0,
        })
    }

    pub(crate) fn get_finalized_function(
        &mut self,
        func_id: FuncId,
    ) -> Result<CompiledExpression, JitError> {
        // Perform linking.
        self.module.finalize_definitions()?;

        let raw_func_ptr = self.module.get_finalized_function(func_id);
        // Cast it to a rust function pointer type.
        let func = unsafe { std::mem::transmute::<_, extern "C" fn() -> i64>(raw_func_ptr) };
        Ok(CompiledExpression { func })
    }
}
