use crate::{
    expr::*,
    jit_ctx::{CompiledExpression, JITContext, JitError},
};
use codegen::ir::UserFuncName;
use cranelift::prelude::*;
use cranelift_module::{Linkage, Module};
use tracing::debug;

pub struct Codegen<'a> {
    jit: &'a mut JITContext,
}

impl<'a> Codegen<'a> {
    pub fn new(jit: &'a mut JITContext) -> Self {
        Self { jit }
    }

    /// Compiles `expr` into a function returning its value as `i64`.
    pub fn codegen_expr(&mut self, expr: &Expression) -> Result<CompiledExpression, JitError> {
        let func_name = format!("expr{}", self.jit.expr_index);
        let mut func_sig = self.jit.module.make_signature();
        func_sig.returns.push(AbiParam::new(types::I64));
        let func_id = self
            .jit
            .module
            .declare_function(&func_name, Linkage::Local, &func_sig)?;

        self.jit.ctx.func.signature = func_sig;
        self.jit.ctx.func.name = UserFuncName::user(0, func_id.as_u32());

        let mut func_builder: FunctionBuilder =
            FunctionBuilder::new(&mut self.jit.ctx.func, &mut self.jit.func_ctx);

        let block = func_builder.create_block();
        func_builder.switch_to_block(block);

        let value = emit(&mut func_builder, expr);

        func_builder.ins().return_(&[value]);
        func_builder.seal_all_blocks();
        func_builder.finalize();

        let defined = self.jit.module.define_function(func_id, &mut self.jit.ctx);
        self.jit.module.clear_context(&mut self.jit.ctx);
        defined?;

        debug!(name = %func_name, "compiled `{expr}`");
        self.jit.expr_index += 1;
        self.jit.get_finalized_function(func_id)
    }
}

fn emit(func_builder: &mut FunctionBuilder, expr: &Expression) -> Value {
    match expr {
        Expression::Number(num) => {
            let num: i64 = num.into();
            func_builder.ins().iconst(types::I64, num)
        }
        Expression::Add(lhs, rhs) => {
            let lhs = emit(func_builder, lhs);
            let rhs = emit(func_builder, rhs);
            func_builder.ins().iadd(lhs, rhs)
        }
        Expression::Sub(lhs, rhs) => {
            let lhs = emit(func_builder, lhs);
            let rhs = emit(func_builder, rhs);
            func_builder.ins().isub(lhs, rhs)
        }
    }
}

impl JITContext {
    pub fn evaluate(&mut self, expr: &Expression) -> Result<i64, JitError> {
        let compiled = Codegen::new(self).codegen_expr(expr)?;
        Ok(compiled.call())
    }
}

#[cfg(test)]
mod tests {
    use super::Codegen;
    use crate::{expr::*, jit_ctx::JITContext, parser};

    #[test]
    fn jit_number_test() {
        let mut jit = JITContext::new().unwrap();
        let value = jit.evaluate(&Expression::number(-42)).unwrap();
        assert_eq!(value, -42, "expected -42, but got {value}");
    }

    #[test]
    fn jit_matches_interpreter_test() {
        let mut jit = JITContext::new().unwrap();
        for source in ["5 + 3 - 2", "10 - 4 + 2", "7", "0 - 9 - 9 + 100 - -3"] {
            let expr = parser::parse(source).unwrap();
            let expected = expr.evaluate().unwrap();
            let value = jit.evaluate(&expr).unwrap();
            assert_eq!(value, expected, "`{source}`: expected {expected}, but got {value}");
        }
    }

    #[test]
    fn jit_grouped_right_operand_test() {
        let expr = Expression::sub(
            Expression::number(10),
            Expression::add(Expression::number(4), Expression::number(2)),
        );
        let mut jit = JITContext::new().unwrap();
        assert_eq!(jit.evaluate(&expr).unwrap(), 4);
    }

    #[test]
    fn jit_wraps_on_overflow_test() {
        let expr = parser::parse("9223372036854775807 + 1").unwrap();
        let mut jit = JITContext::new().unwrap();
        let value = jit.evaluate(&expr).unwrap();
        assert_eq!(value, expr.evaluate_with(OverflowPolicy::Wrapping).unwrap());
        assert_eq!(value, i64::MIN);
    }

    #[test]
    fn compiled_expression_is_reusable_test() {
        let expr = parser::parse("1 + 2 + 3").unwrap();
        let mut jit = JITContext::new().unwrap();
        let first = Codegen::new(&mut jit).codegen_expr(&expr).unwrap();
        let second = Codegen::new(&mut jit).codegen_expr(&expr).unwrap();

        for _ in 0..3 {
            assert_eq!(first.call(), 6);
            assert_eq!(second.call(), 6);
        }
    }
}
