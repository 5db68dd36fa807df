//! Refinement of call expressions.
//!
//! Calls to functions with a known body re-enter the work-list analysis for
//! the callee's CFG in a fresh context, so the callee's locals never leak
//! into the caller except through the explicit channels: parameter types in,
//! return type and observed object mutations out. Calls to externally
//! declared functions (body unknown) check the signature, analyzing supplied
//! function literals against expected callback parameters.

use std::cell::RefCell;

use fnv::FnvHashMap;
use tracing::{debug, trace};

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::semantic::symbol::{SymbolFlags, SymbolId};
use crate::types::Type;

/// In-flight invocations per function declaration beyond this bound fall
/// back to the best-known return type instead of unfolding further.
const MAX_INVOCATION_DEPTH: usize = 20;

/// One invocation of a declared function: the declaration, the resolved
/// `this` type, the argument types, and the return binding created at entry.
#[derive(Debug, Clone)]
struct Invocation {
    function: NodeId,
    this_type: Type,
    argument_types: Vec<Type>,
    return_type: Type,
}

impl Invocation {
    fn matches(&self, other: &Invocation) -> bool {
        self.function == other.function
            && self.this_type == other.this_type
            && self.argument_types.len() == other.argument_types.len()
            && self
                .argument_types
                .iter()
                .zip(other.argument_types.iter())
                .all(|(a, b)| a == b)
    }
}

pub struct CallExpressionRefinementRule {
    /// The stack of in-flight invocations per declaration, for recursion
    /// detection and the depth cap.
    invocations: RefCell<FnvHashMap<NodeId, Vec<Invocation>>>,
}

impl CallExpressionRefinementRule {
    pub fn new() -> Self {
        Self {
            invocations: RefCell::new(FnvHashMap::default()),
        }
    }

    /// The `this` type of the call: the object of a method call, undefined
    /// for a plain call.
    fn this_type(
        &self,
        callee: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        if matches!(
            ctx.program().ast().kind(callee),
            NodeKind::MemberExpression { .. }
        ) {
            ctx.object_type(callee)
        } else {
            Ok(Type::Void)
        }
    }

    fn call_declared(
        &self,
        call: NodeId,
        callee: NodeId,
        arguments: &[NodeId],
        function_type: &Type,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let (declaration, return_type) = match function_type {
            Type::Function {
                declaration: Some(declaration),
                ret,
                ..
            } => (*declaration, ret),
            _ => unreachable!("call_declared expects a declared function type"),
        };

        let mut call_ctx = ctx.fresh();
        let mut argument_types = Vec::with_capacity(arguments.len());
        for argument in arguments {
            argument_types.push(ctx.infer(*argument)?);
        }
        let this_type = self.this_type(callee, ctx)?;

        let invocation = Invocation {
            function: declaration,
            this_type,
            argument_types,
            return_type: return_type.fresh(),
        };

        {
            let invocations = self.invocations.borrow();
            if let Some(stack) = invocations.get(&declaration) {
                // An equal in-flight invocation means the call graph cycled;
                // its return binding stands in for the recursive result.
                if let Some(previous) = stack.iter().find(|other| other.matches(&invocation)) {
                    trace!(function = declaration.0, "equal invocation reused");
                    return Ok(previous.return_type.clone());
                }
                if stack.len() >= MAX_INVOCATION_DEPTH {
                    debug!(
                        function = declaration.0,
                        depth = stack.len(),
                        "recursion bound reached"
                    );
                    return Ok(end_recursion(function_type));
                }
            }
        }

        self.invocations
            .borrow_mut()
            .entry(declaration)
            .or_default()
            .push(invocation.clone());

        let result = self.invoke(function_type, &invocation, &mut call_ctx, ctx);

        if let Some(stack) = self.invocations.borrow_mut().get_mut(&declaration) {
            stack.pop();
        }

        result
    }

    /// Analyzes one invocation of a function with a known body inside
    /// `call_ctx` and merges the observable effects back into `caller_ctx`.
    fn invoke(
        &self,
        function_type: &Type,
        invocation: &Invocation,
        call_ctx: &mut InferenceContext<'_>,
        caller_ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let declaration = invocation.function;

        // Closures: the environment captured at the declaration site backs
        // any binding the call context does not know.
        if let Type::Function {
            env: Some(closure), ..
        } = function_type
        {
            call_ctx.set_environment(call_ctx.environment().add(closure));
        }

        call_ctx.set_type(SymbolId::RETURN, invocation.return_type.clone());

        let this_symbol = self.this_symbol(declaration, call_ctx);
        if let Some(this_symbol) = this_symbol {
            call_ctx.set_type(this_symbol, invocation.this_type.clone());
        }

        self.declare_parameters(invocation, call_ctx);

        match ctx_kind(call_ctx, declaration) {
            NodeKind::ArrowFunctionExpression {
                body,
                expression: true,
                ..
            } => {
                let body = *body;
                let return_type = call_ctx.infer(body)?;
                call_ctx.set_type(SymbolId::RETURN, return_type);
            }
            NodeKind::FunctionDeclaration { body, .. }
            | NodeKind::FunctionExpression { body, .. }
            | NodeKind::ArrowFunctionExpression { body, .. } => {
                let body = *body;
                call_ctx.analyse(body)?;
            }
            _ => unreachable!("invocations target function declarations"),
        }

        self.write_back(invocation, this_symbol, call_ctx, caller_ctx);

        Ok(call_ctx.get_type(SymbolId::RETURN).unwrap_or(Type::Void))
    }

    /// Binds each parameter symbol to the matching argument type; missing
    /// arguments are undefined, surplus arguments are dropped.
    fn declare_parameters(&self, invocation: &Invocation, call_ctx: &mut InferenceContext<'_>) {
        let params = function_params(call_ctx, invocation.function);
        let count = params.len().max(invocation.argument_types.len());

        for index in 0..count {
            let Some(param) = params.get(index) else {
                continue;
            };
            let argument_type = invocation
                .argument_types
                .get(index)
                .cloned()
                .unwrap_or(Type::Void);
            let symbol = call_ctx
                .symbol_of(*param)
                .expect("extraction declares every parameter");
            call_ctx.set_type(symbol, argument_type);
        }
    }

    /// Propagates callee effects to the caller: record arguments the callee
    /// mutated structurally are rewritten in the caller (same identity, new
    /// content), and all remaining callee mappings except `this` and the
    /// return binding are merged back — closures that reassign outer
    /// variables are observed this way.
    fn write_back(
        &self,
        invocation: &Invocation,
        this_symbol: Option<SymbolId>,
        call_ctx: &InferenceContext<'_>,
        caller_ctx: &mut InferenceContext<'_>,
    ) {
        let params = function_params(call_ctx, invocation.function);

        for (index, argument_type) in invocation.argument_types.iter().enumerate() {
            if !matches!(argument_type, Type::Record { .. }) {
                continue;
            }
            let Some(param) = params.get(index) else {
                continue;
            };
            let Some(symbol) = call_ctx.symbol_of(*param) else {
                continue;
            };
            if let Some(parameter_type) = call_ctx.get_type(symbol) {
                // Same record, different content: the callee added or
                // retyped properties.
                if parameter_type.same(argument_type) && parameter_type != *argument_type {
                    caller_ctx.substitute(argument_type, &parameter_type);
                }
            }
        }

        let mut excluded = vec![SymbolId::RETURN];
        excluded.extend(this_symbol);
        caller_ctx.replace_types(call_ctx, &excluded);
    }

    fn this_symbol(&self, declaration: NodeId, ctx: &InferenceContext<'_>) -> Option<SymbolId> {
        let scope = ctx.program().scopes().scope_of(declaration)?;
        ctx.program().scopes().get_own_symbol(scope, "this")
    }

    /// A call to a function whose body is unknown: verify `this`, then check
    /// every parameter. Expected callback parameters supplied as function
    /// literals are analyzed against the expected signature; other arguments
    /// unify with the parameter type and must stay subtypes of it.
    fn call_external(
        &self,
        call: NodeId,
        callee: NodeId,
        arguments: &[NodeId],
        function_type: &Type,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let this_type = self.this_type(callee, ctx)?;
        let (required_this, param_count) = match function_type {
            Type::Function { this, params, .. } => (this.as_ref().clone(), params.len()),
            _ => unreachable!("call_external expects a function type"),
        };

        if !required_this.is_subtype(&this_type) {
            return Err(TypeError::IncompatibleThis {
                expected: required_this,
                actual: this_type,
                node: call,
            });
        }

        // The signature is registered under a scratch symbol so that type
        // variables resolved while checking one parameter show up in the
        // parameters and return type of the next.
        let mut call_ctx = ctx.fresh();
        let callee_symbol = ctx
            .program()
            .symbols()
            .create("<external function>", SymbolFlags::ANONYMOUS);
        call_ctx.set_type(callee_symbol, function_type.clone());

        for index in 0..param_count {
            let parameter_type = signature_param(&call_ctx, callee_symbol, index);
            let argument = arguments.get(index).copied();
            let mut argument_type = match argument {
                Some(argument) => ctx.infer(argument)?,
                None => Type::Void,
            };

            let expects_callback = matches!(
                &parameter_type,
                Type::Function {
                    declaration: None,
                    ..
                }
            );
            let supplies_callback = matches!(
                &argument_type,
                Type::Function {
                    declaration: Some(_),
                    ..
                }
            );

            if expects_callback && supplies_callback {
                let argument = argument.expect("a callback argument was supplied");
                self.check_callback(
                    argument,
                    &parameter_type,
                    &argument_type,
                    callee_symbol,
                    index,
                    &mut call_ctx,
                    ctx,
                )?;
            } else {
                if let Some(argument) = argument {
                    argument_type = ctx.unify(&argument_type, &parameter_type, argument)?;
                    call_ctx.unify(&argument_type, &parameter_type, argument)?;
                }
                if !parameter_type.is_subtype(&argument_type) {
                    return Err(TypeError::ArgumentMismatch {
                        index: index + 1,
                        argument: argument_type,
                        parameter: parameter_type,
                        node: argument.unwrap_or(call),
                    });
                }
            }
        }

        Ok(signature_return(&call_ctx, callee_symbol))
    }

    /// Analyzes a function literal supplied where a callback is expected:
    /// the body runs with the expected parameter types, and the resulting
    /// return type must satisfy the expected return type. This is what makes
    /// `xs.filter(x => …)`-style inference work.
    #[allow(clippy::too_many_arguments)]
    fn check_callback(
        &self,
        argument: NodeId,
        parameter_type: &Type,
        argument_type: &Type,
        callee_symbol: SymbolId,
        index: usize,
        call_ctx: &mut InferenceContext<'_>,
        caller_ctx: &mut InferenceContext<'_>,
    ) -> Result<(), TypeError> {
        let (expected_this, expected_params, expected_return) = match parameter_type {
            Type::Function {
                this, params, ret, ..
            } => (
                this.as_ref().clone(),
                params.to_vec(),
                ret.as_ref().clone(),
            ),
            _ => unreachable!("check_callback expects a function parameter"),
        };
        let declaration = match argument_type {
            Type::Function {
                declaration: Some(declaration),
                ..
            } => *declaration,
            _ => unreachable!("check_callback expects a declared callback"),
        };

        let invocation = Invocation {
            function: declaration,
            this_type: expected_this,
            argument_types: expected_params,
            return_type: expected_return.fresh(),
        };
        let actual_return = self.invoke(parameter_type, &invocation, call_ctx, caller_ctx)?;

        // A type variable in the expected return may have been resolved
        // while the body was analyzed; re-read it through the signature.
        let updated_expected = match signature_param(call_ctx, callee_symbol, index) {
            Type::Function { ret, .. } => *ret,
            _ => expected_return,
        };
        call_ctx.unify(&updated_expected, &actual_return, argument)?;
        if !updated_expected.is_subtype(&actual_return) {
            return Err(TypeError::CallbackReturnMismatch {
                expected: updated_expected,
                actual: actual_return,
                node: argument,
            });
        }
        Ok(())
    }
}

impl RefinementRule for CallExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "CallExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::CallExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (callee, arguments) = match ctx.program().ast().kind(node) {
            NodeKind::CallExpression { callee, arguments } => (*callee, arguments.clone()),
            _ => unreachable!("can_refine admitted the node"),
        };

        let function_type = ctx.infer(callee)?;
        match &function_type {
            Type::Any => Ok(Type::Any),
            Type::Function {
                declaration: Some(_),
                ..
            } => self.call_declared(node, callee, &arguments, &function_type, ctx),
            Type::Function {
                declaration: None, ..
            } => self.call_external(node, callee, &arguments, &function_type, ctx),
            other => Err(TypeError::NotCallable {
                callee: other.clone(),
                node,
            }),
        }
    }
}

fn end_recursion(function_type: &Type) -> Type {
    match function_type {
        Type::Function { ret, .. } if !ret.is_variable() => (**ret).clone(),
        _ => Type::Any,
    }
}

fn ctx_kind<'c>(ctx: &InferenceContext<'c>, node: NodeId) -> &'c NodeKind {
    ctx.program().ast().kind(node)
}

fn function_params(ctx: &InferenceContext<'_>, declaration: NodeId) -> Vec<NodeId> {
    match ctx.program().ast().kind(declaration) {
        NodeKind::FunctionDeclaration { params, .. }
        | NodeKind::FunctionExpression { params, .. }
        | NodeKind::ArrowFunctionExpression { params, .. } => params.clone(),
        _ => Vec::new(),
    }
}

/// The current type of parameter `index` in the registered signature.
fn signature_param(ctx: &InferenceContext<'_>, callee: SymbolId, index: usize) -> Type {
    match ctx.get_type(callee) {
        Some(Type::Function { params, .. }) => {
            params.get(index).cloned().unwrap_or(Type::Void)
        }
        _ => Type::Void,
    }
}

fn signature_return(ctx: &InferenceContext<'_>, callee: SymbolId) -> Type {
    match ctx.get_type(callee) {
        Some(Type::Function { ret, .. }) => *ret,
        _ => Type::Void,
    }
}
