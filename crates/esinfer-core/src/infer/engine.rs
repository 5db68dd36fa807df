//! The Hindley-Milner engine: refinement-rule dispatch, the unify wrapper
//! that records substitutions, and environment merging for data-flow joins.

use crate::ast::NodeId;
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::{default_rules, RefinementRule};
use crate::infer::unify::TypeUnificator;
use crate::types::{Type, TypeEnvironment};

/// Infers the type of single AST nodes by dispatching to exactly one
/// refinement rule per node shape. The engine never traverses statements on
/// its own — the work-list analysis drives it statement by statement, and
/// rules recurse into their sub-expressions.
pub struct HindleyMilner {
    unificator: TypeUnificator,
    rules: Vec<Box<dyn RefinementRule>>,
}

impl HindleyMilner {
    pub fn new() -> Self {
        Self {
            unificator: TypeUnificator::new(),
            rules: default_rules(),
        }
    }

    /// Infers the type of `node`. Zero or multiple matching rules are fatal
    /// defects in the rule set, not properties of the input program.
    pub fn infer(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let kind = ctx.program().ast().kind(node);
        let matching: Vec<&Box<dyn RefinementRule>> = self
            .rules
            .iter()
            .filter(|rule| rule.can_refine(kind))
            .collect();

        match matching.as_slice() {
            [] => Err(TypeError::NoRefinementRule {
                kind: kind.name(),
                node,
            }),
            [rule] => rule.refine(node, ctx),
            rules => Err(TypeError::AmbiguousRefinementRule {
                kind: kind.name(),
                rules: rules
                    .iter()
                    .map(|rule| rule.name())
                    .collect::<Vec<_>>()
                    .join(", "),
                node,
            }),
        }
    }

    /// Unifies `t1` and `t2`. When a type variable is resolved to a more
    /// specific type, the binding is recorded in the context's environment.
    pub fn unify(
        &self,
        t1: &Type,
        t2: &Type,
        node: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let unified = self
            .unificator
            .unify(t1, t2)
            .map_err(|source| TypeError::Unification { source, node })?;

        if t1.is_variable() && !t1.same(&unified) {
            ctx.substitute(t1, &unified);
        } else if t2.is_variable() && !t2.same(&unified) {
            ctx.substitute(t2, &unified);
        }

        Ok(unified)
    }

    /// Merges other environments into the context's environment: missing
    /// mappings are added, conflicting mappings are unified. This is the join
    /// of the data-flow analysis.
    pub fn merge_environments(
        &self,
        others: &[TypeEnvironment],
        node: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<(), TypeError> {
        for other in others {
            let mappings: Vec<_> = other
                .iter()
                .map(|(symbol, ty)| (symbol, ty.clone()))
                .collect();
            for (symbol, ty) in mappings {
                match ctx.get_type(symbol) {
                    None => ctx.set_type(symbol, ty),
                    Some(merged) => {
                        let unified = self.unify(&ty, &merged, node, ctx)?;
                        ctx.substitute(&merged, &unified);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for HindleyMilner {
    fn default() -> Self {
        Self::new()
    }
}
