//! Template evaluation
//!
//! Walks the parsed node sequence against a per-render context, resolving
//! fields through the provider registry and applying modifier phases in
//! their fixed order: resolve, filters, find/replace, conditional,
//! in-place expansion, combine, boolean substitution, default
//! substitution.

mod context;
pub(crate) mod filters;
pub(crate) mod vars;

pub use context::{EvalScope, FileHandle, RenderContext, RenderOptions};

use crate::error::EvalError;
use crate::parser::{CompareOp, Conditional, FieldStmt, Node, Template};
use crate::provider::{FieldRef, ProviderRegistry};

pub(crate) struct Evaluator<'e> {
    registry: &'e ProviderRegistry,
    options: &'e RenderOptions,
}

impl<'e> Evaluator<'e> {
    pub(crate) fn new(registry: &'e ProviderRegistry, options: &'e RenderOptions) -> Self {
        Self { registry, options }
    }

    /// Evaluate a node sequence to an ordered list of strings.
    ///
    /// Each node's list combines with the running result by ordered
    /// cross-product concatenation; a node that produces no values
    /// contributes nothing, so `{var:...}` never emits characters.
    pub(crate) fn eval_template(
        &self,
        template: &Template,
        ctx: &mut RenderContext,
    ) -> Result<Vec<String>, EvalError> {
        if template.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = vec![String::new()];
        let mut contributed = false;
        for node in &template.nodes {
            let vals = match node {
                Node::Text { text, .. } => vec![text.clone()],
                Node::Field(stmt) => self.eval_statement(stmt, ctx)?,
            };
            if vals.is_empty() {
                continue;
            }
            contributed = true;
            let mut next = Vec::with_capacity(results.len() * vals.len());
            for val in &vals {
                for prefix in &results {
                    next.push(format!("{prefix}{val}"));
                }
            }
            results = next;
        }
        if contributed {
            Ok(results)
        } else {
            Ok(Vec::new())
        }
    }

    fn eval_statement(
        &self,
        stmt: &FieldStmt,
        ctx: &mut RenderContext,
    ) -> Result<Vec<String>, EvalError> {
        let is_var = stmt.field == "var";
        let mut consumed_default = false;

        // Phase 1: resolve the field
        let mut vals: Vec<String> = if let Some(name) = stmt.field.strip_prefix('%') {
            ctx.variables
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundVariable {
                    name: name.to_string(),
                })?
        } else if is_var {
            // the parser guarantees {var:NAME,VALUE} shape
            let bound = match (&stmt.subfield, &stmt.default) {
                (Some(name), Some(value)) => {
                    let rendered = self.eval_template(value, ctx)?;
                    ctx.variables.insert(name.clone(), rendered);
                    Vec::new()
                }
                _ => Vec::new(),
            };
            consumed_default = true;
            bound
        } else {
            let field = FieldRef::from_stmt(stmt);
            let resolved = {
                let mut scope = EvalScope {
                    evaluator: self,
                    ctx: &mut *ctx,
                };
                self.registry.resolve(&field, &mut scope)?
            };
            consumed_default = resolved.consumed_default;
            resolved.values
        };

        // Phase 2: filter pipeline
        for filter in &stmt.filters {
            let arg = match &filter.arg {
                Some(tpl) => {
                    let rendered = self.eval_template(tpl, ctx)?.concat();
                    Some(vars::expand(&rendered, &ctx.variables)?)
                }
                None => None,
            };
            vals = filters::apply(&filter.name, arg.as_deref(), vals)?;
        }

        // Phase 3: find/replace, all occurrences, in pair order
        for (find, replace) in &stmt.find_replace {
            let find = vars::expand(find, &ctx.variables)?;
            let replace = vars::expand(replace, &ctx.variables)?;
            vals = vals
                .into_iter()
                .map(|v| v.replace(&find, &replace))
                .collect();
        }

        // Phase 4: conditional, retained for the boolean phase
        let cond_result = match &stmt.conditional {
            Some(cond) => Some(self.eval_conditional(cond, &vals, ctx)?),
            None => None,
        };

        // Phase 5: in-place expansion
        if let Some(delim) = &stmt.expand {
            let sep = vars::expand(delim, &ctx.variables)?;
            if !vals.is_empty() {
                vals = vec![vals.join(&sep)];
            }
        } else if self.options.expand_inplace && !vals.is_empty() {
            vals = vec![vals.join(&self.options.inplace_sep)];
        }

        // Phase 6: combine appends, even onto an empty list
        if let Some(combine) = &stmt.combine {
            vals.extend(self.eval_template(combine, ctx)?);
        }

        // Phases 7-9: boolean substitution, then default substitution
        if let Some(branch) = &stmt.bool_branch {
            let truthy = cond_result.unwrap_or(!vals.is_empty());
            vals = if truthy {
                self.eval_template(branch, ctx)?
            } else {
                match &stmt.default {
                    Some(default) => self.eval_template(default, ctx)?,
                    None => Vec::new(),
                }
            };
        } else {
            if let Some(matched) = cond_result {
                vals = if matched {
                    vec!["True".to_string()]
                } else {
                    Vec::new()
                };
            }
            if vals.is_empty() && !is_var && !consumed_default {
                vals = match &stmt.default {
                    Some(default) => self.eval_template(default, ctx)?,
                    None => vec![self.options.none_str.clone()],
                };
            }
        }
        Ok(vals)
    }

    /// A conditional over a list is a disjunction: true if the operator
    /// holds for any (value, candidate) pair.
    fn eval_conditional(
        &self,
        cond: &Conditional,
        vals: &[String],
        ctx: &mut RenderContext,
    ) -> Result<bool, EvalError> {
        let rendered = self.eval_template(&cond.value, ctx)?;
        let matched = if cond.op.is_string_op() {
            // string operators accept or-alternatives separated by '|'
            let candidates: Vec<&str> = rendered.iter().flat_map(|v| v.split('|')).collect();
            candidates
                .iter()
                .any(|c| vals.iter().any(|v| string_test(cond.op, v, c)))
        } else if cond.op.is_numeric() {
            if rendered.len() != 1 {
                return Err(EvalError::Comparison {
                    reason: format!(
                        "operator '{}' requires a single value, got {}",
                        cond.op.as_str(),
                        rendered.len()
                    ),
                });
            }
            let mut matched = false;
            for v in vals {
                let left = parse_number(v)?;
                let right = parse_number(&rendered[0])?;
                if numeric_test(cond.op, left, right) {
                    matched = true;
                    break;
                }
            }
            matched
        } else {
            // == and != compare the sorted value lists
            let mut left: Vec<&String> = vals.iter().collect();
            let mut right: Vec<&String> = rendered.iter().collect();
            left.sort();
            right.sort();
            (left == right) == (cond.op == CompareOp::Eq)
        };
        Ok(matched != cond.negated)
    }
}

fn string_test(op: CompareOp, value: &str, candidate: &str) -> bool {
    match op {
        CompareOp::Contains => value.contains(candidate),
        CompareOp::Matches => value == candidate,
        CompareOp::StartsWith => value.starts_with(candidate),
        CompareOp::EndsWith => value.ends_with(candidate),
        _ => false,
    }
}

fn numeric_test(op: CompareOp, left: f64, right: f64) -> bool {
    match op {
        CompareOp::Lt => left < right,
        CompareOp::Le => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::Ge => left >= right,
        _ => false,
    }
}

fn parse_number(value: &str) -> Result<f64, EvalError> {
    value.trim().parse::<f64>().map_err(|_| EvalError::Coercion {
        ty: "number".to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_test_operators() {
        assert!(string_test(CompareOp::Contains, "BeachDay", "Beach"));
        assert!(!string_test(CompareOp::Matches, "BeachDay", "Beach"));
        assert!(string_test(CompareOp::Matches, "Beach", "Beach"));
        assert!(string_test(CompareOp::StartsWith, "Beach", "Be"));
        assert!(string_test(CompareOp::EndsWith, "Beach", "ch"));
    }

    #[test]
    fn test_numeric_test_operators() {
        assert!(numeric_test(CompareOp::Lt, 1.0, 2.0));
        assert!(numeric_test(CompareOp::Le, 2.0, 2.0));
        assert!(numeric_test(CompareOp::Gt, 3.0, 2.0));
        assert!(numeric_test(CompareOp::Ge, 2.0, 2.0));
        assert!(!numeric_test(CompareOp::Lt, 2.0, 2.0));
    }

    #[test]
    fn test_parse_number_trims_and_errors() {
        assert_eq!(parse_number(" 42 ").unwrap(), 42.0);
        assert!(matches!(
            parse_number("x"),
            Err(EvalError::Coercion { .. })
        ));
    }
}
