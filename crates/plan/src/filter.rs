//! Applies a node's declared filters to a fetch plan under
//! construction. Filters run in declaration order except pagination,
//! which is deferred to run last so it sees the already-filtered and
//! ordered row set.

use indexmap::IndexMap;
use tracing::debug;

use registry::FilterDecl;
use selection::literal::parse_literal;
use storage_types::{Lookup, Name, Pagination, Predicate, QueryPlan, Value};

use crate::error::PlanError;
use crate::lookup::{parse_expression, parse_order_key};

/// One selection level's pairing of filter declarations with the raw
/// arguments from the request. Consumed once per plan.
pub struct FilterSet<'a> {
    decls: &'a IndexMap<Name, FilterDecl>,
    arguments: &'a IndexMap<Name, Value>,
}

impl<'a> FilterSet<'a> {
    pub fn new(
        decls: &'a IndexMap<Name, FilterDecl>,
        arguments: &'a IndexMap<Name, Value>,
    ) -> FilterSet<'a> {
        FilterSet { decls, arguments }
    }

    pub fn apply(&self, plan: &mut QueryPlan) -> Result<(), PlanError> {
        self.apply_inner(plan, true)
    }

    /// The off-plan path for relations resolved from an already
    /// materialized parent: the parent row set is fixed, so pagination
    /// no longer applies.
    pub fn apply_without_pagination(&self, plan: &mut QueryPlan) -> Result<(), PlanError> {
        self.apply_inner(plan, false)
    }

    fn apply_inner(&self, plan: &mut QueryPlan, paginate: bool) -> Result<(), PlanError> {
        let mut pagination: Option<(&Name, Value)> = None;

        for (name, decl) in self.decls {
            let Some(raw) = self.arguments.get(name) else {
                continue;
            };
            let value = evaluate(raw);
            if matches!(decl, FilterDecl::Pagination) {
                if paginate {
                    pagination = Some((name, value));
                }
                continue;
            }
            self.apply_one(name, decl, &value, plan)?;
        }

        if let Some((name, value)) = pagination {
            apply_pagination(name, &value, plan)?;
        }
        Ok(())
    }

    fn apply_one(
        &self,
        name: &Name,
        decl: &FilterDecl,
        value: &Value,
        plan: &mut QueryPlan,
    ) -> Result<(), PlanError> {
        match decl {
            FilterDecl::Pagination => {}
            FilterDecl::IdList => {
                let ids = value.as_list().ok_or(PlanError::InvalidFilterInput {
                    filter: name.clone(),
                    expected: "a list of ids",
                })?;
                plan.filters.push(Predicate::And(vec![Lookup::new(
                    "id__in",
                    Value::List(ids.to_vec()),
                )]));
            }
            FilterDecl::Expression => apply_expression(name, value, plan)?,
            FilterDecl::Enum { field, choices } => {
                let key = value.as_str().ok_or(PlanError::InvalidFilterInput {
                    filter: name.clone(),
                    expected: "a choice key",
                })?;
                if !choices.contains_key(key) {
                    return Err(PlanError::InvalidChoice {
                        filter: name.clone(),
                        value: key.to_owned(),
                    });
                }
                plan.filters.push(Predicate::And(vec![Lookup::new(
                    field.clone(),
                    Value::String(key.to_owned()),
                )]));
            }
        }
        Ok(())
    }
}

/// String arguments are opportunistically literal-evaluated (numbers,
/// booleans, lists) so a single wire string can carry structured
/// values; anything unparseable stays a string.
fn evaluate(raw: &Value) -> Value {
    match raw {
        Value::String(s) => parse_literal(s).unwrap_or_else(|_| raw.clone()),
        other => other.clone(),
    }
}

/// The raw expression filter: `{filter?, exclude?, order_by?,
/// distinct?}`, or a bare string treated as the filter expression.
fn apply_expression(name: &Name, value: &Value, plan: &mut QueryPlan) -> Result<(), PlanError> {
    if let Some(expression) = value.as_str() {
        plan.filters.push(parse_expression(expression)?);
        return Ok(());
    }

    let parts = value.as_object().ok_or(PlanError::InvalidFilterInput {
        filter: name.clone(),
        expected: "an expression string or a {filter, exclude, order_by, distinct} object",
    })?;

    for (key, part) in parts {
        match key.as_str() {
            "filter" => {
                if let Some(expression) = part.as_str() {
                    plan.filters.push(parse_expression(expression)?);
                }
            }
            "exclude" => {
                if let Some(expression) = part.as_str() {
                    plan.excludes.push(parse_expression(expression)?);
                }
            }
            "order_by" => {
                if let Some(key) = part.as_str() {
                    plan.order_by = Some(parse_order_key(key)?);
                }
            }
            "distinct" => {
                plan.distinct = matches!(part, Value::Boolean(true));
            }
            other => {
                debug!(filter = %name, key = other, "ignoring unknown expression part");
            }
        }
    }
    Ok(())
}

fn apply_pagination(name: &Name, value: &Value, plan: &mut QueryPlan) -> Result<(), PlanError> {
    let invalid = || PlanError::InvalidFilterInput {
        filter: name.clone(),
        expected: "a {limit_to, offset} object",
    };

    let parts = value.as_object().ok_or_else(invalid)?;
    let mut pagination = Pagination::default();
    for (key, part) in parts {
        let number = part
            .as_integer()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid)?;
        match key.as_str() {
            "limit_to" => pagination.limit = Some(number),
            "offset" => pagination.offset = Some(number),
            _ => return Err(invalid()),
        }
    }
    plan.pagination = Some(pagination);
    Ok(())
}
