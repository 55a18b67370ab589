//! The query planner: walks a selection tree top-down and emits one
//! relational fetch plan, a root query plus one eager load per nested
//! collection selection, so no selection depth costs a query per row.

use indexmap::IndexMap;
use tracing::debug;

use registry::{ConfigurationError, ModelInfo, ModelRelation, NodeType, Registry};
use selection::Selection;
use storage_types::{
    Deadline, EagerLoad, FieldName, Lookup, Name, Predicate, QueryPlan, RelatedRef, Value,
};

use crate::error::PlanError;
use crate::filter::FilterSet;

pub struct Planner<'a> {
    registry: &'a Registry,
    deadline: &'a Deadline,
}

impl<'a> Planner<'a> {
    pub fn new(registry: &'a Registry, deadline: &'a Deadline) -> Planner<'a> {
        Planner { registry, deadline }
    }

    /// Builds the fetch plan for one root selection. Recursion per
    /// nested selection; each level checks the deadline before doing
    /// any work.
    pub fn plan(&self, node: &NodeType, selection: &Selection) -> Result<QueryPlan, PlanError> {
        self.deadline.check()?;

        let model = require_model(node)?;
        let mut plan = QueryPlan::for_collection(model.collection.clone());
        if let Some(base) = &node.base_filter {
            plan.filters.push(base.clone());
        }

        // Fields with a custom resolver are not fetched relationally,
        // so they never count as relevant for select/prefetch hints.
        let relevant: Vec<&Selection> = selection
            .sub_selections
            .iter()
            .filter(|sub| !node.has_custom_resolver(node.alias_to_attribute(&sub.attribute)))
            .collect();

        let mut eager_specs: IndexMap<FieldName, EagerLoad> = IndexMap::new();
        for sub in &relevant {
            let attribute = node.alias_to_attribute(&sub.attribute);
            let Some(related_field) = node.nested_field(attribute) else {
                continue;
            };
            // A select hint covers this relation with a single-valued
            // join; an eager load would fetch the same rows again.
            let hinted = node.metadata.select_related.iter().any(|(schema_field, path)| {
                path == &related_field.name
                    && schema_field == attribute
                    && matches!(model.relation(path), Some(ModelRelation::ForwardOne { .. }))
            });
            if hinted {
                continue;
            }

            let target = self.related_node(node, &related_field.name)?;
            let target_model = require_model(target)?;
            let related = model
                .related_ref(&related_field.name, &target_model.collection)
                .ok_or_else(|| ConfigurationError::UnknownRelationField {
                    type_name: node.type_name.clone(),
                    field: related_field.name.clone(),
                    model: model.name.clone(),
                })?;

            let child_plan = self.plan(target, sub)?;
            eager_specs.insert(
                related_field.name.clone(),
                EagerLoad {
                    relation: related_field.name.clone(),
                    related,
                    plan: child_plan,
                },
            );
        }

        self.attach_select_hints(node, model, &relevant, &mut plan)?;
        self.attach_prefetches(node, model, &relevant, eager_specs, &mut plan)?;
        self.apply_arguments(node, selection, &mut plan)?;

        self.deadline.check()?;
        Ok(plan)
    }

    /// The off-plan path: a relation resolved directly off an already
    /// materialized parent. Produces the related collection's plan
    /// with the selection's filters applied, minus pagination and
    /// minus any eager-load planning.
    pub fn related_plan(
        &self,
        node: &NodeType,
        field: &str,
        arguments: &IndexMap<Name, Value>,
    ) -> Result<(RelatedRef, QueryPlan), PlanError> {
        self.deadline.check()?;

        let model = require_model(node)?;
        let target = self.related_node(node, field)?;
        let target_model = require_model(target)?;
        let related = model
            .related_ref(field, &target_model.collection)
            .ok_or_else(|| ConfigurationError::UnknownRelationField {
                type_name: node.type_name.clone(),
                field: field.into(),
                model: model.name.clone(),
            })?;

        let mut plan = QueryPlan::for_collection(target_model.collection.clone());
        if let Some(base) = &target.base_filter {
            plan.filters.push(base.clone());
        }
        FilterSet::new(target.filter_decls(), arguments).apply_without_pagination(&mut plan)?;
        Ok((related, plan))
    }

    fn related_node(&self, node: &'a NodeType, field: &str) -> Result<&'a NodeType, PlanError> {
        let related_field = node.nested_field(field).ok_or_else(|| {
            ConfigurationError::UnknownRelationField {
                type_name: node.type_name.clone(),
                field: field.into(),
                model: node
                    .model
                    .as_ref()
                    .map(|m| m.name.clone())
                    .unwrap_or_default(),
            }
        })?;
        let target_name = related_field.target.referenced(&node.type_name);
        Ok(self.registry.get_type_by_name(&target_name)?)
    }

    /// Single-valued joins: the intersection of the declared select
    /// hints and the relevant field set. An empty hint declaration
    /// means fetch nothing extra.
    fn attach_select_hints(
        &self,
        node: &NodeType,
        model: &ModelInfo,
        relevant: &[&Selection],
        plan: &mut QueryPlan,
    ) -> Result<(), PlanError> {
        for (schema_field, path) in &node.metadata.select_related {
            if !relevant
                .iter()
                .any(|sub| node.alias_to_attribute(&sub.attribute) == schema_field)
            {
                continue;
            }
            let Some(ModelRelation::ForwardOne { .. }) = model.relation(path) else {
                debug!(field = %path, "select hint skipped, not a single-valued relation");
                continue;
            };
            let target = self.related_node(node, path)?;
            let target_model = require_model(target)?;
            if let Some(related) = model.related_ref(path, &target_model.collection) {
                plan.select.insert(path.clone(), related);
            }
        }
        Ok(())
    }

    /// Collection prefetches. An eager load built from a sub-selection
    /// always wins over a bare hint naming the same relation, since it
    /// carries the child's own filters and ordering.
    fn attach_prefetches(
        &self,
        node: &NodeType,
        model: &ModelInfo,
        relevant: &[&Selection],
        eager_specs: IndexMap<FieldName, EagerLoad>,
        plan: &mut QueryPlan,
    ) -> Result<(), PlanError> {
        for (schema_field, path) in &node.metadata.prefetch_related {
            if eager_specs.contains_key(path) {
                continue;
            }
            if !relevant
                .iter()
                .any(|sub| node.alias_to_attribute(&sub.attribute) == schema_field)
            {
                continue;
            }
            let target = self.related_node(node, path)?;
            let target_model = require_model(target)?;
            let Some(related) = model.related_ref(path, &target_model.collection) else {
                continue;
            };
            let mut child = QueryPlan::for_collection(target_model.collection.clone());
            if let Some(base) = &target.base_filter {
                child.filters.push(base.clone());
            }
            plan.eager_loads.insert(
                path.clone(),
                EagerLoad {
                    relation: path.clone(),
                    related,
                    plan: child,
                },
            );
        }
        for (path, spec) in eager_specs {
            plan.eager_loads.insert(path, spec);
        }
        Ok(())
    }

    /// Declared filters run through the FilterSet; declared lookups
    /// become direct equality clauses; anything else is ignored.
    fn apply_arguments(
        &self,
        node: &NodeType,
        selection: &Selection,
        plan: &mut QueryPlan,
    ) -> Result<(), PlanError> {
        FilterSet::new(node.filter_decls(), &selection.filters).apply(plan)?;

        for (name, value) in &selection.filters {
            if node.filter_decls().contains_key(name) {
                continue;
            }
            if node.metadata.lookups.contains_key(name) {
                plan.filters
                    .push(Predicate::And(vec![Lookup::new(name.clone(), value.clone())]));
            } else {
                debug!(type_name = %node.type_name, argument = %name, "ignoring undeclared argument");
            }
        }
        Ok(())
    }
}

fn require_model(node: &NodeType) -> Result<&ModelInfo, PlanError> {
    node.model
        .as_ref()
        .ok_or_else(|| ConfigurationError::MissingModel {
            type_name: node.type_name.clone(),
        })
        .map_err(PlanError::from)
}
