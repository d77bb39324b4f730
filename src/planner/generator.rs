//! Plan generation
//!
//! Selects a workflow, flattens its matching stages into action placements,
//! fans module-scoped actions out over the project's modules and wires
//! implicit dependencies from artifact inputs to the project-scoped actions
//! producing them. The resulting steps are handed to [`sort_steps`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use super::errors::PlanError;
use super::plan::{Dependency, Plan, Step};
use super::sorter::sort_steps;
use crate::catalog::{
    Action, ActionScope, Artifact, Catalog, ProjectModule, Workflow, WorkflowAction,
};
use crate::rules::{ContextBuilder, RuleContext, RuleSet, any_match};

/// A catalog action placed in a stage of the selected workflow
#[derive(Debug, Clone)]
struct Placement<'a> {
    stage: &'a str,
    reference: &'a WorkflowAction,
    action: &'a Action,
    /// Workflow-level rules followed by the catalog action's own rules
    rules: RuleSet,
}

/// Compiles the catalog into an ordered plan for one repository snapshot
///
/// `modules` are evaluated in the given order, `env` supplies the repository
/// variables and the `ENV` map visible to rules. Identical input always
/// produces an identical plan.
///
/// # Errors
///
/// [`PlanError::NoSuitableWorkflowFound`] if no workflow matches, or any
/// graph error from [`sort_steps`].
pub fn generate_plan(
    modules: &[ProjectModule],
    catalog: &Catalog,
    project_dir: &Path,
    env: &BTreeMap<String, String>,
) -> Result<Plan, PlanError> {
    let contexts = ContextBuilder::new(project_dir, env);
    let project = contexts.project_context();
    let workflow = select_workflow(catalog, &project)?;

    let placements = flatten(catalog, workflow, &project);
    let producers = producer_index(&placements);
    let module_contexts: Vec<RuleContext> = modules
        .iter()
        .map(|module| contexts.module_context(module))
        .collect();

    let mut steps: Vec<Step> = Vec::new();
    let mut emitted: Vec<Vec<usize>> = vec![Vec::new(); placements.len()];

    for (index, placement) in placements.iter().enumerate() {
        match placement.action.scope {
            ActionScope::Project => {
                if project_matches(placement, &project, &module_contexts) {
                    emitted[index].push(steps.len());
                    steps.push(new_step(steps.len(), placement, None));
                }
            }
            ActionScope::Module => {
                for (module, ctx) in modules.iter().zip(&module_contexts) {
                    if placement.rules.any_match(ctx) {
                        emitted[index].push(steps.len());
                        steps.push(new_step(steps.len(), placement, Some(module)));
                    }
                }
            }
        }
        debug!(
            action = %placement.action.id,
            stage = placement.stage,
            steps = emitted[index].len(),
            "placement expanded"
        );
    }

    for (index, placement) in placements.iter().enumerate() {
        let predecessors: BTreeSet<usize> = placement
            .action
            .input
            .artifacts
            .iter()
            .filter_map(|artifact| producers.get(artifact))
            .flatten()
            .flat_map(|&producer| emitted[producer].iter().copied())
            .collect();

        for &step_index in &emitted[index] {
            let run_after: Vec<Dependency> = predecessors
                .iter()
                .filter(|&&predecessor| predecessor != step_index)
                .map(|&predecessor| Dependency {
                    id: steps[predecessor].id.clone(),
                    action: steps[predecessor].action.clone(),
                })
                .collect();
            steps[step_index].run_after = run_after;
        }
    }

    let stages = collect_stages(&steps);
    let steps = sort_steps(steps)?;

    info!(
        workflow = %workflow.name,
        stages = stages.len(),
        steps = steps.len(),
        "plan generated"
    );

    Ok(Plan {
        name: workflow.name.clone(),
        stages,
        steps,
    })
}

/// Picks the first workflow, in catalog order, whose rules match
///
/// # Errors
///
/// [`PlanError::NoSuitableWorkflowFound`] if none does.
pub fn select_workflow<'a>(
    catalog: &'a Catalog,
    project: &RuleContext,
) -> Result<&'a Workflow, PlanError> {
    let workflow = catalog
        .workflows()
        .iter()
        .find(|workflow| any_match(&workflow.rules, project))
        .ok_or(PlanError::NoSuitableWorkflowFound)?;
    debug!(workflow = %workflow.name, "workflow selected");
    Ok(workflow)
}

fn flatten<'a>(
    catalog: &'a Catalog,
    workflow: &'a Workflow,
    project: &RuleContext,
) -> Vec<Placement<'a>> {
    let mut placements = Vec::new();
    for stage in &workflow.stages {
        if !any_match(&stage.rules, project) {
            debug!(stage = %stage.name, "stage skipped");
            continue;
        }
        for reference in &stage.actions {
            // references are resolved when the catalog is built
            if let Some(action) = catalog.action(&reference.id) {
                placements.push(Placement {
                    stage: &stage.name,
                    reference,
                    action,
                    rules: RuleSet::compile(reference.rules.iter().chain(&action.rules)),
                });
            }
        }
    }
    placements
}

/// Maps each artifact to the placements of project-scoped actions producing it
fn producer_index<'a>(placements: &[Placement<'a>]) -> BTreeMap<&'a Artifact, Vec<usize>> {
    let mut producers: BTreeMap<&'a Artifact, Vec<usize>> = BTreeMap::new();
    for (index, placement) in placements.iter().enumerate() {
        if placement.action.scope != ActionScope::Project {
            continue;
        }
        for artifact in &placement.action.output.artifacts {
            let entry = producers.entry(artifact).or_default();
            if !entry.contains(&index) {
                entry.push(index);
            }
        }
    }
    producers
}

/// Project-scoped gate
///
/// The project context has no `MODULE_*` variables, so rules that read them
/// are run against each module context instead. The action still yields a
/// single step.
fn project_matches(
    placement: &Placement<'_>,
    project: &RuleContext,
    modules: &[RuleContext],
) -> bool {
    if !placement.rules.uses_module_variables() {
        return placement.rules.any_match(project);
    }
    let matched = placement.rules.any_match_across(project, modules);
    debug!(action = %placement.action.id, matched, "project action gated on module contexts");
    matched
}

fn new_step(index: usize, placement: &Placement<'_>, module: Option<&ProjectModule>) -> Step {
    let (scope, name, module) = match module {
        Some(module) => (
            ActionScope::Module,
            format!("{}-{}", placement.action.name, module.slug),
            Some(module.id.clone()),
        ),
        None => (ActionScope::Project, placement.action.name.clone(), None),
    };
    Step {
        id: index.to_string(),
        name,
        stage: placement.stage.to_string(),
        scope,
        action: placement.action.id.clone(),
        module,
        run_after: Vec::new(),
        order: 0,
        config: placement.reference.config.clone(),
    }
}

fn collect_stages(steps: &[Step]) -> Vec<String> {
    let mut stages: Vec<String> = Vec::new();
    for step in steps {
        if !stages.contains(&step.stage) {
            stages.push(step.stage.clone());
        }
    }
    stages
}
