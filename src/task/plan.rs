//! Execution planning for custom tasks.
//!
//! A custom task may declare `needs = [..]`; the planner expands a target into
//! a dependency-ordered list of task names, validating references and
//! rejecting cycles before anything runs.

use crate::errors::TaskError;
use crate::manifest::TaskDefinition;
use std::collections::BTreeMap;

/// Node state during the depth-first walk.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Resolve the execution order for `target`.
///
/// Returns the task names in the order they must run, dependencies first and
/// `target` last. Each task appears at most once even when needed by several
/// others.
///
/// # Errors
/// - [`TaskError::UnknownTask`] when `target` is not defined
/// - [`TaskError::UnknownDependency`] when a task needs an undefined task
/// - [`TaskError::DependencyCycle`] when the needs graph is cyclic
pub fn execution_order(
    tasks: &BTreeMap<String, TaskDefinition>,
    target: &str,
) -> Result<Vec<String>, TaskError> {
    if !tasks.contains_key(target) {
        return Err(TaskError::UnknownTask(target.to_string()));
    }

    let mut marks: BTreeMap<&str, Mark> = tasks.keys().map(|k| (k.as_str(), Mark::Unvisited)).collect();
    let mut order = Vec::new();
    visit(tasks, target, &mut marks, &mut order)?;
    Ok(order)
}

fn visit(
    tasks: &BTreeMap<String, TaskDefinition>,
    name: &str,
    marks: &mut BTreeMap<&str, Mark>,
    order: &mut Vec<String>,
) -> Result<(), TaskError> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => return Err(TaskError::DependencyCycle(name.to_string())),
        _ => {}
    }

    let task = tasks
        .get(name)
        .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

    if let Some(mark) = marks.get_mut(name) {
        *mark = Mark::InProgress;
    }

    for dep in &task.needs {
        if !tasks.contains_key(dep) {
            return Err(TaskError::UnknownDependency {
                task: name.to_string(),
                dependency: dep.clone(),
            });
        }
        visit(tasks, dep, marks, order)?;
    }

    if let Some(mark) = marks.get_mut(name) {
        *mark = Mark::Done;
    }
    order.push(name.to_string());
    Ok(())
}
