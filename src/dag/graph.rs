// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::job::{JobIndex, Needs};
use crate::dag::pipeline::Pipeline;
use crate::errors::{Result, StagegateError};

/// Immediate deps and dependents of one job.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Jobs that must pass before this one can start.
    deps: Vec<JobIndex>,
    /// Jobs that list this one among their deps.
    dependents: Vec<JobIndex>,
}

/// Dependency edges of a pipeline, indexed by [`JobIndex`].
///
/// Edges come from explicit `needs` and, for jobs without a `needs` key,
/// from every job of the closest non-empty earlier stage. Acyclicity is
/// checked once in [`DependencyGraph::build`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DagNode>,
}

impl DependencyGraph {
    pub fn build(pipeline: &Pipeline) -> Result<Self> {
        let mut nodes: Vec<DagNode> = vec![DagNode::default(); pipeline.len()];

        for (idx, job) in pipeline.jobs().iter().enumerate() {
            let deps = match &job.needs {
                Needs::Explicit(names) => {
                    let mut deps = Vec::with_capacity(names.len());
                    for need in names {
                        let dep = pipeline.index_of(need).ok_or_else(|| {
                            StagegateError::MissingNeed {
                                job: job.name.clone(),
                                need: need.clone(),
                            }
                        })?;
                        if !deps.contains(&dep) {
                            deps.push(dep);
                        }
                    }
                    deps
                }
                Needs::Stage => pipeline
                    .stages()
                    .previous_non_empty(job.stage_idx)
                    .map(|stage| stage.jobs().to_vec())
                    .unwrap_or_default(),
            };
            nodes[idx].deps = deps;
        }

        for idx in 0..nodes.len() {
            let deps = nodes[idx].deps.clone();
            for dep in deps {
                nodes[dep].dependents.push(idx);
            }
        }

        let graph = Self { nodes };
        graph.ensure_acyclic(pipeline)?;

        debug!(
            jobs = graph.nodes.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        Ok(graph)
    }

    fn ensure_acyclic(&self, pipeline: &Pipeline) -> Result<()> {
        // Edge direction: dep -> job.
        let mut graph: DiGraphMap<JobIndex, ()> = DiGraphMap::new();
        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            for &dep in node.deps.iter() {
                graph.add_edge(dep, idx, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let job = pipeline
                    .job(cycle.node_id())
                    .map(|j| j.name.clone())
                    .unwrap_or_default();
                Err(StagegateError::CyclicDependency { job })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct predecessors of a job.
    pub fn dependencies_of(&self, idx: JobIndex) -> &[JobIndex] {
        self.nodes
            .get(idx)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Direct successors of a job.
    pub fn dependents_of(&self, idx: JobIndex) -> &[JobIndex] {
        self.nodes
            .get(idx)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// All `(job, dependency)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (JobIndex, JobIndex)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(idx, node)| node.deps.iter().map(move |&dep| (idx, dep)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.deps.len()).sum()
    }

    /// Every job reachable through dependents of `idx`, excluding `idx`.
    pub fn downstream_of(&self, idx: JobIndex) -> Vec<JobIndex> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<JobIndex> = self.dependents_of(idx).to_vec();
        let mut out = Vec::new();

        while let Some(next) = stack.pop() {
            if std::mem::replace(&mut seen[next], true) {
                continue;
            }
            out.push(next);
            stack.extend(self.dependents_of(next).iter().copied());
        }

        out.sort_unstable();
        out
    }
}
