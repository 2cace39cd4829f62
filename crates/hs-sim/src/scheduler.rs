//! Timestep scheduler with fixed-point iteration.

use hs_core::{CompId, PortId, StepClock, Tolerances, nearly_equal};
use hs_graph::{
    AssembledSystem, Assembly, AssemblyOptions, Component, EvalContext, EvaluationOrder, Graph,
    PrepareContext,
};
use hs_registry::{SharedRegistry, SharedRegistryHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::cancel::CancelToken;
use crate::error::{SimError, SimResult};
use crate::params::SimulationParameters;
use crate::record::{OutputSeries, RunStatus, SimRecord};

/// Lifecycle of a [`Simulator`]. Assembling happens on
/// [`Assembly`] before a simulator exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Ready,
    Running,
    Finished,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Ready => "ready",
            RunState::Running => "running",
            RunState::Finished => "finished",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    /// Sweep cap per timestep
    pub max_iterations: usize,
    /// Output changes within tolerance do not re-trigger consumers
    pub tolerances: Tolerances,
    /// Clear the shared registry when the run ends, successful or not
    pub clear_registry_on_finish: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerances: Tolerances::default(),
            clear_registry_on_finish: true,
        }
    }
}

/// Progress reported after each stabilized timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimProgress {
    pub timestep: usize,
    pub total_timesteps: usize,
    pub iterations: usize,
    pub fraction_complete: f64,
}

/// Owns a frozen system for one run.
///
/// The evaluation order is computed once at construction. Each timestep
/// sweeps the order and evaluates dirty components until no output moves
/// beyond tolerance.
pub struct Simulator {
    graph: Graph,
    components: Vec<Box<dyn Component>>,
    order: EvaluationOrder,
    options: SchedulerOptions,
    registry: SharedRegistryHandle,
    cancel: CancelToken,
    state: RunState,
    /// Current value per port; only output slots are written.
    values: Vec<f64>,
}

impl Simulator {
    pub fn new(
        system: AssembledSystem,
        options: SchedulerOptions,
        registry: SharedRegistryHandle,
    ) -> SimResult<Self> {
        if options.max_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "max_iterations must be positive",
            });
        }
        if !(options.tolerances.abs >= 0.0 && options.tolerances.rel >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerances must be non-negative",
            });
        }

        let (graph, components) = system.into_parts();
        let order = EvaluationOrder::compute(&graph);
        if order.has_cycles() {
            debug!(groups = order.cyclic_groups.len(), "graph has cyclic groups");
        }
        let values = vec![0.0; graph.ports().len()];

        Ok(Self {
            graph,
            components,
            order,
            options,
            registry,
            cancel: CancelToken::new(),
            state: RunState::Ready,
            values,
        })
    }

    /// Validate and freeze `assembly`, then build a simulator.
    pub fn from_assembly(
        assembly: Assembly,
        assembly_options: &AssemblyOptions,
        options: SchedulerOptions,
        registry: SharedRegistryHandle,
    ) -> SimResult<Self> {
        let system = assembly.finish(assembly_options)?;
        Self::new(system, options, registry)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn evaluation_order(&self) -> &EvaluationOrder {
        &self.order
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Token that stops the run at the next timestep boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &SharedRegistryHandle {
        &self.registry
    }

    pub fn run(&mut self, params: &SimulationParameters) -> SimResult<SimRecord> {
        self.run_with_progress(params, |_| {})
    }

    /// Run all timesteps of `params`, calling `progress` after each one.
    ///
    /// A simulator runs once: afterwards it is `Finished` or `Failed`.
    pub fn run_with_progress<F>(
        &mut self,
        params: &SimulationParameters,
        mut progress: F,
    ) -> SimResult<SimRecord>
    where
        F: FnMut(&SimProgress),
    {
        if self.state != RunState::Ready {
            return Err(SimError::InvalidState {
                action: "run",
                state: self.state,
            });
        }
        params.validate()?;

        self.state = RunState::Running;
        info!(
            components = self.components.len(),
            timesteps = params.timesteps(),
            seconds_per_timestep = params.seconds_per_timestep,
            "simulation started"
        );

        let result = self.execute(params, &mut progress);

        if self.options.clear_registry_on_finish {
            self.registry.lock().clear();
        }

        match &result {
            Ok(record) => {
                self.state = RunState::Finished;
                info!(
                    timesteps = record.len(),
                    max_iterations = record.max_iterations(),
                    status = ?record.status,
                    "simulation finished"
                );
            }
            Err(err) => {
                self.state = RunState::Failed;
                error!(%err, "simulation failed");
            }
        }
        result
    }

    fn execute(
        &mut self,
        params: &SimulationParameters,
        progress: &mut dyn FnMut(&SimProgress),
    ) -> SimResult<SimRecord> {
        let handle = self.registry.clone();
        self.prepare(&mut handle.lock())?;

        let recorded = self.recorded_outputs();
        let total = params.timesteps();
        let mut record = SimRecord {
            timestamps: Vec::with_capacity(total),
            series: recorded
                .iter()
                .map(|&port| self.empty_series(port, total))
                .collect(),
            iterations: Vec::with_capacity(total),
            status: RunStatus::Completed,
        };

        let base_clock = params.clock();
        for timestep in 0..total {
            if self.cancel.is_cancelled() {
                warn!(timestep, total, "simulation cancelled");
                record.status = RunStatus::Cancelled;
                break;
            }

            let iterations = {
                let mut registry = handle.lock();
                self.step(base_clock.at(timestep), &mut registry)?
            };
            trace!(timestep, iterations, "timestep stabilized");

            record.timestamps.push(params.timestamp(timestep)?);
            record.iterations.push(iterations);
            for (series, &port) in record.series.iter_mut().zip(&recorded) {
                series.values.push(self.values[port.index()]);
            }

            progress(&SimProgress {
                timestep,
                total_timesteps: total,
                iterations,
                fraction_complete: (timestep + 1) as f64 / total as f64,
            });
        }
        Ok(record)
    }

    fn prepare(&mut self, registry: &mut SharedRegistry) -> SimResult<()> {
        for (index, component) in self.components.iter_mut().enumerate() {
            let id = CompId::from_index(index);
            let mut ctx = PrepareContext::new(&self.graph, id, registry);
            component
                .prepare(&mut ctx)
                .map_err(|source| SimError::Prepare {
                    component: component.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Evaluate one timestep to a fixed point. Returns the number of sweeps.
    fn step(&mut self, clock: StepClock, registry: &mut SharedRegistry) -> SimResult<usize> {
        let n = self.components.len();
        for component in &mut self.components {
            component.save_state();
        }

        let mut dirty = vec![true; n];
        let mut evaluated = vec![false; n];
        let mut sweeps = 0;

        while dirty.iter().any(|&d| d) {
            if sweeps == self.options.max_iterations {
                let unstable = self
                    .order
                    .order
                    .iter()
                    .filter(|id| dirty[id.index()])
                    .map(|id| self.graph.components()[id.index()].name.clone())
                    .collect();
                return Err(SimError::Convergence {
                    timestep: clock.index,
                    iterations: sweeps,
                    unstable,
                });
            }
            sweeps += 1;

            for &id in &self.order.order {
                let i = id.index();
                if !dirty[i] {
                    continue;
                }
                dirty[i] = false;

                let component = &mut self.components[i];
                if evaluated[i] {
                    component.restore_state();
                }
                evaluated[i] = true;

                let outputs = &self.graph.components()[i].outputs;
                let before: Vec<f64> = outputs.iter().map(|p| self.values[p.index()]).collect();

                let mut ctx = EvalContext::new(&self.graph, id, clock, &mut self.values, registry);
                component
                    .evaluate(&mut ctx)
                    .map_err(|source| SimError::Component {
                        component: component.name().to_string(),
                        timestep: clock.index,
                        source,
                    })?;

                for (&port, &old) in outputs.iter().zip(&before) {
                    let value = self.values[port.index()];
                    if !value.is_finite() {
                        return Err(SimError::NonFinite {
                            port: self.graph.port_label(port),
                            timestep: clock.index,
                            value,
                        });
                    }
                    if !nearly_equal(old, value, self.options.tolerances) {
                        for conn in self.graph.consumers_of(port) {
                            dirty[conn.target_component.index()] = true;
                        }
                    }
                }
            }
        }
        Ok(sweeps)
    }

    fn recorded_outputs(&self) -> Vec<PortId> {
        self.graph
            .components()
            .iter()
            .flat_map(|c| c.outputs.iter().copied())
            .collect()
    }

    fn empty_series(&self, port: PortId, capacity: usize) -> OutputSeries {
        let desc = &self.graph.ports()[port.index()];
        OutputSeries {
            component: self.graph.components()[desc.owner.index()].name.clone(),
            port: desc.name.clone(),
            load_type: desc.load_type,
            unit: desc.unit,
            values: Vec::with_capacity(capacity),
        }
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("components", &self.components.len())
            .field("state", &self.state)
            .field("options", &self.options)
            .finish()
    }
}
