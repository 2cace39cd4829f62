//! Integration tests for the timestep scheduler.

use chrono::{Duration, NaiveDate};
use hs_core::{LoadType, PortId, Unit};
use hs_graph::{
    Assembly, AssemblyOptions, Component, ComponentError, ComponentResult, EvalContext,
    GraphResult, PortDeclarer, PortSpec, PrepareContext,
};
use hs_registry::{RegistryKey, SharedRegistryHandle};
use hs_sim::{
    RunState, RunStatus, SchedulerOptions, SimError, SimulationParameters, Simulator,
};

fn port(name: &str) -> PortSpec {
    PortSpec::new(name, LoadType::Heat, Unit::Watt)
}

fn hours(n: i64) -> SimulationParameters {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    SimulationParameters::new(start, Duration::hours(n), 3600)
}

/// `Out = gain * In + offset`, `In` optional.
struct Linear {
    name: String,
    gain: f64,
    offset: f64,
    input: Option<PortId>,
    output: Option<PortId>,
}

impl Linear {
    fn new(name: &str, gain: f64, offset: f64) -> Self {
        Self {
            name: name.into(),
            gain,
            offset,
            input: None,
            output: None,
        }
    }
}

impl Component for Linear {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.input = Some(ports.input(port("In").optional())?);
        self.output = Some(ports.output(port("Out"))?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(ComponentError::Undeclared {
                component: self.name.clone(),
            });
        };
        let x = ctx.input(input)?;
        ctx.set_output(output, self.gain * x + self.offset)
    }
}

/// Running sum of its input across timesteps.
struct Accumulator {
    total: f64,
    saved: f64,
    input: Option<PortId>,
    output: Option<PortId>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            total: 0.0,
            saved: 0.0,
            input: None,
            output: None,
        }
    }
}

impl Component for Accumulator {
    fn name(&self) -> &str {
        "Accumulator"
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.input = Some(ports.input(port("In"))?);
        self.output = Some(ports.output(port("Total"))?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(ComponentError::Undeclared {
                component: "Accumulator".into(),
            });
        };
        self.total += ctx.input(input)?;
        ctx.set_output(output, self.total)
    }

    fn save_state(&mut self) {
        self.saved = self.total;
    }

    fn restore_state(&mut self) {
        self.total = self.saved;
    }
}

/// Seeds the registry in `prepare` and publishes it as an output.
struct SetpointSource {
    output: Option<PortId>,
}

impl Component for SetpointSource {
    fn name(&self) -> &str {
        "Setpoint"
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.output = Some(ports.output(port("Setpoint"))?);
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        ctx.registry()
            .set_entry(RegistryKey::SetHeatingTemperatureForBuilding, 20.5);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let value = ctx
            .registry_ref()
            .get_scalar(RegistryKey::SetHeatingTemperatureForBuilding)?;
        if let Some(output) = self.output {
            ctx.set_output(output, value)?;
        }
        Ok(())
    }
}

/// Fails or emits NaN at a given timestep.
struct Faulty {
    at: usize,
    nan: bool,
    output: Option<PortId>,
}

impl Component for Faulty {
    fn name(&self) -> &str {
        "Faulty"
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.output = Some(ports.output(port("Out"))?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        if ctx.clock().index == self.at {
            if !self.nan {
                return Err(ComponentError::NonPhysical {
                    what: "negative mass".into(),
                });
            }
            if let Some(output) = self.output {
                ctx.set_output(output, f64::NAN)?;
            }
        }
        Ok(())
    }
}

fn simulator(asm: Assembly, options: SchedulerOptions) -> Simulator {
    Simulator::from_assembly(
        asm,
        &AssemblyOptions::default(),
        options,
        SharedRegistryHandle::new(),
    )
    .unwrap()
}

fn contractive_pair() -> Assembly {
    // A = 0.5 B + 1, B = 0.5 A  =>  A = 4/3, B = 2/3
    let mut asm = Assembly::new();
    let a = asm.add_component(Linear::new("A", 0.5, 1.0)).unwrap();
    let b = asm.add_component(Linear::new("B", 0.5, 0.0)).unwrap();
    let acc = asm.add_component(Accumulator::new()).unwrap();
    asm.connect(a, "In", b, "Out").unwrap();
    asm.connect(b, "In", a, "Out").unwrap();
    asm.connect(acc, "In", a, "Out").unwrap();
    asm
}

#[test]
fn contractive_cycle_converges_every_timestep() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    assert!(sim.evaluation_order().has_cycles());

    let record = sim.run(&hours(3)).unwrap();
    assert_eq!(sim.state(), RunState::Finished);
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.len(), 3);

    let a = record.series("A", "Out").unwrap();
    let b = record.series("B", "Out").unwrap();
    for (&ai, &bi) in a.iter().zip(b) {
        assert!((ai - 4.0 / 3.0).abs() < 1e-5);
        assert!((bi - 2.0 / 3.0).abs() < 1e-5);
    }
    assert!(record.iterations[0] > 1);
    assert!(record.iterations.iter().all(|&i| i <= 100));
}

#[test]
fn re_evaluation_starts_from_saved_state() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    let record = sim.run(&hours(2)).unwrap();

    // One addition per timestep, however many sweeps the cycle needed
    let total = record.series("Accumulator", "Total").unwrap();
    let a = record.series("A", "Out").unwrap();
    assert!((total[0] - a[0]).abs() < 1e-5);
    assert!((total[1] - (a[0] + a[1])).abs() < 1e-5);
}

#[test]
fn non_contractive_cycle_reports_convergence_failure() {
    // A = B + 1, B = A + 1 has no fixed point
    let mut asm = Assembly::new();
    let a = asm.add_component(Linear::new("A", 1.0, 1.0)).unwrap();
    let b = asm.add_component(Linear::new("B", 1.0, 1.0)).unwrap();
    asm.connect(a, "In", b, "Out").unwrap();
    asm.connect(b, "In", a, "Out").unwrap();

    let options = SchedulerOptions {
        max_iterations: 20,
        ..SchedulerOptions::default()
    };
    let mut sim = simulator(asm, options);
    let err = sim.run(&hours(2)).unwrap_err();
    match err {
        SimError::Convergence {
            timestep,
            iterations,
            unstable,
        } => {
            assert_eq!(timestep, 0);
            assert_eq!(iterations, 20);
            assert!(unstable.contains(&"A".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sim.state(), RunState::Failed);
}

#[test]
fn acyclic_chain_needs_one_sweep_and_no_stale_reads() {
    // Consumer inserted before its producer
    let mut asm = Assembly::new();
    let consumer = asm.add_component(Linear::new("Consumer", 2.0, 0.0)).unwrap();
    let producer = asm.add_component(Linear::new("Producer", 0.0, 5.0)).unwrap();
    asm.connect(consumer, "In", producer, "Out").unwrap();

    let mut sim = simulator(asm, SchedulerOptions::default());
    let record = sim.run(&hours(2)).unwrap();
    assert_eq!(record.series("Consumer", "Out").unwrap(), &[10.0, 10.0]);
    assert_eq!(record.iterations, vec![1, 1]);
}

#[test]
fn unconnected_optional_input_reads_zero() {
    let mut asm = Assembly::new();
    asm.add_component(Linear::new("Lonely", 3.0, 2.0)).unwrap();
    let mut sim = simulator(asm, SchedulerOptions::default());
    let record = sim.run(&hours(1)).unwrap();
    assert_eq!(record.series("Lonely", "Out").unwrap(), &[2.0]);
}

#[test]
fn identical_assemblies_give_identical_records() {
    let run = || {
        let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
        sim.run(&hours(6)).unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    for (x, y) in first.series.iter().zip(&second.series) {
        let xb: Vec<u64> = x.values.iter().map(|v| v.to_bits()).collect();
        let yb: Vec<u64> = y.values.iter().map(|v| v.to_bits()).collect();
        assert_eq!(xb, yb);
    }
}

#[test]
fn cancellation_before_start_yields_empty_record() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    sim.cancel_token().cancel();
    let record = sim.run(&hours(5)).unwrap();
    assert!(record.is_empty());
    assert_eq!(record.status, RunStatus::Cancelled);
    assert_eq!(sim.state(), RunState::Finished);
}

#[test]
fn cancellation_keeps_completed_timesteps() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    let token = sim.cancel_token();
    let mut seen = Vec::new();
    let record = sim
        .run_with_progress(&hours(10), |p| {
            seen.push(p.timestep);
            if p.timestep == 2 {
                token.cancel();
            }
        })
        .unwrap();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(record.len(), 3);
    assert_eq!(record.series("A", "Out").unwrap().len(), 3);
    assert_eq!(record.status, RunStatus::Cancelled);
}

#[test]
fn progress_reports_every_timestep() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    let mut fractions = Vec::new();
    sim.run_with_progress(&hours(4), |p| fractions.push(p.fraction_complete))
        .unwrap();
    assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn simulator_runs_once() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    sim.run(&hours(1)).unwrap();
    let err = sim.run(&hours(1)).unwrap_err();
    assert_eq!(
        err,
        SimError::InvalidState {
            action: "run",
            state: RunState::Finished,
        }
    );
}

#[test]
fn invalid_parameters_and_options_are_rejected() {
    let asm = contractive_pair();
    let err = Simulator::from_assembly(
        asm,
        &AssemblyOptions::default(),
        SchedulerOptions {
            max_iterations: 0,
            ..SchedulerOptions::default()
        },
        SharedRegistryHandle::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }));

    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    let mut params = hours(1);
    params.seconds_per_timestep = 0;
    assert!(matches!(sim.run(&params), Err(SimError::InvalidArg { .. })));
    assert_eq!(sim.state(), RunState::Ready);
}

#[test]
fn period_ending_past_the_calendar_is_rejected_before_running() {
    let mut sim = simulator(contractive_pair(), SchedulerOptions::default());
    let params = SimulationParameters::new(
        chrono::NaiveDateTime::MAX - Duration::hours(1),
        Duration::hours(3),
        3600,
    );
    assert!(matches!(sim.run(&params), Err(SimError::InvalidArg { .. })));
    assert_eq!(sim.state(), RunState::Ready);
    sim.run(&hours(2)).unwrap();
}

#[test]
fn unresolved_assembly_surfaces_as_graph_error() {
    let mut asm = Assembly::new();
    asm.add_component(Accumulator::new()).unwrap();
    let err = Simulator::from_assembly(
        asm,
        &AssemblyOptions::default(),
        SchedulerOptions::default(),
        SharedRegistryHandle::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SimError::Graph(_)));
}

#[test]
fn component_failure_aborts_with_timestep() {
    let mut asm = Assembly::new();
    asm.add_component(Faulty {
        at: 2,
        nan: false,
        output: None,
    })
    .unwrap();
    let mut sim = simulator(asm, SchedulerOptions::default());
    let err = sim.run(&hours(5)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Component { ref component, timestep: 2, .. } if component == "Faulty"
    ));
    assert_eq!(sim.state(), RunState::Failed);
}

#[test]
fn non_finite_output_aborts() {
    let mut asm = Assembly::new();
    asm.add_component(Faulty {
        at: 1,
        nan: true,
        output: None,
    })
    .unwrap();
    let mut sim = simulator(asm, SchedulerOptions::default());
    let err = sim.run(&hours(3)).unwrap_err();
    assert!(matches!(
        err,
        SimError::NonFinite { ref port, timestep: 1, .. } if port == "Faulty.Out"
    ));
}

#[test]
fn registry_is_shared_and_cleared_at_teardown() {
    let registry = SharedRegistryHandle::new();
    let mut asm = Assembly::new();
    asm.add_component(SetpointSource { output: None }).unwrap();
    let mut sim = Simulator::from_assembly(
        asm,
        &AssemblyOptions::default(),
        SchedulerOptions::default(),
        registry.clone(),
    )
    .unwrap();
    let record = sim.run(&hours(2)).unwrap();
    assert_eq!(record.series("Setpoint", "Setpoint").unwrap(), &[20.5, 20.5]);
    assert!(registry.lock().is_empty());
}

#[test]
fn registry_survives_when_clearing_is_disabled() {
    let registry = SharedRegistryHandle::new();
    let mut asm = Assembly::new();
    asm.add_component(SetpointSource { output: None }).unwrap();
    let options = SchedulerOptions {
        clear_registry_on_finish: false,
        ..SchedulerOptions::default()
    };
    let mut sim =
        Simulator::from_assembly(asm, &AssemblyOptions::default(), options, registry.clone())
            .unwrap();
    sim.run(&hours(1)).unwrap();
    assert!(
        registry
            .lock()
            .exist_entry(RegistryKey::SetHeatingTemperatureForBuilding)
    );
}
