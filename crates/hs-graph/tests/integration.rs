//! Integration tests for hs-graph assembly, validation and ordering.

use hs_core::{ComponentType, FlowRole, LoadType, SourceWeight, Unit, tag_set};
use hs_graph::{
    Assembly, AssemblyOptions, Component, ComponentResult, ConnectionOrigin, DynamicInputSpec,
    DynamicOutputSpec, EvalContext, EvaluationOrder, GraphError, GraphResult, PortDeclarer,
    PortSpec, PredefinedConnection,
};
use proptest::prelude::*;

/// Configurable component with no behaviour.
struct Probe {
    name: String,
    kind: ComponentType,
    weight: SourceWeight,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    predefined: &'static [PredefinedConnection],
}

impl Probe {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ComponentType::Generic,
            weight: SourceWeight::DEFAULT,
            inputs: Vec::new(),
            outputs: Vec::new(),
            predefined: &[],
        }
    }

    fn kind(mut self, kind: ComponentType) -> Self {
        self.kind = kind;
        self
    }

    fn weight(mut self, weight: u32) -> Self {
        self.weight = SourceWeight(weight);
        self
    }

    fn input(mut self, spec: PortSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    fn output(mut self, spec: PortSpec) -> Self {
        self.outputs.push(spec);
        self
    }

    fn predefined(mut self, table: &'static [PredefinedConnection]) -> Self {
        self.predefined = table;
        self
    }
}

impl Component for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentType {
        self.kind
    }

    fn source_weight(&self) -> SourceWeight {
        self.weight
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        for spec in &self.inputs {
            ports.input(spec.clone())?;
        }
        for spec in &self.outputs {
            ports.output(spec.clone())?;
        }
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        self.predefined
    }

    fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        Ok(())
    }
}

fn power(name: &str) -> PortSpec {
    PortSpec::new(name, LoadType::Electricity, Unit::Watt)
}

fn heat(name: &str) -> PortSpec {
    PortSpec::new(name, LoadType::Heat, Unit::Watt)
}

#[test]
fn duplicate_port_rolls_back_component() {
    let mut asm = Assembly::new();
    let err = asm
        .add_component(Probe::new("Meter").input(power("P")).input(power("P")))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicatePort { ref port, .. } if port == "P"));
    assert!(asm.is_empty());
    assert!(asm.graph().ports().is_empty());
    assert!(asm.component_id("Meter").is_none());

    // Same name in both directions is allowed
    asm.add_component(Probe::new("Meter").input(power("P")).output(power("P")))
        .unwrap();
}

#[test]
fn duplicate_component_name_is_rejected() {
    let mut asm = Assembly::new();
    asm.add_component(Probe::new("Pv")).unwrap();
    let err = asm.add_component(Probe::new("Pv")).unwrap_err();
    assert_eq!(err, GraphError::DuplicateComponent { name: "Pv".into() });
}

#[test]
fn connect_checks_types_and_existing_sources() {
    let mut asm = Assembly::new();
    let pv = asm
        .add_component(Probe::new("Pv").output(power("ElectricityOutput")))
        .unwrap();
    let hp = asm
        .add_component(Probe::new("HeatPump").output(heat("ThermalPowerDelivered")))
        .unwrap();
    let building = asm
        .add_component(
            Probe::new("Building")
                .input(heat("ThermalPowerDelivered"))
                .input(PortSpec::new("Anything", LoadType::Any, Unit::Any)),
        )
        .unwrap();

    let err = asm
        .connect(building, "ThermalPowerDelivered", pv, "ElectricityOutput")
        .unwrap_err();
    match err {
        GraphError::PortTypeMismatch {
            target_component,
            source_component,
            expected,
            found,
            ..
        } => {
            assert_eq!(target_component, "Building");
            assert_eq!(source_component, "Pv");
            assert_eq!(expected, (LoadType::Heat, Unit::Watt));
            assert_eq!(found, (LoadType::Electricity, Unit::Watt));
        }
        other => panic!("unexpected error: {other}"),
    }

    asm.connect(building, "ThermalPowerDelivered", hp, "ThermalPowerDelivered")
        .unwrap();
    asm.connect(building, "Anything", pv, "ElectricityOutput")
        .unwrap();

    let err = asm
        .connect(building, "ThermalPowerDelivered", hp, "ThermalPowerDelivered")
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::AlreadyConnected {
            component: "Building".into(),
            port: "ThermalPowerDelivered".into(),
            existing_source: "HeatPump.ThermalPowerDelivered".into(),
        }
    );

    let err = asm.connect(building, "Missing", hp, "ThermalPowerDelivered");
    assert!(matches!(err, Err(GraphError::UnknownPort { .. })));
}

#[test]
fn explicit_connection_carries_source_weight_and_tags() {
    let mut asm = Assembly::new();
    let pv = asm
        .add_component(
            Probe::new("Pv")
                .weight(7)
                .output(power("ElectricityOutput").with_tags([FlowRole::ElectricityProduction])),
        )
        .unwrap();
    let meter = asm
        .add_component(Probe::new("Meter").input(power("Production")))
        .unwrap();
    let conn = asm.connect(meter, "Production", pv, "ElectricityOutput").unwrap();

    let c = asm.graph().connection(conn).unwrap();
    assert_eq!(c.source_weight, SourceWeight(7));
    assert_eq!(c.origin, ConnectionOrigin::Explicit);
    assert!(c.tags.contains(&FlowRole::ElectricityProduction.into()));
}

#[test]
fn finish_reports_unresolved_mandatory_input() {
    let mut asm = Assembly::new();
    asm.add_component(
        Probe::new("Building")
            .input(heat("Optional").optional())
            .input(heat("ThermalPowerDelivered")),
    )
    .unwrap();
    let err = asm.finish(&AssemblyOptions::default()).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnresolvedMandatoryInput {
            component: "Building".into(),
            port: "ThermalPowerDelivered".into(),
        }
    );
}

#[test]
fn optional_inputs_do_not_block_finish() {
    let mut asm = Assembly::new();
    asm.add_component(Probe::new("Building").input(heat("Optional").optional()))
        .unwrap();
    asm.finish(&AssemblyOptions::default()).unwrap();
}

#[test]
fn resolve_orders_by_weight_then_registration() {
    let mut asm = Assembly::new();
    let meter = asm.add_component(Probe::new("Meter")).unwrap();
    let production = tag_set([FlowRole::ElectricityProduction]);

    for (name, w) in [("Pv3", 3), ("Pv1", 1), ("Pv2", 2)] {
        let pv = asm
            .add_component(Probe::new(name).weight(w).output(power("ElectricityOutput")))
            .unwrap();
        asm.add_dynamic_input_and_connect(
            meter,
            pv,
            "ElectricityOutput",
            DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight(w))
                .with_tags([FlowRole::ElectricityProduction]),
        )
        .unwrap();
    }
    let load = asm
        .add_component(Probe::new("Load").output(power("ElectricityOutput")))
        .unwrap();
    asm.add_dynamic_input_and_connect(
        meter,
        load,
        "ElectricityOutput",
        DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight(0))
            .with_tags([FlowRole::ElectricityConsumptionUncontrolled]),
    )
    .unwrap();

    let resolved = asm.resolve_sources_by_tag_and_weight(LoadType::Electricity, &production, None);
    let weights: Vec<u32> = resolved.iter().map(|c| c.source_weight.value()).collect();
    assert_eq!(weights, vec![1, 2, 3]);
    assert!(resolved.iter().all(|c| c.origin == ConnectionOrigin::DynamicInput));

    let only_two =
        asm.resolve_sources_by_tag_and_weight(LoadType::Electricity, &production, Some(SourceWeight(2)));
    assert_eq!(only_two.len(), 1);
    let input = asm.graph().port(only_two[0].target_port).unwrap();
    assert_eq!(
        input.name,
        format!("Pv2_ElectricityOutput#{}", only_two[0].source_port)
    );
    assert!(input.dynamic);

    // Wrong load type matches nothing; Any matches all four
    assert!(asm
        .resolve_sources_by_tag_and_weight(LoadType::Heat, &production, None)
        .is_empty());
    assert_eq!(
        asm.resolve_sources_by_tag_and_weight(LoadType::Any, &Default::default(), None)
            .len(),
        4
    );

    asm.finish(&AssemblyOptions::default()).unwrap();
}

#[test]
fn dynamic_inputs_from_lookalike_names_stay_distinct() {
    let mut asm = Assembly::new();
    let agg = asm.add_component(Probe::new("Agg")).unwrap();
    let first = asm
        .add_component(Probe::new("Car_1").output(power("Power")))
        .unwrap();
    let second = asm
        .add_component(Probe::new("Car").output(power("1_Power")))
        .unwrap();
    let spec = || DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight::DEFAULT);

    let a = asm.add_dynamic_input_and_connect(agg, first, "Power", spec()).unwrap();
    let b = asm.add_dynamic_input_and_connect(agg, second, "1_Power", spec()).unwrap();

    let graph = asm.graph();
    let name_of = |c| {
        let conn = graph.connection(c).unwrap();
        graph.port(conn.target_port).unwrap().name.clone()
    };
    assert_ne!(name_of(a), name_of(b));
    assert!(name_of(a).starts_with("Car_1_Power#"));
    assert_eq!(graph.component(agg).unwrap().inputs.len(), 2);
    asm.finish(&AssemblyOptions::default()).unwrap();
}

#[test]
fn failed_dynamic_input_leaves_no_port() {
    let mut asm = Assembly::new();
    let meter = asm.add_component(Probe::new("Meter")).unwrap();
    let hp = asm
        .add_component(Probe::new("HeatPump").output(heat("ThermalPowerDelivered")))
        .unwrap();
    let err = asm
        .add_dynamic_input_and_connect(
            meter,
            hp,
            "ThermalPowerDelivered",
            DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight::DEFAULT),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::PortTypeMismatch { .. }));
    assert!(asm.graph().component(meter).unwrap().inputs.is_empty());
    asm.finish(&AssemblyOptions::default()).unwrap();
}

const CONTROLLER_TABLE: &[PredefinedConnection] = &[
    PredefinedConnection::new("TemperatureOutside", ComponentType::Weather, "TemperatureOutside"),
    PredefinedConnection::new("Irradiance", ComponentType::Weather, "DirectNormalIrradiance"),
    PredefinedConnection::new("TemperatureMean", ComponentType::Building, "TemperatureMean"),
];

fn weather_station() -> Probe {
    Probe::new("Weather")
        .kind(ComponentType::Weather)
        .output(PortSpec::new("TemperatureOutside", LoadType::Temperature, Unit::Celsius))
        .output(PortSpec::new(
            "DirectNormalIrradiance",
            LoadType::Irradiance,
            Unit::WattPerSquareMeter,
        ))
}

fn climate_controller() -> Probe {
    Probe::new("Controller")
        .input(PortSpec::new("TemperatureOutside", LoadType::Temperature, Unit::Celsius))
        .input(PortSpec::new("Irradiance", LoadType::Irradiance, Unit::WattPerSquareMeter))
        .input(PortSpec::new("TemperatureMean", LoadType::Temperature, Unit::Celsius).optional())
        .predefined(CONTROLLER_TABLE)
}

#[test]
fn predefined_wiring_binds_exactly_matching_entries() {
    let mut asm = Assembly::new();
    let weather = asm.add_component(weather_station()).unwrap();
    let occupancy = asm
        .add_component(Probe::new("Occupancy").kind(ComponentType::Occupancy))
        .unwrap();
    let controller = asm.add_component(climate_controller()).unwrap();

    let created = asm.connect_predefined(controller, &[weather]).unwrap();
    assert_eq!(created.len(), 2);
    for id in &created {
        let c = asm.graph().connection(*id).unwrap();
        assert_eq!(c.origin, ConnectionOrigin::Predefined);
        assert_eq!(c.source_component, weather);
    }

    let err = asm.connect_predefined(controller, &[occupancy]).unwrap_err();
    assert!(matches!(
        err,
        GraphError::NoPredefinedConnections { source_kind: ComponentType::Occupancy, .. }
    ));

    asm.finish(&AssemblyOptions::default()).unwrap();
}

#[test]
fn failed_predefined_wiring_keeps_no_connection() {
    let mut asm = Assembly::new();
    let weather = asm.add_component(weather_station()).unwrap();
    let occupancy = asm
        .add_component(Probe::new("Occupancy").kind(ComponentType::Occupancy))
        .unwrap();
    let controller = asm.add_component(climate_controller()).unwrap();

    // Weather entries bind first, then the occupancy lookup fails
    let err = asm
        .connect_predefined(controller, &[weather, occupancy])
        .unwrap_err();
    assert!(matches!(err, GraphError::NoPredefinedConnections { .. }));
    assert!(asm.graph().connections().is_empty());
    assert_eq!(asm.graph().consumers_of(asm.graph().components()[0].outputs[0]).count(), 0);

    let created = asm.connect_predefined(controller, &[weather]).unwrap();
    assert_eq!(created.len(), 2);
    asm.finish(&AssemblyOptions::default()).unwrap();
}

#[test]
fn dynamic_slots_resolve_by_weight() {
    let mut asm = Assembly::new();
    let ems = asm.add_component(Probe::new("Ems")).unwrap();
    let target_tags = [FlowRole::ElectricityTarget];

    let mut slots = Vec::new();
    for w in [3, 1, 2] {
        let slot = asm
            .add_dynamic_output_and_register(
                ems,
                DynamicOutputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight(w))
                    .with_tags(target_tags)
                    .describe(format!("target for weight {w}")),
            )
            .unwrap();
        slots.push(slot);
    }

    for slot in &slots {
        let controller = asm
            .add_component(
                Probe::new(&format!("Controller{}", slot.source_weight)).input(power("Target")),
            )
            .unwrap();
        let conn = asm
            .register_dynamic_input_source(controller, "Target", slot)
            .unwrap();
        let c = asm.graph().connection(conn).unwrap();
        assert_eq!(c.origin, ConnectionOrigin::DynamicSlot);
        assert_eq!(c.source_weight, slot.source_weight);
    }

    let ordered: Vec<u32> = asm
        .graph()
        .dynamic_slots_of(ems, &tag_set(target_tags))
        .iter()
        .map(|s| s.source_weight.value())
        .collect();
    assert_eq!(ordered, vec![1, 2, 3]);

    let system = asm.finish(&AssemblyOptions::default()).unwrap();
    assert_eq!(system.graph().dynamic_slots().len(), 3);
}

#[test]
fn dangling_slot_policy() {
    let build = || {
        let mut asm = Assembly::new();
        let ems = asm.add_component(Probe::new("Ems")).unwrap();
        asm.add_dynamic_output_and_register(
            ems,
            DynamicOutputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight(1)),
        )
        .unwrap();
        asm
    };

    let err = build().finish(&AssemblyOptions::default()).unwrap_err();
    assert!(matches!(err, GraphError::UnresolvedDynamicSlot { ref owner, .. } if owner == "Ems"));

    build()
        .finish(&AssemblyOptions::warn_on_dangling_slots())
        .unwrap();
}

#[test]
fn foreign_slot_is_rejected() {
    let mut other = Assembly::new();
    let owner = other
        .add_component(Probe::new("Other").output(power("A")).output(power("B")))
        .unwrap();
    let slot = other
        .add_dynamic_output_and_register(
            owner,
            DynamicOutputSpec::new(LoadType::Electricity, Unit::Watt, SourceWeight(1)),
        )
        .unwrap();

    let mut asm = Assembly::new();
    let target = asm
        .add_component(Probe::new("Target").input(power("In")))
        .unwrap();
    let err = asm
        .register_dynamic_input_source(target, "In", &slot)
        .unwrap_err();
    assert!(matches!(err, GraphError::ForeignSlot { .. }));
}

fn chain_probe(name: &str, from: &[&str]) -> Probe {
    let mut probe = Probe::new(name).output(power("Out"));
    for f in from {
        probe = probe.input(power(&format!("From{f}")));
    }
    probe
}

#[test]
fn order_follows_dependencies_not_insertion() {
    let mut asm = Assembly::new();
    let a = asm.add_component(chain_probe("A", &["B"])).unwrap();
    let b = asm.add_component(chain_probe("B", &["C"])).unwrap();
    let c = asm.add_component(chain_probe("C", &[])).unwrap();
    asm.connect(a, "FromB", b, "Out").unwrap();
    asm.connect(b, "FromC", c, "Out").unwrap();

    let system = asm.finish(&AssemblyOptions::default()).unwrap();
    let order = EvaluationOrder::compute(system.graph());
    assert_eq!(order.order, vec![c, b, a]);
    assert!(!order.has_cycles());
    assert_eq!(order.order[0], c);
}

#[test]
fn cycles_are_grouped_and_ordered_by_lowest_index() {
    // D is independent; A <-> B form a cycle fed by C
    let mut asm = Assembly::new();
    let d = asm.add_component(chain_probe("D", &[])).unwrap();
    let a = asm.add_component(chain_probe("A", &["B", "C"])).unwrap();
    let b = asm.add_component(chain_probe("B", &["A"])).unwrap();
    let c = asm.add_component(chain_probe("C", &[])).unwrap();
    asm.connect(a, "FromB", b, "Out").unwrap();
    asm.connect(b, "FromA", a, "Out").unwrap();
    asm.connect(a, "FromC", c, "Out").unwrap();

    let system = asm.finish(&AssemblyOptions::default()).unwrap();
    let order = EvaluationOrder::compute(system.graph());
    assert_eq!(order.order, vec![d, c, a, b]);
    assert_eq!(order.cyclic_groups, vec![vec![a, b]]);
}

#[test]
fn self_loop_is_cyclic() {
    let mut asm = Assembly::new();
    let a = asm.add_component(chain_probe("A", &["A"])).unwrap();
    asm.connect(a, "FromA", a, "Out").unwrap();
    let system = asm.finish(&AssemblyOptions::default()).unwrap();
    let order = EvaluationOrder::compute(system.graph());
    assert_eq!(order.cyclic_groups, vec![vec![a]]);
}

proptest! {
    #[test]
    fn order_is_a_permutation_respecting_acyclic_edges(
        n in 2_usize..8,
        raw_edges in prop::collection::vec((0_usize..8, 0_usize..8), 0..20),
    ) {
        let names: Vec<String> = (0..n).map(|i| format!("N{i}")).collect();
        let mut asm = Assembly::new();
        let mut ids = Vec::new();
        for name in &names {
            let mut probe = Probe::new(name).output(power("Out"));
            for other in &names {
                probe = probe.input(power(&format!("From{other}")).optional());
            }
            ids.push(asm.add_component(probe).unwrap());
        }

        let mut edges = std::collections::BTreeSet::new();
        for (s, t) in raw_edges {
            let (s, t) = (s % n, t % n);
            if s != t && edges.insert((s, t)) {
                asm.connect(ids[t], &format!("From{}", names[s]), ids[s], "Out").unwrap();
            }
        }

        let system = asm.finish(&AssemblyOptions::default()).unwrap();
        let order = EvaluationOrder::compute(system.graph());
        prop_assert_eq!(order.clone(), EvaluationOrder::compute(system.graph()));

        let mut sorted = order.order.clone();
        sorted.sort();
        prop_assert_eq!(sorted, ids.clone());

        let mut pos = vec![0; n];
        for (i, id) in order.order.iter().enumerate() {
            pos[id.index()] = i;
        }
        let same_group = |a: usize, b: usize| {
            order
                .cyclic_groups
                .iter()
                .any(|g| g.iter().any(|c| c.index() == a) && g.iter().any(|c| c.index() == b))
        };
        for &(s, t) in &edges {
            if !same_group(s, t) {
                prop_assert!(pos[s] < pos[t], "edge {} -> {} violated", s, t);
            }
        }
    }
}
