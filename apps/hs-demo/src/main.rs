use std::io::{self, Write};
use std::time::Instant;

use hs_components::{EvHouseholdConfig, household_with_ev_and_battery};
use hs_graph::{Assembly, AssemblyOptions, GraphError};
use hs_registry::SharedRegistry;
use hs_sim::{SchedulerOptions, SimError, SimProgress, SimRecord, SimulationParameters, Simulator};
use tracing::info;

const YEAR: i32 = 2021;
const SECONDS_PER_TIMESTEP: u32 = 900;
const VEHICLES: usize = 2;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Sim(#[from] SimError),
}

fn main() -> Result<(), DemoError> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut asm = Assembly::new();
    let house = household_with_ev_and_battery(&mut asm, &EvHouseholdConfig::default(), VEHICLES)?;
    info!(components = asm.len(), vehicles = house.vehicles.len(), "household assembled");

    let mut sim = Simulator::from_assembly(
        asm,
        &AssemblyOptions::default(),
        SchedulerOptions::default(),
        SharedRegistry::global(),
    )?;
    let params = SimulationParameters::one_day_only(YEAR, SECONDS_PER_TIMESTEP)?;

    println!(
        "Running {} timesteps of {} s from {}",
        params.timesteps(),
        params.seconds_per_timestep,
        params.start_time
    );
    let started = Instant::now();
    let mut last_emit = Instant::now();
    let record = sim.run_with_progress(&params, |progress| {
        if last_emit.elapsed().as_millis() >= 100 {
            render_progress(progress);
            last_emit = Instant::now();
        }
    })?;
    clear_progress_line();

    println!(
        "✓ Simulation completed in {:.3}s ({:?})",
        started.elapsed().as_secs_f64(),
        record.status
    );
    print_summary(&record);
    Ok(())
}

fn render_progress(progress: &SimProgress) {
    print!(
        "\r  timestep {}/{} ({:.0}%)",
        progress.timestep + 1,
        progress.total_timesteps,
        progress.fraction_complete * 100.0
    );
    let _ = io::stdout().flush();
}

fn clear_progress_line() {
    print!("\r{:60}\r", "");
    let _ = io::stdout().flush();
}

fn print_summary(record: &SimRecord) {
    println!("  Time points: {}", record.len());
    println!("  Max sweeps:  {}", record.max_iterations());

    let dt_h = f64::from(SECONDS_PER_TIMESTEP) / 3_600.0;
    let energy_kwh = |component: &str, port: &str| {
        record
            .series(component, port)
            .map(|values| values.iter().sum::<f64>() * dt_h / 1_000.0)
    };
    for (label, component, port) in [
        ("PV production", "PvSystem", "ElectricityOutput"),
        ("Heat pump", "HeatPump", "ElectricalInputPower"),
        ("Household", "Occupancy", "ElectricityOutput"),
        ("Grid balance", "EnergyManagementSystem", "ElectricityToOrFromGrid"),
    ] {
        if let Some(kwh) = energy_kwh(component, port) {
            println!("  {label:<14} {kwh:>8.2} kWh");
        }
    }
    if let Some(temps) = record.series("Building", "TemperatureMean") {
        let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("  Indoor temperature {min:.1} to {max:.1} °C");
    }
}
