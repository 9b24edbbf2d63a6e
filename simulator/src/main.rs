use clap::Parser;
use indicatif::ProgressBar;
use isf_simulator::simulation_object::SimulationObject;
use std::time::Instant;

#[derive(Parser)]
pub struct CommandLineArguments {
    #[clap(long, short)]
    toml: String,
    #[clap(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_secs().init();

    // Start timer
    let now = Instant::now();

    // Parse path to toml
    let args = CommandLineArguments::parse();

    // New sim obj from toml
    let mut simulation_object = SimulationObject::new_from_toml(&args.toml)?;

    // Print simulation parameters
    if args.verbose {
        println!("Simulation Parameters\n{}", simulation_object.parameters);
    }

    // Dump initial condition
    simulation_object.dump()?;

    // Main evolve loop
    let total_steps = (simulation_object.parameters.final_sim_time
        / simulation_object.parameters.dt)
        .ceil() as u64;
    let dump_interval =
        (total_steps / simulation_object.parameters.num_data_dumps.max(1) as u64).max(1);

    let progress = ProgressBar::new(total_steps);
    while simulation_object.not_finished() {
        simulation_object.update(args.verbose)?;
        if simulation_object.current_step() % dump_interval == 0 {
            simulation_object.dump()?;
        }
        progress.inc(1);
    }
    progress.finish();

    println!(
        "Finished {} in {} seconds",
        simulation_object.parameters.sim_name,
        now.elapsed().as_secs()
    );
    Ok(())
}
