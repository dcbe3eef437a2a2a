//! Battery ROI entry point: CLI wiring and config-driven scenario run.

mod cli;

use std::process;

use battery_roi::config::RunConfig;
use battery_roi::io::export::export_flows_csv;
use battery_roi::scenario::ScenarioOrchestrator;
use battery_roi::telemetry::init_tracing;

fn main() {
    init_tracing();

    let opts = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });

    let mut cfg = if let Some(path) = &opts.scenario {
        RunConfig::from_toml_file(path)
    } else {
        RunConfig::from_preset(opts.preset.as_deref().unwrap_or("nl_flat"))
    }
    .unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    if opts.load.is_some() {
        cfg.inputs.load_csv = opts.load.clone();
        cfg.inputs.pv_csv = opts.pv.clone();
    }
    if opts.prices.is_some() {
        cfg.inputs.prices_csv = opts.prices.clone();
    }

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let inputs = cfg.run_inputs().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let bundle = ScenarioOrchestrator::new().run(&inputs).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("{bundle}");

    if let Some(path) = &opts.flows_out {
        let records = bundle
            .flows_with_battery
            .step_records(&inputs.load.values, &inputs.pv.values);
        if let Err(e) = export_flows_csv(&records, path) {
            eprintln!("error: failed to write flows CSV: {e}");
            process::exit(1);
        }
        eprintln!("Flows written to {}", path.display());
    }

    #[cfg(feature = "api")]
    if opts.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(battery_roi::api::AppState::new(
            bundle,
            &inputs.load.values,
            &inputs.pv.values,
        ));
        let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(battery_roi::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
