use std::env;
use std::path::PathBuf;

pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub load: Option<PathBuf>,
    pub pv: Option<PathBuf>,
    pub prices: Option<PathBuf>,
    pub flows_out: Option<PathBuf>,
    #[cfg(feature = "api")]
    pub serve: bool,
    #[cfg(feature = "api")]
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions {
        scenario: None,
        preset: None,
        load: None,
        pv: None,
        prices: None,
        flows_out: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --scenario (expected a TOML path)")?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--load" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --load (expected a CSV path)")?;
                opts.load = Some(PathBuf::from(path));
            }
            "--pv" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --pv (expected a CSV path)")?;
                opts.pv = Some(PathBuf::from(path));
            }
            "--prices" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --prices (expected a CSV path)")?;
                opts.prices = Some(PathBuf::from(path));
            }
            "--flows-out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --flows-out (expected a file path)")?;
                if opts.flows_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--flows-out provided more than once".to_string());
                }
            }
            #[cfg(feature = "api")]
            "--serve" => opts.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                opts.port = raw
                    .parse()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if opts.load.is_some() != opts.pv.is_some() {
        return Err("`--load` and `--pv` must be given together".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("battery-roi: home battery dispatch and tariff comparison");
    eprintln!();
    eprintln!("Usage: battery-roi [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>    Load run configuration from a TOML file");
    eprintln!("  --preset <name>      Use a built-in preset (nl_flat, nl_dynamic, be_capacity)");
    eprintln!("  --load <path>        Load series CSV (kWh per step), requires --pv");
    eprintln!("  --pv <path>          PV series CSV (kWh per step), requires --load");
    eprintln!("  --prices <path>      Dynamic import prices CSV (EUR/kWh per step)");
    eprintln!("  --flows-out <path>   Export per-step flows with the battery to CSV");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve              Start REST API server after the run");
        eprintln!("  --port <u16>         API server port (default: 3000)");
    }
    eprintln!("  --help               Show this help message");
    eprintln!();
    eprintln!("If neither --scenario nor --preset is given, the nl_flat preset is used.");
}

#[cfg(test)]
mod tests {
    use super::parse_options;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn supports_scenario_cli() {
        let opts = parse_options(&args(&["--scenario", "run.toml"])).expect("parse should succeed");
        assert_eq!(
            opts.scenario.as_deref().and_then(|p| p.to_str()),
            Some("run.toml")
        );
        assert!(opts.preset.is_none());
    }

    #[test]
    fn supports_preset_and_inputs() {
        let opts = parse_options(&args(&[
            "--preset", "be_capacity", "--load", "l.csv", "--pv", "p.csv", "--flows-out", "f.csv",
        ]))
        .expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("be_capacity"));
        assert!(opts.load.is_some() && opts.pv.is_some());
        assert!(opts.flows_out.is_some());
    }

    #[test]
    fn rejects_scenario_with_preset() {
        let err = parse_options(&args(&["--scenario", "a.toml", "--preset", "nl_flat"]))
            .err()
            .unwrap_or_default();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn rejects_load_without_pv() {
        assert!(parse_options(&args(&["--load", "l.csv"])).is_err());
    }

    #[test]
    fn rejects_missing_value_and_unknown_flag() {
        assert!(parse_options(&args(&["--preset"])).is_err());
        assert!(parse_options(&args(&["--bogus"])).is_err());
    }
}
