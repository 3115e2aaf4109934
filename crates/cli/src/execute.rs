use crate::commands::{Commands, RunArgs};
use crate::workers::{spawn_poller, spawn_watchdog, Pump};
use grace_core::{ShutdownConfig, Termination};
use grace_shutdown::Coordinator;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::info;

impl Commands {
    pub fn execute(self) -> eyre::Result<()> {
        match self {
            Commands::Run(args) => run(args),
            Commands::Config { config } => {
                let config = load_config(config.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
        }
    }
}

/// Load the shutdown config from an optional file plus `GRACE_*` overrides
pub fn load_config(path: Option<&Path>) -> grace_core::Result<ShutdownConfig> {
    let config = match path {
        Some(path) => ShutdownConfig::from_json_file(path)?,
        None => ShutdownConfig::default(),
    };
    config.with_env_overrides()
}

/// What the service did before it stopped
#[derive(Debug)]
pub struct ServiceReport {
    pub ticks: Vec<u64>,
    pub flushed: u64,
    pub outcome: Option<Termination>,
}

fn run(args: RunArgs) -> eyre::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let coordinator = Coordinator::builder().config(config).build()?;

    if args.non_blocking {
        let _workers = start_workers(&coordinator, &args)?;
        info!("running without wait(); a halt exits the process directly");
        loop {
            thread::park();
        }
    }

    let report = serve(&coordinator, &args)?;
    info!(
        ticks = report.ticks.iter().sum::<u64>(),
        flushed = report.flushed,
        "service stopped"
    );

    let code = coordinator
        .exit_code()
        .unwrap_or(coordinator.config().success_exit_code);
    std::process::exit(code)
}

struct Workers {
    pollers: Vec<thread::JoinHandle<u64>>,
    pump: Pump,
}

fn start_workers(coordinator: &Coordinator, args: &RunArgs) -> eyre::Result<Workers> {
    let (pump, ticks) = Pump::start(coordinator)?;
    let interval = Duration::from_millis(args.tick_ms);
    let pollers = (0..args.pollers)
        .map(|index| spawn_poller(coordinator, index, interval, ticks.clone()))
        .collect::<std::io::Result<Vec<_>>>()?;

    if let Some(ms) = args.fail_after_ms {
        spawn_watchdog(coordinator, Duration::from_millis(ms))?;
    }

    info!(
        pollers = args.pollers,
        tick_ms = args.tick_ms,
        handlers = coordinator.handler_count(),
        "service started"
    );
    Ok(Workers { pollers, pump })
}

/// Start the workers, block until shutdown completes and collect a report
pub fn serve(coordinator: &Coordinator, args: &RunArgs) -> eyre::Result<ServiceReport> {
    let workers = start_workers(coordinator, args)?;

    coordinator.wait();

    let ticks = workers
        .pollers
        .into_iter()
        .map(|poller| poller.join().unwrap_or_default())
        .collect();
    let flushed = workers.pump.join();

    Ok(ServiceReport {
        ticks,
        flushed,
        outcome: coordinator.outcome(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_serve_stops_on_worker_failure() {
        let coordinator = Coordinator::builder()
            .config(ShutdownConfig::without_signals())
            .exit_with(|_| {})
            .build()
            .unwrap();
        let args = RunArgs {
            pollers: 3,
            tick_ms: 5,
            fail_after_ms: Some(60),
            ..RunArgs::default()
        };

        let report = serve(&coordinator, &args).unwrap();

        assert_eq!(report.ticks.len(), 3);
        assert!(report.ticks.iter().all(|t| *t > 0));
        assert!(matches!(report.outcome, Some(Termination::Error(_))));
        assert_eq!(coordinator.exit_code(), Some(1));
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[test]
    fn test_serve_stops_on_external_halt() {
        let coordinator = Coordinator::builder()
            .config(ShutdownConfig::without_signals())
            .exit_with(|_| {})
            .build()
            .unwrap();
        let halter = {
            let coordinator = coordinator.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                coordinator.halt(None);
            })
        };
        let args = RunArgs {
            pollers: 1,
            tick_ms: 5,
            ..RunArgs::default()
        };

        let report = serve(&coordinator, &args).unwrap();
        halter.join().unwrap();

        assert_eq!(report.outcome, Some(Termination::Graceful));
        assert_eq!(coordinator.exit_code(), Some(0));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "signals": ["hangup"], "failure_exit_code": 3 }}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.signals, vec![grace_core::SignalKind::Hangup]);
        assert_eq!(config.failure_exit_code, 3);
    }
}
