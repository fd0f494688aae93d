//! Demo command - run a picker session against the simulated renderer.
//!
//! The scripted platform answers with the coordinate given on the command
//! line (or denies / fails), and the simulated page completes loading either
//! before or after the fix arrives. Scripted mode drags and confirms from
//! flags; interactive mode reads commands from stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use pinpoint::bridge::SimulatedRenderer;
use pinpoint::location::{
    FixedLocation, FixedOutcome, PositionFetchError, PositionGate, RawPosition,
};
use pinpoint::picker::{
    LocationPicker, LocationPickerHandle, PickerPhase, PickerSnapshot, RendererReadiness,
};
use pinpoint::Coordinate;

use super::common::{asset_source, load_config, parse_coordinate, runtime, setup_logging};
use crate::error::CliError;

/// How long to wait for any single picker transition.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Latitude reported by the simulated device
    #[arg(long, default_value_t = 19.3, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude reported by the simulated device
    #[arg(long, default_value_t = 73.0, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Simulate the user declining the location prompt
    #[arg(long, conflicts_with = "unavailable")]
    pub deny: bool,

    /// Simulate a position fetch failure after permission is granted
    #[arg(long)]
    pub unavailable: bool,

    /// Let the renderer finish loading before the position arrives
    #[arg(long)]
    pub ready_first: bool,

    /// Drag the marker to LAT,LON before confirming (scripted mode)
    #[arg(
        long,
        value_name = "LAT,LON",
        value_parser = parse_coordinate,
        allow_hyphen_values = true
    )]
    pub drag: Option<Coordinate>,

    /// Read commands from stdin instead of running the script
    #[arg(long, short)]
    pub interactive: bool,

    /// Directory to load the renderer template from
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

impl DemoArgs {
    fn outcome(&self) -> FixedOutcome {
        if self.deny {
            FixedOutcome::Denied
        } else if self.unavailable {
            FixedOutcome::Unavailable(PositionFetchError::Timeout)
        } else {
            FixedOutcome::Position(RawPosition::new(self.latitude, self.longitude))
        }
    }
}

/// Run the demo command.
pub fn run(args: DemoArgs) -> Result<(), CliError> {
    let config = load_config();
    let _logging = setup_logging(&config, args.verbose)?;

    let assets = asset_source(args.assets.clone(), &config);
    let picker_config = config.picker_config();
    debug!(config = ?picker_config, outcome = ?args.outcome(), "Starting demo session");

    runtime()?.block_on(async move {
        let (platform, gate) = if args.ready_first {
            let (platform, gate) = FixedLocation::gated(args.outcome());
            (platform, Some(gate))
        } else {
            (FixedLocation::new(args.outcome()), None)
        };
        let platform = Arc::new(platform);
        let renderer = Arc::new(SimulatedRenderer::new());

        let handle = LocationPicker::new(platform.clone(), assets, renderer.clone())
            .with_config(picker_config)
            .mount(|c: Coordinate| {
                println!("{} {}", style("onLocationConfirmed:").green().bold(), c);
            });

        let session = DemoSession {
            handle,
            renderer,
            platform,
        };
        let result = session.drive(&args, gate).await;
        session.handle.unmount().await;
        result
    })
}

struct DemoSession {
    handle: LocationPickerHandle,
    renderer: Arc<SimulatedRenderer>,
    platform: Arc<FixedLocation>,
}

impl DemoSession {
    async fn drive(&self, args: &DemoArgs, gate: Option<PositionGate>) -> Result<(), CliError> {
        step("mounted");
        self.wait(|s| s.template_loaded || s.phase.is_terminal()).await?;

        match gate {
            Some(gate) => {
                if !self.handle.snapshot().phase.is_terminal() {
                    step("renderer finishes loading first");
                    self.renderer.complete_load();
                    self.wait(|s| s.readiness == RendererReadiness::Ready || s.phase.is_terminal())
                        .await?;
                }
                step("position fix arrives");
                gate.release();
            }
            None => {
                self.wait(|s| s.device_position.is_some() || s.phase.is_terminal())
                    .await?;
                if !self.handle.snapshot().phase.is_terminal() {
                    step("position known, renderer finishes loading");
                    self.renderer.complete_load();
                }
            }
        }

        let snapshot = self
            .wait(|s| s.phase == PickerPhase::Active || s.phase.is_terminal())
            .await?;
        print_state(&snapshot);

        match &snapshot.phase {
            PickerPhase::Active => {}
            PickerPhase::PermissionDenied => {
                println!("Location access is turned off. Opening settings...");
                self.handle.open_settings()?;
                println!("Settings opened {} time(s)", self.platform.settings_opened());
                return Ok(());
            }
            PickerPhase::Error(failure) => return Err(CliError::Demo(failure.to_string())),
            other => return Err(CliError::Demo(format!("unexpected phase {}", other.label()))),
        }

        for payload in self.renderer.received() {
            println!("  host -> renderer: {}", style(payload).cyan());
        }

        if args.interactive {
            self.interactive().await
        } else {
            self.scripted(args.drag).await
        }
    }

    async fn scripted(&self, drag: Option<Coordinate>) -> Result<(), CliError> {
        if let Some(to) = drag {
            self.drag(to).await?;
        }
        self.handle.confirm().await?;
        Ok(())
    }

    async fn interactive(&self) -> Result<(), CliError> {
        println!("Commands: drag LAT LON | recenter | confirm | state | settings | quit");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
            let outcome = match command {
                "" => continue,
                "quit" | "exit" => break,
                "state" => {
                    print_state(&self.handle.snapshot());
                    Ok(())
                }
                "drag" => match parse_coordinate(rest) {
                    Ok(to) => self.drag(to).await,
                    Err(e) => Err(CliError::Demo(e)),
                },
                "recenter" => self.recenter().await,
                "confirm" => self.handle.confirm().await.map(|_| ()).map_err(CliError::from),
                "settings" => self.handle.open_settings().map_err(CliError::from),
                other => Err(CliError::Demo(format!("unknown command '{}'", other))),
            };
            if let Err(e) = outcome {
                println!("{} {}", style("error:").red(), e);
            }
        }
        Ok(())
    }

    async fn drag(&self, to: Coordinate) -> Result<(), CliError> {
        self.renderer.drag_marker_to(to);
        self.wait(|s| s.selected == Some(to)).await?;
        println!("  renderer -> host: markerMoved {}", to);
        Ok(())
    }

    async fn recenter(&self) -> Result<(), CliError> {
        let before = self.renderer.received().len();
        self.handle.recenter()?;
        let device = self.handle.snapshot().device_position;
        self.wait(|s| s.selected == device).await?;
        for payload in self.renderer.received().into_iter().skip(before) {
            println!("  host -> renderer: {}", style(payload).cyan());
        }
        println!("  marker now at {}", self.renderer.marker_position());
        Ok(())
    }

    async fn wait<F>(&self, predicate: F) -> Result<PickerSnapshot, CliError>
    where
        F: FnMut(&PickerSnapshot) -> bool,
    {
        tokio::time::timeout(STEP_TIMEOUT, self.handle.wait_for(predicate))
            .await
            .map_err(|_| CliError::Demo("timed out waiting for the picker".to_string()))?
            .map_err(CliError::from)
    }
}

fn step(message: &str) {
    println!("{} {}", style("==>").blue().bold(), message);
}

fn print_state(snapshot: &PickerSnapshot) {
    let phase = match &snapshot.phase {
        PickerPhase::Active => style(snapshot.phase.label()).green(),
        PickerPhase::PermissionDenied | PickerPhase::Error(_) => {
            style(snapshot.phase.label()).red()
        }
        _ => style(snapshot.phase.label()).yellow(),
    };
    println!("  phase:      {}", phase);
    println!("  permission: {:?}", snapshot.permission);
    println!("  renderer:   {:?}", snapshot.readiness);
    if let Some(device) = snapshot.device_position {
        println!("  device:     {}", device);
    }
    if let Some(selected) = snapshot.selected {
        println!("  selected:   {}", selected);
    }
    if let PickerPhase::Error(failure) = &snapshot.phase {
        println!("  reason:     {}", failure);
    }
    println!("  confirm:    {}", if snapshot.can_confirm() { "enabled" } else { "disabled" });
}
