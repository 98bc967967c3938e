use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use void_control::{AutoPlayer, AutoPlayerConfig, CommandSource};
use void_core::snapshot;
use void_core::{
    apply_command, Catalog, Event, Game, GameView, MemoryStore, SnapshotStore, TickScheduler,
    Tuning,
};
use void_store::{load_tuning, unix_millis, FileStore};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "void_cli", about = "Void Architect headless runner")]
struct Cli {
    /// Tuning override file (JSON). Missing keys keep standard values.
    #[arg(long, global = true)]
    tuning: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation headless for a fixed stretch of simulated time.
    Run {
        #[arg(long)]
        seconds: f64,
        /// Seconds per tick.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
        /// Manual clicks issued per second by the autoplayer.
        #[arg(long, default_value_t = 0.0)]
        clicks_per_second: f64,
        /// Buy the cheapest affordable structure or upgrade every tick.
        #[arg(long)]
        buy_cheapest: bool,
        /// Save file to resume from and autosave into.
        #[arg(long)]
        save: Option<PathBuf>,
        /// Print a status line every N simulated seconds.
        #[arg(long, default_value_t = 10.0)]
        print_every: f64,
    },
    /// Validate a save file and print its contents and any repairs.
    Inspect { path: PathBuf },
    /// Print a save file as normalized export text.
    Export { path: PathBuf },
    /// Validate exported text and write it as the save file.
    Import {
        input: PathBuf,
        #[arg(long, default_value = void_store::DEFAULT_SAVE_FILE)]
        save: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

struct RunOptions {
    seconds: f64,
    dt: f64,
    print_every: f64,
    autoplay: AutoPlayerConfig,
}

#[derive(Debug, Default, PartialEq)]
struct RunSummary {
    ticks: u64,
    overheats: usize,
    saves: usize,
    failed_saves: usize,
}

impl RunSummary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CoreOverheated { .. } => self.overheats += 1,
                Event::Saved { .. } => self.saves += 1,
                Event::SaveFailed { .. } => self.failed_saves += 1,
                _ => {}
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tick_count(seconds: f64, dt: f64) -> u64 {
    (seconds / dt).ceil().max(0.0) as u64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn simulate<S: SnapshotStore>(
    game: &mut Game,
    scheduler: &mut TickScheduler<S>,
    options: &RunOptions,
    start_ms: u64,
    out: &mut impl Write,
) -> Result<RunSummary> {
    let mut player = AutoPlayer::new(options.autoplay);
    let mut summary = RunSummary::default();
    let mut next_print = options.print_every;

    for tick in 1..=tick_count(options.seconds, options.dt) {
        for command in player.generate_commands(game, options.dt) {
            apply_command(game, &command);
        }
        let elapsed = tick as f64 * options.dt;
        let now_ms = start_ms + (elapsed * 1000.0) as u64;
        let events = scheduler.advance(game, options.dt, now_ms);
        summary.record(&events);
        summary.ticks += 1;

        if options.print_every > 0.0 && elapsed + 1e-9 >= next_print {
            print_status(out, elapsed, &game.view())?;
            next_print += options.print_every;
        }
    }
    Ok(summary)
}

fn run(tuning: Tuning, save: Option<&Path>, options: &RunOptions) -> Result<()> {
    if !(options.dt.is_finite() && options.dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {}", options.dt);
    }
    let mut game = Game::new(Catalog::STANDARD, tuning);
    let start_ms = unix_millis();
    let mut stdout = std::io::stdout().lock();

    println!(
        "Starting simulation: seconds={} dt={:.4} clicks_per_second={} buy_cheapest={}",
        options.seconds,
        options.dt,
        options.autoplay.clicks_per_second,
        options.autoplay.buy_cheapest,
    );

    let summary = if let Some(path) = save {
        let mut scheduler = TickScheduler::new(FileStore::new(path), &tuning);
        if scheduler.restore_into(&mut game) {
            println!("Resumed from {}", path.display());
        }
        println!("{}", "-".repeat(80));
        let summary = simulate(&mut game, &mut scheduler, options, start_ms, &mut stdout)?;
        let end_ms = unix_millis().max(start_ms);
        if !scheduler.save_now(&mut game, end_ms) {
            bail!("final save to {} failed", path.display());
        }
        summary
    } else {
        let mut scheduler = TickScheduler::new(MemoryStore::new(), &tuning);
        println!("{}", "-".repeat(80));
        simulate(&mut game, &mut scheduler, options, start_ms, &mut stdout)?
    };

    println!("{}", "-".repeat(80));
    println!(
        "Done. ticks={} overheats={} autosaves={} failed_saves={}",
        summary.ticks, summary.overheats, summary.saves, summary.failed_saves,
    );
    print_status(&mut stdout, options.seconds, &game.view())?;
    Ok(())
}

fn print_status(out: &mut impl Write, elapsed: f64, view: &GameView) -> Result<()> {
    let owned: Vec<String> = view
        .structures
        .iter()
        .map(|row| format!("{}={}", row.id, row.count))
        .collect();
    let levels: Vec<String> = view
        .upgrades
        .iter()
        .map(|row| format!("{}={}", row.id, row.level))
        .collect();
    writeln!(
        out,
        "[t={elapsed:8.1}s]  energy={energy:10.1}  eps={eps:6.2}  heat={heat:5.1}  \
         eff={eff:4.2}  mult={mult:5.2}  [{owned}]  [{levels}]",
        energy = view.void_energy,
        eps = view.energy_per_second,
        heat = view.heat,
        eff = view.efficiency,
        mult = view.click_multiplier,
        owned = owned.join(", "),
        levels = levels.join(", "),
    )
    .context("writing status line")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Save file commands
// ---------------------------------------------------------------------------

fn read_validated(path: &Path, tuning: &Tuning) -> Result<snapshot::Validated> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading save file: {}", path.display()))?;
    snapshot::decode(&text, &Catalog::STANDARD, tuning)
        .with_context(|| format!("validating save file: {}", path.display()))
}

fn inspect(path: &Path, tuning: &Tuning, out: &mut impl Write) -> Result<()> {
    let validated = read_validated(path, tuning)?;
    let game = Game::from_snapshot(Catalog::STANDARD, *tuning, &validated.snapshot);
    writeln!(out, "{}", path.display())?;
    if validated.warnings.is_empty() {
        writeln!(out, "  no repairs needed")?;
    }
    for warning in &validated.warnings {
        writeln!(out, "  repaired {warning}")?;
    }
    let view = game.view();
    writeln!(
        out,
        "  void energy {:.1}  echoes {:.1}  transcendence {:.1}  last save {}",
        view.void_energy,
        view.echoes,
        view.transcendence_points,
        view.last_save_time
            .map_or_else(|| "never".to_string(), |ms| ms.to_string()),
    )?;
    for row in &view.structures {
        writeln!(out, "  {:<16} x{:<5} next {:.0}", row.name, row.count, row.cost)?;
    }
    for row in &view.upgrades {
        let next = row
            .cost
            .map_or_else(|| "max".to_string(), |cost| format!("{cost:.0}"));
        writeln!(out, "  {:<24} lv{:<3} next {next}", row.name, row.level)?;
    }
    Ok(())
}

fn export(path: &Path, tuning: &Tuning) -> Result<String> {
    let validated = read_validated(path, tuning)?;
    snapshot::encode(&validated.snapshot).context("encoding export text")
}

fn import(input: &Path, save: &Path, tuning: &Tuning) -> Result<usize> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading import file: {}", input.display()))?;
    let mut game = Game::new(Catalog::STANDARD, *tuning);
    let warnings = game
        .import_snapshot(&text)
        .with_context(|| format!("import rejected: {}", input.display()))?;
    let normalized = game.export_snapshot().context("encoding save")?;
    FileStore::new(save).persist(&normalized)?;
    Ok(warnings.len())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let tuning = match &cli.tuning {
        Some(path) => load_tuning(path)?,
        None => Tuning::STANDARD,
    };
    match cli.command {
        Commands::Run {
            seconds,
            dt,
            clicks_per_second,
            buy_cheapest,
            save,
            print_every,
        } => {
            let options = RunOptions {
                seconds,
                dt,
                print_every,
                autoplay: AutoPlayerConfig {
                    clicks_per_second,
                    buy_cheapest,
                },
            };
            run(tuning, save.as_deref(), &options)?;
        }
        Commands::Inspect { path } => inspect(&path, &tuning, &mut std::io::stdout().lock())?,
        Commands::Export { path } => println!("{}", export(&path, &tuning)?),
        Commands::Import { input, save } => {
            let repaired = import(&input, &save, &tuning)?;
            println!(
                "Imported {} into {} ({repaired} field(s) repaired)",
                input.display(),
                save.display()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(seconds: f64, autoplay: AutoPlayerConfig) -> RunOptions {
        RunOptions {
            seconds,
            dt: 0.1,
            print_every: 0.0,
            autoplay,
        }
    }

    #[test]
    fn tick_count_rounds_up() {
        assert_eq!(tick_count(1.0, 0.1), 10);
        assert_eq!(tick_count(1.05, 0.1), 11);
        assert_eq!(tick_count(0.0, 0.1), 0);
    }

    #[test]
    fn headless_run_progresses_and_autosaves() {
        let mut game = Game::standard();
        let mut scheduler = TickScheduler::new(MemoryStore::new(), &Tuning::STANDARD);
        let autoplay = AutoPlayerConfig {
            clicks_per_second: 4.0,
            buy_cheapest: true,
        };
        let summary = simulate(
            &mut game,
            &mut scheduler,
            &options(120.0, autoplay),
            0,
            &mut Vec::new(),
        )
        .unwrap();
        assert_eq!(summary.ticks, 1200);
        assert_eq!(summary.overheats, 0);
        assert!(summary.saves >= 3);
        assert!(game.structures().count("crystalNode") > 0);
        assert!(scheduler.store().saved().is_some());
    }

    #[test]
    fn status_lines_follow_print_interval() {
        let mut game = Game::standard();
        let mut scheduler = TickScheduler::new(MemoryStore::new(), &Tuning::STANDARD);
        let mut out = Vec::new();
        let opts = RunOptions {
            print_every: 1.0,
            ..options(5.0, AutoPlayerConfig::default())
        };
        simulate(&mut game, &mut scheduler, &opts, 0, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().all(|line| line.contains("crystalNode=")));
    }

    #[test]
    fn import_then_export_normalizes_save() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.txt");
        let save = dir.path().join("save.json");
        std::fs::write(
            &input,
            r#"{
                "voidEnergy": 40,
                "structures": { "crystalNode": { "count": 2 }, "mystery": { "count": 1 } }
            }"#,
        )
        .unwrap();

        let repaired = import(&input, &save, &Tuning::STANDARD).unwrap();
        assert!(repaired > 0);

        let text = export(&save, &Tuning::STANDARD).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["structures"]["crystalNode"]["count"], 2);
        assert!(value["structures"].get("mystery").is_none());
        assert_eq!(value["saveVersion"], 2);
    }

    #[test]
    fn import_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.txt");
        let save = dir.path().join("save.json");
        std::fs::write(&input, "[1, 2, 3]").unwrap();
        let err = import(&input, &save, &Tuning::STANDARD).unwrap_err();
        assert!(err.to_string().contains("import rejected"));
        assert!(!save.exists());
    }

    #[test]
    fn inspect_lists_repairs_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, r#"{"voidEnergy": -3, "saveVersion": 2}"#).unwrap();
        let mut out = Vec::new();
        inspect(&path, &Tuning::STANDARD, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("repaired voidEnergy: out of range, clamped"));
        assert!(text.contains("Crystal Node"));
        assert!(text.contains("Reinforce Core Matrix"));
    }
}
