use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use dosewatch_core::prefs::{load_windows, min_supply_days};
use dosewatch_core::supply::{days_of_supply, drugs_below_threshold};
use dosewatch_core::{
    forgotten_count, pending_count, DoseSlot, Drug, DrugForm, Intake, MemoryStore, Quantity,
};
use dosewatch_engine::{Scheduler, SystemClock};

mod prefs_file;
mod sink;
mod state;

#[derive(Parser, Debug)]
#[command(name = "dosewatch", version, about = "Dose reminder scheduling engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create ~/.dosewatch with default preferences and an empty drug file
    Init,

    /// Add a drug to the schedule
    Add {
        name: String,

        /// tablet, injection, spray, drop, gel or other
        #[arg(long, default_value = "tablet")]
        form: String,

        /// Dose amounts accept fractions, e.g. "1/2" or "1 1/2"
        #[arg(long)]
        morning: Option<String>,
        #[arg(long)]
        noon: Option<String>,
        #[arg(long)]
        evening: Option<String>,
        #[arg(long)]
        night: Option<String>,
        #[arg(long = "whole-day")]
        whole_day: Option<String>,

        /// Current supply in doses
        #[arg(long, default_value = "0")]
        supply: String,

        /// Doses per refill; 0 disables supply tracking
        #[arg(long, default_value_t = 0)]
        refill: u32,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Record a dose as taken (defaults to the active dose time)
    Take {
        name: String,

        #[arg(long)]
        slot: Option<String>,
    },

    /// One-shot evaluation of the current scheduling state
    Status,

    /// Run the reminder loop until Ctrl-C
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init => init(),
        Command::Add {
            name,
            form,
            morning,
            noon,
            evening,
            night,
            whole_day,
            supply,
            refill,
            comment,
        } => add_drug(
            name, &form, morning, noon, evening, night, whole_day, &supply, refill, comment,
        ),
        Command::Take { name, slot } => take_dose(&name, slot.as_deref()),
        Command::Status => status(),
        Command::Run => run().await,
    }
}

fn init() -> Result<()> {
    let prefs_path = prefs_file::prefs_path()?;
    if prefs_path.exists() {
        println!("Preferences already exist: {}", prefs_path.display());
    } else {
        prefs_file::save_prefs(&prefs_file::PrefsFile::default())?;
        println!("Wrote {}", prefs_path.display());
    }

    let data_path = state::data_path()?;
    if !data_path.exists() {
        state::write_data(&state::DataFile::default())?;
        println!("Wrote {}", data_path.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn add_drug(
    name: String,
    form: &str,
    morning: Option<String>,
    noon: Option<String>,
    evening: Option<String>,
    night: Option<String>,
    whole_day: Option<String>,
    supply: &str,
    refill: u32,
    comment: Option<String>,
) -> Result<()> {
    let mut data = state::read_data()?;
    if data.drugs.iter().any(|d| d.name() == name) {
        bail!("a drug named {name:?} already exists");
    }

    let mut drug = Drug::new(name, parse_form(form)?)?;
    for (slot, dose) in [
        (DoseSlot::Morning, morning),
        (DoseSlot::Noon, noon),
        (DoseSlot::Evening, evening),
        (DoseSlot::Night, night),
        (DoseSlot::WholeDay, whole_day),
    ] {
        if let Some(dose) = dose {
            let dose: Quantity = dose.parse()?;
            drug = drug.with_dose(slot, dose)?;
        }
    }
    let supply: Quantity = supply.parse()?;
    drug = drug.with_supply(supply, refill)?;
    if let Some(comment) = comment {
        drug = drug.with_comment(comment);
    }

    let id = data.drugs.iter().filter_map(|d| d.id()).max().unwrap_or(0) + 1;
    let drug = drug.with_id(id);
    println!("Added {} (id {id})", drug.name());
    data.drugs.push(drug);
    state::write_data(&data)
}

fn take_dose(name: &str, slot: Option<&str>) -> Result<()> {
    let mut data = state::read_data()?;
    let prefs = prefs_file::load_prefs()?;
    let windows = load_windows(&prefs)?;
    let now = Local::now().naive_local();

    let drug = data
        .drugs
        .iter()
        .find(|d| d.name() == name)
        .with_context(|| format!("no drug named {name:?}"))?;
    let drug_id = drug.id().context("drug has no id; re-add it")?;

    let slot = match slot {
        Some(s) => parse_slot(s)?,
        None => windows
            .active_slot(now.time())
            .context("no active dose time right now; pass --slot")?,
    };

    data.intakes.push(Intake::new(drug_id, now.date(), now, slot));
    println!("Recorded {} for the {} slot", name, slot.label());
    state::write_data(&data)
}

fn status() -> Result<()> {
    let data = state::read_data()?;
    let prefs = prefs_file::load_prefs()?;
    let windows = load_windows(&prefs)?;
    let store = MemoryStore::with_data(data.drugs, data.intakes);

    let now = Local::now().naive_local();
    let today = now.date();
    let active = windows.active_slot(now.time());
    let next = windows.next_slot(now.time())?;

    match active {
        Some(slot) => {
            let pending = pending_count(&store, today, slot)?;
            println!("Active dose time: {} ({pending} pending)", slot.label());
        }
        None => {
            let wait = windows.until_begin(now, next);
            println!(
                "No active dose time; {} begins in {} min",
                next.label(),
                wait.num_minutes()
            );
        }
    }

    if let Some(last) = active.unwrap_or(next).prev_timed() {
        let forgotten = forgotten_count(&store, today, today, Some(last))?;
        println!("Forgotten today: {forgotten}");
    }

    let low = drugs_below_threshold(&store, min_supply_days(&prefs))?;
    if low.is_empty() {
        println!("Supplies: ok");
    } else {
        for drug in &low {
            let days = days_of_supply(drug).unwrap_or(0.0);
            println!("Low supply: {} ({days:.1} days left)", drug.name());
        }
    }
    Ok(())
}

async fn run() -> Result<()> {
    let data = state::read_data()?;
    let prefs = prefs_file::load_prefs()?;
    let store = Arc::new(MemoryStore::with_data(data.drugs, data.intakes));

    let scheduler = Scheduler::new(
        store,
        Arc::new(prefs),
        Arc::new(SystemClock),
        Box::new(sink::TerminalSink),
        Some(state::crash_dir()?),
    );
    scheduler.start();
    println!("Reminder loop running; Ctrl-C to stop.");

    tokio::signal::ctrl_c().await.context("listen for ctrl-c")?;
    scheduler.shutdown();
    Ok(())
}

fn parse_form(s: &str) -> Result<DrugForm> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "tablet" => DrugForm::Tablet,
        "injection" => DrugForm::Injection,
        "spray" => DrugForm::Spray,
        "drop" => DrugForm::Drop,
        "gel" => DrugForm::Gel,
        "other" => DrugForm::Other,
        _ => bail!("unknown form {s:?} (tablet, injection, spray, drop, gel, other)"),
    })
}

fn parse_slot(s: &str) -> Result<DoseSlot> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "morning" => DoseSlot::Morning,
        "noon" => DoseSlot::Noon,
        "evening" => DoseSlot::Evening,
        "night" => DoseSlot::Night,
        "whole-day" | "whole_day" => DoseSlot::WholeDay,
        _ => bail!("unknown dose time {s:?} (morning, noon, evening, night, whole-day)"),
    })
}
