//! Command line front end for the tank ledger.
//!
//! ```bash
//! tank-ledger --config ledger.toml tank create --name "T-101" --location north --capacity 10000
//! tank-ledger movement transfer --from tank_1... --to tank_1...=500 --date 2025-03-04
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tank_ledger::config::LedgerConfig;
use tank_ledger::service::{
    AdjustmentRequest, MovementUpdate, NewMovement, TransferRequest, TransferTarget,
};
use tank_ledger::store::MovementQuery;
use tank_ledger::tank_service::NewTank;
use tank_ledger::telemetry::init_tracing;
use tank_ledger::{
    FeedstockType, Ledger, LedgerDate, Movement, MovementStatus, MovementType, TankWithLevel,
    Volume,
};

#[derive(Parser, Debug)]
#[clap(name = "tank-ledger")]
#[clap(about = "Feedstock tank ledger")]
struct Args {
    /// TOML configuration file
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(subcommand)]
    Tank(TankCommand),
    #[clap(subcommand)]
    Movement(MovementCommand),
    #[clap(subcommand)]
    Terminal(TerminalCommand),
}

#[derive(Subcommand, Debug)]
enum TankCommand {
    Create {
        #[clap(long)]
        name: String,
        #[clap(long)]
        location: String,
        #[clap(long, default_value = "carbon_black_oil")]
        feedstock: FeedstockType,
        #[clap(long)]
        capacity: Volume,
        #[clap(long, default_value = "0")]
        initial: Volume,
    },
    List {
        #[clap(long)]
        location: Option<String>,
        #[clap(long, default_value = "0")]
        skip: usize,
        #[clap(long, default_value = "100")]
        limit: usize,
    },
    Show {
        id: String,
    },
    History {
        id: String,
        #[clap(long, default_value = "0")]
        skip: usize,
        #[clap(long, default_value = "50")]
        limit: usize,
    },
    /// End-of-day levels for a date range
    Volumes {
        id: String,
        #[clap(long)]
        from: LedgerDate,
        #[clap(long)]
        to: LedgerDate,
    },
    /// Replay the tank's whole history
    Rebuild {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum MovementCommand {
    Create {
        #[clap(long = "type")]
        movement_type: MovementType,
        #[clap(long)]
        tank: String,
        #[clap(long)]
        target: Option<String>,
        #[clap(long)]
        date: LedgerDate,
        #[clap(long)]
        volume: Volume,
        #[clap(long)]
        notes: Option<String>,
    },
    /// One source, one or more `--to TANK=VOLUME` targets
    Transfer {
        #[clap(long)]
        from: String,
        #[clap(long = "to", value_parser = parse_target, required = true)]
        targets: Vec<TransferTarget>,
        #[clap(long)]
        date: LedgerDate,
        #[clap(long)]
        notes: Option<String>,
        #[clap(long)]
        complete: bool,
    },
    Update {
        id: String,
        #[clap(long)]
        tank: Option<String>,
        #[clap(long)]
        date: Option<LedgerDate>,
        #[clap(long)]
        volume: Option<Volume>,
        #[clap(long)]
        notes: Option<String>,
    },
    Complete {
        id: String,
        #[clap(long)]
        actual: Volume,
    },
    /// Book a physical reading
    Adjust {
        #[clap(long)]
        tank: String,
        #[clap(long)]
        physical: Volume,
        #[clap(long)]
        date: Option<LedgerDate>,
        #[clap(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
    List {
        #[clap(long)]
        tank: Option<String>,
        #[clap(long = "type")]
        movement_type: Option<MovementType>,
        #[clap(long)]
        status: Option<MovementStatus>,
        #[clap(long)]
        from: Option<LedgerDate>,
        #[clap(long)]
        to: Option<LedgerDate>,
        #[clap(long, default_value = "0")]
        skip: usize,
        #[clap(long, default_value = "100")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum TerminalCommand {
    Locations,
    Summary,
    History {
        location: String,
        #[clap(long)]
        from: LedgerDate,
        #[clap(long)]
        to: LedgerDate,
    },
}

fn parse_target(value: &str) -> Result<TransferTarget, String> {
    let (tank_id, volume) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TANK=VOLUME, got {value}"))?;
    let volume = volume
        .parse::<Volume>()
        .map_err(|e| format!("invalid volume {volume}: {e}"))?;
    Ok(TransferTarget {
        tank_id: tank_id.to_string(),
        volume,
    })
}

fn print_movement(movement: &Movement) {
    let status = if movement.is_completed() {
        "completed"
    } else {
        "pending"
    };
    let date = movement
        .scheduled_date()
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".into());
    let volume = movement
        .actual_volume
        .unwrap_or_else(|| movement.expected_volume());
    let tanks = match (movement.tank_id(), &movement.target_tank_id) {
        (Some(source), Some(target)) => format!("{source} -> {target}"),
        (Some(source), None) => source.to_string(),
        (None, _) => "unassigned".to_string(),
    };
    let resulting = movement
        .resulting_volume
        .map(|level| level.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{}  {date}  {:<10} {tanks}  {volume} bbl  {status}  level after: {resulting}",
        movement.id, movement.movement_type
    );
}

fn print_tank(tank: &TankWithLevel) {
    println!(
        "{}  {}  {}  {}  {} / {} bbl ({}%)",
        tank.tank.id,
        tank.tank.name,
        tank.tank.location,
        tank.tank.feedstock_type,
        tank.tank.current_level,
        tank.tank.capacity,
        tank.level_percentage
    );
}

fn run_tank(ledger: &Ledger, command: TankCommand) -> anyhow::Result<()> {
    let tanks = ledger.tanks();
    match command {
        TankCommand::Create {
            name,
            location,
            feedstock,
            capacity,
            initial,
        } => {
            let tank = tanks
                .create(NewTank {
                    name,
                    location,
                    feedstock_type: feedstock,
                    capacity,
                    initial_level: initial,
                })
                .context("creating tank")?;
            print_tank(&tank.into());
        }
        TankCommand::List {
            location,
            skip,
            limit,
        } => {
            for tank in tanks.list(location.as_deref(), skip, limit)? {
                print_tank(&tank);
            }
        }
        TankCommand::Show { id } => print_tank(&tanks.get(&id)?),
        TankCommand::History { id, skip, limit } => {
            for movement in tanks.history(&id, skip, limit)? {
                print_movement(&movement);
            }
        }
        TankCommand::Volumes { id, from, to } => {
            for day in tanks.volume_history(&id, from, to)? {
                println!("{}  {}", day.date, day.eod_volume);
            }
        }
        TankCommand::Rebuild { id } => {
            let level = tanks
                .rebuild(&id)
                .with_context(|| format!("rebuilding {id}"))?;
            println!("{id} rebuilt, current level {level} bbl");
        }
        TankCommand::Delete { id } => {
            let tank = tanks.delete(&id)?;
            println!("deleted {} ({})", tank.id, tank.name);
        }
    }
    Ok(())
}

fn run_movement(ledger: &Ledger, command: MovementCommand) -> anyhow::Result<()> {
    let movements = ledger.movements();
    match command {
        MovementCommand::Create {
            movement_type,
            tank,
            target,
            date,
            volume,
            notes,
        } => {
            let mut request = NewMovement::new(movement_type, tank, date, volume);
            request.target_tank_id = target;
            request.notes = notes;
            print_movement(&movements.create(request).context("creating movement")?);
        }
        MovementCommand::Transfer {
            from,
            targets,
            date,
            notes,
            complete,
        } => {
            let created = movements
                .create_transfer(TransferRequest {
                    source_tank_id: from,
                    targets,
                    scheduled_date: date,
                    notes,
                    complete_immediately: complete,
                })
                .context("creating transfer")?;
            for movement in &created {
                print_movement(movement);
            }
        }
        MovementCommand::Update {
            id,
            tank,
            date,
            volume,
            notes,
        } => {
            let update = MovementUpdate {
                tank_id: tank,
                scheduled_date: date,
                expected_volume: volume,
                notes,
                ..MovementUpdate::default()
            };
            print_movement(&movements.update(&id, update)?);
        }
        MovementCommand::Complete { id, actual } => {
            print_movement(&movements.complete(&id, actual)?);
        }
        MovementCommand::Adjust {
            tank,
            physical,
            date,
            notes,
        } => {
            let mut request = AdjustmentRequest::new(tank, physical);
            request.inspection_date = date;
            request.notes = notes;
            print_movement(&movements.create_adjustment(request)?);
        }
        MovementCommand::Delete { id } => {
            let removed = movements.delete(&id)?;
            println!("deleted {}", removed.id);
        }
        MovementCommand::List {
            tank,
            movement_type,
            status,
            from,
            to,
            skip,
            limit,
        } => {
            let mut query = MovementQuery::default()
                .with_date_range(from, to)
                .paginate(skip, limit);
            query.tank_id = tank;
            query.movement_type = movement_type;
            query.status = status;
            for movement in movements.list(query)? {
                print_movement(&movement);
            }
        }
    }
    Ok(())
}

fn run_terminal(ledger: &Ledger, command: TerminalCommand) -> anyhow::Result<()> {
    let terminals = ledger.terminals();
    match command {
        TerminalCommand::Locations => {
            for location in terminals.locations()? {
                println!("{location}");
            }
        }
        TerminalCommand::Summary => {
            for summary in terminals.summaries()? {
                println!(
                    "{}  tanks: {}  {} / {} bbl ({}%)",
                    summary.location,
                    summary.tank_count,
                    summary.current_total_level,
                    summary.total_capacity,
                    summary.utilization
                );
            }
        }
        TerminalCommand::History { location, from, to } => {
            for day in terminals.daily_history(&location, from, to)? {
                println!(
                    "{}  net {}  level {} ({}%)  in {}  out {}  load {}  discharge {}  adj {}",
                    day.date,
                    day.net_movement,
                    day.total_level,
                    day.utilization,
                    day.transfers_in,
                    day.transfers_out,
                    day.loads,
                    day.discharges,
                    day.adjustments
                );
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = LedgerConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.logging);

    let ledger = Ledger::open(&config).context("opening ledger")?;
    match args.command {
        Command::Tank(command) => run_tank(&ledger, command),
        Command::Movement(command) => run_movement(&ledger, command),
        Command::Terminal(command) => run_terminal(&ledger, command),
    }
}
