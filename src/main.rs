use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

use redmars::{CoreConfig, Emulator, RunOutcome, Warrior, WarriorId};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Icws94,
    Icws86,
    Debug,
}

impl From<Preset> for CoreConfig {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Icws94 => CoreConfig::ICWS94,
            Preset::Icws86 => CoreConfig::ICWS86,
            Preset::Debug => CoreConfig::DEBUG,
        }
    }
}

/// Pit two Redcode warriors against each other in a circular core
#[derive(Parser)]
#[command(name = "redmars", version)]
struct Cli {
    /// Core address where warrior 1 is loaded
    base1: usize,

    /// Load file of warrior 1, one instruction per line
    warrior1: PathBuf,

    /// Core address where warrior 2 is loaded
    base2: usize,

    /// Load file of warrior 2, one instruction per line
    warrior2: PathBuf,

    /// Step budget; 0 runs until a win or the cycle ceiling
    #[arg(default_value_t = 0)]
    steps: usize,

    /// Parameter preset for the virtual machine
    #[arg(long, value_enum, default_value_t = Preset::Icws94)]
    preset: Preset,

    /// Offset of warrior 1's first executed instruction
    #[arg(long, default_value_t = 0)]
    start1: usize,

    /// Offset of warrior 2's first executed instruction
    #[arg(long, default_value_t = 0)]
    start2: usize,

    /// Print every core cell once the match is over
    #[arg(long)]
    dump_core: bool,
}

fn read_warrior(path: &Path, start: usize, core_size: usize) -> anyhow::Result<Warrior> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut warrior = Warrior::from_source(&source, core_size)
        .with_context(|| format!("parsing {}", path.display()))?;
    warrior.start_pos = start;
    Ok(warrior)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = CoreConfig::from(cli.preset);

    let warrior1 = read_warrior(&cli.warrior1, cli.start1, config.core_size)?;
    let warrior2 = read_warrior(&cli.warrior2, cli.start2, config.core_size)?;

    let mut emulator = Emulator::new(config);
    emulator.load_warrior(&warrior1, cli.base1, WarriorId::W1)?;
    emulator.load_warrior(&warrior2, cli.base2, WarriorId::W2)?;

    let outcome = emulator.run(cli.steps)?;
    let stats = *emulator.stats();
    info!(
        "executed {} cycles: {} by warrior 1, {} by warrior 2",
        stats.cycles, stats.executed[0], stats.executed[1]
    );

    match outcome {
        RunOutcome::WonByW1 => {
            println!("warrior 1 won after {} cycles", emulator.cycles());
        }
        RunOutcome::WonByW2 => {
            println!("warrior 2 won after {} cycles", emulator.cycles());
        }
        RunOutcome::Tie => {
            println!(
                "tie: both warriors alive at the cycle ceiling of {}",
                config.max_cycles
            );
        }
        RunOutcome::Paused => {
            println!("paused after {} cycles, no winner yet", emulator.cycles());
        }
        RunOutcome::NoExecution => {
            println!("nothing ran: a warrior had no live processes at the start");
        }
    }

    if cli.dump_core {
        for addr in 0..config.core_size {
            println!("{}", emulator.value_at(addr));
        }
    }

    Ok(())
}
