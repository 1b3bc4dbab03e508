//! Console emulator CLI.
//!
//! This binary builds a machine from an optional JSON configuration, loads
//! ELF boot images onto the requested cores, and runs the scheduler until
//! the system stops. Logging is controlled with `RUST_LOG` (e.g.
//! `RUST_LOG=hydra_core=warn`).

use std::path::PathBuf;
use std::process;
use std::{fs, path::Path};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hydra_core::sim::machine::{ARM_CPU, PPC_CPU0};
use hydra_core::{Config, Machine};

#[derive(Parser, Debug)]
#[command(
    name = "hydra",
    author,
    version,
    about = "Heterogeneous ARM + triple-PowerPC console emulator",
    long_about = "Boot firmware images on an emulated console: one ARM security/IO \
                  processor and three PowerPC application cores sharing a physical \
                  address space.\n\nExamples:\n  hydra run --arm boot0.elf\n  \
                  hydra run --config machine.json --arm iosu.elf --ppc kernel.elf"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot one or more ELF images.
    Run {
        /// Machine configuration (JSON). Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// ELF image booted on the ARM security processor.
        #[arg(long)]
        arm: Option<PathBuf>,

        /// ELF image booted on the first PowerPC application core.
        #[arg(long)]
        ppc: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, arm, ppc } => cmd_run(config, arm, ppc),
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("error: could not read config '{}': {err}", path.display());
        process::exit(1);
    });
    Config::from_json(&text).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    })
}

fn load_image(machine: &mut Machine, path: &Path) -> u32 {
    let image = fs::read(path).unwrap_or_else(|err| {
        eprintln!("error: could not read image '{}': {err}", path.display());
        process::exit(1);
    });
    machine.load_elf(&image).unwrap_or_else(|err| {
        eprintln!("error: could not load '{}': {err}", path.display());
        process::exit(1);
    })
}

fn cmd_run(config: Option<PathBuf>, arm: Option<PathBuf>, ppc: Option<PathBuf>) {
    let config = load_config(config.as_deref());
    let mut machine = Machine::new(&config).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });

    if arm.is_none() && ppc.is_none() {
        eprintln!("error: nothing to boot; pass --arm and/or --ppc");
        process::exit(1);
    }

    if let Some(path) = arm {
        let entry = load_image(&mut machine, &path);
        if let Some(cpu) = machine.arm_mut() {
            cpu.core.regs[hydra_core::core::arm::PC] = entry;
        }
        let _ = machine.resume(ARM_CPU);
        println!("[*] ARM: {} (entry {entry:#010x})", path.display());
    }

    if let Some(path) = ppc {
        let entry = load_image(&mut machine, &path);
        if let Some(cpu) = machine.ppc_mut(0) {
            cpu.core.pc = entry;
        }
        let _ = machine.resume(PPC_CPU0);
        println!("[*] PPC0: {} (entry {entry:#010x})", path.display());
    }

    if machine.run() {
        println!("[*] Machine stopped");
    } else {
        eprintln!("[!] Machine halted on an unrecovered fault");
        process::exit(1);
    }
}
