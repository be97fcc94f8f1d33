//! CLI definition using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Parser)]
#[command(name = "cutdata")]
#[command(author = "Future Present Labs")]
#[command(version)]
#[command(about = "Cutting force, flow stress, tool life and speed/feed recommendations for tool steels")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Material catalog (JSON). Uses the built-in tool steel catalog if not specified.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Evaluator configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(long, short = 'f', global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List catalog materials
    List {
        /// Only materials of this base alloy (e.g. "A2")
        #[arg(long)]
        alloy: Option<String>,
    },

    /// Show one material record
    Show {
        /// Material ID (e.g. "P-CS-109")
        material: String,
    },

    /// Kienzle specific cutting force, or cutting force with --width
    Force {
        material: String,

        /// Undeformed chip thickness h (mm)
        #[arg(long)]
        chip: f64,

        /// Chip width b (mm)
        #[arg(long)]
        width: Option<f64>,

        /// Cutting temperature (°C) for the temperature correction
        #[arg(long)]
        temp: Option<f64>,

        /// Cutting speed (m/min) for the speed correction
        #[arg(long)]
        speed: Option<f64>,

        /// Apply rake, edge and engagement corrections
        #[arg(long)]
        geometry: bool,
    },

    /// Johnson-Cook flow stress
    Stress {
        material: String,

        /// Plastic strain
        #[arg(long)]
        strain: f64,

        /// Strain rate (1/s)
        #[arg(long)]
        rate: f64,

        /// Temperature (°C)
        #[arg(long)]
        temp: f64,
    },

    /// Taylor tool life at a cutting speed
    Life {
        material: String,

        /// Cutting speed (m/min)
        #[arg(long)]
        speed: f64,

        /// Depth of cut (mm)
        #[arg(long)]
        depth: f64,

        /// Coolant (dry, mist, mql, flood)
        #[arg(long)]
        coolant: String,
    },

    /// Cutting speed for a target tool life
    Speed {
        material: String,

        /// Target tool life (min)
        #[arg(long)]
        life: f64,

        /// Depth of cut (mm)
        #[arg(long)]
        depth: f64,

        /// Coolant (dry, mist, mql, flood)
        #[arg(long)]
        coolant: String,
    },

    /// Speed/feed/depth recommendation
    Recommend {
        material: String,

        /// turning, milling or drilling
        operation: String,
    },

    /// Recommend one operation for every catalog material
    Batch {
        /// turning, milling or drilling
        operation: String,
    },

    /// Check catalog data quality
    Validate,

    /// Run a job script
    Run {
        /// Path to script file
        script: PathBuf,
    },
}
