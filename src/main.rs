use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use baseband_chain::channel::{Echo, MAX_ECHOES, MultipathProfile};
use baseband_chain::config::SimulationConfig;
use baseband_chain::error::{ChainError, ChainResult};
use baseband_chain::phy::{LineCode, WaveformParams};
use baseband_chain::pipeline::Sample;
use baseband_chain::transmission::{SweepConfig, run_sweep, simulate};
use baseband_chain::ui::{ProgressManager, print_banner};
use baseband_chain::utils::consts::*;
use baseband_chain::utils::logging::init_logging;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Baseband transmission chain simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message through the chain and report the BER
    Run {
        /// Bit string of 7+ digits, or the length of a random message
        #[arg(short, long, default_value_t = DEFAULT_MESSAGE_BITS.to_string())]
        mess: String,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, value_enum, ignore_case = true, default_value_t = LineCode::Rz)]
        form: LineCode,
        /// Low and high amplitude
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
        ampl: Option<Vec<Sample>>,
        #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES_PER_SYMBOL)]
        samples_per_symbol: usize,
        /// Target SNR per bit (dB); adds Gaussian noise
        #[arg(long, allow_negative_numbers = true)]
        snrpb: Option<f64>,
        /// Multipath echo, repeatable
        #[arg(long = "echo", value_name = "DELAY:AMPLITUDE")]
        echoes: Vec<Echo>,
        /// Protect the message with the repetition code
        #[arg(long)]
        coding: bool,
        /// Load the whole configuration from a JSON file instead
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Measure BER over a range of SNR values and write CSV
    Sweep {
        #[arg(long, default_value_t = SWEEP_SNR_START_DB, allow_negative_numbers = true)]
        from: f64,
        #[arg(long, default_value_t = SWEEP_SNR_END_DB, allow_negative_numbers = true)]
        to: f64,
        #[arg(long, default_value_t = SWEEP_SNR_STEP_DB)]
        step: f64,
        /// Random message length per run
        #[arg(short, long, default_value_t = SWEEP_MESSAGE_BITS)]
        mess: usize,
        #[arg(short, long)]
        seed: Option<u64>,
        /// Line codes to compare, repeatable (default: all)
        #[arg(short, long = "form", value_enum, ignore_case = true)]
        forms: Vec<LineCode>,
        #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLES_PER_SYMBOL)]
        samples_per_symbol: usize,
        #[arg(long = "echo", value_name = "DELAY:AMPLITUDE")]
        echoes: Vec<Echo>,
        #[arg(long)]
        coding: bool,
        /// CSV destination, stdout when omitted or "-"
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn profile_from(echoes: Vec<Echo>) -> ChainResult<Option<MultipathProfile>> {
    if echoes.is_empty() {
        return Ok(None);
    }
    if echoes.len() > MAX_ECHOES {
        return Err(ChainError::invalid(format!(
            "at most {} echoes allowed, got {}",
            MAX_ECHOES,
            echoes.len()
        )));
    }
    MultipathProfile::new(echoes).map(Some)
}

fn run(cli: Cli) -> ChainResult<()> {
    match cli.command {
        Commands::Run {
            mess,
            seed,
            form,
            ampl,
            samples_per_symbol,
            snrpb,
            echoes,
            coding,
            config,
            json,
        } => {
            let config = match config {
                Some(path) => {
                    info!("Loading configuration from {}", path.display());
                    SimulationConfig::from_json(&std::fs::read_to_string(path)?)?
                }
                None => {
                    let (low, high) = match ampl.as_deref() {
                        Some([low, high]) => (*low, *high),
                        _ => (DEFAULT_AMPLITUDE_LOW, DEFAULT_AMPLITUDE_HIGH),
                    };
                    SimulationConfig {
                        message: mess.parse()?,
                        seed,
                        waveform: WaveformParams::new(samples_per_symbol, high, low, form)?,
                        snr_per_bit_db: snrpb,
                        multipath: profile_from(echoes)?,
                        use_repetition_coding: coding,
                    }
                }
            };

            let report = simulate(config)?;
            if json {
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|e| ChainError::Io(e.to_string()))?;
                println!("{}", text);
            } else {
                println!("{}", report);
            }
        }
        Commands::Sweep {
            from,
            to,
            step,
            mess,
            seed,
            forms,
            samples_per_symbol,
            echoes,
            coding,
            output,
        } => {
            let config = SweepConfig {
                snr_start_db: from,
                snr_end_db: to,
                snr_step_db: step,
                message_bits: mess,
                seed,
                line_codes: if forms.is_empty() {
                    LineCode::ALL.to_vec()
                } else {
                    forms
                },
                samples_per_symbol,
                use_repetition_coding: coding,
                multipath: profile_from(echoes)?,
                ..SweepConfig::default()
            };

            let mut dst: Box<dyn Write> = match output {
                Some(path) if path == "-" => Box::new(io::stdout()),
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(io::stdout()),
            };

            let progress = ProgressManager::new();
            run_sweep(&config, &mut dst, &progress)?;
        }
    }
    Ok(())
}

fn main() {
    init_logging();
    print_banner();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
