//! ibis - IBIS model inspector
//!
//! Reads an IBIS file, prints its contents, its derived K-tables, or the
//! response of one pin driving a resistive load.
//!
//! # Usage
//!
//! ```bash
//! ibis part.ibs summary
//! ibis part.ibs ktable --model drv --direction falling > k.csv
//! ibis -v part.ibs simulate --pin 12 --load 50 --tstop 5e-9 > v.csv
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ibis_core::{
    error::{IbisError, Result},
    Circuit, Direction, Ibis, IbisConfig, IoRole, PinOptions, Simulator, Speed, SubcktNamer,
};
use tracing_subscriber::EnvFilter;

/// IBIS model inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the IBIS file
    #[arg(value_name = "IBIS_FILE")]
    file: PathBuf,

    /// Component to use instead of the first one in the file
    #[arg(short, long)]
    device: Option<String>,

    /// Skip K-table derivation
    #[arg(long)]
    no_characterize: bool,

    /// More log output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print header fields, components, pins, models and selectors
    Summary,

    /// Print the K-tables of a driving model as t,ku,kd
    Ktable {
        #[arg(short, long)]
        model: String,
        #[arg(long, default_value = "rising")]
        direction: Direction,
        #[arg(long, default_value = "typ")]
        speed: Speed,
    },

    /// Drive a resistive load from one pin and print t,v_pin
    Simulate {
        #[arg(short, long)]
        pin: String,
        #[arg(long, default_value = "rising")]
        direction: Direction,
        #[arg(long, default_value = "typ")]
        speed: Speed,
        #[arg(long, default_value = "output")]
        io: IoRole,
        /// Model to use when the pin names a model selector
        #[arg(short, long)]
        model: Option<String>,
        /// Load to ground in ohms
        #[arg(long, default_value_t = 50.0)]
        load: f64,
        #[arg(long, default_value_t = 10e-12)]
        tstep: f64,
        #[arg(long, default_value_t = 5e-9)]
        tstop: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = IbisConfig::new().with_characterize(!args.no_characterize);
    if let Some(device) = &args.device {
        config = config.with_device(device);
    }
    let ibis = Ibis::from_file(&args.file, &config)?;

    let mut out = BufWriter::new(io::stdout().lock());
    match args.command {
        Command::Summary => summary(&ibis, &mut out)?,
        Command::Ktable {
            model,
            direction,
            speed,
        } => ktable(&ibis, &model, direction, speed, &mut out)?,
        Command::Simulate {
            pin,
            direction,
            speed,
            io,
            model,
            load,
            tstep,
            tstop,
        } => {
            let mut options = PinOptions::new()
                .with_direction(direction)
                .with_speed(speed)
                .with_io_role(io);
            if let Some(model) = model {
                options = options.with_model(model);
            }
            simulate(&ibis, &pin, &options, load, tstep, tstop, &mut out)?
        }
    }
    out.flush().map_err(write_error)?;
    Ok(())
}

fn write_error(source: io::Error) -> IbisError {
    IbisError::OutputError {
        message: source.to_string(),
    }
}

fn summary(ibis: &Ibis, out: &mut impl Write) -> Result<()> {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let mut text = String::new();
    text.push_str(&format!("IBIS Ver   {}\n", field(&ibis.ibis_ver)));
    text.push_str(&format!("File Name  {}\n", field(&ibis.file_name)));
    text.push_str(&format!("File Rev   {}\n", field(&ibis.file_rev)));
    text.push_str(&format!("Date       {}\n", field(&ibis.date)));

    for (name, component) in &ibis.components {
        let selected = if ibis.device.as_deref() == Some(name.as_str()) { " *" } else { "" };
        text.push_str(&format!(
            "\n[Component] {name}{selected} ({})\n",
            field(&component.manufacturer)
        ));
        for (pin, row) in &component.pins {
            text.push_str(&format!("  {pin:<6} {:<12} {}\n", row.signal, row.model));
        }
    }

    for model in ibis.models.values() {
        let strategy = match &model.k_strategy {
            Some(k) => format!("rising {}, falling {}", k.rising, k.falling),
            None if model.model_type.is_driver() => "no K-tables".to_string(),
            None => "-".to_string(),
        };
        text.push_str(&format!("\n[Model] {} {} ({strategy})", model.name, model.model_type));
    }
    text.push('\n');

    for (name, selector) in &ibis.model_selectors {
        text.push_str(&format!("\n[Model Selector] {name}\n"));
        for (model, description) in &selector.models {
            text.push_str(&format!("  {model:<16} {description}\n"));
        }
    }

    out.write_all(text.as_bytes()).map_err(write_error)
}

fn ktable(ibis: &Ibis, name: &str, direction: Direction, speed: Speed, out: &mut impl Write) -> Result<()> {
    let model = ibis.model(name)?;
    let (Some(pullup_k), Some(pulldown_k)) = (&model.pullup_k, &model.pulldown_k) else {
        return Err(IbisError::Uncharacterized {
            model: model.name.clone(),
        });
    };

    writeln!(out, "t,ku,kd").map_err(write_error)?;
    let ku = &pullup_k[direction][speed];
    let kd = &pulldown_k[direction][speed];
    for (&(t, up), &(_, down)) in ku.iter().zip(kd) {
        writeln!(out, "{t:e},{up},{down}").map_err(write_error)?;
    }
    Ok(())
}

fn simulate(
    ibis: &Ibis,
    pin: &str,
    options: &PinOptions,
    load: f64,
    tstep: f64,
    tstop: f64,
    out: &mut impl Write,
) -> Result<()> {
    let mut namer = SubcktNamer::new();
    let model = ibis.model_for(pin, "pad", options, &mut namer)?;

    let mut circuit = Circuit::new(format!("pin {pin} into {load} ohm"));
    model.attach(&mut circuit)?;
    circuit.add_resistor("rload", "pad", "0", load)?;
    let trace = Simulator::new(circuit)?.tran(tstep, tstop)?;

    writeln!(out, "t,v_pin").map_err(write_error)?;
    for (t, v) in trace.voltage_array("pad")? {
        writeln!(out, "{t:e},{v}").map_err(write_error)?;
    }
    Ok(())
}
