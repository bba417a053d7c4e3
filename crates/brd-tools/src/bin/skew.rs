use clap::Parser;
use std::path::PathBuf;

use brd_tools::skew::{bus_report, select_nets, BusPattern, BusReport, BusSort, LayerClasses};
use brd_tools::types::Board;
use brd_tools::units;

#[derive(Parser)]
#[command(
    name = "brd-skew",
    about = "Per-net trace length / propagation delay report for bus skew matching"
)]
struct Cli {
    /// Input legacy board file (.brd)
    input: PathBuf,

    /// Net name prefix selecting bus members (repeatable)
    #[arg(short, long = "prefix")]
    prefixes: Vec<String>,

    /// Net name suffix selecting bus members (repeatable)
    #[arg(short, long = "suffix")]
    suffixes: Vec<String>,

    /// Copper ordinals treated as outer layers (150 ps/inch)
    #[arg(long, value_delimiter = ',', default_value = "15,0")]
    outer: Vec<u32>,

    /// Copper ordinals treated as inner layers (180 ps/inch)
    #[arg(long, value_delimiter = ',', default_value = "5,2")]
    inner: Vec<u32>,

    /// Report lengths only (mm), skipping the delay columns
    #[arg(long)]
    lengths: bool,

    /// Also print the board stack-up table
    #[arg(long)]
    stackup: bool,
}

fn ps(seconds: f64) -> String {
    format!("{:3.0} ps", seconds * 1e12)
}

fn mm(native: f64) -> String {
    format!("{:5.1} mm", units::to_mm(native))
}

fn print_delay_report(report: &BusReport) {
    println!("{:>20}   len    min+   max-    len      min+     max-    via", "");
    for row in &report.rows {
        println!(
            "{:>20}: {} {} {} {} {} {} {:>3}",
            row.short_name,
            ps(row.delay),
            ps(row.delay - report.min_delay),
            ps(report.max_delay - row.delay),
            mm(row.length),
            mm(row.length - report.min_length),
            mm(report.max_length - row.length),
            row.via_count
        );
    }
}

fn print_length_report(report: &BusReport) {
    for row in &report.rows {
        println!(
            "{:>20}: {:5.2} {:5.2} {:5.2} {}",
            row.short_name,
            units::to_mm(row.length),
            units::to_mm(row.length - report.min_length),
            units::to_mm(report.max_length - row.length),
            row.via_count
        );
    }
}

fn print_stackup(board: &Board) {
    for layer in board.stackup().layers() {
        match (layer.name, layer.ordinal) {
            (Some(name), Some(ordinal)) => println!(
                "{name:>10} (layer {ordinal:>2})  {:4.1} mil ±{:.1}  {}",
                layer.thickness.0, layer.thickness.1, layer.material
            ),
            _ => println!(
                "{:>10}             {:4.1} mil ±{:.1}  {}",
                "", layer.thickness.0, layer.thickness.1, layer.material
            ),
        }
    }
    let coppers: Vec<u32> = board
        .stackup()
        .layers()
        .iter()
        .filter_map(|layer| layer.ordinal)
        .collect();
    if let (Some(&top), Some(&bottom)) = (coppers.first(), coppers.last()) {
        if let Ok(span) = board.stackup().layer_distance(top, bottom) {
            println!("total stack: {span:.1} mil");
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let board = match brd_tools::load_board(&cli.input) {
        Ok(board) => board,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if cli.stackup {
        print_stackup(&board);
        println!();
    }

    let pattern = BusPattern {
        prefixes: cli.prefixes,
        suffixes: cli.suffixes,
    };
    let nets = select_nets(&board, &pattern);
    if nets.is_empty() {
        eprintln!("Error: no nets matched the given patterns");
        std::process::exit(1);
    }

    let classes = LayerClasses {
        outer: cli.outer,
        inner: cli.inner,
    };
    let sort = if cli.lengths {
        BusSort::Length
    } else {
        BusSort::Delay
    };
    match bus_report(&board, &nets, &classes, sort) {
        Ok(report) => {
            if cli.lengths {
                print_length_report(&report);
            } else {
                print_delay_report(&report);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
