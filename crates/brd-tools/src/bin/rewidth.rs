use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use brd_tools::rewrite::{rewrite, WidthRules};

#[derive(Parser)]
#[command(
    name = "brd-rewidth",
    about = "Rewrite track widths for impedance-class nets in a legacy board file"
)]
struct Cli {
    /// Input legacy board file (.brd)
    input: PathBuf,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Netclass whose segments are forced to the target width
    #[arg(long, default_value = "50 Ohm")]
    class: String,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading file: {e}");
            std::process::exit(1);
        }
    };

    let rules = WidthRules {
        target_class: cli.class,
        ..WidthRules::default()
    };

    let result = if let Some(path) = &cli.output {
        let file = match std::fs::File::create(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Error creating output file: {e}");
                std::process::exit(1);
            }
        };
        let mut out = std::io::BufWriter::new(file);
        rewrite(&text, &rules, &mut out).and_then(|stats| {
            out.flush()?;
            Ok(stats)
        })
    } else {
        let stdout = std::io::stdout();
        let mut out = std::io::BufWriter::new(stdout.lock());
        rewrite(&text, &rules, &mut out).and_then(|stats| {
            out.flush()?;
            Ok(stats)
        })
    };

    match result {
        Ok(_) => {
            if let Some(path) = &cli.output {
                eprintln!("Written to {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
