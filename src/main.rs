use benchprof::config::load_config;
use benchprof::render::{Formatter, RenderOptions};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Generate a human-readable benchmark system report (Linux/macOS).
///
/// All flags default to off: JSON output is opt-in and color is on unless
/// suppressed here or in the config file.
#[derive(Parser, Debug)]
#[command(name = "benchprof", version, about)]
struct Args {
    /// Print only the top summary block.
    #[arg(long)]
    short: bool,

    /// Also print the JSON report after the human-readable report.
    #[arg(long)]
    json: bool,

    /// Disable ANSI colors.
    #[arg(long)]
    no_color: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Argument parsing is the only fatal path; clap exits nonzero on its own.
    let args = Args::parse();
    let config = load_config();

    let opts = RenderOptions {
        color: !args.no_color && config.display.color.unwrap_or(true),
        show_gpu_detail: config.display.show_gpu_detail,
        show_storage_detail: config.display.show_storage_detail,
    };

    let report = benchprof::collect_report();
    let summary = report.summary(opts.show_gpu_detail, opts.show_storage_detail);
    let formatter = Formatter::new(opts);

    let text = if args.short {
        formatter.summary_text(&summary)
    } else {
        formatter.detailed_text(&report, &summary)
    };
    println!("{text}");

    if args.json {
        // Short mode mirrors the summary block; full mode adds the raw
        // per-source dumps for diagnosability.
        let payload = if args.short {
            json!({ "summary": summary })
        } else {
            json!({ "summary": summary, "details": report.details })
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => {
                println!();
                println!("{rendered}");
            }
            Err(err) => tracing::warn!(%err, "failed to serialize the JSON report"),
        }
    }
}
