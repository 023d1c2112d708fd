// Command-line front end for the binary EPG codec.
//
// `inspect` decodes a binary document and prints a human-readable (or
// JSON) summary; `roundtrip` decodes and re-encodes, writing the
// re-encoded bytes so the two wire images can be compared.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::binary::{self, Decoded};
use crate::model::{Document, Media, Programme, ProgrammeTime};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// DAB EPG binary codec (ETSI TS 102 371).
#[derive(Parser, Debug)]
#[command(
    name = "dabepg",
    version,
    about = "DAB EPG binary encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output summaries as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode a binary document and print a summary.
    Inspect(InspectArgs),
    /// Decode and re-encode a binary document.
    Roundtrip(RoundtripArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Binary EPG or service information file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct RoundtripArgs {
    /// Binary EPG or service information file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Re-encoded output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Inspect,
    Roundtrip,
}

struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    input_file: PathBuf,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let (command, input_file, output_file) = match cli.command {
        Cmd::Inspect(args) => (Command::Inspect, args.input, None),
        Cmd::Roundtrip(args) => (Command::Roundtrip, args.input, args.output),
    };
    Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        input_file,
        output_file,
    }
}

// ---------------------------------------------------------------------------
// Decode helper
// ---------------------------------------------------------------------------

fn decode_file(opts: &Options) -> Result<Decoded, i32> {
    let data = match std::fs::read(&opts.input_file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("dabepg: input file: {}: {e}", opts.input_file.display());
            return Err(1);
        }
    };
    let decoded = match binary::unmarshall(&data) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("dabepg: decode error: {e}");
            return Err(1);
        }
    };
    if !opts.quiet {
        for warning in &decoded.warnings {
            match warning {
                binary::DecodeWarning::UnresolvedTokens { element, tokens } => {
                    eprintln!(
                        "dabepg: warning: unresolved token bytes {tokens:?} under \
                         element {element:#04x}"
                    );
                }
            }
        }
    }
    Ok(decoded)
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn programme_line(programme: &Programme) -> String {
    let name = programme
        .name(128)
        .map(|n| n.text.as_str())
        .unwrap_or("(unnamed)");
    let mut line = format!("programme {:#08x} {name:?}", programme.short_id);
    for location in &programme.locations {
        for time in &location.times {
            match time {
                ProgrammeTime::Absolute { time, duration, .. } => {
                    line.push_str(&format!(" @ {time} +{}s", duration.as_secs()));
                }
                ProgrammeTime::Relative {
                    offset, duration, ..
                } => {
                    line.push_str(&format!(" @ +{}s +{}s", offset.as_secs(), duration.as_secs()));
                }
            }
        }
    }
    line
}

fn programme_json(programme: &Programme) -> serde_json::Value {
    serde_json::json!({
        "short_id": programme.short_id,
        "crid": programme.crid,
        "names": programme.names.iter().map(|n| n.text.clone()).collect::<Vec<_>>(),
        "genres": programme.genres.iter().map(|g| g.href.clone()).collect::<Vec<_>>(),
        "locations": programme.locations.iter().map(|location| {
            serde_json::json!({
                "bearers": location.bearers.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "times": location.times.iter().map(|time| match time {
                    ProgrammeTime::Absolute { time, duration, .. } => serde_json::json!({
                        "time": time.to_string(),
                        "duration_secs": duration.as_secs(),
                    }),
                    ProgrammeTime::Relative { offset, duration, .. } => serde_json::json!({
                        "offset_secs": offset.as_secs(),
                        "duration_secs": duration.as_secs(),
                    }),
                }).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "events": programme.events.len(),
    })
}

fn cmd_inspect(opts: &Options) -> i32 {
    let decoded = match decode_file(opts) {
        Ok(decoded) => decoded,
        Err(code) => return code,
    };

    match &decoded.document {
        Document::Epg(epg) => {
            let schedule = &epg.schedule;
            if opts.json_output {
                let json = serde_json::json!({
                    "document": "epg",
                    "version": schedule.version,
                    "created": schedule.created.to_string(),
                    "originator": schedule.originator,
                    "programmes": schedule.programmes.iter()
                        .map(programme_json)
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&json).unwrap());
                return 0;
            }
            println!(
                "epg: version {}, created {}, {} programme(s)",
                schedule.version,
                schedule.created,
                schedule.programmes.len()
            );
            for programme in &schedule.programmes {
                println!("  {}", programme_line(programme));
                if opts.verbose > 0 {
                    for media in &programme.media {
                        match media {
                            Media::ShortDescription(text) => {
                                println!("    short description: {text:?}");
                            }
                            Media::LongDescription(text) => {
                                println!("    long description: {text:?}");
                            }
                            Media::Multimedia(mm) => println!("    multimedia: {}", mm.url),
                        }
                    }
                }
            }
        }
        Document::ServiceInfo(info) => {
            if opts.json_output {
                let json = serde_json::json!({
                    "document": "serviceInformation",
                    "version": info.version,
                    "originator": info.originator,
                    "provider": info.provider,
                    "ensembles": info.ensembles.iter().map(|ensemble| {
                        serde_json::json!({
                            "id": ensemble.id.to_string(),
                            "frequencies_khz": ensemble.frequencies,
                            "services": ensemble.services.iter().map(|service| {
                                serde_json::json!({
                                    "id": service.id.to_string(),
                                    "names": service.names.iter()
                                        .map(|n| n.text.clone())
                                        .collect::<Vec<_>>(),
                                    "bitrate_kbps": service.bitrate,
                                })
                            }).collect::<Vec<_>>(),
                        })
                    }).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&json).unwrap());
                return 0;
            }
            println!(
                "serviceInformation: version {}, {} ensemble(s)",
                info.version,
                info.ensembles.len()
            );
            for ensemble in &info.ensembles {
                println!(
                    "  ensemble {}: {} service(s), {} frequency(ies)",
                    ensemble.id,
                    ensemble.services.len(),
                    ensemble.frequencies.len()
                );
                for service in &ensemble.services {
                    let name = service
                        .names
                        .first()
                        .map(|n| n.text.as_str())
                        .unwrap_or("(unnamed)");
                    println!("    service {} {name:?}", service.id);
                }
            }
        }
    }
    0
}

// ---------------------------------------------------------------------------
// Roundtrip command
// ---------------------------------------------------------------------------

fn cmd_roundtrip(opts: &Options) -> i32 {
    let decoded = match decode_file(opts) {
        Ok(decoded) => decoded,
        Err(code) => return code,
    };

    let bytes = match binary::marshall(&decoded.document) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("dabepg: encode error: {e}");
            return 1;
        }
    };

    let mut writer: Box<dyn Write> = match &opts.output_file {
        Some(path) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "dabepg: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return 1;
            }
            match File::create(path) {
                Ok(f) => Box::new(BufWriter::new(f)),
                Err(e) => {
                    eprintln!("dabepg: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
        eprintln!("dabepg: write error: {e}");
        return 1;
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!("dabepg: roundtrip: {} bytes re-encoded", bytes.len());
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "roundtrip",
            "output_size": bytes.len(),
            "warnings": decoded.warnings.len(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let exit_code = match opts.command {
        Command::Inspect => cmd_inspect(&opts),
        Command::Roundtrip => cmd_roundtrip(&opts),
    };
    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("dabepg".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn inspect_subcommand_maps_correctly() {
        let opts = parse_opts(&["inspect", "epg.bin"]);
        assert_eq!(opts.command, Command::Inspect);
        assert_eq!(opts.input_file, PathBuf::from("epg.bin"));
        assert_eq!(opts.output_file, None);
    }

    #[test]
    fn roundtrip_subcommand_maps_correctly() {
        let opts = parse_opts(&["--force", "roundtrip", "in.bin", "out.bin"]);
        assert_eq!(opts.command, Command::Roundtrip);
        assert!(opts.force);
        assert_eq!(opts.input_file, PathBuf::from("in.bin"));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn global_flags_parse() {
        let opts = parse_opts(&["--json", "--quiet", "inspect", "epg.bin"]);
        assert!(opts.json_output);
        assert!(opts.quiet);
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-v", "-v", "-v", "inspect", "epg.bin"]);
        assert_eq!(opts.verbose, 2);
    }
}
