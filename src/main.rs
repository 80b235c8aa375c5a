use clap::{ArgAction, Parser as ClapParser};

use mewo::{Mewo, MewoOptions, Value};

/// Build-automation Mewofile interpreter.
#[derive(ClapParser)]
#[command(name = "mewo")]
#[command(about = "Runs a Mewofile")]
#[command(version)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Label to run; runs the top level when omitted.
    label: Option<String>,

    /// Prints the version banner and exits.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Verbose logging; also prints the parsed statement stream before
    /// execution.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Spawn no children; print each command that would have run.
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Script path.
    #[arg(short = 'f', long = "mewofile", alias = "file", default_value = "Mewofile")]
    mewofile: String,

    /// Default shell for all commands.
    #[arg(long = "shell")]
    shell: Option<String>,

    /// `-D name=value`, repeatable: seed a string variable.
    #[arg(short = 'D', value_name = "name=value")]
    defines: Vec<String>,

    /// Arguments available as `$1`, `$2`, ... after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

/// `+F`/`-F` aren't expressible as clap flags (clap only recognizes `-`/
/// `--` prefixes), so they're pulled out of argv by hand before the rest
/// is handed to `Cli::parse_from`, mirroring the original CLI's own
/// hand-rolled argument loop for this shared-short-name, sign-disambiguated
/// option pair.
fn extract_feature_overrides(raw_args: &[String]) -> (Vec<String>, Vec<(String, bool)>) {
    let mut remaining = Vec::with_capacity(raw_args.len());
    let mut overrides = Vec::new();
    let mut i = 0;
    let mut past_separator = false;
    while i < raw_args.len() {
        let arg = &raw_args[i];
        if past_separator {
            remaining.push(arg.clone());
            i += 1;
            continue;
        }
        if arg == "--" {
            past_separator = true;
            remaining.push(arg.clone());
            i += 1;
            continue;
        }
        if arg == "+F" || arg == "-F" {
            let enabled = arg == "+F";
            if let Some(name) = raw_args.get(i + 1) {
                overrides.push((name.clone(), enabled));
                i += 2;
                continue;
            }
        } else if let Some(name) = arg.strip_prefix("+F") {
            overrides.push((name.to_string(), true));
            i += 1;
            continue;
        } else if let Some(name) = arg.strip_prefix("-F") {
            overrides.push((name.to_string(), false));
            i += 1;
            continue;
        }
        remaining.push(arg.clone());
        i += 1;
    }
    (remaining, overrides)
}

/// A bare `-D name` with no `=value` seeds the variable as an empty string
/// rather than being dropped.
fn parse_define(raw: &str) -> (String, Value) {
    match raw.split_once('=') {
        Some((name, value)) => (name.to_string(), Value::String(value.to_string())),
        None => (raw.to_string(), Value::String(String::new())),
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = std::env::args().collect();
    let (remaining, feature_overrides) = extract_feature_overrides(&raw_args);
    let cli = Cli::parse_from(remaining);

    init_logging(cli.debug);

    let source = match std::fs::read_to_string(&cli.mewofile) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mewo: cannot read '{}': {}", cli.mewofile, e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        let outcome = mewo::parse(&source);
        eprintln!("{:#?}", outcome.statements);
    }

    let defines: Vec<(String, Value)> = cli.defines.iter().map(|raw| parse_define(raw)).collect();

    let mut argv = vec![cli.mewofile.clone()];
    argv.extend(cli.args.iter().cloned());

    let mut mewo = Mewo::new(MewoOptions {
        defines,
        feature_overrides,
        argv,
        default_shell: cli.shell,
        dry_run: cli.dry_run,
    });

    let result = mewo.run(&source, cli.label.as_deref()).await;

    match result.error {
        Some(err) => {
            eprintln!("{}", err.format_for_file(&cli.mewofile));
            std::process::exit(1);
        }
        None => std::process::exit(0),
    }
}
