use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use otu_cli::{
    diff_documents, init_tracing, load_config, load_json, run_replay, verify_document, Script,
};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("otu")
        .version(otu_cli::VERSION)
        .about("OTU reference registry tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Service configuration (TOML)"),
        )
        .subcommand(
            Command::new("verify")
                .about("Check a joined OTU document for consistency issues")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Joined OTU document (JSON)"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Print the structural diff between two documents")
                .arg(
                    Arg::new("old")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("new")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("replay")
                .about("Run a script of service operations against an in-memory store")
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Replay script (YAML)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    init_tracing(&config);

    match matches.subcommand() {
        Some(("verify", args)) => {
            let file = args.get_one::<PathBuf>("file").context("missing file")?;
            match verify_document(load_json(file)?)? {
                None => println!("verified"),
                Some(issues) => {
                    println!("{}", serde_json::to_string_pretty(&issues)?);
                    std::process::exit(1);
                }
            }
        }
        Some(("diff", args)) => {
            let old = args.get_one::<PathBuf>("old").context("missing old document")?;
            let new = args.get_one::<PathBuf>("new").context("missing new document")?;
            let ops = diff_documents(&load_json(old)?, &load_json(new)?);
            println!("{}", serde_json::to_string_pretty(&ops)?);
        }
        Some(("replay", args)) => {
            let path = args.get_one::<PathBuf>("script").context("missing script")?;
            let script = Script::load(path)?;
            let report = run_replay(&script, config)
                .await
                .with_context(|| format!("replay of {} failed", path.display()))?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn config_is_global() {
        let matches = cli()
            .try_get_matches_from(["otu", "replay", "script.yaml", "--config", "otu.toml", "--json"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("otu.toml"))
        );
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "replay");
        assert!(args.get_flag("json"));
    }
}
