mod bindings;
mod check;
mod cli;
mod paths;
mod run;

use anyhow::{bail, Result};
use cli::Command;
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let paths = AppPaths::discover(cli.data_dir)?;
    match cli.command {
        Command::Run(args) => {
            let root = paths.resolve_pack(&args.pack.pack)?;
            run::run(&root, args)
        }
        Command::Check(args) => {
            let root = paths.resolve_pack(&args.pack.pack)?;
            let report = check::check_pack(&root, &args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
            if !report.passed() {
                bail!(
                    "check failed: {}",
                    report.error.as_deref().unwrap_or("see report")
                );
            }
            Ok(())
        }
        Command::Preprocess(args) => {
            let root = paths.resolve_pack(&args.pack)?;
            print!("{}", run::preprocess(&root, &args)?);
            Ok(())
        }
        Command::Where => {
            run::print_paths(&paths);
            Ok(())
        }
    }
}
