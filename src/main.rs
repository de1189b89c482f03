use mcdice::cli::{Args, BaseCommand, Command};

fn main() {
    let args = Args::new(pico_args::Arguments::from_env());

    match BaseCommand::try_from_cli_args(args).and_then(Command::run) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("Try 'mcdice --help' for more information.");
            std::process::exit(1);
        }
    }
}
