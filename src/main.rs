use anyhow::Context;
use argh::FromArgs;
use tinysh::Interpreter;
use tinysh::env::{Environment, SearchPath};
use tinysh::signals;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A small interactive shell with pipes, output redirection and background jobs.
struct Options {
    #[argh(option)]
    /// colon-separated directories searched for commands (default: /bin/:/usr/bin/).
    path: Option<String>,

    #[argh(option)]
    /// prompt printed before every line.
    prompt: Option<String>,

    #[argh(option, short = 'c')]
    /// run this line, clean up and exit instead of starting the prompt.
    command: Option<String>,

    #[argh(switch, short = 'q')]
    /// do not print the welcome banner.
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; TINYSH_LOG takes the usual env-filter directives.
    let filter = EnvFilter::try_from_env("TINYSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options: Options = argh::from_env();

    signals::install().context("failed to install signal handlers")?;

    let search_path = options
        .path
        .as_deref()
        .map(SearchPath::parse)
        .unwrap_or_default();
    let mut shell = Interpreter::new(Environment::new(search_path));
    if let Some(prompt) = options.prompt {
        shell = shell.with_prompt(prompt);
    }

    if let Some(line) = options.command {
        shell.run_line(&line);
        shell.shutdown();
        std::process::exit(shell.last_status());
    }

    if !options.quiet {
        println!("Welcome to tinysh!");
    }
    shell.repl().context("failed to read input")?;
    Ok(())
}
