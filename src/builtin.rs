use crate::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use crate::fd::StdoutRedirect;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::{self, Write};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`), which also enforces
/// their arity, and executed directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "pwd".
    fn name() -> &'static str;

    /// One-line message reported when the arguments do not fit.
    fn usage() -> &'static str;

    /// Executes the command writing to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Run the built-in named by `argv[0]`.
///
/// With a `redirect` target, standard output is rebound to that file while the
/// command runs and restored afterwards, whatever the command returned.
pub fn dispatch(
    argv: &[String],
    redirect: Option<&str>,
    env: &mut Environment,
) -> crate::error::Result<ExitCode> {
    let (name, args) = argv.split_first().ok_or(ShellError::EmptyCommand)?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match name.as_str() {
        "cd" => run::<Cd>(&args, redirect, env),
        "pwd" => run::<Pwd>(&args, redirect, env),
        "$PATH" => run::<PrintPath>(&args, redirect, env),
        "a2path" => run::<AppendPath>(&args, redirect, env),
        "exit" => run::<Exit>(&args, redirect, env),
        _ => Err(ShellError::CommandNotFound(name.clone())),
    }
}

fn run<T: BuiltinCommand>(
    args: &[&str],
    redirect: Option<&str>,
    env: &mut Environment,
) -> crate::error::Result<ExitCode> {
    // Arguments follow `--` so a dash-prefixed operand is never read as a flag.
    let args: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
    let cmd = match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd,
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            print!("{}", output);
            return Ok(0);
        }
        Err(EarlyExit { status: Err(()), .. }) => {
            return Err(ShellError::Usage(T::usage().to_owned()));
        }
    };

    let _redirect = redirect.map(StdoutRedirect::to_file).transpose()?;
    let mut stdout = io::stdout();
    cmd.execute(&mut stdout, env)
        .map_err(|e| e.downcast::<ShellError>().unwrap_or_else(ShellError::Builtin))
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn usage() -> &'static str {
        "\"cd\" expects exactly 1 argument"
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        env::set_current_dir(&self.target).map_err(|source| ShellError::ChangeDir {
            path: self.target.clone(),
            source,
        })?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn usage() -> &'static str {
        "\"pwd\" expects no arguments"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = env::current_dir().map_err(ShellError::WorkingDir)?;
        writeln!(stdout, "{}", cwd.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the directories searched for external commands.
pub struct PrintPath {}

impl BuiltinCommand for PrintPath {
    fn name() -> &'static str {
        "$PATH"
    }

    fn usage() -> &'static str {
        "\"$PATH\" expects no arguments"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "Current PATH: {}", env.search_path)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Replace, extend or clear the directories searched for external commands.
pub struct AppendPath {
    #[argh(positional)]
    /// colon-separated directories; a leading `$PATH` keeps the current ones. Clears the list when omitted.
    pub paths: Option<String>,
}

impl BuiltinCommand for AppendPath {
    fn name() -> &'static str {
        "a2path"
    }

    fn usage() -> &'static str {
        "\"a2path\" expects at most 1 argument"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.search_path.update(self.paths.as_deref());
        tracing::debug!(search_path = %env.search_path, "search path updated");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit shell process, terminating its remaining background jobs.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn usage() -> &'static str {
        "\"exit\" expects no arguments"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}
