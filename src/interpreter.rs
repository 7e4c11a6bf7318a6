use crate::ExitCode;
use crate::builtin;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::jobs::JobTracker;
use crate::launcher::{self, Outcome};
use crate::planner::{self, Plan};
use crate::tokenize::{STATEMENT_SEPARATOR, tokenize};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Prompt shown when none is configured.
pub const DEFAULT_PROMPT: &str = "tinysh > ";

/// Exit status recorded for a statement that failed before producing one.
const FAILURE: ExitCode = 1;

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter owns the [`Environment`] (search path, exit request) and the
/// [`JobTracker`] and threads them through every statement it runs.
///
/// Example
/// ```no_run
/// use tinysh::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.run_line("pwd; $PATH");
/// sh.shutdown();
/// ```
pub struct Interpreter {
    env: Environment,
    jobs: JobTracker,
    prompt: String,
    last_status: ExitCode,
}

impl Interpreter {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            jobs: JobTracker::new(),
            prompt: DEFAULT_PROMPT.to_owned(),
            last_status: 0,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Exit status of the last statement that ran.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Run every `;`-separated statement of `line`, left to right.
    ///
    /// Errors are reported on stderr, one line each, and do not stop the following
    /// statements; only `exit` does.
    pub fn run_line(&mut self, line: &str) {
        for statement in tokenize(line, STATEMENT_SEPARATOR) {
            self.last_status = match self.run_statement(&statement) {
                Ok(code) => code,
                Err(e) => {
                    report(&e);
                    FAILURE
                }
            };
            if self.env.should_exit {
                break;
            }
        }
    }

    /// Plan and execute a single statement.
    pub fn run_statement(&mut self, statement: &str) -> Result<ExitCode> {
        match planner::plan(statement) {
            Plan::Empty => Ok(self.last_status),
            Plan::Unsupported => Err(ShellError::UnsupportedPipeChain),
            Plan::Builtin { argv, redirect } => {
                builtin::dispatch(&argv, redirect.as_deref(), &mut self.env)
            }
            Plan::External(stage) => {
                launcher::launch(&stage, &self.env.search_path, &mut self.jobs).map(status)
            }
            Plan::Piped(first, second) => {
                let (first, second) =
                    launcher::launch_piped(&first, &second, &self.env.search_path, &mut self.jobs)?;
                if let Err(e) = first {
                    report(&e);
                }
                second.map(status)
            }
        }
    }

    /// Read-Eval-Print Loop until `exit` or end of input, then clean up.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let res = self.read_eval_loop();
        println!("Exiting");
        self.shutdown();
        res
    }

    fn read_eval_loop(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(&self.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.run_line(&line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Terminate and reap every tracked process.
    pub fn shutdown(&mut self) {
        tracing::debug!(tracked = self.jobs.len(), "shutting down");
        self.jobs.shutdown();
    }
}

impl Default for Interpreter {
    /// Create an interpreter searching the default directories.
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

fn status(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Exited(code) => code,
        Outcome::Background(_) | Outcome::Interrupted(_) => 0,
    }
}

fn report(err: &ShellError) {
    tracing::debug!(?err, "statement failed");
    eprintln!("tinysh: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "tinysh_interp_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_exit_stops_remaining_statements() {
        let mut sh = Interpreter::default();
        sh.run_line("a2path $PATH:/opt/tinysh; exit; a2path /never");
        assert!(sh.should_exit());
        assert_eq!(sh.env().search_path.entries(), &["/bin/", "/usr/bin/", "/opt/tinysh"]);
    }

    #[test]
    fn test_pipe_chain_rejected_without_processes() {
        let mut sh = Interpreter::default();
        let res = sh.run_statement("ls | sort | uniq");
        assert!(matches!(res, Err(ShellError::UnsupportedPipeChain)));
        assert!(sh.jobs().is_empty());
    }

    #[test]
    fn test_unknown_command_reports_not_found() {
        let mut sh = Interpreter::default();
        let res = sh.run_statement("no_such_command_for_tinysh --flag");
        match res {
            Err(ShellError::CommandNotFound(name)) => assert_eq!(name, "no_such_command_for_tinysh"),
            other => panic!("unexpected result {:?}", other),
        }
        sh.run_line("no_such_command_for_tinysh");
        assert_eq!(sh.last_status(), FAILURE);
    }

    #[test]
    fn test_external_redirect_through_search_path() {
        let dir = unique_temp_dir("redirect");
        let out = dir.join("out.txt");

        let mut sh = Interpreter::default();
        let code = sh
            .run_statement(&format!("echo hello tinysh > {}", out.display()))
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello tinysh\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_statements_run_in_order() {
        let dir = unique_temp_dir("order");
        let first = dir.join("first.txt");
        let second = dir.join("second.txt");

        let mut sh = Interpreter::default();
        sh.run_line(&format!(
            "echo sequenced > {} ; cat {} > {}",
            first.display(),
            first.display(),
            second.display()
        ));
        assert_eq!(fs::read_to_string(&second).unwrap(), "sequenced\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_two_stage_pipeline() {
        let dir = unique_temp_dir("pipe");
        let out = dir.join("count.txt");

        let mut sh = Interpreter::default();
        let code = sh
            .run_statement(&format!("echo one two three | wc -w > {}", out.display()))
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_background_job_then_shutdown() {
        let mut sh = Interpreter::default();

        let started = Instant::now();
        sh.run_line("sleep 100 &");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sh.jobs().len(), 1);

        sh.run_line("sleep 100 &");
        assert_eq!(sh.jobs().len(), 2);

        sh.shutdown();
        assert!(sh.jobs().is_empty());
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_cleared_search_path_only_tries_current_dir() {
        let mut sh = Interpreter::default();
        sh.run_line("a2path");
        assert!(sh.env().search_path.is_empty());
        let res = sh.run_statement("true");
        assert!(matches!(res, Err(ShellError::CommandNotFound(_))));
        assert_eq!(sh.run_statement("/bin/sh -c true").unwrap(), 0);
    }

    #[test]
    fn test_blank_statements_are_ignored() {
        let mut sh = Interpreter::default();
        sh.run_line(" ; ;;   ");
        assert_eq!(sh.last_status(), 0);
        assert!(!sh.should_exit());
    }
}
