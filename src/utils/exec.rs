//! External command execution.
//!
//! A small builder over `std::process::Command` used to run script modules.
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let output = Cmd::new("sh")
//!     .arg("handler.cgi")
//!     .cwd(site_dir)
//!     .envs([("REQUEST_METHOD", "GET")])
//!     .stdin(body)
//!     .run()?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    thread,
};

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin_data: Option<Vec<u8>>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: AsRef<[u8]>>(mut self, data: D) -> Self {
        self.stdin_data = Some(data.as_ref().to_vec());
        self
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command and collect its output.
    ///
    /// A non-zero exit status is not an error here; callers inspect
    /// `Output::status` themselves.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(if self.stdin_data.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        // Feed stdin from its own thread so a child that fills its stdout
        // pipe before reading input cannot block us both.
        let writer = match (self.stdin_data, child.stdin.take()) {
            (Some(data), Some(mut stdin)) => Some(thread::spawn(move || stdin.write_all(&data))),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for `{name}`"))?;

        if let Some(writer) = writer {
            // A script that never reads stdin closes the pipe early; that is fine.
            match writer.join() {
                Ok(Err(e)) if e.kind() != ErrorKind::BrokenPipe => {
                    return Err(e).with_context(|| format!("Failed to write stdin to `{name}`"));
                }
                Ok(_) => {}
                Err(_) => bail!("stdin writer for `{name}` panicked"),
            }
        }
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let output = Cmd::new("sh").args(["-c", "printf hello"]).run().unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
    }

    #[test]
    fn test_run_pipes_stdin_and_env() {
        let output = Cmd::new("sh")
            .args(["-c", "printf \"$GREETING \"; cat"])
            .envs([("GREETING", "hi")])
            .stdin("there")
            .run()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hi there");
    }

    #[test]
    fn test_run_reports_exit_status() {
        let output = Cmd::new("sh").args(["-c", "echo oops >&2; exit 3"]).run().unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
    }

    #[test]
    fn test_spawn_failure_is_error() {
        assert!(Cmd::new("definitely-not-a-real-program-xyz").run().is_err());
    }

    #[test]
    fn test_large_stdin_and_stdout_do_not_block() {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let output = Cmd::new("sh")
                .args(["-c", "head -c 200000 /dev/zero"])
                .stdin(vec![b'x'; 200_000])
                .run();
            let _ = tx.send(output.map(|o| o.stdout.len()));
        });

        let len = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("command did not finish")
            .unwrap();
        assert_eq!(len, 200_000);
    }

    #[test]
    fn test_large_stdin_is_fully_delivered() {
        let output = Cmd::new("sh")
            .args(["-c", "wc -c"])
            .stdin(vec![b'x'; 300_000])
            .run()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "300000");
    }
}
