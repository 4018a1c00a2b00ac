/*!
Defines a small command snapshotting mechanism.

Every test runs the `taskdue` binary through the `Command` wrapper below and
snapshots its exit status, stdout and stderr together. The wrapper is an owned
builder, so tests can derive commands from a common base without fighting
`&mut std::process::Command`.

Stdin may be given as a byte string. It is written from a separate thread so
that a process producing lots of output can't deadlock against us.
*/

use std::{
    collections::BTreeMap,
    env::consts::EXE_SUFFIX,
    ffi::{OsStr, OsString},
    io::Write,
    path::{Path, PathBuf},
    process, thread,
};

use bstr::{ByteSlice, ByteVec};

macro_rules! run_and_snapshot {
    ($cmd:expr, $body:expr) => {{
        let snap = $cmd.snapshot();
        let mut settings = insta::Settings::clone_current();
        settings.set_info(snap.info());
        settings.set_omit_expression(true);
        settings.bind(|| ($body)(snap.snapshot()));
    }};
}

macro_rules! assert_cmd_snapshot {
    ($cmd:expr, @$snapshot:literal $(,)?) => {{
        $crate::command::run_and_snapshot!($cmd, |snapshot: &str| {
            insta::assert_snapshot!(snapshot, @$snapshot);
        });
    }};
    ($cmd:expr $(,)?) => {{
        $crate::command::run_and_snapshot!($cmd, |snapshot: &str| {
            insta::assert_snapshot!(snapshot);
        });
    }};
}

pub(crate) use {assert_cmd_snapshot, run_and_snapshot};

/// The result of running a command, rendered for snapshotting.
pub struct Snapshot {
    /// Shown in the `cargo insta review` user interface, but not part of the
    /// snapshot itself.
    info: CommandInfo,
    snapshot: String,
}

impl Snapshot {
    fn new(info: CommandInfo, output: &process::Output) -> Snapshot {
        let snapshot = format!(
            "success: {:?}\n\
             exit_code: {}\n\
             ----- stdout -----\n\
             {}\n\
             ----- stderr -----\n\
             {}",
            output.status.success(),
            output.status.code().unwrap_or(!0),
            bytes_to_string(&output.stdout),
            bytes_to_string(&output.stderr),
        );
        Snapshot { info, snapshot }
    }

    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }
}

/// An owned wrapper around `std::process::Command`.
#[derive(Clone, Debug)]
pub struct Command {
    bin: OsString,
    current_dir: Option<PathBuf>,
    args: Vec<OsString>,
    envs: Vec<(OsString, Option<OsString>)>,
    stdin: Option<Vec<u8>>,
}

impl Command {
    /// Create a new command wrapper for the given binary program.
    pub fn new(bin: impl AsRef<OsStr>) -> Command {
        Command {
            bin: bin.as_ref().to_os_string(),
            current_dir: None,
            args: vec![],
            envs: vec![],
            stdin: None,
        }
    }

    /// Add an argument to the end of this command invocation.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Command {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add arguments to the end of this command invocation.
    pub fn args(
        mut self,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Command {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set an environment variable.
    pub fn env(
        mut self,
        key: impl AsRef<OsStr>,
        val: impl AsRef<OsStr>,
    ) -> Command {
        self.envs.push((
            key.as_ref().to_os_string(),
            Some(val.as_ref().to_os_string()),
        ));
        self
    }

    /// Remove an environment variable, so that it isn't inherited from the
    /// parent process either.
    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Command {
        self.envs.push((key.as_ref().to_os_string(), None));
        self
    }

    /// Set the current directory in which to run this command.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Command {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Pass the given bytes to this command on stdin. Without this, stdin is
    /// empty.
    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Command {
        self.stdin = Some(bytes.into());
        self
    }

    /// Turn this wrapper into a fresh `std::process::Command`.
    fn std(&self) -> process::Command {
        let mut cmd = process::Command::new(&self.bin);
        if let Some(ref current_dir) = self.current_dir {
            cmd.current_dir(current_dir);
        }
        cmd.args(self.args.iter());
        for (key, val) in self.envs.iter() {
            match *val {
                Some(ref val) => cmd.env(key, val),
                None => cmd.env_remove(key),
            };
        }
        cmd
    }

    /// Runs this command and returns a snapshot based on its output.
    pub fn snapshot(&self) -> Snapshot {
        let mut cmd = self.std();
        let mut info = CommandInfo::new(&cmd);
        cmd.stdout(process::Stdio::piped());
        cmd.stderr(process::Stdio::piped());
        let output = match self.stdin {
            None => {
                cmd.stdin(process::Stdio::null());
                cmd.output().unwrap()
            }
            Some(ref bytes) => {
                info.stdin = Some(bytes_to_string(bytes));
                cmd.stdin(process::Stdio::piped());
                let mut child = cmd.spawn().unwrap();
                let mut child_stdin = child.stdin.take().unwrap();
                let bytes = bytes.clone();
                // The process may exit with an error before reading all of
                // its input, so a failed write isn't a test failure.
                let writer =
                    thread::spawn(move || child_stdin.write_all(&bytes));
                let output = child.wait_with_output().unwrap();
                let _ = writer.join().unwrap();
                output
            }
        };
        Snapshot::new(info, &output)
    }
}

/// Information about a particular command.
///
/// This is fed into `insta` as contextual information that doesn't appear
/// directly in the snapshot.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CommandInfo {
    bin: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<String>,
}

impl CommandInfo {
    fn new(cmd: &process::Command) -> CommandInfo {
        let program = Path::new(cmd.get_program())
            .file_name()
            .unwrap_or(OsStr::new("{UNKNOWN}"));
        let program = os_str_to_string(program);
        let bin =
            program.strip_suffix(EXE_SUFFIX).unwrap_or(&program).to_string();
        CommandInfo {
            bin,
            args: cmd.get_args().map(os_str_to_string).collect(),
            env: cmd
                .get_envs()
                .map(|(k, v)| {
                    (
                        os_str_to_string(k),
                        os_str_to_string(v.unwrap_or(OsStr::new(""))),
                    )
                })
                .collect(),
            stdin: None,
        }
    }
}

/// Return a command prepared to execute the binary with the given name.
pub fn bin(name: &str) -> Command {
    Command::new(bin_path(name))
}

/// Returns a path to the Cargo project binary with the given name.
///
/// Integration test binaries live in `target/<profile>/deps`, while project
/// binaries live in `target/<profile>`.
fn bin_path(name: &str) -> PathBuf {
    std::env::current_exe()
        .unwrap()
        .parent()
        .expect("executable's directory")
        .parent()
        .expect("target profile directory")
        .join(format!("{name}{}", EXE_SUFFIX))
}

/// Turns a slice of bytes into a human readable string.
///
/// Invalid UTF-8 is escaped using bstr's escaping mechanism.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(string) => string.to_string(),
        Err(_) => bytes.escape_bytes().to_string(),
    }
}

fn os_str_to_string(os_str: &OsStr) -> String {
    bytes_to_string(&Vec::from_os_str_lossy(os_str))
}
