use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::CfError;
use crate::runner::{CfOutput, CfRunner, CfStream};

/// Version line printed by `cf -v` in the default fake
pub const FAKE_VERSION: &str = "cf version 6.40.0+5cb3e0d4c.2018-09-12\n";

#[derive(Default)]
struct FakeState {
    outputs: HashMap<Vec<String>, CfOutput>,
    streams: HashMap<Vec<String>, (Vec<u8>, i32)>,
    calls: Vec<Vec<String>>,
}

/// In-memory cf runner serving canned responses, keyed by argument list
#[derive(Clone)]
pub struct FakeCf {
    state: Arc<Mutex<FakeState>>,
    installed: bool,
    program: String,
}

impl FakeCf {
    /// A working cf that answers `cf -v`
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            installed: true,
            program: "cf".to_string(),
        }
        .with_output(&["-v"], CfOutput::ok(FAKE_VERSION))
    }

    /// A cf that cannot be started
    pub fn not_installed() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            installed: false,
            program: "cf".to_string(),
        }
    }

    /// Name the executable differently in command descriptions
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_output(self, args: &[&str], output: CfOutput) -> Self {
        self.state.lock().outputs.insert(to_key(args), output);
        self
    }

    pub fn with_stream(self, args: &[&str], stdout: impl Into<Vec<u8>>, code: i32) -> Self {
        self.state
            .lock()
            .streams
            .insert(to_key(args), (stdout.into(), code));
        self
    }

    /// Argument lists of every invocation so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().calls.clone()
    }

    fn record(&self, args: &[String]) -> Result<(), CfError> {
        self.state.lock().calls.push(args.to_vec());
        if self.installed {
            Ok(())
        } else {
            Err(CfError::Spawn {
                command: self.describe(args),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }
}

impl Default for FakeCf {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CfRunner for FakeCf {
    async fn output(&self, args: &[String]) -> Result<CfOutput, CfError> {
        self.record(args)?;
        let canned = self.state.lock().outputs.get(args).cloned();
        Ok(canned.unwrap_or_else(|| {
            CfOutput::failed(1, "", format!("unexpected cf invocation: {}", args.join(" ")))
        }))
    }

    async fn stream(&self, args: &[String]) -> Result<CfStream, CfError> {
        self.record(args)?;
        let (stdout, code) = self
            .state
            .lock()
            .streams
            .get(args)
            .cloned()
            .unwrap_or_else(|| (Vec::new(), 1));

        Ok(CfStream {
            stdout: Box::pin(Cursor::new(stdout)),
            exit: Box::pin(futures::future::ready(Ok::<_, CfError>(code))),
        })
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}

fn to_key(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
