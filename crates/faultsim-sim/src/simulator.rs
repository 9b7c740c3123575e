use std::fmt;
use std::path::PathBuf;

/// Which half of a simulation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStage {
    Compile,
    Run,
}

impl fmt::Display for ToolStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStage::Compile => f.write_str("compile"),
            ToolStage::Run => f.write_str("run"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Simulator I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulator {stage} step exited with status {status:?}: {diagnostics}")]
    ToolFailed {
        stage: ToolStage,
        status: Option<i32>,
        diagnostics: String,
    },
}

impl SimError {
    /// Process exit status a front end should terminate with.
    ///
    /// A tool failure carries the tool's own status; a signal-terminated tool
    /// or a local error maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::ToolFailed { status: Some(code), .. } => *code,
            _ => 1,
        }
    }
}

/// Compile a testbench into a runnable image.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub testbench: PathBuf,
    pub output: PathBuf,
    /// Extra include search directories.
    pub includes: Vec<PathBuf>,
}

/// Run a compiled image.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub compiled: PathBuf,
    /// Redirect standard output into this file and return its text.
    pub capture: Option<PathBuf>,
}

/// What a finished tool process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit status; None when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Contents of the capture file, when one was requested.
    pub file_text: Option<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a nonzero status into [`SimError::ToolFailed`].
    pub fn check(self, stage: ToolStage) -> Result<Self, SimError> {
        if self.success() {
            return Ok(self);
        }
        let diagnostics = if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        };
        Err(SimError::ToolFailed {
            stage,
            status: self.status,
            diagnostics,
        })
    }

    /// Text the simulation printed: the capture file if any, else stdout.
    pub fn text(&self) -> &str {
        self.file_text.as_deref().unwrap_or(&self.stdout)
    }
}

/// An external event-driven simulator.
///
/// Implementations only launch processes; they report nonzero statuses in
/// the returned [`ToolOutput`] and leave the policy to the caller.
pub trait Simulator: Send + Sync {
    fn name(&self) -> &str;

    fn compile(&self, request: &CompileRequest) -> Result<ToolOutput, SimError>;

    fn run(&self, request: &RunRequest) -> Result<ToolOutput, SimError>;

    /// Compile then run, failing on the first nonzero status.
    fn simulate(&self, compile: &CompileRequest, capture: Option<PathBuf>) -> Result<ToolOutput, SimError> {
        self.compile(compile)?.check(ToolStage::Compile)?;
        let run = RunRequest {
            compiled: compile.output.clone(),
            capture,
        };
        self.run(&run)?.check(ToolStage::Run)
    }
}
