use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::config::SimulatorConfig;
use crate::simulator::{CompileRequest, RunRequest, SimError, Simulator, ToolOutput};

/// Icarus Verilog: `iverilog` compiles, `vvp` runs.
#[derive(Debug, Clone)]
pub struct Icarus {
    iverilog: PathBuf,
    vvp: PathBuf,
    ivl_base: Option<PathBuf>,
}

impl Icarus {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            iverilog: config.iverilog.clone(),
            vvp: config.vvp.clone(),
            ivl_base: config.ivl_base.clone(),
        }
    }

    /// Compiler arguments, in invocation order.
    pub fn compile_args(&self, request: &CompileRequest) -> Vec<PathBuf> {
        let mut args = Vec::new();
        if let Some(base) = &self.ivl_base {
            args.push(PathBuf::from("-B"));
            args.push(base.clone());
        }
        args.push(PathBuf::from("-Ttyp"));
        args.push(PathBuf::from("-o"));
        args.push(request.output.clone());
        for dir in &request.includes {
            args.push(PathBuf::from("-I"));
            args.push(dir.clone());
        }
        args.push(request.testbench.clone());
        args
    }
}

fn spawn_error(tool: &Path) -> impl FnOnce(std::io::Error) -> SimError + '_ {
    move |source| SimError::Spawn {
        tool: tool.display().to_string(),
        source,
    }
}

fn tool_output(output: Output) -> ToolOutput {
    ToolOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        file_text: None,
    }
}

impl Simulator for Icarus {
    fn name(&self) -> &str {
        "icarus"
    }

    fn compile(&self, request: &CompileRequest) -> Result<ToolOutput, SimError> {
        let args = self.compile_args(request);
        tracing::debug!(tool = %self.iverilog.display(), ?args, "Compiling testbench");
        let output = Command::new(&self.iverilog)
            .args(&args)
            .output()
            .map_err(spawn_error(&self.iverilog))?;
        Ok(tool_output(output))
    }

    fn run(&self, request: &RunRequest) -> Result<ToolOutput, SimError> {
        tracing::debug!(tool = %self.vvp.display(), image = %request.compiled.display(), "Running simulation");
        let mut command = Command::new(&self.vvp);
        command.arg(&request.compiled);
        if let Some(capture) = &request.capture {
            command.stdout(Stdio::from(File::create(capture)?));
        }

        let mut result = tool_output(command.output().map_err(spawn_error(&self.vvp))?);
        if let Some(capture) = &request.capture {
            result.file_text = Some(fs::read_to_string(capture)?);
        }
        Ok(result)
    }
}
