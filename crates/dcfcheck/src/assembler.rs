use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use dcfcheck_proc::{ensure_success, ProcessRunner, ToolCommand};

pub const ENV_CC: &str = "DCFCHECK_CC";
pub const ENV_CC_ARGS: &str = "DCFCHECK_CC_ARGS";
pub const DEFAULT_CC: &str = "gcc";

/// Assembles and links compiler output read from stdin:
/// `<command> -g -o <exe> -x assembler -`.
#[derive(Debug, Clone)]
pub struct Assembler {
    pub command: ToolCommand,
}

impl Assembler {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }

    /// `cc` if given, else `$DCFCHECK_CC`, else `gcc`; extra leading
    /// arguments come from `$DCFCHECK_CC_ARGS`.
    pub fn from_env(cc: Option<PathBuf>) -> Self {
        let program = cc
            .or_else(|| std::env::var_os(ENV_CC).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CC));
        let cc_args = std::env::var(ENV_CC_ARGS).unwrap_or_default();
        Self::new(ToolCommand::new(program).with_args(split_cc_args(&cc_args)))
    }

    pub fn command_for(&self, out_path: &Path) -> Command {
        let mut cmd = self.command.command();
        cmd.arg("-g");
        cmd.arg("-o");
        cmd.arg(out_path);
        cmd.args(["-x", "assembler", "-"]);
        cmd
    }

    /// Writes an executable to `out_path`, replacing any existing file.
    ///
    /// A rejected assembly file is an error, not a test failure: it means the
    /// compiler under test emitted invalid code.
    pub fn assemble(&self, runner: &ProcessRunner, assembly: &str, out_path: &Path) -> Result<()> {
        let out = runner
            .run(self.command_for(out_path), Some(assembly.as_bytes()))
            .with_context(|| format!("invoke assembler: {}", self.command.program.display()))?;
        ensure_success("assembler", &out)?;
        if !out_path.is_file() {
            anyhow::bail!(
                "assembler exited 0 but wrote no executable at {}",
                out_path.display()
            );
        }
        Ok(())
    }
}

/// Whitespace-separated, in order. Repeats are kept: flags such as
/// `-Xlinker` only make sense paired with the token after them.
fn split_cc_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfcheck_proc::process::describe_command;

    #[test]
    fn reads_assembly_from_stdin_with_debug_info() {
        let asm = Assembler::new(ToolCommand::new("gcc"));
        let cmd = asm.command_for(Path::new("/tmp/x/prog"));
        assert_eq!(
            describe_command(&cmd),
            "gcc -g -o /tmp/x/prog -x assembler -"
        );
    }

    #[test]
    fn cc_args_are_split_on_whitespace() {
        assert_eq!(
            split_cc_args("  -no-pie\t-m64  "),
            vec!["-no-pie".to_string(), "-m64".to_string()]
        );
        assert!(split_cc_args("").is_empty());
    }

    #[test]
    fn repeated_cc_args_are_kept() {
        assert_eq!(
            split_cc_args("-Xlinker -z -Xlinker noexecstack"),
            vec!["-Xlinker", "-z", "-Xlinker", "noexecstack"]
        );
    }

    #[test]
    fn cc_args_precede_fixed_args() {
        let asm = Assembler::new(ToolCommand::new("cc").with_args(split_cc_args("-no-pie")));
        let cmd = asm.command_for(Path::new("out"));
        assert_eq!(describe_command(&cmd), "cc -no-pie -g -o out -x assembler -");
    }
}
