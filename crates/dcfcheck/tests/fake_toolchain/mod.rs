//! A stand-in compiler and assembler written as `/bin/sh` scripts.
//!
//! The fake compiler turns every `run: <shell>` line of a fixture into a line
//! of a shell script, so a fixture controls the exit code of the program it
//! "compiles" to. A fixture containing a line starting with `reject` makes the
//! compiler fail. The fake assembler copies stdin to the `-o` path and marks it
//! executable, and fails when the "assembly" contains `# bad-asm`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dcfcheck::{Assembler, Compiler, Harness, HarnessConfig};
use dcfcheck_proc::ToolCommand;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const COMPILER_SH: &str = r#"#!/bin/sh
if [ "$1" != "-t" ] || [ "$2" != "assembly" ] || [ $# -ne 3 ]; then
  echo "fake compiler: unexpected arguments: $*" >&2
  exit 64
fi
if grep -q '^reject' "$3"; then
  echo "fake compiler: $3: rejected" >&2
  exit 3
fi
echo '#!/bin/sh'
sed -n 's/^run: //p' "$3"
"#;

pub const ASSEMBLER_SH: &str = r#"#!/bin/sh
case " $* " in
  *" -g "*" -x assembler - "*) ;;
  *)
    echo "fake assembler: unexpected arguments: $*" >&2
    exit 64
    ;;
esac
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then
    out="$2"
    shift
  fi
  shift
done
if [ -z "$out" ]; then
  echo "fake assembler: missing -o" >&2
  exit 64
fi
cat > "$out"
if grep -q '^# bad-asm' "$out"; then
  rm -f "$out"
  echo "fake assembler: bad instruction" >&2
  exit 1
fi
chmod +x "$out"
"#;

pub struct FakeToolchain {
    pub root: PathBuf,
    pub programs_dir: PathBuf,
    pub compiler_script: PathBuf,
    pub assembler_script: PathBuf,
}

impl FakeToolchain {
    pub fn new(prefix: &str) -> Self {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = base.join(format!("{prefix}_{pid}_{n}"));
        let programs_dir = root.join("programs");
        std::fs::create_dir_all(&programs_dir).expect("create programs dir");

        let compiler_script = root.join("run.sh");
        std::fs::write(&compiler_script, COMPILER_SH).expect("write fake compiler");
        let assembler_script = root.join("cc.sh");
        std::fs::write(&assembler_script, ASSEMBLER_SH).expect("write fake assembler");

        Self {
            root,
            programs_dir,
            compiler_script,
            assembler_script,
        }
    }

    pub fn add_fixture(&self, name: &str, body: &str) -> PathBuf {
        let path = self.programs_dir.join(name);
        std::fs::write(&path, body).expect("write fixture");
        path
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(ToolCommand::new("/bin/sh").with_args([&self.compiler_script]))
    }

    pub fn assembler(&self) -> Assembler {
        Assembler::new(ToolCommand::new("/bin/sh").with_args([&self.assembler_script]))
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            programs_dir: self.programs_dir.clone(),
            suffix: ".dcf".to_string(),
            compiler: self.compiler(),
            assembler: self.assembler(),
            echo_commands: false,
        }
    }

    pub fn harness(&self) -> Harness {
        Harness::new(self.config())
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

impl Drop for FakeToolchain {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Fixture source that declares `expected` and exits with `actual`.
pub fn fixture(expected: &str, actual: i32) -> String {
    format!("// Returns: {expected}\nclass Program {{\n  void main() {{ }}\n}}\nrun: exit {actual}\n")
}
