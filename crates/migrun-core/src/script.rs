use std::path::{Path, PathBuf};

use async_trait::async_trait;
use migrun_common::{Error, Result};
use tokio::process::Command;
use tracing::debug;

use crate::traits::Migration;

/// Imports the script given as the first argument and awaits the export named
/// by the second. Handles both `export default` and transpiled CommonJS
/// (`exports.default`).
const NODE_SHIM: &str = r#"
const { pathToFileURL } = await import('node:url');
const [file, op] = process.argv.slice(1);
const mod = await import(pathToFileURL(file).href);
const migration = mod.default?.default ?? mod.default;
if (typeof migration?.[op] !== 'function') {
  throw new Error(`${file} has no default export with a ${op}() function`);
}
await migration[op]();
"#;

/// How a script file is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Node,
    Shell,
}

impl Interpreter {
    /// Interpreter for a file extension, or `None` if the extension is not a
    /// recognized migration script.
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "cjs" | "mjs" => Some(Self::Node),
            "sh" => Some(Self::Shell),
            _ => None,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Shell => "sh",
        }
    }

    fn command(&self, script: &Path, op: &str) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            Self::Node => {
                cmd.arg("--input-type=module").arg("-e").arg(NODE_SHIM);
            }
            Self::Shell => {}
        }
        cmd.arg(script).arg(op);
        cmd
    }
}

/// A migration backed by a script file on disk, executed in a child process.
pub struct ScriptMigration {
    id: String,
    path: PathBuf,
    interpreter: Interpreter,
    working_dir: PathBuf,
}

impl ScriptMigration {
    pub fn new(id: impl Into<String>, path: PathBuf, working_dir: PathBuf) -> Result<Self> {
        let id = id.into();
        let interpreter = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Interpreter::for_extension)
            .ok_or_else(|| {
                Error::Load(format!(
                    "{} is not a recognized migration script",
                    path.display()
                ))
            })?;

        Ok(Self {
            id,
            path,
            interpreter,
            working_dir,
        })
    }

    async fn invoke(&self, op: &str) -> Result<()> {
        debug!(
            "{} {} {op} (migration {})",
            self.interpreter.program(),
            self.path.display(),
            self.id
        );

        let status = self
            .interpreter
            .command(&self.path, op)
            .current_dir(&self.working_dir)
            .status()
            .await
            .map_err(|e| {
                Error::Load(format!(
                    "failed to start {} for migration {}: {e}",
                    self.interpreter.program(),
                    self.id
                ))
            })?;

        if !status.success() {
            return Err(Error::migration(&self.id, format!("{op} exited with {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Migration for ScriptMigration {
    async fn run(&self) -> Result<()> {
        self.invoke("run").await
    }

    async fn rollback(&self) -> Result<()> {
        self.invoke("rollback").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_script_extensions() {
        assert_eq!(Interpreter::for_extension("js"), Some(Interpreter::Node));
        assert_eq!(Interpreter::for_extension("mjs"), Some(Interpreter::Node));
        assert_eq!(Interpreter::for_extension("sh"), Some(Interpreter::Shell));
        assert_eq!(Interpreter::for_extension("ts"), None);
        assert_eq!(Interpreter::for_extension("map"), None);
    }

    #[test]
    fn rejects_unrecognized_file() {
        let result = ScriptMigration::new("001_init", "001_init.ts".into(), ".".into());
        assert!(matches!(result, Err(Error::Load(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_script_receives_operation_name() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("001_init.sh");
        std::fs::write(&script, "echo \"$1\" >> ops.log\n").unwrap();

        let migration =
            ScriptMigration::new("001_init", script, dir.path().to_path_buf()).unwrap();
        migration.run().await.unwrap();
        migration.rollback().await.unwrap();

        let log = std::fs::read_to_string(dir.path().join("ops.log")).unwrap();
        assert_eq!(log, "run\nrollback\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_migration_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("002_seed.sh");
        std::fs::write(&script, "exit 3\n").unwrap();

        let migration =
            ScriptMigration::new("002_seed", script, dir.path().to_path_buf()).unwrap();
        let err = migration.run().await.unwrap_err();
        match err {
            Error::Migration { id, reason } => {
                assert_eq!(id, "002_seed");
                assert!(reason.starts_with("run exited with"));
            }
            other => panic!("expected migration error, got: {other:?}"),
        }
    }

    #[cfg(unix)]
    fn node_available() -> bool {
        std::process::Command::new("node")
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn node_runs_commonjs_and_esm_default_exports() {
        if !node_available() {
            eprintln!("node not found, skipping node script test");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let cjs = dir.path().join("001_init.js");
        std::fs::write(
            &cjs,
            "const fs = require('fs');\n\
             exports.default = {\n\
               run: async () => fs.appendFileSync('ops.log', 'cjs run\\n'),\n\
               rollback: async () => fs.appendFileSync('ops.log', 'cjs rollback\\n'),\n\
             };\n",
        )
        .unwrap();
        let esm = dir.path().join("002_seed.mjs");
        std::fs::write(
            &esm,
            "import { appendFileSync } from 'node:fs';\n\
             export default {\n\
               async run() { appendFileSync('ops.log', 'esm run\\n'); },\n\
               async rollback() { appendFileSync('ops.log', 'esm rollback\\n'); },\n\
             };\n",
        )
        .unwrap();

        let working_dir = dir.path().to_path_buf();
        let first = ScriptMigration::new("001_init", cjs, working_dir.clone()).unwrap();
        let second = ScriptMigration::new("002_seed", esm, working_dir).unwrap();
        assert_eq!(first.interpreter, Interpreter::Node);

        first.run().await.unwrap();
        second.run().await.unwrap();
        second.rollback().await.unwrap();

        let log = std::fs::read_to_string(dir.path().join("ops.log")).unwrap();
        assert_eq!(log, "cjs run\nesm run\nesm rollback\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn node_rejection_is_a_migration_failure() {
        if !node_available() {
            eprintln!("node not found, skipping node script test");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("003_bad.js");
        std::fs::write(
            &script,
            "exports.default = {\n\
               run: async () => { throw new Error('nope'); },\n\
               rollback: async () => {},\n\
             };\n",
        )
        .unwrap();

        let migration =
            ScriptMigration::new("003_bad", script, dir.path().to_path_buf()).unwrap();
        let err = migration.run().await.unwrap_err();
        assert!(matches!(err, Error::Migration { ref id, .. } if id == "003_bad"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn node_script_without_default_export_fails() {
        if !node_available() {
            eprintln!("node not found, skipping node script test");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("004_empty.js");
        std::fs::write(&script, "module.exports = {};\n").unwrap();

        let migration =
            ScriptMigration::new("004_empty", script, dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            migration.run().await,
            Err(Error::Migration { .. })
        ));
    }
}
