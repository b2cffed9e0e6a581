use std::collections::HashMap;
use std::io::Write;

use crate::environment::Environment;
use crate::executor::builtin::commands::{CdCommand, FalseCommand, PwdCommand, TrueCommand};
use crate::executor::{ExecError, ExecStatus};

pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    /// `args` excludes the command name. Normal output goes to `out`.
    fn run(&self, args: &[String], env: &mut Environment, out: &mut dyn Write) -> ExecStatus;
}

pub struct BuiltinManager {
    commands: HashMap<String, Box<dyn BuiltinCommand>>,
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(PwdCommand));
        mgr.register(Box::new(TrueCommand));
        mgr.register(Box::new(FalseCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn execute(&self, name: &str, args: &[String], env: &mut Environment, out: &mut dyn Write) -> ExecStatus {
        if let Some(cmd) = self.commands.get(name) {
            cmd.run(args, env, out)
        } else {
            Err(ExecError::NoSuchBuiltin(name.to_string()))
        }
    }
}
