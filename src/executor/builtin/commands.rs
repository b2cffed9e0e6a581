use std::io::Write;

use crate::environment::Environment;
use crate::executor::ExecStatus;
use crate::executor::builtin::manager::BuiltinCommand;

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn run(&self, args: &[String], env: &mut Environment, out: &mut dyn Write) -> ExecStatus {
        let home = env.get("HOME").map(str::to_string);
        let mut announce = false;

        let target = match args.first().map(String::as_str) {
            None | Some("~") => home,
            Some("-") => {
                announce = true;
                match env.get("OLDPWD") {
                    Some(old) if !old.is_empty() => Some(old.to_string()),
                    _ => {
                        eprintln!("cd: OLDPWD not set");
                        return Ok(1);
                    }
                }
            }
            Some(arg) if arg.starts_with('~') => home.map(|h| format!("{}{}", h, &arg[1..])),
            Some(arg) => Some(arg.to_string()),
        };
        let Some(target) = target else {
            eprintln!("cd: HOME not set");
            return Ok(1);
        };

        let previous = logical_cwd(env);
        if let Err(e) = std::env::set_current_dir(&target) {
            eprintln!("cd: {}: {}", target, e);
            return Ok(1);
        }
        let current = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| target.clone());

        if let Some(previous) = previous {
            env.set_exported("OLDPWD", &previous);
        }
        env.set_exported("PWD", &current);
        if announce {
            // The OLDPWD text as given, not the resolved directory.
            writeln!(out, "{}", target)?;
        }
        Ok(0)
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn run(&self, args: &[String], env: &mut Environment, out: &mut dyn Write) -> ExecStatus {
        let mut physical = false;
        for arg in args {
            match arg.as_str() {
                "-L" => physical = false,
                "-P" => physical = true,
                flag if flag.starts_with('-') => {
                    eprintln!("pwd: {}: invalid option", flag);
                    return Ok(1);
                }
                _ => {}
            }
        }

        let dir = if physical {
            std::env::current_dir().ok().map(|p| p.display().to_string())
        } else {
            logical_cwd(env)
        };
        match dir {
            Some(dir) => {
                writeln!(out, "{}", dir)?;
                Ok(0)
            }
            None => {
                eprintln!("pwd: cannot determine current directory");
                Ok(1)
            }
        }
    }
}

pub struct TrueCommand;

impl BuiltinCommand for TrueCommand {
    fn name(&self) -> &'static str {
        "true"
    }
    fn run(&self, _args: &[String], _env: &mut Environment, _out: &mut dyn Write) -> ExecStatus {
        Ok(0)
    }
}

pub struct FalseCommand;

impl BuiltinCommand for FalseCommand {
    fn name(&self) -> &'static str {
        "false"
    }
    fn run(&self, _args: &[String], _env: &mut Environment, _out: &mut dyn Write) -> ExecStatus {
        Ok(1)
    }
}

/// `$PWD` when set, else the real working directory.
fn logical_cwd(env: &Environment) -> Option<String> {
    match env.get("PWD") {
        Some(pwd) if !pwd.is_empty() => Some(pwd.to_string()),
        _ => std::env::current_dir().ok().map(|p| p.display().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cmd: &dyn BuiltinCommand, args: &[&str], env: &mut Environment) -> (i32, String) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let status = cmd.run(&args, env, &mut out).unwrap();
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_true_false() {
        let mut env = Environment::empty();
        assert_eq!(run(&TrueCommand, &[], &mut env).0, 0);
        assert_eq!(run(&FalseCommand, &["ignored"], &mut env).0, 1);
    }

    #[test]
    fn test_pwd_prefers_logical_path() {
        let mut env = Environment::empty();
        env.set("PWD", "/some/logical/path");
        assert_eq!(run(&PwdCommand, &[], &mut env), (0, "/some/logical/path\n".to_string()));
        assert_eq!(run(&PwdCommand, &["-L"], &mut env), (0, "/some/logical/path\n".to_string()));
    }

    #[test]
    fn test_pwd_physical() {
        let mut env = Environment::empty();
        env.set("PWD", "/some/logical/path");
        let expected = format!("{}\n", std::env::current_dir().unwrap().display());
        assert_eq!(run(&PwdCommand, &["-P"], &mut env), (0, expected));
    }

    #[test]
    fn test_pwd_rejects_unknown_flag() {
        let mut env = Environment::empty();
        assert_eq!(run(&PwdCommand, &["-x"], &mut env), (1, String::new()));
    }

    #[test]
    fn test_cd_without_home_or_oldpwd() {
        let mut env = Environment::empty();
        assert_eq!(run(&CdCommand, &[], &mut env).0, 1);
        assert_eq!(run(&CdCommand, &["-"], &mut env).0, 1);
        assert_eq!(env.get("PWD"), None);
    }

    #[test]
    fn test_cd_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let mut env = Environment::empty();
        env.set("PWD", "/before");
        assert_eq!(run(&CdCommand, &[missing.to_str().unwrap()], &mut env).0, 1);
        assert_eq!(env.get("PWD"), Some("/before"));
        assert_eq!(env.get("OLDPWD"), None);
    }
}
