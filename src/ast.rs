use std::fmt;
use std::os::fd::RawFd;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Simple(CommandNode),
    Pipe(Box<AstNode>, Box<AstNode>),
    Sequence(Box<AstNode>, Box<AstNode>),
    And(Box<AstNode>, Box<AstNode>),
    Or(Box<AstNode>, Box<AstNode>),
    Background(Box<AstNode>),
    If {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
    },
    For {
        var: String,
        words: Vec<String>,
        body: Box<AstNode>,
    },
    While {
        condition: Box<AstNode>,
        body: Box<AstNode>,
    },
    Group(Box<AstNode>),
    Subshell(Box<AstNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandNode {
    /// Command name followed by its arguments.
    pub args: Vec<String>,
    pub redirects: Vec<Redirect>,
    pub heredoc_body: Option<String>,
}

impl CommandNode {
    pub fn new(args: Vec<String>) -> Self {
        CommandNode {
            args,
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    Out,       // >
    Append,    // >>
    In,        // <
    ReadWrite, // <>
    DupOut,    // >&N
    DupIn,     // <&N
    CloseOut,  // >&-
    CloseIn,   // <&-
    OutErr,    // &>
    AppendErr, // &>>
    Heredoc,   // <<
}

impl RedirectOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RedirectOp::Out => ">",
            RedirectOp::Append => ">>",
            RedirectOp::In => "<",
            RedirectOp::ReadWrite => "<>",
            RedirectOp::DupOut => ">&",
            RedirectOp::DupIn => "<&",
            RedirectOp::CloseOut => ">&-",
            RedirectOp::CloseIn => "<&-",
            RedirectOp::OutErr => "&>",
            RedirectOp::AppendErr => "&>>",
            RedirectOp::Heredoc => "<<",
        }
    }

    /// Descriptor used when the operator has no numeric prefix.
    pub fn default_fd(&self) -> RawFd {
        match self {
            RedirectOp::In | RedirectOp::ReadWrite | RedirectOp::DupIn | RedirectOp::CloseIn | RedirectOp::Heredoc => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub fd: Option<RawFd>,
    pub op: RedirectOp,
    /// Path, descriptor number or heredoc delimiter. Empty for the close forms.
    pub target: String,
}

impl Redirect {
    pub fn new(fd: Option<RawFd>, op: RedirectOp, target: impl Into<String>) -> Self {
        Redirect {
            fd,
            op,
            target: target.into(),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd.unwrap_or_else(|| self.op.default_fd())
    }

    /// Splits a redirection operator such as `2>&1` into descriptor, operator and
    /// inline target. The target is `None` when a following word is required.
    /// Returns `None` for operators that are not redirections.
    pub fn split_operator(text: &str) -> Option<(Option<RawFd>, RedirectOp, Option<String>)> {
        match text {
            "&>" => return Some((None, RedirectOp::OutErr, None)),
            "&>>" => return Some((None, RedirectOp::AppendErr, None)),
            "<<" => return Some((None, RedirectOp::Heredoc, None)),
            _ => {}
        }

        let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
        let fd = if digits > 0 {
            Some(text[..digits].parse::<RawFd>().ok()?)
        } else {
            None
        };
        let rest = &text[digits..];

        let (op, target) = match rest {
            ">" => (RedirectOp::Out, None),
            ">>" => (RedirectOp::Append, None),
            "<" => (RedirectOp::In, None),
            "<>" => (RedirectOp::ReadWrite, None),
            ">&-" => (RedirectOp::CloseOut, Some(String::new())),
            "<&-" => (RedirectOp::CloseIn, Some(String::new())),
            ">&" => (RedirectOp::DupOut, None),
            "<&" => (RedirectOp::DupIn, None),
            _ => {
                let (op, num) = if let Some(num) = rest.strip_prefix(">&") {
                    (RedirectOp::DupOut, num)
                } else if let Some(num) = rest.strip_prefix("<&") {
                    (RedirectOp::DupIn, num)
                } else {
                    return None;
                };
                if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                (op, Some(num.to_string()))
            }
        };
        Some((fd, op, target))
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(fd) = self.fd {
            write!(f, "{}", fd)?;
        }
        match self.op {
            RedirectOp::DupOut | RedirectOp::DupIn | RedirectOp::CloseOut | RedirectOp::CloseIn => {
                write!(f, "{}{}", self.op.symbol(), self.target)
            }
            _ => write!(f, "{} {}", self.op.symbol(), self.target),
        }
    }
}

impl AstNode {
    pub fn simple(args: &[&str]) -> AstNode {
        AstNode::Simple(CommandNode::new(args.iter().map(|s| s.to_string()).collect()))
    }

    /// One-line shell rendering, used to label background jobs.
    pub fn source_text(&self) -> String {
        match self {
            AstNode::Simple(cmd) => {
                let mut parts = cmd.args.clone();
                parts.extend(cmd.redirects.iter().map(|r| r.to_string()));
                parts.join(" ")
            }
            AstNode::Pipe(l, r) => format!("{} | {}", l.source_text(), r.source_text()),
            AstNode::Sequence(l, r) => format!("{}; {}", l.source_text(), r.source_text()),
            AstNode::And(l, r) => format!("{} && {}", l.source_text(), r.source_text()),
            AstNode::Or(l, r) => format!("{} || {}", l.source_text(), r.source_text()),
            AstNode::Background(job) => format!("{} &", job.source_text()),
            AstNode::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(e) => format!(
                    "if {}; then {}; else {}; fi",
                    condition.source_text(),
                    then_branch.source_text(),
                    e.source_text()
                ),
                None => format!("if {}; then {}; fi", condition.source_text(), then_branch.source_text()),
            },
            AstNode::For { var, words, body } => {
                format!("for {} in {}; do {}; done", var, words.join(" "), body.source_text())
            }
            AstNode::While { condition, body } => {
                format!("while {}; do {}; done", condition.source_text(), body.source_text())
            }
            AstNode::Group(body) => format!("{{ {}; }}", body.source_text()),
            AstNode::Subshell(body) => format!("( {} )", body.source_text()),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            AstNode::Simple(cmd) => {
                writeln!(f, "{}SIMPLE", pad)?;
                writeln!(f, "{}  Args: {}", pad, cmd.args.join(" "))?;
                if !cmd.redirects.is_empty() {
                    let redirects: Vec<String> = cmd.redirects.iter().map(|r| r.to_string()).collect();
                    writeln!(f, "{}  Redirects: {}", pad, redirects.join(", "))?;
                }
                Ok(())
            }
            AstNode::Pipe(l, r) => binary(f, &pad, indent, "PIPE", l, r),
            AstNode::Sequence(l, r) => binary(f, &pad, indent, "SEQUENCE", l, r),
            AstNode::And(l, r) => binary(f, &pad, indent, "AND", l, r),
            AstNode::Or(l, r) => binary(f, &pad, indent, "OR", l, r),
            AstNode::If {
                condition,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "{}IF", pad)?;
                writeln!(f, "{}  Condition:", pad)?;
                condition.fmt_tree(f, indent + 2)?;
                writeln!(f, "{}  Then:", pad)?;
                then_branch.fmt_tree(f, indent + 2)?;
                if let Some(e) = else_branch {
                    writeln!(f, "{}  Else:", pad)?;
                    e.fmt_tree(f, indent + 2)?;
                }
                Ok(())
            }
            AstNode::For { var, words, body } => {
                writeln!(f, "{}FOR", pad)?;
                writeln!(f, "{}  Var: {}", pad, var)?;
                writeln!(f, "{}  List: {}", pad, words.join(" "))?;
                writeln!(f, "{}  Do:", pad)?;
                body.fmt_tree(f, indent + 2)
            }
            AstNode::While { condition, body } => {
                writeln!(f, "{}WHILE", pad)?;
                writeln!(f, "{}  Condition:", pad)?;
                condition.fmt_tree(f, indent + 2)?;
                writeln!(f, "{}  Do:", pad)?;
                body.fmt_tree(f, indent + 2)
            }
            AstNode::Group(body) => {
                writeln!(f, "{}GROUP", pad)?;
                body.fmt_tree(f, indent + 1)
            }
            AstNode::Subshell(body) => {
                writeln!(f, "{}SUBSHELL", pad)?;
                body.fmt_tree(f, indent + 1)
            }
            AstNode::Background(job) => {
                writeln!(f, "{}BACKGROUND", pad)?;
                job.fmt_tree(f, indent + 1)
            }
        }
    }
}

fn binary(f: &mut fmt::Formatter<'_>, pad: &str, indent: usize, name: &str, l: &AstNode, r: &AstNode) -> fmt::Result {
    writeln!(f, "{}{}", pad, name)?;
    l.fmt_tree(f, indent + 1)?;
    r.fmt_tree(f, indent + 1)
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_operator() {
        assert_eq!(Redirect::split_operator(">"), Some((None, RedirectOp::Out, None)));
        assert_eq!(Redirect::split_operator("2>>"), Some((Some(2), RedirectOp::Append, None)));
        assert_eq!(
            Redirect::split_operator("2>&1"),
            Some((Some(2), RedirectOp::DupOut, Some("1".to_string())))
        );
        assert_eq!(
            Redirect::split_operator("5<&-"),
            Some((Some(5), RedirectOp::CloseIn, Some(String::new())))
        );
        assert_eq!(Redirect::split_operator(">&"), Some((None, RedirectOp::DupOut, None)));
        assert_eq!(Redirect::split_operator("&>>"), Some((None, RedirectOp::AppendErr, None)));
        assert_eq!(Redirect::split_operator("|"), None);
        assert_eq!(Redirect::split_operator("&&"), None);
    }

    #[test]
    fn test_default_fd() {
        assert_eq!(Redirect::new(None, RedirectOp::In, "f").fd(), 0);
        assert_eq!(Redirect::new(None, RedirectOp::DupIn, "3").fd(), 0);
        assert_eq!(Redirect::new(None, RedirectOp::Heredoc, "EOF").fd(), 0);
        assert_eq!(Redirect::new(None, RedirectOp::Out, "f").fd(), 1);
        assert_eq!(Redirect::new(Some(2), RedirectOp::Out, "f").fd(), 2);
    }

    #[test]
    fn test_tree_dump() {
        let ast = AstNode::Pipe(Box::new(AstNode::simple(&["ls", "-l"])), Box::new(AstNode::simple(&["wc"])));
        assert_eq!(ast.to_string(), "PIPE\n  SIMPLE\n    Args: ls -l\n  SIMPLE\n    Args: wc\n");
    }

    #[test]
    fn test_source_text() {
        let mut cmd = CommandNode::new(vec!["sort".into()]);
        cmd.redirects.push(Redirect::new(None, RedirectOp::Out, "out.txt"));
        cmd.redirects.push(Redirect::new(Some(2), RedirectOp::DupOut, "1"));
        let ast = AstNode::And(Box::new(AstNode::simple(&["true"])), Box::new(AstNode::Simple(cmd)));
        assert_eq!(ast.source_text(), "true && sort > out.txt 2>&1");
    }
}
