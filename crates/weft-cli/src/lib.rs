// weft-cli: shared utilities for the command-line tools.
//
// All tools follow the same surface: positional input/output paths where
// `-` means standard input/output (at most one positional may be `-`),
// plus `--flag` and `--flag=value` options. Diagnostics go to stderr
// prefixed with the program name; any failure exits with code 1.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process;

/// Parsed command line: `--flag` / `--flag=value` options and positional
/// arguments, in order.
pub struct ParsedArgs {
    pub flags: HashMap<String, String>,
    pub positionals: Vec<String>,
}

impl ParsedArgs {
    /// A `--name` or `--name=anything-but-false` flag.
    pub fn flag_bool(&self, name: &str) -> bool {
        match self.flags.get(name) {
            Some(value) => value != "false",
            None => false,
        }
    }

    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

/// Split raw arguments into flags and positionals. A lone `-` is a
/// positional (standard input/output), `--` ends flag parsing.
pub fn parse_args(raw: impl IntoIterator<Item = String>) -> ParsedArgs {
    let mut flags = HashMap::new();
    let mut positionals = Vec::new();
    let mut only_positionals = false;
    for arg in raw {
        if only_positionals || arg == "-" || !arg.starts_with("--") {
            positionals.push(arg);
        } else if arg == "--" {
            only_positionals = true;
        } else {
            let body = &arg[2..];
            match body.split_once('=') {
                Some((name, value)) => {
                    flags.insert(name.to_string(), value.to_string());
                }
                None => {
                    flags.insert(body.to_string(), String::new());
                }
            }
        }
    }
    ParsedArgs { flags, positionals }
}

pub fn wants_help(args: &ParsedArgs) -> bool {
    args.flags.contains_key("help")
}

/// Print an error message prefixed with the program name and exit 1.
pub fn fatal(prog: &str, msg: &str) -> ! {
    eprintln!("{prog}: {msg}");
    process::exit(1);
}

/// At most one positional may name standard input/output.
pub fn check_single_stdio(prog: &str, positionals: &[String]) {
    if positionals.iter().filter(|p| *p == "-").count() > 1 {
        fatal(prog, "at most one argument may be standard input/output (-)");
    }
}

/// Read a whole input: a file path, or standard input for `-`.
pub fn read_input(prog: &str, path: &str) -> Vec<u8> {
    let mut data = Vec::new();
    let result = if path == "-" {
        std::io::stdin().lock().read_to_end(&mut data)
    } else {
        std::fs::File::open(path).and_then(|mut f| f.read_to_end(&mut data))
    };
    match result {
        Ok(_) => data,
        Err(e) => fatal(prog, &format!("can't read {path}: {e}")),
    }
}

/// Write a whole output: a file path, or standard output for `-`.
pub fn write_output(prog: &str, path: &str, data: &[u8]) {
    let result = if path == "-" {
        std::io::stdout().lock().write_all(data)
    } else {
        std::fs::File::create(path).and_then(|mut f| f.write_all(data))
    };
    if let Err(e) = result {
        fatal(prog, &format!("can't write {path}: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn positionals_and_flags_split() {
        let parsed = parse(&["in.fst", "--queue=lifo", "out.fst", "--connect"]);
        assert_eq!(parsed.positionals, vec!["in.fst", "out.fst"]);
        assert_eq!(parsed.flag_value("queue"), Some("lifo"));
        assert!(parsed.flag_bool("connect"));
        assert!(!parsed.flag_bool("decode"));
    }

    #[test]
    fn dash_is_positional() {
        let parsed = parse(&["-", "out.fst"]);
        assert_eq!(parsed.positionals, vec!["-", "out.fst"]);
    }

    #[test]
    fn double_dash_ends_flags() {
        let parsed = parse(&["--", "--queue=lifo"]);
        assert!(parsed.positionals.contains(&"--queue=lifo".to_string()));
        assert!(parsed.flag_value("queue").is_none());
    }

    #[test]
    fn explicit_false_flag() {
        let parsed = parse(&["--connect=false"]);
        assert!(!parsed.flag_bool("connect"));
    }
}
