// weft-copy: materialize an FST by a queue-driven visit.
//
// Usage:
//   weft-copy in.fst [out.fst] [--queue=fifo|lifo|state] [--maxvisit=N]
//
// With --maxvisit, at most N states are initialized and the copy is
// truncated; the initialized/finished counts go to stderr.

use weft_script::{FstClass, QueueKind};

const PROG: &str = "weft-copy";

fn main() {
    let args = weft_cli::parse_args(std::env::args().skip(1));

    if weft_cli::wants_help(&args) {
        println!("Materializes an FST following a queue discipline.");
        println!();
        println!("Usage: {PROG} in.fst [out.fst] [--queue=fifo|lifo|state] [--maxvisit=N]");
        return;
    }

    if args.positionals.is_empty() || args.positionals.len() > 2 {
        weft_cli::fatal(PROG, "usage: weft-copy in.fst [out.fst]");
    }
    weft_cli::check_single_stdio(PROG, &args.positionals);

    let in_name = args.positionals[0].as_str();
    let out_name = args.positionals.get(1).map_or("-", String::as_str);

    let queue: QueueKind = match args.flag_value("queue").unwrap_or("fifo").parse() {
        Ok(queue) => queue,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };
    let maxvisit = match args.flag_value("maxvisit") {
        None => None,
        Some(raw) => match raw.parse() {
            Ok(n) => Some(n),
            Err(_) => weft_cli::fatal(PROG, &format!("bad --maxvisit value: {raw}")),
        },
    };

    let data = weft_cli::read_input(PROG, in_name);
    let ifst = match FstClass::read_bytes(&data) {
        Ok(fst) => fst,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };

    let (ofst, ninit, nfinish) = match weft_script::ops::copy_fst(ifst, queue, maxvisit) {
        Ok(result) => result,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };
    if maxvisit.is_some() {
        eprintln!("{PROG}: initialized {ninit} states, finished {nfinish}");
    }

    let bytes = match ofst.write_bytes() {
        Ok(bytes) => bytes,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };
    weft_cli::write_output(PROG, out_name, &bytes);
}
