// weft-invert: invert a transduction.
//
// Usage:
//   weft-invert [in.fst [out.fst]]

use weft_script::MutableFstClass;

const PROG: &str = "weft-invert";

fn main() {
    let args = weft_cli::parse_args(std::env::args().skip(1));

    if weft_cli::wants_help(&args) {
        println!("Inverts a transduction.");
        println!();
        println!("Usage: {PROG} [in.fst [out.fst]]");
        return;
    }

    if args.positionals.len() > 2 {
        weft_cli::fatal(PROG, "usage: weft-invert [in.fst [out.fst]]");
    }
    weft_cli::check_single_stdio(PROG, &args.positionals);

    let in_name = args.positionals.first().map_or("-", String::as_str);
    let out_name = args.positionals.get(1).map_or("-", String::as_str);

    let data = weft_cli::read_input(PROG, in_name);
    let fst = match MutableFstClass::read_bytes(&data) {
        Ok(fst) => fst,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };

    let inverted = match weft_script::ops::invert(fst) {
        Ok(fst) => fst,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };

    let bytes = match inverted.write_bytes() {
        Ok(bytes) => bytes,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };
    weft_cli::write_output(PROG, out_name, &bytes);
}
