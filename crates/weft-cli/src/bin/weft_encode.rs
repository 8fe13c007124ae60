// weft-encode: encode or decode an FST through an encode table.
//
// Usage:
//   weft-encode in.fst mapper [out.fst] [--encode_labels] [--encode_weights]
//   weft-encode in.fst mapper [out.fst] --decode
//
// Encoding writes the table to the mapper file; decoding reads it back.
// The mapper argument must be a real file, not `-`.

use weft::encode::{ENCODE_LABELS, ENCODE_WEIGHTS};
use weft_script::MutableFstClass;

const PROG: &str = "weft-encode";

fn main() {
    let args = weft_cli::parse_args(std::env::args().skip(1));

    if weft_cli::wants_help(&args) {
        println!("Encodes an FST's labels and/or weights into dense labels, or decodes them back.");
        println!();
        println!("Usage: {PROG} in.fst mapper [out.fst] [--encode_labels] [--encode_weights] [--decode]");
        return;
    }

    if args.positionals.len() < 2 || args.positionals.len() > 3 {
        weft_cli::fatal(PROG, "usage: weft-encode in.fst mapper [out.fst]");
    }
    weft_cli::check_single_stdio(PROG, &args.positionals);

    let in_name = args.positionals[0].as_str();
    let mapper_name = args.positionals[1].as_str();
    let out_name = args.positionals.get(2).map_or("-", String::as_str);
    if mapper_name == "-" {
        weft_cli::fatal(PROG, "the mapper argument must be a file");
    }

    let decode = args.flag_bool("decode");
    let mut flags = 0u32;
    if args.flag_bool("encode_labels") {
        flags |= ENCODE_LABELS;
    }
    if args.flag_bool("encode_weights") {
        flags |= ENCODE_WEIGHTS;
    }
    if !decode && flags == 0 {
        weft_cli::fatal(
            PROG,
            "nothing to do: pass --encode_labels and/or --encode_weights, or --decode",
        );
    }

    let data = weft_cli::read_input(PROG, in_name);
    let fst = match MutableFstClass::read_bytes(&data) {
        Ok(fst) => fst,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };

    let result = if decode {
        let mapper_bytes = weft_cli::read_input(PROG, mapper_name);
        match weft_script::ops::decode_fst(fst, mapper_bytes) {
            Ok(fst) => fst,
            Err(e) => weft_cli::fatal(PROG, &e.to_string()),
        }
    } else {
        match weft_script::ops::encode_fst(fst, flags) {
            Ok((fst, mapper_bytes)) => {
                weft_cli::write_output(PROG, mapper_name, &mapper_bytes);
                fst
            }
            Err(e) => weft_cli::fatal(PROG, &e.to_string()),
        }
    };

    let bytes = match result.write_bytes() {
        Ok(bytes) => bytes,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };
    weft_cli::write_output(PROG, out_name, &bytes);
}
