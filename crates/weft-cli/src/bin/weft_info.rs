// weft-info: print summary information about an FST.
//
// Usage:
//   weft-info [in.fst]

use weft_core::properties as props;
use weft_script::FstClass;

const PROG: &str = "weft-info";

/// Tri-state property pairs shown in the report.
const TRINARY: &[(&str, u64, u64)] = &[
    ("acceptor", props::ACCEPTOR, props::NOT_ACCEPTOR),
    (
        "input deterministic",
        props::I_DETERMINISTIC,
        props::NON_I_DETERMINISTIC,
    ),
    (
        "output deterministic",
        props::O_DETERMINISTIC,
        props::NON_O_DETERMINISTIC,
    ),
    ("epsilons", props::EPSILONS, props::NO_EPSILONS),
    ("input label sorted", props::I_LABEL_SORTED, props::NOT_I_LABEL_SORTED),
    ("output label sorted", props::O_LABEL_SORTED, props::NOT_O_LABEL_SORTED),
    ("weighted", props::WEIGHTED, props::UNWEIGHTED),
    ("cyclic", props::CYCLIC, props::ACYCLIC),
];

fn main() {
    let args = weft_cli::parse_args(std::env::args().skip(1));

    if weft_cli::wants_help(&args) {
        println!("Prints summary information about an FST.");
        println!();
        println!("Usage: {PROG} [in.fst]");
        return;
    }

    if args.positionals.len() > 1 {
        weft_cli::fatal(PROG, "usage: weft-info [in.fst]");
    }
    let in_name = args.positionals.first().map_or("-", String::as_str);

    let data = weft_cli::read_input(PROG, in_name);
    let fst = match FstClass::read_bytes(&data) {
        Ok(fst) => fst,
        Err(e) => weft_cli::fatal(PROG, &e.to_string()),
    };

    let properties = fst.properties(props::FST_PROPERTIES, true);

    println!("arc type{:>24}", fst.arc_type());
    println!("# of states{:>21}", fst.num_states().unwrap_or(0));
    println!("# of arcs{:>23}", fst.num_arcs_total());
    println!(
        "start state{:>21}",
        fst.start()
            .map_or_else(|| "none".to_string(), |s| s.to_string())
    );
    println!(
        "error{:>27}",
        if properties & props::ERROR != 0 { "y" } else { "n" }
    );
    for &(name, pos, neg) in TRINARY {
        let mark = if properties & pos != 0 {
            "y"
        } else if properties & neg != 0 {
            "n"
        } else {
            "?"
        };
        println!("{name}{mark:>width$}", width = 32 - name.len());
    }
}
