//! Command line program for composing and launching `crucible` training
//! experiments.

use colored::*;

use crucible_cli::cli;

fn main() {
    match cli::start(cli::app().get_matches()) {
        Ok(_) => (),
        Err(e) => {
            println!("{}{}", "error: ".red(), e);
            if e.root_cause().to_string() != e.to_string() {
                println!("Caused by:\n{}", e.root_cause())
            }
            std::process::exit(1);
        }
    }
}
