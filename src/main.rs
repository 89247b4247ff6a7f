use std::process;

fn main() {
    if let Err(err) = consolidate4ynab::run() {
        eprintln!("Error: {}", err);
        for cause in err.iter().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        process::exit(1);
    }
}
