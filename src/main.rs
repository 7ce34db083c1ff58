fn main() {
    if let Err(e) = claimcheck_lib::run() {
        eprintln!("claimcheck: {e}");
        std::process::exit(1);
    }
}
