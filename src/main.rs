fn main() {
    if let Err(err) = logchat::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
