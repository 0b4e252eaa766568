fn main() {
    if let Err(err) = annorecord::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
