fn main() {
    match anvil::run::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("anvil: error: {:#}", err);
            std::process::exit(1);
        }
    }
}
