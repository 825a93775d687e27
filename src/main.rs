fn main() {
    let code = bin_deb_utils::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
