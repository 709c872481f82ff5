fn main() -> std::process::ExitCode {
    doubling_tracker_lib::run()
}
