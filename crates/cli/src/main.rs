use std::process::ExitCode;

fn main() -> ExitCode {
    thunai_cli::run()
}
