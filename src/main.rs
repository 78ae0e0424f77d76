use std::process::ExitCode;

fn main() -> ExitCode {
    match tilestats::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
