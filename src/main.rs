use std::process::exit;

fn main() {
    operator_shell::init_logging();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            exit(1);
        }
    };

    let argv: Vec<String> = std::env::args().collect();
    let code = match runtime.block_on(operator_shell::run(argv)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            e.exit_code()
        }
    };

    // Dropping the runtime drops the process supervisors, which kill leftover children
    drop(runtime);
    exit(code);
}
