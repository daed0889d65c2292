fn main() {
    if let Err(err) = cloud_auditor::cli::run() {
        cloud_auditor::ui::eprintln_error(&err);
        std::process::exit(cloud_auditor::exit::exit_code(&err));
    }
}
