fn main() {
    #[cfg(feature = "cli")]
    dabepg::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("dabepg: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
