fn main() -> anyhow::Result<()> {
    runbench_cli::run()
}
