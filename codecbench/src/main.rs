fn main() -> anyhow::Result<()> {
    codecbench::run()
}
