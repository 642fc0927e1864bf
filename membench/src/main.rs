fn main() -> anyhow::Result<()> {
    membench::run()
}
