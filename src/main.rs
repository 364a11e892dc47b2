fn main() -> anyhow::Result<()> {
    qualityguard::run()?;
    Ok(())
}
