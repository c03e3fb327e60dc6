use anyhow::Result;

fn main() -> Result<()> {
    gharvest::cli::run()
}
