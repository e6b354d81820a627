use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    client::cli::run().await
}
