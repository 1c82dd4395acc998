#[tokio::main]
async fn main() -> anyhow::Result<()> {
    zerowaste_connect::run().await
}
