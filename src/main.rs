#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = fluentpass_rust::run().await {
        eprintln!("fluentpass-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
