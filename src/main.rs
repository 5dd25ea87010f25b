#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = markpilot_rust::run().await {
        eprintln!("markpilot-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
