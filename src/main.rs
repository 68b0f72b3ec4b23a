#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    citizen_certificate_server::run().await?;
    Ok(())
}
