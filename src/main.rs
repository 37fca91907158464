#[actix_web::main]
async fn main() -> std::io::Result<()> {
    auto_report_server::run().await
}
