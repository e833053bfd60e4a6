use work_permit_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("work permit service error: {err}");
        std::process::exit(1);
    }
}
