use structopt::StructOpt;

use flick_pricing::{Credentials, FlickApi, PolledSensor, PricingSensor};

#[derive(Debug, StructOpt)]
#[structopt(name = "fetch", about = "fetch the current Flick power price")]
struct Opt {
    /// The Flick account username
    #[structopt(short, long)]
    username: String,

    /// The Flick account password
    #[structopt(short, long)]
    password: String,

    /// The OAuth client id to present to the identity service
    #[structopt(long)]
    client_id: String,

    /// The OAuth client secret to present to the identity service
    #[structopt(long)]
    client_secret: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let opt = Opt::from_args();

    let api = FlickApi::login(Credentials {
        username: opt.username,
        password: opt.password,
        client_id: opt.client_id,
        client_secret: opt.client_secret,
    })
    .await
    .unwrap();

    let mut sensor = PricingSensor::new(api);
    sensor.update().await.unwrap();

    println!(
        "{}: {} {}",
        sensor.name(),
        sensor.value().unwrap(),
        sensor.unit()
    );
    for (key, value) in sensor.attributes() {
        println!("  {}: {}", key, serde_json::to_string(value).unwrap());
    }
}
