//! Exercises [`coap_client_core::client::Client`] against a real CoAP peer.
//!
//! Grounded on `kwap/examples/raw/client_core.rs`, stripped of the
//! in-process test server (this crate ships no server half) and the
//! `nb`/`block!` polling loop, since [`Client::exchange`] already blocks
//! until it has an answer or gives up.
//!
//! ```text
//! cargo run --example raw_client -- 127.0.0.1:5683
//! ```

use std::time::Instant;

use coap_client_core::client::Client;
use coap_client_core::req::ReqBuilder;
use coap_client_core::socket::UdpEndpoint;

fn main() {
  simple_logger::SimpleLogger::new().init().unwrap();

  let peer = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:5683".into());
  println!("connecting to coap://{peer}");

  let endpoint = UdpEndpoint::connect(&peer).expect("bind/connect udp socket");
  let mut client = Client::new(endpoint);

  ping(&mut client);
  get(&mut client, "hello", true);
  get(&mut client, "hello", false);
}

fn ping(client: &mut Client<UdpEndpoint>) {
  println!("pinging");
  let start = Instant::now();
  match client.ping() {
    | Ok(()) => println!("ping ok! took {}ms\n", start.elapsed().as_millis()),
    | Err(e) => eprintln!("ping failed: {e:#?}\n"),
  }
}

fn get(client: &mut Client<UdpEndpoint>, path: &str, confirmable: bool) {
  let req = ReqBuilder::new(coap_client_core::req::Method::Get, confirmable).path(path)
                                                                            .build();

  println!("GET /{path} ({})", if confirmable { "CON" } else { "NON" });
  match client.exchange(req) {
    | Ok(resp) => {
      let body = String::from_utf8_lossy(resp.payload.as_deref().unwrap_or(&[]));
      println!("{} {body:?}\n", resp.code);
    },
    | Err(e) => eprintln!("request failed: {e:#?}\n"),
  }
}
